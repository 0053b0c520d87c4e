// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Command kinds and the output-shape decision.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Control CLI whose machine-readable output is decoded by default.
pub const DEFAULT_STRUCTURED_COMMAND: &str = "gluster";

/// How a command's stdout should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Ordinary shell command, stdout is a list of lines
    PlainShell,
    /// Control CLI invocation that prints markup
    StructuredControl,
}

/// Result of classification for one (command, output) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    Structured,
    Lines,
}

/// A command string tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    text: String,
    kind: Option<CommandKind>,
}

impl Command {
    /// Kind is decided later by the executor's classifier.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: Some(CommandKind::PlainShell),
        }
    }

    pub fn structured(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: Some(CommandKind::StructuredControl),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Kind chosen by the caller, if any.
    pub fn explicit_kind(&self) -> Option<CommandKind> {
        self.kind
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&String> for Command {
    fn from(text: &String) -> Self {
        Self::new(text.as_str())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

type KindPredicate = dyn Fn(&str) -> bool + Send + Sync;

/// Decides whether a command's output is markup or plain lines.
///
/// Only syntax is inspected: the command's first whitespace-delimited token
/// and whether stdout is empty.
#[derive(Clone)]
pub struct OutputClassifier {
    predicate: Arc<KindPredicate>,
}

impl OutputClassifier {
    /// Treat commands whose first token is one of `names` as structured.
    pub fn with_commands<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: HashSet<String> = names.into_iter().map(Into::into).collect();
        Self {
            predicate: Arc::new(move |token: &str| names.contains(token)),
        }
    }

    /// Use a custom predicate over the first token.
    pub fn with_predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Classifier that never reports structured output.
    pub fn lines_only() -> Self {
        Self::with_predicate(|_| false)
    }

    /// Kind of a command: the caller's explicit tag, else the first-token rule.
    pub fn command_kind(&self, command: &Command) -> CommandKind {
        if let Some(kind) = command.explicit_kind() {
            return kind;
        }
        match first_token(command.text()) {
            Some(token) if (self.predicate)(token) => CommandKind::StructuredControl,
            _ => CommandKind::PlainShell,
        }
    }

    /// Structured iff the command is a control command and output is non-empty.
    pub fn classify(&self, command: &Command, raw_output: &str) -> OutputShape {
        match self.command_kind(command) {
            CommandKind::StructuredControl if !raw_output.is_empty() => OutputShape::Structured,
            _ => OutputShape::Lines,
        }
    }
}

impl Default for OutputClassifier {
    fn default() -> Self {
        Self::with_commands([DEFAULT_STRUCTURED_COMMAND])
    }
}

impl fmt::Debug for OutputClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputClassifier").finish_non_exhaustive()
    }
}

fn first_token(command: &str) -> Option<&str> {
    command.split_whitespace().next()
}
