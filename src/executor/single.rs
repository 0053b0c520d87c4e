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

//! Single-node command execution.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{FleetError, Result};
use crate::output::{parse_lines, parse_structured, Command, OutputClassifier, OutputShape};
use crate::registry::Reachability;
use crate::session::SessionManager;
use crate::transport::RawOutput;

use super::result::{CommandResult, Output};
use super::retry::RetryPolicy;

/// Exit code reported when the command never produced an exit status.
const TRANSPORT_FAILURE_CODE: i32 = -1;

/// Which reachability signal gates new commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReachabilityMode {
    /// Only the addressed node's last connection attempt matters
    #[default]
    PerNode,
    /// Any unreachable node blocks commands to every node
    Fleet,
}

/// Runs one command on one node and folds every outcome into a [`CommandResult`].
#[derive(Clone, Debug)]
pub struct Executor {
    sessions: Arc<SessionManager>,
    classifier: OutputClassifier,
    retry: RetryPolicy,
    mode: ReachabilityMode,
}

impl Executor {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            classifier: OutputClassifier::default(),
            retry: RetryPolicy::default(),
            mode: ReachabilityMode::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: OutputClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_reachability_mode(mut self, mode: ReachabilityMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn classifier(&self) -> &OutputClassifier {
        &self.classifier
    }

    /// Execute `command` on `node`.
    ///
    /// Only [`FleetError::UnknownNode`] is returned as an error; connection,
    /// transport and decoding failures become `flag: false` results.
    pub async fn execute(&self, node: &str, command: impl Into<Command>) -> Result<CommandResult> {
        let command = command.into();
        let result = self.run(node, &command).await?;
        log_result(&result);
        Ok(result)
    }

    async fn run(&self, node: &str, command: &Command) -> Result<CommandResult> {
        let registry = self.sessions.registry();
        registry.entry(node)?;

        if !self.is_reachable(node)? {
            tracing::debug!("Skipping '{}' on {}: node is unreachable", command, node);
            return Ok(CommandResult::unreachable());
        }

        for attempt in self.retry.attempts() {
            let session = match self.sessions.ensure_session(node).await {
                Ok(session) => session,
                Err(FleetError::Connection { reason, .. }) => {
                    if self.retry.is_last(attempt) {
                        tracing::warn!(
                            "Giving up on {} after {} connection attempt(s): {}",
                            node,
                            attempt,
                            reason
                        );
                        return Ok(CommandResult::unreachable());
                    }
                    tracing::debug!("Connection attempt {} to {} failed, retrying", attempt, node);
                    self.retry.pause().await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match session.exec(command.text()).await {
                Ok(raw) => return Ok(self.finish(node, command, raw)),
                Err(e) if e.is_stale_session() && !self.retry.is_last(attempt) => {
                    tracing::debug!("Session to {} is stale ({}), reconnecting", node, e);
                    self.sessions.invalidate(node, &session).await?;
                    self.retry.pause().await;
                }
                Err(e) => {
                    if e.is_stale_session() {
                        self.sessions.invalidate(node, &session).await?;
                    }
                    let err = FleetError::transport(node, e);
                    return Ok(CommandResult::failure(
                        node,
                        command.text(),
                        TRANSPORT_FAILURE_CODE,
                        vec![err.to_string()],
                    ));
                }
            }
        }

        // Not reached: the last attempt always returns above
        Ok(CommandResult::unreachable())
    }

    fn is_reachable(&self, node: &str) -> Result<bool> {
        let registry = self.sessions.registry();
        Ok(match self.mode {
            ReachabilityMode::PerNode => registry.reachability(node)? != Reachability::Unreachable,
            ReachabilityMode::Fleet => registry.fleet_reachable(),
        })
    }

    fn finish(&self, node: &str, command: &Command, raw: RawOutput) -> CommandResult {
        let exit_status = i32::try_from(raw.exit_status).unwrap_or(i32::MAX);
        if !raw.is_success() {
            return CommandResult::failure(
                node,
                command.text(),
                exit_status,
                parse_lines(&raw.stderr_string()),
            );
        }

        let stdout = raw.stdout_string();
        match self.classifier.classify(command, &stdout) {
            OutputShape::Lines => {
                CommandResult::success(node, command.text(), Output::Lines(parse_lines(&stdout)))
            }
            OutputShape::Structured => match parse_structured(&stdout) {
                Ok(map) => CommandResult::success(node, command.text(), Output::Structured(map)),
                Err(e) => CommandResult::failure(
                    node,
                    command.text(),
                    exit_status,
                    vec![e.to_string()],
                ),
            },
        }
    }
}

/// Diagnostic sink for every result; never alters it.
fn log_result(result: &CommandResult) {
    tracing::debug!(
        target: "fleet_exec::result",
        node = result.node().unwrap_or("-"),
        cmd = result.cmd().unwrap_or("-"),
        flag = result.flag(),
        error_code = ?result.error_code(),
        "{}",
        serde_json::to_string(result).unwrap_or_default()
    );
}
