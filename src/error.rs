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

//! Error types for the fleet execution engine.
//!
//! Only [`FleetError::Config`] and [`FleetError::UnknownNode`] ever escape
//! [`crate::Fleet::execute`] and [`crate::Fleet::execute_multi`]. The other
//! variants describe the outcome of a single command and are folded into a
//! `flag: false` [`crate::CommandResult`] before they reach the caller.

use thiserror::Error;

/// Errors produced by the registry, session manager and output decoder.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FleetError {
    /// Invalid or inconsistent node registration
    #[error("configuration error: {0}")]
    Config(String),

    /// A node name or alias that is not registered
    #[error("unknown node or alias '{0}'")]
    UnknownNode(String),

    /// Session establishment failed
    #[error("failed to connect to node '{node}': {reason}")]
    Connection { node: String, reason: String },

    /// Structured output could not be decoded
    #[error("failed to parse structured output: {0}")]
    Parse(String),

    /// The session failed while a command was in flight
    #[error("transport failure on node '{node}': {reason}")]
    Transport { node: String, reason: String },
}

impl FleetError {
    pub fn connection(node: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            node: node.into(),
            reason: reason.to_string(),
        }
    }

    pub fn transport(node: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            node: node.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error reports a caller mistake rather than a remote failure.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::UnknownNode(_))
    }
}

pub type Result<T, E = FleetError> = std::result::Result<T, E>;
