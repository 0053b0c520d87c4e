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

//! Transport seams between the engine and the remote shell.
//!
//! The engine only ever talks to [`Transport`] and [`Session`]. The russh
//! implementation lives in [`crate::ssh`]; tests plug in an in-memory fake.
//!
//! # Implementing a transport
//!
//! ```ignore
//! use async_trait::async_trait;
//! use fleet_exec::transport::{ExecError, RawOutput, Session, Transport};
//! use fleet_exec::{FleetError, NodeDescriptor};
//! use std::sync::Arc;
//!
//! struct Loopback;
//!
//! #[async_trait]
//! impl Transport for Loopback {
//!     async fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn Session>, FleetError> {
//!         Err(FleetError::connection(&node.name, "loopback has no sessions"))
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::error::FleetError;
use crate::node::NodeDescriptor;

/// Raw bytes returned by one remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_status: u32,
}

impl RawOutput {
    pub fn new(stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>, exit_status: u32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_status,
        }
    }

    /// Convert stdout to a UTF-8 string
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Convert stderr to a UTF-8 string
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Failure while running a command on an established session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    /// No channel could be opened; the session is presumed dead.
    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// The channel opened but the command never reported an exit status.
    #[error("command failed in transport: {0}")]
    Failed(String),
}

impl ExecError {
    /// Whether the session should be dropped and reopened.
    pub fn is_stale_session(&self) -> bool {
        matches!(self, Self::ChannelUnavailable(_))
    }
}

/// A live, authenticated channel to exactly one node.
#[async_trait]
pub trait Session: Send + Sync {
    /// Run one command and wait for its exit status and both streams.
    ///
    /// There is no timeout here; a remote command that never exits blocks
    /// the caller indefinitely.
    async fn exec(&self, command: &str) -> Result<RawOutput, ExecError>;

    /// Close the session. Errors are ignored by callers.
    async fn close(&self) {}
}

/// Opens sessions from node descriptors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open and authenticate a session.
    ///
    /// Implementations report every failure as [`FleetError::Connection`].
    async fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn Session>, FleetError>;
}

impl fmt::Debug for dyn Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session")
    }
}

impl fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transport")
    }
}
