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

//! [`Transport`] and [`Session`] backed by russh.

use async_trait::async_trait;
use russh::client::Config;
use std::sync::Arc;
use std::time::Duration;

use super::client::Client;
use super::known_hosts::StrictHostKeyChecking;
use crate::error::FleetError;
use crate::node::NodeDescriptor;
use crate::transport::{ExecError, RawOutput, Session, Transport};

/// Opens SSH sessions to fleet nodes.
#[derive(Debug, Clone)]
pub struct SshTransport {
    strict_mode: StrictHostKeyChecking,
    connect_timeout: Option<Duration>,
    config: Arc<Config>,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self {
            strict_mode: StrictHostKeyChecking::default(),
            connect_timeout: None,
            config: Arc::new(Config::default()),
        }
    }
}

impl SshTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict_mode(mut self, strict_mode: StrictHostKeyChecking) -> Self {
        self.strict_mode = strict_mode;
        self
    }

    /// Bound the TCP connect, handshake and authentication.
    pub fn with_connect_timeout(mut self, connect_timeout: Option<Duration>) -> Self {
        self.connect_timeout = connect_timeout.filter(|limit| !limit.is_zero());
        self
    }

    pub fn strict_mode(&self) -> StrictHostKeyChecking {
        self.strict_mode
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn Session>, FleetError> {
        tracing::debug!("Connecting to {} ({})", node.name, node.address());
        let client = Client::connect(
            node,
            self.strict_mode,
            self.connect_timeout,
            Arc::clone(&self.config),
        )
        .await
        .map_err(|e| FleetError::connection(&node.name, e))?;

        tracing::debug!(
            "Authenticated to {} as {}",
            client.address(),
            client.username()
        );
        Ok(Arc::new(SshSession {
            client,
            node: node.name.clone(),
        }))
    }
}

/// One authenticated russh connection.
#[derive(Debug)]
pub struct SshSession {
    client: Client,
    node: String,
}

#[async_trait]
impl Session for SshSession {
    async fn exec(&self, command: &str) -> Result<RawOutput, ExecError> {
        if self.client.is_closed() {
            return Err(ExecError::ChannelUnavailable(format!(
                "connection to {} is closed",
                self.node
            )));
        }
        self.client.execute(command).await
    }

    async fn close(&self) {
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!("Disconnect from {} failed: {}", self.node, e);
        }
    }
}
