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

//! russh client connection and command channel.

use russh::client::{Config, Handle, Handler};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use super::known_hosts::{verify_server_key, StrictHostKeyChecking};
use super::Error;
use crate::node::NodeDescriptor;
use crate::transport::{ExecError, RawOutput};

/// Initial stdout buffer capacity; matches a typical SSH channel window
const SSH_CMD_BUFFER_SIZE: usize = 8192;

/// Initial stderr buffer capacity
const SSH_RESPONSE_BUFFER_SIZE: usize = 1024;

/// An authenticated connection to one node.
#[derive(Clone)]
pub struct Client {
    connection_handle: Arc<Handle<ClientHandler>>,
    username: String,
    address: String,
}

impl Client {
    /// Open a connection to the node and authenticate with its credential.
    ///
    /// Without `connect_timeout` the TCP connect and handshake may block
    /// for as long as the network does.
    pub async fn connect(
        node: &NodeDescriptor,
        strict_mode: StrictHostKeyChecking,
        connect_timeout: Option<Duration>,
        config: Arc<Config>,
    ) -> Result<Self, Error> {
        let connecting = Self::connect_inner(node, strict_mode, config);
        match connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connecting)
                .await
                .map_err(|_| Error::ConnectTimeout(limit))?,
            None => connecting.await,
        }
    }

    async fn connect_inner(
        node: &NodeDescriptor,
        strict_mode: StrictHostKeyChecking,
        config: Arc<Config>,
    ) -> Result<Self, Error> {
        let handler = ClientHandler {
            hostname: node.host.clone(),
            port: node.port,
            strict_mode,
        };
        let mut handle =
            russh::client::connect(config, (node.host.as_str(), node.port), handler).await?;

        super::auth::authenticate(&mut handle, &node.username, &node.credential).await?;

        Ok(Self {
            connection_handle: Arc::new(handle),
            username: node.username.clone(),
            address: node.address(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_closed(&self) -> bool {
        self.connection_handle.is_closed()
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) -> Result<(), Error> {
        self.connection_handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(Error::SshError)
    }

    /// Run a command on a fresh channel and collect both streams.
    ///
    /// Every call is a new shell context. The command text is sent verbatim.
    /// Failing to open the channel or start the command means the
    /// connection is unusable and is reported as [`ExecError::ChannelUnavailable`].
    pub async fn execute(&self, command: &str) -> Result<RawOutput, ExecError> {
        let mut channel = self
            .connection_handle
            .channel_open_session()
            .await
            .map_err(|e| ExecError::ChannelUnavailable(Error::SshError(e).to_string()))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| ExecError::ChannelUnavailable(Error::SshError(e).to_string()))?;

        let mut stdout = Vec::with_capacity(SSH_CMD_BUFFER_SIZE);
        let mut stderr = Vec::with_capacity(SSH_RESPONSE_BUFFER_SIZE);
        let mut exit_status: Option<u32> = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                russh::ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                russh::ChannelMsg::ExtendedData { ref data, ext } => {
                    if ext == 1 {
                        stderr.extend_from_slice(data);
                    }
                }
                // The exit status may arrive before the last data; keep reading
                russh::ChannelMsg::ExitStatus {
                    exit_status: status,
                } => exit_status = Some(status),
                _ => {}
            }
        }

        match exit_status {
            Some(status) => Ok(RawOutput::new(stdout, stderr, status)),
            None => {
                tracing::debug!("Channel for '{}' closed without exit status", command);
                Err(ExecError::Failed(Error::CommandDidntExit.to_string()))
            }
        }
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.username)
            .field("address", &self.address)
            .field("connection_handle", &"Handle<ClientHandler>")
            .finish()
    }
}

/// SSH client handler for server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    port: u16,
    strict_mode: StrictHostKeyChecking,
}

impl Handler for ClientHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(verify_server_key(
            self.strict_mode,
            &self.hostname,
            self.port,
            server_public_key,
        ))
    }
}
