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

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the russh client layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Password authentication failed.")]
    PasswordWrong,

    #[error("Authentication failed. The private key was rejected by the server.")]
    KeyAuthFailed,

    #[error("Failed to load SSH key: {0}. Please check the key file format and passphrase.")]
    KeyInvalid(#[source] russh::keys::Error),

    #[error("Host key verification failed. The server's host key was not recognized or has changed.")]
    ServerCheckFailed,

    #[error("Failed to connect to SSH agent. Please ensure SSH_AUTH_SOCK is set and the agent is running.")]
    AgentConnectionFailed,

    #[error("Failed to request identities from SSH agent.")]
    AgentRequestIdentitiesFailed,

    #[error("SSH agent has no identities. Please add your key to the agent using 'ssh-add'.")]
    AgentNoIdentities,

    #[error("SSH agent authentication failed.")]
    AgentAuthenticationFailed,

    #[error("SSH agent authentication is not supported on this platform.")]
    AgentUnsupported,

    #[error("Connection timeout after {} seconds. Please check if the host is reachable and SSH service is running.", .0.as_secs())]
    ConnectTimeout(Duration),

    #[error("The command channel closed without reporting an exit status.")]
    CommandDidntExit,

    #[error("SSH connection error: {0}")]
    SshError(#[from] russh::Error),
}
