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

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Secret used to authenticate against a node.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(Zeroizing<String>),
    KeyFile {
        path: PathBuf,
        passphrase: Option<Zeroizing<String>>,
    },
    Agent,
}

impl Credential {
    pub fn password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }

    pub fn key_file(path: impl Into<PathBuf>, passphrase: Option<&str>) -> Self {
        Self::KeyFile {
            path: path.into(),
            passphrase: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::KeyFile { path, passphrase } => f
                .debug_struct("KeyFile")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::Agent => f.write_str("Agent"),
        }
    }
}

/// Identity of one remote machine in the fleet.
///
/// `name` is the lookup key used everywhere else; `host`/`port` is where the
/// session is opened. Descriptors are never mutated after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential: Credential,
}

impl NodeDescriptor {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            username: username.into(),
            credential,
        }
    }

    /// Build a descriptor from a `[user@]host[:port]` string.
    ///
    /// The logical name defaults to the address string itself.
    pub fn parse(
        node_str: &str,
        default_user: Option<&str>,
        default_port: Option<u16>,
        credential: Credential,
    ) -> Result<Self> {
        let (user_part, host_part) = if let Some(at_pos) = node_str.find('@') {
            (Some(&node_str[..at_pos]), &node_str[at_pos + 1..])
        } else {
            (None, node_str)
        };

        // Bracketed IPv6 literal: [::1]:2222
        let (host, port) = if let Some(rest) = host_part.strip_prefix('[') {
            let close = rest
                .find(']')
                .with_context(|| format!("Unclosed IPv6 bracket in '{node_str}'"))?;
            let host = &rest[..close];
            let port = match rest[close + 1..].strip_prefix(':') {
                Some(port_str) => Some(port_str.parse::<u16>().context("Invalid port number")?),
                None => None,
            };
            (host, port)
        } else if let Some(colon_pos) = host_part.rfind(':') {
            let port_str = &host_part[colon_pos + 1..];
            let port = port_str.parse::<u16>().context("Invalid port number")?;
            (&host_part[..colon_pos], Some(port))
        } else {
            (host_part, None)
        };

        if host.is_empty() {
            anyhow::bail!("Missing host in '{node_str}'");
        }

        let username = user_part
            .filter(|u| !u.is_empty())
            .or(default_user)
            .map(|s| s.to_string())
            .unwrap_or_else(current_username);

        Ok(Self {
            name: node_str.to_string(),
            host: host.to_string(),
            port: port.or(default_port).unwrap_or(DEFAULT_SSH_PORT),
            username,
            credential,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}@{}:{})",
            self.name, self.username, self.host, self.port
        )
    }
}

pub(crate) fn current_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "root".to_string())
}
