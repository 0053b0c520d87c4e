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

//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::executor::ReachabilityMode;
use crate::ssh::StrictHostKeyChecking;

/// Main configuration structure.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    /// Aliases for broadcast addressing, keyed by alias name.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,

    /// First command tokens whose output is a structured payload.
    /// Omitted means the built-in list.
    #[serde(default)]
    pub structured_commands: Option<Vec<String>>,

    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Settings applied to every node that does not override them.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Defaults {
    pub user: Option<String>,
    pub port: Option<u16>,
    pub ssh_key: Option<String>,
    /// Passphrase for `ssh_key`; `${VAR}` references are expanded.
    pub ssh_key_passphrase: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub use_agent: bool,
    pub strict_host_key_checking: Option<StrictHostKeyChecking>,
    /// Seconds allowed for connect and authentication. Omitted means unbounded.
    pub connect_timeout: Option<u64>,
}

/// One fleet member.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum NodeConfig {
    /// `[user@]host[:port]`; the string is also the node name.
    Simple(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        host: String,
        #[serde(default)]
        port: Option<u16>,
        #[serde(default)]
        user: Option<String>,
        #[serde(default)]
        ssh_key: Option<String>,
        #[serde(default)]
        ssh_key_passphrase: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        use_agent: Option<bool>,
    },
}

/// Tuning for the executor and fan-out dispatcher.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub reachability: ReachabilityMode,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub retry_backoff_ms: u64,

    #[serde(default)]
    pub max_parallel: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            reachability: ReachabilityMode::default(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: 0,
            max_parallel: None,
        }
    }
}

pub(super) fn default_max_attempts() -> u32 {
    2
}

impl NodeConfig {
    /// Name the node will be registered under.
    pub fn name(&self) -> &str {
        match self {
            NodeConfig::Simple(s) => s,
            NodeConfig::Detailed { name, host, .. } => name.as_deref().unwrap_or(host),
        }
    }
}
