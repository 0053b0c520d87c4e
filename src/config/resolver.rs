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

//! Turning a loaded configuration into a runnable fleet.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{FleetError, Result};
use crate::executor::{ReachabilityMode, RetryPolicy};
use crate::fleet::Fleet;
use crate::node::{current_username, Credential, NodeDescriptor, DEFAULT_SSH_PORT};
use crate::output::{OutputClassifier, DEFAULT_STRUCTURED_COMMAND};
use crate::registry::NodeRegistry;
use crate::ssh::SshTransport;

use super::types::{Config, NodeConfig};
use super::utils::{expand_env_vars, expand_tilde};

impl Config {
    /// Resolve every configured node into a descriptor, in file order.
    pub fn node_descriptors(&self) -> Result<Vec<NodeDescriptor>> {
        self.nodes.iter().map(|node| self.resolve_node(node)).collect()
    }

    fn resolve_node(&self, node_config: &NodeConfig) -> Result<NodeDescriptor> {
        let default_user = self.defaults.user.as_deref().map(expand_env_vars);

        match node_config {
            NodeConfig::Simple(spec) => {
                let expanded = expand_env_vars(spec);
                let credential = self.credential_for(None, None, None, None)?;
                NodeDescriptor::parse(
                    &expanded,
                    default_user.as_deref(),
                    self.defaults.port,
                    credential,
                )
                .map_err(|e| FleetError::Config(format!("node '{spec}': {e:#}")))
            }
            NodeConfig::Detailed {
                name,
                host,
                port,
                user,
                ssh_key,
                ssh_key_passphrase,
                password,
                use_agent,
            } => {
                let host = expand_env_vars(host);
                if host.is_empty() {
                    return Err(FleetError::Config(format!(
                        "node '{}' has an empty host",
                        node_config.name()
                    )));
                }
                let username = user
                    .as_deref()
                    .map(expand_env_vars)
                    .or(default_user)
                    .unwrap_or_else(current_username);
                let credential = self.credential_for(
                    password.as_deref(),
                    ssh_key.as_deref(),
                    ssh_key_passphrase.as_deref(),
                    *use_agent,
                )?;

                Ok(NodeDescriptor::new(
                    name.clone().unwrap_or_else(|| host.clone()),
                    host,
                    port.or(self.defaults.port).unwrap_or(DEFAULT_SSH_PORT),
                    username,
                    credential,
                ))
            }
        }
    }

    /// Pick a credential: node-level settings first, then defaults.
    /// Within a level a password wins over a key, and a key over the agent.
    fn credential_for(
        &self,
        password: Option<&str>,
        ssh_key: Option<&str>,
        ssh_key_passphrase: Option<&str>,
        use_agent: Option<bool>,
    ) -> Result<Credential> {
        if let Some(password) = password {
            return Ok(Credential::password(&expand_env_vars(password)));
        }
        if let Some(key) = ssh_key {
            return key_credential(key, ssh_key_passphrase);
        }
        if use_agent == Some(true) {
            return Ok(Credential::Agent);
        }

        if let Some(password) = &self.defaults.password {
            return Ok(Credential::password(&expand_env_vars(password)));
        }
        if let Some(key) = &self.defaults.ssh_key {
            return key_credential(key, self.defaults.ssh_key_passphrase.as_deref());
        }
        // The agent is also the last resort when nothing is configured
        Ok(Credential::Agent)
    }

    /// Registry with every node plus the configured groups.
    pub fn registry(&self) -> Result<NodeRegistry> {
        let mut registry = NodeRegistry::register(self.node_descriptors()?)?;
        for (alias, members) in &self.groups {
            registry = registry.with_alias(alias.clone(), members.clone())?;
        }
        Ok(registry)
    }

    pub fn classifier(&self) -> OutputClassifier {
        match &self.structured_commands {
            Some(commands) => OutputClassifier::with_commands(commands.iter().map(String::as_str)),
            None => OutputClassifier::with_commands([DEFAULT_STRUCTURED_COMMAND]),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = Duration::from_millis(self.execution.retry_backoff_ms);
        RetryPolicy::new(self.execution.max_attempts, Some(backoff))
    }

    pub fn reachability_mode(&self) -> ReachabilityMode {
        self.execution.reachability
    }

    pub fn max_parallel(&self) -> Option<usize> {
        self.execution.max_parallel.filter(|n| *n > 0)
    }

    pub fn transport(&self) -> SshTransport {
        SshTransport::new()
            .with_strict_mode(self.defaults.strict_host_key_checking.unwrap_or_default())
            .with_connect_timeout(self.defaults.connect_timeout.map(Duration::from_secs))
    }

    /// Build a [`Fleet`] over SSH from this configuration.
    pub fn build_fleet(&self) -> Result<Fleet> {
        let fleet = Fleet::new(self.registry()?, Arc::new(self.transport()))
            .with_classifier(self.classifier())
            .with_retry_policy(self.retry_policy())
            .with_reachability_mode(self.reachability_mode())
            .with_max_parallel(self.max_parallel());
        tracing::debug!("Built fleet with {} nodes", fleet.registry().len());
        Ok(fleet)
    }
}

fn key_credential(key: &str, passphrase: Option<&str>) -> Result<Credential> {
    let path = expand_tilde(Path::new(&expand_env_vars(key)));
    if path.as_os_str().is_empty() {
        return Err(FleetError::Config("ssh_key path cannot be empty".to_string()));
    }
    let passphrase = passphrase.map(expand_env_vars);
    Ok(Credential::key_file(path, passphrase.as_deref()))
}
