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

//! Entry points used by test cases and higher-level helpers.

use std::sync::Arc;

use crate::error::Result;
use crate::executor::{
    CommandResult, Executor, FanOutDispatcher, FanOutResult, ReachabilityMode, RetryPolicy,
};
use crate::output::{Command, OutputClassifier};
use crate::registry::{NodeRegistry, Reachability};
use crate::session::SessionManager;
use crate::transport::Transport;

/// A registered fleet plus the machinery to run commands on it.
///
/// # Examples
///
/// ```no_run
/// use fleet_exec::{Credential, Fleet, NodeDescriptor, NodeRegistry, SshTransport};
/// use std::sync::Arc;
///
/// # async fn run() -> anyhow::Result<()> {
/// let registry = NodeRegistry::register(vec![
///     NodeDescriptor::new("s1", "10.0.0.1", 22, "root", Credential::password("secret")),
///     NodeDescriptor::new("s2", "10.0.0.2", 22, "root", Credential::password("secret")),
/// ])?;
/// let fleet = Fleet::new(registry, Arc::new(SshTransport::default()));
///
/// if fleet.establish_fleet(&["all"]).await? {
///     let results = fleet.execute_multi(&["all"], "uptime").await?;
///     assert_eq!(results.len(), 2);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Fleet {
    executor: Executor,
    max_parallel: Option<usize>,
}

impl Fleet {
    pub fn new(registry: NodeRegistry, transport: Arc<dyn Transport>) -> Self {
        let sessions = Arc::new(SessionManager::new(Arc::new(registry), transport));
        Self {
            executor: Executor::new(sessions),
            max_parallel: None,
        }
    }

    pub fn with_classifier(mut self, classifier: OutputClassifier) -> Self {
        self.executor = self.executor.with_classifier(classifier);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.executor = self.executor.with_retry_policy(retry);
        self
    }

    pub fn with_reachability_mode(mut self, mode: ReachabilityMode) -> Self {
        self.executor = self.executor.with_reachability_mode(mode);
        self
    }

    /// Cap fan-out concurrency; `None` runs one task per node.
    pub fn with_max_parallel(mut self, max_parallel: Option<usize>) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn registry(&self) -> &NodeRegistry {
        self.sessions().registry()
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        self.executor.sessions()
    }

    /// Run one command on one registered node.
    pub async fn execute(&self, node: &str, command: impl Into<Command>) -> Result<CommandResult> {
        self.executor.execute(node, command).await
    }

    /// Run one command on every node named or aliased in `nodes`.
    pub async fn execute_multi<S: AsRef<str>>(
        &self,
        nodes: &[S],
        command: impl Into<Command>,
    ) -> Result<FanOutResult> {
        FanOutDispatcher::new(self.executor.clone())
            .with_max_parallel(self.max_parallel)
            .execute_multi(nodes, command)
            .await
    }

    /// Connect to every addressed node; true only if all connected.
    pub async fn establish_fleet<S: AsRef<str>>(&self, nodes: &[S]) -> Result<bool> {
        self.sessions().establish_fleet(nodes).await
    }

    pub fn resolve(&self, name_or_alias: &str) -> Result<Vec<String>> {
        self.registry().resolve(name_or_alias)
    }

    pub fn reachability(&self, node: &str) -> Result<Reachability> {
        self.registry().reachability(node)
    }

    /// Aggregate reachability across the whole registry.
    pub fn fleet_reachable(&self) -> bool {
        self.registry().fleet_reachable()
    }

    /// Close every open session.
    pub async fn disconnect_all(&self) {
        self.sessions().disconnect_all().await;
    }
}
