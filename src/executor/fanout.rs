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

//! Concurrent fan-out of one command across many nodes.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

use crate::error::Result;
use crate::output::Command;

use super::result::{CommandResult, FanOutResult};
use super::single::Executor;

/// Exit code recorded for a node whose task panicked or was aborted.
const TASK_FAILURE_CODE: i32 = -1;

/// Runs the single-node executor on many nodes at once.
#[derive(Clone, Debug)]
pub struct FanOutDispatcher {
    executor: Executor,
    max_parallel: Option<usize>,
}

impl FanOutDispatcher {
    /// One task per addressed node, no cap on concurrency.
    pub fn new(executor: Executor) -> Self {
        Self {
            executor,
            max_parallel: None,
        }
    }

    /// Cap the number of nodes running at the same time.
    pub fn with_max_parallel(mut self, max_parallel: Option<usize>) -> Self {
        self.max_parallel = max_parallel.filter(|n| *n > 0);
        self
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Execute `command` on every resolved target and wait for all of them.
    ///
    /// Aliases are expanded and repeated nodes addressed once. The returned
    /// collection has one entry per node, in completion order.
    pub async fn execute_multi<S: AsRef<str>>(
        &self,
        nodes: &[S],
        command: impl Into<Command>,
    ) -> Result<FanOutResult> {
        let command = command.into();
        let targets = self.executor.sessions().registry().resolve_all(nodes)?;
        let semaphore = self.max_parallel.map(|n| Arc::new(Semaphore::new(n)));

        tracing::info!(
            "Dispatching '{}' to {} node(s): {}",
            command,
            targets.len(),
            targets.join(", ")
        );

        let mut tasks: FuturesUnordered<_> = targets
            .into_iter()
            .map(|node| {
                let executor = self.executor.clone();
                let task_node = node.clone();
                let task_command = command.clone();
                let semaphore = semaphore.clone();

                let handle = tokio::spawn(async move {
                    let _permit = match semaphore {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    executor.execute(&task_node, task_command).await
                });

                async move { (node, handle.await) }
            })
            .collect();

        let mut results = FanOutResult::with_capacity(tasks.len());
        while let Some((node, joined)) = tasks.next().await {
            results.push(collect_result(&node, &command, joined));
        }

        Ok(results)
    }
}

/// Convert a finished task into the node's result, whatever happened to it.
fn collect_result(
    node: &str,
    command: &Command,
    joined: std::result::Result<Result<CommandResult>, JoinError>,
) -> CommandResult {
    match joined {
        Ok(Ok(result)) => result.attributed_to(node),
        Ok(Err(e)) => {
            tracing::error!("Execution failed for node {}: {}", node, e);
            CommandResult::failure(node, command.text(), TASK_FAILURE_CODE, vec![e.to_string()])
        }
        Err(e) => {
            tracing::error!("Task failed for node {}: {}", node, e);
            let reason = if e.is_panic() {
                format!("Task panicked: {e}")
            } else {
                format!("Task execution failed: {e}")
            };
            CommandResult::failure(node, command.text(), TASK_FAILURE_CODE, vec![reason])
        }
    }
}
