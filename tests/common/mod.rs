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

//! In-memory transport used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use fleet_exec::{
    Credential, ExecError, Fleet, FleetError, NodeDescriptor, NodeRegistry, RawOutput, Session,
    Transport,
};

/// What a fake session does when asked to run a command.
#[derive(Debug, Clone)]
pub enum Behavior {
    Reply(RawOutput),
    /// Sleep, then reply.
    Delayed(Duration, RawOutput),
    /// The channel cannot be opened; the session is dead.
    ChannelDrop,
    /// The channel closes without an exit status.
    NoExitStatus,
    /// The task running the command panics.
    Panic,
}

impl Behavior {
    pub fn ok(stdout: &str) -> Self {
        Self::Reply(RawOutput::new(stdout.as_bytes().to_vec(), Vec::new(), 0))
    }

    pub fn exit(status: u32, stderr: &str) -> Self {
        Self::Reply(RawOutput::new(Vec::new(), stderr.as_bytes().to_vec(), status))
    }

    pub fn delayed(millis: u64, stdout: &str) -> Self {
        Self::Delayed(
            Duration::from_millis(millis),
            RawOutput::new(stdout.as_bytes().to_vec(), Vec::new(), 0),
        )
    }
}

#[derive(Default)]
struct State {
    refused: HashSet<String>,
    replies: HashMap<String, Behavior>,
    once: HashMap<String, VecDeque<Behavior>>,
    stale_first: HashMap<String, Duration>,
    connects: HashMap<String, usize>,
    execs: HashMap<String, usize>,
    commands: Vec<(String, String)>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn record_exec(&self, node: &str, command: &str) -> MutexGuard<'_, State> {
        let mut state = self.state();
        *state.execs.entry(node.to_string()).or_default() += 1;
        state.commands.push((node.to_string(), command.to_string()));
        state
    }

    fn next_behavior(&self, node: &str, command: &str) -> Behavior {
        let mut state = self.record_exec(node, command);
        if let Some(behavior) = state.once.get_mut(node).and_then(VecDeque::pop_front) {
            return behavior;
        }
        state
            .replies
            .get(node)
            .cloned()
            .unwrap_or_else(|| Behavior::ok("ok\n"))
    }
}

/// Scripted transport. Every node connects and answers `ok` unless told otherwise.
#[derive(Default)]
pub struct FakeTransport {
    inner: Arc<Inner>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail every connect to `node` as an authentication error would.
    pub fn refuse(&self, node: &str) {
        self.inner.state().refused.insert(node.to_string());
    }

    pub fn accept(&self, node: &str) {
        self.inner.state().refused.remove(node);
    }

    /// Answer every command on `node` with `behavior`.
    pub fn respond(&self, node: &str, behavior: Behavior) {
        self.inner
            .state()
            .replies
            .insert(node.to_string(), behavior);
    }

    /// Answer the next command on `node` with `behavior`, then fall back.
    pub fn respond_once(&self, node: &str, behavior: Behavior) {
        self.inner
            .state()
            .once
            .entry(node.to_string())
            .or_default()
            .push_back(behavior);
    }

    /// Make the first session opened to `node` go dead: every command on it
    /// waits `millis`, then finds the channel unavailable.
    pub fn stale_first_session(&self, node: &str, millis: u64) {
        self.inner
            .state()
            .stale_first
            .insert(node.to_string(), Duration::from_millis(millis));
    }

    pub fn connects(&self, node: &str) -> usize {
        self.inner.state().connects.get(node).copied().unwrap_or(0)
    }

    pub fn total_connects(&self) -> usize {
        self.inner.state().connects.values().sum()
    }

    pub fn execs(&self, node: &str) -> usize {
        self.inner.state().execs.get(node).copied().unwrap_or(0)
    }

    /// Every `(node, command)` pair sent, in order.
    pub fn commands(&self) -> Vec<(String, String)> {
        self.inner.state().commands.clone()
    }

    /// Highest number of commands observed running at once.
    pub fn peak_running(&self) -> usize {
        self.inner.peak_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn Session>, FleetError> {
        let (generation, refused) = {
            let mut state = self.inner.state();
            let connects = state.connects.entry(node.name.clone()).or_default();
            *connects += 1;
            (*connects, state.refused.contains(&node.name))
        };
        if refused {
            return Err(FleetError::connection(
                &node.name,
                "Password authentication failed.",
            ));
        }
        Ok(Arc::new(FakeSession {
            node: node.name.clone(),
            generation,
            closed: AtomicBool::new(false),
            inner: Arc::clone(&self.inner),
        }))
    }
}

/// Session handed out by [`FakeTransport`].
struct FakeSession {
    node: String,
    /// 1 for the first session opened to `node`, 2 for the next, and so on.
    generation: usize,
    closed: AtomicBool,
    inner: Arc<Inner>,
}

#[async_trait]
impl Session for FakeSession {
    async fn exec(&self, command: &str) -> Result<RawOutput, ExecError> {
        let stale = match self.generation {
            1 => self.inner.state().stale_first.get(&self.node).copied(),
            _ => None,
        };
        if let Some(delay) = stale {
            drop(self.inner.record_exec(&self.node, command));
            tokio::time::sleep(delay).await;
            return Err(ExecError::ChannelUnavailable(
                "connection reset by peer".to_string(),
            ));
        }
        let behavior = self.inner.next_behavior(&self.node, command);
        if let Behavior::Panic = behavior {
            panic!("transport blew up on {}", self.node);
        }

        let now = self.inner.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_running.fetch_max(now, Ordering::SeqCst);

        let outcome = match behavior {
            Behavior::Reply(raw) => Ok(raw),
            Behavior::Delayed(delay, raw) => {
                tokio::time::sleep(delay).await;
                Ok(raw)
            }
            Behavior::ChannelDrop => Err(ExecError::ChannelUnavailable(
                "channel open failed".to_string(),
            )),
            Behavior::NoExitStatus => Err(ExecError::Failed(
                "closed without exit status".to_string(),
            )),
            Behavior::Panic => unreachable!(),
        };

        self.inner.running.fetch_sub(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExecError::Failed("session closed while running".to_string()));
        }
        outcome
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Registry of `names`, each at a distinct loopback port.
pub fn registry(names: &[&str]) -> NodeRegistry {
    let nodes = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            NodeDescriptor::new(
                *name,
                "127.0.0.1",
                2200 + i as u16,
                "root",
                Credential::password("secret"),
            )
        })
        .collect();
    NodeRegistry::register(nodes).unwrap()
}

/// Fleet over `names` backed by `transport`.
pub fn fleet(names: &[&str], transport: &Arc<FakeTransport>) -> Fleet {
    Fleet::new(registry(names), transport.clone())
}
