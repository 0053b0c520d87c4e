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

//! Node registry.
//!
//! The registry is populated once and never changes shape afterwards. Each
//! entry owns two pieces of mutable state: the node's session slot (written
//! only by [`crate::session::SessionManager`]) and an atomic reachability cell.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{FleetError, Result};
use crate::node::NodeDescriptor;
use crate::transport::Session;

/// Built-in alias that expands to every registered node.
pub const ALL_NODES_ALIAS: &str = "all";

/// Outcome of the most recent connection attempt for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    /// No attempt has been made yet
    Unknown,
    Reachable,
    Unreachable,
}

impl Reachability {
    fn as_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Reachable => 1,
            Self::Unreachable => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Reachable,
            2 => Self::Unreachable,
            _ => Self::Unknown,
        }
    }
}

pub(crate) type SessionSlot = Mutex<Option<Arc<dyn Session>>>;

pub(crate) struct NodeEntry {
    pub(crate) descriptor: NodeDescriptor,
    pub(crate) session: SessionSlot,
    reachability: AtomicU8,
}

impl NodeEntry {
    fn new(descriptor: NodeDescriptor) -> Self {
        Self {
            descriptor,
            session: Mutex::new(None),
            reachability: AtomicU8::new(Reachability::Unknown.as_u8()),
        }
    }

    pub(crate) fn reachability(&self) -> Reachability {
        Reachability::from_u8(self.reachability.load(Ordering::Acquire))
    }

    pub(crate) fn set_reachability(&self, state: Reachability) {
        self.reachability.store(state.as_u8(), Ordering::Release);
    }
}

/// Named nodes plus alias groups for broadcast addressing.
pub struct NodeRegistry {
    entries: HashMap<String, NodeEntry>,
    order: Vec<String>,
    aliases: HashMap<String, Vec<String>>,
}

impl NodeRegistry {
    /// Populate a registry from descriptors.
    ///
    /// Fails with [`FleetError::Config`] if two descriptors share a name.
    pub fn register(descriptors: Vec<NodeDescriptor>) -> Result<Self> {
        let mut entries = HashMap::with_capacity(descriptors.len());
        let mut order = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let name = descriptor.name.clone();
            if name.is_empty() {
                return Err(FleetError::Config("node name cannot be empty".to_string()));
            }
            if name == ALL_NODES_ALIAS {
                return Err(FleetError::Config(format!(
                    "node name '{ALL_NODES_ALIAS}' is reserved for the broadcast alias"
                )));
            }
            if entries.contains_key(&name) {
                return Err(FleetError::Config(format!("duplicate node name '{name}'")));
            }
            order.push(name.clone());
            entries.insert(name, NodeEntry::new(descriptor));
        }

        Ok(Self {
            entries,
            order,
            aliases: HashMap::new(),
        })
    }

    /// Add a named group of nodes.
    ///
    /// Members must be registered node names; aliases do not nest.
    pub fn with_alias(mut self, alias: impl Into<String>, members: Vec<String>) -> Result<Self> {
        let alias = alias.into();
        if alias == ALL_NODES_ALIAS {
            return Err(FleetError::Config(format!(
                "alias '{ALL_NODES_ALIAS}' is built in and cannot be redefined"
            )));
        }
        if self.entries.contains_key(&alias) {
            return Err(FleetError::Config(format!(
                "alias '{alias}' shadows a node with the same name"
            )));
        }
        if self.aliases.contains_key(&alias) {
            return Err(FleetError::Config(format!("duplicate alias '{alias}'")));
        }
        if let Some(missing) = members.iter().find(|m| !self.entries.contains_key(*m)) {
            return Err(FleetError::Config(format!(
                "alias '{alias}' references unknown node '{missing}'"
            )));
        }

        self.aliases.insert(alias, members);
        Ok(self)
    }

    /// Expand an alias into node names, or return `[name]` for a node.
    pub fn resolve(&self, name_or_alias: &str) -> Result<Vec<String>> {
        if self.entries.contains_key(name_or_alias) {
            return Ok(vec![name_or_alias.to_string()]);
        }
        if name_or_alias == ALL_NODES_ALIAS {
            return Ok(self.order.clone());
        }
        self.aliases
            .get(name_or_alias)
            .cloned()
            .ok_or_else(|| FleetError::UnknownNode(name_or_alias.to_string()))
    }

    /// Resolve several targets, keeping first-seen order and dropping repeats.
    pub fn resolve_all<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for target in targets {
            for name in self.resolve(target.as_ref())? {
                if seen.insert(name.clone()) {
                    resolved.push(name);
                }
            }
        }
        Ok(resolved)
    }

    pub fn descriptor(&self, name: &str) -> Result<&NodeDescriptor> {
        self.entry(name).map(|entry| &entry.descriptor)
    }

    pub(crate) fn entry(&self, name: &str) -> Result<&NodeEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| FleetError::UnknownNode(name.to_string()))
    }

    /// Registered node names in registration order.
    pub fn node_names(&self) -> &[String] {
        &self.order
    }

    /// Configured aliases, sorted by name. The built-in `all` is not listed.
    pub fn aliases(&self) -> Vec<(&str, &[String])> {
        let mut aliases: Vec<_> = self
            .aliases
            .iter()
            .map(|(name, members)| (name.as_str(), members.as_slice()))
            .collect();
        aliases.sort_by(|a, b| a.0.cmp(b.0));
        aliases
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn reachability(&self, name: &str) -> Result<Reachability> {
        self.entry(name).map(NodeEntry::reachability)
    }

    /// Aggregate view: false as soon as any node's last attempt failed.
    pub fn fleet_reachable(&self) -> bool {
        self.entries
            .values()
            .all(|entry| entry.reachability() != Reachability::Unreachable)
    }

    /// Whether the node currently holds a live session handle.
    pub async fn has_session(&self, name: &str) -> Result<bool> {
        let entry = self.entry(name)?;
        Ok(entry.session.lock().await.is_some())
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.order)
            .field("aliases", &self.aliases)
            .finish()
    }
}
