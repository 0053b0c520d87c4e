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

//! Session lifecycle per node.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{FleetError, Result};
use crate::registry::{NodeRegistry, Reachability};
use crate::transport::{Session, Transport};

/// Opens, caches and drops the one live session each node may have.
pub struct SessionManager {
    registry: Arc<NodeRegistry>,
    transport: Arc<dyn Transport>,
}

impl SessionManager {
    pub fn new(registry: Arc<NodeRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Return the node's live session, opening one if the slot is empty.
    ///
    /// A cached session is returned without any health check. On failure the
    /// node is marked unreachable and [`FleetError::Connection`] is returned.
    pub async fn ensure_session(&self, node: &str) -> Result<Arc<dyn Session>> {
        let entry = self.registry.entry(node)?;

        // Holding the slot lock across connect keeps one session per node
        let mut slot = entry.session.lock().await;
        if let Some(session) = slot.as_ref() {
            debug!("Reusing session for {}", node);
            return Ok(Arc::clone(session));
        }

        debug!("Opening session to {}", entry.descriptor);
        match self.transport.connect(&entry.descriptor).await {
            Ok(session) => {
                *slot = Some(Arc::clone(&session));
                entry.set_reachability(Reachability::Reachable);
                info!("Connected to {}", entry.descriptor);
                Ok(session)
            }
            Err(e) => {
                entry.set_reachability(Reachability::Unreachable);
                warn!("Connection to {} failed: {}", entry.descriptor, e);
                Err(match e {
                    FleetError::Connection { .. } => e,
                    other => FleetError::connection(node, other),
                })
            }
        }
    }

    /// Drop `stale` from the node's slot so the next [`ensure_session`] reconnects.
    ///
    /// Nothing happens if the slot already holds a different session, which
    /// means another caller has reconnected in the meantime.
    ///
    /// [`ensure_session`]: SessionManager::ensure_session
    pub async fn invalidate(&self, node: &str, stale: &Arc<dyn Session>) -> Result<()> {
        let entry = self.registry.entry(node)?;
        let removed = {
            let mut slot = entry.session.lock().await;
            let still_current = slot
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, stale));
            if still_current {
                slot.take()
            } else {
                None
            }
        };
        match removed {
            Some(session) => {
                debug!("Dropping stale session for {}", node);
                session.close().await;
            }
            None => debug!("Session for {} was already replaced", node),
        }
        Ok(())
    }

    /// Close and forget the node's session, whichever it is.
    async fn drop_session(&self, node: &str) -> Result<()> {
        let entry = self.registry.entry(node)?;
        let session = entry.session.lock().await.take();
        if let Some(session) = session {
            session.close().await;
        }
        Ok(())
    }

    /// Connect to every addressed node and report whether all succeeded.
    ///
    /// Unknown names fail the whole call before any connection is attempted.
    pub async fn establish_fleet<S: AsRef<str>>(&self, nodes: &[S]) -> Result<bool> {
        let targets = self.registry.resolve_all(nodes)?;

        let attempts = targets.iter().map(|node| async move {
            let ok = self.ensure_session(node).await.is_ok();
            (node.as_str(), ok)
        });
        let outcomes = join_all(attempts).await;

        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(node, _)| *node)
            .collect();

        if failed.is_empty() {
            info!("All {} node(s) reachable", targets.len());
            Ok(true)
        } else {
            warn!(
                "{} of {} node(s) unreachable: {}",
                failed.len(),
                targets.len(),
                failed.join(", ")
            );
            Ok(false)
        }
    }

    /// Close and forget every session.
    pub async fn disconnect_all(&self) {
        for node in self.registry.node_names() {
            if let Err(e) = self.drop_session(node).await {
                warn!("Failed to tear down session for {}: {}", node, e);
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
