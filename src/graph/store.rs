//! Invariant-checked entity graph store.
//!
//! Arena-style storage: nodes and edges live in id-indexed maps with stable
//! insertion order, so snapshots and projections are reproducible. Every
//! mutating operation is atomic from the caller's perspective: all checks
//! run before the first write, and an `Err` return means the graph is
//! byte-for-byte unchanged.
//!
//! Invariants enforced here:
//! 1. A `Reference` edge is bound at creation and never rebound or nulled.
//! 2. `RawPointer`/`NullableHandle` edges may be null and may be rebound.
//! 3. Removing a node invalidates every edge targeting it instead of
//!    deleting them; the dangling state stays observable.
//! 4. At most one `OwningUnique` edge targets a node; transfer is atomic.
//! 5. A node's shared count equals its live `OwningShared` edges; the node's
//!    liveness clears when the count drops to zero.

use indexmap::IndexMap;

use crate::error::{EngineError, EngineResult};
use crate::graph::{Edge, EdgeId, EdgeKind, GraphSnapshot, Node, NodeId, NodeKind};

/// Result of dereferencing an edge in a lesson demo.
///
/// Dangling and null access are outcomes, not errors: lessons render them
/// distinctly rather than aborting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccessOutcome {
    /// The edge is valid and bound; carries the target's payload.
    Value(f64),
    /// The edge is valid but null.
    Null,
    /// The edge is dangling: its target was removed or expired.
    Dangling(NodeId),
}

/// Full copy of the store's mutable state, used for scripted transactions
/// and for the executor's strong-guarantee rollback.
#[derive(Debug, Clone)]
pub(crate) struct GraphBackup {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    next_node: u32,
    next_edge: u32,
}

/// The entity graph store.
///
/// Owned exclusively by the scenario executor's call path; all other
/// components read immutable [`GraphSnapshot`]s.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    next_node: u32,
    next_edge: u32,
    /// Open scripted transaction, if any (`begin_transaction` step op).
    tx: Option<GraphBackup>,
}

impl GraphStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Nodes =====

    /// Add a node. Always succeeds and returns a fresh identifier.
    pub fn add_node(&mut self, label: impl Into<String>, kind: NodeKind, payload: f64) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                label: label.into(),
                kind,
                payload,
                live: true,
                shared_count: 0,
            },
        );
        id
    }

    /// Remove a node: mark it dead and invalidate every edge targeting it.
    ///
    /// The dangling edges are retained, not deleted (invariant 3).
    ///
    /// # Errors
    ///
    /// `UnknownEntity` if the id is unmapped; the graph is unchanged.
    pub fn remove_node(&mut self, id: NodeId) -> EngineResult<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| EngineError::unknown_node(id))?;
        node.live = false;
        node.shared_count = 0;
        for edge in self.edges.values_mut() {
            if edge.target == Some(id) {
                edge.valid = false;
            }
        }
        Ok(())
    }

    // ===== Edges =====

    /// Add an edge of the given kind from a conceptual holder to a target
    /// node, or to nothing.
    ///
    /// # Errors
    ///
    /// - `InvariantViolation` if the kind forbids null and `target` is
    ///   absent (a reference must be bound at creation).
    /// - `InvariantViolation` if `kind` is `OwningUnique` and the target
    ///   already has a unique owner.
    /// - `UnknownEntity` if `target` names an unmapped node.
    pub fn add_edge(
        &mut self,
        kind: EdgeKind,
        holder_label: impl Into<String>,
        target: Option<NodeId>,
    ) -> EngineResult<EdgeId> {
        if target.is_none() && !kind.nullable() {
            return Err(EngineError::invariant(
                "non-null",
                format!("{kind:?} must be bound at creation"),
            ));
        }
        let target_live = match target {
            Some(node_id) => {
                let node = self
                    .nodes
                    .get(&node_id)
                    .ok_or_else(|| EngineError::unknown_node(node_id))?;
                if kind == EdgeKind::OwningUnique && self.unique_owner_count(node_id) > 0 {
                    return Err(EngineError::invariant(
                        "unique-ownership",
                        format!("node {node_id} already has a unique owner"),
                    ));
                }
                node.live
            }
            None => true,
        };

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            Edge {
                id,
                label: holder_label.into(),
                kind,
                target,
                // Binding to an already-dead node yields a dangling edge
                // immediately (use-after-free lessons script this).
                valid: target_live,
            },
        );
        if kind == EdgeKind::OwningShared && target_live {
            if let Some(node_id) = target {
                self.retain_shared(node_id);
            }
        }
        Ok(id)
    }

    /// Re-point an edge at a new target, or at nothing.
    ///
    /// A successful rebind revalidates a dangling edge: the old pointee is
    /// forgotten.
    ///
    /// # Errors
    ///
    /// - `InvariantViolation` if the kind forbids rebinding (`Reference`,
    ///   `OwningUnique` without explicit transfer) or forbids null
    ///   (`NotNullPointer` receiving absent).
    /// - `UnknownEntity` if the edge or the new target is unmapped.
    pub fn rebind(&mut self, edge_id: EdgeId, new_target: Option<NodeId>) -> EngineResult<()> {
        let edge = self
            .edges
            .get(&edge_id)
            .ok_or_else(|| EngineError::unknown_edge(edge_id))?;
        if !edge.kind.rebindable() {
            let reason = if edge.kind == EdgeKind::OwningUnique {
                "unique owner moves only via ownership transfer"
            } else {
                "a reference is bound once and never rebound"
            };
            return Err(EngineError::invariant(
                "no-rebind",
                format!("{:?} edge {edge_id}: {reason}", edge.kind),
            ));
        }
        if new_target.is_none() && !edge.kind.nullable() {
            return Err(EngineError::invariant(
                "non-null",
                format!("{:?} edge {edge_id} cannot be null", edge.kind),
            ));
        }
        let target_live = match new_target {
            Some(node_id) => {
                self.nodes
                    .get(&node_id)
                    .ok_or_else(|| EngineError::unknown_node(node_id))?
                    .live
            }
            None => true,
        };

        // All checks passed; apply. Shared owners release the old target
        // and retain the new one.
        let kind = edge.kind;
        let old_target = edge.target;
        let was_valid = edge.valid;
        if kind == EdgeKind::OwningShared {
            if let Some(node_id) = new_target {
                if target_live {
                    self.retain_shared(node_id);
                }
            }
            if was_valid {
                if let Some(node_id) = old_target {
                    self.release_shared(node_id);
                }
            }
        }
        // Re-borrow: retain/release touched the node arena.
        if let Some(edge) = self.edges.get_mut(&edge_id) {
            edge.target = new_target;
            edge.valid = target_live;
        }
        Ok(())
    }

    /// Remove an edge entirely.
    ///
    /// A live shared owner releases its target; the target expires when its
    /// last shared owner goes away.
    ///
    /// # Errors
    ///
    /// `UnknownEntity` if the id is unmapped.
    pub fn remove_edge(&mut self, edge_id: EdgeId) -> EngineResult<()> {
        let edge = self
            .edges
            .shift_remove(&edge_id)
            .ok_or_else(|| EngineError::unknown_edge(edge_id))?;
        if edge.kind == EdgeKind::OwningShared && edge.valid {
            if let Some(node_id) = edge.target {
                self.release_shared(node_id);
            }
        }
        Ok(())
    }

    /// Atomically move ownership to a new holder: create the destination
    /// edge and remove the source, with no transient two-owner state.
    ///
    /// Returns the id of the destination edge.
    ///
    /// # Errors
    ///
    /// - `InvariantViolation` if the source edge is not an owning kind.
    /// - `UnknownEntity` if the edge is unmapped.
    pub fn transfer_ownership(
        &mut self,
        edge_id: EdgeId,
        new_holder_label: impl Into<String>,
    ) -> EngineResult<EdgeId> {
        let edge = self
            .edges
            .get(&edge_id)
            .ok_or_else(|| EngineError::unknown_edge(edge_id))?;
        if !edge.kind.owning() {
            return Err(EngineError::invariant(
                "ownership-transfer",
                format!("{:?} edge {edge_id} is not an owning kind", edge.kind),
            ));
        }

        // Same target before and after, so shared counts are untouched; the
        // unique-owner count stays at one throughout.
        let new_id = EdgeId(self.next_edge);
        self.next_edge += 1;
        let moved = Edge {
            id: new_id,
            label: new_holder_label.into(),
            kind: edge.kind,
            target: edge.target,
            valid: edge.valid,
        };
        self.edges.insert(new_id, moved);
        self.edges.shift_remove(&edge_id);
        Ok(new_id)
    }

    /// Dereference an edge as a lesson demo would.
    ///
    /// Never fails on dangling or null: those are [`AccessOutcome`]s the
    /// visual layer renders distinctly.
    ///
    /// # Errors
    ///
    /// `UnknownEntity` if the id is unmapped.
    pub fn deref_edge(&self, edge_id: EdgeId) -> EngineResult<AccessOutcome> {
        let edge = self
            .edges
            .get(&edge_id)
            .ok_or_else(|| EngineError::unknown_edge(edge_id))?;
        match edge.target {
            Some(node_id) if !edge.valid => Ok(AccessOutcome::Dangling(node_id)),
            None => Ok(AccessOutcome::Null),
            Some(node_id) => {
                let node = self
                    .nodes
                    .get(&node_id)
                    .ok_or_else(|| EngineError::unknown_node(node_id))?;
                Ok(AccessOutcome::Value(node.payload))
            }
        }
    }

    // ===== Queries =====

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up an edge by id.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Resolve a node by display label (first match in insertion order).
    #[must_use]
    pub fn node_by_label(&self, label: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.label == label)
    }

    /// Resolve an edge by holder label (first match in insertion order).
    #[must_use]
    pub fn edge_by_label(&self, label: &str) -> Option<&Edge> {
        self.edges.values().find(|e| e.label == label)
    }

    /// Number of nodes (live and dead).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges (valid and dangling).
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Count of `OwningUnique` edges targeting the given node.
    #[must_use]
    pub fn unique_owner_count(&self, id: NodeId) -> usize {
        self.edges
            .values()
            .filter(|e| e.kind == EdgeKind::OwningUnique && e.valid && e.target == Some(id))
            .count()
    }

    /// Immutable view of all nodes and edges, O(nodes + edges).
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    // ===== Scripted transactions =====

    /// Open a transaction: capture the current state for a later rollback.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if a transaction is already open (no nesting).
    pub fn begin_transaction(&mut self) -> EngineResult<()> {
        if self.tx.is_some() {
            return Err(EngineError::invariant(
                "transaction",
                "a transaction is already open",
            ));
        }
        self.tx = Some(self.backup());
        Ok(())
    }

    /// Commit: discard the captured state, keeping all changes.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if no transaction is open.
    pub fn commit(&mut self) -> EngineResult<()> {
        if self.tx.take().is_none() {
            return Err(EngineError::invariant(
                "transaction",
                "commit without an open transaction",
            ));
        }
        Ok(())
    }

    /// Roll back: restore the state captured at `begin_transaction`.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` if no transaction is open.
    pub fn rollback(&mut self) -> EngineResult<()> {
        let backup = self.tx.take().ok_or_else(|| {
            EngineError::invariant("transaction", "rollback without an open transaction")
        })?;
        self.restore(backup);
        log::debug!("graph rolled back to transaction start");
        Ok(())
    }

    /// Whether a scripted transaction is open.
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Capture the full mutable state (executor strong-guarantee support).
    pub(crate) fn backup(&self) -> GraphBackup {
        GraphBackup {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            next_node: self.next_node,
            next_edge: self.next_edge,
        }
    }

    /// Restore a previously captured state. Any open scripted transaction
    /// survives (the executor restores around it).
    pub(crate) fn restore(&mut self, backup: GraphBackup) {
        self.nodes = backup.nodes;
        self.edges = backup.edges;
        self.next_node = backup.next_node;
        self.next_edge = backup.next_edge;
    }

    /// Discard everything (executor reset).
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.next_node = 0;
        self.next_edge = 0;
        self.tx = None;
    }

    // ===== Shared ownership accounting =====

    fn retain_shared(&mut self, target: NodeId) {
        if let Some(node) = self.nodes.get_mut(&target) {
            node.shared_count += 1;
        }
    }

    /// Decrement the shared count; when it reaches zero the node expires and
    /// every edge still targeting it goes dangling, weak observers included.
    fn release_shared(&mut self, target: NodeId) {
        let expired = match self.nodes.get_mut(&target) {
            Some(node) if node.shared_count > 0 => {
                node.shared_count -= 1;
                if node.shared_count == 0 {
                    node.live = false;
                    true
                } else {
                    false
                }
            }
            _ => false,
        };
        if expired {
            for edge in self.edges.values_mut() {
                if edge.target == Some(target) {
                    edge.valid = false;
                }
            }
        }
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Unique-owner exclusivity holds under arbitrary interleavings of
        /// node creation and unique-edge creation attempts.
        #[test]
        fn prop_unique_owner_at_most_one(attempts in proptest::collection::vec(0usize..4, 1..40)) {
            let mut store = GraphStore::new();
            let mut nodes = Vec::new();
            for a in attempts {
                if nodes.is_empty() || a == 0 {
                    nodes.push(store.add_node("n", NodeKind::Target, 0.0));
                } else {
                    let target = nodes[a % nodes.len()];
                    // May fail; exclusivity must hold either way.
                    let _ = store.add_edge(EdgeKind::OwningUnique, "o", Some(target));
                }
                for &n in &nodes {
                    prop_assert!(store.unique_owner_count(n) <= 1);
                }
            }
        }

        /// Shared liveness: k retains then j releases leaves live == (k > j).
        #[test]
        fn prop_shared_liveness(k in 1usize..12, j_frac in 0.0f64..1.0) {
            let mut store = GraphStore::new();
            let n = store.add_node("n", NodeKind::Resource, 0.0);
            let mut edges = Vec::new();
            for _ in 0..k {
                edges.push(store.add_edge(EdgeKind::OwningShared, "s", Some(n)).unwrap());
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let j = ((k as f64) * j_frac) as usize;
            for &e in edges.iter().take(j) {
                store.remove_edge(e).unwrap();
            }
            prop_assert_eq!(store.node(n).unwrap().live, k > j);
            prop_assert_eq!(store.node(n).unwrap().shared_count as usize, k - j);
        }
    }
}
