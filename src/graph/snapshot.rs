//! Immutable graph snapshots.
//!
//! The render projection and all tests consume these; structural equality
//! (`PartialEq`) over node/edge sets and attributes is what the
//! strong-guarantee rollback property is stated in terms of.

use serde::{Deserialize, Serialize};

use crate::graph::{Edge, EdgeId, EdgeKind, Node, NodeId};

/// An immutable view of all nodes and edges at a point in time.
///
/// Entries appear in arena insertion order, so two snapshots of the same
/// history compare equal byte for byte.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// All nodes, live and dead.
    pub nodes: Vec<Node>,
    /// All edges, valid and dangling.
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up an edge by id.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Find a node by display label (first match).
    #[must_use]
    pub fn node_by_label(&self, label: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.label == label)
    }

    /// Find an edge by holder label (first match).
    #[must_use]
    pub fn edge_by_label(&self, label: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.label == label)
    }

    /// All edges whose target is the given node, dangling ones included.
    pub fn edges_targeting(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.target == Some(id))
    }

    /// Count of valid `OwningUnique` edges targeting the given node.
    #[must_use]
    pub fn unique_owner_count(&self, id: NodeId) -> usize {
        self.edges
            .iter()
            .filter(|e| e.kind == EdgeKind::OwningUnique && e.valid && e.target == Some(id))
            .count()
    }

    /// Number of live nodes.
    #[must_use]
    pub fn live_node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.live).count()
    }

    /// Number of dangling edges.
    #[must_use]
    pub fn dangling_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| !e.valid).count()
    }
}
