//! Entity graph: nodes, edges, and their semantic kind tables.
//!
//! The graph models the abstract entities a lesson talks about: objects and
//! resources as [`Node`]s, pointer/reference/handle/ownership relations as
//! [`Edge`]s. Each edge kind fixes its nullability and reassignability rules
//! at creation; the store (see [`store`]) enforces them on every mutation.

pub mod snapshot;
pub mod store;

use serde::{Deserialize, Serialize};

pub use snapshot::GraphSnapshot;
pub use store::{AccessOutcome, GraphStore};

/// A unique, stable identifier for a node.
///
/// Implements `Ord` for deterministic iteration; arenas are keyed by id in
/// insertion order, so snapshots are reproducible run to run.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// A unique, stable identifier for an edge.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Semantic category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A pointee: the object a lesson's pointers and references refer to.
    Target,
    /// A second name for an existing object (aliasing lessons).
    Alias,
    /// An owned resource (file handles, buffers, locks).
    Resource,
}

/// Semantic category of an edge, fixing its nullability and reassignability
/// rules at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// May be null, may be rebound, no lifetime guarantees.
    RawPointer,
    /// Like a raw pointer but checked before use in lessons.
    NullableHandle,
    /// May be rebound but never null.
    NotNullPointer,
    /// Bound once at creation; never null, never rebound.
    Reference,
    /// Exclusive owner; at most one per target, moved via transfer only.
    OwningUnique,
    /// Shared owner; the live count of these keeps the target alive.
    OwningShared,
    /// Observes a shared target without keeping it alive.
    WeakObserver,
}

impl EdgeKind {
    /// Whether an edge of this kind may have an absent target.
    #[must_use]
    pub const fn nullable(self) -> bool {
        !matches!(self, Self::Reference | Self::NotNullPointer)
    }

    /// Whether an edge of this kind may be re-pointed after creation.
    ///
    /// `OwningUnique` is excluded: moving a unique owner goes through the
    /// explicit transfer operation, never plain rebinding.
    #[must_use]
    pub const fn rebindable(self) -> bool {
        !matches!(self, Self::Reference | Self::OwningUnique)
    }

    /// Whether this kind participates in ownership transfer.
    #[must_use]
    pub const fn owning(self) -> bool {
        matches!(self, Self::OwningUnique | Self::OwningShared)
    }

    /// Whether an edge of this kind keeps its target alive.
    #[must_use]
    pub const fn keeps_alive(self) -> bool {
        self.owning()
    }
}

/// An object or resource in the entity graph.
///
/// Destroyed only via explicit removal; removal cascades invalidation to
/// every edge targeting it (the dangling state stays observable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Display label.
    pub label: String,
    /// Semantic category.
    pub kind: NodeKind,
    /// Numeric payload shown by the visual layer.
    pub payload: f64,
    /// Liveness flag; cleared on removal or when the last shared owner
    /// releases the node.
    pub live: bool,
    /// Count of live `OwningShared` edges targeting this node.
    pub shared_count: u32,
}

/// A pointer/reference/handle relation from a conceptual holder to a target
/// node (or to nothing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier.
    pub id: EdgeId,
    /// Display label of the conceptual holder.
    pub label: String,
    /// Semantic category; fixes nullability and reassignability.
    pub kind: EdgeKind,
    /// Target node, or `None` for null.
    pub target: Option<NodeId>,
    /// False once dangling (target removed or expired).
    pub valid: bool,
}
