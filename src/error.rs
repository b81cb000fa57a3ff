//! Error types for ownsim.
//!
//! All fallible operations return `Result<T, EngineError>` instead of
//! panicking. Every error is recoverable: the worst outcome anywhere in the
//! engine is a rejected operation that leaves state unchanged.

use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Unified error type for all engine operations.
///
/// # Design
///
/// Errors are surfaced synchronously to the caller (the host UI decides how
/// to display them). Dangling access is deliberately *not* an error variant:
/// it is a warning event (see [`crate::scenario::executor::EngineEvent`]),
/// because the pedagogical point is to visualize undefined behavior rather
/// than crash the tool. Metric overflow is clamped internally and never
/// propagates.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An operation referenced a node or edge identifier not present in the
    /// store. The graph is unchanged.
    #[error("unknown entity: {entity}")]
    UnknownEntity {
        /// Description of the missing entity (id or label).
        entity: String,
    },

    /// An operation would break a fixed data-model invariant. The graph is
    /// unchanged.
    #[error("invariant violation [{invariant}]: {message}")]
    InvariantViolation {
        /// Short name of the violated invariant.
        invariant: &'static str,
        /// What the operation attempted.
        message: String,
    },

    /// `advance()` or `load()` called in a state that does not accept it.
    /// No state change occurs.
    #[error("operation out of sequence: executor is {state}")]
    OutOfSequence {
        /// The executor state at the time of the call.
        state: String,
    },

    /// Invalid configuration parameter.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Schema validation error.
    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create an error for an unmapped node id.
    #[must_use]
    pub fn unknown_node(id: crate::graph::NodeId) -> Self {
        Self::UnknownEntity {
            entity: format!("node {id}"),
        }
    }

    /// Create an error for an unmapped edge id.
    #[must_use]
    pub fn unknown_edge(id: crate::graph::EdgeId) -> Self {
        Self::UnknownEntity {
            entity: format!("edge {id}"),
        }
    }

    /// Create an error for an unresolved label selector.
    #[must_use]
    pub fn unknown_label(label: impl Into<String>) -> Self {
        Self::UnknownEntity {
            entity: format!("label '{}'", label.into()),
        }
    }

    /// Create an invariant violation with the violated invariant named.
    #[must_use]
    pub fn invariant(invariant: &'static str, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            invariant,
            message: message.into(),
        }
    }

    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check whether this error reports an invariant violation.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }

    /// Check whether this error reports an unknown entity.
    #[must_use]
    pub const fn is_unknown_entity(&self) -> bool {
        matches!(self, Self::UnknownEntity { .. })
    }
}
