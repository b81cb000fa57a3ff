//! # ownsim
//!
//! Concept simulation engine for interactive resource-management lessons
//! (aliasing, ownership, nullability, exception-safety levels).
//!
//! The engine models abstract entities and their relationships as a graph
//! of nodes and edges, advances through scripted scenarios that mutate the
//! graph under semantic invariants ("a reference can never be null or
//! rebound"), and drives deterministic synthetic metrics that animate
//! safety/performance indicators. Rendering, styling, and text delivery are
//! the host's concern: the engine emits renderer-agnostic draw descriptors
//! and plain-text announcements through an injected sink.
//!
//! ## Example
//!
//! ```rust
//! use ownsim::prelude::*;
//!
//! let scenario = ScenarioBuilder::new("move_semantics")
//!     .step(
//!         StepOp::Create {
//!             label: "buf".to_string(),
//!             kind: NodeKind::Resource,
//!             payload: 8.0,
//!         },
//!         "A buffer is created.",
//!     )
//!     .build()?;
//!
//! let mut engine = ScenarioExecutor::new(Box::new(NullAnnouncer));
//! engine.load(scenario)?;
//! engine.advance()?;
//! engine.tick(1.0 / 60.0);
//!
//! let frame = engine.render(&ownsim::metrics::default_channels());
//! assert!(!frame.is_empty());
//! # Ok::<(), ownsim::EngineError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::missing_const_for_fn,  // Many functions can't be const in stable Rust
    clippy::must_use_candidate
)]

pub mod announce;
pub mod clock;
pub mod config;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod projection;
pub mod scenario;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::announce::{Announcer, BufferAnnouncer, NullAnnouncer, Priority};
    pub use crate::clock::{SimClock, SimTime};
    pub use crate::config::EngineConfig;
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::graph::{EdgeKind, GraphSnapshot, GraphStore, NodeKind};
    pub use crate::metrics::{ChannelSpec, FormulaId, MetricsContext};
    pub use crate::projection::{project, DrawDescriptor};
    pub use crate::scenario::{
        ExecState, Guarantee, LayoutRule, SafetyClass, Scenario, ScenarioBuilder,
        ScenarioExecutor, StepOp,
    };
}

/// Re-export for public API.
pub use error::{EngineError, EngineResult};
