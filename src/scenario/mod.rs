//! Scenario and step descriptors.
//!
//! A scenario is an ordered script of operations applied one at a time to
//! the entity graph under explicit user advancement. Scenarios are
//! YAML-first: lesson content ships them as data, the engine validates them
//! on load.
//!
//! # Example
//!
//! ```yaml
//! id: reference_rebind
//! label: "References cannot be rebound"
//! guarantee: strong
//! layout: hierarchical
//! steps:
//!   - op: create
//!     label: target
//!     kind: target
//!     payload: 42
//!     message: "An object 'target' is created holding 42."
//!   - op: bind
//!     label: R
//!     kind: reference
//!     target: target
//!     message: "A reference R is bound to 'target'."
//! ```

pub mod executor;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{EngineError, EngineResult};
use crate::graph::{EdgeKind, NodeKind};

pub use executor::{EngineEvent, ExecState, ScenarioExecutor, StepOutcome};

/// Safety classification of a step, as taught by the lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyClass {
    /// Well-defined and safe.
    #[default]
    Safe,
    /// Legal but implementation-defined behavior.
    ImplementationDefined,
    /// Undefined behavior; visualized, never executed for real.
    UndefinedBehavior,
    /// Unsafe pattern made safe by a runtime check.
    Checked,
}

impl SafetyClass {
    /// Announcement priority for events carrying this classification.
    #[must_use]
    pub const fn priority(self) -> crate::announce::Priority {
        match self {
            Self::Safe | Self::Checked => crate::announce::Priority::Polite,
            Self::ImplementationDefined | Self::UndefinedBehavior => {
                crate::announce::Priority::Assertive
            }
        }
    }
}

/// Step application strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guarantee {
    /// Apply immediately; on failure partial effects may remain. Used only
    /// for illustrating unsafe patterns.
    Basic,
    /// Snapshot before each step and restore on failure; the graph is
    /// unchanged when a step is rejected.
    #[default]
    Strong,
}

/// Placement rule for the render projection, selected per scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutRule {
    /// Nodes above, edges below, tiered by kind.
    #[default]
    Hierarchical,
    /// Entities on a circle.
    Radial,
    /// Row-major grid.
    Grid,
}

/// One scripted operation. Targets are selected by display label and
/// resolved against the live graph at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StepOp {
    /// Create a node.
    Create {
        /// Display label of the new node.
        label: String,
        /// Node kind.
        kind: NodeKind,
        /// Numeric payload.
        #[serde(default)]
        payload: f64,
    },
    /// Create an edge from a conceptual holder to a node (or to nothing).
    Bind {
        /// Holder label of the new edge.
        label: String,
        /// Edge kind.
        kind: EdgeKind,
        /// Target node label, or absent for null.
        #[serde(default)]
        target: Option<String>,
    },
    /// Re-point an existing edge.
    Rebind {
        /// Holder label of the edge.
        edge: String,
        /// New target node label, or absent for null.
        #[serde(default)]
        target: Option<String>,
    },
    /// Rebind an edge to nothing.
    Nullify {
        /// Holder label of the edge.
        edge: String,
    },
    /// Remove a node, cascading invalidation to edges targeting it.
    RemoveTarget {
        /// Label of the node to remove.
        node: String,
    },
    /// Atomically move an owning edge to a new holder.
    TransferOwnership {
        /// Holder label of the source edge.
        edge: String,
        /// Holder label for the destination edge.
        new_holder: String,
    },
    /// Dereference an edge; dangling or null access surfaces as a warning
    /// event, never a fault.
    Deref {
        /// Holder label of the edge.
        edge: String,
    },
    /// Open a transaction (two-phase construction lessons).
    BeginTransaction,
    /// Commit the open transaction.
    Commit,
    /// Roll back to the transaction start.
    Rollback,
}

/// One step of a scenario: an operation, its safety classification, and a
/// narrative message template.
///
/// Message templates may use `{index}` (1-based step number) and `{total}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// The operation to apply.
    #[serde(flatten)]
    pub op: StepOp,
    /// Safety classification.
    #[serde(default)]
    pub safety: SafetyClass,
    /// Narrative message template.
    pub message: String,
}

impl Step {
    /// Render the narrative message for a given position in the script.
    #[must_use]
    pub fn render_message(&self, index: usize, total: usize) -> String {
        self.message
            .replace("{index}", &(index + 1).to_string())
            .replace("{total}", &total.to_string())
    }
}

/// A named, ordered script of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Stable identifier; also seeds the metric formulas.
    #[validate(length(min = 1))]
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub label: String,
    /// Step application strategy.
    #[serde(default)]
    pub guarantee: Guarantee,
    /// Placement rule for the render projection.
    #[serde(default)]
    pub layout: LayoutRule,
    /// The ordered steps.
    #[validate(length(min = 1))]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a scenario from a YAML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `YamlParse` on malformed YAML and `Validation` on schema
    /// violations (empty id, no steps).
    pub fn from_yaml(yaml: &str) -> EngineResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, plus everything
    /// [`Self::from_yaml`] returns.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Deterministic seed derived from the scenario identity (FNV-1a).
    ///
    /// Metric formula phases derive from this, so two runs of the same
    /// scenario animate identically.
    #[must_use]
    pub fn seed(&self) -> u64 {
        fnv1a(self.id.as_bytes())
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the script is empty (never true for a validated scenario).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// FNV-1a 64-bit hash; tiny, stable, and dependency-free.
pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Convenience builder for assembling scenarios in host code without YAML.
#[derive(Debug, Default)]
pub struct ScenarioBuilder {
    id: String,
    label: String,
    guarantee: Guarantee,
    layout: LayoutRule,
    steps: Vec<Step>,
}

impl ScenarioBuilder {
    /// Start a builder with the given scenario id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the human-readable title.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the step application strategy.
    #[must_use]
    pub const fn guarantee(mut self, guarantee: Guarantee) -> Self {
        self.guarantee = guarantee;
        self
    }

    /// Set the layout rule.
    #[must_use]
    pub const fn layout(mut self, layout: LayoutRule) -> Self {
        self.layout = layout;
        self
    }

    /// Append a step with an explicit safety class.
    #[must_use]
    pub fn step_with_safety(
        mut self,
        op: StepOp,
        safety: SafetyClass,
        message: impl Into<String>,
    ) -> Self {
        self.steps.push(Step {
            op,
            safety,
            message: message.into(),
        });
        self
    }

    /// Append a `Safe` step.
    #[must_use]
    pub fn step(self, op: StepOp, message: impl Into<String>) -> Self {
        self.step_with_safety(op, SafetyClass::Safe, message)
    }

    /// Finish and validate.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the id is empty or there are no steps.
    pub fn build(self) -> EngineResult<Scenario> {
        let scenario = Scenario {
            id: self.id,
            label: self.label,
            guarantee: self.guarantee,
            layout: self.layout,
            steps: self.steps,
        };
        scenario.validate().map_err(EngineError::from)?;
        Ok(scenario)
    }
}
