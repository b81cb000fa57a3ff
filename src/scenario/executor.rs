//! Scenario step executor.
//!
//! A finite state machine that applies one scripted step per explicit
//! `advance()` call, never on a timer. The executor owns the graph store and
//! the simulation clock; metrics and projection read immutable snapshots.
//!
//! State machine:
//!
//! ```text
//! Idle → StepReady → StepExecuting → StepComplete → (StepReady | ScenarioComplete)
//! ```
//!
//! A failed step leaves the machine in `StepReady`. Under the strong
//! guarantee the graph is restored to its pre-step snapshot before the error
//! is surfaced; under the basic guarantee partial effects may remain (used
//! only to illustrate unsafe patterns).

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::announce::{Announcer, Priority};
use crate::clock::{SimClock, SimTime};
use crate::error::{EngineError, EngineResult};
use crate::graph::{AccessOutcome, EdgeId, GraphSnapshot, GraphStore, NodeId};
use crate::metrics::MetricsContext;
use crate::scenario::{Guarantee, LayoutRule, SafetyClass, Scenario, StepOp};

/// Executor states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecState {
    /// No scenario loaded.
    Idle,
    /// A step is ready; `advance()` will execute it.
    StepReady,
    /// A step is being applied (transient; never observable between calls).
    StepExecuting,
    /// The last step completed; `advance()` moves on.
    StepComplete,
    /// All steps done. Terminal until `reset()`.
    ScenarioComplete,
}

impl std::fmt::Display for ExecState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::StepReady => "StepReady",
            Self::StepExecuting => "StepExecuting",
            Self::StepComplete => "StepComplete",
            Self::ScenarioComplete => "ScenarioComplete",
        };
        f.write_str(name)
    }
}

/// What an `advance()` call did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The ready step was applied; carries its rendered message.
    Applied {
        /// Zero-based index of the applied step.
        index: usize,
        /// Rendered narrative message.
        message: String,
    },
    /// Moved from `StepComplete` to `StepReady`; nothing executed.
    Ready,
    /// Moved from `StepComplete` to `ScenarioComplete`.
    Finished,
}

/// Auditable record of something the executor did or observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A step was applied successfully.
    StepApplied {
        /// Zero-based step index.
        index: usize,
        /// Safety classification of the step.
        safety: SafetyClass,
        /// Rendered narrative message.
        message: String,
    },
    /// A step was rejected; the graph is unchanged under the strong
    /// guarantee.
    StepRejected {
        /// Zero-based step index.
        index: usize,
        /// Display form of the error.
        error: String,
    },
    /// A dereference touched a dangling edge. Warning, not a fault.
    DanglingAccess {
        /// The dangling edge.
        edge: EdgeId,
        /// The removed or expired target it still points at.
        target: NodeId,
    },
    /// A dereference touched a null edge.
    NullAccess {
        /// The null edge.
        edge: EdgeId,
    },
    /// A strong-guarantee restore or scripted rollback ran.
    RolledBack {
        /// Zero-based step index that triggered it.
        index: usize,
    },
}

/// The scenario step executor.
///
/// Single-threaded and non-reentrant: user-driven `advance()`/`reset()` and
/// the host's per-frame `tick()` both run on the host's event loop and never
/// interleave mid-operation.
pub struct ScenarioExecutor {
    scenario: Option<Scenario>,
    state: ExecState,
    cursor: usize,
    store: GraphStore,
    clock: SimClock,
    announcer: Box<dyn Announcer>,
    events: Vec<EngineEvent>,
}

impl std::fmt::Debug for ScenarioExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioExecutor")
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("scenario", &self.scenario.as_ref().map(|s| &s.id))
            .finish_non_exhaustive()
    }
}

fn display_title(scenario: &Scenario) -> &str {
    if scenario.label.is_empty() {
        &scenario.id
    } else {
        &scenario.label
    }
}

impl ScenarioExecutor {
    /// Create an executor with the given announcement sink. Starts `Idle`.
    #[must_use]
    pub fn new(announcer: Box<dyn Announcer>) -> Self {
        Self {
            scenario: None,
            state: ExecState::Idle,
            cursor: 0,
            store: GraphStore::new(),
            clock: SimClock::new(),
            announcer,
            events: Vec::new(),
        }
    }

    /// Load a scenario, moving `Idle → StepReady`.
    ///
    /// The scenario is validated here regardless of how it was built, so a
    /// hand-constructed or plain-serde-deserialized script with no steps is
    /// rejected before it can reach `StepReady`.
    ///
    /// # Errors
    ///
    /// - `OutOfSequence` unless the executor is `Idle`; `reset()` first to
    ///   replace a loaded scenario.
    /// - `Validation` if the scenario fails schema validation (empty id or
    ///   empty step list).
    pub fn load(&mut self, scenario: Scenario) -> EngineResult<()> {
        if self.state != ExecState::Idle {
            return Err(EngineError::OutOfSequence {
                state: self.state.to_string(),
            });
        }
        scenario.validate()?;
        self.announcer.announce(
            &format!("Scenario loaded: {}", display_title(&scenario)),
            Priority::Polite,
        );
        self.scenario = Some(scenario);
        self.state = ExecState::StepReady;
        self.cursor = 0;
        Ok(())
    }

    /// Advance the state machine by one user action.
    ///
    /// From `StepReady` this executes the current step; from `StepComplete`
    /// it transitions to `StepReady` (more steps remain) or
    /// `ScenarioComplete` without executing anything.
    ///
    /// # Errors
    ///
    /// - `OutOfSequence` from `Idle` or `ScenarioComplete`; no state change.
    /// - Graph errors from the failed step; the machine stays in
    ///   `StepReady`, and under the strong guarantee the graph is restored
    ///   to its pre-step snapshot first.
    pub fn advance(&mut self) -> EngineResult<StepOutcome> {
        match self.state {
            ExecState::Idle | ExecState::ScenarioComplete => Err(EngineError::OutOfSequence {
                state: self.state.to_string(),
            }),
            ExecState::StepComplete => {
                let total = self.scenario.as_ref().map_or(0, Scenario::len);
                if self.cursor < total {
                    self.state = ExecState::StepReady;
                    Ok(StepOutcome::Ready)
                } else {
                    self.state = ExecState::ScenarioComplete;
                    self.announcer
                        .announce("Scenario complete.", Priority::Polite);
                    Ok(StepOutcome::Finished)
                }
            }
            ExecState::StepReady => self.execute_ready_step(),
            // Unreachable between calls; kept total for the compiler.
            ExecState::StepExecuting => Err(EngineError::OutOfSequence {
                state: self.state.to_string(),
            }),
        }
    }

    /// Reset from any state: discard the scenario, the graph, the event
    /// log, and zero the clock. Returns to `Idle`.
    pub fn reset(&mut self) {
        self.scenario = None;
        self.state = ExecState::Idle;
        self.cursor = 0;
        self.store.clear();
        self.clock.reset();
        self.events.clear();
        self.announcer.announce("Simulation reset.", Priority::Polite);
    }

    fn execute_ready_step(&mut self) -> EngineResult<StepOutcome> {
        let guarantee = {
            let scenario = self.scenario.as_ref().ok_or_else(|| {
                EngineError::OutOfSequence {
                    state: self.state.to_string(),
                }
            })?;
            scenario.guarantee
        };
        let index = self.cursor;

        self.state = ExecState::StepExecuting;
        let pre_step = match guarantee {
            Guarantee::Strong => Some(self.store.backup()),
            Guarantee::Basic => None,
        };

        match self.apply_step(index) {
            Ok(message) => {
                self.cursor += 1;
                self.state = ExecState::StepComplete;
                let safety = self.step_safety(index);
                self.announcer.announce(&message, safety.priority());
                self.events.push(EngineEvent::StepApplied {
                    index,
                    safety,
                    message: message.clone(),
                });
                Ok(StepOutcome::Applied { index, message })
            }
            Err(err) => {
                if let Some(backup) = pre_step {
                    self.store.restore(backup);
                    self.events.push(EngineEvent::RolledBack { index });
                    log::debug!("step {index} failed; graph restored: {err}");
                }
                self.events.push(EngineEvent::StepRejected {
                    index,
                    error: err.to_string(),
                });
                self.announcer
                    .announce(&format!("Step rejected: {err}"), Priority::Assertive);
                self.state = ExecState::StepReady;
                Err(err)
            }
        }
    }

    /// Apply the step at `index`, returning its rendered message.
    fn apply_step(&mut self, index: usize) -> EngineResult<String> {
        let (op, message) = {
            let scenario = self
                .scenario
                .as_ref()
                .ok_or_else(|| EngineError::OutOfSequence {
                    state: ExecState::Idle.to_string(),
                })?;
            let step = scenario
                .steps
                .get(index)
                .ok_or_else(|| EngineError::OutOfSequence {
                    state: self.state.to_string(),
                })?;
            (step.op.clone(), step.render_message(index, scenario.len()))
        };

        match op {
            StepOp::Create {
                label,
                kind,
                payload,
            } => {
                self.store.add_node(label, kind, payload);
            }
            StepOp::Bind {
                label,
                kind,
                target,
            } => {
                let target = self.resolve_node(target.as_deref())?;
                self.store.add_edge(kind, label, target)?;
            }
            StepOp::Rebind { edge, target } => {
                let edge_id = self.resolve_edge(&edge)?;
                let target = self.resolve_node(target.as_deref())?;
                self.store.rebind(edge_id, target)?;
            }
            StepOp::Nullify { edge } => {
                let edge_id = self.resolve_edge(&edge)?;
                self.store.rebind(edge_id, None)?;
            }
            StepOp::RemoveTarget { node } => {
                let node_id = self
                    .store
                    .node_by_label(&node)
                    .map(|n| n.id)
                    .ok_or_else(|| EngineError::unknown_label(&node))?;
                self.store.remove_node(node_id)?;
            }
            StepOp::TransferOwnership { edge, new_holder } => {
                let edge_id = self.resolve_edge(&edge)?;
                self.store.transfer_ownership(edge_id, new_holder)?;
            }
            StepOp::Deref { edge } => {
                let edge_id = self.resolve_edge(&edge)?;
                match self.store.deref_edge(edge_id)? {
                    AccessOutcome::Value(_) => {}
                    AccessOutcome::Null => {
                        self.events.push(EngineEvent::NullAccess { edge: edge_id });
                        self.announcer.announce(
                            &format!("'{edge}' is null; access checked and skipped."),
                            Priority::Polite,
                        );
                    }
                    AccessOutcome::Dangling(target) => {
                        self.events.push(EngineEvent::DanglingAccess {
                            edge: edge_id,
                            target,
                        });
                        self.announcer.announce(
                            &format!("'{edge}' dangles: its target no longer exists. This access is undefined behavior."),
                            Priority::Assertive,
                        );
                    }
                }
            }
            StepOp::BeginTransaction => self.store.begin_transaction()?,
            StepOp::Commit => self.store.commit()?,
            StepOp::Rollback => {
                self.store.rollback()?;
                self.events.push(EngineEvent::RolledBack { index });
            }
        }
        Ok(message)
    }

    fn resolve_node(&self, label: Option<&str>) -> EngineResult<Option<NodeId>> {
        match label {
            None => Ok(None),
            Some(label) => self
                .store
                .node_by_label(label)
                .map(|n| Some(n.id))
                .ok_or_else(|| EngineError::unknown_label(label)),
        }
    }

    fn resolve_edge(&self, label: &str) -> EngineResult<EdgeId> {
        self.store
            .edge_by_label(label)
            .map(|e| e.id)
            .ok_or_else(|| EngineError::unknown_label(label))
    }

    fn step_safety(&self, index: usize) -> SafetyClass {
        self.scenario
            .as_ref()
            .and_then(|s| s.steps.get(index))
            .map_or(SafetyClass::Safe, |s| s.safety)
    }

    // ===== Frame path =====

    /// Advance the simulation clock by a frame delta (no-op while paused).
    pub fn tick(&mut self, delta_secs: f64) {
        self.clock.tick(delta_secs);
    }

    /// Freeze the clock.
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    /// Continue from the frozen value.
    pub fn resume(&mut self) {
        self.clock.resume();
    }

    /// Accumulated elapsed time.
    #[must_use]
    pub const fn elapsed(&self) -> SimTime {
        self.clock.elapsed()
    }

    // ===== Observation =====

    /// Current FSM state.
    #[must_use]
    pub const fn state(&self) -> ExecState {
        self.state
    }

    /// Zero-based index of the next step to execute.
    #[must_use]
    pub const fn step_index(&self) -> usize {
        self.cursor
    }

    /// The loaded scenario, if any.
    #[must_use]
    pub const fn scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }

    /// Layout rule of the loaded scenario (default when idle).
    #[must_use]
    pub fn layout(&self) -> LayoutRule {
        self.scenario.as_ref().map_or_else(LayoutRule::default, |s| s.layout)
    }

    /// Immutable snapshot of the current graph.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        self.store.snapshot()
    }

    /// Auditable event log for this run.
    #[must_use]
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Per-frame convenience: sample the given channels and project the
    /// current snapshot to draw descriptors, all from immutable state.
    #[must_use]
    pub fn render(
        &self,
        channels: &[crate::metrics::ChannelSpec],
    ) -> Vec<crate::projection::DrawDescriptor> {
        let t = self.elapsed();
        let samples = crate::metrics::sample_all(channels, &self.metrics_context(), t);
        crate::projection::project(&self.snapshot(), &samples, t, self.layout())
    }

    /// Context for the metrics simulator, derived from scenario identity and
    /// progress.
    #[must_use]
    pub fn metrics_context(&self) -> MetricsContext {
        let (seed, total) = self
            .scenario
            .as_ref()
            .map_or((0, 0), |s| (s.seed(), s.len()));
        let last_safety = match self.cursor {
            0 => SafetyClass::Safe,
            n => self.step_safety(n - 1),
        };
        MetricsContext {
            scenario_seed: seed,
            step_index: self.cursor,
            total_steps: total,
            last_safety,
        }
    }
}
