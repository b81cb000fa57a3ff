//! Synthetic metrics simulator.
//!
//! Every channel value is a pure function of `(channel, scenario context,
//! elapsed time)`: bounded periodic components with frequencies and phases
//! derived from the scenario identity, clamped to the channel's declared
//! domain. No hidden accumulation anywhere, so pausing the clock pauses the
//! animation with no discontinuity, and any `(scenario, t)` pair reproduces
//! the same value under test.
//!
//! Metrics are illustrative, not measured: they animate safety/performance
//! indicators, nothing more.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::clock::SimTime;
use crate::error::EngineResult;
use crate::scenario::{fnv1a, SafetyClass};

/// Formula family for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaId {
    /// Gentle oscillation around the domain midpoint.
    Steady,
    /// Strong multi-harmonic swing; exercises the clamp path by design.
    Pulse,
    /// Ramps across the domain with scenario progress, plus a ripple.
    Drift,
    /// Progress ramp pushed toward the domain top while the last step was
    /// unsafe; the hazard gauge.
    Composite,
}

/// Declaration of a named signal with a numeric domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ChannelSpec {
    /// Channel name, unique within a configuration.
    #[validate(length(min = 1))]
    pub name: String,
    /// Inclusive lower bound of the domain.
    pub domain_min: f64,
    /// Inclusive upper bound; may be `inf` for half-open domains.
    pub domain_max: f64,
    /// Update formula.
    pub formula: FormulaId,
}

impl ChannelSpec {
    /// Create a channel declaration.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        domain_min: f64,
        domain_max: f64,
        formula: FormulaId,
    ) -> Self {
        Self {
            name: name.into(),
            domain_min,
            domain_max,
            formula,
        }
    }

    /// Domain width used for amplitude scaling; capped for half-open
    /// domains so formulas stay finite.
    fn span(&self) -> f64 {
        let span = self.domain_max - self.domain_min;
        if span.is_finite() {
            span
        } else {
            100.0
        }
    }
}

/// Scenario-derived inputs to the formula family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MetricsContext {
    /// Seed derived from the scenario identity; fixes formula phases.
    pub scenario_seed: u64,
    /// Zero-based index of the next step to execute.
    pub step_index: usize,
    /// Total steps in the scenario.
    pub total_steps: usize,
    /// Safety classification of the most recently applied step.
    pub last_safety: SafetyClass,
}

impl MetricsContext {
    /// Scenario progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            0.0
        } else {
            (self.step_index as f64 / self.total_steps as f64).min(1.0)
        }
    }

    const fn hazard(&self) -> bool {
        matches!(
            self.last_safety,
            SafetyClass::UndefinedBehavior | SafetyClass::ImplementationDefined
        )
    }
}

/// One sampled channel value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSample {
    /// Channel name.
    pub name: String,
    /// Clamped value, guaranteed within the declared domain.
    pub value: f64,
}

/// Phase in `[0, 2π)` derived from the scenario seed and channel name.
fn channel_phase(seed: u64, name: &str) -> f64 {
    let mixed = seed ^ fnv1a(name.as_bytes());
    // Map the top 53 bits onto [0, 1) without bias.
    let unit = (mixed >> 11) as f64 / (1u64 << 53) as f64;
    unit * std::f64::consts::TAU
}

/// Compute one channel's value at elapsed time `t`. Pure and stateless.
///
/// Out-of-domain raw values are clamped, never surfaced; the overflow is
/// logged at debug level for diagnostics only.
#[must_use]
pub fn channel_value(spec: &ChannelSpec, ctx: &MetricsContext, t: SimTime) -> f64 {
    let secs = t.as_secs_f64();
    let phase = channel_phase(ctx.scenario_seed, &spec.name);
    let lo = spec.domain_min;
    let span = spec.span();
    let mid = lo + span * 0.5;

    let raw = match spec.formula {
        FormulaId::Steady => mid + 0.25 * span * (0.4 * secs + phase).sin(),
        FormulaId::Pulse => {
            mid + span
                * (0.5 * (2.0 * secs + phase).sin() + 0.3 * (3.1 * secs + 1.7 * phase).cos())
        }
        FormulaId::Drift => {
            lo + span * ctx.progress() + 0.1 * span * (secs + phase).sin()
        }
        FormulaId::Composite => {
            let base = lo + 0.6 * span * ctx.progress();
            let swing = 0.15 * span * (1.3 * secs + phase).sin();
            let hazard = if ctx.hazard() { 0.35 * span } else { 0.0 };
            base + swing + hazard
        }
    };

    clamp_to_domain(spec, raw)
}

fn clamp_to_domain(spec: &ChannelSpec, raw: f64) -> f64 {
    if raw.is_nan() {
        log::debug!("channel '{}' produced NaN; clamped to domain min", spec.name);
        return spec.domain_min;
    }
    if raw < spec.domain_min || raw > spec.domain_max {
        log::debug!(
            "channel '{}' overflow: {raw} outside [{}, {}]",
            spec.name,
            spec.domain_min,
            spec.domain_max
        );
    }
    raw.clamp(spec.domain_min, spec.domain_max)
}

/// Sample every channel; O(channels), independent of graph size.
#[must_use]
pub fn sample_all(specs: &[ChannelSpec], ctx: &MetricsContext, t: SimTime) -> Vec<ChannelSample> {
    specs
        .iter()
        .map(|spec| ChannelSample {
            name: spec.name.clone(),
            value: channel_value(spec, ctx, t),
        })
        .collect()
}

/// Built-in channel presets used by most lessons.
#[must_use]
pub fn default_channels() -> Vec<ChannelSpec> {
    vec![
        ChannelSpec::new("safety", 0.0, 100.0, FormulaId::Composite),
        ChannelSpec::new("overhead", 0.0, 100.0, FormulaId::Pulse),
        ChannelSpec::new("aliasing_pressure", 0.0, 1.0, FormulaId::Drift),
        ChannelSpec::new("activity", 0.0, 100.0, FormulaId::Steady),
    ]
}

/// Validate a channel set: non-empty unique names, ordered domains.
///
/// # Errors
///
/// Returns `Config` naming the offending channel.
pub fn validate_channels(specs: &[ChannelSpec]) -> EngineResult<()> {
    use crate::error::EngineError;
    let mut seen = std::collections::HashSet::new();
    for spec in specs {
        spec.validate()?;
        if spec.domain_min.is_nan() || spec.domain_max.is_nan() {
            return Err(EngineError::config(format!(
                "channel '{}' has a NaN domain bound",
                spec.name
            )));
        }
        if spec.domain_min > spec.domain_max {
            return Err(EngineError::config(format!(
                "channel '{}' domain is inverted: [{}, {}]",
                spec.name, spec.domain_min, spec.domain_max
            )));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(EngineError::config(format!(
                "duplicate channel name '{}'",
                spec.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ctx(seed: u64) -> MetricsContext {
        MetricsContext {
            scenario_seed: seed,
            step_index: 2,
            total_steps: 4,
            last_safety: SafetyClass::Safe,
        }
    }

    #[test]
    fn test_values_are_reproducible() {
        let spec = ChannelSpec::new("safety", 0.0, 100.0, FormulaId::Pulse);
        let t = SimTime::from_secs(3.25);
        let a = channel_value(&spec, &ctx(7), t);
        let b = channel_value(&spec, &ctx(7), t);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_scenarios_animate_differently() {
        let spec = ChannelSpec::new("safety", 0.0, 100.0, FormulaId::Steady);
        let t = SimTime::from_secs(1.0);
        assert_ne!(
            channel_value(&spec, &ctx(1), t),
            channel_value(&spec, &ctx(2), t)
        );
    }

    #[test]
    fn test_pulse_stays_in_domain() {
        // Pulse's raw amplitude exceeds the domain by design; the clamp
        // must hold everywhere.
        let spec = ChannelSpec::new("overhead", 0.0, 100.0, FormulaId::Pulse);
        for i in 0..10_000 {
            let t = SimTime::from_secs(f64::from(i) * 0.01);
            let v = channel_value(&spec, &ctx(99), t);
            assert!((0.0..=100.0).contains(&v), "t={t} v={v}");
        }
    }

    #[test]
    fn test_half_open_domain() {
        let spec = ChannelSpec::new("latency", 0.0, f64::INFINITY, FormulaId::Drift);
        let v = channel_value(&spec, &ctx(3), SimTime::from_secs(2.0));
        assert!(v >= 0.0);
        assert!(v.is_finite());
    }

    #[test]
    fn test_composite_hazard_raises_value() {
        let spec = ChannelSpec::new("safety", 0.0, 100.0, FormulaId::Composite);
        let t = SimTime::from_secs(1.0);
        let safe = MetricsContext {
            last_safety: SafetyClass::Safe,
            ..ctx(5)
        };
        let unsafe_ctx = MetricsContext {
            last_safety: SafetyClass::UndefinedBehavior,
            ..ctx(5)
        };
        assert!(channel_value(&spec, &unsafe_ctx, t) > channel_value(&spec, &safe, t));
    }

    #[test]
    fn test_progress_guard_against_empty_scenario() {
        let empty = MetricsContext::default();
        assert_eq!(empty.progress(), 0.0);
    }

    #[test]
    fn test_sample_all_covers_every_channel() {
        let specs = default_channels();
        let samples = sample_all(&specs, &ctx(11), SimTime::from_secs(0.5));
        assert_eq!(samples.len(), specs.len());
        for (spec, sample) in specs.iter().zip(&samples) {
            assert_eq!(sample.name, spec.name);
            assert!(sample.value >= spec.domain_min);
            assert!(sample.value <= spec.domain_max);
        }
    }

    #[test]
    fn test_validate_channels_rejects_inverted_domain() {
        let specs = vec![ChannelSpec::new("x", 10.0, 0.0, FormulaId::Steady)];
        let err = validate_channels(&specs).unwrap_err();
        assert!(err.to_string().contains("inverted"));
    }

    #[test]
    fn test_validate_channels_rejects_duplicates() {
        let specs = vec![
            ChannelSpec::new("x", 0.0, 1.0, FormulaId::Steady),
            ChannelSpec::new("x", 0.0, 2.0, FormulaId::Pulse),
        ];
        let err = validate_channels(&specs).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_channels_rejects_empty_name() {
        let specs = vec![ChannelSpec::new("", 0.0, 1.0, FormulaId::Steady)];
        assert!(validate_channels(&specs).is_err());
    }

    #[test]
    fn test_default_channels_are_valid() {
        assert!(validate_channels(&default_channels()).is_ok());
    }

    #[test]
    fn test_channel_spec_yaml() {
        let yaml = "name: safety\ndomain_min: 0.0\ndomain_max: 100.0\nformula: composite\n";
        let spec: ChannelSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.formula, FormulaId::Composite);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Boundedness: every formula stays within its declared domain for
        /// arbitrary seeds, progress, and times.
        #[test]
        fn prop_channel_bounded(
            seed in any::<u64>(),
            step in 0usize..64,
            total in 1usize..64,
            secs in 0.0f64..100_000.0,
        ) {
            let ctx = MetricsContext {
                scenario_seed: seed,
                step_index: step,
                total_steps: total,
                last_safety: SafetyClass::UndefinedBehavior,
            };
            for spec in default_channels() {
                let v = channel_value(&spec, &ctx, SimTime::from_secs(secs));
                prop_assert!(v >= spec.domain_min && v <= spec.domain_max,
                    "channel {} out of domain: {v}", spec.name);
            }
        }

        /// Statelessness: sampling in any order or repeatedly never changes
        /// the value at a given time.
        #[test]
        fn prop_channel_stateless(seed in any::<u64>(), secs in 0.0f64..1000.0) {
            let spec = ChannelSpec::new("s", 0.0, 100.0, FormulaId::Pulse);
            let ctx = MetricsContext { scenario_seed: seed, ..MetricsContext::default() };
            let t = SimTime::from_secs(secs);
            let first = channel_value(&spec, &ctx, t);
            // Interleave other samples; the value at t must not move.
            let _ = channel_value(&spec, &ctx, SimTime::from_secs(secs / 2.0));
            let _ = channel_value(&spec, &ctx, SimTime::ZERO);
            prop_assert_eq!(first, channel_value(&spec, &ctx, t));
        }
    }
}
