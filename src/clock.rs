//! Simulation clock with pause/resume continuity.
//!
//! The clock is the only stateful part of the animation path: metric
//! formulas are pure in elapsed time, so freezing and resuming the clock is
//! what guarantees visual continuity across a pause.

use serde::{Deserialize, Serialize};

/// Elapsed simulation time.
///
/// Uses a fixed-point nanosecond representation for reproducibility across
/// platforms; the zero-tolerance pause/resume continuity property depends on
/// integer accumulation (no floating-point drift while paused).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SimTime {
    /// Time in nanoseconds from simulation start.
    nanos: u64,
}

impl SimTime {
    /// Zero time (simulation start).
    pub const ZERO: Self = Self { nanos: 0 };

    /// Create time from seconds.
    ///
    /// Negative or non-finite inputs clamp to zero; elapsed time is never
    /// negative.
    #[must_use]
    pub fn from_secs(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::ZERO;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = (secs * 1_000_000_000.0) as u64;
        Self { nanos }
    }

    /// Create time from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Get time as seconds (f64).
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.nanos as f64 / 1_000_000_000.0
    }

    /// Get time as nanoseconds.
    #[must_use]
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// Add duration to time.
    #[must_use]
    pub const fn add_nanos(self, nanos: u64) -> Self {
        Self {
            nanos: self.nanos + nanos,
        }
    }
}

impl std::ops::Add for SimTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            nanos: self.nanos + rhs.nanos,
        }
    }
}

impl std::ops::Sub for SimTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            nanos: self.nanos.saturating_sub(rhs.nanos),
        }
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.9}s", self.as_secs_f64())
    }
}

/// Monotonic elapsed-time accumulator shared by the metrics simulator and
/// the render projection.
///
/// `tick` is a no-op while paused; resuming continues from the frozen value
/// with no jump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Accumulated elapsed time.
    elapsed: SimTime,
    /// Whether ticks are currently accumulated.
    running: bool,
    /// Number of non-discarded ticks.
    tick_count: u64,
}

impl SimClock {
    /// Create a new running clock at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elapsed: SimTime::ZERO,
            running: true,
            tick_count: 0,
        }
    }

    /// Advance the clock by a frame delta, in seconds.
    ///
    /// While paused this is a no-op. Non-finite or negative deltas are
    /// discarded (the host's animation loop can hand us garbage on a
    /// backgrounded tab; time never moves backwards).
    pub fn tick(&mut self, delta_secs: f64) {
        if !self.running {
            return;
        }
        if !delta_secs.is_finite() || delta_secs <= 0.0 {
            return;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = (delta_secs * 1_000_000_000.0) as u64;
        self.elapsed = self.elapsed.add_nanos(nanos);
        self.tick_count += 1;
    }

    /// Freeze the clock. Subsequent ticks are discarded.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Continue from the frozen value.
    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Reset to time zero, running.
    pub fn reset(&mut self) {
        self.elapsed = SimTime::ZERO;
        self.running = true;
        self.tick_count = 0;
    }

    /// Accumulated elapsed time.
    #[must_use]
    pub const fn elapsed(&self) -> SimTime {
        self.elapsed
    }

    /// Whether the clock is currently accumulating ticks.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Number of ticks that advanced the clock.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_time_creation() {
        let t1 = SimTime::from_secs(1.5);
        assert!((t1.as_secs_f64() - 1.5).abs() < 1e-9);

        let t2 = SimTime::from_nanos(1_500_000_000);
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_sim_time_negative_clamps() {
        assert_eq!(SimTime::from_secs(-1.0), SimTime::ZERO);
        assert_eq!(SimTime::from_secs(f64::NAN), SimTime::ZERO);
        assert_eq!(SimTime::from_secs(f64::INFINITY), SimTime::ZERO);
    }

    #[test]
    fn test_sim_time_arithmetic() {
        let t1 = SimTime::from_secs(1.0);
        let t2 = SimTime::from_secs(0.5);

        assert!(((t1 + t2).as_secs_f64() - 1.5).abs() < 1e-9);
        assert!(((t1 - t2).as_secs_f64() - 0.5).abs() < 1e-9);
        // Sub saturates at zero
        assert_eq!((t2 - t1).as_nanos(), 0);
    }

    #[test]
    fn test_sim_time_display() {
        let t = SimTime::from_secs(1.234_567_890);
        assert!(t.to_string().contains("1.234567890"));
    }

    #[test]
    fn test_clock_starts_running_at_zero() {
        let clock = SimClock::new();
        assert_eq!(clock.elapsed(), SimTime::ZERO);
        assert!(clock.is_running());
        assert_eq!(clock.tick_count(), 0);
    }

    #[test]
    fn test_clock_tick_accumulates() {
        let mut clock = SimClock::new();
        clock.tick(0.016);
        clock.tick(0.016);
        assert!((clock.elapsed().as_secs_f64() - 0.032).abs() < 1e-9);
        assert_eq!(clock.tick_count(), 2);
    }

    #[test]
    fn test_clock_tick_noop_while_paused() {
        let mut clock = SimClock::new();
        clock.tick(1.0);
        clock.pause();
        clock.tick(5.0);
        clock.tick(5.0);
        assert!((clock.elapsed().as_secs_f64() - 1.0).abs() < 1e-9);
        assert_eq!(clock.tick_count(), 1);
    }

    #[test]
    fn test_clock_pause_resume_continuity() {
        let mut clock = SimClock::new();
        clock.tick(0.5);

        let before = clock.elapsed();
        clock.pause();
        clock.tick(123.0);
        clock.resume();
        let after = clock.elapsed();

        // Zero tolerance: no time passes while paused.
        assert_eq!(before, after);
    }

    #[test]
    fn test_clock_resume_continues_accumulating() {
        let mut clock = SimClock::new();
        clock.tick(1.0);
        clock.pause();
        clock.resume();
        clock.tick(1.0);
        assert!((clock.elapsed().as_secs_f64() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_clock_reset() {
        let mut clock = SimClock::new();
        clock.tick(3.0);
        clock.pause();
        clock.reset();
        assert_eq!(clock.elapsed(), SimTime::ZERO);
        assert!(clock.is_running());
        assert_eq!(clock.tick_count(), 0);
    }

    #[test]
    fn test_clock_rejects_bad_deltas() {
        let mut clock = SimClock::new();
        clock.tick(-1.0);
        clock.tick(f64::NAN);
        clock.tick(f64::INFINITY);
        clock.tick(0.0);
        assert_eq!(clock.elapsed(), SimTime::ZERO);
        assert_eq!(clock.tick_count(), 0);
    }

    #[test]
    fn test_clock_default() {
        let clock = SimClock::default();
        assert!(clock.is_running());
        assert_eq!(clock.elapsed(), SimTime::ZERO);
    }
}
