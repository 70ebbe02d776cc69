//! Band-power blink detector.
//!
//! A blink is declared when the 10-sample moving average of alpha power rises
//! above the alpha threshold. Two independent timers then suppress further
//! events: a short debounce that short-circuits the whole call, and a longer
//! minimum interval between confirmed events.
//!
//! Delta power is tracked alongside alpha but only gates the decision when
//! `require_delta` is set. With it off (the default) only alpha decides.
//!
//! With `adaptive_threshold` on, every raw alpha observation also feeds a long
//! history; past the warm-up size the alpha threshold tracks that history's
//! median. A median below `threshold_floor` means the electrodes are most
//! likely off the skin, and the detector latches into a fatal fault. The update
//! that trips the fault is not reported as a blink.
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use crate::clock::{Clock, MonotonicClock};
use crate::drivers::stats::{mean, median};
use crate::drivers::{BandPowers, BlinkError};
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub alpha_threshold: f64,
    pub delta_threshold: f64,
    /// Seconds after an event during which `detect` returns early.
    pub debounce_time: f64,
    /// Minimum seconds between two confirmed events.
    pub min_interval: f64,
    /// Moving-average length K.
    pub history_len: usize,
    /// Also require the delta moving average to exceed `delta_threshold`.
    pub require_delta: bool,
    pub adaptive_threshold: bool,
    /// Alpha observations needed before the threshold starts adapting.
    pub adaptive_warmup: usize,
    /// Adaptive history becomes circular at this size.
    pub adaptive_cap: usize,
    pub threshold_floor: f64,
}
impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: 150.0,
            delta_threshold: 100.0,
            debounce_time: 0.3,
            min_interval: 2.0,
            history_len: 10,
            require_delta: false,
            adaptive_threshold: true,
            adaptive_warmup: 1000,
            adaptive_cap: 10_000,
            threshold_floor: 10.0,
        }
    }
}
impl DetectorConfig {
    pub fn validate(&self) -> Result<(), BlinkError> {
        let invalid = |msg: String| Err(BlinkError::InvalidConfig(msg));
        if !(self.alpha_threshold > 0.0) || !(self.delta_threshold > 0.0) {
            return invalid(format!(
                "thresholds must be positive (alpha {}, delta {})",
                self.alpha_threshold, self.delta_threshold
            ));
        }
        if self.debounce_time < 0.0 || self.min_interval < 0.0 {
            return invalid("debounce_time and min_interval must not be negative".into());
        }
        if self.history_len == 0 {
            return invalid("history_len must be at least 1".into());
        }
        if self.adaptive_cap <= self.adaptive_warmup {
            return invalid(format!(
                "adaptive_cap ({}) must exceed adaptive_warmup ({})",
                self.adaptive_cap, self.adaptive_warmup
            ));
        }
        Ok(())
    }
    pub fn with_thresholds(mut self, alpha_threshold: f64, delta_threshold: f64) -> Self {
        self.alpha_threshold = alpha_threshold;
        self.delta_threshold = delta_threshold;
        self
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorPhase {
    /// Suppressing: inside the minimum interval of the last event.
    Refractory,
    Armed,
}
/// Fixed-capacity history that overwrites its oldest entry once full.
#[derive(Clone, Debug)]
struct RingHistory {
    values: Vec<f64>,
    capacity: usize,
    cursor: usize,
}
impl RingHistory {
    /// Starts full of zeros, so early averages are diluted.
    fn prefilled(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity],
            capacity,
            cursor: 0,
        }
    }
    fn growing(capacity: usize) -> Self {
        Self {
            values: Vec::new(),
            capacity,
            cursor: 0,
        }
    }
    fn push(&mut self, value: f64) {
        if self.values.len() < self.capacity {
            self.values.push(value);
        } else if let Some(slot) = self.values.get_mut(self.cursor) {
            *slot = value;
            self.cursor = (self.cursor + 1) % self.capacity;
        }
    }
    fn values(&self) -> &[f64] {
        &self.values
    }
    fn len(&self) -> usize {
        self.values.len()
    }
}
pub struct BlinkDetector<C: Clock = MonotonicClock> {
    config: DetectorConfig,
    clock: C,
    alpha_history: RingHistory,
    delta_history: RingHistory,
    adaptive_history: RingHistory,
    alpha_threshold: f64,
    delta_threshold: f64,
    last_event: Option<f64>,
    has_fired: bool,
    events: u64,
    collapsed_at: Option<f64>,
}
impl BlinkDetector<MonotonicClock> {
    pub fn new(config: DetectorConfig) -> Result<Self, BlinkError> {
        Self::with_clock(config, MonotonicClock::new())
    }
}
impl<C: Clock> BlinkDetector<C> {
    pub fn with_clock(config: DetectorConfig, clock: C) -> Result<Self, BlinkError> {
        config.validate()?;
        Ok(Self {
            alpha_history: RingHistory::prefilled(config.history_len),
            delta_history: RingHistory::prefilled(config.history_len),
            adaptive_history: RingHistory::growing(config.adaptive_cap),
            alpha_threshold: config.alpha_threshold,
            delta_threshold: config.delta_threshold,
            last_event: None,
            has_fired: false,
            events: 0,
            collapsed_at: None,
            clock,
            config,
        })
    }
    /// Feeds one band-power update stamped with the detector's clock.
    pub fn detect(&mut self, powers: &BandPowers) -> Result<bool, BlinkError> {
        let now = self.clock.now_seconds();
        self.detect_at(powers, now)
    }
    /// Feeds one band-power update observed at `now` (seconds).
    pub fn detect_at(&mut self, powers: &BandPowers, now: f64) -> Result<bool, BlinkError> {
        if let Some(threshold) = self.collapsed_at {
            return Err(BlinkError::ThresholdCollapsed {
                threshold,
                floor: self.config.threshold_floor,
            });
        }
        let elapsed = self.elapsed_since_event(now);
        if elapsed < self.config.debounce_time {
            return Ok(false);
        }
        let alpha = powers.alpha;
        let delta = powers.delta;
        self.alpha_history.push(alpha);
        self.delta_history.push(delta);
        let mut is_blink = self.alpha_average() > self.alpha_threshold;
        if self.config.require_delta {
            is_blink = is_blink && self.delta_average() > self.delta_threshold;
        }
        is_blink = is_blink && elapsed > self.config.min_interval;
        let decided_against = self.alpha_threshold;
        // A collapse on this update voids its decision.
        if self.config.adaptive_threshold {
            self.adapt(alpha)?;
        }
        if is_blink {
            self.last_event = Some(now);
            self.has_fired = true;
            self.events += 1;
            info!(
                "blink #{} (alpha avg {:.2} > {decided_against:.2})",
                self.events,
                self.alpha_average(),
            );
        }
        Ok(is_blink)
    }
    fn adapt(&mut self, alpha: f64) -> Result<(), BlinkError> {
        self.adaptive_history.push(alpha);
        if self.adaptive_history.len() <= self.config.adaptive_warmup {
            return Ok(());
        }
        let Some(recomputed) = median(self.adaptive_history.values()) else {
            return Ok(());
        };
        if recomputed < self.config.threshold_floor {
            error!(
                "alpha threshold collapsed to {recomputed:.3} (floor {}); stopping detection",
                self.config.threshold_floor
            );
            self.collapsed_at = Some(recomputed);
            return Err(BlinkError::ThresholdCollapsed {
                threshold: recomputed,
                floor: self.config.threshold_floor,
            });
        }
        if recomputed != self.alpha_threshold {
            debug!("alpha threshold {:.3} -> {recomputed:.3}", self.alpha_threshold);
        }
        self.alpha_threshold = recomputed;
        Ok(())
    }
    fn elapsed_since_event(&self, now: f64) -> f64 {
        self.last_event.map_or(f64::INFINITY, |t| now - t)
    }
    pub fn phase_at(&self, now: f64) -> DetectorPhase {
        if self.elapsed_since_event(now) > self.config.min_interval {
            DetectorPhase::Armed
        } else {
            DetectorPhase::Refractory
        }
    }
    pub fn phase(&self) -> DetectorPhase {
        self.phase_at(self.clock.now_seconds())
    }
    pub fn alpha_average(&self) -> f64 {
        mean(self.alpha_history.values())
    }
    pub fn delta_average(&self) -> f64 {
        mean(self.delta_history.values())
    }
    pub fn alpha_threshold(&self) -> f64 {
        self.alpha_threshold
    }
    pub fn delta_threshold(&self) -> f64 {
        self.delta_threshold
    }
    pub fn adaptive_len(&self) -> usize {
        self.adaptive_history.len()
    }
    pub fn events(&self) -> u64 {
        self.events
    }
    pub fn has_fired(&self) -> bool {
        self.has_fired
    }
    pub fn last_event(&self) -> Option<f64> {
        self.last_event
    }
    pub fn is_faulted(&self) -> bool {
        self.collapsed_at.is_some()
    }
}
/// Stateless single-shot rule: strong delta artifact with suppressed alpha.
pub fn detect_blink_simple(powers: &BandPowers, delta_threshold: f64, alpha_threshold: f64) -> bool {
    powers.delta > delta_threshold && powers.alpha < alpha_threshold
}
