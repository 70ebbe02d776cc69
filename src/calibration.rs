use std::time::Duration;
use log::info;
use serde::{Deserialize, Serialize};
use crate::clock::Clock;
use crate::detector::DetectorConfig;
use crate::drivers::stats::median;
use crate::drivers::{BlinkError, RollingBuffer, SampleSource, SpectralEstimator};
use crate::config::StreamConfig;
use crate::signal::StopSignal;
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub duration_seconds: f64,
    /// Baseline medians are scaled by this to get thresholds.
    pub multiplier: f64,
}
impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 5.0,
            multiplier: 2.0,
        }
    }
}
/// Personalised thresholds from a no-blink baseline recording.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CalibrationResult {
    pub alpha_threshold: f64,
    pub delta_threshold: f64,
    pub alpha_baseline: f64,
    pub delta_baseline: f64,
    pub observations: usize,
}
impl CalibrationResult {
    pub fn apply_to(&self, config: DetectorConfig) -> DetectorConfig {
        config.with_thresholds(self.alpha_threshold, self.delta_threshold)
    }
}
/// Records a baseline through the same buffer and estimator the live loop uses.
pub struct Calibrator<'a> {
    stream: &'a StreamConfig,
    estimator: &'a SpectralEstimator,
    settings: &'a CalibrationConfig,
    stop: Option<&'a StopSignal>,
}
impl<'a> Calibrator<'a> {
    pub fn new(
        stream: &'a StreamConfig,
        estimator: &'a SpectralEstimator,
        settings: &'a CalibrationConfig,
    ) -> Self {
        Self {
            stream,
            estimator,
            settings,
            stop: None,
        }
    }
    /// Abandons the recording with [`BlinkError::Interrupted`] once `stop` fires.
    pub fn with_stop(mut self, stop: &'a StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }
    /// Pulls from `source` until `duration` of wall-clock time (per `clock`) has passed.
    pub fn calibrate<S, C>(
        &self,
        source: &mut S,
        sample_rate_hz: f64,
        duration: Duration,
        clock: &C,
    ) -> Result<CalibrationResult, BlinkError>
    where
        S: SampleSource + ?Sized,
        C: Clock + ?Sized,
    {
        let mut buffer = RollingBuffer::new(self.stream.buffer_capacity);
        let mut alphas = Vec::new();
        let mut deltas = Vec::new();
        let total = duration.as_secs_f64();
        let timeout = Duration::from_millis(self.stream.pull_timeout_ms);
        let started = clock.now_seconds();
        let mut last_report = 0u64;
        loop {
            if self.stop.is_some_and(StopSignal::is_triggered) {
                info!("calibration interrupted after {} updates", alphas.len());
                return Err(BlinkError::Interrupted);
            }
            let elapsed = clock.now_seconds() - started;
            if elapsed >= total {
                break;
            }
            if let Some(chunk) = source.pull_chunk(timeout, self.stream.max_samples)? {
                buffer.append(&chunk)?;
                if !chunk.is_empty() && buffer.len() >= self.stream.min_samples {
                    let snapshot = buffer.snapshot();
                    let powers = self
                        .estimator
                        .compute_band_powers(snapshot.view(), sample_rate_hz);
                    alphas.push(powers.alpha);
                    deltas.push(powers.delta);
                }
            }
            let whole_seconds = elapsed as u64;
            if whole_seconds > last_report {
                last_report = whole_seconds;
                info!("calibrating... {whole_seconds}/{total:.0} s");
            }
        }
        let (Some(alpha_baseline), Some(delta_baseline)) = (median(&alphas), median(&deltas)) else {
            return Err(BlinkError::NoCalibrationSamples);
        };
        let alpha_threshold = alpha_baseline * self.settings.multiplier;
        let delta_threshold = delta_baseline * self.settings.multiplier;
        for (band, threshold) in [("alpha", alpha_threshold), ("delta", delta_threshold)] {
            if !(threshold > 0.0) {
                return Err(BlinkError::NonPositiveBaseline { band, threshold });
            }
        }
        info!(
            "calibration complete over {} updates: alpha baseline {alpha_baseline:.2} -> {alpha_threshold:.2}, delta baseline {delta_baseline:.2} -> {delta_threshold:.2}",
            alphas.len()
        );
        Ok(CalibrationResult {
            alpha_threshold,
            delta_threshold,
            alpha_baseline,
            delta_baseline,
            observations: alphas.len(),
        })
    }
}
