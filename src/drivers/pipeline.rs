use std::time::Duration;
use crate::clock::{Clock, MonotonicClock};
use crate::config::{AppConfig, StreamConfig};
use crate::detector::BlinkDetector;
use crate::drivers::{BandPowers, BlinkError, RollingBuffer, SampleChunk, SampleSource, SpectralEstimator};
/// What one pump of the pipeline produced.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tick {
    pub blink: bool,
    /// `None` when no update happened (no data, or buffer below the minimum).
    pub powers: Option<BandPowers>,
    pub samples_received: usize,
}
/// Buffer -> estimator -> detector, owned by the single polling loop.
pub struct BlinkPipeline<C: Clock = MonotonicClock> {
    stream: StreamConfig,
    buffer: RollingBuffer,
    estimator: SpectralEstimator,
    detector: BlinkDetector<C>,
    sample_rate_hz: f64,
}
impl BlinkPipeline<MonotonicClock> {
    pub fn new(config: &AppConfig, sample_rate_hz: f64) -> Result<Self, BlinkError> {
        let detector = BlinkDetector::new(config.detector.clone())?;
        Self::with_detector(
            config.stream.clone(),
            SpectralEstimator::new(config.spectral.clone()),
            detector,
            sample_rate_hz,
        )
    }
}
impl<C: Clock> BlinkPipeline<C> {
    pub fn with_detector(
        stream: StreamConfig,
        estimator: SpectralEstimator,
        detector: BlinkDetector<C>,
        sample_rate_hz: f64,
    ) -> Result<Self, BlinkError> {
        if sample_rate_hz <= 0.0 {
            return Err(BlinkError::InvalidSampleRate);
        }
        Ok(Self {
            buffer: RollingBuffer::new(stream.buffer_capacity),
            stream,
            estimator,
            detector,
            sample_rate_hz,
        })
    }
    /// One bounded pull from `source`, then [`BlinkPipeline::process_chunk`].
    pub fn pump_once<S: SampleSource + ?Sized>(&mut self, source: &mut S) -> Result<Tick, BlinkError> {
        let timeout = Duration::from_millis(self.stream.pull_timeout_ms);
        match source.pull_chunk(timeout, self.stream.max_samples)? {
            Some(chunk) => self.process_chunk(&chunk),
            None => Ok(Tick::default()),
        }
    }
    pub fn process_chunk(&mut self, chunk: &SampleChunk) -> Result<Tick, BlinkError> {
        self.buffer.append(chunk)?;
        if chunk.is_empty() {
            return Ok(Tick::default());
        }
        let mut tick = Tick {
            samples_received: chunk.len(),
            ..Tick::default()
        };
        if self.buffer.len() < self.stream.min_samples {
            return Ok(tick);
        }
        let snapshot = self.buffer.snapshot();
        let powers = self
            .estimator
            .compute_band_powers(snapshot.view(), self.sample_rate_hz);
        tick.blink = self.detector.detect(&powers)?;
        tick.powers = Some(powers);
        Ok(tick)
    }
    pub fn detector(&self) -> &BlinkDetector<C> {
        &self.detector
    }
    pub fn buffer(&self) -> &RollingBuffer {
        &self.buffer
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::detector::DetectorConfig;
    use crate::drivers::{ManualSource, SyntheticSource};
    fn pipeline(clock: ManualClock) -> BlinkPipeline<ManualClock> {
        let detector = BlinkDetector::with_clock(
            DetectorConfig {
                adaptive_threshold: false,
                ..DetectorConfig::default()
            },
            clock,
        )
        .unwrap();
        BlinkPipeline::with_detector(
            StreamConfig::default(),
            SpectralEstimator::default(),
            detector,
            256.0,
        )
        .unwrap()
    }
    #[test]
    fn waits_for_minimum_samples() {
        let mut p = pipeline(ManualClock::new(0.0));
        let small = SampleChunk::evenly_spaced(vec![vec![0.0; 4]; 32], 256.0, 0.0);
        let tick = p.process_chunk(&small).unwrap();
        assert_eq!(tick.powers, None);
        assert_eq!(tick.samples_received, 32);
        let tick = p.process_chunk(&small).unwrap();
        assert!(tick.powers.is_some());
    }
    #[test]
    fn zero_signal_end_to_end() {
        let mut p = pipeline(ManualClock::new(0.0));
        let zeros = SampleChunk::evenly_spaced(vec![vec![0.0; 2]; 256], 256.0, 0.0);
        let mut source = ManualSource::new(256.0, vec![zeros]);
        p.pump_once(&mut source).unwrap();
        let tick = p.pump_once(&mut source).unwrap();
        assert_eq!(tick.powers, Some(BandPowers::default()));
        assert!(!tick.blink);
        assert_eq!(p.buffer().len(), 256);
        assert_eq!(p.pump_once(&mut source).unwrap(), Tick::default());
    }
    #[test]
    fn alpha_bursts_fire_respecting_min_interval() {
        let clock = ManualClock::new(0.0);
        let mut p = pipeline(clock.clone());
        let mut source = SyntheticSource::new(256.0, 4, 11);
        let mut events = Vec::new();
        // 20 frames per second for 6 s, alpha burst throughout.
        source.inject_alpha_burst(6.0);
        for frame in 0..120 {
            let chunk = source.generate(13);
            if p.process_chunk(&chunk).unwrap().blink {
                events.push(frame);
            }
            clock.advance(0.05);
        }
        assert!(!events.is_empty());
        for pair in events.windows(2) {
            assert!(pair[1] - pair[0] >= 40, "{events:?}");
        }
    }
    #[test]
    fn quiet_synthetic_signal_never_fires() {
        let clock = ManualClock::new(0.0);
        let mut p = pipeline(clock.clone());
        let mut source = SyntheticSource::new(256.0, 4, 5);
        for _ in 0..200 {
            let chunk = source.generate(13);
            assert!(!p.process_chunk(&chunk).unwrap().blink);
            clock.advance(0.05);
        }
    }
    #[test]
    fn malformed_chunk_is_input_error() {
        let mut p = pipeline(ManualClock::new(0.0));
        let bad = SampleChunk::new(vec![vec![0.0; 4]; 3], vec![0.0]);
        let err = p.process_chunk(&bad).unwrap_err();
        assert_eq!(err.kind(), crate::drivers::ErrorKind::Input);
        assert!(p.buffer().is_empty());
    }
    #[test]
    fn empty_chunk_with_stray_timestamps_is_rejected() {
        let mut p = pipeline(ManualClock::new(0.0));
        let bad = SampleChunk::new(Vec::new(), vec![0.0, 0.1, 0.2]);
        let err = p.process_chunk(&bad).unwrap_err();
        assert!(matches!(
            err,
            BlinkError::LengthMismatch {
                samples: 0,
                timestamps: 3
            }
        ));
        assert_eq!(err.kind(), crate::drivers::ErrorKind::Input);
        let empty = SampleChunk::new(Vec::new(), Vec::new());
        assert_eq!(p.process_chunk(&empty).unwrap(), Tick::default());
    }
}
