use std::collections::VecDeque;
use std::f64::consts::PI;
use std::thread;
use std::time::{Duration, Instant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::BlinkError;
/// One pull worth of multi-channel readings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleChunk {
    pub readings: Vec<Vec<f64>>, // samples x channels
    pub timestamps: Vec<f64>,
}
impl SampleChunk {
    pub fn new(readings: Vec<Vec<f64>>, timestamps: Vec<f64>) -> Self {
        Self {
            readings,
            timestamps,
        }
    }
    /// Builds a chunk with evenly spaced timestamps starting at `start_secs`.
    pub fn evenly_spaced(readings: Vec<Vec<f64>>, sample_rate_hz: f64, start_secs: f64) -> Self {
        let timestamps = (0..readings.len())
            .map(|i| start_secs + i as f64 / sample_rate_hz)
            .collect();
        Self {
            readings,
            timestamps,
        }
    }
    pub fn validate(&self) -> Result<(), BlinkError> {
        if self.readings.len() != self.timestamps.len() {
            return Err(BlinkError::LengthMismatch {
                samples: self.readings.len(),
                timestamps: self.timestamps.len(),
            });
        }
        if let Some(width) = self.num_channels() {
            if let Some(bad) = self.readings.iter().find(|r| r.len() != width) {
                return Err(BlinkError::ChannelMismatch {
                    expected: width,
                    actual: bad.len(),
                });
            }
        }
        Ok(())
    }
    pub fn len(&self) -> usize {
        self.readings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
    pub fn num_channels(&self) -> Option<usize> {
        self.readings.first().map(|r| r.len())
    }
    /// Splits off everything after the first `at` readings.
    fn split_off(&mut self, at: usize) -> SampleChunk {
        SampleChunk {
            readings: self.readings.split_off(at),
            timestamps: self.timestamps.split_off(at.min(self.timestamps.len())),
        }
    }
}
/// Anything that can hand out sample chunks with a bounded wait.
pub trait SampleSource {
    fn sampling_rate_hz(&self) -> f64;
    /// Returns `Ok(None)` when nothing arrived within `timeout`.
    fn pull_chunk(
        &mut self,
        timeout: Duration,
        max_samples: usize,
    ) -> Result<Option<SampleChunk>, BlinkError>;
    /// Releases the underlying stream. Must be safe to call more than once.
    fn release(&mut self) -> Result<(), BlinkError> {
        Ok(())
    }
}
impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn sampling_rate_hz(&self) -> f64 {
        (**self).sampling_rate_hz()
    }
    fn pull_chunk(
        &mut self,
        timeout: Duration,
        max_samples: usize,
    ) -> Result<Option<SampleChunk>, BlinkError> {
        (**self).pull_chunk(timeout, max_samples)
    }
    fn release(&mut self) -> Result<(), BlinkError> {
        (**self).release()
    }
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    sample_rate_hz: f64,
    queue: VecDeque<SampleChunk>,
    repeat: Option<SampleChunk>,
    released: bool,
}
impl ManualSource {
    pub fn new(sample_rate_hz: f64, chunks: impl IntoIterator<Item = SampleChunk>) -> Self {
        Self {
            sample_rate_hz,
            queue: chunks.into_iter().collect(),
            repeat: None,
            released: false,
        }
    }
    /// Hands out a clone of `chunk` on every pull, forever.
    pub fn repeating(sample_rate_hz: f64, chunk: SampleChunk) -> Self {
        Self {
            sample_rate_hz,
            queue: VecDeque::new(),
            repeat: Some(chunk),
            released: false,
        }
    }
    pub fn is_released(&self) -> bool {
        self.released
    }
}
impl SampleSource for ManualSource {
    fn sampling_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    fn pull_chunk(
        &mut self,
        _timeout: Duration,
        max_samples: usize,
    ) -> Result<Option<SampleChunk>, BlinkError> {
        if self.released {
            return Ok(None);
        }
        let mut chunk = match self.queue.pop_front() {
            Some(c) => c,
            None => match &self.repeat {
                Some(c) => c.clone(),
                None => return Ok(None),
            },
        };
        if chunk.len() > max_samples && max_samples > 0 {
            let rest = chunk.split_off(max_samples);
            self.queue.push_front(rest);
        }
        Ok(Some(chunk))
    }
    fn release(&mut self) -> Result<(), BlinkError> {
        self.released = true;
        Ok(())
    }
}
/// Muse-shaped synthetic EEG: low-level noise plus a faint 10 Hz rhythm,
/// with strong alpha bursts that can be injected on demand.
pub struct SyntheticSource {
    sample_rate_hz: f64,
    channels: usize,
    rng: StdRng,
    sample_index: u64,
    burst_remaining: usize,
    /// (period, length) in samples for automatically repeating bursts.
    periodic: Option<(u64, usize)>,
    last_pull: Option<Instant>,
    pub noise_amplitude: f64,
    pub burst_amplitude: f64,
}
impl SyntheticSource {
    const BACKGROUND_ALPHA: f64 = 2.0;
    const ALPHA_HZ: f64 = 10.0;
    pub fn new(sample_rate_hz: f64, channels: usize, seed: u64) -> Self {
        Self {
            sample_rate_hz,
            channels,
            rng: StdRng::seed_from_u64(seed),
            sample_index: 0,
            burst_remaining: 0,
            periodic: None,
            last_pull: None,
            noise_amplitude: 5.0,
            burst_amplitude: 80.0,
        }
    }
    /// Adds a strong 10 Hz component for the next `seconds` of signal.
    pub fn inject_alpha_burst(&mut self, seconds: f64) {
        self.burst_remaining = (seconds * self.sample_rate_hz).round() as usize;
    }
    /// Starts a `burst_secs` alpha burst every `period_secs` of signal.
    pub fn with_periodic_bursts(mut self, period_secs: f64, burst_secs: f64) -> Self {
        let period = (period_secs * self.sample_rate_hz).round() as u64;
        let length = (burst_secs * self.sample_rate_hz).round() as usize;
        self.periodic = (period > 0).then_some((period, length));
        self
    }
    /// Produces the next `n` readings without touching the wall clock.
    pub fn generate(&mut self, n: usize) -> SampleChunk {
        let mut readings = Vec::with_capacity(n);
        let mut timestamps = Vec::with_capacity(n);
        for _ in 0..n {
            let t = self.sample_index as f64 / self.sample_rate_hz;
            if let Some((period, length)) = self.periodic {
                if self.sample_index > 0 && self.sample_index % period == 0 {
                    self.burst_remaining = length;
                }
            }
            let mut amplitude = Self::BACKGROUND_ALPHA;
            if self.burst_remaining > 0 {
                amplitude += self.burst_amplitude;
                self.burst_remaining -= 1;
            }
            let rhythm = amplitude * (2.0 * PI * Self::ALPHA_HZ * t).sin();
            let reading = (0..self.channels)
                .map(|_| rhythm + self.rng.gen_range(-1.0..1.0) * self.noise_amplitude)
                .collect();
            readings.push(reading);
            timestamps.push(t);
            self.sample_index += 1;
        }
        SampleChunk::new(readings, timestamps)
    }
}
impl SampleSource for SyntheticSource {
    fn sampling_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    fn pull_chunk(
        &mut self,
        timeout: Duration,
        max_samples: usize,
    ) -> Result<Option<SampleChunk>, BlinkError> {
        let started = Instant::now();
        let since = *self.last_pull.get_or_insert(started);
        let per_sample = Duration::from_secs_f64(1.0 / self.sample_rate_hz);
        // Paced like a real headset: wait until at least one sample is due.
        loop {
            let due = (since.elapsed().as_secs_f64() * self.sample_rate_hz) as usize;
            if due > 0 {
                let n = due.min(max_samples);
                self.last_pull = Some(since + per_sample * n as u32);
                return Ok(Some(self.generate(n)));
            }
            if started.elapsed() >= timeout {
                return Ok(None);
            }
            thread::sleep(per_sample.min(timeout));
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn chunk_of(n: usize) -> SampleChunk {
        SampleChunk::evenly_spaced(
            (0..n).map(|i| vec![i as f64, -(i as f64)]).collect(),
            256.0,
            0.0,
        )
    }
    #[test]
    fn validate_rejects_mismatched_timestamps() {
        let chunk = SampleChunk::new(vec![vec![0.0; 4]; 3], vec![0.0, 1.0]);
        let err = chunk.validate().unwrap_err();
        assert!(matches!(
            err,
            BlinkError::LengthMismatch {
                samples: 3,
                timestamps: 2
            }
        ));
    }
    #[test]
    fn validate_rejects_ragged_readings() {
        let chunk = SampleChunk::new(vec![vec![0.0; 4], vec![0.0; 3]], vec![0.0, 1.0]);
        assert!(matches!(
            chunk.validate(),
            Err(BlinkError::ChannelMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }
    #[test]
    fn manual_source_splits_oversized_chunks() {
        let mut source = ManualSource::new(256.0, vec![chunk_of(300)]);
        let first = source
            .pull_chunk(Duration::from_millis(50), 128)
            .unwrap()
            .unwrap();
        assert_eq!(first.len(), 128);
        let second = source
            .pull_chunk(Duration::from_millis(50), 128)
            .unwrap()
            .unwrap();
        assert_eq!(second.readings[0][0], 128.0);
        assert_eq!(second.timestamps.len(), second.readings.len());
        let third = source
            .pull_chunk(Duration::from_millis(50), 128)
            .unwrap()
            .unwrap();
        assert_eq!(third.len(), 44);
        assert!(source
            .pull_chunk(Duration::from_millis(50), 128)
            .unwrap()
            .is_none());
    }
    #[test]
    fn released_manual_source_goes_quiet() {
        let mut source = ManualSource::repeating(256.0, chunk_of(8));
        assert!(source.pull_chunk(Duration::ZERO, 128).unwrap().is_some());
        source.release().unwrap();
        source.release().unwrap();
        assert!(source.is_released());
        assert!(source.pull_chunk(Duration::ZERO, 128).unwrap().is_none());
    }
    #[test]
    fn synthetic_source_is_seeded() {
        let mut a = SyntheticSource::new(256.0, 4, 7);
        let mut b = SyntheticSource::new(256.0, 4, 7);
        let ca = a.generate(64);
        assert_eq!(ca, b.generate(64));
        assert_eq!(ca.num_channels(), Some(4));
        assert!(ca.validate().is_ok());
    }
    #[test]
    fn periodic_bursts_repeat() {
        let mut source = SyntheticSource::new(256.0, 1, 1).with_periodic_bursts(1.0, 0.25);
        source.noise_amplitude = 0.0;
        let chunk = source.generate(256 * 3);
        let peak = |from: usize| {
            chunk.readings[from..from + 64]
                .iter()
                .map(|r| r[0].abs())
                .fold(0.0, f64::max)
        };
        assert!(peak(0) <= SyntheticSource::BACKGROUND_ALPHA);
        assert!(peak(256) > 50.0);
        assert!(peak(384) <= SyntheticSource::BACKGROUND_ALPHA);
        assert!(peak(512) > 50.0);
    }
}
