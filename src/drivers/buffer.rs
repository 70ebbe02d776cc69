use std::collections::VecDeque;
use ndarray::Array2;
use crate::drivers::{BlinkError, SampleChunk};
/// Fixed-capacity sliding window of multi-channel readings, newest last.
pub struct RollingBuffer {
    readings: VecDeque<Vec<f64>>,
    capacity: usize,
    channels: Option<usize>,
}
impl RollingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
            channels: None,
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn len(&self) -> usize {
        self.readings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
    pub fn channels(&self) -> Option<usize> {
        self.channels
    }
    /// Appends every reading of `chunk`, evicting the oldest past capacity.
    /// A malformed chunk is rejected whole; nothing is appended.
    pub fn append(&mut self, chunk: &SampleChunk) -> Result<(), BlinkError> {
        chunk.validate()?;
        let Some(width) = chunk.num_channels() else {
            return Ok(());
        };
        match self.channels {
            Some(expected) if expected != width => {
                return Err(BlinkError::ChannelMismatch {
                    expected,
                    actual: width,
                });
            }
            Some(_) => {}
            None => self.channels = Some(width),
        }
        for reading in &chunk.readings {
            if self.readings.len() == self.capacity {
                self.readings.pop_front();
            }
            if self.capacity > 0 {
                self.readings.push_back(reading.clone());
            }
        }
        Ok(())
    }
    /// Owned samples x channels copy of the current window.
    pub fn snapshot(&self) -> Array2<f64> {
        let cols = self.channels.unwrap_or(0);
        let flat: Vec<f64> = self.readings.iter().flatten().copied().collect();
        Array2::from_shape_vec((self.readings.len(), cols), flat)
            .unwrap_or_else(|_| Array2::zeros((0, cols)))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn ramp(start: usize, n: usize) -> SampleChunk {
        SampleChunk::evenly_spaced(
            (start..start + n).map(|i| vec![i as f64, 0.5]).collect(),
            256.0,
            start as f64 / 256.0,
        )
    }
    #[test]
    fn keeps_most_recent_readings_in_order() {
        let mut buffer = RollingBuffer::new(256);
        let mut fed = 0;
        for n in [100, 128, 7, 300, 1, 64] {
            buffer.append(&ramp(fed, n)).unwrap();
            fed += n;
            assert!(buffer.len() <= buffer.capacity());
            let snap = buffer.snapshot();
            let expected_len = fed.min(256);
            assert_eq!(snap.nrows(), expected_len);
            let first = (fed - expected_len) as f64;
            for (i, row) in snap.rows().into_iter().enumerate() {
                assert_eq!(row[0], first + i as f64);
            }
        }
    }
    #[test]
    fn empty_chunk_is_noop() {
        let mut buffer = RollingBuffer::new(4);
        buffer.append(&SampleChunk::default()).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.channels(), None);
        assert_eq!(buffer.snapshot().dim(), (0, 0));
    }
    #[test]
    fn rejects_mismatched_lengths_without_truncating() {
        let mut buffer = RollingBuffer::new(8);
        buffer.append(&ramp(0, 3)).unwrap();
        let bad = SampleChunk::new(vec![vec![1.0, 1.0]; 4], vec![0.0; 3]);
        assert!(matches!(
            buffer.append(&bad),
            Err(BlinkError::LengthMismatch { .. })
        ));
        assert_eq!(buffer.len(), 3);
    }
    #[test]
    fn rejects_channel_count_change() {
        let mut buffer = RollingBuffer::new(8);
        buffer.append(&ramp(0, 2)).unwrap();
        let wider = SampleChunk::new(vec![vec![0.0; 4]], vec![0.0]);
        assert!(matches!(
            buffer.append(&wider),
            Err(BlinkError::ChannelMismatch {
                expected: 2,
                actual: 4
            })
        ));
    }
    #[test]
    fn snapshot_is_detached() {
        let mut buffer = RollingBuffer::new(4);
        buffer.append(&ramp(0, 4)).unwrap();
        let snap = buffer.snapshot();
        buffer.append(&ramp(4, 4)).unwrap();
        assert_eq!(snap[[0, 0]], 0.0);
        assert_eq!(buffer.snapshot()[[0, 0]], 4.0);
    }
}
