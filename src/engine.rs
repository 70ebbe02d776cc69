// src/engine.rs
use std::collections::VecDeque;
use std::time::Instant;
use log::{error, info, warn};
use crate::config::AppConfig;
use crate::drivers::{BandPowers, BlinkError, BlinkPipeline, SampleSource};
use crate::types::{DetectorSample, InputMode};
const HISTORY_LEN: usize = 600;
/// What a single frame's poll of the EEG side produced.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub blink: bool,
    pub powers: Option<BandPowers>,
}
/// Owns the sample source and pipeline for the lifetime of a session.
/// Everything runs on the caller's thread, one bounded pull per frame.
pub struct BlinkEngine {
    mode: InputMode,
    source: Option<Box<dyn SampleSource>>,
    pipeline: Option<BlinkPipeline>,
    history: VecDeque<DetectorSample>,
    started: Instant,
    shut_down: bool,
}
impl BlinkEngine {
    /// Keyboard-only session; `poll_frame` never reports a blink.
    pub fn simulation() -> Self {
        Self {
            mode: InputMode::Simulation,
            source: None,
            pipeline: None,
            history: VecDeque::new(),
            started: Instant::now(),
            shut_down: false,
        }
    }
    pub fn with_source(
        mode: InputMode,
        source: Box<dyn SampleSource>,
        config: &AppConfig,
    ) -> Result<Self, BlinkError> {
        let pipeline = BlinkPipeline::new(config, source.sampling_rate_hz())?;
        Ok(Self {
            mode,
            source: Some(source),
            pipeline: Some(pipeline),
            history: VecDeque::with_capacity(HISTORY_LEN),
            started: Instant::now(),
            shut_down: false,
        })
    }
    pub fn mode(&self) -> InputMode {
        self.mode
    }
    pub fn pipeline(&self) -> Option<&BlinkPipeline> {
        self.pipeline.as_ref()
    }
    pub fn history(&self) -> impl Iterator<Item = &DetectorSample> {
        self.history.iter()
    }
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
    /// One bounded pull -> buffer -> estimator -> detector pass.
    ///
    /// Any error ends the session: it is logged, resources are released and
    /// the error is handed back so the caller can close the window.
    pub fn poll_frame(&mut self) -> Result<FrameReport, BlinkError> {
        if self.shut_down {
            return Ok(FrameReport::default());
        }
        let (Some(source), Some(pipeline)) = (self.source.as_mut(), self.pipeline.as_mut()) else {
            return Ok(FrameReport::default());
        };
        let tick = match pipeline.pump_once(source) {
            Ok(tick) => tick,
            Err(err) => {
                error!("{} session stopped: {err}", self.mode.label());
                self.shutdown();
                return Err(err);
            }
        };
        if tick.powers.is_some() {
            let detector = pipeline.detector();
            if self.history.len() == HISTORY_LEN {
                self.history.pop_front();
            }
            self.history.push_back(DetectorSample {
                time_secs: self.started.elapsed().as_secs_f64(),
                alpha_average: detector.alpha_average(),
                alpha_threshold: detector.alpha_threshold(),
            });
        }
        Ok(FrameReport {
            blink: tick.blink,
            powers: tick.powers,
        })
    }
    /// Releases the source once; later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Some(mut source) = self.source.take() {
            match source.release() {
                Ok(()) => info!("{} source released", self.mode.label()),
                Err(err) => warn!("releasing {} source failed: {err}", self.mode.label()),
            }
        }
    }
}
impl Drop for BlinkEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;
    use crate::detector::DetectorConfig;
    use crate::drivers::{ManualSource, SampleChunk, SyntheticSource};
    /// Counts releases so the shutdown path can be checked from outside.
    struct CountingSource {
        inner: ManualSource,
        releases: Rc<Cell<u32>>,
    }
    impl SampleSource for CountingSource {
        fn sampling_rate_hz(&self) -> f64 {
            self.inner.sampling_rate_hz()
        }
        fn pull_chunk(
            &mut self,
            timeout: Duration,
            max_samples: usize,
        ) -> Result<Option<SampleChunk>, BlinkError> {
            self.inner.pull_chunk(timeout, max_samples)
        }
        fn release(&mut self) -> Result<(), BlinkError> {
            self.releases.set(self.releases.get() + 1);
            self.inner.release()
        }
    }
    fn counting(chunks: Vec<SampleChunk>) -> (Box<dyn SampleSource>, Rc<Cell<u32>>) {
        let releases = Rc::new(Cell::new(0));
        let source = CountingSource {
            inner: ManualSource::new(256.0, chunks),
            releases: releases.clone(),
        };
        (Box::new(source), releases)
    }
    #[test]
    fn simulation_never_blinks() {
        let mut engine = BlinkEngine::simulation();
        assert_eq!(engine.poll_frame().unwrap(), FrameReport::default());
        assert!(!engine.mode().runs_pipeline());
    }
    #[test]
    fn alpha_burst_reports_blink_and_history() {
        let mut config = AppConfig::default();
        config.detector = DetectorConfig {
            alpha_threshold: 20.0,
            adaptive_threshold: false,
            ..DetectorConfig::default()
        };
        let mut synth = SyntheticSource::new(256.0, 4, 3);
        synth.inject_alpha_burst(1.0);
        let burst = synth.generate(256);
        let (source, _) = counting(vec![burst.clone(), burst]);
        let mut engine = BlinkEngine::with_source(InputMode::Synthetic, source, &config).unwrap();
        let mut blinks = 0;
        for _ in 0..4 {
            if engine.poll_frame().unwrap().blink {
                blinks += 1;
            }
        }
        assert_eq!(blinks, 1);
        assert_eq!(engine.history().count(), 4);
    }
    #[test]
    fn shutdown_releases_exactly_once() {
        let (source, releases) = counting(Vec::new());
        let mut engine =
            BlinkEngine::with_source(InputMode::Headset, source, &AppConfig::default()).unwrap();
        engine.shutdown();
        engine.shutdown();
        drop(engine);
        assert_eq!(releases.get(), 1);
    }
    #[test]
    fn input_error_ends_session() {
        let bad = SampleChunk::new(vec![vec![0.0; 4]; 2], vec![0.0]);
        let (source, releases) = counting(vec![bad]);
        let mut engine =
            BlinkEngine::with_source(InputMode::Headset, source, &AppConfig::default()).unwrap();
        assert!(engine.poll_frame().is_err());
        assert!(engine.is_shut_down());
        assert_eq!(releases.get(), 1);
        assert_eq!(engine.poll_frame().unwrap(), FrameReport::default());
    }
}
