use std::f64::consts::PI;
use log::warn;
use ndarray::{s, ArrayView2, Axis};
use rustfft::{num_complex::Complex64, FftPlanner};
use serde::{Deserialize, Serialize};
use crate::drivers::filter::Butterworth;
/// The four fixed EEG bands the detector looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
}
impl Band {
    pub const ALL: [Band; 4] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta];
    /// Inclusive on both ends, so neighbouring bands share their boundary bin.
    pub fn range_hz(self) -> (f64, f64) {
        match self {
            Band::Delta => (1.0, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 13.0),
            Band::Beta => (13.0, 30.0),
        }
    }
    pub fn name(self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
        }
    }
}
/// Mean PSD per band. Every band is always present; an empty mask reads 0.0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
}
impl BandPowers {
    pub fn get(&self, band: Band) -> f64 {
        match band {
            Band::Delta => self.delta,
            Band::Theta => self.theta,
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
        }
    }
    fn set(&mut self, band: Band, value: f64) {
        match band {
            Band::Delta => self.delta = value,
            Band::Theta => self.theta = value,
            Band::Alpha => self.alpha = value,
            Band::Beta => self.beta = value,
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = (Band, f64)> + '_ {
        Band::ALL.iter().map(move |&b| (b, self.get(b)))
    }
}
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    pub low_cut_hz: f64,
    pub high_cut_hz: f64,
    pub filter_order: usize,
    /// Below this many samples the signal is passed through unfiltered.
    pub min_filter_len: usize,
    /// Welch segment length in seconds (capped by the signal length).
    pub window_seconds: f64,
    /// Half-open column range averaged into the frontal signal (AF7, AF8 on a Muse).
    pub frontal_channels: (usize, usize),
}
impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            low_cut_hz: 1.0,
            high_cut_hz: 40.0,
            filter_order: 4,
            min_filter_len: 30,
            window_seconds: 1.0,
            frontal_channels: (1, 3),
        }
    }
}
/// Stateless band-power estimator: frontal reduction, band-pass, Welch PSD.
#[derive(Clone, Debug, Default)]
pub struct SpectralEstimator {
    config: SpectralConfig,
}
impl SpectralEstimator {
    pub fn new(config: SpectralConfig) -> Self {
        Self { config }
    }
    pub fn compute_band_powers(
        &self,
        snapshot: ArrayView2<'_, f64>,
        sample_rate_hz: f64,
    ) -> BandPowers {
        let signal = self.frontal_signal(snapshot);
        if signal.is_empty() || sample_rate_hz <= 0.0 {
            return BandPowers::default();
        }
        let filtered = self.band_limit(signal, sample_rate_hz);
        let nperseg = segment_len(sample_rate_hz, self.config.window_seconds, filtered.len());
        let (freqs, psd) = welch(&filtered, sample_rate_hz, nperseg);
        let mut powers = BandPowers::default();
        for band in Band::ALL {
            let (lo, hi) = band.range_hz();
            let (sum, count) = freqs
                .iter()
                .zip(&psd)
                .filter(|(f, _)| **f >= lo && **f <= hi)
                .fold((0.0, 0usize), |(s, c), (_, p)| (s + p, c + 1));
            powers.set(band, if count > 0 { sum / count as f64 } else { 0.0 });
        }
        powers
    }
    fn frontal_signal(&self, data: ArrayView2<'_, f64>) -> Vec<f64> {
        let (rows, cols) = data.dim();
        if rows == 0 || cols == 0 {
            return Vec::new();
        }
        if cols < 2 {
            return data.column(0).to_vec();
        }
        let (start, end) = self.config.frontal_channels;
        let hi = end.min(cols).max(1);
        let lo = start.min(hi - 1);
        data.slice(s![.., lo..hi])
            .mean_axis(Axis(1))
            .map(|m| m.to_vec())
            .unwrap_or_default()
    }
    fn band_limit(&self, signal: Vec<f64>, sample_rate_hz: f64) -> Vec<f64> {
        if signal.len() < self.config.min_filter_len {
            return signal;
        }
        let design = Butterworth::bandpass(
            self.config.filter_order,
            self.config.low_cut_hz,
            self.config.high_cut_hz,
            sample_rate_hz,
        );
        match design {
            Ok(bp) => bp.filtfilt(&signal).unwrap_or_else(|| bp.filter(&signal)),
            Err(err) => {
                warn!("band-pass skipped: {err}");
                signal
            }
        }
    }
}
/// Convenience wrapper using the default configuration.
pub fn compute_band_powers(snapshot: ArrayView2<'_, f64>, sample_rate_hz: f64) -> BandPowers {
    SpectralEstimator::default().compute_band_powers(snapshot, sample_rate_hz)
}
/// Welch PSD: periodic Hann window, 50% overlap, constant detrend,
/// density scaling, one-sided. Requires `1 <= nperseg <= signal.len()`.
/// Welch segment length: the window in whole samples (fractions dropped),
/// capped at the signal length and never below one.
fn segment_len(sample_rate_hz: f64, window_seconds: f64, signal_len: usize) -> usize {
    ((sample_rate_hz * window_seconds) as usize).clamp(1, signal_len.max(1))
}
pub fn welch(signal: &[f64], sample_rate_hz: f64, nperseg: usize) -> (Vec<f64>, Vec<f64>) {
    let n_freqs = nperseg / 2 + 1;
    let freqs: Vec<f64> = (0..n_freqs)
        .map(|k| k as f64 * sample_rate_hz / nperseg as f64)
        .collect();
    let window = hann_periodic(nperseg);
    let win_energy: f64 = window.iter().map(|w| w * w).sum();
    if nperseg == 0 || signal.len() < nperseg || win_energy <= 0.0 {
        return (freqs, vec![0.0; n_freqs]);
    }
    let scale = 1.0 / (sample_rate_hz * win_energy);
    let noverlap = nperseg / 2;
    let step = nperseg - noverlap;
    let n_segments = (signal.len() - noverlap) / step;
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nperseg);
    let mut psd = vec![0.0; n_freqs];
    let mut buffer = vec![Complex64::new(0.0, 0.0); nperseg];
    for seg in 0..n_segments {
        let segment = &signal[seg * step..seg * step + nperseg];
        let mean = segment.iter().sum::<f64>() / nperseg as f64;
        for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(&window) {
            *slot = Complex64::new((x - mean) * w, 0.0);
        }
        fft.process(&mut buffer);
        for (acc, c) in psd.iter_mut().zip(&buffer) {
            *acc += c.norm_sqr() * scale;
        }
    }
    let nyquist_bin = if nperseg % 2 == 0 { Some(n_freqs - 1) } else { None };
    for (k, p) in psd.iter_mut().enumerate() {
        *p /= n_segments.max(1) as f64;
        if k > 0 && Some(k) != nyquist_bin {
            *p *= 2.0;
        }
    }
    (freqs, psd)
}
fn hann_periodic(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}
