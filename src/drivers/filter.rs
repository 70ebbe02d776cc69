use std::f64::consts::PI;
use rustfft::num_complex::Complex64;
use crate::drivers::BlinkError;
#[derive(Clone, Copy, Debug, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}
impl BiquadCoeffs {
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
    fn response(&self, z: Complex64) -> Complex64 {
        let zi = z.inv();
        let zi2 = zi * zi;
        (zi * self.b1 + zi2 * self.b2 + self.b0) / (zi * self.a1 + zi2 * self.a2 + 1.0)
    }
    /// Transposed direct form II state after settling on a constant input `x`.
    fn steady_state(&self, x: f64) -> BiquadState {
        let y = self.dc_gain() * x;
        let z2 = self.b2 * x - self.a2 * y;
        let z1 = self.b1 * x - self.a1 * y + z2;
        BiquadState { z1, z2 }
    }
}
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}
#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}
impl BiquadFilter {
    fn new(coeffs: BiquadCoeffs, state: BiquadState) -> Self {
        Self { coeffs, state }
    }
    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}
/// Digital Butterworth band-pass realised as a cascade of second-order sections.
#[derive(Clone, Debug)]
pub struct Butterworth {
    order: usize,
    sections: Vec<BiquadCoeffs>,
}
impl Butterworth {
    /// Band-pass of prototype `order` (2 x `order` poles) between `low_hz` and `high_hz`.
    pub fn bandpass(
        order: usize,
        low_hz: f64,
        high_hz: f64,
        sample_rate_hz: f64,
    ) -> Result<Self, BlinkError> {
        if sample_rate_hz <= 0.0 {
            return Err(BlinkError::InvalidSampleRate);
        }
        if order == 0 {
            return Err(BlinkError::InvalidConfig("filter order must be at least 1".into()));
        }
        let (low, high) = band_edges(low_hz, high_hz, sample_rate_hz * 0.5);
        if low >= high {
            return Err(BlinkError::InvalidConfig(format!(
                "band-pass edges {low_hz}..{high_hz} Hz collapse at {sample_rate_hz} Hz"
            )));
        }
        // Pre-warp so the bilinear transform lands the corners where asked.
        let fs2 = 2.0 * sample_rate_hz;
        let wl = fs2 * (PI * low / sample_rate_hz).tan();
        let wh = fs2 * (PI * high / sample_rate_hz).tan();
        let bw = wh - wl;
        let w0_sq = wl * wh;
        let mut poles = Vec::with_capacity(2 * order);
        for k in 0..order {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            let half = Complex64::from_polar(1.0, theta) * (bw * 0.5);
            let root = (half * half - w0_sq).sqrt();
            for s in [half + root, half - root] {
                poles.push((s + fs2) / (-s + fs2));
            }
        }
        let mut sections: Vec<BiquadCoeffs> = pair_poles(&poles)
            .into_iter()
            .map(|(a1, a2)| BiquadCoeffs {
                b0: 1.0,
                b1: 0.0,
                b2: -1.0,
                a1,
                a2,
            })
            .collect();
        // Unity gain at the (digital) geometric centre frequency.
        let center = 2.0 * (w0_sq.sqrt() / fs2).atan();
        let z = Complex64::from_polar(1.0, center);
        let gain: f64 = sections.iter().map(|s| s.response(z).norm()).product();
        if let Some(first) = sections.first_mut() {
            if gain > 0.0 && gain.is_finite() {
                first.b0 /= gain;
                first.b1 /= gain;
                first.b2 /= gain;
            }
        }
        Ok(Self { order, sections })
    }
    pub fn order(&self) -> usize {
        self.order
    }
    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }
    /// Edge padding used by [`Butterworth::filtfilt`]; shorter signals cannot be run zero-phase.
    pub fn pad_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1)
    }
    /// Magnitude response at `freq_hz`.
    pub fn gain_at(&self, freq_hz: f64, sample_rate_hz: f64) -> f64 {
        let z = Complex64::from_polar(1.0, 2.0 * PI * freq_hz / sample_rate_hz);
        self.sections.iter().map(|s| s.response(z).norm()).product()
    }
    /// Causal single pass from rest.
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        self.run(input, None)
    }
    /// Forward-backward pass with odd-extension padding. `None` when the
    /// signal is not longer than [`Butterworth::pad_len`].
    pub fn filtfilt(&self, input: &[f64]) -> Option<Vec<f64>> {
        let pad = self.pad_len();
        let n = input.len();
        if n <= pad {
            return None;
        }
        let first = input[0];
        let last = input[n - 1];
        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - input[i]));
        ext.extend_from_slice(input);
        ext.extend((1..=pad).map(|i| 2.0 * last - input[n - 1 - i]));
        let x0 = ext[0];
        let mut forward = self.run(&ext, Some(x0));
        forward.reverse();
        let y0 = forward[0];
        let mut backward = self.run(&forward, Some(y0));
        backward.reverse();
        Some(backward[pad..pad + n].to_vec())
    }
    /// Runs the cascade; `settle` primes every section for a constant input at that level.
    fn run(&self, input: &[f64], settle: Option<f64>) -> Vec<f64> {
        let mut level = settle.unwrap_or(0.0);
        let mut chain: Vec<BiquadFilter> = Vec::with_capacity(self.sections.len());
        for coeffs in &self.sections {
            let state = match settle {
                Some(_) => coeffs.steady_state(level),
                None => BiquadState::default(),
            };
            chain.push(BiquadFilter::new(*coeffs, state));
            level *= coeffs.dc_gain();
        }
        input
            .iter()
            .map(|&x| chain.iter_mut().fold(x, |acc, section| section.process(acc)))
            .collect()
    }
}
/// Groups z-plane poles into `(a1, a2)` denominators: conjugate pairs first, then real pairs.
fn pair_poles(poles: &[Complex64]) -> Vec<(f64, f64)> {
    const EPS: f64 = 1e-12;
    let mut out = Vec::with_capacity(poles.len() / 2);
    let mut reals: Vec<f64> = Vec::new();
    for p in poles {
        if p.im > EPS {
            out.push((-2.0 * p.re, p.norm_sqr()));
        } else if p.im.abs() <= EPS {
            reals.push(p.re);
        }
    }
    reals.sort_by(|a, b| a.total_cmp(b));
    for pair in reals.chunks(2) {
        match pair {
            [r1, r2] => out.push((-(r1 + r2), r1 * r2)),
            [r] => out.push((-r, 0.0)),
            _ => {}
        }
    }
    out
}
fn nyquist_clamp(freq_hz: f64, nyquist: f64) -> f64 {
    freq_hz.clamp(0.01, nyquist - 0.01)
}
fn band_edges(low_hz: f64, high_hz: f64, nyquist: f64) -> (f64, f64) {
    let low = nyquist_clamp(low_hz.min(high_hz), nyquist);
    let high = nyquist_clamp(low_hz.max(high_hz), nyquist);
    (low, high)
}
#[cfg(test)]
mod tests {
    use super::*;
    fn sine(freq_hz: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / fs).sin())
            .collect()
    }
    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }
    #[test]
    fn design_has_expected_shape() {
        let bp = Butterworth::bandpass(4, 1.0, 40.0, 256.0).unwrap();
        assert_eq!(bp.order(), 4);
        assert_eq!(bp.num_sections(), 4);
        assert_eq!(bp.pad_len(), 27);
    }
    #[test]
    fn passes_band_and_rejects_outside() {
        let bp = Butterworth::bandpass(4, 1.0, 40.0, 256.0).unwrap();
        let fs: f64 = 256.0;
        let wl = 2.0 * fs * (PI * 1.0 / fs).tan();
        let wh = 2.0 * fs * (PI * 40.0 / fs).tan();
        let center_hz = 2.0 * ((wl * wh).sqrt() / (2.0 * fs)).atan() * fs / (2.0 * PI);
        assert!((bp.gain_at(center_hz, fs) - 1.0).abs() < 1e-9);
        assert!(bp.gain_at(10.0, 256.0) > 0.95);
        assert!(bp.gain_at(0.0, 256.0) < 1e-9);
        assert!(bp.gain_at(100.0, 256.0) < 0.01);
    }
    #[test]
    fn filtfilt_removes_dc_offset() {
        let bp = Butterworth::bandpass(4, 1.0, 40.0, 256.0).unwrap();
        let signal: Vec<f64> = sine(10.0, 256.0, 256).iter().map(|v| v + 500.0).collect();
        let out = bp.filtfilt(&signal).unwrap();
        assert_eq!(out.len(), signal.len());
        let middle = &out[64..192];
        let mean = middle.iter().sum::<f64>() / middle.len() as f64;
        assert!(mean.abs() < 5.0, "mean {mean}");
        assert!((rms(middle) - rms(&sine(10.0, 256.0, 128))).abs() < 0.1);
    }
    #[test]
    fn filtfilt_needs_more_than_pad_len() {
        let bp = Butterworth::bandpass(4, 1.0, 40.0, 256.0).unwrap();
        assert!(bp.filtfilt(&vec![1.0; 27]).is_none());
        assert!(bp.filtfilt(&vec![1.0; 28]).is_some());
        assert_eq!(bp.filter(&vec![1.0; 10]).len(), 10);
    }
    #[test]
    fn zero_input_stays_zero() {
        let bp = Butterworth::bandpass(4, 1.0, 40.0, 256.0).unwrap();
        assert!(bp.filtfilt(&[0.0; 256]).unwrap().iter().all(|v| *v == 0.0));
        assert!(bp.filter(&[0.0; 256]).iter().all(|v| *v == 0.0));
    }
    #[test]
    fn rejects_collapsed_band() {
        assert!(Butterworth::bandpass(4, 40.0, 40.0, 256.0).is_err());
        assert!(Butterworth::bandpass(4, 1.0, 40.0, 0.0).is_err());
    }
}
