use std::fs;
use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::calibration::CalibrationConfig;
use crate::detector::DetectorConfig;
use crate::drivers::{BlinkError, SpectralConfig};
/// Buffering and polling policy shared by the live loop and calibration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Rolling buffer length in samples (one second at 256 Hz).
    pub buffer_capacity: usize,
    /// Band powers are only computed once the buffer holds this many samples.
    pub min_samples: usize,
    pub pull_timeout_ms: u64,
    pub max_samples: usize,
}
impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 256,
            min_samples: 64,
            pull_timeout_ms: 50,
            max_samples: 128,
        }
    }
}
/// BrainFlow board selection for the headset source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadsetConfig {
    /// BrainFlow board id; 38 is Muse 2 over native BLE.
    pub board_id: i32,
    pub serial_port: String,
    pub mac_address: String,
    pub serial_number: String,
    /// Discovery timeout handed to BrainFlow.
    pub connect_timeout_secs: i32,
    /// Directory holding the BoardController library; empty searches the loader path.
    pub library_dir: String,
}
impl Default for HeadsetConfig {
    fn default() -> Self {
        Self {
            board_id: 38,
            serial_port: String::new(),
            mac_address: String::new(),
            serial_number: String::new(),
            connect_timeout_secs: 5,
            library_dir: String::new(),
        }
    }
}
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stream: StreamConfig,
    pub headset: HeadsetConfig,
    pub spectral: SpectralConfig,
    pub detector: DetectorConfig,
    pub calibration: CalibrationConfig,
}
impl AppConfig {
    /// Reads a JSON file; missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, BlinkError> {
        let text = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
    pub fn validate(&self) -> Result<(), BlinkError> {
        let s = &self.stream;
        if s.buffer_capacity == 0 || s.max_samples == 0 {
            return Err(BlinkError::InvalidConfig(
                "buffer_capacity and max_samples must be positive".into(),
            ));
        }
        if s.min_samples > s.buffer_capacity {
            return Err(BlinkError::InvalidConfig(format!(
                "min_samples ({}) exceeds buffer_capacity ({})",
                s.min_samples, s.buffer_capacity
            )));
        }
        let sp = &self.spectral;
        if !(sp.low_cut_hz > 0.0 && sp.low_cut_hz < sp.high_cut_hz) {
            return Err(BlinkError::InvalidConfig(format!(
                "band-pass {}..{} Hz is not a valid band",
                sp.low_cut_hz, sp.high_cut_hz
            )));
        }
        if !(sp.window_seconds > 0.0 && sp.window_seconds.is_finite()) || sp.filter_order == 0 {
            return Err(BlinkError::InvalidConfig(
                "window_seconds and filter_order must be positive".into(),
            ));
        }
        let cal = &self.calibration;
        if !(cal.multiplier > 0.0 && cal.multiplier.is_finite()) {
            return Err(BlinkError::InvalidConfig(format!(
                "calibration multiplier {} must be positive and finite",
                cal.multiplier
            )));
        }
        if !(cal.duration_seconds > 0.0 && Duration::try_from_secs_f64(cal.duration_seconds).is_ok()) {
            return Err(BlinkError::InvalidConfig(format!(
                "calibration duration {} s is not a usable length of time",
                cal.duration_seconds
            )));
        }
        self.detector.validate()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ErrorKind;
    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stream.buffer_capacity, 256);
        assert_eq!(config.detector.debounce_time, 0.3);
        assert_eq!(config.detector.min_interval, 2.0);
        assert_eq!(config.detector.adaptive_cap, 10_000);
    }
    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "detector": { "alpha_threshold": 80.0, "require_delta": true } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.detector.alpha_threshold, 80.0);
        assert!(config.detector.require_delta);
        assert_eq!(config.detector.delta_threshold, 100.0);
        assert_eq!(config.stream.min_samples, 64);
    }
    #[test]
    fn load_reports_config_errors() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("blinkpong-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "stream": { "min_samples": 512 } }"#).unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        fs::write(&path, "not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(BlinkError::ConfigParse(_))));
        fs::remove_file(&path).ok();
        assert!(matches!(AppConfig::load(&path), Err(BlinkError::ConfigIo(_))));
    }
    #[test]
    fn unbounded_calibration_is_rejected() {
        for bad in [f64::INFINITY, f64::NAN, 1e300, -1.0] {
            let mut config = AppConfig::default();
            config.calibration.duration_seconds = bad;
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config, "{bad}");
        }
        let mut config = AppConfig::default();
        config.calibration.multiplier = f64::INFINITY;
        assert!(config.validate().is_err());
        config.calibration.multiplier = 3.0;
        config.calibration.duration_seconds = 30.0;
        assert!(config.validate().is_ok());
    }
}
