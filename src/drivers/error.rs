use thiserror::Error;
/// Coarse classification used by callers that only care about the failure family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Input,
    Calibration,
    Config,
    Interrupted,
}
#[derive(Debug, Error)]
pub enum BlinkError {
    #[error("no EEG stream available: {0}")]
    Connection(String),
    #[error("chunk has {samples} readings but {timestamps} timestamps")]
    LengthMismatch { samples: usize, timestamps: usize },
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("no band power observations were collected during calibration")]
    NoCalibrationSamples,
    #[error("calibrated {band} threshold {threshold} is not positive; check electrode contact")]
    NonPositiveBaseline { band: &'static str, threshold: f64 },
    #[error("adaptive alpha threshold collapsed to {threshold:.3} (floor {floor}); sensor contact lost?")]
    ThresholdCollapsed { threshold: f64, floor: f64 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("stopped by user")]
    Interrupted,
}
impl BlinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlinkError::Connection(_) => ErrorKind::Connection,
            BlinkError::LengthMismatch { .. }
            | BlinkError::ChannelMismatch { .. }
            | BlinkError::InvalidSampleRate => ErrorKind::Input,
            BlinkError::NoCalibrationSamples
            | BlinkError::NonPositiveBaseline { .. }
            | BlinkError::ThresholdCollapsed { .. } => ErrorKind::Calibration,
            BlinkError::InvalidConfig(_)
            | BlinkError::ConfigIo(_)
            | BlinkError::ConfigParse(_) => ErrorKind::Config,
            BlinkError::Interrupted => ErrorKind::Interrupted,
        }
    }
    /// Errors that must end the detection session rather than be absorbed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BlinkError::ThresholdCollapsed { .. })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            BlinkError::Connection("timeout".into()).kind(),
            ErrorKind::Connection
        );
        assert_eq!(
            BlinkError::LengthMismatch { samples: 3, timestamps: 2 }.kind(),
            ErrorKind::Input
        );
        assert_eq!(BlinkError::NoCalibrationSamples.kind(), ErrorKind::Calibration);
        let collapse = BlinkError::ThresholdCollapsed { threshold: 1.0, floor: 10.0 };
        assert_eq!(collapse.kind(), ErrorKind::Calibration);
        assert!(collapse.is_fatal());
        assert!(!BlinkError::NoCalibrationSamples.is_fatal());
        assert_eq!(BlinkError::Interrupted.kind(), ErrorKind::Interrupted);
    }
}
