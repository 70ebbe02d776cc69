// src/types.rs

/// Where blink events come from.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum InputMode {
    /// No EEG; Space stands in for a blink.
    Simulation,
    Headset,
    /// Full pipeline fed by the built-in generator.
    Synthetic,
}
impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            InputMode::Simulation => "SIM",
            InputMode::Headset => "MUSE",
            InputMode::Synthetic => "SYNTH",
        }
    }
    pub fn runs_pipeline(self) -> bool {
        !matches!(self, InputMode::Simulation)
    }
}

/// One point of the detector trace shown next to the game.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorSample {
    pub time_secs: f64,
    pub alpha_average: f64,
    pub alpha_threshold: f64,
}
