// src/drivers/mod.rs
pub mod buffer;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod source;
pub mod spectral;
pub mod stats;
pub use buffer::RollingBuffer;
pub use error::{BlinkError, ErrorKind};
pub use filter::Butterworth;
pub use pipeline::{BlinkPipeline, Tick};
pub use source::{ManualSource, SampleChunk, SampleSource, SyntheticSource};
pub use spectral::{compute_band_powers, Band, BandPowers, SpectralConfig, SpectralEstimator};
