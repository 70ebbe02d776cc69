//! Blink detection from a Muse-style EEG stream, driving a paddle game.
pub mod brainflow;
pub mod calibration;
pub mod clock;
pub mod config;
pub mod detector;
pub mod drivers;
pub mod engine;
pub mod game;
pub mod gui;
pub mod signal;
pub mod types;
