//! Procedural waveform synthesis.
//!
//! The generator turns elapsed time and a target loudness level into
//! per-frame bar geometry. It owns no rendering concerns; the `viz` layer
//! consumes its frames.

pub mod generator;

pub use generator::{BarSample, SampleFrame, SignalParams, WaveMode, WaveSignal};
