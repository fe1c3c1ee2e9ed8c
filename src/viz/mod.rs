//! Terminal rendering for the wave display.
//!
//! `ui` owns the terminal lifecycle and input; `bars` is the widget that
//! paints a sample frame as mirrored bar columns.

pub mod bars;
pub mod ui;

pub use ui::{Hud, WaveCommand, WaveTui};
