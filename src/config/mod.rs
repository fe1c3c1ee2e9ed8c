//! Configuration management.
//!
//! Handles loading and saving the application configuration from a TOML
//! file in the user's config directory, with first-run default creation.

pub mod file;

pub use file::{config_path, load_or_init, WaveseekConfig};
