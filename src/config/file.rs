//! Configuration file management.
//!
//! Loads and saves the application configuration from a TOML file in the
//! user's config directory. Every field has a default, so a missing or
//! partial file never blocks startup; the first run writes the defaults
//! out so users have something to edit.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::signal::WaveMode;

/// Sampling variant setting, mirroring [`WaveMode`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaveModeSetting {
    /// Scrolling wave that follows the loudness level
    #[default]
    Flow,
    /// Static decorative profile at full level
    Fixed,
}

impl std::fmt::Display for WaveModeSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flow => write!(f, "flow"),
            Self::Fixed => write!(f, "fixed"),
        }
    }
}

impl From<WaveModeSetting> for WaveMode {
    fn from(setting: WaveModeSetting) -> Self {
        match setting {
            WaveModeSetting::Flow => WaveMode::Flow,
            WaveModeSetting::Fixed => WaveMode::Fixed,
        }
    }
}

/// Wave geometry and animation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveSection {
    /// Bar width in terminal cells
    #[serde(default = "default_bar_width")]
    pub bar_width: u16,
    /// Gap between bars in terminal cells
    #[serde(default = "default_gap_width")]
    pub gap_width: u16,
    /// Minimum rendered bar height in rows (bars stay visible at zero level)
    #[serde(default = "default_min_bar_height")]
    pub min_bar_height: f32,
    /// Smoothing responsiveness, 1-10 (values outside the range are clamped)
    #[serde(default = "default_sensitivity")]
    pub sensitivity: u8,
    /// Phase scroll divisor in milliseconds; smaller is faster, negative
    /// reverses direction
    #[serde(default = "default_offset_speed")]
    pub offset_speed: f32,
    /// Animation tick length in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Sampling variant: "flow" or "fixed"
    #[serde(default)]
    pub mode: WaveModeSetting,
}

fn default_bar_width() -> u16 {
    2
}

fn default_gap_width() -> u16 {
    1
}

fn default_min_bar_height() -> f32 {
    0.25
}

fn default_sensitivity() -> u8 {
    5
}

fn default_offset_speed() -> f32 {
    666.0
}

fn default_tick_ms() -> u64 {
    20
}

impl Default for WaveSection {
    fn default() -> Self {
        Self {
            bar_width: default_bar_width(),
            gap_width: default_gap_width(),
            min_bar_height: default_min_bar_height(),
            sensitivity: default_sensitivity(),
            offset_speed: default_offset_speed(),
            tick_ms: default_tick_ms(),
            mode: WaveModeSetting::default(),
        }
    }
}

/// Audio input metering configuration (used with `--input`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSection {
    /// Input device: "default", a device name, or a numeric index from
    /// `waveseek list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Requested sample rate in Hz (the device's native rate wins)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Reference level in dBFS for the 100% meter point
    #[serde(default = "default_reference_level_db")]
    pub reference_level_db: i8,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_reference_level_db() -> i8 {
    -20
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            reference_level_db: default_reference_level_db(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveseekConfig {
    #[serde(default)]
    pub wave: WaveSection,
    #[serde(default)]
    pub audio: AudioSection,
}

impl WaveseekConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config file cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = config_path()?;
        let content = fs::read_to_string(&config_path)?;
        let config: WaveseekConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be created
    /// - If the file cannot be written
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = config_path()?;
        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Writes the default configuration if no config file exists yet, then
/// loads whatever is on disk.
///
/// # Errors
/// - If the config directory cannot be created
/// - If the file cannot be written or parsed
pub fn load_or_init() -> anyhow::Result<WaveseekConfig> {
    let path = config_path()?;
    if !path.exists() {
        WaveseekConfig::default().save()?;
        tracing::info!("Default configuration written to {}", path.display());
    }
    WaveseekConfig::load()
}

/// Path to the configuration file, creating the directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("waveseek");

    fs::create_dir_all(&config_dir)?;

    Ok(config_dir.join("waveseek.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: WaveseekConfig = toml::from_str("").unwrap();
        assert_eq!(config.wave.bar_width, 2);
        assert_eq!(config.wave.gap_width, 1);
        assert_eq!(config.wave.sensitivity, 5);
        assert_eq!(config.wave.offset_speed, 666.0);
        assert_eq!(config.wave.tick_ms, 20);
        assert_eq!(config.wave.mode, WaveModeSetting::Flow);
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.audio.reference_level_db, -20);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: WaveseekConfig = toml::from_str(
            r#"
            [wave]
            bar_width = 3
            mode = "fixed"
            "#,
        )
        .unwrap();
        assert_eq!(config.wave.bar_width, 3);
        assert_eq!(config.wave.mode, WaveModeSetting::Fixed);
        assert_eq!(config.wave.gap_width, 1);
        assert_eq!(config.audio.sample_rate, 16000);
    }

    #[test]
    fn test_roundtrip() {
        let mut config = WaveseekConfig::default();
        config.wave.sensitivity = 8;
        config.audio.device = "2".to_string();

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: WaveseekConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.wave.sensitivity, 8);
        assert_eq!(parsed.audio.device, "2");
    }

    #[test]
    fn test_mode_setting_display_matches_serde() {
        assert_eq!(WaveModeSetting::Flow.to_string(), "flow");
        assert_eq!(WaveModeSetting::Fixed.to_string(), "fixed");
    }
}
