//! The animation run loop.
//!
//! Drives the waveform at a fixed tick cadence: poll input, feed the target
//! level, advance the smoothing filter, sample a frame, draw. Supports an
//! external pause toggle via SIGUSR1.

use anyhow::anyhow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config;
use crate::level::LevelMeter;
use crate::signal::{SignalParams, WaveSignal};
use crate::ui::ErrorScreen;
use crate::viz::{Hud, WaveCommand, WaveTui};

/// Options merged from the CLI for the run command.
pub struct RunOptions {
    /// Initial manual level, 0-100
    pub level: Option<u8>,
    /// Drive the level from the microphone input
    pub input: bool,
    /// Initial seek position, 0-100
    pub progress: Option<u8>,
}

/// Runs the waveform animation until the user quits.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the level meter cannot be started (with `--input`)
/// - If terminal setup or rendering fails
pub async fn handle_run(options: RunOptions) -> Result<(), anyhow::Error> {
    tracing::info!("=== waveseek started ===");

    let config_data = match config::load_or_init() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            let error_message = format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/waveseek/waveseek.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            return Err(anyhow!("Configuration error: {err}"));
        }
    };

    tracing::info!(
        "Configuration loaded: mode={}, bar={}+{}, sensitivity={}, tick={}ms",
        config_data.wave.mode,
        config_data.wave.bar_width,
        config_data.wave.gap_width,
        config_data.wave.sensitivity,
        config_data.wave.tick_ms
    );

    let meter = if options.input {
        let mut meter = LevelMeter::new(
            config_data.audio.sample_rate,
            config_data.audio.device.clone(),
            config_data.audio.reference_level_db,
        );
        if let Err(e) = meter.start() {
            tracing::error!("Failed to start level meter: {}", e);
            let error_message = format!(
                "Audio Input Error:\n\n{e}\n\nPlease check your audio configuration and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            return Err(e);
        }
        Some(meter)
    } else {
        None
    };

    let mut tui = WaveTui::new(config_data.wave.bar_width)
        .map_err(|e| anyhow!("Failed to initialize UI: {e}"))?;

    let (mut surface_width, mut surface_height) = tui.wave_size()?;
    let mut signal = match WaveSignal::new(&signal_params(
        &config_data,
        surface_width,
        surface_height,
    )) {
        Ok(signal) => signal,
        Err(e) => {
            tui.cleanup().ok();
            return Err(anyhow!("Signal configuration failed: {e}"));
        }
    };

    let mut manual_level = options.level.unwrap_or(50).min(100);
    let mut progress = options.progress.unwrap_or(0).min(100);
    let mut offset_speed = config_data.wave.offset_speed;
    let mut show_cursor = true;
    let mut paused = false;

    signal.set_target_level(f32::from(manual_level));

    // External pause toggle for scripting
    let usr1 = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&usr1))
        .map_err(|e| anyhow!("Failed to register signal handler: {e}"))?;

    let tick = Duration::from_millis(config_data.wave.tick_ms.max(1));
    let started = Instant::now();
    let mut pause_time = Duration::ZERO;
    let mut pause_started: Option<Instant> = None;
    let mut frame = signal.sample_frame(0);
    let mut frame_count = 0u64;

    tracing::debug!("Entering animation loop");

    loop {
        let mut toggle_pause = usr1.swap(false, Ordering::Relaxed);
        if toggle_pause {
            tracing::info!("Received SIGUSR1: toggling pause");
        }

        match tui.handle_input(Duration::ZERO) {
            Ok(WaveCommand::Continue) => {}
            Ok(WaveCommand::Quit) => break,
            Ok(WaveCommand::TogglePause) => toggle_pause = !toggle_pause,
            Ok(WaveCommand::ToggleCursor) => show_cursor = !show_cursor,
            Ok(WaveCommand::SeekBy(delta)) => progress = add_percent(progress, delta),
            Ok(WaveCommand::NudgeLevel(delta)) => {
                // Metered runs follow the microphone; keys only apply to
                // the manual source.
                if meter.is_none() {
                    manual_level = add_percent(manual_level, delta);
                }
            }
            Ok(WaveCommand::SpeedBy(delta)) => {
                // A smaller divisor scrolls faster.
                offset_speed = if delta > 0 {
                    offset_speed / 1.25
                } else {
                    offset_speed * 1.25
                };
                signal.set_offset_speed(offset_speed);
            }
            Err(e) => {
                tracing::error!("Input handling error: {}", e);
                tui.cleanup().ok();
                return Err(anyhow!("Input handling error: {e}"));
            }
        }

        if toggle_pause {
            paused = !paused;
            if paused {
                pause_started = Some(Instant::now());
            } else if let Some(pause_start) = pause_started.take() {
                pause_time += pause_start.elapsed();
            }
        }

        let (width, height) = tui.wave_size()?;
        if (width, height) != (surface_width, surface_height) {
            surface_width = width;
            surface_height = height;
            if let Err(e) =
                signal.reconfigure(&signal_params(&config_data, width, height))
            {
                tui.cleanup().ok();
                return Err(anyhow!("Signal configuration failed: {e}"));
            }
            // Reconfiguring reapplies the configured speed.
            signal.set_offset_speed(offset_speed);
            tracing::debug!(
                "Surface resized to {}x{} ({} bars)",
                width,
                height,
                signal.sample_count()
            );
        }

        let target = match &meter {
            Some(meter) => meter.level(),
            None => manual_level,
        };
        signal.set_target_level(f32::from(target));

        let elapsed = started.elapsed().saturating_sub(
            pause_time
                + pause_started
                    .map_or(Duration::ZERO, |pause_start| pause_start.elapsed()),
        );

        if !paused {
            signal.advance();
            frame = signal.sample_frame(elapsed.as_millis() as u64);
        }

        let hud = Hud {
            paused,
            elapsed,
            level: signal.displayed_level().round() as u8,
            progress,
            show_cursor,
        };
        if let Err(e) = tui.render(&frame, &hud) {
            tracing::error!("Render failed: {}", e);
            tui.cleanup().ok();
            return Err(anyhow!("Render failed: {e}"));
        }

        frame_count += 1;
        if frame_count % 500 == 0 {
            tracing::debug!(
                "Animation: {} frames, level {:.1}, seek {}%",
                frame_count,
                signal.displayed_level(),
                progress
            );
        }

        tokio::time::sleep(tick).await;
    }

    tui.cleanup().map_err(|e| anyhow!("Cleanup failed: {e}"))?;

    tracing::info!("=== waveseek exited ===");
    Ok(())
}

fn signal_params(
    config: &config::WaveseekConfig,
    surface_width: u16,
    surface_height: u16,
) -> SignalParams {
    SignalParams {
        surface_width: f32::from(surface_width),
        surface_height: f32::from(surface_height),
        bar_width: f32::from(config.wave.bar_width),
        gap_width: f32::from(config.wave.gap_width),
        min_bar_height: config.wave.min_bar_height,
        sensitivity: config.wave.sensitivity,
        offset_speed: config.wave.offset_speed,
        mode: config.wave.mode.into(),
    }
}

/// Shifts a percent value, clamping to [0, 100].
fn add_percent(current: u8, delta: i8) -> u8 {
    (i16::from(current) + i16::from(delta)).clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_percent_clamps() {
        assert_eq!(add_percent(50, 5), 55);
        assert_eq!(add_percent(2, -5), 0);
        assert_eq!(add_percent(98, 5), 100);
    }

    #[test]
    fn test_signal_params_mirror_config() {
        let config = config::WaveseekConfig::default();
        let params = signal_params(&config, 120, 40);
        assert_eq!(params.surface_width, 120.0);
        assert_eq!(params.surface_height, 40.0);
        assert_eq!(params.bar_width, 2.0);
        assert_eq!(params.gap_width, 1.0);
        assert_eq!(params.sensitivity, 5);
    }
}
