//! Microphone input level metering.
//!
//! Opens a cpal input stream on the configured device and keeps a short
//! rolling window of mono samples. The meter never stores or decodes audio;
//! it only reduces the window to a 0-100 loudness figure that drives the
//! waveform's target level.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Live input level meter.
///
/// The stream callback folds the device's native channel count down to mono
/// and appends to a bounded window; `level()` reduces the most recent 1/20 s
/// of that window to a normalized loudness value.
pub struct LevelMeter {
    /// Actual sample rate, updated from the device on start.
    sample_rate: u32,
    /// Rolling mono sample window shared with the stream callback.
    window: Arc<Mutex<Vec<i16>>>,
    /// Active input stream (kept alive while metering).
    stream: Option<cpal::Stream>,
    /// Device name, numeric index, or "default".
    device_name: String,
    /// dBFS level displayed as 100%.
    reference_level_db: i8,
}

impl LevelMeter {
    pub fn new(requested_sample_rate: u32, device_name: String, reference_level_db: i8) -> Self {
        Self {
            sample_rate: requested_sample_rate,
            window: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            device_name,
            reference_level_db,
        }
    }

    /// Opens the input device and starts the metering stream.
    ///
    /// # Errors
    /// - If the device is not available
    /// - If stream creation or playback fails
    pub fn start(&mut self) -> Result<()> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device(&host, &self.device_name)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Metering device: {}", device_name);

        let device_config = device.default_input_config()?;
        self.sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        tracing::debug!(
            "Device configuration: {}Hz, {} channels",
            self.sample_rate,
            num_channels
        );

        // Window long enough for the RMS tail plus slack for slow frames.
        let window_limit = (self.sample_rate / 5) as usize;
        let window_arc = Arc::clone(&self.window);

        let stream = device.build_input_stream(
            &device_config.into(),
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                fold_to_mono(data, &window_arc, num_channels, window_limit);
            },
            |err| {
                tracing::error!("Meter stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        self.stream = Some(stream);

        tracing::debug!("Meter stream started");
        Ok(())
    }

    /// Current input loudness, 0-100.
    pub fn level(&self) -> u8 {
        let window = self.window.lock().unwrap();
        normalized_level(&window, self.sample_rate, self.reference_level_db)
    }
}

/// Folds interleaved frames to mono and appends them to the window,
/// trimming the front to the limit.
fn fold_to_mono(
    data: &[i16],
    window_arc: &Arc<Mutex<Vec<i16>>>,
    num_channels: usize,
    window_limit: usize,
) {
    let mut window = window_arc.lock().unwrap();

    match num_channels {
        1 => window.extend_from_slice(data),
        _ => {
            for chunk in data.chunks_exact(num_channels) {
                let sum: i32 = chunk.iter().map(|&s| i32::from(s)).sum();
                window.push((sum / num_channels as i32) as i16);
            }
        }
    }

    if window.len() > window_limit {
        let excess = window.len() - window_limit;
        window.drain(..excess);
    }
}

/// Reduces the tail of a sample window to a 0-100 loudness value.
///
/// RMS over the most recent 1/20 s, converted to dBFS and normalized
/// against a 40 dB range below the reference level. The result is floored
/// at 4 so silence still registers on the display.
pub fn normalized_level(samples: &[i16], sample_rate: u32, reference_level_db: i8) -> u8 {
    if samples.is_empty() {
        return 0;
    }

    let tail_count = std::cmp::min(sample_rate / 20, samples.len() as u32).max(1) as usize;
    let recent = &samples[samples.len() - tail_count..];

    let sum_of_squares: i64 = recent.iter().map(|&x| i64::from(x).pow(2)).sum();
    let mean_square = sum_of_squares / recent.len() as i64;
    let rms = (mean_square as f32).sqrt();

    let db_fs = if rms > 0.0 {
        20.0 * (rms / 32767.0).log10()
    } else {
        -160.0
    };

    let min_db = f32::from(reference_level_db) - 40.0;
    ((db_fs - min_db) / 40.0 * 100.0).clamp(4.0, 100.0) as u8
}

/// Finds an audio input device by name or numeric index.
fn find_device(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        if index < devices.len() {
            return Ok(devices.into_iter().nth(index).unwrap());
        }
        return Err(anyhow!(
            "Device index {} is out of range (0-{})",
            index,
            devices.len().saturating_sub(1)
        ));
    }

    devices
        .into_iter()
        .find(|d| d.name().is_ok_and(|name| name == device_spec))
        .ok_or_else(|| {
            anyhow!(
                "Audio input device '{device_spec}' not found. Use 'waveseek list-devices' to see available devices."
            )
        })
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library
/// warnings on Linux. On other platforms this is a no-op.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let dev_null_fd = dev_null.as_raw_fd();

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_is_zero() {
        assert_eq!(normalized_level(&[], 16000, -20), 0);
    }

    #[test]
    fn test_silence_registers_at_floor() {
        let samples = vec![0i16; 1600];
        assert_eq!(normalized_level(&samples, 16000, -20), 4);
    }

    #[test]
    fn test_full_scale_is_full_meter() {
        let samples = vec![32767i16; 1600];
        assert_eq!(normalized_level(&samples, 16000, -20), 100);
    }

    #[test]
    fn test_reference_level_reads_near_full() {
        // -20 dBFS square wave against a -20 dBFS reference.
        let amp = (32767.0 * 10f32.powf(-20.0 / 20.0)) as i16;
        let samples: Vec<i16> = (0..1600)
            .map(|i| if i % 2 == 0 { amp } else { -amp })
            .collect();
        let level = normalized_level(&samples, 16000, -20);
        assert!(level >= 98, "got {level}");
    }

    #[test]
    fn test_quieter_window_reads_lower() {
        let loud = vec![20000i16; 1600];
        let quiet = vec![2000i16; 1600];
        assert!(
            normalized_level(&quiet, 16000, -20) < normalized_level(&loud, 16000, -20)
        );
    }

    #[test]
    fn test_fold_to_mono_averages_and_trims() {
        let window = Arc::new(Mutex::new(Vec::new()));
        fold_to_mono(&[100, 200, -100, -200], &window, 2, 8);
        assert_eq!(*window.lock().unwrap(), vec![150, -150]);

        fold_to_mono(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10], &window, 1, 8);
        let window = window.lock().unwrap();
        assert_eq!(window.len(), 8);
        assert_eq!(window[..2], [3, 4]);
    }
}
