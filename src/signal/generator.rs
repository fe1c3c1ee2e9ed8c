//! Waveform signal generation.
//!
//! Produces the per-frame bar geometry for the wave display: a decaying-sine
//! envelope sampled at N horizontal positions, scaled by a loudness level
//! that is smoothed toward an externally set target. The generator is a pure
//! state object with no rendering dependency; callers feed it elapsed time
//! and a target level and draw whatever it returns.

use fnv::FnvHashMap;
use std::f64::consts::PI;
use std::fmt;

/// Relative sample positions for the fixed variant. The profile rises and
/// falls in small steps so the static wave reads as a recorded clip.
const FIXED_POSITIONS: [f32; 27] = [
    0.05, //
    0.10, 0.10, //
    0.05, 0.05, //
    0.10, //
    0.15, 0.15, //
    0.20, 0.25, 0.20, //
    0.15, 0.15, //
    0.10, //
    0.05, 0.05, //
    0.10, //
    0.15, //
    0.10, //
    0.05, 0.05, //
    0.10, 0.15, 0.20, 0.15, 0.10, 0.05,
];

/// Leading envelope coefficient applied to every bar height.
const ENVELOPE_GAIN: f32 = 1.4;

/// Smoothed levels below this render the wave at full swing, so an idle
/// display still shows a complete waveform instead of a flat line.
const IDLE_LEVEL_THRESHOLD: f32 = 20.0;

const SENSITIVITY_MIN: u8 = 1;
const SENSITIVITY_MAX: u8 = 10;

/// Level units moved per smoothing step, per point of sensitivity.
const LEVEL_STEP_FACTOR: f32 = 0.35;

/// Sampling variant for the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveMode {
    /// Sample positions map onto [-2, 2]; the wave scrolls with time and
    /// its swing follows the smoothed loudness level.
    #[default]
    Flow,
    /// Sample positions come from a preset relative-magnitude table; the
    /// profile is static and always rendered at full level.
    Fixed,
}

/// Surface-derived generator parameters, recomputed on every resize.
///
/// All geometry is in abstract surface units; the terminal layer passes
/// cell counts, but nothing here assumes a particular unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    pub surface_width: f32,
    pub surface_height: f32,
    pub bar_width: f32,
    pub gap_width: f32,
    pub min_bar_height: f32,
    /// Smoothing responsiveness, clamped to [1, 10].
    pub sensitivity: u8,
    /// Time divisor for the phase scroll; smaller is faster, negative
    /// reverses direction.
    pub offset_speed: f32,
    pub mode: WaveMode,
}

/// One bar of a sample frame: horizontal position and half-height around
/// the vertical midline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSample {
    pub x: f32,
    pub half_height: f32,
}

/// Ordered bar samples for one frame. Recomputed from scratch every tick.
pub type SampleFrame = Vec<BarSample>;

/// Returned when the generator is configured with degenerate surface
/// dimensions. Everything else clamps; this is the one fatal precondition,
/// since zero-sized surfaces would turn the derived parameters into NaNs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidConfiguration {
    pub surface_width: f32,
    pub surface_height: f32,
}

impl fmt::Display for InvalidConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "surface dimensions must be positive, got {}x{}",
            self.surface_width, self.surface_height
        )
    }
}

impl std::error::Error for InvalidConfiguration {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Configured,
    Running,
}

/// The waveform signal generator.
///
/// Lifecycle: construction configures it from surface parameters; the first
/// `advance`/`sample_frame` call starts it running; `reconfigure` (on
/// resize) rebuilds the derived geometry and drops the decay memo while the
/// smoothing state survives.
pub struct WaveSignal {
    sample_count: usize,
    center_height: f32,
    amplitude: f32,
    per_step_delta: f32,
    min_bar_height: f32,
    offset_speed: f32,
    mode: WaveMode,
    /// Sample x positions, spaced bar + gap apart.
    sampling_x: Vec<f32>,
    /// Flow-variant positions mapped onto [-2, 2].
    map_x: Vec<f32>,
    /// Smoothed loudness, [0, 100].
    displayed_level: f32,
    /// Externally set loudness target, [0, 100].
    target_level: f32,
    /// Memoized decay values keyed by quantized position.
    decay_memo: FnvHashMap<i32, f64>,
    stage: Stage,
}

impl WaveSignal {
    /// Creates a configured generator.
    ///
    /// Sensitivity outside [1, 10] is clamped rather than rejected, and the
    /// sample count is floored at 1 for degenerate bar/gap widths.
    ///
    /// # Errors
    /// - If either surface dimension is not positive
    pub fn new(params: &SignalParams) -> Result<Self, InvalidConfiguration> {
        check_surface(params)?;

        let mut signal = WaveSignal {
            sample_count: 0,
            center_height: 0.0,
            amplitude: 0.0,
            per_step_delta: 0.0,
            min_bar_height: 0.0,
            offset_speed: 0.0,
            mode: WaveMode::default(),
            sampling_x: Vec::new(),
            map_x: Vec::new(),
            displayed_level: 0.0,
            target_level: 50.0,
            decay_memo: FnvHashMap::default(),
            stage: Stage::Configured,
        };
        signal.apply(params);
        Ok(signal)
    }

    /// Reapplies surface parameters after a resize.
    ///
    /// Derived geometry and the decay memo are rebuilt; the smoothed and
    /// target levels carry over so the animation does not jump.
    ///
    /// # Errors
    /// - If either surface dimension is not positive
    pub fn reconfigure(&mut self, params: &SignalParams) -> Result<(), InvalidConfiguration> {
        check_surface(params)?;
        self.apply(params);
        Ok(())
    }

    fn apply(&mut self, params: &SignalParams) {
        let sensitivity = params.sensitivity.clamp(SENSITIVITY_MIN, SENSITIVITY_MAX);
        let spacing = params.gap_width + params.bar_width;

        let sample_count = if spacing > 0.0 {
            (((params.surface_width + params.gap_width) / spacing) as usize).max(1)
        } else {
            1
        };

        self.sample_count = sample_count;
        self.center_height = params.surface_height / 2.0;
        self.amplitude = params.surface_height / 4.0;
        self.per_step_delta = f32::from(sensitivity) * LEVEL_STEP_FACTOR;
        self.min_bar_height = params.min_bar_height;
        self.offset_speed = params.offset_speed;
        self.mode = params.mode;

        self.sampling_x = (0..sample_count).map(|i| i as f32 * spacing).collect();
        self.map_x = self
            .sampling_x
            .iter()
            .map(|&x| (x / params.surface_width) * 4.0 - 2.0)
            .collect();

        self.decay_memo.clear();
        self.stage = Stage::Configured;

        tracing::debug!(
            "Signal configured: {} samples, center {:.1}, amplitude {:.1}, step {:.2}",
            self.sample_count,
            self.center_height,
            self.amplitude,
            self.per_step_delta
        );
    }

    /// Sets the loudness target, clamped to [0, 100].
    ///
    /// Changes smaller than one smoothing step are ignored so noisy callers
    /// cannot visibly perturb the envelope.
    pub fn set_target_level(&mut self, level: f32) {
        if (level - self.target_level).abs() <= self.per_step_delta {
            return;
        }
        self.target_level = level.clamp(0.0, 100.0);
    }

    /// Replaces the phase-scroll divisor. Negative values make the wave
    /// travel right to left.
    pub fn set_offset_speed(&mut self, offset_speed: f32) {
        self.offset_speed = offset_speed;
    }

    /// One smoothing step of the displayed level toward the target.
    ///
    /// The rule is asymmetric on purpose: rising moves a full step (and may
    /// overshoot into the dead band, where the next call snaps), falling
    /// moves a full step but never drops below two step-units, and anything
    /// inside the dead band snaps to the target.
    pub fn advance(&mut self) {
        self.mark_running();

        let target = self.target_level;
        let d = self.per_step_delta;
        let cur = self.displayed_level;

        self.displayed_level = if cur < target - d {
            cur + d
        } else if cur > target + d {
            (cur - d).max(d * 2.0)
        } else {
            target
        };
    }

    /// Computes the bar geometry for the given elapsed time.
    ///
    /// Returns one `(x, half_height)` pair per sample position, in x order.
    /// Half-heights never fall below half the configured minimum bar
    /// height, so bars stay visible at zero envelope.
    pub fn sample_frame(&mut self, elapsed_millis: u64) -> SampleFrame {
        self.mark_running();

        let phase = f64::from((elapsed_millis as f32 / self.offset_speed) % 2.0);
        let level = match self.mode {
            WaveMode::Fixed => 100.0,
            WaveMode::Flow if self.displayed_level < IDLE_LEVEL_THRESHOLD => 100.0,
            WaveMode::Flow => self.displayed_level,
        };

        let mut frame = Vec::with_capacity(self.sample_count);
        for i in 0..self.sample_count {
            let u = match self.mode {
                WaveMode::Flow => self.map_x[i],
                WaveMode::Fixed => FIXED_POSITIONS[i % FIXED_POSITIONS.len()],
            };
            let value = self.wave_value(u, phase) as f32;
            let half = self.amplitude * value * ENVELOPE_GAIN * level * 0.01;

            frame.push(BarSample {
                x: self.sampling_x[i],
                half_height: half.abs().max(self.min_bar_height / 2.0),
            });
        }
        frame
    }

    /// Envelope value in [-1, 1] at position `u` for the given phase.
    ///
    /// The decay term is memoized by quantized position; the memo only
    /// avoids recomputing the pow and division, results are identical.
    fn wave_value(&mut self, u: f32, phase: f64) -> f64 {
        let key = (u * 1000.0) as i32;
        let sin_term = (PI * f64::from(u) - phase * PI).sin();

        let decay_term = match self.decay_memo.get(&key) {
            Some(&d) => d,
            None => {
                let d = decay(f64::from(u));
                self.decay_memo.insert(key, d);
                d
            }
        };

        sin_term * decay_term
    }

    fn mark_running(&mut self) {
        if self.stage == Stage::Configured {
            self.stage = Stage::Running;
            tracing::debug!("Signal running");
        }
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn displayed_level(&self) -> f32 {
        self.displayed_level
    }
}

/// Bump-shaped attenuation: 1 at the center, vanishing toward the edges,
/// symmetric in `u`.
fn decay(u: f64) -> f64 {
    4.0 / (4.0 + u.powi(4))
}

fn check_surface(params: &SignalParams) -> Result<(), InvalidConfiguration> {
    if params.surface_width <= 0.0 || params.surface_height <= 0.0 {
        return Err(InvalidConfiguration {
            surface_width: params.surface_width,
            surface_height: params.surface_height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SignalParams {
        SignalParams {
            surface_width: 600.0,
            surface_height: 200.0,
            bar_width: 5.0,
            gap_width: 5.0,
            min_bar_height: 5.0,
            sensitivity: 5,
            offset_speed: 666.0,
            mode: WaveMode::Flow,
        }
    }

    #[test]
    fn test_derived_parameters() {
        let signal = WaveSignal::new(&params()).unwrap();
        assert_eq!(signal.sample_count(), 60);
        assert_eq!(signal.amplitude, 50.0);
        assert_eq!(signal.center_height, 100.0);
        assert_eq!(signal.per_step_delta, 1.75);
    }

    #[test]
    fn test_sensitivity_clamps() {
        let mut p = params();
        p.sensitivity = 99;
        let signal = WaveSignal::new(&p).unwrap();
        assert_eq!(signal.per_step_delta, 3.5);

        p.sensitivity = 0;
        let signal = WaveSignal::new(&p).unwrap();
        assert_eq!(signal.per_step_delta, 0.35);
    }

    #[test]
    fn test_rejects_degenerate_surface() {
        let mut p = params();
        p.surface_width = 0.0;
        assert!(WaveSignal::new(&p).is_err());

        let mut p = params();
        p.surface_height = -1.0;
        assert!(WaveSignal::new(&p).is_err());
    }

    #[test]
    fn test_sample_count_floored_at_one() {
        let mut p = params();
        p.surface_width = 1.0;
        p.bar_width = 50.0;
        p.gap_width = 50.0;
        let signal = WaveSignal::new(&p).unwrap();
        assert_eq!(signal.sample_count(), 1);

        p.bar_width = 0.0;
        p.gap_width = 0.0;
        let signal = WaveSignal::new(&p).unwrap();
        assert_eq!(signal.sample_count(), 1);
    }

    #[test]
    fn test_advance_converges_exactly() {
        // 600x200 with sensitivity 5: step is 1.75, so a 0 -> 80 climb takes
        // 45 full steps to 78.75 and snaps to 80 on the 46th.
        let mut signal = WaveSignal::new(&params()).unwrap();
        signal.set_target_level(80.0);

        for _ in 0..45 {
            signal.advance();
            assert!(signal.displayed_level() <= 80.0 + signal.per_step_delta);
        }
        assert_eq!(signal.displayed_level(), 78.75);

        signal.advance();
        assert_eq!(signal.displayed_level(), 80.0);

        signal.advance();
        assert_eq!(signal.displayed_level(), 80.0);
    }

    #[test]
    fn test_advance_converges_for_any_target() {
        for target in [0.0_f32, 3.0, 19.0, 50.0, 77.7, 100.0] {
            let mut signal = WaveSignal::new(&params()).unwrap();
            let d = signal.per_step_delta;
            signal.set_target_level(target);
            let expected = signal.target_level;

            let steps = (expected / d).ceil() as usize + 1;
            for _ in 0..steps {
                signal.advance();
                assert!(signal.displayed_level() <= expected + d);
            }
            assert_eq!(signal.displayed_level(), expected);
        }
    }

    #[test]
    fn test_falling_level_floors_at_two_steps() {
        let mut signal = WaveSignal::new(&params()).unwrap();
        signal.set_target_level(10.0);
        for _ in 0..10 {
            signal.advance();
        }
        assert_eq!(signal.displayed_level(), 10.0);

        // Dropping toward 0 stops at 2 * 1.75 instead of collapsing flat.
        signal.set_target_level(0.0);
        for _ in 0..20 {
            signal.advance();
        }
        assert_eq!(signal.displayed_level(), 3.5);
    }

    #[test]
    fn test_target_hysteresis() {
        let mut signal = WaveSignal::new(&params()).unwrap();
        assert_eq!(signal.target_level, 50.0);

        // Within one step of the current target: ignored.
        signal.set_target_level(51.0);
        assert_eq!(signal.target_level, 50.0);
        signal.set_target_level(48.5);
        assert_eq!(signal.target_level, 50.0);

        signal.set_target_level(52.0);
        assert_eq!(signal.target_level, 52.0);
    }

    #[test]
    fn test_target_clamps_to_range() {
        let mut signal = WaveSignal::new(&params()).unwrap();
        signal.set_target_level(150.0);
        assert_eq!(signal.target_level, 100.0);
        signal.set_target_level(-30.0);
        assert_eq!(signal.target_level, 0.0);
    }

    #[test]
    fn test_decay_shape() {
        assert_eq!(decay(0.0), 1.0);
        for u in [0.1_f64, 0.5, 1.0, 1.7, 2.0] {
            assert_eq!(decay(u), decay(-u));
            assert!(decay(u) < 1.0);
        }
        assert!(decay(100.0) < 1e-7);
    }

    #[test]
    fn test_frame_shape_and_spacing() {
        let mut signal = WaveSignal::new(&params()).unwrap();
        let frame = signal.sample_frame(123);

        assert_eq!(frame.len(), 60);
        for (i, pair) in frame.windows(2).enumerate() {
            assert!(pair[1].x > pair[0].x, "positions not increasing at {i}");
            assert_eq!(pair[1].x - pair[0].x, 10.0);
        }
    }

    #[test]
    fn test_half_height_floor() {
        let mut signal = WaveSignal::new(&params()).unwrap();
        for elapsed in [0_u64, 333, 666, 999, 5000] {
            for bar in signal.sample_frame(elapsed) {
                assert!(bar.half_height >= 2.5);
            }
        }
    }

    #[test]
    fn test_memo_matches_direct_computation() {
        let mut signal = WaveSignal::new(&params()).unwrap();
        let first = signal.sample_frame(400);
        // Second call hits the memo for every position.
        let second = signal.sample_frame(400);
        assert_eq!(first, second);

        for (&u, &x) in signal.map_x.clone().iter().zip(signal.sampling_x.clone().iter()) {
            let phase = f64::from((400.0_f32 / 666.0) % 2.0);
            let direct = (PI * f64::from(u) - phase * PI).sin() * decay(f64::from(u));
            let memoized = signal.wave_value(u, phase);
            assert!((memoized - direct).abs() < 1e-12, "mismatch at x={x}");
        }
    }

    #[test]
    fn test_configure_is_deterministic() {
        let mut a = WaveSignal::new(&params()).unwrap();
        let mut b = WaveSignal::new(&params()).unwrap();

        for signal in [&mut a, &mut b] {
            signal.set_target_level(63.0);
            for _ in 0..12 {
                signal.advance();
            }
        }
        assert_eq!(a.sample_frame(777), b.sample_frame(777));
    }

    #[test]
    fn test_reconfigure_keeps_levels_and_drops_memo() {
        let mut signal = WaveSignal::new(&params()).unwrap();
        signal.set_target_level(90.0);
        for _ in 0..5 {
            signal.advance();
        }
        let displayed = signal.displayed_level();
        signal.sample_frame(100);
        assert!(!signal.decay_memo.is_empty());

        let mut p = params();
        p.surface_width = 300.0;
        signal.reconfigure(&p).unwrap();

        assert_eq!(signal.displayed_level(), displayed);
        assert_eq!(signal.target_level, 90.0);
        assert!(signal.decay_memo.is_empty());
        assert_eq!(signal.sample_count(), 30);
    }

    #[test]
    fn test_fixed_mode_profile_repeats() {
        let mut p = params();
        p.mode = WaveMode::Fixed;
        let mut signal = WaveSignal::new(&p).unwrap();

        // Fixed positions are all positive and small, so the decay term is
        // near 1 and the profile repeats every 27 bars.
        let frame = signal.sample_frame(0);
        assert_eq!(frame.len(), 60);
        assert_eq!(frame[0].half_height, frame[27].half_height);
        assert_eq!(frame[1].half_height, frame[28].half_height);
    }
}
