//! Fixed timestep frame loop
//!
//! The host calls [`FixedStepLoop::frame`] once per display refresh with the
//! real elapsed time. The loop turns that into zero or more equal-sized
//! physics updates followed by exactly one render call carrying the
//! interpolation factor between the last two physics states.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::settings::ConfigError;

/// Number of frame deltas averaged for the FPS readout
const FPS_SAMPLES: usize = 60;
/// Slack (seconds) when comparing the accumulator against a whole step
const STEP_TOLERANCE: f64 = 1e-6;

/// Update strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopMode {
    /// Deterministic equal-sized steps with render interpolation
    #[default]
    Fixed,
    /// One update per frame with the (clamped, scaled) real delta
    Variable,
}

/// Loop parameters (all durations in seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub fixed_step: f32,
    pub max_delta: f32,
    pub max_updates_per_frame: u32,
    pub time_scale: f32,
    pub min_time_scale: f32,
    pub max_time_scale: f32,
    pub mode: LoopMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fixed_step: SIM_DT,
            max_delta: MAX_FRAME_DELTA,
            max_updates_per_frame: MAX_UPDATES_PER_FRAME,
            time_scale: 1.0,
            min_time_scale: MIN_TIME_SCALE,
            max_time_scale: MAX_TIME_SCALE,
            mode: LoopMode::Fixed,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fixed_step.is_finite() || self.fixed_step <= 0.0 || self.fixed_step > 1.0 {
            return Err(ConfigError::InvalidFixedStep(self.fixed_step));
        }
        if !self.max_delta.is_finite() || self.max_delta < self.fixed_step {
            return Err(ConfigError::InvalidMaxDelta {
                max_delta: self.max_delta,
                fixed_step: self.fixed_step,
            });
        }
        if self.max_updates_per_frame == 0 {
            return Err(ConfigError::ZeroUpdatesPerFrame);
        }
        let (min, max) = (self.min_time_scale, self.max_time_scale);
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
            return Err(ConfigError::InvalidTimeScaleBounds { min, max });
        }
        if !(min..=max).contains(&self.time_scale) {
            return Err(ConfigError::TimeScaleOutOfRange {
                value: self.time_scale,
                min,
                max,
            });
        }
        Ok(())
    }
}

/// The two callbacks a simulation owner implements to be driven by the loop
pub trait FrameHooks {
    /// Advance the simulation by `dt` seconds
    fn on_fixed_update(&mut self, dt: f32);
    /// Draw with `alpha` in [0, 1] between the previous and current state
    fn on_render(&mut self, alpha: f32);
}

/// Polled snapshot for debug overlays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugInfo {
    pub fps: f32,
    pub frame_tick: u64,
    pub time_scale: f32,
    pub max_delta_ms: f32,
    pub mode: LoopMode,
    /// Unconsumed time in seconds
    pub accumulator: f32,
    pub updates_this_frame: u32,
    pub alpha: f32,
    pub paused: bool,
}

/// Accumulator-based frame loop
#[derive(Debug)]
pub struct FixedStepLoop {
    config: LoopConfig,
    accumulator: f64,
    running: bool,
    paused: bool,
    // Requested changes, applied at the start of the next frame
    pending_pause: Option<bool>,
    pending_time_scale: Option<f32>,
    pending_mode: Option<LoopMode>,
    frame_tick: u64,
    updates_this_frame: u32,
    alpha: f32,
    frame_deltas: [f32; FPS_SAMPLES],
    frame_index: usize,
    frame_samples: usize,
}

impl FixedStepLoop {
    pub fn new(config: LoopConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            accumulator: 0.0,
            running: true,
            paused: false,
            pending_pause: None,
            pending_time_scale: None,
            pending_mode: None,
            frame_tick: 0,
            updates_this_frame: 0,
            alpha: 0.0,
            frame_deltas: [0.0; FPS_SAMPLES],
            frame_index: 0,
            frame_samples: 0,
        })
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Run one frame callback. Returns the number of physics updates performed.
    pub fn frame<H: FrameHooks>(&mut self, real_delta: f32, hooks: &mut H) -> u32 {
        if !self.running {
            return 0;
        }
        self.apply_pending();
        self.frame_tick += 1;
        self.updates_this_frame = 0;

        // Negative or NaN deltas (clock hiccups) count as no time passing
        let raw = if real_delta.is_finite() { real_delta.max(0.0) } else { 0.0 };
        self.record_frame_time(raw);
        let delta = raw.min(self.config.max_delta);

        if self.paused {
            hooks.on_render(self.alpha);
            return 0;
        }

        let scaled = f64::from(delta) * f64::from(self.config.time_scale);
        match self.config.mode {
            LoopMode::Fixed => {
                let step = f64::from(self.config.fixed_step);
                self.accumulator += scaled;
                while self.accumulator + STEP_TOLERANCE >= step
                    && self.updates_this_frame < self.config.max_updates_per_frame
                {
                    hooks.on_fixed_update(self.config.fixed_step);
                    self.accumulator -= step;
                    self.updates_this_frame += 1;
                }
                if self.accumulator < 0.0 {
                    self.accumulator = 0.0;
                }
                // Still far behind after the ceiling: drop the backlog
                if self.accumulator > step * 2.0 {
                    log::debug!(
                        "Frame loop dropping {:.1}ms of backlog",
                        self.accumulator * 1000.0
                    );
                    self.accumulator %= step;
                }
                self.alpha = (self.accumulator / step).clamp(0.0, 1.0) as f32;
            }
            LoopMode::Variable => {
                if scaled > 0.0 {
                    hooks.on_fixed_update(scaled as f32);
                    self.updates_this_frame = 1;
                }
                self.alpha = 1.0;
            }
        }

        hooks.on_render(self.alpha);
        self.updates_this_frame
    }

    fn apply_pending(&mut self) {
        if let Some(paused) = self.pending_pause.take() {
            self.paused = paused;
        }
        if let Some(scale) = self.pending_time_scale.take() {
            self.config.time_scale = scale;
        }
        if let Some(mode) = self.pending_mode.take() {
            if mode != self.config.mode {
                self.config.mode = mode;
                self.accumulator = 0.0;
            }
        }
    }

    fn record_frame_time(&mut self, delta: f32) {
        if delta <= 0.0 {
            return;
        }
        self.frame_deltas[self.frame_index] = delta;
        self.frame_index = (self.frame_index + 1) % FPS_SAMPLES;
        self.frame_samples = (self.frame_samples + 1).min(FPS_SAMPLES);
    }

    /// Measured frames per second over the last `FPS_SAMPLES` frames
    pub fn fps(&self) -> f32 {
        if self.frame_samples == 0 {
            return 0.0;
        }
        let total: f32 = self.frame_deltas[..self.frame_samples].iter().sum();
        if total > 0.0 {
            self.frame_samples as f32 / total
        } else {
            0.0
        }
    }

    /// Request a new time scale (clamped to the configured bounds)
    pub fn set_time_scale(&mut self, scale: f32) {
        if !scale.is_finite() {
            return;
        }
        let clamped = scale.clamp(self.config.min_time_scale, self.config.max_time_scale);
        self.pending_time_scale = Some(clamped);
    }

    pub fn time_scale(&self) -> f32 {
        self.pending_time_scale.unwrap_or(self.config.time_scale)
    }

    pub fn set_mode(&mut self, mode: LoopMode) {
        self.pending_mode = Some(mode);
    }

    pub fn pause(&mut self) {
        self.pending_pause = Some(true);
    }

    pub fn resume(&mut self) {
        self.pending_pause = Some(false);
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop driving hooks. The host cancels its pending frame request.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            fps: self.fps(),
            frame_tick: self.frame_tick,
            time_scale: self.config.time_scale,
            max_delta_ms: self.config.max_delta * 1000.0,
            mode: self.config.mode,
            accumulator: self.accumulator as f32,
            updates_this_frame: self.updates_this_frame,
            alpha: self.alpha,
            paused: self.paused,
        }
    }
}
