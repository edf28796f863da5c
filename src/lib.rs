//! Boss Breaker - a breakout arcade core with boss encounters
//!
//! Core modules:
//! - `sim`: Deterministic simulation (CCD, bosses, power-ups, world state)
//! - `game_loop`: Fixed-step accumulator decoupling physics from rendering
//! - `simulation`: Owner of the world that plugs into the frame loop
//! - `settings`: Validated, data-driven configuration

pub mod game_loop;
pub mod settings;
pub mod sim;
pub mod simulation;

pub use game_loop::{DebugInfo, FixedStepLoop, FrameHooks, LoopConfig, LoopMode};
pub use settings::{ConfigError, SimSettings};
pub use simulation::{RenderSnapshot, SimStats, Simulation};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Largest real-time delta accepted per frame (tab switch / suspend guard)
    pub const MAX_FRAME_DELTA: f32 = 0.25;
    /// Maximum fixed updates per frame to prevent spiral of death
    pub const MAX_UPDATES_PER_FRAME: u32 = 10;
    /// Time scale bounds
    pub const MIN_TIME_SCALE: f32 = 0.1;
    pub const MAX_TIME_SCALE: f32 = 3.0;

    /// Playfield dimensions (y grows downward, like a canvas)
    pub const PLAYFIELD_WIDTH: f32 = 800.0;
    pub const PLAYFIELD_HEIGHT: f32 = 600.0;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f32 = 100.0;
    pub const PADDLE_HEIGHT: f32 = 16.0;
    /// Center line of the paddle in linear mode
    pub const PADDLE_Y: f32 = 560.0;
    pub const PADDLE_MAX_SPEED: f32 = 900.0;
    /// Distance of the perimeter path from the playfield edge
    pub const PERIMETER_INSET: f32 = 24.0;
    /// Largest deflection from the paddle face normal (radians, 60 degrees)
    pub const MAX_BOUNCE_ANGLE: f32 = std::f32::consts::FRAC_PI_3;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 8.0;
    pub const BALL_START_SPEED: f32 = 360.0;
    pub const BALL_MIN_SPEED: f32 = 240.0;
    pub const BALL_MAX_SPEED: f32 = 900.0;
    /// Speed at which a ball burns through bricks on its own
    pub const FIREBALL_SPEED: f32 = 780.0;
    pub const MAX_BALLS: usize = 8;

    /// Brick layout defaults
    pub const BRICK_WIDTH: f32 = 64.0;
    pub const BRICK_HEIGHT: f32 = 24.0;
    pub const BRICK_GAP: f32 = 4.0;
    pub const BRICK_TOP: f32 = 60.0;
    pub const BRICK_COLUMNS: u32 = 11;

    /// Collision defaults
    pub const CCD_MAX_SUBSTEPS: u32 = 8;
    /// Backoff distance (px) left between ball and collider after a hit
    pub const CCD_SKIN: f32 = 0.01;
    pub const COLLISION_HISTORY_LEN: usize = 50;

    /// Power-up capsule defaults
    pub const POWERUP_FALL_SPEED: f32 = 150.0;
    pub const POWERUP_WIDTH: f32 = 32.0;
    pub const POWERUP_HEIGHT: f32 = 14.0;

    pub const START_LIVES: u32 = 3;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector pointing at `angle` (radians, measured from +x toward +y)
#[inline]
pub fn direction_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}
