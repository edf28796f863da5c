//! Simulation settings
//!
//! Pushed into the core by the host (debug overlays, tuning panels). Every
//! structure here is validated before a simulation is built from it; invalid
//! values are programming errors upstream and are rejected with a
//! [`ConfigError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::game_loop::LoopConfig;

/// Rejected configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fixed step must be a positive, finite number of seconds (got {0})")]
    InvalidFixedStep(f32),
    #[error("max delta ({max_delta}s) must be finite and at least one fixed step ({fixed_step}s)")]
    InvalidMaxDelta { max_delta: f32, fixed_step: f32 },
    #[error("max updates per frame must be at least 1")]
    ZeroUpdatesPerFrame,
    #[error("time scale bounds [{min}, {max}] are invalid")]
    InvalidTimeScaleBounds { min: f32, max: f32 },
    #[error("time scale {value} is outside [{min}, {max}]")]
    TimeScaleOutOfRange { value: f32, min: f32, max: f32 },
    #[error("collision substep limit must be at least 1")]
    ZeroSubsteps,
    #[error("collision skin must be finite and non-negative (got {0})")]
    InvalidSkin(f32),
    #[error("duplicate window must be finite and non-negative (got {0})")]
    InvalidDuplicateWindow(f32),
    #[error("collision history capacity must be at least 1")]
    ZeroHistoryCapacity,
    #[error("pool `{0}` must have a capacity of at least 1")]
    ZeroPoolCapacity(&'static str),
    #[error("power-up setting `{field}` is invalid (got {value})")]
    InvalidPowerUpSetting { field: &'static str, value: f32 },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Continuous collision tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcdSettings {
    /// Substeps allowed per ball per fixed step
    pub max_substeps: u32,
    /// Backoff distance (px) after a hit
    pub skin: f32,
    /// Same ball + same static collider within this many seconds is a duplicate
    pub duplicate_window: f32,
    /// Record collisions into the ring buffer
    pub record_history: bool,
    pub history_capacity: usize,
    /// Balls destroy boss projectiles they touch
    pub balls_hit_projectiles: bool,
    /// Hit offset steers the ball off the paddle
    pub paddle_angle_control: bool,
    /// Distance (px) a boss is nudged when struck
    pub boss_knockback: f32,
}

impl Default for CcdSettings {
    fn default() -> Self {
        Self {
            max_substeps: CCD_MAX_SUBSTEPS,
            skin: CCD_SKIN,
            duplicate_window: 0.002,
            record_history: true,
            history_capacity: COLLISION_HISTORY_LEN,
            balls_hit_projectiles: false,
            paddle_angle_control: true,
            boss_knockback: 4.0,
        }
    }
}

impl CcdSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_substeps == 0 {
            return Err(ConfigError::ZeroSubsteps);
        }
        if !self.skin.is_finite() || self.skin < 0.0 {
            return Err(ConfigError::InvalidSkin(self.skin));
        }
        if !self.duplicate_window.is_finite() || self.duplicate_window < 0.0 {
            return Err(ConfigError::InvalidDuplicateWindow(self.duplicate_window));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        Ok(())
    }
}

/// Share of destructible bricks that hide a power-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DropDensity {
    /// 8% of bricks
    #[default]
    Standard,
    /// 20% of bricks (original balance)
    Legacy,
}

impl DropDensity {
    pub fn rate(&self) -> f32 {
        match self {
            DropDensity::Standard => 0.08,
            DropDensity::Legacy => 0.20,
        }
    }
}

/// Power-up assignment tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpSettings {
    pub density: DropDensity,
    /// How many recent drops count toward diminishing returns
    pub history_window: usize,
    /// Weight divisor growth per recent drop of the same kind
    pub diminish_factor: f32,
    /// Levels sharing a single extra life
    pub extra_life_group_size: u32,
}

impl Default for PowerUpSettings {
    fn default() -> Self {
        Self {
            density: DropDensity::Standard,
            history_window: 12,
            diminish_factor: 0.5,
            extra_life_group_size: 5,
        }
    }
}

impl PowerUpSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_window == 0 {
            return Err(ConfigError::InvalidPowerUpSetting {
                field: "history_window",
                value: 0.0,
            });
        }
        if !self.diminish_factor.is_finite() || self.diminish_factor < 0.0 {
            return Err(ConfigError::InvalidPowerUpSetting {
                field: "diminish_factor",
                value: self.diminish_factor,
            });
        }
        if self.extra_life_group_size == 0 {
            return Err(ConfigError::InvalidPowerUpSetting {
                field: "extra_life_group_size",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Effect pool sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub explosions: usize,
    pub particles: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            explosions: 32,
            particles: 256,
        }
    }
}

/// Everything the host can push into a simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub game_loop: LoopConfig,
    pub ccd: CcdSettings,
    pub power_ups: PowerUpSettings,
    pub pools: PoolSettings,
}

impl SimSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game_loop.validate()?;
        self.ccd.validate()?;
        self.power_ups.validate()?;
        if self.pools.explosions == 0 {
            return Err(ConfigError::ZeroPoolCapacity("explosions"));
        }
        if self.pools.particles == 0 {
            return Err(ConfigError::ZeroPoolCapacity("particles"));
        }
        Ok(())
    }

    /// Parse and validate settings from JSON (missing fields use defaults)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: SimSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "boss_breaker_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimSettings::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_partial_uses_defaults() {
        let settings = SimSettings::from_json(r#"{"ccd": {"max_substeps": 4}}"#).unwrap();
        assert_eq!(settings.ccd.max_substeps, 4);
        assert_eq!(settings.ccd.history_capacity, COLLISION_HISTORY_LEN);
        assert_eq!(settings.power_ups.density, DropDensity::Standard);
    }

    #[test]
    fn test_from_json_rejects_invalid_values() {
        let err = SimSettings::from_json(r#"{"ccd": {"max_substeps": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroSubsteps));

        let err = SimSettings::from_json(r#"{"pools": {"explosions": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroPoolCapacity("explosions")));

        let err = SimSettings::from_json("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_drop_density_rates() {
        assert!((DropDensity::Standard.rate() - 0.08).abs() < 1e-6);
        assert!((DropDensity::Legacy.rate() - 0.20).abs() < 1e-6);
    }
}
