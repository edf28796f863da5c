//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod boss;
pub mod ccd;
pub mod collision;
pub mod geometry;
pub mod level;
pub mod pool;
pub mod powerup;
pub mod rng;
pub mod spatial;
pub mod state;
pub mod tick;

pub use boss::{AttackKind, Boss, BossKind, BossState, MovementPattern, ScheduledAttack};
pub use ccd::{CollisionHistory, CollisionRecord, ColliderId, WallSide, step_balls};
pub use collision::{CollisionResult, SweptHit, circle_aabb_overlap, reflect_velocity, swept_circle_aabb};
pub use geometry::Aabb;
pub use level::{BOSS_LEVEL_INTERVAL, boss_for_level, load_level};
pub use pool::{EffectPools, Pool, PoolName, PoolStats};
pub use powerup::{DropHistory, PowerUpKind, WeightTable};
pub use spatial::{SpatialGrid, SpatialStats};
pub use state::{
    ActiveEffects, Ball, BallState, Brick, BrickKind, CollisionCounters, GameEvent, GamePhase,
    Paddle, PaddleMode, PowerUp, Projectile, World,
};
pub use tick::{TickInput, tick};
