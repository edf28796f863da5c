//! Simulation owner
//!
//! [`Simulation`] owns the [`World`], consumes queued input at the start of
//! each fixed step and hands collaborators read-only snapshots. It plugs into
//! [`FixedStepLoop`](crate::game_loop::FixedStepLoop) through [`FrameHooks`].

use std::collections::HashMap;

use glam::Vec2;
use serde::Serialize;

use crate::game_loop::FrameHooks;
use crate::settings::{ConfigError, SimSettings};
use crate::sim::ccd::CollisionRecord;
use crate::sim::level::load_level;
use crate::sim::pool::{PoolName, PoolStats};
use crate::sim::spatial::SpatialStats;
use crate::sim::state::{BrickKind, CollisionCounters, GameEvent, GamePhase, World};
use crate::sim::tick::{TickInput, tick};
use crate::sim::{AttackKind, BossKind, BossState, PowerUpKind};

/// Size of the cached brick layer a renderer would redraw on version change
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderCacheStats {
    pub version: u64,
    pub width: f32,
    pub height: f32,
}

/// Polled counters for debug overlays
#[derive(Debug, Clone, Serialize)]
pub struct SimStats {
    pub pools: Vec<(PoolName, PoolStats)>,
    pub spatial: SpatialStats,
    pub render_cache: RenderCacheStats,
    pub counters: CollisionCounters,
    pub tick_count: u64,
    pub time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BallView {
    pub id: u32,
    pub pos: Vec2,
    pub radius: f32,
    pub is_fireball: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrickView {
    pub id: u32,
    pub min: Vec2,
    pub max: Vec2,
    pub kind: BrickKind,
    pub hits: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BossView {
    pub id: u32,
    pub kind: BossKind,
    pub pos: Vec2,
    pub size: Vec2,
    pub state: BossState,
    pub health: f32,
    pub max_health: f32,
    /// Hit flash / blink visibility
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileView {
    pub id: u32,
    pub kind: AttackKind,
    pub pos: Vec2,
    pub size: Vec2,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerUpView {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
}

/// What a renderer needs for one frame, interpolated between fixed steps
#[derive(Debug, Clone, Serialize)]
pub struct RenderSnapshot {
    pub alpha: f32,
    pub phase: GamePhase,
    pub level: u32,
    pub score: u64,
    pub lives: u32,
    pub paddle_pos: Vec2,
    pub paddle_size: Vec2,
    pub balls: Vec<BallView>,
    pub bricks: Vec<BrickView>,
    /// Changes whenever `bricks` changes
    pub brick_layer_version: u64,
    pub bosses: Vec<BossView>,
    pub projectiles: Vec<ProjectileView>,
    pub power_ups: Vec<PowerUpView>,
    /// Pending telegraphs: origin and seconds until they fire
    pub telegraphs: Vec<(Vec2, f32)>,
    pub explosions: Vec<(Vec2, f32)>,
}

/// Positions at the start of the latest fixed step
#[derive(Debug, Default)]
struct PreviousPositions {
    paddle: Vec2,
    balls: HashMap<u32, Vec2>,
    bosses: HashMap<u32, Vec2>,
    projectiles: HashMap<u32, Vec2>,
    power_ups: HashMap<u32, Vec2>,
}

impl PreviousPositions {
    fn capture(world: &World) -> Self {
        Self {
            paddle: world.paddle.pos,
            balls: world.balls.iter().map(|b| (b.id, b.pos)).collect(),
            bosses: world.bosses.iter().map(|b| (b.id, b.pos)).collect(),
            projectiles: world.projectiles.iter().map(|p| (p.id, p.pos)).collect(),
            power_ups: world.power_ups.iter().map(|p| (p.id, p.pos)).collect(),
        }
    }
}

/// Blend from the previous step's position; new entities render where they are
fn lerp_from(previous: &HashMap<u32, Vec2>, id: u32, current: Vec2, alpha: f32) -> Vec2 {
    match previous.get(&id) {
        Some(prev) => prev.lerp(current, alpha),
        None => current,
    }
}

/// Owner of a running game
pub struct Simulation {
    world: World,
    pending: TickInput,
    previous: PreviousPositions,
    last_alpha: f32,
    /// Latest snapshot built by `on_render`
    frame: Option<RenderSnapshot>,
}

impl Simulation {
    /// Validate `settings` and start on level 1
    pub fn new(seed: u64, settings: SimSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let mut world = World::new(seed, settings);
        load_level(&mut world, 1);
        let previous = PreviousPositions::capture(&world);
        log::info!("Simulation started with seed {}", seed);
        Ok(Self {
            world,
            pending: TickInput::default(),
            previous,
            last_alpha: 1.0,
            frame: None,
        })
    }

    /// Queue input for the next fixed step
    ///
    /// One-shot commands accumulate until consumed; the latest steering wins.
    pub fn queue_input(&mut self, input: TickInput) {
        self.pending.launch |= input.launch;
        self.pending.skip_level |= input.skip_level;
        self.pending.idle_mode = input.idle_mode;
        self.pending.paddle_axis = input.paddle_axis;
        if input.paddle_target.is_some() {
            self.pending.paddle_target = input.paddle_target;
        } else if input.paddle_axis != 0.0 {
            // Keyboard takes over from the pointer
            self.pending.paddle_target = None;
        }
    }

    /// Advance one fixed step with the queued input
    pub fn step(&mut self, dt: f32) {
        self.previous = PreviousPositions::capture(&self.world);
        let input = TickInput {
            launch: std::mem::take(&mut self.pending.launch),
            skip_level: std::mem::take(&mut self.pending.skip_level),
            ..self.pending.clone()
        };
        tick(&mut self.world, &input, dt);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn is_over(&self) -> bool {
        self.world.phase == GamePhase::GameOver
    }

    /// Latest snapshot produced by the frame loop, if any
    pub fn last_frame(&self) -> Option<&RenderSnapshot> {
        self.frame.as_ref()
    }

    /// Build a render snapshot interpolated by `alpha` (0 = previous step, 1 = current)
    pub fn snapshot(&self, alpha: f32) -> RenderSnapshot {
        let alpha = if alpha.is_finite() { alpha.clamp(0.0, 1.0) } else { 1.0 };
        let world = &self.world;
        let prev = &self.previous;
        let paddle_rect = world.paddle.rect();

        RenderSnapshot {
            alpha,
            phase: world.phase,
            level: world.level,
            score: world.score,
            lives: world.lives,
            paddle_pos: prev.paddle.lerp(world.paddle.pos, alpha),
            paddle_size: paddle_rect.size(),
            balls: world
                .balls
                .iter()
                .map(|b| BallView {
                    id: b.id,
                    pos: lerp_from(&prev.balls, b.id, b.pos, alpha),
                    radius: b.radius,
                    is_fireball: b.is_fireball,
                })
                .collect(),
            bricks: world
                .bricks
                .iter()
                .filter(|b| b.visible)
                .map(|b| BrickView {
                    id: b.id,
                    min: b.rect.min,
                    max: b.rect.max,
                    kind: b.kind,
                    hits: b.hits,
                })
                .collect(),
            brick_layer_version: world.brick_layer_version,
            bosses: world
                .bosses
                .iter()
                .map(|b| BossView {
                    id: b.id,
                    kind: b.kind,
                    pos: lerp_from(&prev.bosses, b.id, b.pos, alpha),
                    size: b.size,
                    state: b.state,
                    health: b.health,
                    max_health: b.max_health,
                    visible: b.blink_timer <= 0.0 || (b.blink_timer * 20.0) as u32 % 2 == 0,
                })
                .collect(),
            projectiles: world
                .projectiles
                .iter()
                .map(|p| ProjectileView {
                    id: p.id,
                    kind: p.kind,
                    pos: lerp_from(&prev.projectiles, p.id, p.pos, alpha),
                    size: p.size,
                })
                .collect(),
            power_ups: world
                .power_ups
                .iter()
                .map(|p| PowerUpView {
                    id: p.id,
                    kind: p.kind,
                    pos: lerp_from(&prev.power_ups, p.id, p.pos, alpha),
                })
                .collect(),
            telegraphs: world
                .telegraphs
                .iter()
                .map(|t| (t.origin, (t.fire_at - world.time).max(0.0) as f32))
                .collect(),
            explosions: world
                .pools
                .explosions
                .iter_active()
                .map(|(_, e)| (e.pos, e.radius))
                .collect(),
        }
    }

    pub fn stats(&self) -> SimStats {
        let layer = self.world.brick_layer_bounds();
        SimStats {
            pools: self.world.pools.stats(),
            spatial: self.world.grid.stats(),
            render_cache: RenderCacheStats {
                version: self.world.brick_layer_version,
                width: layer.width(),
                height: layer.height(),
            },
            counters: self.world.counters.clone(),
            tick_count: self.world.tick_count,
            time: self.world.time,
        }
    }

    /// Recent collisions, oldest first
    pub fn collision_history(&self) -> Vec<CollisionRecord> {
        self.world.history.records()
    }

    pub fn collision_history_json(&self) -> serde_json::Result<String> {
        self.world.history.to_json()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.world.drain_events()
    }

    /// Interpolation factor of the last render callback
    pub fn last_alpha(&self) -> f32 {
        self.last_alpha
    }
}

impl FrameHooks for Simulation {
    fn on_fixed_update(&mut self, dt: f32) {
        self.step(dt);
    }

    fn on_render(&mut self, alpha: f32) {
        self.last_alpha = alpha;
        self.frame = Some(self.snapshot(alpha));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::game_loop::{FixedStepLoop, LoopConfig};

    fn sim(seed: u64) -> Simulation {
        Simulation::new(seed, SimSettings::default()).unwrap()
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = SimSettings::default();
        settings.ccd.max_substeps = 0;
        assert!(matches!(
            Simulation::new(1, settings),
            Err(ConfigError::ZeroSubsteps)
        ));
    }

    #[test]
    fn test_launch_is_consumed_once() {
        let mut sim = sim(3);
        sim.queue_input(TickInput {
            launch: true,
            ..Default::default()
        });
        sim.step(SIM_DT);
        assert_eq!(sim.world().phase, GamePhase::Playing);
        assert!(!sim.pending.launch);
    }

    #[test]
    fn test_latest_target_wins() {
        let mut sim = sim(4);
        sim.queue_input(TickInput {
            paddle_target: Some(Vec2::new(100.0, 0.0)),
            ..Default::default()
        });
        sim.queue_input(TickInput {
            paddle_target: Some(Vec2::new(600.0, 0.0)),
            ..Default::default()
        });
        sim.queue_input(TickInput {
            launch: true,
            ..Default::default()
        });
        assert_eq!(sim.pending.paddle_target, Some(Vec2::new(600.0, 0.0)));
        assert!(sim.pending.launch);
    }

    #[test]
    fn test_snapshot_interpolates_paddle() {
        let mut sim = sim(5);
        let start = sim.world().paddle.pos;
        sim.queue_input(TickInput {
            paddle_target: Some(Vec2::new(700.0, 0.0)),
            ..Default::default()
        });
        sim.step(SIM_DT);
        let end = sim.world().paddle.pos;
        assert!(end.x > start.x);

        let half = sim.snapshot(0.5);
        assert!((half.paddle_pos.x - (start.x + end.x) / 2.0).abs() < 1e-3);
        assert_eq!(sim.snapshot(0.0).paddle_pos, start);
        assert_eq!(sim.snapshot(1.0).paddle_pos, end);
    }

    #[test]
    fn test_loop_drives_simulation() {
        let mut sim = sim(6);
        let mut game_loop = FixedStepLoop::new(LoopConfig::default()).unwrap();
        sim.queue_input(TickInput {
            idle_mode: true,
            ..Default::default()
        });

        // Two seconds at 60 Hz display refresh
        for _ in 0..120 {
            game_loop.frame(SIM_DT, &mut sim);
        }
        let ticks = sim.world().tick_count;
        assert!((119..=121).contains(&ticks), "ran {} ticks", ticks);
        assert!(sim.last_frame().is_some());
        assert!(sim.stats().counters.total > 0);
    }

    #[test]
    fn test_stats_report_brick_layer() {
        let sim = sim(7);
        let stats = sim.stats();
        assert_eq!(stats.spatial.object_count, sim.world().bricks.len());
        assert!(stats.render_cache.width > 0.0);
        assert!(stats.render_cache.height > 0.0);
        assert!(sim.collision_history_json().is_ok());
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = sim(42);
        let mut b = sim(42);
        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        for _ in 0..900 {
            a.queue_input(input.clone());
            b.queue_input(input.clone());
            a.step(SIM_DT);
            b.step(SIM_DT);
        }
        assert_eq!(a.world().score, b.world().score);
        assert_eq!(a.world().counters, b.world().counters);
        assert_eq!(a.drain_events(), b.drain_events());
    }
}
