//! World state and core simulation types
//!
//! [`World`] is the single owner of every live entity. It is passed by
//! `&mut` to each subsystem during a fixed step; collaborators outside the
//! simulation only read it.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::boss::{AttackKind, Boss, BossKind, ScheduledAttack};
use super::ccd::{CollisionHistory, ColliderId};
use super::collision::paddle_bounce;
use super::geometry::Aabb;
use super::pool::EffectPools;
use super::powerup::{DropHistory, PowerUpKind};
use super::spatial::SpatialGrid;
use crate::consts::*;
use crate::settings::SimSettings;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// Ball attached to paddle, waiting for launch input
    Serve,
    /// Active gameplay
    Playing,
    /// Run ended
    GameOver,
}

/// Ball state - attached to paddle or free-moving
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BallState {
    /// Ball rides on the paddle at the given offset along the paddle tangent
    Attached { offset: f32 },
    /// Ball is free-moving
    Free,
}

/// A ball entity
#[derive(Debug, Clone, Serialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    /// Velocity in px/s
    pub vel: Vec2,
    pub radius: f32,
    pub state: BallState,
    /// Burns through destructible bricks without bouncing
    pub is_fireball: bool,
    /// Last collider struck and when (simulation seconds)
    #[serde(skip)]
    pub last_hit: Option<(ColliderId, f64)>,
}

impl Ball {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius: BALL_RADIUS,
            state: BallState::Attached { offset: 0.0 },
            is_fireball: false,
            last_hit: None,
        }
    }

    /// A free ball at `pos` moving with `vel`
    pub fn free(id: u32, pos: Vec2, vel: Vec2) -> Self {
        Self {
            pos,
            vel,
            state: BallState::Free,
            ..Self::new(id)
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    pub fn is_free(&self) -> bool {
        matches!(self.state, BallState::Free)
    }

    /// Recompute speed-derived flags
    pub fn refresh_flags(&mut self, fireball_active: bool) {
        self.is_fireball = fireball_active || self.speed() >= FIREBALL_SPEED;
    }

    /// Update attached ball position based on paddle
    pub fn update_attached(&mut self, paddle: &Paddle) {
        if let BallState::Attached { offset } = self.state {
            let lift = paddle.thickness() / 2.0 + self.radius + 1.0;
            self.pos = paddle.pos + paddle.face_normal() * lift + paddle.tangent() * offset;
            self.vel = Vec2::ZERO;
        }
    }

    /// Launch the ball from attached state
    pub fn launch(&mut self, paddle: &Paddle, speed: f32) {
        if let BallState::Attached { offset } = self.state {
            let normal = paddle.face_normal();
            let tangent = paddle.tangent();
            // Slight default lean, plus "english" from paddle motion
            let english = (paddle.vel.dot(tangent) / PADDLE_MAX_SPEED).clamp(-0.5, 0.5);
            let aim = 0.15 + english + offset / paddle.length().max(1.0);
            self.vel = paddle_bounce(normal * speed, normal, tangent, aim, MAX_BOUNCE_ANGLE);
            self.state = BallState::Free;
        }
    }
}

/// Which side of the perimeter path a paddle is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Edge {
    Bottom,
    Right,
    Top,
    Left,
}

/// Paddle movement mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PaddleMode {
    /// Slides left/right along the bottom
    Linear,
    /// Travels around the playfield; `t` is the distance along the path
    Perimeter { t: f32, edge: Edge },
}

/// The player's paddle
#[derive(Debug, Clone, Serialize)]
pub struct Paddle {
    /// Center position
    pub pos: Vec2,
    /// Length along the direction of travel
    pub width: f32,
    pub height: f32,
    pub base_width: f32,
    /// Velocity during the last step (px/s)
    pub vel: Vec2,
    pub mode: PaddleMode,
    /// Seconds of immunity left after a projectile hit
    pub invulnerable: f32,
}

impl Default for Paddle {
    fn default() -> Self {
        Self {
            pos: Vec2::new(PLAYFIELD_WIDTH / 2.0, PADDLE_Y),
            width: PADDLE_WIDTH,
            height: PADDLE_HEIGHT,
            base_width: PADDLE_WIDTH,
            vel: Vec2::ZERO,
            mode: PaddleMode::Linear,
            invulnerable: 0.0,
        }
    }
}

/// Inset rectangle the perimeter paddle travels on
fn perimeter_path(bounds: &Aabb) -> Aabb {
    bounds.expand(-PERIMETER_INSET)
}

fn perimeter_length(bounds: &Aabb) -> f32 {
    let path = perimeter_path(bounds);
    2.0 * (path.width() + path.height())
}

/// Point and edge at distance `t` along the path (counter-clockwise from bottom-left)
pub fn perimeter_point(bounds: &Aabb, t: f32) -> (Vec2, Edge) {
    let path = perimeter_path(bounds);
    let (w, h) = (path.width(), path.height());
    let t = t.rem_euclid(2.0 * (w + h));
    if t < w {
        (Vec2::new(path.min.x + t, path.max.y), Edge::Bottom)
    } else if t < w + h {
        (Vec2::new(path.max.x, path.max.y - (t - w)), Edge::Right)
    } else if t < 2.0 * w + h {
        (Vec2::new(path.max.x - (t - w - h), path.min.y), Edge::Top)
    } else {
        (Vec2::new(path.min.x, path.min.y + (t - 2.0 * w - h)), Edge::Left)
    }
}

/// Distance along the path of the path point closest to `p`
pub fn project_to_perimeter(bounds: &Aabb, p: Vec2) -> f32 {
    let path = perimeter_path(bounds);
    let (w, h) = (path.width(), path.height());
    let q = path.closest_point(p);
    let candidates = [
        ((q.y - path.max.y).abs() + (p.y - path.max.y).abs(), q.x - path.min.x),
        ((q.x - path.max.x).abs() + (p.x - path.max.x).abs(), w + (path.max.y - q.y)),
        ((q.y - path.min.y).abs() + (p.y - path.min.y).abs(), w + h + (path.max.x - q.x)),
        ((q.x - path.min.x).abs() + (p.x - path.min.x).abs(), 2.0 * w + h + (q.y - path.min.y)),
    ];
    candidates
        .into_iter()
        .fold(candidates[0], |best, c| if c.0 < best.0 { c } else { best })
        .1
}

impl Paddle {
    /// Edge the paddle currently sits on
    pub fn edge(&self) -> Edge {
        match self.mode {
            PaddleMode::Linear => Edge::Bottom,
            PaddleMode::Perimeter { edge, .. } => edge,
        }
    }

    /// Direction the paddle faces (into the playfield)
    pub fn face_normal(&self) -> Vec2 {
        match self.edge() {
            Edge::Bottom => Vec2::NEG_Y,
            Edge::Right => Vec2::NEG_X,
            Edge::Top => Vec2::Y,
            Edge::Left => Vec2::X,
        }
    }

    /// Direction along the paddle; offsets are measured on this axis
    pub fn tangent(&self) -> Vec2 {
        self.face_normal().perp()
    }

    pub fn length(&self) -> f32 {
        self.width
    }

    pub fn thickness(&self) -> f32 {
        self.height
    }

    /// Collision box, oriented to the current edge
    pub fn rect(&self) -> Aabb {
        let along = self.tangent().abs();
        let size = along * self.width + (Vec2::ONE - along) * self.height;
        Aabb::from_center(self.pos, size)
    }

    /// Switch to perimeter mode, starting at the middle of the bottom edge
    pub fn enter_perimeter(&mut self, bounds: &Aabb) {
        let t = perimeter_path(bounds).width() / 2.0;
        let (pos, edge) = perimeter_point(bounds, t);
        self.mode = PaddleMode::Perimeter { t, edge };
        self.pos = pos;
        self.vel = Vec2::ZERO;
    }

    /// Back to linear mode at the bottom center
    pub fn reset_linear(&mut self, bounds: &Aabb) {
        self.mode = PaddleMode::Linear;
        self.pos = Vec2::new(bounds.center().x, PADDLE_Y);
        self.vel = Vec2::ZERO;
    }

    /// Move toward the input target, limited to `max_speed`
    ///
    /// `target` is a pointer position; `axis` (-1..1) is keyboard steering
    /// along the tangent and is used when there is no pointer target.
    pub fn steer(&mut self, target: Option<Vec2>, axis: f32, dt: f32, max_speed: f32, bounds: &Aabb) {
        if dt <= 0.0 {
            return;
        }
        let max_step = max_speed * dt;
        let before = self.pos;
        match self.mode {
            PaddleMode::Linear => {
                let delta = match target {
                    Some(t) if t.x.is_finite() => t.x - self.pos.x,
                    _ => axis.clamp(-1.0, 1.0) * max_step,
                };
                let half = self.width / 2.0;
                self.pos.x = (self.pos.x + delta.clamp(-max_step, max_step))
                    .clamp(bounds.min.x + half, bounds.max.x - half);
            }
            PaddleMode::Perimeter { t, .. } => {
                let total = perimeter_length(bounds);
                let delta = match target {
                    Some(p) if p.is_finite() => {
                        let mut d = project_to_perimeter(bounds, p) - t;
                        // Shortest way around
                        if d > total / 2.0 {
                            d -= total;
                        } else if d < -total / 2.0 {
                            d += total;
                        }
                        d
                    }
                    _ => axis.clamp(-1.0, 1.0) * max_step,
                };
                let t = (t + delta.clamp(-max_step, max_step)).rem_euclid(total);
                let (pos, edge) = perimeter_point(bounds, t);
                self.mode = PaddleMode::Perimeter { t, edge };
                self.pos = pos;
            }
        }
        self.vel = (self.pos - before) / dt;
    }
}

/// Brick types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BrickKind {
    #[default]
    Normal,
    /// Takes several hits
    Metal,
    /// Cannot be destroyed, doesn't count for level clear
    Indestructible,
}

impl BrickKind {
    pub fn is_destructible(&self) -> bool {
        *self != BrickKind::Indestructible
    }
}

/// What a single hit did to a brick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrickHit {
    Damaged,
    Destroyed,
    Deflected,
}

/// A brick entity
#[derive(Debug, Clone, Serialize)]
pub struct Brick {
    pub id: u32,
    pub rect: Aabb,
    pub kind: BrickKind,
    /// Hits left before destruction
    pub hits: u32,
    pub visible: bool,
    /// Hidden power-up released on destruction
    pub power_up: Option<PowerUpKind>,
    pub points: u64,
}

impl Brick {
    pub fn new(id: u32, rect: Aabb, kind: BrickKind) -> Self {
        let (hits, points) = match kind {
            BrickKind::Normal => (1, 50),
            BrickKind::Metal => (2, 100),
            BrickKind::Indestructible => (1, 0),
        };
        Self {
            id,
            rect,
            kind,
            hits,
            visible: true,
            power_up: None,
            points,
        }
    }

    /// Apply one hit
    pub fn hit(&mut self) -> BrickHit {
        if !self.kind.is_destructible() || !self.visible {
            return BrickHit::Deflected;
        }
        self.hits = self.hits.saturating_sub(1);
        if self.hits == 0 {
            BrickHit::Destroyed
        } else {
            BrickHit::Damaged
        }
    }

    /// Returns true if this brick must be destroyed to clear the level
    pub fn counts_for_clear(&self) -> bool {
        self.visible && self.kind.is_destructible()
    }
}

/// A falling power-up capsule
#[derive(Debug, Clone, Serialize)]
pub struct PowerUp {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
}

impl PowerUp {
    pub fn rect(&self) -> Aabb {
        Aabb::from_center(self.pos, self.size)
    }
}

/// A boss projectile
#[derive(Debug, Clone, Serialize)]
pub struct Projectile {
    pub id: u32,
    pub kind: AttackKind,
    pub owner: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    pub damage: u32,
    /// Seconds before it fizzles
    pub life: f32,
}

impl Projectile {
    pub fn rect(&self) -> Aabb {
        Aabb::from_center(self.pos, self.size)
    }
}

/// Timed power-up effects (seconds remaining)
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActiveEffects {
    pub paddle_size_timer: f32,
    pub fireball_timer: f32,
}

/// Collision counters sampled by collaborators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollisionCounters {
    pub total: u64,
    pub walls: u64,
    pub bricks: u64,
    pub paddle: u64,
    pub bosses: u64,
    pub projectiles: u64,
    pub duplicates: u64,
    pub substep_limit_hits: u64,
    pub skipped_degenerate: u64,
}

/// Things that happened during a step, drained by collaborators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    BrickHit { id: u32 },
    BrickDestroyed { id: u32, pos: Vec2 },
    PowerUpSpawned { kind: PowerUpKind },
    PowerUpCollected { kind: PowerUpKind },
    BallLost { id: u32 },
    LifeLost { lives: u32 },
    PaddleHit { damage: u32 },
    BossSpawned { id: u32, kind: BossKind },
    BossDamaged { id: u32, health: f32 },
    BossEnraged { id: u32 },
    BossStunned { id: u32 },
    BossDefeated { id: u32, kind: BossKind, score: u64 },
    BossResurrected { parent: u32, children: Vec<u32> },
    AttackTelegraphed { boss: u32, kind: AttackKind, fire_at: f64 },
    AttackFired { boss: u32, kind: AttackKind },
    LevelCleared { level: u32 },
    GameOver { score: u64 },
}

/// Complete simulation state
pub struct World {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub settings: SimSettings,
    /// Playfield bounds
    pub bounds: Aabb,
    /// Simulation time in seconds
    pub time: f64,
    pub tick_count: u64,
    pub level: u32,
    pub score: u64,
    pub lives: u32,
    pub phase: GamePhase,
    pub paddle: Paddle,
    /// Active balls (sorted by id for determinism)
    pub balls: Vec<Ball>,
    /// Level bricks (sorted by id)
    pub bricks: Vec<Brick>,
    pub bosses: Vec<Boss>,
    pub projectiles: Vec<Projectile>,
    /// Pending telegraphed attacks
    pub telegraphs: Vec<ScheduledAttack>,
    pub power_ups: Vec<PowerUp>,
    pub effects: ActiveEffects,
    /// Visual effects (not gameplay-affecting)
    pub pools: EffectPools,
    pub grid: SpatialGrid,
    pub drop_history: DropHistory,
    pub counters: CollisionCounters,
    pub history: CollisionHistory,
    /// Bumped whenever the brick layer a renderer would cache changes
    pub brick_layer_version: u64,
    events: Vec<GameEvent>,
    next_id: u32,
}

impl World {
    /// An empty world; `level::load_level` fills it
    pub fn new(seed: u64, settings: SimSettings) -> Self {
        let pools = EffectPools::new(&settings.pools);
        let history = CollisionHistory::new(settings.ccd.history_capacity);
        let drop_history = DropHistory::new(settings.power_ups.history_window);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            settings,
            bounds: Aabb::new(Vec2::ZERO, Vec2::new(PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT)),
            time: 0.0,
            tick_count: 0,
            level: 0,
            score: 0,
            lives: START_LIVES,
            phase: GamePhase::Serve,
            paddle: Paddle::default(),
            balls: Vec::new(),
            bricks: Vec::new(),
            bosses: Vec::new(),
            projectiles: Vec::new(),
            telegraphs: Vec::new(),
            power_ups: Vec::new(),
            effects: ActiveEffects::default(),
            pools,
            grid: SpatialGrid::new(BRICK_WIDTH),
            drop_history,
            counters: CollisionCounters::default(),
            history,
            brick_layer_version: 0,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Hand pending events to a collaborator
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Spawn a ball attached to the paddle
    pub fn spawn_ball_attached(&mut self) -> u32 {
        let id = self.next_entity_id();
        let mut ball = Ball::new(id);
        ball.update_attached(&self.paddle);
        self.balls.push(ball);
        id
    }

    /// Add a brick and return its id (the grid is marked for rebuild)
    pub fn add_brick(&mut self, rect: Aabb, kind: BrickKind) -> u32 {
        let id = self.next_entity_id();
        self.bricks.push(Brick::new(id, rect, kind));
        self.grid.mark_dirty();
        id
    }

    /// Index of a brick by id (bricks are kept sorted by id)
    pub fn brick_index(&self, id: u32) -> Option<usize> {
        self.bricks.binary_search_by_key(&id, |b| b.id).ok()
    }

    pub fn boss_index(&self, id: u32) -> Option<usize> {
        self.bosses.iter().position(|b| b.id == id)
    }

    /// Hide a brick, release its power-up and play its explosion
    pub fn destroy_brick(&mut self, index: usize) {
        let (id, rect, points, power_up) = {
            let brick = &mut self.bricks[index];
            if !brick.visible {
                return;
            }
            brick.visible = false;
            brick.hits = 0;
            (brick.id, brick.rect, brick.points, brick.power_up.take())
        };

        self.grid.remove(id, &rect);
        self.brick_layer_version += 1;
        self.score += points;
        self.push_event(GameEvent::BrickDestroyed {
            id,
            pos: rect.center(),
        });

        if let Some(kind) = power_up {
            let pu_id = self.next_entity_id();
            self.power_ups.push(PowerUp {
                id: pu_id,
                kind,
                pos: rect.center(),
                vel: Vec2::new(0.0, POWERUP_FALL_SPEED),
                size: Vec2::new(POWERUP_WIDTH, POWERUP_HEIGHT),
            });
            self.drop_history.record_drop(kind);
            if kind == PowerUpKind::ExtraLife {
                self.drop_history.record_extra_life_assigned();
            }
            self.push_event(GameEvent::PowerUpSpawned { kind });
        }

        let size = rect.width().max(rect.height());
        self.pools.spawn_explosion(rect.center(), size, &mut self.rng);
    }

    /// Bricks that still have to go before the level is clear
    pub fn remaining_bricks(&self) -> usize {
        self.bricks.iter().filter(|b| b.counts_for_clear()).count()
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
        self.bricks.sort_by_key(|b| b.id);
        self.bosses.sort_by_key(|b| b.id);
        self.projectiles.sort_by_key(|p| p.id);
        self.power_ups.sort_by_key(|p| p.id);
    }

    /// Rectangle collaborators would cache the brick layer in
    pub fn brick_layer_bounds(&self) -> Aabb {
        self.bricks
            .iter()
            .map(|b| b.rect)
            .reduce(|a, b| a.union(&b))
            .unwrap_or(Aabb::new(self.bounds.min, self.bounds.min))
    }

    /// Index of the current level group for the extra-life cap
    pub fn level_group(&self) -> u32 {
        super::powerup::level_group(self.level, self.settings.power_ups.extra_life_group_size)
    }

    /// Spawn a boss of `kind` at `pos`
    pub fn spawn_boss(&mut self, kind: BossKind, pos: Vec2) -> u32 {
        let id = self.next_entity_id();
        let boss = Boss::new(id, kind, pos, self.time, 0, self.level);
        self.bosses.push(boss);
        self.push_event(GameEvent::BossSpawned { id, kind });
        log::info!("Boss {:?} (id {}) spawned on level {}", kind, id, self.level);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Aabb {
        Aabb::new(Vec2::ZERO, Vec2::new(PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT))
    }

    #[test]
    fn test_brick_hits() {
        let rect = Aabb::new(Vec2::ZERO, Vec2::new(10.0, 10.0));
        let mut metal = Brick::new(1, rect, BrickKind::Metal);
        assert_eq!(metal.hit(), BrickHit::Damaged);
        assert_eq!(metal.hit(), BrickHit::Destroyed);

        let mut wall = Brick::new(2, rect, BrickKind::Indestructible);
        assert_eq!(wall.hit(), BrickHit::Deflected);
        assert!(!wall.counts_for_clear());
    }

    #[test]
    fn test_destroy_brick_spawns_power_up() {
        let mut world = World::new(7, SimSettings::default());
        let id = world.add_brick(
            Aabb::new(Vec2::new(100.0, 100.0), Vec2::new(164.0, 124.0)),
            BrickKind::Normal,
        );
        world.grid.rebuild(&world.bricks);
        let idx = world.brick_index(id).unwrap();
        world.bricks[idx].power_up = Some(PowerUpKind::MultiBall);

        world.destroy_brick(idx);
        assert!(!world.bricks[idx].visible);
        assert_eq!(world.power_ups.len(), 1);
        assert_eq!(world.score, 50);
        assert_eq!(world.grid.stats().object_count, 0);
        assert_eq!(world.pools.explosions.active_count(), 1);
        assert!(world
            .events()
            .contains(&GameEvent::PowerUpSpawned { kind: PowerUpKind::MultiBall }));

        // Second destroy is a no-op
        world.destroy_brick(idx);
        assert_eq!(world.score, 50);
    }

    #[test]
    fn test_attached_ball_follows_paddle() {
        let mut world = World::new(1, SimSettings::default());
        world.spawn_ball_attached();
        let ball = &world.balls[0];
        assert!(ball.pos.y < world.paddle.pos.y);
        assert!((ball.pos.x - world.paddle.pos.x).abs() < 1e-4);
    }

    #[test]
    fn test_launch_goes_up() {
        let paddle = Paddle::default();
        let mut ball = Ball::new(1);
        ball.update_attached(&paddle);
        ball.launch(&paddle, BALL_START_SPEED);
        assert!(ball.is_free());
        assert!(ball.vel.y < 0.0);
        assert!((ball.speed() - BALL_START_SPEED).abs() < 1e-2);
    }

    #[test]
    fn test_linear_steer_clamped() {
        let mut paddle = Paddle::default();
        paddle.steer(Some(Vec2::new(10_000.0, 0.0)), 0.0, 1.0, 10_000.0, &bounds());
        assert!((paddle.pos.x - (PLAYFIELD_WIDTH - PADDLE_WIDTH / 2.0)).abs() < 1e-3);
        assert!(paddle.vel.x > 0.0);
    }

    #[test]
    fn test_perimeter_path_round_trip() {
        let b = bounds();
        for &t in &[10.0_f32, 500.0, 900.0, 1500.0, 2000.0] {
            let (p, _) = perimeter_point(&b, t);
            let back = project_to_perimeter(&b, p);
            assert!((back - t).abs() < 1e-2, "t={t} back={back}");
        }
    }

    #[test]
    fn test_perimeter_paddle_orientation() {
        let b = bounds();
        let mut paddle = Paddle::default();
        paddle.enter_perimeter(&b);
        assert_eq!(paddle.edge(), Edge::Bottom);
        assert_eq!(paddle.face_normal(), Vec2::NEG_Y);

        // Drive onto the right edge
        paddle.steer(Some(Vec2::new(PLAYFIELD_WIDTH, 300.0)), 0.0, 1.0, 10_000.0, &b);
        assert_eq!(paddle.edge(), Edge::Right);
        assert_eq!(paddle.face_normal(), Vec2::NEG_X);
        let rect = paddle.rect();
        assert!(rect.height() > rect.width());
    }

    #[test]
    fn test_perimeter_paddle_follows_custom_bounds() {
        // A narrow arena whose right edge sits far from the default playfield's
        let b = Aabb::new(Vec2::new(100.0, 50.0), Vec2::new(400.0, 550.0));
        let mut paddle = Paddle::default();
        paddle.enter_perimeter(&b);

        for target in [Vec2::new(100.0, 300.0), Vec2::new(250.0, 50.0), Vec2::new(400.0, 300.0)] {
            paddle.steer(Some(target), 0.0, 1.0, 10_000.0, &b);
            let PaddleMode::Perimeter { t, edge } = paddle.mode else {
                panic!("paddle left perimeter mode");
            };
            assert_eq!(edge, perimeter_point(&b, t).1);
            assert_eq!(paddle.edge(), edge);
        }
        assert_eq!(paddle.edge(), Edge::Right);
        assert_eq!(paddle.face_normal(), Vec2::NEG_X);
        assert!(paddle.rect().intersects(&b));
    }
}
