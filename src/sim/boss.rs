//! Boss encounters
//!
//! Each boss runs a small state machine (idle intro, moving, attacking while
//! a telegraph is pending, stunned, angry, dead) over a waypoint-driven
//! movement pattern. Attacks are drawn from a weighted per-kind table; the
//! heavy ones are announced first and fired from [`fire_scheduled_attacks`]
//! once simulation time reaches their `fire_at`.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::geometry::Aabb;
use super::rng::{sample_without_replacement, weighted_choice};
use super::state::{GameEvent, Projectile, World};
use crate::consts::*;
use crate::{direction_from_angle, normalize_angle};

/// Flash duration after taking a hit (seconds)
const HIT_FLASH_DURATION: f32 = 0.15;
/// Speed boost while charging toward a waypoint
const CHARGE_MULTIPLIER: f32 = 2.5;
const CHARGE_DURATION: f64 = 0.6;
/// Spiral volleys rotate by this much each time (radians)
const SPIRAL_STEP: f32 = 0.35;
/// Max homing turn rate (radians per second)
const HOMING_TURN_RATE: f32 = 2.5;
/// Projectiles this far outside the playfield are dropped
const PROJECTILE_MARGIN: f32 = 50.0;
/// Immunity after the paddle is struck (seconds)
const PADDLE_INVULNERABILITY: f32 = 2.0;
/// Per-generation scaling of resurrected children
const CHILD_HEALTH_SCALE: f32 = 0.5;
const CHILD_SIZE_SCALE: f32 = 0.7;
const CHILD_INTRO: f32 = 0.5;
/// Score for a single ball strike
const HIT_SCORE: u64 = 10;

/// Boss archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BossKind {
    Cube,
    Sphere,
    /// Splits into smaller copies on defeat
    Pyramid,
    /// Sits mid-field; the paddle switches to the perimeter path
    Warden,
}

impl BossKind {
    pub const ALL: [BossKind; 4] = [BossKind::Cube, BossKind::Sphere, BossKind::Pyramid, BossKind::Warden];

    pub fn uses_perimeter_paddle(&self) -> bool {
        *self == BossKind::Warden
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BossState {
    Idle,
    Moving,
    Attacking,
    Stunned,
    Angry,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MovementPattern {
    HorizontalSweep,
    ZigzagDescent,
    CornerDarts,
    CenterBob,
    SpiralOrbit,
    WaveSweep,
    TelegraphedDive,
    PatrolLanes,
    RandomWaypoints,
}

impl MovementPattern {
    pub const ALL: [MovementPattern; 9] = [
        MovementPattern::HorizontalSweep,
        MovementPattern::ZigzagDescent,
        MovementPattern::CornerDarts,
        MovementPattern::CenterBob,
        MovementPattern::SpiralOrbit,
        MovementPattern::WaveSweep,
        MovementPattern::TelegraphedDive,
        MovementPattern::PatrolLanes,
        MovementPattern::RandomWaypoints,
    ];
}

/// Triggered when a boss reaches a waypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WaypointAction {
    /// Fire an aimed shot
    Shoot,
    /// Release a missile
    Drop,
    /// Speed up for the next leg
    Charge,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Waypoint {
    pub pos: Vec2,
    pub action: Option<WaypointAction>,
}

impl Waypoint {
    fn at(x: f32, y: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            action: None,
        }
    }

    fn with(mut self, action: WaypointAction) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttackKind {
    /// Single shot aimed at the paddle
    Shot,
    /// Tall beam
    Laser,
    /// 12-way radial burst
    Super,
    /// 6-way burst with a rotating offset
    Spiral,
    /// 4 cardinal shots
    Cross,
    /// Slow heavy drop
    Missile,
    /// Steers toward the paddle
    Homing,
}

impl AttackKind {
    /// Heavy attacks are announced before they fire
    pub fn is_telegraphed(&self) -> bool {
        matches!(self, AttackKind::Laser | AttackKind::Super)
    }
}

/// A telegraphed attack waiting for its fire time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduledAttack {
    pub boss_id: u32,
    pub kind: AttackKind,
    pub origin: Vec2,
    /// Simulation time (seconds) at which it fires
    pub fire_at: f64,
}

/// Per-kind tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BossConfig {
    pub max_health: f32,
    pub size: Vec2,
    /// Cruising speed (px/s)
    pub speed: f32,
    /// Fraction of max health at which the boss becomes angry
    pub angry_threshold: f32,
    /// Speed and attack-rate multiplier while angry
    pub angry_multiplier: f32,
    /// Seconds between attacks
    pub attack_interval: f32,
    /// Weighted attack table, drawn in declared order
    pub attacks: &'static [(AttackKind, f32)],
    pub patterns: &'static [MovementPattern],
    pub pattern_duration: f32,
    pub intro_duration: f32,
    pub telegraph_delay: f32,
    pub stun_duration: f32,
    pub projectile_speed: f32,
    /// Generations of children spawned on defeat
    pub resurrection_count: u32,
    pub defeat_score: u64,
    /// Extra score per generation
    pub resurrection_bonus: u64,
    pub death_duration: f32,
}

impl BossConfig {
    pub fn for_kind(kind: BossKind) -> Self {
        match kind {
            BossKind::Cube => Self {
                max_health: 30.0,
                size: Vec2::new(120.0, 60.0),
                speed: 140.0,
                angry_threshold: 0.5,
                angry_multiplier: 1.6,
                attack_interval: 2.2,
                attacks: &[
                    (AttackKind::Shot, 5.0),
                    (AttackKind::Cross, 3.0),
                    (AttackKind::Laser, 2.0),
                    (AttackKind::Missile, 2.0),
                ],
                patterns: &[
                    MovementPattern::HorizontalSweep,
                    MovementPattern::ZigzagDescent,
                    MovementPattern::CornerDarts,
                    MovementPattern::PatrolLanes,
                ],
                pattern_duration: 8.0,
                intro_duration: 1.5,
                telegraph_delay: 0.8,
                stun_duration: 2.5,
                projectile_speed: 260.0,
                resurrection_count: 0,
                defeat_score: 5000,
                resurrection_bonus: 0,
                death_duration: 1.2,
            },
            BossKind::Sphere => Self {
                max_health: 40.0,
                size: Vec2::new(90.0, 90.0),
                speed: 170.0,
                angry_threshold: 0.4,
                angry_multiplier: 1.8,
                attack_interval: 1.8,
                attacks: &[
                    (AttackKind::Shot, 3.0),
                    (AttackKind::Spiral, 4.0),
                    (AttackKind::Super, 2.0),
                    (AttackKind::Homing, 2.0),
                ],
                patterns: &[
                    MovementPattern::CenterBob,
                    MovementPattern::SpiralOrbit,
                    MovementPattern::WaveSweep,
                    MovementPattern::RandomWaypoints,
                ],
                pattern_duration: 7.0,
                intro_duration: 1.5,
                telegraph_delay: 0.9,
                stun_duration: 2.0,
                projectile_speed: 240.0,
                resurrection_count: 0,
                defeat_score: 6000,
                resurrection_bonus: 0,
                death_duration: 1.2,
            },
            BossKind::Pyramid => Self {
                max_health: 36.0,
                size: Vec2::new(110.0, 80.0),
                speed: 150.0,
                angry_threshold: 0.5,
                angry_multiplier: 1.5,
                attack_interval: 2.0,
                attacks: &[
                    (AttackKind::Shot, 4.0),
                    (AttackKind::Super, 2.0),
                    (AttackKind::Missile, 3.0),
                    (AttackKind::Cross, 2.0),
                ],
                patterns: &[
                    MovementPattern::TelegraphedDive,
                    MovementPattern::HorizontalSweep,
                    MovementPattern::CornerDarts,
                    MovementPattern::WaveSweep,
                ],
                pattern_duration: 8.0,
                intro_duration: 1.5,
                telegraph_delay: 0.8,
                stun_duration: 2.5,
                projectile_speed: 250.0,
                resurrection_count: 2,
                defeat_score: 4000,
                resurrection_bonus: 1500,
                death_duration: 0.8,
            },
            BossKind::Warden => Self {
                max_health: 50.0,
                size: Vec2::new(140.0, 70.0),
                speed: 120.0,
                angry_threshold: 0.5,
                angry_multiplier: 1.7,
                attack_interval: 2.4,
                attacks: &[
                    (AttackKind::Laser, 3.0),
                    (AttackKind::Homing, 3.0),
                    (AttackKind::Shot, 3.0),
                    (AttackKind::Super, 1.0),
                ],
                patterns: &[
                    MovementPattern::PatrolLanes,
                    MovementPattern::CenterBob,
                    MovementPattern::RandomWaypoints,
                    MovementPattern::SpiralOrbit,
                ],
                pattern_duration: 9.0,
                intro_duration: 2.0,
                telegraph_delay: 1.0,
                stun_duration: 2.0,
                projectile_speed: 230.0,
                resurrection_count: 0,
                defeat_score: 8000,
                resurrection_bonus: 0,
                death_duration: 1.5,
            },
        }
    }
}

/// Result of a single strike on a boss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Ignored,
    Damaged,
    /// Crossed the anger threshold with this hit
    Enraged,
    Killed,
}

/// A boss entity
#[derive(Debug, Clone, Serialize)]
pub struct Boss {
    pub id: u32,
    pub kind: BossKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub state: BossState,
    /// State to return to when a stun wears off
    pub resume_state: BossState,
    pub pattern: MovementPattern,
    pub waypoints: Vec<Waypoint>,
    pub waypoint_index: usize,
    pub pattern_started: f64,
    pub state_entered: f64,
    pub last_attack: f64,
    pub stun_until: f64,
    pub charge_until: f64,
    pub blink_timer: f32,
    pub hit_flash_timer: f32,
    pub death_timer: f32,
    pub enraged: bool,
    /// 0 for the original, +1 per resurrection
    pub generation: u32,
    pub spiral_offset: f32,
    pub config: BossConfig,
}

impl Boss {
    pub fn new(id: u32, kind: BossKind, pos: Vec2, time: f64, generation: u32, level: u32) -> Self {
        let mut config = BossConfig::for_kind(kind);
        let cycle = (level / 5).saturating_sub(1) as f32;
        config.max_health *= 1.0 + 0.25 * cycle;
        if generation > 0 {
            let g = generation as i32;
            config.max_health *= CHILD_HEALTH_SCALE.powi(g);
            config.size *= CHILD_SIZE_SCALE.powi(g);
            config.intro_duration = CHILD_INTRO;
        }
        let pattern = config
            .patterns
            .first()
            .copied()
            .unwrap_or(MovementPattern::HorizontalSweep);

        Self {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
            size: config.size,
            health: config.max_health,
            max_health: config.max_health,
            state: BossState::Idle,
            resume_state: BossState::Idle,
            pattern,
            waypoints: Vec::new(),
            waypoint_index: 0,
            pattern_started: time,
            state_entered: time,
            last_attack: time,
            stun_until: 0.0,
            charge_until: 0.0,
            blink_timer: 0.0,
            hit_flash_timer: 0.0,
            death_timer: 0.0,
            enraged: false,
            generation,
            spiral_offset: 0.0,
            config,
        }
    }

    pub fn rect(&self) -> Aabb {
        Aabb::from_center(self.pos, self.size)
    }

    pub fn is_alive(&self) -> bool {
        self.state != BossState::Dead
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Movement and attack-rate multiplier
    pub fn speed_multiplier(&self) -> f32 {
        if self.enraged {
            self.config.angry_multiplier
        } else {
            1.0
        }
    }

    /// State the boss travels in between attacks
    pub fn cruising_state(&self) -> BossState {
        if self.enraged {
            BossState::Angry
        } else {
            BossState::Moving
        }
    }

    pub fn set_state(&mut self, state: BossState, now: f64) {
        self.state = state;
        self.state_entered = now;
    }

    /// Apply damage and report what changed
    pub fn take_damage(&mut self, amount: f32, now: f64) -> DamageOutcome {
        if !self.is_alive() || amount <= 0.0 {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount).max(0.0);
        self.hit_flash_timer = HIT_FLASH_DURATION;

        if self.health <= 0.0 {
            self.set_state(BossState::Dead, now);
            self.death_timer = self.config.death_duration;
            self.vel = Vec2::ZERO;
            return DamageOutcome::Killed;
        }

        if !self.enraged && self.health <= self.config.angry_threshold * self.max_health {
            self.enraged = true;
            match self.state {
                BossState::Moving => self.set_state(BossState::Angry, now),
                BossState::Stunned if self.resume_state == BossState::Moving => {
                    self.resume_state = BossState::Angry;
                }
                // Attacking returns to the (now angry) cruising state on its own
                _ => {}
            }
            return DamageOutcome::Enraged;
        }
        DamageOutcome::Damaged
    }

    /// Interrupt movement and attacks; returns false for dead bosses
    pub fn stun(&mut self, now: f64) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.resume_state = match self.state {
            BossState::Stunned => self.resume_state,
            BossState::Attacking => self.cruising_state(),
            other => other,
        };
        self.set_state(BossState::Stunned, now);
        self.stun_until = now + self.config.stun_duration as f64;
        self.blink_timer = 0.0;
        self.vel = Vec2::ZERO;
        true
    }

    /// Push the boss by `offset`, staying inside its movement region
    pub fn nudge(&mut self, offset: Vec2, bounds: &Aabb) {
        let region = boss_region(bounds, self.kind, self.size);
        self.pos = region.closest_point(self.pos + offset);
    }
}

/// Area a boss center may occupy
pub fn boss_region(bounds: &Aabb, kind: BossKind, size: Vec2) -> Aabb {
    let half = size * 0.5 + Vec2::splat(10.0);
    let area = if kind.uses_perimeter_paddle() {
        bounds.expand(-(PERIMETER_INSET + 120.0))
    } else {
        Aabb::new(
            bounds.min + Vec2::new(0.0, 20.0),
            Vec2::new(bounds.max.x, bounds.min.y + bounds.height() * 0.5),
        )
    };
    let min = area.min + half;
    let max = area.max - half;
    // A region smaller than the boss collapses to its center line
    Aabb::new(min.min(area.center()), max.max(area.center()))
}

/// Waypoints for one run of a pattern
pub fn generate_waypoints<R: Rng + ?Sized>(
    pattern: MovementPattern,
    region: &Aabb,
    target_x: f32,
    rng: &mut R,
) -> Vec<Waypoint> {
    let (l, r, t, b) = (region.min.x, region.max.x, region.min.y, region.max.y);
    let (w, h) = (region.width(), region.height());
    let c = region.center();

    match pattern {
        MovementPattern::HorizontalSweep => {
            let y = t + h * 0.2;
            vec![
                Waypoint::at(l, y).with(WaypointAction::Shoot),
                Waypoint::at(r, y).with(WaypointAction::Shoot),
                Waypoint::at(c.x, y),
            ]
        }
        MovementPattern::ZigzagDescent => {
            let mut points: Vec<Waypoint> = (0..6)
                .map(|i| {
                    let x = if i % 2 == 0 { l } else { r };
                    Waypoint::at(x, t + h * i as f32 / 5.0).with(WaypointAction::Shoot)
                })
                .collect();
            points.push(Waypoint::at(c.x, t));
            points
        }
        MovementPattern::CornerDarts => {
            let corners = [Vec2::new(l, t), Vec2::new(r, t), Vec2::new(r, b), Vec2::new(l, b)];
            sample_without_replacement(&corners, corners.len(), rng)
                .into_iter()
                .map(|p| Waypoint::at(p.x, p.y).with(WaypointAction::Shoot))
                .collect()
        }
        MovementPattern::CenterBob => {
            let up = c.y - h * 0.25;
            let down = c.y + h * 0.25;
            vec![
                Waypoint::at(c.x, up),
                Waypoint::at(c.x, down).with(WaypointAction::Drop),
                Waypoint::at(c.x, up),
                Waypoint::at(c.x, down).with(WaypointAction::Drop),
                Waypoint::at(c.x, c.y),
            ]
        }
        MovementPattern::SpiralOrbit => {
            let span = w.min(h);
            (0..12)
                .map(|k| {
                    let f = k as f32 / 11.0;
                    let radius = span * (0.45 - 0.3 * f);
                    let p = c + direction_from_angle(k as f32 * TAU / 8.0) * radius;
                    let wp = Waypoint::at(p.x, p.y);
                    if k % 4 == 3 { wp.with(WaypointAction::Shoot) } else { wp }
                })
                .collect()
        }
        MovementPattern::WaveSweep => (0..10)
            .map(|i| {
                let x = l + w * i as f32 / 9.0;
                let y = c.y + h * 0.35 * (i as f32 * std::f32::consts::PI / 2.5).sin();
                let wp = Waypoint::at(x, y);
                if i % 3 == 2 { wp.with(WaypointAction::Shoot) } else { wp }
            })
            .collect(),
        MovementPattern::TelegraphedDive => {
            let x = target_x.clamp(l, r);
            vec![
                Waypoint::at(x, t).with(WaypointAction::Charge),
                Waypoint::at(x, b).with(WaypointAction::Drop),
                Waypoint::at(x, t),
            ]
        }
        MovementPattern::PatrolLanes => [0.1, 0.5, 0.9]
            .iter()
            .enumerate()
            .flat_map(|(i, f)| {
                let y = t + h * f;
                let (from, to) = if i % 2 == 0 { (l, r) } else { (r, l) };
                [Waypoint::at(from, y), Waypoint::at(to, y).with(WaypointAction::Shoot)]
            })
            .collect(),
        MovementPattern::RandomWaypoints => {
            let mut points: Vec<Waypoint> = (0..5)
                .map(|_| Waypoint::at(l + rng.random::<f32>() * w, t + rng.random::<f32>() * h))
                .collect();
            if let Some(last) = points.last_mut() {
                last.action = Some(WaypointAction::Shoot);
            }
            points
        }
    }
}

fn start_pattern(boss: &mut Boss, world: &mut World) {
    let options: Vec<MovementPattern> = boss
        .config
        .patterns
        .iter()
        .copied()
        .filter(|&p| p != boss.pattern || boss.config.patterns.len() == 1)
        .collect();
    if !options.is_empty() {
        boss.pattern = options[world.rng.random_range(0..options.len())];
    }
    let region = boss_region(&world.bounds, boss.kind, boss.size);
    boss.waypoints = generate_waypoints(boss.pattern, &region, world.paddle.pos.x, &mut world.rng);
    boss.waypoint_index = 0;
    boss.pattern_started = world.time;
}

fn follow_waypoints(boss: &mut Boss, world: &mut World, dt: f32) {
    let now = world.time;
    if boss.waypoint_index >= boss.waypoints.len()
        || now - boss.pattern_started >= boss.config.pattern_duration as f64
    {
        start_pattern(boss, world);
    }
    let Some(waypoint) = boss.waypoints.get(boss.waypoint_index).copied() else {
        boss.vel = Vec2::ZERO;
        return;
    };

    let charge = if now < boss.charge_until { CHARGE_MULTIPLIER } else { 1.0 };
    let speed = boss.config.speed * boss.speed_multiplier() * charge;
    let to = waypoint.pos - boss.pos;
    let dist = to.length();
    let step = speed * dt;

    if dist <= step {
        boss.vel = if dt > 0.0 { to / dt } else { Vec2::ZERO };
        boss.pos = waypoint.pos;
        boss.waypoint_index += 1;
        if let Some(action) = waypoint.action {
            run_waypoint_action(boss, world, action);
        }
    } else {
        boss.vel = to / dist * speed;
        boss.pos += boss.vel * dt;
    }
}

fn run_waypoint_action(boss: &mut Boss, world: &mut World, action: WaypointAction) {
    match action {
        WaypointAction::Shoot => {
            spawn_attack(world, boss.id, boss.pos, AttackKind::Shot, 0.0, boss.config.projectile_speed)
        }
        WaypointAction::Drop => {
            spawn_attack(world, boss.id, boss.pos, AttackKind::Missile, 0.0, boss.config.projectile_speed)
        }
        WaypointAction::Charge => boss.charge_until = world.time + CHARGE_DURATION,
    }
}

fn maybe_attack(boss: &mut Boss, world: &mut World) {
    let now = world.time;
    let interval = (boss.config.attack_interval / boss.speed_multiplier()) as f64;
    if now - boss.last_attack < interval {
        return;
    }
    let Some(kind) = weighted_choice(boss.config.attacks, &mut world.rng) else {
        return;
    };
    boss.last_attack = now;

    if kind.is_telegraphed() {
        let fire_at = now + boss.config.telegraph_delay as f64;
        world.telegraphs.push(ScheduledAttack {
            boss_id: boss.id,
            kind,
            origin: boss.pos,
            fire_at,
        });
        boss.set_state(BossState::Attacking, now);
        boss.blink_timer = boss.config.telegraph_delay;
        boss.vel = Vec2::ZERO;
        world.push_event(GameEvent::AttackTelegraphed {
            boss: boss.id,
            kind,
            fire_at,
        });
    } else {
        fire(boss, world, kind);
    }
}

fn fire(boss: &mut Boss, world: &mut World, kind: AttackKind) {
    spawn_attack(world, boss.id, boss.pos, kind, boss.spiral_offset, boss.config.projectile_speed);
    if kind == AttackKind::Spiral {
        boss.spiral_offset = (boss.spiral_offset + SPIRAL_STEP) % TAU;
    }
    world.push_event(GameEvent::AttackFired { boss: boss.id, kind });
}

/// Spawn the projectiles of one attack
pub fn spawn_attack(
    world: &mut World,
    owner: u32,
    origin: Vec2,
    kind: AttackKind,
    spiral_offset: f32,
    speed: f32,
) {
    let aim = (world.paddle.pos - origin).normalize_or(Vec2::Y);
    // Lasers travel along the dominant axis toward the paddle
    let cardinal = if aim.x.abs() > aim.y.abs() {
        Vec2::new(aim.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, aim.y.signum())
    };

    let small = Vec2::splat(10.0);
    let shots: Vec<(Vec2, Vec2, u32, f32)> = match kind {
        AttackKind::Shot => vec![(aim * speed, Vec2::splat(8.0), 1, 6.0)],
        AttackKind::Laser => {
            let size = if cardinal.x != 0.0 {
                Vec2::new(120.0, 12.0)
            } else {
                Vec2::new(12.0, 120.0)
            };
            vec![(cardinal * speed * 1.8, size, 2, 4.0)]
        }
        AttackKind::Super => (0..12)
            .map(|i| (direction_from_angle(i as f32 * TAU / 12.0) * speed * 0.9, small, 1, 5.0))
            .collect(),
        AttackKind::Spiral => (0..6)
            .map(|i| {
                let angle = spiral_offset + i as f32 * TAU / 6.0;
                (direction_from_angle(angle) * speed * 0.8, small, 1, 5.0)
            })
            .collect(),
        AttackKind::Cross => [Vec2::X, Vec2::NEG_X, Vec2::Y, Vec2::NEG_Y]
            .into_iter()
            .map(|d| (d * speed, small, 1, 5.0))
            .collect(),
        AttackKind::Missile => vec![(Vec2::Y * speed * 0.6, Vec2::new(12.0, 20.0), 2, 6.0)],
        AttackKind::Homing => vec![(aim * speed * 0.8, small, 1, 5.0)],
    };

    for (vel, size, damage, life) in shots {
        let id = world.next_entity_id();
        world.projectiles.push(Projectile {
            id,
            kind,
            owner,
            pos: origin,
            vel,
            size,
            damage,
            life,
        });
    }
}

fn update_boss(boss: &mut Boss, world: &mut World, dt: f32) {
    let now = world.time;
    boss.hit_flash_timer = (boss.hit_flash_timer - dt).max(0.0);
    boss.blink_timer = (boss.blink_timer - dt).max(0.0);

    match boss.state {
        BossState::Dead => {
            boss.death_timer -= dt;
            boss.vel = Vec2::ZERO;
        }
        BossState::Idle => {
            boss.vel = Vec2::ZERO;
            if now - boss.state_entered >= boss.config.intro_duration as f64 {
                let next = boss.cruising_state();
                boss.set_state(next, now);
                start_pattern(boss, world);
            }
        }
        BossState::Stunned => {
            boss.vel = Vec2::ZERO;
            if now >= boss.stun_until {
                let resume = boss.resume_state;
                boss.set_state(resume, now);
            }
        }
        // Holds position while the telegraph plays
        BossState::Attacking => boss.vel = Vec2::ZERO,
        BossState::Moving | BossState::Angry => {
            follow_waypoints(boss, world, dt);
            maybe_attack(boss, world);
        }
    }
}

/// Advance every boss by one fixed step and drop finished death animations
pub fn update_bosses(world: &mut World, dt: f32) {
    let mut bosses = std::mem::take(&mut world.bosses);
    for boss in bosses.iter_mut() {
        update_boss(boss, world, dt);
    }
    bosses.retain(|b| {
        let finished = b.state == BossState::Dead && b.death_timer <= 0.0;
        if finished {
            log::info!("Boss {:?} (id {}) removed", b.kind, b.id);
        }
        !finished
    });
    bosses.append(&mut world.bosses);
    world.bosses = bosses;
}

/// Fire telegraphed attacks whose time has come
pub fn fire_scheduled_attacks(world: &mut World) {
    let now = world.time;
    let (due, pending): (Vec<ScheduledAttack>, Vec<ScheduledAttack>) =
        world.telegraphs.drain(..).partition(|a| a.fire_at <= now);
    world.telegraphs = pending;

    for attack in due {
        let Some(index) = world.boss_index(attack.boss_id) else {
            continue;
        };
        let (offset, speed) = {
            let boss = &world.bosses[index];
            if boss.state != BossState::Attacking {
                continue;
            }
            (boss.spiral_offset, boss.config.projectile_speed)
        };
        spawn_attack(world, attack.boss_id, attack.origin, attack.kind, offset, speed);

        let boss = &mut world.bosses[index];
        let next = boss.cruising_state();
        boss.set_state(next, now);
        boss.last_attack = now;
        world.push_event(GameEvent::AttackFired {
            boss: attack.boss_id,
            kind: attack.kind,
        });
    }
}

/// Move projectiles, steer homing ones and apply paddle hits
pub fn update_projectiles(world: &mut World, dt: f32) {
    let target = world.paddle.pos;
    let paddle_rect = world.paddle.rect();
    let bounds = world.bounds.expand(PROJECTILE_MARGIN);

    let mut damage = 0;
    world.projectiles.retain_mut(|p| {
        if p.kind == AttackKind::Homing {
            let heading = p.vel.y.atan2(p.vel.x);
            let wanted = (target - p.pos).y.atan2((target - p.pos).x);
            let max_turn = HOMING_TURN_RATE * dt;
            let turn = normalize_angle(wanted - heading).clamp(-max_turn, max_turn);
            p.vel = Vec2::from_angle(turn).rotate(p.vel);
        }
        p.pos += p.vel * dt;
        p.life -= dt;

        let rect = p.rect();
        if rect.intersects(&paddle_rect) {
            damage += p.damage;
            return false;
        }
        p.life > 0.0 && rect.intersects(&bounds)
    });

    if damage > 0 && world.paddle.invulnerable <= 0.0 {
        world.paddle.invulnerable = PADDLE_INVULNERABILITY;
        world.lives = world.lives.saturating_sub(damage);
        world.push_event(GameEvent::PaddleHit { damage });
        world.push_event(GameEvent::LifeLost { lives: world.lives });
    }
}

/// Stun every living boss and cancel their pending telegraphs
pub fn stun_bosses(world: &mut World) {
    let now = world.time;
    let mut stunned = Vec::new();
    for boss in world.bosses.iter_mut() {
        if boss.stun(now) {
            stunned.push(boss.id);
        }
    }
    world.telegraphs.retain(|t| !stunned.contains(&t.boss_id));
    for id in stunned {
        world.push_event(GameEvent::BossStunned { id });
    }
}

/// Award a defeated boss and spawn its children, if any
pub fn defeat_boss(world: &mut World, index: usize) {
    let (id, kind, pos, size, generation, config) = {
        let boss = &world.bosses[index];
        (boss.id, boss.kind, boss.pos, boss.size, boss.generation, boss.config)
    };

    let score = config.defeat_score + generation as u64 * config.resurrection_bonus;
    world.score += score;
    world.telegraphs.retain(|t| t.boss_id != id);
    world.pools.spawn_explosion(pos, size.max_element(), &mut world.rng);
    world.push_event(GameEvent::BossDefeated { id, kind, score });
    log::info!("Boss {:?} (id {}) defeated, +{} points", kind, id, score);

    if generation >= config.resurrection_count {
        return;
    }
    let mut children = Vec::with_capacity(2);
    for side in [-1.0_f32, 1.0] {
        let child_id = world.next_entity_id();
        let mut child = Boss::new(child_id, kind, pos, world.time, generation + 1, world.level);
        child.nudge(Vec2::new(side * size.x * 0.5, 0.0), &world.bounds);
        world.bosses.push(child);
        children.push(child_id);
    }
    world.push_event(GameEvent::BossResurrected { parent: id, children });
}

/// Strike a boss from the collision system
pub fn hit_boss(world: &mut World, index: usize, damage: f32, push: Vec2) {
    let now = world.time;
    let bounds = world.bounds;
    let (id, outcome, health) = {
        let boss = &mut world.bosses[index];
        let outcome = boss.take_damage(damage, now);
        if outcome != DamageOutcome::Killed && outcome != DamageOutcome::Ignored {
            boss.nudge(push, &bounds);
        }
        (boss.id, outcome, boss.health)
    };

    match outcome {
        DamageOutcome::Ignored => {}
        DamageOutcome::Damaged => {
            world.score += HIT_SCORE;
            world.push_event(GameEvent::BossDamaged { id, health });
        }
        DamageOutcome::Enraged => {
            world.score += HIT_SCORE;
            world.push_event(GameEvent::BossDamaged { id, health });
            world.push_event(GameEvent::BossEnraged { id });
            log::info!("Boss {} is enraged", id);
        }
        DamageOutcome::Killed => {
            world.score += HIT_SCORE;
            defeat_boss(world, index);
        }
    }
}
