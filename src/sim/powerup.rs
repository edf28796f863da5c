//! Power-up catalog, hidden assignment and effects
//!
//! Power-ups are hidden in bricks when a level is built. Which kind a brick
//! gets is a weighted draw whose weights shrink for kinds that dropped
//! recently, so a run doesn't see five multiballs in a row.

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::boss::stun_bosses;
use super::rng::{sample_without_replacement, weighted_choice};
use super::state::{Ball, Brick, GameEvent, World};
use crate::consts::*;
use crate::settings::PowerUpSettings;

/// Running weight multiplier applied to a kind each time it is assigned
const ASSIGN_DECAY: f32 = 0.85;
/// Seconds an expanded or shrunk paddle lasts
const PADDLE_SIZE_DURATION: f32 = 12.0;
const FIREBALL_DURATION: f32 = 8.0;
const SLOW_BALL_FACTOR: f32 = 0.7;
/// Angle (radians) between the split balls of a multiball
const MULTIBALL_SPREAD: f32 = 0.35;

/// Power-up kinds, in catalog order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    ExtraLife,
    MultiBall,
    ExpandPaddle,
    ShrinkPaddle,
    SlowBall,
    Fireball,
    Stun,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 7] = [
        PowerUpKind::ExtraLife,
        PowerUpKind::MultiBall,
        PowerUpKind::ExpandPaddle,
        PowerUpKind::ShrinkPaddle,
        PowerUpKind::SlowBall,
        PowerUpKind::Fireball,
        PowerUpKind::Stun,
    ];

    /// Weight before diminishing returns
    pub fn base_weight(&self) -> f32 {
        match self {
            PowerUpKind::ExtraLife => 0.5,
            PowerUpKind::MultiBall => 3.0,
            PowerUpKind::ExpandPaddle => 3.0,
            PowerUpKind::ShrinkPaddle => 1.5,
            PowerUpKind::SlowBall => 2.5,
            PowerUpKind::Fireball => 1.5,
            PowerUpKind::Stun => 2.0,
        }
    }
}

/// Group index of a level for the extra-life cap (levels are 1-based)
pub fn level_group(level: u32, group_size: u32) -> u32 {
    level.saturating_sub(1) / group_size.max(1)
}

/// Rolling record of recent drops
#[derive(Debug, Clone, Default)]
pub struct DropHistory {
    recent: VecDeque<PowerUpKind>,
    window: usize,
    /// Group in which an extra life was last collected
    extra_life_group: Option<u32>,
    /// An extra life was hidden in (or dropped from) a brick of the current level
    extra_life_in_level: bool,
}

impl DropHistory {
    pub fn new(window: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(window),
            window,
            extra_life_group: None,
            extra_life_in_level: false,
        }
    }

    pub fn record_drop(&mut self, kind: PowerUpKind) {
        if self.window == 0 {
            return;
        }
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(kind);
    }

    pub fn recent_count(&self, kind: PowerUpKind) -> usize {
        self.recent.iter().filter(|&&k| k == kind).count()
    }

    pub fn record_extra_life(&mut self, group: u32) {
        self.extra_life_group = Some(group);
    }

    pub fn extra_life_used_in(&self, group: u32) -> bool {
        self.extra_life_group == Some(group)
    }

    /// Forget per-level assignments when a new level is built
    pub fn begin_level(&mut self) {
        self.extra_life_in_level = false;
    }

    pub fn record_extra_life_assigned(&mut self) {
        self.extra_life_in_level = true;
    }

    pub fn extra_life_assigned(&self) -> bool {
        self.extra_life_in_level
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}

/// Running weights for one assignment pass
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    entries: Vec<(PowerUpKind, f32)>,
}

impl WeightTable {
    /// Effective weights for the current group, in catalog order
    pub fn from_history(history: &DropHistory, settings: &PowerUpSettings, group: u32) -> Self {
        let entries = PowerUpKind::ALL
            .iter()
            .map(|&kind| {
                let capped = history.extra_life_used_in(group) || history.extra_life_assigned();
                let weight = if kind == PowerUpKind::ExtraLife && capped {
                    0.0
                } else {
                    let recent = history.recent_count(kind) as f32;
                    kind.base_weight() / (1.0 + recent * settings.diminish_factor)
                };
                (kind, weight)
            })
            .collect();
        Self { entries }
    }

    pub fn weight(&self, kind: PowerUpKind) -> f32 {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0.0, |&(_, w)| w)
    }

    pub fn set_weight(&mut self, kind: PowerUpKind, weight: f32) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = weight;
        }
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<PowerUpKind> {
        weighted_choice(&self.entries, rng)
    }

    /// Draw a kind and apply the per-assignment adjustments
    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<PowerUpKind> {
        let kind = self.pick(rng)?;
        if kind == PowerUpKind::ExtraLife {
            self.set_weight(kind, 0.0);
        } else {
            let w = self.weight(kind);
            self.set_weight(kind, w * ASSIGN_DECAY);
        }
        Some(kind)
    }
}

/// Hide power-ups in `round(n * rate)` destructible bricks
///
/// Returns how many bricks received one. Previous assignments are cleared,
/// so this also starts a new level for the extra-life cap.
pub fn assign_power_ups<R: Rng + ?Sized>(
    bricks: &mut [Brick],
    history: &mut DropHistory,
    settings: &PowerUpSettings,
    group: u32,
    rng: &mut R,
) -> usize {
    history.begin_level();
    let mut eligible: Vec<u32> = Vec::new();
    for brick in bricks.iter_mut() {
        brick.power_up = None;
        if brick.counts_for_clear() {
            eligible.push(brick.id);
        }
    }
    eligible.sort_unstable();

    let count = (eligible.len() as f32 * settings.density.rate()).round() as usize;
    let chosen = sample_without_replacement(&eligible, count, rng);

    let mut table = WeightTable::from_history(history, settings, group);
    let mut assigned = 0;
    for id in chosen {
        let Some(kind) = table.draw(rng) else {
            break;
        };
        if let Ok(index) = bricks.binary_search_by_key(&id, |b| b.id) {
            bricks[index].power_up = Some(kind);
            assigned += 1;
            if kind == PowerUpKind::ExtraLife {
                history.record_extra_life_assigned();
            }
        }
    }
    log::debug!("Assigned {} power-ups to {} eligible bricks", assigned, eligible.len());
    assigned
}

/// Redraw kinds for bricks that still hide a power-up
///
/// Bricks already destroyed (or whose power-up was released) are left alone,
/// and so is a hidden extra life.
pub fn reassign_power_ups<R: Rng + ?Sized>(
    bricks: &mut [Brick],
    history: &mut DropHistory,
    settings: &PowerUpSettings,
    group: u32,
    rng: &mut R,
) -> usize {
    let mut table = WeightTable::from_history(history, settings, group);
    let mut changed = 0;
    for brick in bricks.iter_mut() {
        if !brick.visible || matches!(brick.power_up, None | Some(PowerUpKind::ExtraLife)) {
            continue;
        }
        brick.power_up = table.draw(rng);
        if brick.power_up == Some(PowerUpKind::ExtraLife) {
            history.record_extra_life_assigned();
        }
        changed += 1;
    }
    changed
}

/// Apply a collected power-up to the world
pub fn apply_power_up(world: &mut World, kind: PowerUpKind) {
    match kind {
        PowerUpKind::ExtraLife => {
            world.lives += 1;
            let group = world.level_group();
            world.drop_history.record_extra_life(group);
        }
        PowerUpKind::MultiBall => split_balls(world),
        PowerUpKind::ExpandPaddle => {
            world.paddle.width = world.paddle.base_width * 1.5;
            world.effects.paddle_size_timer = PADDLE_SIZE_DURATION;
        }
        PowerUpKind::ShrinkPaddle => {
            world.paddle.width = world.paddle.base_width * 0.65;
            world.effects.paddle_size_timer = PADDLE_SIZE_DURATION;
        }
        PowerUpKind::SlowBall => {
            for ball in world.balls.iter_mut().filter(|b| b.is_free()) {
                let speed = ball.speed();
                if speed > 0.0 {
                    let slowed = (speed * SLOW_BALL_FACTOR).max(BALL_MIN_SPEED.min(speed));
                    ball.vel = ball.vel / speed * slowed;
                }
            }
        }
        PowerUpKind::Fireball => world.effects.fireball_timer = FIREBALL_DURATION,
        PowerUpKind::Stun => stun_bosses(world),
    }
    world.push_event(GameEvent::PowerUpCollected { kind });

    let group = world.level_group();
    reassign_power_ups(
        &mut world.bricks,
        &mut world.drop_history,
        &world.settings.power_ups,
        group,
        &mut world.rng,
    );
}

/// Every free ball spawns two companions fanned out around it
fn split_balls(world: &mut World) {
    let sources: Vec<(Vec2, Vec2)> = world
        .balls
        .iter()
        .filter(|b| b.is_free())
        .map(|b| (b.pos, b.vel))
        .collect();

    for (pos, vel) in sources {
        for angle in [-MULTIBALL_SPREAD, MULTIBALL_SPREAD] {
            if world.balls.len() >= MAX_BALLS {
                return;
            }
            let id = world.next_entity_id();
            let rotated = Vec2::from_angle(angle).rotate(vel);
            world.balls.push(Ball::free(id, pos, rotated));
        }
    }
}

/// Move capsules, apply the ones the paddle catches and drop the missed ones
pub fn update_power_ups(world: &mut World, dt: f32) {
    let paddle_rect = world.paddle.rect();
    let bounds = world.bounds;
    let center = bounds.center();
    let perimeter = matches!(world.paddle.mode, super::state::PaddleMode::Perimeter { .. });

    let mut caught = Vec::new();
    world.power_ups.retain_mut(|p| {
        if perimeter {
            // Capsules drift outward toward the surrounding paddle
            let dir = (p.pos - center).normalize_or(Vec2::Y);
            p.vel = dir * POWERUP_FALL_SPEED;
        }
        p.pos += p.vel * dt;
        let rect = p.rect();
        if rect.intersects(&paddle_rect) {
            caught.push(p.kind);
            return false;
        }
        rect.intersects(&bounds)
    });

    for kind in caught {
        apply_power_up(world, kind);
    }
}
