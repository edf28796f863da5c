//! Fixed timestep simulation tick
//!
//! Core game step that advances the world deterministically.

use glam::Vec2;

use super::boss::{fire_scheduled_attacks, update_bosses, update_projectiles, BossState};
use super::ccd::step_balls;
use super::level::{boss_for_level, load_level};
use super::powerup::update_power_ups;
use super::state::{ActiveEffects, BallState, GameEvent, GamePhase, PaddleMode, World};
use crate::consts::*;

/// Bonus for clearing a level
const LEVEL_CLEAR_BONUS: u64 = 500;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer position in playfield coordinates (mouse/touch)
    pub paddle_target: Option<Vec2>,
    /// Keyboard steering, -1..1 along the paddle, used without a pointer target
    pub paddle_axis: f32,
    /// Launch ball (click/tap/space)
    pub launch: bool,
    /// Skip to next level (debug/testing)
    pub skip_level: bool,
    /// Idle/demo mode - autopilot plays the game
    pub idle_mode: bool,
}

/// Advance the world by one fixed timestep
pub fn tick(world: &mut World, input: &TickInput, dt: f32) {
    if world.phase == GamePhase::GameOver {
        return;
    }

    let mut input = input.clone();
    if input.idle_mode {
        autopilot(world, &mut input);
    }
    let input = &input;

    // Debug: skip to next level
    if input.skip_level {
        let next = world.level + 1;
        load_level(world, next);
        return;
    }

    world.time += dt as f64;
    world.tick_count += 1;

    if world.grid.is_dirty() {
        world.grid.rebuild(&world.bricks);
    }

    let bounds = world.bounds;
    world
        .paddle
        .steer(input.paddle_target, input.paddle_axis, dt, PADDLE_MAX_SPEED, &bounds);
    update_effect_timers(world, dt);

    match world.phase {
        GamePhase::Serve => {
            for ball in world.balls.iter_mut() {
                ball.update_attached(&world.paddle);
            }
            if input.launch {
                for ball in world.balls.iter_mut() {
                    ball.launch(&world.paddle, BALL_START_SPEED);
                }
                world.phase = GamePhase::Playing;
            }
        }
        GamePhase::Playing => {
            update_bosses(world, dt);
            fire_scheduled_attacks(world);
            update_projectiles(world, dt);

            let fireball = world.effects.fireball_timer > 0.0;
            for ball in world.balls.iter_mut() {
                ball.refresh_flags(fireball);
            }
            step_balls(world, dt);
            remove_lost_balls(world);
            update_power_ups(world, dt);

            if world.lives == 0 {
                game_over(world);
            } else if level_cleared(world) {
                let level = world.level;
                world.score += LEVEL_CLEAR_BONUS;
                world.push_event(GameEvent::LevelCleared { level });
                log::info!("Level {} cleared, score {}", level, world.score);
                load_level(world, level + 1);
            }
            world.normalize_order();
        }
        GamePhase::GameOver => {}
    }

    world.pools.update(dt);
}

/// Boss arenas end with the boss; other levels need every breakable brick gone
fn level_cleared(world: &World) -> bool {
    if !world.bosses.is_empty() {
        return false;
    }
    boss_for_level(world.level).is_some() || world.remaining_bricks() == 0
}

fn update_effect_timers(world: &mut World, dt: f32) {
    let effects = &mut world.effects;
    if effects.paddle_size_timer > 0.0 {
        effects.paddle_size_timer -= dt;
        if effects.paddle_size_timer <= 0.0 {
            effects.paddle_size_timer = 0.0;
            world.paddle.width = world.paddle.base_width;
        }
    }
    effects.fireball_timer = (effects.fireball_timer - dt).max(0.0);
    world.paddle.invulnerable = (world.paddle.invulnerable - dt).max(0.0);
}

/// Drop balls that left the playfield; losing the last one costs a life
fn remove_lost_balls(world: &mut World) {
    let bounds = world.bounds;
    let perimeter = matches!(world.paddle.mode, PaddleMode::Perimeter { .. });

    let mut lost = Vec::new();
    world.balls.retain(|b| {
        let out = if !b.pos.is_finite() {
            true
        } else if perimeter {
            // Every side is open when the paddle circles the field
            !bounds.expand(b.radius).contains_point(b.pos)
        } else {
            b.pos.y - b.radius > bounds.max.y
        };
        if out {
            lost.push(b.id);
        }
        !out
    });

    for id in &lost {
        world.push_event(GameEvent::BallLost { id: *id });
    }
    if world.balls.is_empty() && !lost.is_empty() {
        lose_life(world);
    }
}

fn lose_life(world: &mut World) {
    world.lives = world.lives.saturating_sub(1);
    world.push_event(GameEvent::LifeLost { lives: world.lives });
    if world.lives == 0 {
        return;
    }

    world.power_ups.clear();
    world.projectiles.clear();
    world.telegraphs.clear();
    let now = world.time;
    for boss in world.bosses.iter_mut() {
        if boss.state == BossState::Attacking {
            let next = boss.cruising_state();
            boss.set_state(next, now);
        }
    }
    world.effects = ActiveEffects::default();
    world.paddle.width = world.paddle.base_width;
    world.spawn_ball_attached();
    world.phase = GamePhase::Serve;
}

fn game_over(world: &mut World) {
    world.phase = GamePhase::GameOver;
    world.push_event(GameEvent::GameOver { score: world.score });
    log::info!("Game over on level {} with {} points", world.level, world.score);
}

/// Demo autopilot: launch immediately and chase the most urgent ball
fn autopilot(world: &World, input: &mut TickInput) {
    if world.phase == GamePhase::Serve {
        input.launch = true;
    }

    let paddle = &world.paddle;
    let normal = paddle.face_normal();
    // Most urgent: free ball heading toward the paddle and closest to it
    let target = world
        .balls
        .iter()
        .filter(|b| matches!(b.state, BallState::Free))
        .min_by(|a, b| {
            let da = a.pos.distance_squared(paddle.pos);
            let db = b.pos.distance_squared(paddle.pos);
            let incoming_a = a.vel.dot(normal) < 0.0;
            let incoming_b = b.vel.dot(normal) < 0.0;
            incoming_b
                .cmp(&incoming_a)
                .then(da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal))
        });

    if let Some(ball) = target {
        // Wander a little so the rally doesn't loop forever
        let time_factor = world.tick_count as f32 * 0.01;
        let offset = (time_factor.sin() * 0.3 + (time_factor * 0.7).sin() * 0.15) * paddle.width * 0.5;
        input.paddle_target = Some(ball.pos + paddle.tangent() * offset);
    }
}
