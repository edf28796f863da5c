//! Level construction
//!
//! Regular levels are a wall of bricks that grows with the level number.
//! Every fifth level is a boss arena with a single row of cover bricks.

use glam::Vec2;
use rand::Rng;

use super::boss::{BossConfig, BossKind, boss_region};
use super::geometry::Aabb;
use super::powerup::assign_power_ups;
use super::state::{ActiveEffects, BrickKind, GamePhase, World};
use crate::consts::*;

/// A boss shows up on every level divisible by this
pub const BOSS_LEVEL_INTERVAL: u32 = 5;
const MAX_ROWS: u32 = 8;
/// Row of cover bricks in a boss arena
const ARENA_ROW_Y: f32 = 400.0;

/// Boss guarding `level`, if any (cycles through the kinds)
pub fn boss_for_level(level: u32) -> Option<BossKind> {
    if level == 0 || level % BOSS_LEVEL_INTERVAL != 0 {
        return None;
    }
    let index = (level / BOSS_LEVEL_INTERVAL - 1) as usize % BossKind::ALL.len();
    Some(BossKind::ALL[index])
}

/// Replace the world's contents with `level`
pub fn load_level(world: &mut World, level: u32) {
    world.level = level;
    world.bricks.clear();
    world.balls.clear();
    world.bosses.clear();
    world.projectiles.clear();
    world.telegraphs.clear();
    world.power_ups.clear();
    world.pools.release_all();
    world.effects = ActiveEffects::default();
    world.paddle.width = world.paddle.base_width;
    world.paddle.invulnerable = 0.0;

    let bounds = world.bounds;
    let boss = boss_for_level(level);
    match boss {
        Some(kind) if kind.uses_perimeter_paddle() => world.paddle.enter_perimeter(&bounds),
        _ => world.paddle.reset_linear(&bounds),
    }

    match boss {
        Some(kind) => build_boss_arena(world, kind),
        None => build_brick_wall(world),
    }

    world.grid.rebuild(&world.bricks);
    world.brick_layer_version += 1;

    let group = world.level_group();
    assign_power_ups(
        &mut world.bricks,
        &mut world.drop_history,
        &world.settings.power_ups,
        group,
        &mut world.rng,
    );

    world.spawn_ball_attached();
    world.phase = GamePhase::Serve;
    log::info!(
        "Level {} loaded: {} bricks, boss {:?}",
        level,
        world.bricks.len(),
        boss
    );
}

/// Left edge of a centered row of `BRICK_COLUMNS` bricks
fn row_left(bounds: &Aabb) -> f32 {
    let columns = BRICK_COLUMNS as f32;
    let total = columns * BRICK_WIDTH + (columns - 1.0) * BRICK_GAP;
    bounds.center().x - total / 2.0
}

fn brick_rect(left: f32, top: f32, col: u32, row: u32) -> Aabb {
    let x = left + col as f32 * (BRICK_WIDTH + BRICK_GAP);
    let y = top + row as f32 * (BRICK_HEIGHT + BRICK_GAP);
    Aabb::new(Vec2::new(x, y), Vec2::new(x + BRICK_WIDTH, y + BRICK_HEIGHT))
}

fn build_brick_wall(world: &mut World) {
    let level = world.level;
    let rows = (3 + level / 2).min(MAX_ROWS);
    let left = row_left(&world.bounds);
    // Every third level leaves a checkerboard of gaps
    let checkerboard = level % 3 == 2;

    for row in 0..rows {
        for col in 0..BRICK_COLUMNS {
            if checkerboard && (row + col) % 2 == 1 {
                continue;
            }
            let roll = world.rng.random_range(0..100u32);
            let kind = determine_brick_kind(level, row, roll);
            let id = world.add_brick(brick_rect(left, BRICK_TOP, col, row), kind);
            if kind == BrickKind::Metal {
                if let Some(index) = world.brick_index(id) {
                    world.bricks[index].hits = 2 + level / 8;
                }
            }
        }
    }
}

fn build_boss_arena(world: &mut World, kind: BossKind) {
    let left = row_left(&world.bounds);
    for col in (0..BRICK_COLUMNS).step_by(2) {
        world.add_brick(brick_rect(left, ARENA_ROW_Y, col, 0), BrickKind::Normal);
    }

    let region = boss_region(&world.bounds, kind, BossConfig::for_kind(kind).size);
    let pos = if kind.uses_perimeter_paddle() {
        region.center()
    } else {
        Vec2::new(region.center().x, region.min.y)
    };
    world.spawn_boss(kind, pos);
}

/// Brick kind by level progression
fn determine_brick_kind(level: u32, row: u32, roll: u32) -> BrickKind {
    // Opening levels are all normal bricks
    if level <= 1 {
        return BrickKind::Normal;
    }

    // Sparse indestructible bricks, never in the front row
    if level >= 4 && row > 0 && roll < 6 {
        return BrickKind::Indestructible;
    }

    let metal_chance = (10 + level * 4).min(40) + row * 2;
    if roll < metal_chance {
        return BrickKind::Metal;
    }
    BrickKind::Normal
}
