//! Continuous collision for balls
//!
//! Each free ball consumes its fixed step in substeps. A substep finds the
//! earliest time of impact against every candidate collider, moves the ball
//! there, responds, and spends the remaining time on the next substep. Fast
//! balls therefore cannot skip over thin bricks.

use std::collections::VecDeque;

use glam::Vec2;
use serde::Serialize;

use super::boss::hit_boss;
use super::collision::{circle_aabb_overlap, paddle_bounce, reflect_velocity, swept_circle_aabb};
use super::geometry::Aabb;
use super::state::{Ball, BrickHit, CollisionCounters, GameEvent, PaddleMode, World};
use crate::consts::*;
use crate::settings::CcdSettings;

/// Walls extend this far outside the playfield
const WALL_THICKNESS: f32 = 1000.0;
/// Face contacts whose normal is this close to the paddle normal get angle control
const FACE_ALIGNMENT: f32 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum WallSide {
    Left,
    Top,
    Right,
}

/// What a ball struck; the derived order breaks ties between equal TOIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ColliderId {
    Wall(WallSide),
    Brick(u32),
    Paddle,
    Boss(u32),
    Projectile(u32),
}

impl ColliderId {
    /// Colliders that never move during a step
    pub fn is_static(&self) -> bool {
        matches!(self, ColliderId::Wall(_) | ColliderId::Brick(_))
    }
}

/// One resolved contact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionRecord {
    pub ball_id: u32,
    pub collider: ColliderId,
    /// Simulation time of contact (seconds)
    pub time: f64,
    pub substep: u32,
    pub toi: f32,
    pub before_pos: Vec2,
    pub before_vel: Vec2,
    pub after_pos: Vec2,
    pub after_vel: Vec2,
    pub point: Vec2,
    pub normal: Vec2,
    pub corner: bool,
    /// Repeat contact whose gameplay effect was suppressed
    pub duplicate: bool,
}

/// Bounded ring buffer of recent contacts
#[derive(Debug, Clone)]
pub struct CollisionHistory {
    records: VecDeque<CollisionRecord>,
    capacity: usize,
}

impl CollisionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: CollisionRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Oldest first
    pub fn records(&self) -> Vec<CollisionRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.records)
    }
}

/// A collider as seen at the start of the current substep
#[derive(Debug, Clone, Copy)]
struct Candidate {
    id: ColliderId,
    rect: Aabb,
    vel: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct Impact {
    id: ColliderId,
    toi: f32,
    normal: Vec2,
    penetration: f32,
    point: Vec2,
    corner: bool,
    collider_vel: Vec2,
    collider_center: Vec2,
}

fn walls(bounds: &Aabb) -> [(WallSide, Aabb); 3] {
    let t = WALL_THICKNESS;
    let (min, max) = (bounds.min, bounds.max);
    [
        (
            WallSide::Left,
            Aabb::new(Vec2::new(min.x - t, min.y - t), Vec2::new(min.x, max.y + t)),
        ),
        (
            WallSide::Top,
            Aabb::new(Vec2::new(min.x - t, min.y - t), Vec2::new(max.x + t, min.y)),
        ),
        (
            WallSide::Right,
            Aabb::new(Vec2::new(max.x, min.y - t), Vec2::new(max.x + t, max.y + t)),
        ),
    ]
}

/// Colliders the ball could reach in `remaining` seconds, in `ColliderId` order
///
/// Moving colliders already sit at their end-of-step pose, so they are
/// rewound by the `remaining` time to where they are right now.
fn gather_candidates(world: &World, ball: &Ball, remaining: f32, settings: &CcdSettings) -> Vec<Candidate> {
    let rewind = remaining;
    let disp = ball.vel * remaining;
    let swept = Aabb::around_circle(ball.pos, ball.radius)
        .union(&Aabb::around_circle(ball.pos + disp, ball.radius))
        .expand(1.0);

    let mut out = Vec::new();
    if world.paddle.mode == PaddleMode::Linear {
        for (side, rect) in walls(&world.bounds) {
            out.push(Candidate {
                id: ColliderId::Wall(side),
                rect,
                vel: Vec2::ZERO,
            });
        }
    }

    for id in world.grid.query(&swept) {
        let Some(index) = world.brick_index(id) else {
            continue;
        };
        let brick = &world.bricks[index];
        if brick.visible {
            out.push(Candidate {
                id: ColliderId::Brick(id),
                rect: brick.rect,
                vel: Vec2::ZERO,
            });
        }
    }

    let paddle = &world.paddle;
    out.push(Candidate {
        id: ColliderId::Paddle,
        rect: paddle.rect().translate(-paddle.vel * rewind),
        vel: paddle.vel,
    });

    for boss in world.bosses.iter().filter(|b| b.is_alive()) {
        out.push(Candidate {
            id: ColliderId::Boss(boss.id),
            rect: boss.rect().translate(-boss.vel * rewind),
            vel: boss.vel,
        });
    }

    if settings.balls_hit_projectiles {
        for p in &world.projectiles {
            out.push(Candidate {
                id: ColliderId::Projectile(p.id),
                rect: p.rect().translate(-p.vel * rewind),
                vel: p.vel,
            });
        }
    }

    out.sort_by_key(|c| c.id);
    out
}

/// Earliest contact among the candidates; ties keep the lower `ColliderId`
fn earliest_impact(
    ball: &Ball,
    candidates: &[Candidate],
    remaining: f32,
    counters: &mut CollisionCounters,
) -> Option<Impact> {
    let mut best: Option<Impact> = None;

    for c in candidates {
        let rel_vel = ball.vel - c.vel;
        let overlap = circle_aabb_overlap(ball.pos, ball.radius, &c.rect);

        let impact = if overlap.hit {
            // Resting contacts that are already separating are left alone
            if rel_vel.dot(overlap.normal) >= 0.0 {
                continue;
            }
            Impact {
                id: c.id,
                toi: 0.0,
                normal: overlap.normal,
                penetration: overlap.penetration,
                point: overlap.point,
                corner: false,
                collider_vel: c.vel,
                collider_center: c.rect.center(),
            }
        } else {
            let Some(hit) = swept_circle_aabb(ball.pos, rel_vel * remaining, ball.radius, &c.rect)
            else {
                continue;
            };
            if !hit.toi.is_finite() || hit.toi < 0.0 {
                counters.skipped_degenerate += 1;
                continue;
            }
            let center = ball.pos + ball.vel * remaining * hit.toi;
            Impact {
                id: c.id,
                toi: hit.toi,
                normal: hit.normal,
                penetration: 0.0,
                point: center - hit.normal * ball.radius,
                corner: hit.corner,
                collider_vel: c.vel,
                collider_center: c.rect.center() + c.vel * remaining * hit.toi,
            }
        };

        if best.as_ref().is_none_or(|b| impact.toi < b.toi) {
            best = Some(impact);
        }
    }
    best
}

/// Reflect in the collider's frame so a moving surface carries the ball
fn bounce_off_moving(vel: Vec2, normal: Vec2, surface_vel: Vec2) -> Vec2 {
    let rel = vel - surface_vel;
    if rel.dot(normal) >= 0.0 {
        return vel;
    }
    let out = reflect_velocity(rel, normal) + surface_vel;
    out.clamp_length_max(BALL_MAX_SPEED.max(vel.length()))
}

/// Apply the contact; returns false when the ball passes through
fn respond(world: &mut World, ball: &mut Ball, impact: &Impact, duplicate: bool, settings: &CcdSettings) -> bool {
    let n = impact.normal;
    match impact.id {
        ColliderId::Wall(_) => {
            world.counters.walls += 1;
            ball.vel = reflect_velocity(ball.vel, n);
            true
        }
        ColliderId::Brick(id) => {
            world.counters.bricks += 1;
            let Some(index) = world.brick_index(id) else {
                return false;
            };
            if ball.is_fireball && world.bricks[index].kind.is_destructible() {
                if !duplicate {
                    world.destroy_brick(index);
                }
                return false;
            }
            ball.vel = reflect_velocity(ball.vel, n);
            if !duplicate {
                match world.bricks[index].hit() {
                    BrickHit::Destroyed => world.destroy_brick(index),
                    BrickHit::Damaged => world.push_event(GameEvent::BrickHit { id }),
                    BrickHit::Deflected => {}
                }
            }
            true
        }
        ColliderId::Paddle => {
            world.counters.paddle += 1;
            let paddle = &world.paddle;
            let face = paddle.face_normal();
            if settings.paddle_angle_control && n.dot(face) > FACE_ALIGNMENT {
                let tangent = paddle.tangent();
                let half = (paddle.length() / 2.0).max(1.0);
                let offset = (ball.pos - impact.collider_center).dot(tangent) / half;
                ball.vel = paddle_bounce(ball.vel, face, tangent, offset, MAX_BOUNCE_ANGLE);
            } else {
                ball.vel = bounce_off_moving(ball.vel, n, impact.collider_vel);
            }
            true
        }
        ColliderId::Boss(id) => {
            world.counters.bosses += 1;
            ball.vel = bounce_off_moving(ball.vel, n, impact.collider_vel);
            if let Some(index) = world.boss_index(id) {
                let damage = if ball.is_fireball { 2.0 } else { 1.0 };
                hit_boss(world, index, damage, -n * settings.boss_knockback);
            }
            true
        }
        ColliderId::Projectile(id) => {
            world.counters.projectiles += 1;
            world.projectiles.retain(|p| p.id != id);
            false
        }
    }
}

fn step_ball(world: &mut World, ball: &mut Ball, dt: f32, settings: &CcdSettings) {
    if !ball.pos.is_finite() || !ball.vel.is_finite() || ball.vel == Vec2::ZERO {
        world.counters.skipped_degenerate += 1;
        return;
    }

    let step_start = world.time - dt as f64;
    let mut elapsed = 0.0_f32;
    let mut substep = 0;

    while elapsed < dt {
        if substep >= settings.max_substeps {
            world.counters.substep_limit_hits += 1;
            log::debug!(
                "Ball {} hit the substep limit ({}) with {:.5}s left",
                ball.id,
                settings.max_substeps,
                dt - elapsed
            );
            return;
        }

        let remaining = dt - elapsed;
        let candidates = gather_candidates(world, ball, remaining, settings);
        let Some(impact) = earliest_impact(ball, &candidates, remaining, &mut world.counters) else {
            ball.pos += ball.vel * remaining;
            return;
        };
        substep += 1;

        let before_pos = ball.pos;
        let before_vel = ball.vel;
        ball.pos += ball.vel * remaining * impact.toi;
        elapsed += remaining * impact.toi;

        let now = step_start + elapsed as f64;
        let duplicate = impact.id.is_static()
            && ball
                .last_hit
                .is_some_and(|(id, at)| id == impact.id && now - at <= settings.duplicate_window as f64);
        ball.last_hit = Some((impact.id, now));

        if respond(world, ball, &impact, duplicate, settings) {
            ball.pos += impact.normal * (impact.penetration + settings.skin);
        }

        world.counters.total += 1;
        if duplicate {
            world.counters.duplicates += 1;
        }
        if settings.record_history {
            world.history.push(CollisionRecord {
                ball_id: ball.id,
                collider: impact.id,
                time: now,
                substep,
                toi: impact.toi,
                before_pos,
                before_vel,
                after_pos: ball.pos,
                after_vel: ball.vel,
                point: impact.point,
                normal: impact.normal,
                corner: impact.corner,
                duplicate,
            });
        }
    }
}

/// Move every free ball through the fixed step `dt`
///
/// `world.time` must already point at the end of the step.
pub fn step_balls(world: &mut World, dt: f32) {
    if !dt.is_finite() || dt <= 0.0 {
        return;
    }
    let settings = world.settings.ccd.clone();
    let mut balls = std::mem::take(&mut world.balls);
    for ball in balls.iter_mut().filter(|b| b.is_free()) {
        step_ball(world, ball, dt, &settings);
    }
    balls.append(&mut world.balls);
    world.balls = balls;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SimSettings;
    use crate::sim::boss::{AttackKind, BossKind};
    use crate::sim::state::{BrickKind, Projectile};
    use proptest::prelude::*;

    fn world() -> World {
        let mut world = World::new(5, SimSettings::default());
        world.time = SIM_DT as f64;
        world
    }

    fn add_ball(world: &mut World, pos: Vec2, vel: Vec2) {
        let id = world.next_entity_id();
        world.balls.push(Ball::free(id, pos, vel));
    }

    fn add_brick(world: &mut World, min: Vec2, max: Vec2, kind: BrickKind) -> u32 {
        let id = world.add_brick(Aabb::new(min, max), kind);
        world.grid.rebuild(&world.bricks);
        id
    }

    #[test]
    fn test_fast_ball_bounces_off_brick() {
        let mut world = world();
        let id = add_brick(
            &mut world,
            Vec2::new(90.0, 40.0),
            Vec2::new(160.0, 60.0),
            BrickKind::Normal,
        );
        let index = world.brick_index(id).unwrap();
        world.bricks[index].hits = 2;
        add_ball(&mut world, Vec2::new(100.0, 100.0), Vec2::new(0.0, -3000.0));

        step_balls(&mut world, SIM_DT);

        let ball = &world.balls[0];
        assert!(ball.vel.y > 0.0);
        assert!(ball.pos.y >= 60.0);
        assert_eq!(world.bricks[index].hits, 1);
        assert!(world.bricks[index].visible);
        assert_eq!(world.counters.bricks, 1);
        assert!(world.events().contains(&GameEvent::BrickHit { id }));
    }

    #[test]
    fn test_wall_reflection() {
        let mut world = world();
        add_ball(&mut world, Vec2::new(400.0, 20.0), Vec2::new(300.0, -1200.0));
        step_balls(&mut world, SIM_DT);
        let ball = &world.balls[0];
        assert!((ball.vel.x - 300.0).abs() < 1e-3);
        assert!((ball.vel.y - 1200.0).abs() < 1e-3);
        assert!(ball.pos.y >= BALL_RADIUS);
        assert_eq!(world.counters.walls, 1);
    }

    #[test]
    fn test_corner_hit_reflects_about_diagonal() {
        let mut world = world();
        add_brick(
            &mut world,
            Vec2::new(300.0, 100.0),
            Vec2::new(364.0, 124.0),
            BrickKind::Indestructible,
        );
        add_ball(&mut world, Vec2::new(400.0, 160.0), Vec2::new(-3000.0, -3000.0));
        step_balls(&mut world, SIM_DT);

        let ball = &world.balls[0];
        assert!(ball.vel.x > 0.0 && ball.vel.y > 0.0);
        assert!((ball.vel.x - ball.vel.y).abs() < 1.0);
        let record = &world.history.records()[0];
        assert!(record.corner);
        assert_eq!(record.collider, ColliderId::Brick(1));
    }

    #[test]
    fn test_paddle_offset_steers_ball() {
        let mut world = world();
        add_ball(&mut world, Vec2::new(440.0, 535.0), Vec2::new(0.0, 600.0));
        step_balls(&mut world, SIM_DT);
        let ball = &world.balls[0];
        assert!(ball.vel.x > 0.0);
        assert!(ball.vel.y < 0.0);
        assert!((ball.speed() - 600.0).abs() < 1e-2);
        assert_eq!(world.counters.paddle, 1);
    }

    #[test]
    fn test_moving_paddle_uses_relative_motion() {
        let mut world = world();
        // Paddle travelled 15 px right this step, ending at 365..465
        world.paddle.pos = Vec2::new(415.0, PADDLE_Y);
        world.paddle.vel = Vec2::new(900.0, 0.0);
        add_ball(&mut world, Vec2::new(472.0, PADDLE_Y), Vec2::new(-60.0, 0.0));

        step_balls(&mut world, SIM_DT);
        let ball = &world.balls[0];
        assert!(ball.vel.x > 0.0);
        assert!(ball.pos.x - ball.radius >= world.paddle.rect().max.x - 1e-2);
        assert_eq!(world.counters.paddle, 1);
    }

    #[test]
    fn test_duplicate_contact_skips_damage() {
        let mut world = world();
        let id = add_brick(
            &mut world,
            Vec2::new(90.0, 40.0),
            Vec2::new(160.0, 60.0),
            BrickKind::Metal,
        );
        add_ball(&mut world, Vec2::new(100.0, 68.5), Vec2::new(0.0, -3000.0));
        world.balls[0].last_hit = Some((ColliderId::Brick(id), 0.0));

        step_balls(&mut world, SIM_DT);
        let index = world.brick_index(id).unwrap();
        assert_eq!(world.bricks[index].hits, 2);
        assert!(world.balls[0].vel.y > 0.0);
        assert_eq!(world.counters.duplicates, 1);
        assert!(world.history.records()[0].duplicate);
    }

    #[test]
    fn test_substep_limit_stops_ball() {
        let mut world = world();
        add_brick(
            &mut world,
            Vec2::new(0.0, 280.0),
            Vec2::new(100.0, 320.0),
            BrickKind::Indestructible,
        );
        add_brick(
            &mut world,
            Vec2::new(116.02, 280.0),
            Vec2::new(216.0, 320.0),
            BrickKind::Indestructible,
        );
        add_ball(&mut world, Vec2::new(108.01, 300.0), Vec2::new(3000.0, 0.0));

        step_balls(&mut world, SIM_DT);
        let ball = &world.balls[0];
        assert_eq!(world.counters.substep_limit_hits, 1);
        assert_eq!(world.history.len(), CCD_MAX_SUBSTEPS as usize);
        assert!(ball.pos.x > 100.0 && ball.pos.x < 116.02);
        assert_eq!(ball.pos.y, 300.0);
    }

    #[test]
    fn test_fireball_burns_through() {
        let mut world = world();
        let id = add_brick(
            &mut world,
            Vec2::new(90.0, 40.0),
            Vec2::new(160.0, 60.0),
            BrickKind::Metal,
        );
        add_ball(&mut world, Vec2::new(100.0, 100.0), Vec2::new(0.0, -3000.0));
        world.balls[0].is_fireball = true;

        step_balls(&mut world, SIM_DT);
        let index = world.brick_index(id).unwrap();
        assert!(!world.bricks[index].visible);
        assert!(world.balls[0].vel.y < 0.0);
        assert!(world.balls[0].pos.y < 100.0 - 19.0);
    }

    #[test]
    fn test_boss_hit_deals_damage() {
        let mut world = world();
        let id = world.spawn_boss(BossKind::Cube, Vec2::new(400.0, 150.0));
        add_ball(&mut world, Vec2::new(400.0, 200.0), Vec2::new(0.0, -3000.0));
        let before = world.bosses[0].health;

        step_balls(&mut world, SIM_DT);
        assert_eq!(world.bosses[0].health, before - 1.0);
        assert!(world.balls[0].vel.y > 0.0);
        assert_eq!(world.counters.bosses, 1);
        assert!(world.bosses[0].pos.y < 150.0);
        assert!(world
            .events()
            .iter()
            .any(|e| matches!(e, GameEvent::BossDamaged { id: b, .. } if *b == id)));
    }

    #[test]
    fn test_ball_destroys_projectile_when_enabled() {
        let mut world = world();
        world.settings.ccd.balls_hit_projectiles = true;
        world.projectiles.push(Projectile {
            id: 77,
            kind: AttackKind::Shot,
            owner: 0,
            pos: Vec2::new(400.0, 280.0),
            vel: Vec2::ZERO,
            size: Vec2::splat(8.0),
            damage: 1,
            life: 5.0,
        });
        add_ball(&mut world, Vec2::new(400.0, 300.0), Vec2::new(0.0, -1200.0));

        step_balls(&mut world, SIM_DT);
        assert!(world.projectiles.is_empty());
        assert!(world.balls[0].vel.y < 0.0);
        assert_eq!(world.counters.projectiles, 1);
    }

    #[test]
    fn test_degenerate_velocity_is_skipped() {
        let mut world = world();
        add_ball(&mut world, Vec2::new(400.0, 300.0), Vec2::new(f32::NAN, 10.0));
        add_ball(&mut world, Vec2::new(300.0, 300.0), Vec2::ZERO);
        step_balls(&mut world, SIM_DT);
        assert_eq!(world.counters.skipped_degenerate, 2);
        assert_eq!(world.balls[1].pos, Vec2::new(300.0, 300.0));
    }

    #[test]
    fn test_no_walls_in_perimeter_mode() {
        let mut world = world();
        let bounds = world.bounds;
        world.paddle.enter_perimeter(&bounds);
        add_ball(&mut world, Vec2::new(400.0, 10.0), Vec2::new(0.0, -1200.0));
        step_balls(&mut world, SIM_DT);
        assert!(world.balls[0].pos.y < 0.0);
        assert_eq!(world.counters.walls, 0);
    }

    #[test]
    fn test_history_is_bounded_and_exports() {
        let mut history = CollisionHistory::new(3);
        for i in 0..5 {
            history.push(CollisionRecord {
                ball_id: i,
                collider: ColliderId::Brick(i),
                time: i as f64,
                substep: 1,
                toi: 0.5,
                before_pos: Vec2::ZERO,
                before_vel: Vec2::ZERO,
                after_pos: Vec2::ZERO,
                after_vel: Vec2::ZERO,
                point: Vec2::ZERO,
                normal: Vec2::Y,
                corner: false,
                duplicate: false,
            });
        }
        let records = history.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].ball_id, 2);
        let json = history.to_json().unwrap();
        assert!(json.contains("Brick"));
    }

    #[test]
    fn test_seam_hit_resolves_lower_id_brick() {
        let mut world = world();
        // Added right to left so id order disagrees with x order
        let right = add_brick(
            &mut world,
            Vec2::new(200.0, 40.0),
            Vec2::new(264.0, 60.0),
            BrickKind::Metal,
        );
        let left = add_brick(
            &mut world,
            Vec2::new(136.0, 40.0),
            Vec2::new(200.0, 60.0),
            BrickKind::Metal,
        );
        assert!(right < left);
        add_ball(&mut world, Vec2::new(200.0, 100.0), Vec2::new(0.0, -3000.0));

        step_balls(&mut world, SIM_DT);

        let records = world.history.records();
        assert_eq!(records[0].collider, ColliderId::Brick(right));
        let right_index = world.brick_index(right).unwrap();
        let left_index = world.brick_index(left).unwrap();
        assert_eq!(world.bricks[right_index].hits, 1);
        assert_eq!(world.bricks[left_index].hits, 2);
        assert_eq!(world.counters.bricks, 1);
        assert!(world.balls[0].vel.y > 0.0);
    }

    #[test]
    fn test_collider_order() {
        assert!(ColliderId::Wall(WallSide::Right) < ColliderId::Brick(0));
        assert!(ColliderId::Brick(9) < ColliderId::Paddle);
        assert!(ColliderId::Paddle < ColliderId::Boss(0));
        assert!(ColliderId::Boss(3) < ColliderId::Projectile(1));
    }

    proptest! {
        #[test]
        fn prop_fast_ball_never_tunnels(
            x in 120.0f32..680.0,
            vx in -300.0f32..300.0,
            speed in 500.0f32..20_000.0,
        ) {
            let mut world = world();
            add_brick(
                &mut world,
                Vec2::new(100.0, 40.0),
                Vec2::new(700.0, 60.0),
                BrickKind::Indestructible,
            );
            add_ball(&mut world, Vec2::new(x, 300.0), Vec2::new(vx, -speed));

            step_balls(&mut world, SIM_DT);
            let ball = &world.balls[0];
            prop_assert!(ball.pos.y >= 60.0 + ball.radius - 1e-3, "ball at {:?}", ball.pos);
            prop_assert!(ball.pos.is_finite());
        }
    }
}
