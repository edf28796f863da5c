//! Narrow-phase collision tests for circles against rectangles
//!
//! The interesting part is the swept test: a moving circle against an AABB is
//! the same problem as a segment against the AABB grown by the radius with
//! rounded corners. The grown box is handled as four offset faces plus four
//! corner circles, and the earliest entry wins.

use glam::Vec2;

use super::geometry::Aabb;

/// Displacements shorter than this (squared, px²) are treated as standing still
const MIN_TRAVEL_SQ: f32 = 1e-12;

/// Result of a static overlap check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the rectangle
    pub point: Vec2,
    /// Surface normal at the contact (pointing toward the ball center)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Earliest contact of a moving circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweptHit {
    /// Fraction of the displacement travelled before touching, in [0, 1]
    pub toi: f32,
    /// Contact normal (pointing toward the ball center)
    pub normal: Vec2,
    /// True when the contact is on a rounded corner rather than a face
    pub corner: bool,
}

/// Closest-point overlap test between a resting circle and a rectangle
///
/// Corner contacts get the diagonal normal from the corner to the center. A
/// center inside the rectangle is pushed out through the nearest face.
pub fn circle_aabb_overlap(center: Vec2, radius: f32, rect: &Aabb) -> CollisionResult {
    if !center.is_finite() || !radius.is_finite() {
        return CollisionResult::miss();
    }

    let closest = rect.closest_point(center);
    let delta = center - closest;
    let dist_sq = delta.length_squared();

    if dist_sq >= radius * radius {
        return CollisionResult::miss();
    }

    if dist_sq > MIN_TRAVEL_SQ {
        let dist = dist_sq.sqrt();
        return CollisionResult {
            hit: true,
            point: closest,
            normal: delta / dist,
            penetration: radius - dist,
        };
    }

    // Center is inside the rectangle: leave through the shallowest face
    let exits = [
        (center.x - rect.min.x, Vec2::NEG_X),
        (rect.max.x - center.x, Vec2::X),
        (center.y - rect.min.y, Vec2::NEG_Y),
        (rect.max.y - center.y, Vec2::Y),
    ];
    let (depth, normal) = exits
        .into_iter()
        .fold(exits[0], |best, e| if e.0 < best.0 { e } else { best });

    CollisionResult {
        hit: true,
        point: center + normal * depth,
        normal,
        penetration: depth + radius,
    }
}

/// Earliest time of impact of a circle moving by `displacement` against `rect`
///
/// Returns `None` when the path never touches the rectangle, when the circle
/// already overlaps it (see [`circle_aabb_overlap`]), or when the inputs are
/// degenerate (zero or non-finite motion).
pub fn swept_circle_aabb(
    start: Vec2,
    displacement: Vec2,
    radius: f32,
    rect: &Aabb,
) -> Option<SweptHit> {
    if !start.is_finite() || !displacement.is_finite() || !rect.is_finite() {
        return None;
    }
    let travel_sq = displacement.length_squared();
    if travel_sq < MIN_TRAVEL_SQ {
        return None;
    }

    let mut best: Option<SweptHit> = None;
    let mut consider = |toi: f32, normal: Vec2, corner: bool| {
        if !toi.is_finite() || !(0.0..=1.0).contains(&toi) {
            return;
        }
        if best.is_none_or(|b| toi < b.toi) {
            best = Some(SweptHit { toi, normal, corner });
        }
    };

    let (p, d) = (start, displacement);

    // Faces of the grown box; the contact must land on the flat part
    if d.x > 0.0 {
        let t = (rect.min.x - radius - p.x) / d.x;
        let y = p.y + d.y * t;
        if y >= rect.min.y && y <= rect.max.y {
            consider(t, Vec2::NEG_X, false);
        }
    } else if d.x < 0.0 {
        let t = (rect.max.x + radius - p.x) / d.x;
        let y = p.y + d.y * t;
        if y >= rect.min.y && y <= rect.max.y {
            consider(t, Vec2::X, false);
        }
    }
    if d.y > 0.0 {
        let t = (rect.min.y - radius - p.y) / d.y;
        let x = p.x + d.x * t;
        if x >= rect.min.x && x <= rect.max.x {
            consider(t, Vec2::NEG_Y, false);
        }
    } else if d.y < 0.0 {
        let t = (rect.max.y + radius - p.y) / d.y;
        let x = p.x + d.x * t;
        if x >= rect.min.x && x <= rect.max.x {
            consider(t, Vec2::Y, false);
        }
    }

    // Rounded corners: segment against a circle of `radius` at each corner
    for corner in rect.corners() {
        let m = p - corner;
        let b = m.dot(d);
        let c = m.length_squared() - radius * radius;
        if c < 0.0 || b >= 0.0 {
            // Already touching this corner, or moving away from it
            continue;
        }
        let disc = b * b - travel_sq * c;
        if disc < 0.0 {
            continue;
        }
        let t = (-b - disc.sqrt()) / travel_sq;
        let contact = p + d * t;
        let outside_x = contact.x < rect.min.x || contact.x > rect.max.x;
        let outside_y = contact.y < rect.min.y || contact.y > rect.max.y;
        if !(outside_x && outside_y) {
            continue;
        }
        let normal = (contact - corner).normalize_or_zero();
        if normal == Vec2::ZERO {
            continue;
        }
        consider(t, normal, true);
    }

    best
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Paddle bounce with angle control
///
/// `offset` is where the ball struck along the paddle's `tangent`, from -1
/// (one end) to 1 (the other). The ball leaves along the face normal tilted
/// toward the struck end by up to `max_angle`, keeping its speed.
pub fn paddle_bounce(
    velocity: Vec2,
    face_normal: Vec2,
    tangent: Vec2,
    offset: f32,
    max_angle: f32,
) -> Vec2 {
    let speed = velocity.length();
    let angle = offset.clamp(-1.0, 1.0) * max_angle;
    let dir = face_normal * angle.cos() + tangent * angle.sin();
    dir.normalize_or_zero() * speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_1_SQRT_2;

    fn unit_box() -> Aabb {
        Aabb::new(Vec2::ZERO, Vec2::new(10.0, 10.0))
    }

    #[test]
    fn test_swept_face_hit() {
        // Moving up into the bottom face
        let hit = swept_circle_aabb(Vec2::new(5.0, 30.0), Vec2::new(0.0, -30.0), 5.0, &unit_box())
            .expect("should hit");
        assert!(!hit.corner);
        assert_eq!(hit.normal, Vec2::Y);
        // Touches when center reaches y = 15, i.e. after 15 of 30 px
        assert!((hit.toi - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_swept_corner_hit_uses_diagonal_normal() {
        let hit = swept_circle_aabb(
            Vec2::new(-20.0, -20.0),
            Vec2::new(30.0, 30.0),
            5.0,
            &unit_box(),
        )
        .expect("should hit corner");
        assert!(hit.corner);
        assert!((hit.normal.x + FRAC_1_SQRT_2).abs() < 1e-4);
        assert!((hit.normal.y + FRAC_1_SQRT_2).abs() < 1e-4);
        let expected = (20.0 * std::f32::consts::SQRT_2 - 5.0) / (30.0 * std::f32::consts::SQRT_2);
        assert!((hit.toi - expected).abs() < 1e-4);
    }

    #[test]
    fn test_swept_grazing_corner_misses() {
        // Passes diagonally past the top-left corner, outside the rounded region
        let hit = swept_circle_aabb(
            Vec2::new(-10.0, 0.0),
            Vec2::new(10.0, -10.0),
            5.0,
            &unit_box(),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_swept_moving_away_misses() {
        let hit = swept_circle_aabb(Vec2::new(5.0, 30.0), Vec2::new(0.0, 30.0), 5.0, &unit_box());
        assert!(hit.is_none());
    }

    #[test]
    fn test_swept_fast_segment_does_not_tunnel() {
        // Travels far past the box in a single step
        let hit = swept_circle_aabb(
            Vec2::new(5.0, 500.0),
            Vec2::new(0.0, -1000.0),
            2.0,
            &unit_box(),
        )
        .expect("thin box still hit");
        assert_eq!(hit.normal, Vec2::Y);
        assert!((hit.toi - 0.488).abs() < 1e-4);
    }

    #[test]
    fn test_swept_degenerate_inputs() {
        assert!(swept_circle_aabb(Vec2::new(5.0, 30.0), Vec2::ZERO, 5.0, &unit_box()).is_none());
        assert!(
            swept_circle_aabb(Vec2::new(f32::NAN, 30.0), Vec2::new(0.0, -30.0), 5.0, &unit_box())
                .is_none()
        );
        assert!(
            swept_circle_aabb(Vec2::new(5.0, 30.0), Vec2::new(0.0, f32::INFINITY), 5.0, &unit_box())
                .is_none()
        );
    }

    #[test]
    fn test_overlap_corner_normal() {
        let result = circle_aabb_overlap(Vec2::new(-3.0, -3.0), 5.0, &unit_box());
        assert!(result.hit);
        assert_eq!(result.point, Vec2::ZERO);
        assert!((result.normal.x + FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((result.normal.y + FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn test_overlap_center_inside_uses_nearest_face() {
        let result = circle_aabb_overlap(Vec2::new(9.0, 5.0), 2.0, &unit_box());
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::X);
        assert!((result.penetration - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_overlap_miss() {
        let result = circle_aabb_overlap(Vec2::new(20.0, 5.0), 5.0, &unit_box());
        assert!(!result.hit);
    }

    #[test]
    fn test_reflect_velocity_horizontal_surface() {
        let reflected = reflect_velocity(Vec2::new(120.0, -300.0), Vec2::Y);
        assert!((reflected.x - 120.0).abs() < 1e-4);
        assert!((reflected.y - 300.0).abs() < 1e-4);
    }

    #[test]
    fn test_paddle_bounce_angles() {
        let v = Vec2::new(0.0, 400.0);
        let center = paddle_bounce(v, Vec2::NEG_Y, Vec2::X, 0.0, 1.0);
        assert!(center.x.abs() < 1e-4);
        assert!((center.y + 400.0).abs() < 1e-3);

        let edge = paddle_bounce(v, Vec2::NEG_Y, Vec2::X, 1.0, std::f32::consts::FRAC_PI_3);
        assert!(edge.x > 0.0);
        assert!(edge.y < 0.0);
        assert!((edge.length() - 400.0).abs() < 1e-2);
        assert!((edge.x.atan2(-edge.y) - std::f32::consts::FRAC_PI_3).abs() < 1e-4);
    }
}
