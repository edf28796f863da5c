//! Broad-phase grid over bricks
//!
//! Bricks only move when a level is built, so the grid is rebuilt on layout
//! change and otherwise only loses entries as bricks are destroyed. Queries
//! may return false positives (the narrow phase filters them) but never miss
//! a brick overlapping the query region.

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::geometry::Aabb;
use super::state::Brick;

/// Polled grid statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpatialStats {
    pub cell_count: usize,
    pub object_count: usize,
    pub avg_per_cell: f32,
    /// Incremented on every rebuild
    pub version: u64,
}

/// Uniform grid keyed by integer cell coordinates
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: FxHashMap<(i32, i32), Vec<u32>>,
    object_count: usize,
    version: u64,
    dirty: bool,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: FxHashMap::default(),
            object_count: 0,
            version: 0,
            dirty: false,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.object_count = 0;
    }

    fn cell_coord(&self, v: f32) -> i32 {
        (v / self.cell_size).floor() as i32
    }

    /// Inclusive cell range covered by a box
    fn cell_range(&self, aabb: &Aabb) -> (i32, i32, i32, i32) {
        (
            self.cell_coord(aabb.min.x),
            self.cell_coord(aabb.min.y),
            self.cell_coord(aabb.max.x),
            self.cell_coord(aabb.max.y),
        )
    }

    /// Place `id` in every cell its box overlaps
    pub fn insert(&mut self, id: u32, aabb: &Aabb) {
        if !aabb.is_finite() {
            return;
        }
        let (x0, y0, x1, y1) = self.cell_range(aabb);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(id);
            }
        }
        self.object_count += 1;
    }

    /// Drop `id` from the cells of `aabb` (the box it was inserted with)
    pub fn remove(&mut self, id: u32, aabb: &Aabb) {
        if !aabb.is_finite() {
            return;
        }
        let (x0, y0, x1, y1) = self.cell_range(aabb);
        let mut found = false;
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(ids) = self.cells.get_mut(&(cx, cy)) {
                    let before = ids.len();
                    ids.retain(|&other| other != id);
                    found |= ids.len() != before;
                    if ids.is_empty() {
                        self.cells.remove(&(cx, cy));
                    }
                }
            }
        }
        if found {
            self.object_count = self.object_count.saturating_sub(1);
        }
    }

    /// Ids whose cells intersect `aabb`, sorted and deduplicated
    pub fn query(&self, aabb: &Aabb) -> Vec<u32> {
        if !aabb.is_finite() {
            return Vec::new();
        }
        let (x0, y0, x1, y1) = self.cell_range(aabb);
        let mut result = Vec::new();
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(ids) = self.cells.get(&(cx, cy)) {
                    result.extend_from_slice(ids);
                }
            }
        }
        result.sort_unstable();
        result.dedup();
        result
    }

    /// Clear and re-insert every visible brick
    pub fn rebuild(&mut self, bricks: &[Brick]) {
        self.clear();
        for brick in bricks.iter().filter(|b| b.visible) {
            self.insert(brick.id, &brick.rect);
        }
        self.version += 1;
        self.dirty = false;
        log::debug!(
            "Spatial grid rebuilt: {} bricks in {} cells",
            self.object_count,
            self.cells.len()
        );
    }

    /// Request a rebuild at the start of the next step
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn stats(&self) -> SpatialStats {
        let cell_count = self.cells.len();
        let entries: usize = self.cells.values().map(Vec::len).sum();
        SpatialStats {
            cell_count,
            object_count: self.object_count,
            avg_per_cell: if cell_count == 0 {
                0.0
            } else {
                entries as f32 / cell_count as f32
            },
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::BrickKind;
    use glam::Vec2;

    fn brick(id: u32, x: f32, y: f32) -> Brick {
        Brick::new(
            id,
            Aabb::new(Vec2::new(x, y), Vec2::new(x + 64.0, y + 24.0)),
            BrickKind::Normal,
        )
    }

    #[test]
    fn test_insert_spans_overlapped_cells() {
        let mut grid = SpatialGrid::new(64.0);
        // Straddles two columns and one row
        grid.insert(7, &Aabb::new(Vec2::new(40.0, 10.0), Vec2::new(100.0, 30.0)));
        let stats = grid.stats();
        assert_eq!(stats.cell_count, 2);
        assert_eq!(stats.object_count, 1);
        assert!((stats.avg_per_cell - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_query_dedups_and_sorts() {
        let mut grid = SpatialGrid::new(32.0);
        grid.insert(5, &Aabb::new(Vec2::ZERO, Vec2::new(100.0, 100.0)));
        grid.insert(2, &Aabb::new(Vec2::new(10.0, 10.0), Vec2::new(20.0, 20.0)));
        let ids = grid.query(&Aabb::new(Vec2::ZERO, Vec2::new(90.0, 90.0)));
        assert_eq!(ids, vec![2, 5]);
    }

    #[test]
    fn test_query_ignores_insertion_order() {
        let boxes = [
            (3, Aabb::new(Vec2::new(-90.0, -40.0), Vec2::new(-10.0, 10.0))),
            (1, Aabb::new(Vec2::new(-20.0, 0.0), Vec2::new(70.0, 30.0))),
            (8, Aabb::new(Vec2::new(60.0, -70.0), Vec2::new(130.0, 5.0))),
        ];
        let mut forward = SpatialGrid::new(32.0);
        let mut backward = SpatialGrid::new(32.0);
        for (id, rect) in &boxes {
            forward.insert(*id, rect);
        }
        for (id, rect) in boxes.iter().rev() {
            backward.insert(*id, rect);
        }

        let region = Aabb::new(Vec2::new(-100.0, -80.0), Vec2::new(140.0, 40.0));
        assert_eq!(forward.query(&region), vec![1, 3, 8]);
        assert_eq!(forward.query(&region), backward.query(&region));
        assert_eq!(forward.stats().cell_count, backward.stats().cell_count);
    }

    #[test]
    fn test_query_has_no_false_negatives() {
        let bricks: Vec<Brick> = (0..20)
            .map(|i| brick(i, (i % 5) as f32 * 68.0, (i / 5) as f32 * 28.0))
            .collect();
        let mut grid = SpatialGrid::new(64.0);
        grid.rebuild(&bricks);

        let region = Aabb::new(Vec2::new(50.0, 20.0), Vec2::new(150.0, 60.0));
        let found = grid.query(&region);
        for b in bricks.iter().filter(|b| b.rect.intersects(&region)) {
            assert!(found.contains(&b.id), "brick {} missing", b.id);
        }
    }

    #[test]
    fn test_rebuild_skips_invisible_and_bumps_version() {
        let mut bricks = vec![brick(1, 0.0, 0.0), brick(2, 100.0, 0.0)];
        bricks[1].visible = false;
        let mut grid = SpatialGrid::new(64.0);
        grid.mark_dirty();
        grid.rebuild(&bricks);
        assert!(!grid.is_dirty());
        assert_eq!(grid.stats().object_count, 1);
        assert_eq!(grid.stats().version, 1);
        assert!(grid.query(&bricks[1].rect).is_empty());
    }

    #[test]
    fn test_remove() {
        let b = brick(3, 10.0, 10.0);
        let mut grid = SpatialGrid::new(16.0);
        grid.insert(b.id, &b.rect);
        grid.remove(b.id, &b.rect);
        assert_eq!(grid.stats().object_count, 0);
        assert_eq!(grid.stats().cell_count, 0);
        assert!(grid.query(&b.rect).is_empty());
    }
}
