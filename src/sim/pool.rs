//! Bounded object pools for transient visual effects
//!
//! Bursts (a row of bricks exploding at once) would otherwise allocate and
//! free hundreds of records per second. A pool hands out slots from a free
//! list, grows lazily up to its capacity and then declines further requests.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use crate::direction_from_angle;
use crate::settings::PoolSettings;

/// Slot index into a [`Pool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PoolHandle(usize);

/// Polled per-pool counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub active: usize,
    pub pooled: usize,
}

/// Fixed-capacity pool of `T` records
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<T>,
    active: Vec<bool>,
    free: Vec<usize>,
    capacity: usize,
}

impl<T: Default> Pool<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            active: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Take a reset record, or `None` when every slot is in use
    pub fn acquire(&mut self) -> Option<PoolHandle> {
        if let Some(index) = self.free.pop() {
            self.active[index] = true;
            return Some(PoolHandle(index));
        }
        if self.slots.len() < self.capacity {
            self.slots.push(T::default());
            self.active.push(true);
            return Some(PoolHandle(self.slots.len() - 1));
        }
        None
    }

    /// Reset the record and return it to the free list
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        match self.active.get_mut(handle.0) {
            Some(active) if *active => {
                *active = false;
                self.slots[handle.0] = T::default();
                self.free.push(handle.0);
                true
            }
            _ => false,
        }
    }

    /// Return every active record (level reset)
    pub fn release_all(&mut self) {
        for index in 0..self.slots.len() {
            if self.active[index] {
                self.release(PoolHandle(index));
            }
        }
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        match self.active.get(handle.0) {
            Some(true) => self.slots.get(handle.0),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        match self.active.get(handle.0) {
            Some(true) => self.slots.get_mut(handle.0),
            _ => None,
        }
    }

    /// Active records in slot order
    pub fn iter_active(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(i, _)| self.active[*i])
            .map(|(i, item)| (PoolHandle(i), item))
    }

    /// Update active records in place, releasing those for which `keep` is false
    pub fn retain_active<F: FnMut(&mut T) -> bool>(&mut self, mut keep: F) {
        for index in 0..self.slots.len() {
            if self.active[index] && !keep(&mut self.slots[index]) {
                self.release(PoolHandle(index));
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            active: self.active_count(),
            pooled: self.pooled_count(),
        }
    }
}

/// An expanding ring left by a destroyed brick or boss hit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Explosion {
    pub pos: Vec2,
    pub radius: f32,
    pub max_radius: f32,
    /// 0-1, decreases over time
    pub life: f32,
}

/// A spark thrown out by an explosion
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// 0-1, decreases over time
    pub life: f32,
    pub size: f32,
}

/// Names of the effect pools, for stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PoolName {
    Explosion,
    Particle,
}

impl PoolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolName::Explosion => "explosion",
            PoolName::Particle => "particle",
        }
    }
}

/// Explosion lifetime in seconds
const EXPLOSION_DURATION: f32 = 0.35;
/// Particle lifetime in seconds
const PARTICLE_DURATION: f32 = 0.6;
const PARTICLES_PER_EXPLOSION: usize = 10;

/// All effect pools of a world
#[derive(Debug, Clone)]
pub struct EffectPools {
    pub explosions: Pool<Explosion>,
    pub particles: Pool<Particle>,
}

impl EffectPools {
    pub fn new(settings: &PoolSettings) -> Self {
        Self {
            explosions: Pool::with_capacity(settings.explosions),
            particles: Pool::with_capacity(settings.particles),
        }
    }

    /// Spawn an explosion with a particle burst. Declines silently when full.
    pub fn spawn_explosion<R: Rng>(&mut self, pos: Vec2, size: f32, rng: &mut R) -> bool {
        let Some(handle) = self.explosions.acquire() else {
            log::debug!("Explosion pool exhausted, skipping effect");
            return false;
        };
        if let Some(explosion) = self.explosions.get_mut(handle) {
            explosion.pos = pos;
            explosion.radius = size * 0.25;
            explosion.max_radius = size;
            explosion.life = 1.0;
        }

        for _ in 0..PARTICLES_PER_EXPLOSION {
            let Some(handle) = self.particles.acquire() else {
                break;
            };
            let angle = rng.random::<f32>() * std::f32::consts::TAU;
            let speed = 60.0 + rng.random::<f32>() * 140.0;
            if let Some(particle) = self.particles.get_mut(handle) {
                particle.pos = pos;
                particle.vel = direction_from_angle(angle) * speed;
                particle.life = 1.0;
                particle.size = 2.0 + rng.random::<f32>() * 3.0;
            }
        }
        true
    }

    /// Age effects and release the expired ones
    pub fn update(&mut self, dt: f32) {
        self.explosions.retain_active(|e| {
            e.life -= dt / EXPLOSION_DURATION;
            e.radius += (e.max_radius - e.radius) * (dt * 12.0).min(1.0);
            e.life > 0.0
        });
        self.particles.retain_active(|p| {
            p.pos += p.vel * dt;
            p.vel *= 0.96;
            p.life -= dt / PARTICLE_DURATION;
            p.life > 0.0
        });
    }

    pub fn release_all(&mut self) {
        self.explosions.release_all();
        self.particles.release_all();
    }

    pub fn stats(&self) -> Vec<(PoolName, PoolStats)> {
        vec![
            (PoolName::Explosion, self.explosions.stats()),
            (PoolName::Particle, self.particles.stats()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_acquire_respects_capacity() {
        let mut pool: Pool<Explosion> = Pool::with_capacity(2);
        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_none());
        assert_eq!(pool.stats(), PoolStats { active: 2, pooled: 0 });
    }

    #[test]
    fn test_release_resets_and_reuses() {
        let mut pool: Pool<Particle> = Pool::with_capacity(1);
        let h = pool.acquire().unwrap();
        pool.get_mut(h).unwrap().life = 0.7;
        assert!(pool.release(h));
        assert!(!pool.release(h));
        assert!(pool.get(h).is_none());
        assert_eq!(pool.stats(), PoolStats { active: 0, pooled: 1 });

        let again = pool.acquire().unwrap();
        assert_eq!(again, h);
        assert_eq!(pool.get(again), Some(&Particle::default()));
    }

    #[test]
    fn test_release_all_then_acquire_is_fresh() {
        let mut pool: Pool<Explosion> = Pool::with_capacity(4);
        for i in 0..4 {
            let h = pool.acquire().unwrap();
            let e = pool.get_mut(h).unwrap();
            e.pos = Vec2::new(i as f32, 3.0);
            e.life = 0.5;
            e.max_radius = 40.0;
        }
        pool.release_all();
        assert_eq!(pool.stats(), PoolStats { active: 0, pooled: 4 });

        for _ in 0..4 {
            let h = pool.acquire().unwrap();
            assert_eq!(pool.get(h), Some(&Explosion::default()));
        }
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_effects_expire() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut effects = EffectPools::new(&PoolSettings::default());
        assert!(effects.spawn_explosion(Vec2::new(50.0, 50.0), 40.0, &mut rng));
        assert_eq!(effects.explosions.active_count(), 1);
        assert_eq!(effects.particles.active_count(), PARTICLES_PER_EXPLOSION);

        for _ in 0..60 {
            effects.update(1.0 / 60.0);
        }
        assert_eq!(effects.explosions.active_count(), 0);
        assert_eq!(effects.particles.active_count(), 0);
    }

    #[test]
    fn test_full_pool_declines_effect() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut effects = EffectPools::new(&PoolSettings {
            explosions: 1,
            particles: 4,
        });
        assert!(effects.spawn_explosion(Vec2::ZERO, 20.0, &mut rng));
        assert!(!effects.spawn_explosion(Vec2::ZERO, 20.0, &mut rng));
        assert_eq!(effects.particles.active_count(), 4);
        let stats = effects.stats();
        assert_eq!(stats[0].0.as_str(), "explosion");
        assert_eq!(stats[0].1, PoolStats { active: 1, pooled: 0 });
    }
}
