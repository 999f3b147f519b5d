//! CPU side of a particle generator: a fixed set of reusable particles.

use glam::{Vec2, Vec4};
use log::trace;

use super::rng::ParticleRng;
use crate::config::RenderConfig;

/// One particle. Dead when `life <= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    #[allow(missing_docs)]
    pub position: Vec2,
    #[allow(missing_docs)]
    pub velocity: Vec2,
    /// Per-axis spread factor applied to the velocity.
    pub disperse: Vec2,
    /// RGBA, alpha fades with life.
    pub color: Vec4,
    /// Degrees.
    pub rotation: f32,
    #[allow(missing_docs)]
    pub size: f32,
    #[allow(missing_docs)]
    pub life: f32,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            disperse: Vec2::ZERO,
            color: Vec4::ONE,
            rotation: 0.0,
            size: 0.0,
            life: 0.0,
        }
    }
}

impl Particle {
    /// Still counted and drawn.
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }
}

/// Parameters of one [`ParticlePool::update`] step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    /// Spawn point.
    pub position: Vec2,
    /// Emitter velocity, scaled by 10 for new particles.
    pub velocity: Vec2,
    /// Particles spawned this step.
    pub count: u32,
    /// Size of new particles; 0 selects the configured default.
    pub size: f32,
    /// Added to the spawn point.
    pub offset: Vec2,
    /// Life lost per second; 0 selects the configured default.
    pub decay: f32,
}

impl Default for Emission {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            count: 0,
            size: 0.0,
            offset: Vec2::ZERO,
            decay: 0.0,
        }
    }
}

/// Fixed-capacity particle storage. Slots are recycled, never reallocated.
#[derive(Debug, Clone)]
pub struct ParticlePool {
    particles: Vec<Particle>,
    last_used: usize,
    disperse: bool,
    rotate: bool,
    default_size: f32,
    default_decay: f32,
    rng: ParticleRng,
}

impl ParticlePool {
    /// `capacity` dead particles, dispersion and rotation enabled.
    pub fn new(capacity: usize, config: &RenderConfig) -> Self {
        Self::with_rng(capacity, config, ParticleRng::default())
    }

    /// Like [`new`](Self::new) with a fixed random seed.
    pub fn with_seed(capacity: usize, config: &RenderConfig, seed: u32) -> Self {
        Self::with_rng(capacity, config, ParticleRng::new(seed))
    }

    fn with_rng(capacity: usize, config: &RenderConfig, rng: ParticleRng) -> Self {
        Self {
            particles: vec![Particle::default(); capacity],
            last_used: 0,
            disperse: true,
            rotate: true,
            default_size: config.default_particle_size,
            default_decay: config.default_particle_decay,
            rng,
        }
    }

    #[allow(missing_docs)]
    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    /// Index of a dead particle, searching from the last one handed out
    /// and then wrapping around. When every particle is alive, slot 0 is
    /// reused.
    ///
    /// Always 0 for an empty pool; callers must check the capacity.
    pub fn first_unused_particle(&mut self) -> usize {
        let found = (self.last_used..self.particles.len())
            .chain(0..self.last_used.min(self.particles.len()))
            .find(|&i| !self.particles[i].is_alive());
        self.last_used = found.unwrap_or(0);
        self.last_used
    }

    /// Bring the particle at `index` back to life at `position` plus a
    /// small random jitter and `offset`.
    ///
    /// Does nothing for an index past the capacity.
    pub fn respawn(&mut self, index: usize, position: Vec2, velocity: Vec2, size: f32, offset: Vec2) {
        // Same draw order every respawn: jitter, spread x, spread y, rotation.
        let jitter = (self.random_below(100) - 50.0) / 10.0;
        let disperse = if self.disperse {
            let x = self.random_degrees().to_radians().cos();
            let y = self.random_degrees().to_radians().sin();
            Vec2::new(x, y)
        } else {
            Vec2::ZERO
        };
        let rotation = self.rotate.then(|| self.random_degrees());
        let size = if size == 0.0 { self.default_size } else { size };

        let Some(particle) = self.particles.get_mut(index) else {
            return;
        };
        particle.position = position + Vec2::splat(jitter) + offset;
        particle.color = Vec4::ONE;
        particle.life = 1.0;
        particle.velocity = velocity;
        particle.size = size;
        particle.disperse = disperse;
        if let Some(rotation) = rotation {
            particle.rotation = rotation;
        }
    }

    /// Whole number in `0..n`.
    #[expect(clippy::cast_precision_loss)]
    fn random_below(&mut self, n: u32) -> f32 {
        self.rng.below(n) as f32
    }

    fn random_degrees(&mut self) -> f32 {
        self.random_below(360)
    }

    /// Spawn `emission.count` particles, then age and move every live one
    /// by `dt` seconds.
    pub fn update(&mut self, dt: f32, emission: &Emission) {
        let velocity = emission.velocity * 10.0;
        if !self.particles.is_empty() {
            for _ in 0..emission.count {
                let index = self.first_unused_particle();
                self.respawn(index, emission.position, velocity, emission.size, emission.offset);
            }
        }

        let decay = if emission.decay == 0.0 {
            self.default_decay
        } else {
            emission.decay
        };
        let disperse = self.disperse;
        for particle in &mut self.particles {
            particle.life -= dt * decay;
            if particle.is_alive() {
                let step = if disperse {
                    particle.velocity * particle.disperse
                } else {
                    particle.velocity
                };
                particle.position += step * dt;
                particle.color.w -= dt * decay;
            }
        }
        trace!("{} of {} particles alive", self.live_count(), self.particles.len());
    }

    /// Number of particles with life left.
    pub fn live_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_alive()).count()
    }

    /// Particles with life left.
    pub fn live(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.is_alive())
    }

    /// Every slot, dead or alive.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Bytes used by the particle storage.
    pub fn total_memory(&self) -> usize {
        std::mem::size_of::<Vec<Particle>>() + std::mem::size_of::<Particle>() * self.particles.len()
    }

    /// New particles spread in a random direction.
    pub fn enable_dispersion(&mut self) {
        self.disperse = true;
    }

    /// New particles move with the emitter velocity.
    pub fn disable_dispersion(&mut self) {
        self.disperse = false;
    }

    /// New particles get a random rotation.
    pub fn enable_rotation(&mut self) {
        self.rotate = true;
    }

    /// New particles keep the rotation of the slot they reuse.
    pub fn disable_rotation(&mut self) {
        self.rotate = false;
    }
}
