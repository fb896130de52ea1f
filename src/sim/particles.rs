// SPDX-License-Identifier: AGPL-3.0-only

//! Fixed-capacity particle pool with a resizable active window.
//!
//! The pool is allocated once at setup. The active set is the prefix
//! `[0, active_count)`; particles past it are inert reserve whose state
//! is preserved, so re-activation resumes a particle's prior motion.
//! Resize is O(|Δ|) bookkeeping with no reallocation, and indices below
//! `min(old, new)` keep their identity and state.

use bytemuck::{Pod, Zeroable};

/// One particle record. `repr(C)` mirror of the WGSL `Particle` struct
/// (size 24, vec2 alignment 8).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub mass: f32,
    pub radius: f32,
}

/// Per-component standard deviation of the initial Maxwell-like
/// velocity draw, in world units per second.
const INITIAL_SPEED_SCALE: f32 = 10.0;

/// Particle pool + active window.
#[derive(Debug)]
pub struct ParticleStore {
    pool: Vec<Particle>,
    active_count: usize,
}

impl ParticleStore {
    /// Allocate the pool and randomize positions/velocities inside the
    /// world bounds. Deterministic for a given `seed`.
    pub fn setup(
        pool_capacity: usize,
        initial_active: usize,
        world: [f32; 2],
        radius: f32,
        mass: f32,
        seed: u64,
    ) -> Self {
        let mut rng_state = seed;
        let mut pool = Vec::with_capacity(pool_capacity);
        for _ in 0..pool_capacity {
            let px = lcg_next(&mut rng_state) as f32 * world[0];
            let py = lcg_next(&mut rng_state) as f32 * world[1];
            let (vx, vy) = gaussian_pair(&mut rng_state);
            pool.push(Particle {
                position: [px, py],
                velocity: [vx * INITIAL_SPEED_SCALE, vy * INITIAL_SPEED_SCALE],
                mass,
                radius,
            });
        }
        Self {
            pool,
            active_count: initial_active.min(pool_capacity),
        }
    }

    /// Number of currently simulated particles.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Total pool capacity.
    #[must_use]
    pub fn pool_capacity(&self) -> usize {
        self.pool.len()
    }

    /// The active subset, read-only.
    #[must_use]
    pub fn active(&self) -> &[Particle] {
        &self.pool[..self.active_count]
    }

    /// The active subset, mutable (used by the step readback sync and
    /// the CPU reference path).
    pub fn active_mut(&mut self) -> &mut [Particle] {
        &mut self.pool[..self.active_count]
    }

    /// Change the active window, clamped to `[0, pool_capacity]`.
    ///
    /// Shrinking leaves the deactivated particles in their pool slots
    /// with state intact; growing pulls reserve particles back in slot
    /// order, resuming their prior motion.
    pub fn resize(&mut self, new_active: usize) {
        self.active_count = new_active.min(self.pool.len());
    }

    /// Bulk-set radius on all active particles.
    pub fn update_radii(&mut self, radius: f32) {
        for p in &mut self.pool[..self.active_count] {
            p.radius = radius;
        }
    }

    /// Instantaneous kinetic temperature of the active ensemble:
    /// `T = Σ ½ m |v|² / N` (2D, k_B = 1). Zero for an empty ensemble.
    #[must_use]
    pub fn kinetic_temperature(&self) -> f32 {
        if self.active_count == 0 {
            return 0.0;
        }
        let ke: f32 = self.active()
            .iter()
            .map(|p| {
                0.5 * p.mass * (p.velocity[0] * p.velocity[0] + p.velocity[1] * p.velocity[1])
            })
            .sum();
        ke / self.active_count as f32
    }
}

/// LCG step producing a uniform value in [0, 1).
fn lcg_next(state: &mut u64) -> f64 {
    *state = state
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
    (*state >> 33) as f64 / (1u64 << 31) as f64
}

/// Box-Muller transform: one pair of standard-normal samples.
fn gaussian_pair(state: &mut u64) -> (f32, f32) {
    let u1 = lcg_next(state).max(1e-15);
    let u2 = lcg_next(state);
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f64::consts::PI * u2;
    ((r * theta.cos()) as f32, (r * theta.sin()) as f32)
}
