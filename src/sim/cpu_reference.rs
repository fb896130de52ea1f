// SPDX-License-Identifier: AGPL-3.0-only

//! CPU reference step in pure Rust f32.
//!
//! Same semantics as the three GPU passes (`shaders/`): all-pairs
//! Lennard-Jones forces with cutoff and magnitude clamp, depth-field
//! gradient bias, semi-implicit Euler with reflective bounds and the
//! Berendsen scale, then the `i < j` collision scan with the same
//! capacity truncation.
//!
//! Used for CPU/GPU parity validation and for exercising the host-side
//! analysis pipeline in tests without a GPU.

use crate::sim::collisions::CollisionRecord;
use crate::sim::config::SimConfig;
use crate::sim::depth_field::DepthField;
use crate::sim::particles::Particle;

/// Accumulate pairwise LJ + depth-bias force on particle `i`.
fn force_on(
    i: usize,
    particles: &[Particle],
    config: &SimConfig,
    depth: Option<&DepthField>,
) -> [f32; 2] {
    let pi = particles[i];
    let cutoff_sq = config.cutoff * config.cutoff;
    let mut fx = 0.0f32;
    let mut fy = 0.0f32;

    for (j, pj) in particles.iter().enumerate() {
        if j == i {
            continue;
        }
        let dx = pi.position[0] - pj.position[0];
        let dy = pi.position[1] - pj.position[1];
        let r_sq = dx * dx + dy * dy;
        if r_sq > cutoff_sq || r_sq < 1e-12 {
            continue;
        }
        let r = r_sq.sqrt();
        let sr = (pi.radius + pj.radius) / r;
        let sr2 = sr * sr;
        let sr6 = sr2 * sr2 * sr2;
        let sr12 = sr6 * sr6;
        let mag = 24.0 * config.epsilon * (2.0 * sr12 - sr6) / r;
        fx += dx / r * mag;
        fy += dy / r * mag;
    }

    if let Some(field) = depth {
        if config.depth_field_scale != 0.0 {
            let tx = 1.0 / field.scale[0].max(1e-6);
            let ty = 1.0 / field.scale[1].max(1e-6);
            let gx = field.sample_world([pi.position[0] + tx, pi.position[1]])
                - field.sample_world([pi.position[0] - tx, pi.position[1]]);
            let gy = field.sample_world([pi.position[0], pi.position[1] + ty])
                - field.sample_world([pi.position[0], pi.position[1] - ty]);
            fx += config.depth_field_scale * 0.5 * gx;
            fy += config.depth_field_scale * 0.5 * gy;
        }
    }

    let mag_sq = fx * fx + fy * fy;
    let max_sq = config.max_force * config.max_force;
    if mag_sq > max_sq {
        let scale = config.max_force / mag_sq.sqrt();
        fx *= scale;
        fy *= scale;
    }
    [fx, fy]
}

/// One reflective-bounds axis update. Returns (position, velocity).
fn reflect(pos: f32, vel: f32, extent: f32) -> (f32, f32) {
    if pos < 0.0 {
        ((-pos).min(extent), vel.abs())
    } else if pos > extent {
        ((2.0 * extent - pos).max(0.0), -vel.abs())
    } else {
        (pos, vel)
    }
}

/// Run one reference step in place over the active particles.
///
/// Returns the true collision event count and the materialized records
/// (at most `max_collisions_per_frame`), mirroring the device buffer
/// contract.
pub fn step_cpu(
    particles: &mut [Particle],
    config: &SimConfig,
    depth: Option<&DepthField>,
    thermo_scale: f32,
) -> (u32, Vec<CollisionRecord>) {
    let n = particles.len();
    if n == 0 {
        return (0, Vec::new());
    }

    let forces: Vec<[f32; 2]> = (0..n)
        .map(|i| force_on(i, particles, config, depth))
        .collect();

    for (p, f) in particles.iter_mut().zip(&forces) {
        let mut vx = (p.velocity[0] + f[0] / p.mass * config.dt) * thermo_scale;
        let mut vy = (p.velocity[1] + f[1] / p.mass * config.dt) * thermo_scale;
        let px = p.position[0] + vx * config.dt;
        let py = p.position[1] + vy * config.dt;
        let (px, nvx) = reflect(px, vx, config.world[0]);
        let (py, nvy) = reflect(py, vy, config.world[1]);
        vx = nvx;
        vy = nvy;
        p.position = [px, py];
        p.velocity = [vx, vy];
    }

    if !config.record_collisions {
        return (0, Vec::new());
    }

    let mut true_count = 0u32;
    let mut records = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = particles[i].position[0] - particles[j].position[0];
            let dy = particles[i].position[1] - particles[j].position[1];
            let dist = (dx * dx + dy * dy).sqrt();
            let contact = particles[i].radius + particles[j].radius;
            if dist <= contact {
                if (true_count as usize) < config.max_collisions_per_frame {
                    let dvx = particles[i].velocity[0] - particles[j].velocity[0];
                    let dvy = particles[i].velocity[1] - particles[j].velocity[1];
                    records.push(CollisionRecord {
                        a: i as u32,
                        b: j as u32,
                        pos_a: particles[i].position,
                        pos_b: particles[j].position,
                        dist,
                        rel_speed: (dvx * dvx + dvy * dvy).sqrt(),
                    });
                }
                true_count += 1;
            }
        }
    }
    (true_count, records)
}
