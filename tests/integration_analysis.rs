// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: host-side analysis pipeline end-to-end.
//!
//! These run the CPU reference step and the analysis components against
//! each other across module boundaries. No GPU required.

use swarm_md::sim::clusters;
use swarm_md::sim::collisions::{self, CollisionRecord};
use swarm_md::sim::config::{ConfigChange, SimConfig};
use swarm_md::sim::cpu_reference::step_cpu;
use swarm_md::sim::particles::{Particle, ParticleStore};
use swarm_md::sim::simulator::{apply_change_to, berendsen_scale};
use swarm_md::sim::vac::VelocityRing;

fn particle_at(x: f32, y: f32) -> Particle {
    Particle {
        position: [x, y],
        velocity: [0.0, 0.0],
        mass: 1.0,
        radius: 4.0,
    }
}

fn ring_for(config: &SimConfig) -> VelocityRing {
    VelocityRing::new(
        config.max_velocity_frames,
        config.max_time_lags,
        config.vac_calc_interval,
    )
}

// ── Cluster analysis ─────────────────────────────────────────────────

#[test]
fn ten_particles_in_small_circle_form_one_cluster() {
    // All ten sit within a 10-unit circle; with a 50-unit connection
    // distance they must merge into exactly one cluster of ten.
    let mut config = SimConfig::default();
    config.connection_distance = 50.0;
    config.min_cluster_size = 5;

    let particles: Vec<Particle> = (0..10)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::TAU / 10.0;
            particle_at(500.0 + 5.0 * angle.cos(), 400.0 + 5.0 * angle.sin())
        })
        .collect();

    let snapshot = clusters::analyze(&particles, &config, 0);
    assert_eq!(snapshot.clusters.len(), 1, "one cluster expected");
    assert_eq!(snapshot.clusters[0].member_count, 10);
}

#[test]
fn separated_groups_partition_correctly() {
    let mut config = SimConfig::default();
    config.connection_distance = 20.0;
    config.min_cluster_size = 3;

    // Two tight triads far apart plus one isolated straggler.
    let mut particles = vec![
        particle_at(100.0, 100.0),
        particle_at(105.0, 100.0),
        particle_at(100.0, 105.0),
        particle_at(900.0, 600.0),
        particle_at(905.0, 600.0),
        particle_at(900.0, 605.0),
    ];
    particles.push(particle_at(500.0, 50.0));

    let snapshot = clusters::analyze(&particles, &config, 3);
    assert_eq!(snapshot.clusters.len(), 2, "two triads, straggler dropped");
    for c in &snapshot.clusters {
        assert_eq!(c.member_count, 3);
        assert_eq!(c.frame_number, 3);
    }
}

#[test]
fn cluster_centers_are_normalized() {
    let mut config = SimConfig::default();
    config.connection_distance = 50.0;
    config.min_cluster_size = 2;
    config.world = [1000.0, 800.0];

    // Pair at the world center maps to the origin of clip space.
    let particles = vec![particle_at(495.0, 400.0), particle_at(505.0, 400.0)];
    let snapshot = clusters::analyze(&particles, &config, 0);
    assert_eq!(snapshot.clusters.len(), 1);
    let c = snapshot.clusters[0].center_position;
    assert!(c[0].abs() < 1e-3 && c[1].abs() < 1e-3, "center {c:?}");
}

// ── Collision harvest ────────────────────────────────────────────────

#[test]
fn harvest_caps_records_but_reports_true_count() {
    let records: Vec<CollisionRecord> = (0..2)
        .map(|i| CollisionRecord {
            a: i,
            b: i + 1,
            pos_a: [100.0, 100.0],
            pos_b: [104.0, 100.0],
            dist: 4.0,
            rel_speed: 1.0,
        })
        .collect();

    // The kernel counted five events but only two slots existed.
    let snapshot = collisions::harvest(5, &records, 2, [1024.0, 768.0], 7);
    assert_eq!(snapshot.true_count, 5);
    assert_eq!(snapshot.records.len(), 2);
    assert_eq!(snapshot.frame, 7);
    for r in &snapshot.records {
        assert!(r.pos_a[0].abs() <= 1.0 && r.pos_a[1].abs() <= 1.0);
    }
}

#[test]
fn cpu_step_collision_count_exceeds_materialized() {
    let mut config = SimConfig::default();
    config.epsilon = 0.0;
    config.max_collisions_per_frame = 2;

    // Four coincident particles: C(4,2) = 6 overlapping pairs.
    let mut particles = vec![particle_at(500.0, 400.0); 4];
    let (count, records) = step_cpu(&mut particles, &config, None, 1.0);
    assert_eq!(count, 6, "all pairs counted");
    assert_eq!(records.len(), 2, "records capped at capacity");
}

// ── Particle store ───────────────────────────────────────────────────

#[test]
fn resize_round_trip_preserves_particle_state() {
    let mut store = ParticleStore::setup(200, 100, [1024.0, 768.0], 4.0, 1.0, 99);
    let original: Vec<Particle> = store.active().to_vec();

    store.resize(20);
    store.resize(100);

    for (i, (now, then)) in store.active().iter().zip(&original).enumerate() {
        assert_eq!(now.position, then.position, "position of particle {i}");
        assert_eq!(now.velocity, then.velocity, "velocity of particle {i}");
    }
}

// ── VAC ──────────────────────────────────────────────────────────────

#[test]
fn constant_velocities_give_flat_unit_vac() {
    // Identical velocities every frame: perfect correlation at all lags.
    let mut ring = VelocityRing::new(60, 3, 1);
    for _ in 0..3 {
        ring.store_frame(&[[1.0, 0.0], [0.0, -2.0]]);
    }
    ring.calculate(1.0 / 60.0);

    let snap = ring.snapshot();
    assert_eq!(snap.values.len(), 3);
    for (lag, v) in snap.values.iter().enumerate() {
        assert!((v - 1.0).abs() < 1e-6, "lag {lag}: {v}");
    }
}

#[test]
fn vac_time_axis_uses_frame_interval() {
    let mut ring = VelocityRing::new(60, 4, 1);
    for _ in 0..4 {
        ring.store_frame(&[[1.0, 1.0]]);
    }
    let dt = 0.5;
    ring.calculate(dt);
    let snap = ring.snapshot();
    for (i, t) in snap.time_axis.iter().enumerate() {
        assert!((t - i as f32 * dt).abs() < 1e-6, "lag {i}: t = {t}");
    }
}

// ── Config changes ───────────────────────────────────────────────────

#[test]
fn config_changes_are_idempotent_through_store_and_ring() {
    let mut config = SimConfig::default();
    let mut store = ParticleStore::setup(
        config.pool_capacity,
        config.active_count,
        config.world,
        config.particle_radius,
        config.particle_mass,
        1,
    );
    let mut ring = ring_for(&config);

    for _ in 0..3 {
        apply_change_to(&mut config, &mut store, &mut ring, ConfigChange::ActiveCount(64));
        apply_change_to(
            &mut config,
            &mut store,
            &mut ring,
            ConfigChange::ParticleRadius(6.0),
        );
        apply_change_to(&mut config, &mut store, &mut ring, ConfigChange::MaxTimeLags(5));
    }

    assert_eq!(config.active_count, 64);
    assert_eq!(store.active_count(), 64);
    assert_eq!(config.particle_radius, 6.0);
    assert_eq!(config.max_time_lags, 5);
}

// ── Thermostat over frames ───────────────────────────────────────────

#[test]
fn cpu_pipeline_thermostat_converges_toward_target() {
    let mut config = SimConfig::default();
    config.epsilon = 0.0;
    config.record_collisions = false;
    config.target_temperature = 50.0;
    config.coupling = 0.2;

    let store = ParticleStore::setup(64, 64, config.world, 2.0, 1.0, 5);
    let mut particles = store.active().to_vec();

    let temperature = |ps: &[Particle]| -> f32 {
        let ke: f32 = ps
            .iter()
            .map(|p| {
                0.5 * p.mass * (p.velocity[0] * p.velocity[0] + p.velocity[1] * p.velocity[1])
            })
            .sum();
        ke / ps.len() as f32
    };

    let initial_err = (temperature(&particles) - 50.0).abs();
    for _ in 0..200 {
        let scale = berendsen_scale(temperature(&particles), 50.0, 0.2);
        step_cpu(&mut particles, &config, None, scale);
    }
    let final_err = (temperature(&particles) - 50.0).abs();

    assert!(
        final_err < initial_err * 0.1 || final_err < 1.0,
        "temperature should relax: {initial_err} -> {final_err}"
    );
}

#[test]
fn cpu_pipeline_keeps_particles_in_bounds() {
    let mut config = SimConfig::default();
    config.world = [200.0, 150.0];
    config.record_collisions = false;

    let store = ParticleStore::setup(32, 32, config.world, 2.0, 1.0, 11);
    let mut particles = store.active().to_vec();
    for _ in 0..100 {
        step_cpu(&mut particles, &config, None, 1.0);
    }
    for (i, p) in particles.iter().enumerate() {
        assert!(
            p.position[0] >= 0.0 && p.position[0] <= 200.0,
            "particle {i} x out of bounds: {}",
            p.position[0]
        );
        assert!(
            p.position[1] >= 0.0 && p.position[1] <= 150.0,
            "particle {i} y out of bounds: {}",
            p.position[1]
        );
        assert!(p.velocity[0].is_finite() && p.velocity[1].is_finite());
    }
}
