// SPDX-License-Identifier: AGPL-3.0-only

//! Simulation configuration value object.
//!
//! All tunables live in one explicit struct passed by reference into the
//! per-frame step — no ambient globals. External collaborators deliver
//! changes as discrete [`ConfigChange`] notifications which the simulator
//! applies idempotently between frames; invalid values are clamped, never
//! rejected into the frame loop.

use serde::{Deserialize, Serialize};

/// Host-side analysis is restricted to the first `min(active, ceiling)`
/// particles to bound the O(n²) cluster pass. A precision/performance
/// trade-off, not a correctness requirement.
pub const ANALYSIS_CEILING: usize = 512;

/// Simulation configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[must_use]
pub struct SimConfig {
    /// Particle pool capacity (allocated once at setup).
    pub pool_capacity: usize,
    /// Currently simulated subset of the pool.
    pub active_count: usize,
    /// Radius applied to all active particles.
    pub particle_radius: f32,
    /// Particle mass (uniform across the ensemble).
    pub particle_mass: f32,
    /// Fixed integration time step.
    pub dt: f32,
    /// World dimensions (width, height).
    pub world: [f32; 2],

    /// Berendsen thermostat on/off.
    pub thermostat_enabled: bool,
    /// Thermostat target kinetic temperature.
    pub target_temperature: f32,
    /// Thermostat coupling; stronger coupling relaxes faster toward target.
    pub coupling: f32,

    /// Lennard-Jones well depth ε.
    pub epsilon: f32,
    /// Pairwise interaction cutoff radius.
    pub cutoff: f32,
    /// Per-particle total-force magnitude clamp.
    pub max_force: f32,

    /// Depth-field bias strength; 0 disables the bias even when a field
    /// is supplied.
    pub depth_field_scale: f32,

    /// Record collision events during the step.
    pub record_collisions: bool,
    /// Collision buffer capacity; events past this are counted, not stored.
    pub max_collisions_per_frame: usize,

    /// Run the cluster analysis each frame.
    pub cluster_enabled: bool,
    /// Pairwise distance at or below which particles are connected.
    pub connection_distance: f32,
    /// Groups smaller than this are not materialized.
    pub min_cluster_size: usize,
    /// At most this many clusters per frame.
    pub max_clusters_per_frame: usize,

    /// Store velocity frames and compute the VAC curve.
    pub vac_enabled: bool,
    /// Velocity-history ring depth.
    pub max_velocity_frames: usize,
    /// Maximum autocorrelation time lag.
    pub max_time_lags: usize,
    /// Recompute the VAC curve at most every this many frames.
    pub vac_calc_interval: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 2048,
            active_count: 512,
            particle_radius: 4.0,
            particle_mass: 1.0,
            dt: 1.0 / 60.0,
            world: [1024.0, 768.0],
            thermostat_enabled: true,
            target_temperature: 100.0,
            coupling: 0.1,
            epsilon: 50.0,
            cutoff: 60.0,
            max_force: 500.0,
            depth_field_scale: 0.0,
            record_collisions: true,
            max_collisions_per_frame: 256,
            cluster_enabled: true,
            connection_distance: 50.0,
            min_cluster_size: 3,
            max_clusters_per_frame: 32,
            vac_enabled: true,
            max_velocity_frames: 60,
            max_time_lags: 30,
            vac_calc_interval: 10,
        }
    }
}

impl SimConfig {
    /// World diagonal length; the resolution-independent scale for
    /// cluster spatial spread.
    #[must_use]
    pub fn world_diagonal(&self) -> f32 {
        (self.world[0] * self.world[0] + self.world[1] * self.world[1]).sqrt()
    }

    /// Clamp an active-count request into `[0, pool_capacity]`.
    #[must_use]
    pub fn clamp_active(&self, requested: usize) -> usize {
        requested.min(self.pool_capacity)
    }
}

/// Discrete "value changed" notification from an external collaborator
/// (panel/property system). Applied by the simulator between frames.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConfigChange {
    /// Requested active particle count (clamped to the pool).
    ActiveCount(usize),
    /// Bulk radius update for all active particles.
    ParticleRadius(f32),
    /// World resize (width, height).
    WorldSize([f32; 2]),
    ThermostatEnabled(bool),
    TargetTemperature(f32),
    Coupling(f32),
    /// Enable/disable collision recording.
    CollisionLogging(bool),
    /// Enable/disable the per-frame cluster analysis.
    ClusterAnalysis(bool),
    ConnectionDistance(f32),
    VacEnabled(bool),
    /// Resizes the VAC curve and time axis.
    MaxTimeLags(usize),
    DepthFieldScale(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_active_within_pool() {
        let c = SimConfig::default();
        assert!(c.active_count <= c.pool_capacity);
    }

    #[test]
    fn world_diagonal_positive() {
        let c = SimConfig::default();
        let d = c.world_diagonal();
        let expected = (1024.0f32 * 1024.0 + 768.0 * 768.0).sqrt();
        assert!((d - expected).abs() < 1e-3, "diagonal {d} vs {expected}");
    }

    #[test]
    fn clamp_active_bounds() {
        let c = SimConfig::default();
        assert_eq!(c.clamp_active(0), 0);
        assert_eq!(c.clamp_active(c.pool_capacity), c.pool_capacity);
        assert_eq!(c.clamp_active(c.pool_capacity + 100), c.pool_capacity);
    }

    #[test]
    fn config_change_equality() {
        assert_eq!(
            ConfigChange::ConnectionDistance(42.5),
            ConfigChange::ConnectionDistance(42.5)
        );
        assert_ne!(
            ConfigChange::ActiveCount(10),
            ConfigChange::ActiveCount(11)
        );
    }

    #[test]
    fn analysis_ceiling_is_512() {
        assert_eq!(ANALYSIS_CEILING, 512);
    }
}
