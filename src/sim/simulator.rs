// SPDX-License-Identifier: AGPL-3.0-only

//! Simulation orchestrator.
//!
//! Owns the particle store, compute kernel, and analysis components, and
//! drives the strictly sequential per-frame pipeline on one host thread:
//! dispatch → completion barrier → readback → collision harvest →
//! cluster analysis → VAC update. Nothing reads a buffer another phase
//! may still be writing; ordering, not locks, is the discipline.
//!
//! Configuration changes arrive as [`ConfigChange`] notifications and
//! are applied between frames, taking effect on the next dispatch.

use std::collections::VecDeque;

use crate::gpu::GpuContext;
use crate::sim::collisions::{self, CollisionSnapshot};
use crate::sim::clusters::{self, ClusterAnalysisSnapshot};
use crate::sim::config::{ConfigChange, SimConfig};
use crate::sim::depth_field::DepthField;
use crate::sim::kernel::ComputeKernel;
use crate::sim::particles::ParticleStore;
use crate::sim::vac::{VacSnapshot, VelocityRing};
use crate::SwarmError;

/// Default seed for particle placement; fixed so runs are reproducible.
const DEFAULT_SEED: u64 = 42;

/// Rolling kinetic-telemetry window (10 s at 60 fps).
const ENERGY_HISTORY_DEPTH: usize = 600;

/// Per-frame kinetic telemetry.
#[derive(Clone, Copy, Debug)]
pub struct EnergyRecord {
    pub frame: u64,
    /// Total kinetic energy of the active ensemble.
    pub kinetic: f32,
    /// Instantaneous kinetic temperature.
    pub temperature: f32,
}

/// Berendsen velocity-rescale factor: drives the ensemble temperature
/// toward `target` at a rate set by `coupling`. Returns 1 for a
/// degenerate (zero-temperature) ensemble — no divide, no kick.
#[must_use]
pub fn berendsen_scale(current: f32, target: f32, coupling: f32) -> f32 {
    if current <= 1e-12 {
        return 1.0;
    }
    let ratio = coupling.mul_add(target / current - 1.0, 1.0);
    ratio.max(0.0).sqrt()
}

/// The simulation core: GPU step plus host-side analysis, one frame at
/// a time.
pub struct Simulator {
    config: SimConfig,
    store: ParticleStore,
    kernel: ComputeKernel,
    ring: VelocityRing,
    collision_snapshot: CollisionSnapshot,
    cluster_snapshot: ClusterAnalysisSnapshot,
    energy_history: VecDeque<EnergyRecord>,
    frame: u64,
    /// Host mirror was mutated outside the step (setup/resize/radii);
    /// re-upload before the next dispatch.
    host_dirty: bool,
}

impl Simulator {
    /// Set up the GPU device, kernel, and particle pool.
    ///
    /// # Errors
    ///
    /// GPU initialization and shader build failures are fatal here —
    /// no step is ever dispatched against an invalid kernel.
    pub fn new(config: SimConfig) -> Result<Self, SwarmError> {
        Self::with_seed(config, DEFAULT_SEED)
    }

    /// Like [`Self::new`] with an explicit placement seed.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn with_seed(config: SimConfig, seed: u64) -> Result<Self, SwarmError> {
        let gpu = pollster::block_on(GpuContext::new())?;
        let kernel = ComputeKernel::new(gpu, config.pool_capacity, config.max_collisions_per_frame)?;
        let store = ParticleStore::setup(
            config.pool_capacity,
            config.active_count,
            config.world,
            config.particle_radius,
            config.particle_mass,
            seed,
        );
        let ring = VelocityRing::new(
            config.max_velocity_frames,
            config.max_time_lags,
            config.vac_calc_interval,
        );
        Ok(Self {
            config,
            store,
            kernel,
            ring,
            collision_snapshot: CollisionSnapshot::default(),
            cluster_snapshot: ClusterAnalysisSnapshot::default(),
            energy_history: VecDeque::with_capacity(ENERGY_HISTORY_DEPTH),
            frame: 0,
            host_dirty: true,
        })
    }

    /// Run one frame of the pipeline.
    ///
    /// The thermostat scale is derived from the host mirror synced at
    /// the end of the previous step (one-frame lag, the readback-driven
    /// Berendsen loop). An empty active set skips the dispatch entirely
    /// and reports empty snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`SwarmError::BufferMap`] if the particle-state readback
    /// fails; collision readback faults degrade to an empty snapshot
    /// instead.
    pub fn step(&mut self) -> Result<(), SwarmError> {
        let n = self.store.active_count();
        if n == 0 {
            self.collision_snapshot = CollisionSnapshot::empty(self.frame);
            self.cluster_snapshot = ClusterAnalysisSnapshot::empty(self.frame);
            self.frame += 1;
            return Ok(());
        }

        let thermo_scale = if self.config.thermostat_enabled {
            berendsen_scale(
                self.store.kinetic_temperature(),
                self.config.target_temperature,
                self.config.coupling,
            )
        } else {
            1.0
        };

        if self.host_dirty {
            self.kernel.upload_particles(self.store.active());
            self.host_dirty = false;
        }

        let out = self.kernel.step(&self.config, n, thermo_scale)?;
        self.store.active_mut().copy_from_slice(&out.particles);

        self.collision_snapshot = if self.config.record_collisions {
            collisions::harvest(
                out.collision_count,
                &out.collisions,
                self.config.max_collisions_per_frame,
                self.config.world,
                self.frame,
            )
        } else {
            CollisionSnapshot::empty(self.frame)
        };

        self.cluster_snapshot = if self.config.cluster_enabled {
            clusters::analyze(self.store.active(), &self.config, self.frame)
        } else {
            ClusterAnalysisSnapshot::empty(self.frame)
        };

        if self.config.vac_enabled {
            let velocities: Vec<[f32; 2]> =
                self.store.active().iter().map(|p| p.velocity).collect();
            self.ring.store_frame(&velocities);
            self.ring.maybe_calculate(self.config.dt);
        }

        let temperature = self.store.kinetic_temperature();
        if self.energy_history.len() == ENERGY_HISTORY_DEPTH {
            self.energy_history.pop_front();
        }
        self.energy_history.push_back(EnergyRecord {
            frame: self.frame,
            kinetic: temperature * n as f32,
            temperature,
        });

        self.frame += 1;
        Ok(())
    }

    /// Apply one configuration-change notification. Idempotent; invalid
    /// values are clamped, never rejected.
    pub fn apply_change(&mut self, change: ConfigChange) {
        if apply_change_to(&mut self.config, &mut self.store, &mut self.ring, change) {
            self.host_dirty = true;
        }
    }

    /// Install or clear the depth bias field for subsequent frames.
    pub fn set_depth_field(&mut self, field: Option<&DepthField>) {
        self.kernel.set_depth_field(field);
    }

    // ── Plain runtime toggles (external control surface) ─────────────

    pub fn set_collision_logging(&mut self, enabled: bool) {
        self.apply_change(ConfigChange::CollisionLogging(enabled));
    }

    pub fn set_cluster_analysis(&mut self, enabled: bool) {
        self.apply_change(ConfigChange::ClusterAnalysis(enabled));
    }

    pub fn set_vac_enabled(&mut self, enabled: bool) {
        self.apply_change(ConfigChange::VacEnabled(enabled));
    }

    pub fn set_connection_distance(&mut self, distance: f32) {
        self.apply_change(ConfigChange::ConnectionDistance(distance));
    }

    pub fn set_max_time_lags(&mut self, lags: usize) {
        self.apply_change(ConfigChange::MaxTimeLags(lags));
    }

    // ── Copy-out snapshots ───────────────────────────────────────────

    /// Collision snapshot for the last completed frame.
    #[must_use]
    pub fn collisions(&self) -> CollisionSnapshot {
        self.collision_snapshot.clone()
    }

    /// Cluster statistics for the last completed frame.
    #[must_use]
    pub fn clusters(&self) -> ClusterAnalysisSnapshot {
        self.cluster_snapshot.clone()
    }

    /// Most recently computed VAC curve.
    #[must_use]
    pub fn vac(&self) -> VacSnapshot {
        self.ring.snapshot()
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.store.active_count()
    }

    /// Rolling kinetic telemetry, oldest first.
    pub fn energy_history(&self) -> impl Iterator<Item = &EnergyRecord> {
        self.energy_history.iter()
    }
}

/// Apply a change to the config and dependent components. Returns true
/// when the host particle mirror was mutated (device re-upload needed).
///
/// Free function so change semantics are testable without a GPU.
pub fn apply_change_to(
    config: &mut SimConfig,
    store: &mut ParticleStore,
    ring: &mut VelocityRing,
    change: ConfigChange,
) -> bool {
    match change {
        ConfigChange::ActiveCount(requested) => {
            let clamped = config.clamp_active(requested);
            config.active_count = clamped;
            store.resize(clamped);
            true
        }
        ConfigChange::ParticleRadius(r) => {
            let r = r.max(0.0);
            config.particle_radius = r;
            store.update_radii(r);
            true
        }
        ConfigChange::WorldSize(w) => {
            config.world = [w[0].max(1.0), w[1].max(1.0)];
            false
        }
        ConfigChange::ThermostatEnabled(on) => {
            config.thermostat_enabled = on;
            false
        }
        ConfigChange::TargetTemperature(t) => {
            config.target_temperature = t.max(0.0);
            false
        }
        ConfigChange::Coupling(c) => {
            config.coupling = c.clamp(0.0, 1.0);
            false
        }
        ConfigChange::CollisionLogging(on) => {
            config.record_collisions = on;
            false
        }
        ConfigChange::ClusterAnalysis(on) => {
            config.cluster_enabled = on;
            false
        }
        ConfigChange::ConnectionDistance(d) => {
            config.connection_distance = d.max(0.0);
            false
        }
        ConfigChange::VacEnabled(on) => {
            config.vac_enabled = on;
            false
        }
        ConfigChange::MaxTimeLags(lags) => {
            config.max_time_lags = lags.max(1);
            ring.set_max_time_lags(config.max_time_lags);
            false
        }
        ConfigChange::DepthFieldScale(s) => {
            config.depth_field_scale = s;
            false
        }
    }
}
