// SPDX-License-Identifier: AGPL-3.0-only

//! Velocity-history ring and velocity autocorrelation curve.
//!
//! The ring stores per-particle velocity snapshots for the last
//! `max_velocity_frames` steps (slot = frame mod capacity). The VAC
//! curve is recomputed from scratch — never incrementally patched — at
//! a throttled cadence:
//!
//! `C(dt) = Σ_i v_i(t0) · v_i(t0 − dt)` over particles present in both
//! slots, normalized by `C(0)` when positive so the curve is 1 at zero
//! lag. A non-positive `C(0)` (degenerate/static ensemble) leaves the
//! curve unnormalized at zero — nothing to report, not a failure.
//!
//! Slots written while the active count differed may have a different
//! shape; the per-lag sum walks `min(len, len_lagged)` particles so a
//! stale shape contributes nothing instead of crashing.

use serde::Serialize;

/// Copy-out VAC result for plotting.
#[derive(Clone, Debug, Default, Serialize)]
pub struct VacSnapshot {
    /// Normalized autocorrelation values, one per time lag.
    pub values: Vec<f32>,
    /// Lag times, `i × dt`.
    pub time_axis: Vec<f32>,
    /// Frame at which the curve was last computed.
    pub computed_at_frame: u64,
}

/// Fixed-depth velocity ring + throttled VAC calculator.
#[derive(Debug)]
pub struct VelocityRing {
    slots: Vec<Vec<[f32; 2]>>,
    stored: usize,
    current_frame: u64,
    last_calculation_frame: Option<u64>,
    max_time_lags: usize,
    calc_interval: usize,
    vac_values: Vec<f32>,
    time_axis: Vec<f32>,
}

impl VelocityRing {
    #[must_use]
    pub fn new(max_velocity_frames: usize, max_time_lags: usize, calc_interval: usize) -> Self {
        Self {
            slots: vec![Vec::new(); max_velocity_frames.max(1)],
            stored: 0,
            current_frame: 0,
            last_calculation_frame: None,
            max_time_lags,
            calc_interval: calc_interval.max(1),
            vac_values: Vec::new(),
            time_axis: Vec::new(),
        }
    }

    /// Ring depth.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Frames stored so far, saturating at capacity.
    #[must_use]
    pub fn available_frames(&self) -> usize {
        self.stored
    }

    /// Store the current active velocities into slot
    /// `current_frame mod capacity`. Called once per simulation step when
    /// VAC is enabled.
    pub fn store_frame(&mut self, velocities: &[[f32; 2]]) {
        let cap = self.slots.len();
        let slot = (self.current_frame % cap as u64) as usize;
        self.slots[slot].clear();
        self.slots[slot].extend_from_slice(velocities);
        self.current_frame += 1;
        self.stored = self.stored.saturating_add(1).min(cap);
    }

    /// Change the maximum lag; resizes the curve and re-derives the time
    /// axis on the next calculation.
    pub fn set_max_time_lags(&mut self, max_time_lags: usize) {
        self.max_time_lags = max_time_lags;
        self.vac_values.truncate(max_time_lags);
        self.time_axis.truncate(max_time_lags);
    }

    /// Recompute the curve if at least `calc_interval` frames have
    /// elapsed since the last run. Returns whether it ran.
    pub fn maybe_calculate(&mut self, dt: f32) -> bool {
        let due = match self.last_calculation_frame {
            None => true,
            Some(last) => self.current_frame.saturating_sub(last) >= self.calc_interval as u64,
        };
        if due {
            self.calculate(dt);
        }
        due
    }

    /// Unconditional curve recomputation.
    ///
    /// Lag 0 is the most recently stored frame; lag `dt` walks backwards
    /// through the ring. Fewer than 2 stored frames ⇒ skip (no
    /// statistically meaningful lag exists).
    pub fn calculate(&mut self, dt: f32) {
        self.last_calculation_frame = Some(self.current_frame);
        if self.stored < 2 {
            self.vac_values.clear();
            self.time_axis.clear();
            return;
        }

        let n_lags = self.max_time_lags.min(self.stored);
        let cap = self.slots.len() as u64;
        let newest = self.current_frame - 1;
        let base = &self.slots[(newest % cap) as usize];

        self.vac_values.clear();
        for lag in 0..n_lags {
            let lagged = &self.slots[((newest - lag as u64) % cap) as usize];
            let mut sum = 0.0f32;
            for (v0, v1) in base.iter().zip(lagged.iter()) {
                sum += v0[0] * v1[0] + v0[1] * v1[1];
            }
            self.vac_values.push(sum);
        }

        if self.vac_values.first().copied().unwrap_or(0.0) > 0.0 {
            let c0 = self.vac_values[0];
            for v in &mut self.vac_values {
                *v /= c0;
            }
        }

        self.time_axis = (0..self.vac_values.len()).map(|i| i as f32 * dt).collect();
    }

    /// Copy-out snapshot of the last computed curve.
    #[must_use]
    pub fn snapshot(&self) -> VacSnapshot {
        VacSnapshot {
            values: self.vac_values.clone(),
            time_axis: self.time_axis.clone(),
            computed_at_frame: self.last_calculation_frame.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_frames(ring: &mut VelocityRing, v: [f32; 2], n_particles: usize, frames: usize) {
        let snapshot = vec![v; n_particles];
        for _ in 0..frames {
            ring.store_frame(&snapshot);
        }
    }

    #[test]
    fn skip_below_two_frames() {
        let mut ring = VelocityRing::new(8, 4, 1);
        constant_frames(&mut ring, [1.0, 0.0], 4, 1);
        ring.calculate(0.01);
        assert!(ring.snapshot().values.is_empty(), "one frame is not enough");
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn constant_velocities_give_flat_unit_curve() {
        // maxVelocityFrames=8, 3 identical frames, maxTimeLags=3 ⇒ [1,1,1]
        let mut ring = VelocityRing::new(8, 3, 1);
        constant_frames(&mut ring, [2.0, 1.0], 5, 3);
        ring.calculate(0.5);
        let snap = ring.snapshot();
        assert_eq!(snap.values, vec![1.0, 1.0, 1.0]);
        assert_eq!(snap.time_axis, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn normalized_to_one_at_zero_lag() {
        let mut ring = VelocityRing::new(16, 8, 1);
        // Decaying velocities still normalize to exactly 1 at lag 0.
        for k in 0..6 {
            let scale = 1.0 / (k + 1) as f32;
            let frame = vec![[scale, -scale]; 3];
            ring.store_frame(&frame);
        }
        ring.calculate(0.01);
        let snap = ring.snapshot();
        assert!((snap.values[0] - 1.0).abs() < 1e-6);
        for &v in &snap.values[1..] {
            assert!(v > snap.values[0] - 1e-6, "older frames were faster");
        }
    }

    #[test]
    fn static_ensemble_stays_zero_without_crash() {
        let mut ring = VelocityRing::new(8, 4, 1);
        constant_frames(&mut ring, [0.0, 0.0], 10, 5);
        ring.calculate(0.01);
        for &v in &ring.snapshot().values {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn lags_bounded_by_available_frames() {
        let mut ring = VelocityRing::new(8, 100, 1);
        constant_frames(&mut ring, [1.0, 0.0], 2, 4);
        ring.calculate(0.01);
        assert_eq!(ring.snapshot().values.len(), 4);
    }

    #[test]
    fn stale_slot_shapes_do_not_contribute_or_crash() {
        let mut ring = VelocityRing::new(8, 3, 1);
        // Active count changed between frames: 4, then 2 particles.
        ring.store_frame(&vec![[1.0, 0.0]; 4]);
        ring.store_frame(&vec![[1.0, 0.0]; 2]);
        ring.store_frame(&vec![[1.0, 0.0]; 2]);
        ring.calculate(0.01);
        let snap = ring.snapshot();
        // Lag 2 pairs the 2-particle base with the 4-particle slot: only
        // the overlapping particles count, so the value still normalizes
        // to 1 for constant velocities.
        assert_eq!(snap.values.len(), 3);
        for &v in &snap.values {
            assert!((v - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn throttle_respects_interval() {
        let mut ring = VelocityRing::new(8, 4, 5);
        constant_frames(&mut ring, [1.0, 0.0], 2, 3);
        assert!(ring.maybe_calculate(0.01), "first run is always due");
        constant_frames(&mut ring, [1.0, 0.0], 2, 2);
        assert!(!ring.maybe_calculate(0.01), "2 < interval of 5");
        constant_frames(&mut ring, [1.0, 0.0], 2, 3);
        assert!(ring.maybe_calculate(0.01), "5 frames elapsed");
    }

    #[test]
    fn ring_wraps_past_capacity() {
        let mut ring = VelocityRing::new(4, 10, 1);
        for k in 0..9 {
            ring.store_frame(&vec![[k as f32, 0.0]; 2]);
        }
        assert_eq!(ring.available_frames(), 4);
        ring.calculate(0.01);
        assert_eq!(ring.snapshot().values.len(), 4);
    }

    #[test]
    fn set_max_time_lags_resizes_curve() {
        let mut ring = VelocityRing::new(16, 8, 1);
        constant_frames(&mut ring, [1.0, 1.0], 3, 8);
        ring.calculate(0.01);
        assert_eq!(ring.snapshot().values.len(), 8);
        ring.set_max_time_lags(3);
        ring.calculate(0.01);
        let snap = ring.snapshot();
        assert_eq!(snap.values.len(), 3);
        assert_eq!(snap.time_axis.len(), 3);
    }
}
