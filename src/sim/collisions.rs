// SPDX-License-Identifier: AGPL-3.0-only

//! Collision harvesting: bounded device buffer → stable per-frame snapshot.
//!
//! The compute step appends [`CollisionRecord`]s through an atomic
//! claim-a-slot counter; the counter reflects the true event count even
//! when events past capacity were dropped. The whole buffer (header and
//! all capacity slots) comes back in the step's single staged copy; the
//! counter then bounds which slots are real. The harvester materializes
//! `min(count, capacity)` records and normalizes world positions into
//! `[-1, 1]²` so downstream consumers (sonification, logging) are
//! resolution-independent.
//!
//! On a readback fault the frame reports zero collisions rather than a
//! stale or partial snapshot. The device buffer is reset (count = 0) at
//! the start of the next step, not by the harvester.

use bytemuck::{Pod, Zeroable};
use serde::Serialize;

/// Raw collision record. `repr(C)` mirror of the WGSL `CollisionRecord`
/// (size 32).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CollisionRecord {
    pub a: u32,
    pub b: u32,
    pub pos_a: [f32; 2],
    pub pos_b: [f32; 2],
    pub dist: f32,
    pub rel_speed: f32,
}

/// One harvested collision with positions normalized to `[-1, 1]²`.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct NormalizedCollision {
    pub a: u32,
    pub b: u32,
    pub pos_a: [f32; 2],
    pub pos_b: [f32; 2],
    pub dist: f32,
    pub rel_speed: f32,
}

/// Immutable-for-this-frame collision snapshot. Consumers copy it;
/// nothing here aliases live device memory.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CollisionSnapshot {
    /// Frame the snapshot belongs to.
    pub frame: u64,
    /// True event count reported by the kernel, including dropped events.
    pub true_count: u32,
    /// Materialized records, at most the buffer capacity.
    pub records: Vec<NormalizedCollision>,
}

impl CollisionSnapshot {
    /// Zero-collision snapshot, used both for quiet frames and for
    /// readback-fault degradation.
    #[must_use]
    pub fn empty(frame: u64) -> Self {
        Self {
            frame,
            true_count: 0,
            records: Vec::new(),
        }
    }
}

/// Map a world position into `[-1, 1]²` via the current world dimensions.
fn normalize_position(p: [f32; 2], world: [f32; 2]) -> [f32; 2] {
    [
        (p[0] / world[0]).mul_add(2.0, -1.0).clamp(-1.0, 1.0),
        (p[1] / world[1]).mul_add(2.0, -1.0).clamp(-1.0, 1.0),
    ]
}

/// Cap and normalize the raw readback into a frame snapshot.
///
/// `true_count` is the kernel's atomic counter; `records` holds whatever
/// was materialized (its length may already be below `capacity` for a
/// quiet frame). The harvested set size is `min(true_count, capacity,
/// records.len())`.
#[must_use]
pub fn harvest(
    true_count: u32,
    records: &[CollisionRecord],
    capacity: usize,
    world: [f32; 2],
    frame: u64,
) -> CollisionSnapshot {
    let materialized = (true_count as usize).min(capacity).min(records.len());
    let records = records[..materialized]
        .iter()
        .map(|r| NormalizedCollision {
            a: r.a,
            b: r.b,
            pos_a: normalize_position(r.pos_a, world),
            pos_b: normalize_position(r.pos_b, world),
            dist: r.dist,
            rel_speed: r.rel_speed,
        })
        .collect();
    CollisionSnapshot {
        frame,
        true_count,
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(x: f32, y: f32) -> CollisionRecord {
        CollisionRecord {
            a: 0,
            b: 1,
            pos_a: [x, y],
            pos_b: [x, y],
            dist: 1.0,
            rel_speed: 2.0,
        }
    }

    #[test]
    fn record_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<CollisionRecord>(), 32);
    }

    #[test]
    fn harvest_caps_at_capacity() {
        // Kernel reported 5 true events but only 2 slots existed.
        let raw = vec![record_at(0.0, 0.0), record_at(512.0, 384.0)];
        let snap = harvest(5, &raw, 2, [1024.0, 768.0], 7);
        assert_eq!(snap.records.len(), 2);
        assert_eq!(snap.true_count, 5, "true count preserved for telemetry");
        assert_eq!(snap.frame, 7);
    }

    #[test]
    fn harvest_quiet_frame() {
        let raw = vec![record_at(0.0, 0.0); 8];
        let snap = harvest(3, &raw, 8, [1024.0, 768.0], 0);
        assert_eq!(snap.records.len(), 3, "only count records are real");
    }

    #[test]
    fn harvest_normalizes_to_unit_square() {
        let world = [1024.0, 768.0];
        let raw = vec![
            record_at(0.0, 0.0),
            record_at(1024.0, 768.0),
            record_at(512.0, 384.0),
        ];
        let snap = harvest(3, &raw, 8, world, 0);
        assert_eq!(snap.records[0].pos_a, [-1.0, -1.0]);
        assert_eq!(snap.records[1].pos_a, [1.0, 1.0]);
        assert!(snap.records[2].pos_a[0].abs() < 1e-6);
        assert!(snap.records[2].pos_a[1].abs() < 1e-6);
        for r in &snap.records {
            assert!(r.pos_a[0].abs() <= 1.0 && r.pos_a[1].abs() <= 1.0);
        }
    }

    #[test]
    fn empty_snapshot_is_zero() {
        let snap = CollisionSnapshot::empty(12);
        assert_eq!(snap.frame, 12);
        assert_eq!(snap.true_count, 0);
        assert!(snap.records.is_empty());
    }
}
