// SPDX-License-Identifier: AGPL-3.0-only

//! Spatial cluster analysis over the active ensemble.
//!
//! Connectivity is by static pairwise proximity, independent of the
//! collision mechanism: particles within `connection_distance` of each
//! other are connected, and connected components form clusters. The
//! partition is found with a union-find (union-by-rank, iterative
//! path-compression find — no recursion), bounded O(n²) over at most
//! [`ANALYSIS_CEILING`] particles.
//!
//! The partition itself is deterministic for a given layout and
//! threshold. Cluster IDs follow root discovery order and are NOT stable
//! frame-to-frame even when the partition is unchanged; consumers must
//! not key long-lived state on them.

use serde::Serialize;

use crate::sim::config::{SimConfig, ANALYSIS_CEILING};
use crate::sim::particles::Particle;

/// Disjoint-set forest with union-by-rank and path compression.
#[derive(Debug)]
pub struct UnionFind {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// `n` singleton sets.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            rank: vec![0; n],
        }
    }

    /// Root of `i`'s set. Iterative two-pass path compression: find the
    /// root, then repoint every node on the walked path at it.
    pub fn find(&mut self, i: usize) -> usize {
        let mut root = i as u32;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut node = i as u32;
        while self.parent[node as usize] != root {
            let next = self.parent[node as usize];
            self.parent[node as usize] = root;
            node = next;
        }
        root as usize
    }

    /// Merge the sets containing `a` and `b` (union by rank; on equal
    /// rank the first argument's root wins and gains rank).
    pub fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb as u32,
            std::cmp::Ordering::Greater => self.parent[rb] = ra as u32,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra as u32;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Statistics for one retained cluster.
#[derive(Clone, Debug, Serialize)]
pub struct ClusterStats {
    /// Discovery-order ID within this frame; not stable across frames.
    pub id: u32,
    pub member_count: u32,
    /// Center of mass, normalized to `[-1, 1]²`.
    pub center_position: [f32; 2],
    /// RMS distance from center, relative to the world diagonal.
    pub spatial_spread: f32,
    /// Mean velocity in world units.
    pub average_velocity: [f32; 2],
    /// RMS deviation from the mean velocity.
    pub velocity_spread: f32,
    pub frame_number: u64,
}

/// Per-frame cluster analysis result (copy-out snapshot).
#[derive(Clone, Debug, Default, Serialize)]
pub struct ClusterAnalysisSnapshot {
    pub frame: u64,
    pub clusters: Vec<ClusterStats>,
}

impl ClusterAnalysisSnapshot {
    #[must_use]
    pub fn empty(frame: u64) -> Self {
        Self {
            frame,
            clusters: Vec::new(),
        }
    }
}

/// Run the cluster analysis for one frame.
///
/// Restricts itself to the first `min(active, ANALYSIS_CEILING)`
/// particles, unions every pair within `connection_distance`, groups by
/// root in discovery order, discards groups below `min_cluster_size`,
/// and keeps at most `max_clusters_per_frame` groups. Skips entirely
/// (zero clusters) when the active set cannot contain a cluster.
#[must_use]
pub fn analyze(particles: &[Particle], config: &SimConfig, frame: u64) -> ClusterAnalysisSnapshot {
    if particles.len() < config.min_cluster_size {
        return ClusterAnalysisSnapshot::empty(frame);
    }
    let n = particles.len().min(ANALYSIS_CEILING);
    let threshold_sq = config.connection_distance * config.connection_distance;

    let mut uf = UnionFind::new(n);
    for i in 0..n {
        let pi = particles[i].position;
        for (j, pj) in particles.iter().enumerate().take(n).skip(i + 1) {
            let dx = pi[0] - pj.position[0];
            let dy = pi[1] - pj.position[1];
            if dx * dx + dy * dy <= threshold_sq {
                uf.union(i, j);
            }
        }
    }

    // Group member indices by root, preserving discovery order of roots.
    let mut root_order: Vec<usize> = Vec::new();
    let mut groups: std::collections::HashMap<usize, Vec<usize>> = std::collections::HashMap::new();
    for i in 0..n {
        let root = uf.find(i);
        let group = groups.entry(root).or_insert_with(|| {
            root_order.push(root);
            Vec::new()
        });
        group.push(i);
    }

    let mut clusters = Vec::new();
    for root in root_order {
        if clusters.len() >= config.max_clusters_per_frame {
            break;
        }
        let members = &groups[&root];
        if members.len() < config.min_cluster_size {
            continue;
        }
        clusters.push(cluster_stats(
            clusters.len() as u32,
            members,
            particles,
            config,
            frame,
        ));
    }

    ClusterAnalysisSnapshot { frame, clusters }
}

fn cluster_stats(
    id: u32,
    members: &[usize],
    particles: &[Particle],
    config: &SimConfig,
    frame: u64,
) -> ClusterStats {
    let count = members.len() as f32;

    let mut center = [0.0f32; 2];
    let mut mean_v = [0.0f32; 2];
    for &i in members {
        center[0] += particles[i].position[0];
        center[1] += particles[i].position[1];
        mean_v[0] += particles[i].velocity[0];
        mean_v[1] += particles[i].velocity[1];
    }
    center[0] /= count;
    center[1] /= count;
    mean_v[0] /= count;
    mean_v[1] /= count;

    let mut pos_var = 0.0f32;
    let mut vel_var = 0.0f32;
    for &i in members {
        let dx = particles[i].position[0] - center[0];
        let dy = particles[i].position[1] - center[1];
        pos_var += dx * dx + dy * dy;
        let dvx = particles[i].velocity[0] - mean_v[0];
        let dvy = particles[i].velocity[1] - mean_v[1];
        vel_var += dvx * dvx + dvy * dvy;
    }
    let spatial_rms = (pos_var / count).sqrt();
    let velocity_rms = (vel_var / count).sqrt();

    ClusterStats {
        id,
        member_count: members.len() as u32,
        center_position: [
            (center[0] / config.world[0]).mul_add(2.0, -1.0),
            (center[1] / config.world[1]).mul_add(2.0, -1.0),
        ],
        spatial_spread: spatial_rms / config.world_diagonal(),
        average_velocity: mean_v,
        velocity_spread: velocity_rms,
        frame_number: frame,
    }
}
