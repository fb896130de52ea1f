// SPDX-License-Identifier: AGPL-3.0-only

//! swarm-md — GPU particle-ensemble simulation and analysis core.
//!
//! Integrates an ensemble of Lennard-Jones point particles on the GPU
//! (f32 WGSL compute), harvests collision events from a bounded
//! device-side buffer, and derives per-frame statistics on the host:
//! spatial cluster analysis via union-find and a normalized velocity
//! autocorrelation curve over a rolling velocity history.
//!
//! ## Module structure
//!
//! - `gpu` — wgpu device plumbing: adapter selection, buffers, dispatch
//! - `sim` — the domain core: particle store, compute kernel, collision
//!   harvester, cluster analyzer, VAC ring, orchestrating simulator
//! - `error` — typed errors for GPU and setup failures
//!
//! ## Frame pipeline
//!
//! One host thread drives a strictly sequential per-frame pipeline:
//! upload (if host state changed) → dispatch three compute passes in a
//! single submission → blocking barrier → readback → collision harvest,
//! cluster analysis, VAC update. Consumers receive copy-out snapshots,
//! never references into buffers the next step will mutate.

pub mod error;
pub mod gpu;
pub mod sim;

pub use error::SwarmError;
pub use sim::simulator::Simulator;
