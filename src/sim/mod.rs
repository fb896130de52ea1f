// SPDX-License-Identifier: AGPL-3.0-only

//! Particle-ensemble simulation core.
//!
//! Per-frame data flow:
//!
//! ```text
//! ParticleStore → ComputeKernel (device) → barrier →
//!     CollisionHarvester + ClusterAnalyzer + VelocityRing (host) →
//!     copy-out snapshots
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `config` | configuration value object + change notifications |
//! | `particles` | fixed-capacity pool with resizable active window |
//! | `kernel` | device-resident step: forces, integration, collisions |
//! | `shaders` | WGSL kernel sources |
//! | `collisions` | bounded collision buffer harvest + normalization |
//! | `clusters` | union-find spatial cluster statistics |
//! | `vac` | velocity-history ring + autocorrelation curve |
//! | `depth_field` | external scalar bias field (depth camera contract) |
//! | `cpu_reference` | pure-Rust step with identical semantics, for parity |
//! | `simulator` | orchestrator owning the whole pipeline |

pub mod collisions;
pub mod clusters;
pub mod config;
pub mod cpu_reference;
pub mod depth_field;
pub mod kernel;
pub mod particles;
pub mod shaders;
pub mod simulator;
pub mod vac;
