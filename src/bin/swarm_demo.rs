// SPDX-License-Identifier: AGPL-3.0-only

//! Headless swarm demo.
//!
//! Runs the full GPU pipeline for a fixed number of frames and prints
//! per-interval telemetry: temperature, collision counts, cluster
//! census, and the final velocity-autocorrelation curve.
//!
//! Environment:
//!   `SWARM_MD_GPU_ADAPTER`   adapter selection (auto | index | name substring)
//!   `SWARM_MD_WGPU_BACKEND`  backend override (vulkan | gl | metal | dx12)
//!   `SWARM_DEMO_FRAMES`      frame count (default 300)

use swarm_md::gpu::GpuContext;
use swarm_md::sim::config::SimConfig;
use swarm_md::Simulator;

fn main() {
    env_logger::init();

    let frames: u64 = std::env::var("SWARM_DEMO_FRAMES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(300);

    println!("═══════════════════════════════════════════════════════");
    println!(" swarm-md headless demo ({frames} frames)");
    println!("═══════════════════════════════════════════════════════");

    for adapter in GpuContext::enumerate_adapters() {
        println!("  {adapter}");
    }

    let config = SimConfig::default();
    println!(
        "\n  particles: {} active / {} pool, world {}x{}",
        config.active_count, config.pool_capacity, config.world[0], config.world[1]
    );
    println!(
        "  thermostat: target {} K, coupling {}",
        config.target_temperature, config.coupling
    );

    let mut sim = match Simulator::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("simulator init failed: {e}");
            std::process::exit(1);
        }
    };

    for frame in 0..frames {
        if let Err(e) = sim.step() {
            eprintln!("step {frame} failed: {e}");
            std::process::exit(1);
        }

        if frame % 60 == 0 || frame + 1 == frames {
            let temp = sim
                .energy_history()
                .last()
                .map_or(0.0, |r| r.temperature);
            let coll = sim.collisions();
            let clusters = sim.clusters();
            println!(
                "  frame {frame:>5}  T = {temp:>8.2}  collisions = {:>4} (recorded {})  clusters = {}",
                coll.true_count,
                coll.records.len(),
                clusters.clusters.len(),
            );
        }
    }

    let vac = sim.vac();
    if vac.values.is_empty() {
        println!("\n  VAC: not yet computed");
    } else {
        println!("\n  VAC (computed at frame {}):", vac.computed_at_frame);
        for (t, c) in vac.time_axis.iter().zip(&vac.values) {
            println!("    t = {t:>7.4}  C = {c:>8.4}");
        }
    }

    println!("\n  done: {} frames", sim.frame());
}
