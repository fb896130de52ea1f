// SPDX-License-Identifier: AGPL-3.0-only

//! GPU compute plumbing for the simulation core.
//!
//! Creates a compute-only wgpu device and provides helpers for buffer
//! management and dispatch. No surface, no rendering — the visual side
//! of the system is an external collaborator.
//!
//! ## Adapter selection
//!
//! Explicit adapter targeting via `SWARM_MD_GPU_ADAPTER`:
//!
//! | Value | Behavior |
//! |-------|----------|
//! | `auto` | Prefer a discrete GPU |
//! | `0`, `1`, … | Select adapter by enumeration index |
//! | substring | Case-insensitive name match (e.g. `"4070"`) |
//! | *(unset)* | Same as `auto` |
//!
//! ## Module structure
//!
//! - `adapter` — adapter discovery and selection
//! - `buffers` — storage/uniform/staging buffer creation, upload, readback
//! - `dispatch` — bind groups, command encoding, dispatch

mod adapter;
mod buffers;
mod dispatch;

pub use adapter::AdapterInfo;
pub(crate) use buffers::bytes_to_pod;

use crate::SwarmError;

/// Compute-only GPU context for the simulation pipeline.
#[must_use]
pub struct GpuContext {
    pub adapter_name: String,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

// ── Core accessors ───────────────────────────────────────────────────

impl GpuContext {
    /// Access the underlying wgpu Device.
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Access the underlying wgpu Queue.
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

// ── Constructor ──────────────────────────────────────────────────────

impl GpuContext {
    /// Create the compute device.
    ///
    /// # Errors
    ///
    /// Returns [`SwarmError::NoAdapter`] if no adapter is found, or
    /// [`SwarmError::DeviceCreation`] if device creation fails.
    pub async fn new() -> Result<Self, SwarmError> {
        let selected = adapter::select_adapter()?;
        let adapter_info = selected.get_info();
        log::info!(
            "Using GPU adapter: {} ({:?})",
            adapter_info.name,
            adapter_info.device_type
        );

        let (device, queue) = selected
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("swarm-md compute device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| SwarmError::DeviceCreation(e.to_string()))?;

        Ok(Self {
            adapter_name: adapter_info.name,
            device,
            queue,
        })
    }

    /// Enumerate all available GPU adapters.
    #[must_use]
    pub fn enumerate_adapters() -> Vec<AdapterInfo> {
        adapter::enumerate_adapters()
    }
}

// ── Pipeline creation ────────────────────────────────────────────────

impl GpuContext {
    /// Create a compute pipeline from WGSL source with entry point `main`.
    ///
    /// Shader compilation errors surface through wgpu's error scope as a
    /// device loss; an invalid kernel at setup time is fatal to the
    /// simulation, so no dispatch is ever issued against it.
    #[must_use]
    pub fn create_pipeline(&self, shader_source: &str, label: &str) -> wgpu::ComputePipeline {
        let shader_module = self
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(shader_source.into()),
            });

        self.device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: None,
                module: &shader_module,
                entry_point: "main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
    }
}
