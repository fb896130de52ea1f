// SPDX-License-Identifier: AGPL-3.0-only

//! Host side of the device-resident simulation step.
//!
//! Models the host/device boundary as an explicit two-phase protocol:
//! the host owns mirror data (`ParticleStore`), the device owns buffers
//! identified by handles here, and the only operations across the
//! boundary are upload, dispatch, barrier, and download. Host and device
//! memory are never aliased.
//!
//! One step = one command encoder with up to three passes (forces,
//! integration, collisions) plus staging copies, submitted once. The
//! blocking readback is the pipeline's only suspension point.

use crate::gpu::GpuContext;
use crate::sim::collisions::CollisionRecord;
use crate::sim::config::SimConfig;
use crate::sim::depth_field::DepthField;
use crate::sim::particles::Particle;
use crate::sim::shaders;
use crate::SwarmError;

use bytemuck::{Pod, Zeroable};

/// Host mirror of the WGSL `Params` uniform (80 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct StepParams {
    pub n: u32,
    pub record_collisions: u32,
    pub depth_enabled: u32,
    pub max_collisions: u32,
    pub dt: f32,
    pub epsilon: f32,
    pub cutoff_sq: f32,
    pub max_force: f32,
    pub world: [f32; 2],
    pub thermo_scale: f32,
    pub depth_scale: f32,
    pub depth_offset: [f32; 2],
    pub depth_field_scale: [f32; 2],
    pub depth_dims: [u32; 2],
    pub _pad: [u32; 2],
}

/// Result of one device step after the completion barrier.
#[derive(Debug, Default)]
pub struct StepOutput {
    /// Updated active particle state, synced back to the host.
    pub particles: Vec<Particle>,
    /// True collision event count (atomic counter value).
    pub collision_count: u32,
    /// Materialized collision records, at most the buffer capacity.
    pub collisions: Vec<CollisionRecord>,
}

/// Device-resident compute kernel: pipelines and buffers for the
/// three-pass step.
pub struct ComputeKernel {
    gpu: GpuContext,
    force_pipeline: wgpu::ComputePipeline,
    integrate_pipeline: wgpu::ComputePipeline,
    collide_pipeline: wgpu::ComputePipeline,
    particle_buf: wgpu::Buffer,
    force_buf: wgpu::Buffer,
    collision_buf: wgpu::Buffer,
    depth_buf: wgpu::Buffer,
    params_buf: wgpu::Buffer,
    particle_staging: wgpu::Buffer,
    collision_staging: wgpu::Buffer,
    pool_capacity: usize,
    max_collisions: usize,
    depth_dims: [u32; 2],
    depth_offset: [f32; 2],
    depth_scale_xy: [f32; 2],
    depth_enabled: bool,
}

/// Collision buffer header is `count: atomic<u32>` + pad, 8 bytes.
const COLLISION_HEADER_BYTES: usize = 8;
const PARTICLE_BYTES: usize = std::mem::size_of::<Particle>();
const RECORD_BYTES: usize = std::mem::size_of::<CollisionRecord>();

impl ComputeKernel {
    /// Build pipelines and allocate device buffers for `pool_capacity`
    /// particles and `max_collisions` collision slots.
    ///
    /// A shader build failure here is fatal to the simulation: no step
    /// is ever dispatched against an invalid kernel.
    ///
    /// # Errors
    ///
    /// Returns [`SwarmError::InvalidConfig`] for a zero-sized pool.
    pub fn new(
        gpu: GpuContext,
        pool_capacity: usize,
        max_collisions: usize,
    ) -> Result<Self, SwarmError> {
        if pool_capacity == 0 {
            return Err(SwarmError::InvalidConfig("pool capacity is zero".into()));
        }

        let force_pipeline = gpu.create_pipeline(shaders::SHADER_LJ_FORCE, "lj_force");
        let integrate_pipeline = gpu.create_pipeline(shaders::SHADER_INTEGRATE, "integrate");
        let collide_pipeline = gpu.create_pipeline(shaders::SHADER_COLLIDE, "collide");

        let particle_buf =
            gpu.create_storage_buffer_empty(pool_capacity * PARTICLE_BYTES, "particles");
        let force_buf = gpu.create_storage_buffer_empty(pool_capacity * 8, "forces");
        let collision_bytes = COLLISION_HEADER_BYTES + max_collisions.max(1) * RECORD_BYTES;
        let collision_buf = gpu.create_storage_buffer_empty(collision_bytes, "collisions");
        // One-texel placeholder so the binding is always valid; replaced
        // when a real field arrives.
        let depth_buf = gpu.create_storage_buffer(&[0.0f32], "depth_field");
        let params_buf = gpu.create_uniform_buffer(&StepParams::default(), "step_params");
        let particle_staging =
            gpu.create_staging_buffer(pool_capacity * PARTICLE_BYTES, "particle_staging");
        let collision_staging = gpu.create_staging_buffer(collision_bytes, "collision_staging");

        Ok(Self {
            gpu,
            force_pipeline,
            integrate_pipeline,
            collide_pipeline,
            particle_buf,
            force_buf,
            collision_buf,
            depth_buf,
            params_buf,
            particle_staging,
            collision_staging,
            pool_capacity,
            max_collisions,
            depth_dims: [1, 1],
            depth_offset: [0.0, 0.0],
            depth_scale_xy: [1.0, 1.0],
            depth_enabled: false,
        })
    }

    /// Upload host particle state into the device buffer.
    pub fn upload_particles(&self, particles: &[Particle]) {
        let n = particles.len().min(self.pool_capacity);
        self.gpu.upload(&self.particle_buf, &particles[..n]);
    }

    /// Install or clear the depth bias field for subsequent steps.
    ///
    /// The buffer is recreated only when the sample count changes.
    pub fn set_depth_field(&mut self, field: Option<&DepthField>) {
        match field {
            Some(f) => {
                let count = (f.width as usize) * (f.height as usize);
                let current = (self.depth_dims[0] as usize) * (self.depth_dims[1] as usize);
                if count != current || !self.depth_enabled {
                    self.depth_buf = self.gpu.create_storage_buffer(&f.values, "depth_field");
                } else {
                    self.gpu.upload(&self.depth_buf, &f.values);
                }
                self.depth_dims = [f.width, f.height];
                self.depth_offset = f.offset;
                self.depth_scale_xy = f.scale;
                self.depth_enabled = true;
            }
            None => {
                self.depth_enabled = false;
            }
        }
    }

    /// Run one device step for `n` active particles and sync results back.
    ///
    /// Dispatch → barrier → download, one submission. With `n == 0` the
    /// kernel is not dispatched and an empty output is returned.
    ///
    /// A particle readback fault is fatal (the caller cannot continue
    /// from unknown state). A collision readback fault degrades to zero
    /// collisions for the frame, logged.
    ///
    /// # Errors
    ///
    /// Returns [`SwarmError::BufferMap`] if the particle readback fails.
    pub fn step(
        &self,
        config: &SimConfig,
        n: usize,
        thermo_scale: f32,
    ) -> Result<StepOutput, SwarmError> {
        let n = n.min(self.pool_capacity);
        if n == 0 {
            return Ok(StepOutput::default());
        }

        let record_collisions = config.record_collisions
            && config.max_collisions_per_frame.min(self.max_collisions) > 0;
        let params = StepParams {
            n: n as u32,
            record_collisions: u32::from(record_collisions),
            depth_enabled: u32::from(self.depth_enabled && config.depth_field_scale != 0.0),
            max_collisions: config.max_collisions_per_frame.min(self.max_collisions) as u32,
            dt: config.dt,
            epsilon: config.epsilon,
            cutoff_sq: config.cutoff * config.cutoff,
            max_force: config.max_force,
            world: config.world,
            thermo_scale,
            depth_scale: config.depth_field_scale,
            depth_offset: self.depth_offset,
            depth_field_scale: self.depth_scale_xy,
            depth_dims: self.depth_dims,
            _pad: [0, 0],
        };
        self.gpu.upload_value(&self.params_buf, &params);

        // Reset the collision header; the records themselves are
        // overwritten lazily by the claim-a-slot protocol.
        self.gpu
            .queue()
            .write_buffer(&self.collision_buf, 0, &[0u8; COLLISION_HEADER_BYTES]);

        let force_bg = self.gpu.create_bind_group(
            &self.force_pipeline,
            &[
                &self.particle_buf,
                &self.force_buf,
                &self.depth_buf,
                &self.params_buf,
            ],
        );
        let integrate_bg = self.gpu.create_bind_group(
            &self.integrate_pipeline,
            &[&self.particle_buf, &self.force_buf, &self.params_buf],
        );
        let collide_bg = self.gpu.create_bind_group(
            &self.collide_pipeline,
            &[&self.particle_buf, &self.collision_buf, &self.params_buf],
        );

        let workgroups = n.div_ceil(64) as u32;
        let mut encoder = self.gpu.begin_encoder("sim_step");
        GpuContext::encode_pass(&mut encoder, &self.force_pipeline, &force_bg, workgroups);
        GpuContext::encode_pass(
            &mut encoder,
            &self.integrate_pipeline,
            &integrate_bg,
            workgroups,
        );
        if record_collisions {
            GpuContext::encode_pass(&mut encoder, &self.collide_pipeline, &collide_bg, workgroups);
        }
        encoder.copy_buffer_to_buffer(
            &self.particle_buf,
            0,
            &self.particle_staging,
            0,
            (n * PARTICLE_BYTES) as u64,
        );
        let collision_bytes =
            (COLLISION_HEADER_BYTES + self.max_collisions.max(1) * RECORD_BYTES) as u64;
        encoder.copy_buffer_to_buffer(
            &self.collision_buf,
            0,
            &self.collision_staging,
            0,
            collision_bytes,
        );
        self.gpu.submit_encoder(encoder);

        // Barrier + download. Particle sync is load-bearing for the next
        // frame; collisions degrade gracefully.
        let mut particles: Vec<Particle> = self.gpu.read_staging(&self.particle_staging)?;
        particles.truncate(n);

        let (collision_count, collisions) = match self.gpu.read_staging_bytes(&self.collision_staging)
        {
            Ok(bytes) => parse_collision_buffer(&bytes, self.max_collisions),
            Err(e) => {
                log::warn!("collision readback failed, reporting zero for this frame: {e}");
                (0, Vec::new())
            }
        };

        Ok(StepOutput {
            particles,
            collision_count,
            collisions,
        })
    }
}

/// Split raw collision-buffer bytes into (true count, materialized records).
///
/// Reads the header first; only `min(count, capacity)` records are real.
fn parse_collision_buffer(bytes: &[u8], capacity: usize) -> (u32, Vec<CollisionRecord>) {
    if bytes.len() < COLLISION_HEADER_BYTES {
        return (0, Vec::new());
    }
    let mut count_bytes = [0u8; 4];
    count_bytes.copy_from_slice(&bytes[..4]);
    let count = u32::from_le_bytes(count_bytes);

    let materialized = (count as usize).min(capacity);
    let available = (bytes.len() - COLLISION_HEADER_BYTES) / RECORD_BYTES;
    let materialized = materialized.min(available);
    // The readback Vec is not guaranteed f32-aligned at the record offset.
    let records = crate::gpu::bytes_to_pod(
        &bytes[COLLISION_HEADER_BYTES..COLLISION_HEADER_BYTES + materialized * RECORD_BYTES],
    );
    (count, records)
}
