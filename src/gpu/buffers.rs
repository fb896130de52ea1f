// SPDX-License-Identifier: AGPL-3.0-only

//! GPU buffer creation, upload, and readback.
//!
//! All simulation data is f32/u32; host structs are `bytemuck::Pod`
//! mirrors of the WGSL layouts so uploads and readbacks are plain casts.

use super::GpuContext;
use crate::SwarmError;

impl GpuContext {
    /// Create a read/write storage buffer initialized from Pod data.
    #[must_use]
    pub fn create_storage_buffer<T: bytemuck::Pod>(&self, data: &[T], label: &str) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;
        self.device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Create an uninitialized read/write storage buffer of `size` bytes.
    #[must_use]
    pub fn create_storage_buffer_empty(&self, size: usize, label: &str) -> wgpu::Buffer {
        self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Create a staging buffer for reading results back to the CPU.
    #[must_use]
    pub fn create_staging_buffer(&self, size: usize, label: &str) -> wgpu::Buffer {
        self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Create a uniform buffer from a single Pod value, writable from host.
    #[must_use]
    pub fn create_uniform_buffer<T: bytemuck::Pod>(&self, value: &T, label: &str) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;
        self.device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(value),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Upload Pod data to a GPU buffer (overwrites from offset 0).
    pub fn upload<T: bytemuck::Pod>(&self, buffer: &wgpu::Buffer, data: &[T]) {
        self.queue().write_buffer(buffer, 0, bytemuck::cast_slice(data));
    }

    /// Upload a single Pod value to a GPU buffer.
    pub fn upload_value<T: bytemuck::Pod>(&self, buffer: &wgpu::Buffer, value: &T) {
        self.queue().write_buffer(buffer, 0, bytemuck::bytes_of(value));
    }

    /// Read raw bytes from a staging buffer after a submitted copy.
    ///
    /// Blocks on `Maintain::Wait` — this is the pipeline's completion
    /// barrier: by the time it returns, the compute passes feeding the
    /// staging copy have finished.
    ///
    /// # Errors
    ///
    /// Returns [`SwarmError::BufferMap`] if the map callback fails or the
    /// channel is dropped.
    pub fn read_staging_bytes(&self, staging: &wgpu::Buffer) -> Result<Vec<u8>, SwarmError> {
        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device().poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| SwarmError::BufferMap("map callback channel recv failed".into()))?
            .map_err(|e| SwarmError::BufferMap(e.to_string()))?;

        let data = slice.get_mapped_range();
        let result = data.to_vec();
        drop(data);
        staging.unmap();
        Ok(result)
    }

    /// Read typed Pod data from a staging buffer after a submitted copy.
    ///
    /// # Errors
    ///
    /// Returns [`SwarmError::BufferMap`] on mapping failure.
    pub fn read_staging<T: bytemuck::Pod>(
        &self,
        staging: &wgpu::Buffer,
    ) -> Result<Vec<T>, SwarmError> {
        let bytes = self.read_staging_bytes(staging)?;
        Ok(bytes_to_pod(&bytes))
    }
}

/// Convert readback bytes to Pod values.
///
/// Mapped ranges are typically page-aligned, so `bytemuck::try_cast_slice`
/// succeeds; falls back to per-element unaligned reads if the allocation
/// landed off-alignment for `T`. Trailing bytes short of one element are
/// dropped.
pub(crate) fn bytes_to_pod<T: bytemuck::Pod>(data: &[u8]) -> Vec<T> {
    bytemuck::try_cast_slice(data).map_or_else(
        |_| {
            data.chunks_exact(std::mem::size_of::<T>())
                .map(bytemuck::pod_read_unaligned)
                .collect()
        },
        <[T]>::to_vec,
    )
}
