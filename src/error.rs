// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for GPU and simulation operations.
//!
//! Public APIs return this enum instead of `Result<_, String>` so callers
//! can pattern-match on failure modes (no adapter, device creation,
//! buffer mapping) rather than parsing opaque strings.

use std::fmt;

/// Errors arising from GPU initialization or the per-frame pipeline.
#[derive(Debug)]
pub enum SwarmError {
    /// No compatible GPU adapter was found by wgpu.
    NoAdapter,

    /// GPU device creation failed (wraps the underlying wgpu error message).
    DeviceCreation(String),

    /// A staging-buffer map for readback failed. Per-frame collision
    /// readbacks degrade to an empty snapshot instead of surfacing this;
    /// it is fatal only for the particle-state readback.
    BufferMap(String),

    /// Configuration rejected at setup time (e.g. zero pool capacity).
    InvalidConfig(String),
}

impl fmt::Display for SwarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAdapter => write!(f, "No GPU adapter found"),
            Self::DeviceCreation(e) => write!(f, "Failed to create GPU device: {e}"),
            Self::BufferMap(e) => write!(f, "GPU buffer mapping failed: {e}"),
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for SwarmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_no_adapter() {
        let err = SwarmError::NoAdapter;
        assert_eq!(err.to_string(), "No GPU adapter found");
    }

    #[test]
    fn display_device_creation() {
        let err = SwarmError::DeviceCreation("wgpu error".into());
        assert_eq!(err.to_string(), "Failed to create GPU device: wgpu error");
    }

    #[test]
    fn display_buffer_map() {
        let err = SwarmError::BufferMap("map_async cancelled".into());
        assert!(err.to_string().contains("mapping failed"));
    }

    #[test]
    fn display_invalid_config() {
        let err = SwarmError::InvalidConfig("pool capacity is zero".into());
        assert!(err.to_string().contains("pool capacity is zero"));
    }

    #[test]
    fn error_trait_works() {
        let err = SwarmError::NoAdapter;
        let dyn_err: &dyn std::error::Error = &err;
        assert_eq!(dyn_err.to_string(), "No GPU adapter found");
    }
}
