// SPDX-License-Identifier: AGPL-3.0-only

//! External scalar bias field (depth-camera data contract).
//!
//! The acquisition and background-subtraction pipeline lives outside
//! this core; what arrives here is a grayscale frame already reduced to
//! one scalar per texel, plus an offset+scale transform mapping world
//! coordinates into field-sample space. Absence of a frame is a valid,
//! common state — no bias is applied.

/// One frame of the depth field.
#[derive(Clone, Debug)]
pub struct DepthField {
    pub width: u32,
    pub height: u32,
    /// Row-major scalar samples, `width * height` values.
    pub values: Vec<f32>,
    /// World-space offset applied before scaling.
    pub offset: [f32; 2],
    /// World→field scale (samples per world unit).
    pub scale: [f32; 2],
}

impl DepthField {
    /// Build a field from an 8-bit grayscale frame, normalized to [0, 1].
    ///
    /// Returns `None` if the pixel count does not match the dimensions —
    /// a malformed frame is treated like an absent one.
    #[must_use]
    pub fn from_luma8(
        width: u32,
        height: u32,
        pixels: &[u8],
        offset: [f32; 2],
        scale: [f32; 2],
    ) -> Option<Self> {
        if pixels.len() != (width as usize) * (height as usize) || width == 0 || height == 0 {
            return None;
        }
        let values = pixels.iter().map(|&p| f32::from(p) / 255.0).collect();
        Some(Self {
            width,
            height,
            values,
            offset,
            scale,
        })
    }

    /// Clamped sample at world position `p` (the CPU mirror of the WGSL
    /// `sample_depth`, used by the reference step and tests).
    #[must_use]
    pub fn sample_world(&self, p: [f32; 2]) -> f32 {
        let fx = (p[0] + self.offset[0]) * self.scale[0];
        let fy = (p[1] + self.offset[1]) * self.scale[1];
        let x = (fx as i64).clamp(0, i64::from(self.width) - 1) as usize;
        let y = (fy as i64).clamp(0, i64::from(self.height) - 1) as usize;
        self.values[y * self.width as usize + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_luma8_normalizes() {
        let f = DepthField::from_luma8(2, 2, &[0, 255, 128, 64], [0.0, 0.0], [1.0, 1.0])
            .expect("valid frame");
        assert!((f.values[0] - 0.0).abs() < 1e-6);
        assert!((f.values[1] - 1.0).abs() < 1e-6);
        assert!((f.values[2] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn from_luma8_rejects_size_mismatch() {
        assert!(DepthField::from_luma8(2, 2, &[0, 1, 2], [0.0, 0.0], [1.0, 1.0]).is_none());
        assert!(DepthField::from_luma8(0, 2, &[], [0.0, 0.0], [1.0, 1.0]).is_none());
    }

    #[test]
    fn sample_world_clamps_out_of_range() {
        let f = DepthField::from_luma8(2, 1, &[10, 250], [0.0, 0.0], [1.0, 1.0])
            .expect("valid frame");
        // Far left and far right clamp to the edge texels.
        assert!((f.sample_world([-100.0, 0.0]) - 10.0 / 255.0).abs() < 1e-6);
        assert!((f.sample_world([100.0, 0.0]) - 250.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn sample_world_applies_transform() {
        // 4 texels wide; offset shifts world origin by 2 units, scale 1.
        let f = DepthField::from_luma8(4, 1, &[0, 51, 102, 153], [2.0, 0.0], [1.0, 1.0])
            .expect("valid frame");
        assert!((f.sample_world([0.0, 0.0]) - 102.0 / 255.0).abs() < 1e-6);
    }
}
