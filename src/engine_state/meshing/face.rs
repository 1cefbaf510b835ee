//! Face instance data for instanced voxel rendering.
//!
//! A chunk's face buffer is a flat array of [`FaceInstance`]s, one per visible voxel face.
//! The renderer draws one unit quad per instance, rotated by the face direction and moved to
//! the instance offset, so no per-face geometry or matrices are stored.

use cgmath::Point3;

use crate::engine_state::voxels::{face_direction::FaceDirection, volume::MAX_LIGHT};

/// Number of light channels carried by each face: sky light plus three local sources.
pub const LIGHT_CHANNELS: usize = 4;

/// Highest material layer a face code can hold. Larger layers are clamped to it.
pub const MAX_LAYER: u32 = (u32::MAX - 5) / 6;

/// One visible voxel face.
///
/// # Memory Layout
/// - Offset: 3x i32, chunk-local voxel coordinates (12 bytes)
/// - Face code: u32, `direction + layer * 6` (4 bytes)
/// - Light: 4x u8, intensities in `0..=32` (4 bytes)
///
/// Total size: 20 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FaceInstance {
    /// Voxel position local to the chunk
    offset: [i32; 3],
    /// Direction in the low part, material layer in the high part
    face_code: u32,
    /// Channel 0 is sky light, channels 1..=3 are local light sources
    light: [u8; LIGHT_CHANNELS],
}

impl FaceInstance {
    /// Creates a face instance.
    ///
    /// # Arguments
    /// * `offset` - Position of the emitting voxel relative to the chunk origin
    /// * `direction` - Which face of the voxel is visible
    /// * `layer` - Material layer (texture array slice) chosen by the mapping function,
    ///   clamped to [`MAX_LAYER`]
    /// * `light` - Light intensity per channel
    pub fn new(
        offset: Point3<i32>,
        direction: FaceDirection,
        layer: u32,
        light: [u8; LIGHT_CHANNELS],
    ) -> Self {
        FaceInstance {
            offset: [offset.x, offset.y, offset.z],
            face_code: direction as u32 + layer.min(MAX_LAYER) * 6,
            light,
        }
    }

    /// Position of the emitting voxel relative to the chunk origin.
    pub fn offset(&self) -> Point3<i32> {
        Point3::new(self.offset[0], self.offset[1], self.offset[2])
    }

    pub fn face_code(&self) -> u32 {
        self.face_code
    }

    pub fn direction(&self) -> FaceDirection {
        FaceDirection::from_code(self.face_code)
    }

    pub fn layer(&self) -> u32 {
        self.face_code / 6
    }

    pub fn light(&self) -> [u8; LIGHT_CHANNELS] {
        self.light
    }

    /// Light channels scaled to `0.0..=1.0`.
    pub fn normalized_light(&self) -> [f32; LIGHT_CHANNELS] {
        self.light.map(|channel| channel as f32 / MAX_LIGHT as f32)
    }
}
