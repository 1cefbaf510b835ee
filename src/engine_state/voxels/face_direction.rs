//! # Face Direction Module
//!
//! This module defines the six faces of a voxel and the fixed order in which the
//! mesher emits them. The numeric value of each variant is the direction part of a
//! face code (`direction + layer * 6`), so the order is part of the renderer contract.

use cgmath::{Matrix3, Point3, Vector3};
use num_derive::FromPrimitive;

/// Represents the six possible faces of a voxel.
///
/// The order is: [FRONT, TOP, BOTTOM, LEFT, RIGHT, BACK]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum FaceDirection {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The top face (facing positive Y)
    TOP = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The left face (facing negative X)
    LEFT = 3,

    /// The right face (facing positive X)
    RIGHT = 4,

    /// The back face (facing negative Z)
    BACK = 5,
}

/// Rotations taking the unit quad (which faces +Z) onto each face, indexed by
/// `FaceDirection as usize`. Columns are the images of the local X, Y and Z axes.
#[rustfmt::skip]
const FACE_ROTATIONS: [[[f32; 3]; 3]; 6] = [
    // FRONT: identity
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    // TOP: -90 degrees around X
    [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]],
    // BOTTOM: 90 degrees around X
    [[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]],
    // LEFT: -90 degrees around Y
    [[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]],
    // RIGHT: 90 degrees around Y
    [[0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]],
    // BACK: 180 degrees around Y
    [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]],
];

impl FaceDirection {
    /// Returns an array containing all six faces in emission order.
    ///
    /// The order is: [FRONT, TOP, BOTTOM, LEFT, RIGHT, BACK]
    pub fn all() -> [FaceDirection; 6] {
        [
            FaceDirection::FRONT,
            FaceDirection::TOP,
            FaceDirection::BOTTOM,
            FaceDirection::LEFT,
            FaceDirection::RIGHT,
            FaceDirection::BACK,
        ]
    }

    /// Converts a face code (or a bare direction index) to its direction.
    ///
    /// # Arguments
    /// * `code` - A face code as stored in a face instance; the layer part is discarded
    pub fn from_code(code: u32) -> FaceDirection {
        // `code % 6` is always a valid discriminant.
        num::FromPrimitive::from_u32(code % 6).unwrap_or(FaceDirection::FRONT)
    }

    /// The grid offset from a voxel to its neighbor across this face.
    pub fn offset(&self) -> Vector3<i32> {
        match self {
            FaceDirection::FRONT => Vector3::new(0, 0, 1),
            FaceDirection::TOP => Vector3::new(0, 1, 0),
            FaceDirection::BOTTOM => Vector3::new(0, -1, 0),
            FaceDirection::LEFT => Vector3::new(-1, 0, 0),
            FaceDirection::RIGHT => Vector3::new(1, 0, 0),
            FaceDirection::BACK => Vector3::new(0, 0, -1),
        }
    }

    /// The neighbor of `position` across this face.
    pub fn neighbor(&self, position: Point3<i32>) -> Point3<i32> {
        position + self.offset()
    }

    /// The outward unit normal of this face.
    pub fn normal(&self) -> Vector3<f32> {
        self.offset().cast::<f32>().unwrap_or(Vector3::new(0.0, 0.0, 1.0))
    }

    /// The rotation taking a +Z facing unit quad onto this face.
    pub fn rotation(&self) -> Matrix3<f32> {
        let [x, y, z] = FACE_ROTATIONS[*self as usize];
        Matrix3::from_cols(x.into(), y.into(), z.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotations_map_quad_normal_onto_face_normal() {
        for face in FaceDirection::all() {
            let rotated = face.rotation() * Vector3::new(0.0, 0.0, 1.0);
            assert_eq!(rotated, face.normal(), "{:?}", face);
        }
    }

    #[test]
    fn face_codes_decode_to_direction() {
        assert_eq!(FaceDirection::from_code(0), FaceDirection::FRONT);
        assert_eq!(FaceDirection::from_code(4), FaceDirection::RIGHT);
        assert_eq!(FaceDirection::from_code(6 * 3 + 5), FaceDirection::BACK);
    }

    #[test]
    fn opposite_faces_cancel_out() {
        let origin = Point3::new(3, 4, 5);
        let front = FaceDirection::FRONT.neighbor(origin);
        assert_eq!(FaceDirection::BACK.neighbor(front), origin);
        let top = FaceDirection::TOP.neighbor(origin);
        assert_eq!(FaceDirection::BOTTOM.neighbor(top), origin);
        let left = FaceDirection::LEFT.neighbor(origin);
        assert_eq!(FaceDirection::RIGHT.neighbor(left), origin);
    }
}
