//! Ray queries against chunk face buffers.
//!
//! Faces carry no geometry. Each candidate face is rebuilt from its offset and the fixed
//! rotation of its direction, then its two triangles are tested with the Möller-Trumbore
//! algorithm. The chunk's bounding sphere rejects most rays before any face is visited.

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};

use super::{ChunkMesh, FaceInstance};

const EPSILON: f32 = 1e-6;

/// Corners of the unit quad facing +Z, centered on the voxel center.
const QUAD: [[f32; 3]; 4] = [
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

/// A half-line in world (voxel) space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Always unit length.
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Creates a ray, normalizing `direction`.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    /// The point `distance` along the ray.
    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction * distance
    }

    /// Whether the ray passes within `radius` of `center` in front of its origin.
    fn hits_sphere(&self, center: Point3<f32>, radius: f32) -> bool {
        let to_center = center - self.origin;
        let along = to_center.dot(self.direction);
        let squared_miss = to_center.magnitude2() - along * along;
        squared_miss <= radius * radius
            && (along >= 0.0 || to_center.magnitude2() <= radius * radius)
    }

    /// Möller-Trumbore intersection with one triangle.
    fn hits_triangle(&self, a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let determinant = edge1.dot(p);
        if determinant.abs() < EPSILON {
            return None;
        }
        let inverse = 1.0 / determinant;
        let t_vec = self.origin - a;
        let u = t_vec.dot(p) * inverse;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = t_vec.cross(edge1);
        let v = self.direction.dot(q) * inverse;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let distance = edge2.dot(q) * inverse;
        (distance > EPSILON).then_some(distance)
    }
}

/// The closest face of a chunk hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Chunk coordinates of the intersected chunk
    pub chunk: Point3<i32>,
    /// Index of the face in the chunk's face buffer
    pub face: usize,
    pub distance: f32,
    pub point: Point3<f32>,
    /// World space normal of the hit triangle
    pub normal: Vector3<f32>,
}

impl RaycastHit {
    /// The voxel whose face was hit.
    pub fn voxel(&self, mesh: &ChunkMesh) -> Option<Point3<i32>> {
        mesh.faces
            .get(self.face)
            .map(|face| mesh.origin + face.offset().to_vec())
    }
}

/// World space corners of `face` in a chunk whose lowest voxel is `origin`.
fn face_corners(face: &FaceInstance, origin: Point3<i32>) -> [Point3<f32>; 4] {
    let rotation = face.direction().rotation();
    let center = (origin + face.offset().to_vec()).map(|c| c as f32 + 0.5);
    QUAD.map(|corner| center + rotation * Vector3::from(corner))
}

impl ChunkMesh {
    /// Intersects `ray` with the chunk's front-facing faces.
    ///
    /// # Arguments
    /// * `ray` - The query ray in world space
    /// * `max_distance` - Hits further away than this are ignored
    ///
    /// # Returns
    /// The closest hit, or `None` when the ray misses the bounding sphere or every face.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RaycastHit> {
        if self.bounds.is_empty() {
            return None;
        }
        let world_center = self.bounds.center + self.origin.cast::<f32>()?.to_vec();
        if !ray.hits_sphere(world_center, self.bounds.radius) {
            return None;
        }

        let mut closest: Option<RaycastHit> = None;
        for (index, face) in self.faces.iter().enumerate() {
            let normal = face.direction().normal();
            if normal.dot(ray.direction) >= 0.0 {
                continue;
            }
            let [a, b, c, d] = face_corners(face, self.origin);
            let Some(distance) = ray
                .hits_triangle(a, b, c)
                .or_else(|| ray.hits_triangle(a, c, d))
            else {
                continue;
            };
            if distance > max_distance || closest.is_some_and(|hit| hit.distance <= distance) {
                continue;
            }
            closest = Some(RaycastHit {
                chunk: self.position,
                face: index,
                distance,
                point: ray.at(distance),
                normal,
            });
        }
        closest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        meshing::Mesher,
        voxels::{face_direction::FaceDirection, volume::Volume},
    };

    fn single_voxel_mesh() -> ChunkMesh {
        let mut volume = Volume::new(16, 16, 16, 8).unwrap();
        volume.update(Point3::new(10, 10, 10), 1, false);
        Mesher::new().mesh(&volume, Point3::new(1, 1, 1))
    }

    #[test]
    fn ray_from_above_hits_the_top_face() {
        let mesh = single_voxel_mesh();
        let ray = Ray::new(Point3::new(10.3, 20.0, 10.6), Vector3::new(0.0, -1.0, 0.0));
        let hit = mesh.raycast(&ray, 100.0).unwrap();

        assert_eq!(hit.chunk, Point3::new(1, 1, 1));
        assert_eq!(mesh.faces[hit.face].direction(), FaceDirection::TOP);
        assert_eq!(hit.normal, Vector3::new(0.0, 1.0, 0.0));
        assert!((hit.distance - 9.0).abs() < 1e-4);
        assert_eq!(hit.voxel(&mesh), Some(Point3::new(10, 10, 10)));
    }

    #[test]
    fn ray_from_the_side_hits_the_nearest_face() {
        let mesh = single_voxel_mesh();
        let ray = Ray::new(Point3::new(0.0, 10.25, 10.75), Vector3::new(1.0, 0.0, 0.0));
        let hit = mesh.raycast(&ray, 100.0).unwrap();
        assert_eq!(mesh.faces[hit.face].direction(), FaceDirection::LEFT);
        assert!((hit.point.x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn misses_and_range_limits() {
        let mesh = single_voxel_mesh();
        let away = Ray::new(Point3::new(10.5, 20.0, 10.5), Vector3::new(0.0, 1.0, 0.0));
        assert!(mesh.raycast(&away, 100.0).is_none());

        let beside = Ray::new(Point3::new(12.5, 20.0, 10.5), Vector3::new(0.0, -1.0, 0.0));
        assert!(mesh.raycast(&beside, 100.0).is_none());

        let down = Ray::new(Point3::new(10.3, 20.0, 10.6), Vector3::new(0.0, -1.0, 0.0));
        assert!(mesh.raycast(&down, 5.0).is_none());

        let empty = ChunkMesh::empty(Point3::new(0, 0, 0), 8);
        assert!(empty.raycast(&down, 100.0).is_none());
    }
}
