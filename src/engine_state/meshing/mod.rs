//! # Meshing Module
//!
//! Turns the voxels of one chunk into an instanced face buffer.
//!
//! A face is emitted for every solid voxel side whose neighbor is inside the volume and empty.
//! Neighbors are looked up in global voxel coordinates, so faces on chunk borders are culled
//! against the adjacent chunk's voxels. Sides on the outer boundary of the volume have no
//! in-bounds neighbor and are never emitted; worlds are expected to be sealed at the edges.
//!
//! The result is a [`ChunkMesh`]: the faces, the chunk-local bounding sphere of every cell that
//! emitted a face (for culling and as a picking early-out) and a count of zero for chunks with
//! nothing to draw.
//!
//! # Architecture
//! - [`Mesher`]: holds the material mapping and light sampling policy, meshes chunks
//! - [`FaceInstance`]: the per-face record handed to the renderer
//! - [`raycast`]: ray queries against a finished [`ChunkMesh`]

mod face;
pub mod raycast;

use cgmath::{EuclideanSpace, MetricSpace, Point3};
use log::trace;
use web_time::Instant;

use crate::engine_state::voxels::{
    face_direction::FaceDirection,
    volume::{VoxelBox, Volume, EMPTY},
};

pub use face::{FaceInstance, LIGHT_CHANNELS, MAX_LAYER};
pub use raycast::{Ray, RaycastHit};

/// Chooses the material layer of a face from its direction, voxel value and global position.
pub type MaterialMapping = Box<dyn Fn(FaceDirection, u8, Point3<i32>) -> u32 + Send + Sync>;

/// Where the light channels of a face are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightSampling {
    /// The emitting voxel's own cell. Solid cells hold no light, so renderers using this mode
    /// shade faces from their ambient term only.
    #[default]
    Voxel,
    /// The empty cell the face opens onto.
    Neighbor,
}

/// Sphere enclosing the cells of a chunk that emitted faces, in chunk-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Point3<f32>,
    /// Negative for a chunk without faces.
    pub radius: f32,
}

impl BoundingSphere {
    /// The sphere of a chunk without faces.
    pub fn empty() -> Self {
        BoundingSphere {
            center: Point3::origin(),
            radius: -1.0,
        }
    }

    /// The sphere circumscribing the cells of `cells`.
    fn enclosing(cells: &VoxelBox) -> Self {
        if cells.is_empty() {
            return Self::empty();
        }
        let min = cells.min.cast::<f32>().unwrap_or(Point3::origin());
        let max = cells.max.map(|c| c as f32 + 1.0);
        let center = min.midpoint(max);
        BoundingSphere {
            center,
            radius: center.distance(max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }
}

/// The derived render data of one chunk. Replaced wholesale on every remesh.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMesh {
    /// Chunk coordinates
    pub position: Point3<i32>,
    /// Voxel coordinates of the chunk's lowest corner
    pub origin: Point3<i32>,
    pub bounds: BoundingSphere,
    pub faces: Vec<FaceInstance>,
}

impl ChunkMesh {
    /// A mesh with no faces for the chunk at `position`.
    pub fn empty(position: Point3<i32>, chunk_size: u32) -> Self {
        ChunkMesh {
            position,
            origin: position * chunk_size as i32,
            bounds: BoundingSphere::empty(),
            faces: Vec::new(),
        }
    }

    /// Number of faces; zero means the chunk is invisible.
    pub fn count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// The face buffer as raw bytes, ready for upload.
    pub fn face_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.faces)
    }
}

/// Builds face buffers for chunks of a [`Volume`].
pub struct Mesher {
    mapping: MaterialMapping,
    light_sampling: LightSampling,
}

impl Default for Mesher {
    fn default() -> Self {
        Mesher {
            mapping: Box::new(default_mapping),
            light_sampling: LightSampling::default(),
        }
    }
}

impl std::fmt::Debug for Mesher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesher")
            .field("light_sampling", &self.light_sampling)
            .finish_non_exhaustive()
    }
}

/// Material layer `value - 1`, so material 1 maps to the first texture layer.
pub fn default_mapping(_direction: FaceDirection, value: u8, _position: Point3<i32>) -> u32 {
    (value as u32).saturating_sub(1)
}

impl Mesher {
    /// Creates a mesher with the default material mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the material mapping.
    ///
    /// # Arguments
    /// * `mapping` - Called as `(direction, voxel value, global position)` for every emitted face.
    ///   Layers above [`MAX_LAYER`] are clamped.
    pub fn with_mapping<F>(mut self, mapping: F) -> Self
    where
        F: Fn(FaceDirection, u8, Point3<i32>) -> u32 + Send + Sync + 'static,
    {
        self.mapping = Box::new(mapping);
        self
    }

    pub fn with_light_sampling(mut self, light_sampling: LightSampling) -> Self {
        self.light_sampling = light_sampling;
        self
    }

    pub fn light_sampling(&self) -> LightSampling {
        self.light_sampling
    }

    /// Meshes the chunk at chunk coordinates `chunk`.
    ///
    /// # Arguments
    /// * `volume` - The voxel data; read only
    /// * `chunk` - Chunk coordinates (voxel coordinates divided by the chunk size)
    ///
    /// # Returns
    /// The chunk's faces in voxel order (x fastest, then y, then z), each voxel's faces in
    /// [`FaceDirection::all`] order. Chunks outside the volume yield an empty mesh.
    pub fn mesh(&self, volume: &Volume, chunk: Point3<i32>) -> ChunkMesh {
        let start = Instant::now();
        let size = volume.chunk_size() as i32;
        let mut mesh = ChunkMesh::empty(chunk, volume.chunk_size());
        let origin = mesh.origin;
        if volume.voxel(origin).is_none() {
            return mesh;
        }

        let mut cells = VoxelBox::empty();
        for z in 0..size {
            for y in 0..size {
                for x in 0..size {
                    let local = Point3::new(x, y, z);
                    let global = origin + local.to_vec();
                    let value = volume.get(global);
                    if value == EMPTY {
                        continue;
                    }
                    for direction in FaceDirection::all() {
                        let neighbor = direction.neighbor(global);
                        let Some(neighbor_index) = volume.voxel(neighbor) else {
                            continue;
                        };
                        if volume.voxels()[neighbor_index] != EMPTY {
                            continue;
                        }
                        let sample = match self.light_sampling {
                            LightSampling::Voxel => volume.light_at(global),
                            LightSampling::Neighbor => volume.light()[neighbor_index],
                        };
                        let layer = (self.mapping)(direction, value, global);
                        let light = [sample, 0, 0, 0];
                        mesh.faces.push(FaceInstance::new(local, direction, layer, light));
                        cells.include(local);
                    }
                }
            }
        }
        mesh.bounds = BoundingSphere::enclosing(&cells);

        trace!(
            "Meshed chunk {:?}: {} faces in {:?}",
            chunk,
            mesh.count(),
            start.elapsed()
        );
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::volume::MAX_LIGHT;

    fn filled(volume: &mut Volume, min: Point3<i32>, max: Point3<i32>, value: u8) {
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    volume.update(Point3::new(x, y, z), value, false);
                }
            }
        }
    }

    #[test]
    fn enclosed_solid_chunk_has_no_faces() {
        let mut volume = Volume::new(12, 12, 12, 4).unwrap();
        filled(&mut volume, Point3::new(0, 0, 0), Point3::new(11, 11, 11), 1);
        let mesh = Mesher::new().mesh(&volume, Point3::new(1, 1, 1));
        assert_eq!(mesh.count(), 0);
        assert!(mesh.bounds.is_empty());
    }

    #[test]
    fn volume_boundary_faces_are_not_emitted() {
        let mut volume = Volume::new(4, 4, 4, 4).unwrap();
        filled(&mut volume, Point3::new(0, 0, 0), Point3::new(3, 3, 3), 1);
        assert_eq!(Mesher::new().mesh(&volume, Point3::new(0, 0, 0)).count(), 0);

        // Dig one cell out of the corner: only the three inward sides facing it appear.
        volume.update(Point3::new(0, 0, 0), EMPTY, false);
        let mesh = Mesher::new().mesh(&volume, Point3::new(0, 0, 0));
        assert_eq!(mesh.count(), 3);
    }

    #[test]
    fn single_voxel_emits_faces_in_direction_order() {
        let mut volume = Volume::new(8, 8, 8, 8).unwrap();
        volume.update(Point3::new(3, 4, 5), 3, false);
        let mesh = Mesher::new().mesh(&volume, Point3::new(0, 0, 0));

        let directions: Vec<_> = mesh.faces.iter().map(|f| f.direction()).collect();
        assert_eq!(directions, FaceDirection::all().to_vec());
        assert!(mesh.faces.iter().all(|f| f.layer() == 2));
        assert!(mesh.faces.iter().all(|f| f.offset() == Point3::new(3, 4, 5)));

        assert_eq!(mesh.bounds.center, Point3::new(3.5, 4.5, 5.5));
        assert!((mesh.bounds.radius - 0.75f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn neighbors_are_culled_across_chunk_borders() {
        let mut volume = Volume::new(8, 4, 4, 4).unwrap();
        volume.update(Point3::new(3, 1, 1), 1, false);
        volume.update(Point3::new(4, 1, 1), 1, false);

        let left = Mesher::new().mesh(&volume, Point3::new(0, 0, 0));
        let right = Mesher::new().mesh(&volume, Point3::new(1, 0, 0));
        assert!(left.faces.iter().all(|f| f.direction() != FaceDirection::RIGHT));
        assert!(right.faces.iter().all(|f| f.direction() != FaceDirection::LEFT));
        assert_eq!(left.count(), 5);
        assert_eq!(right.count(), 5);
        assert_eq!(right.faces[0].offset(), Point3::new(0, 1, 1));
    }

    #[test]
    fn flipping_a_voxel_only_changes_neighboring_chunks() {
        let mut volume = Volume::new(12, 12, 12, 4).unwrap();
        filled(&mut volume, Point3::new(0, 0, 0), Point3::new(11, 11, 11), 1);
        let mesher = Mesher::new();
        let chunks: Vec<_> = (0..27)
            .map(|i| Point3::new(i % 3, (i / 3) % 3, i / 9))
            .collect();
        let before: Vec<_> = chunks.iter().map(|&c| mesher.mesh(&volume, c).faces).collect();

        // A cell on the -X border of the center chunk.
        let flipped = Point3::new(4, 6, 6);
        volume.update(flipped, EMPTY, false);
        let touched: Vec<_> = std::iter::once(flipped)
            .chain(FaceDirection::all().map(|d| d.neighbor(flipped)))
            .map(|p| p.map(|c| c.div_euclid(4)))
            .collect();

        for (chunk, faces) in chunks.iter().zip(before) {
            let after = mesher.mesh(&volume, *chunk).faces;
            if !touched.contains(chunk) {
                assert_eq!(after, faces, "chunk {:?} changed", chunk);
            }
        }
        assert_eq!(mesher.mesh(&volume, Point3::new(1, 1, 1)).count(), 5);
        assert_eq!(mesher.mesh(&volume, Point3::new(0, 1, 1)).count(), 1);
    }

    #[test]
    fn custom_mapping_and_neighbor_light_sampling() {
        let mut volume = Volume::new(4, 4, 4, 4).unwrap();
        filled(&mut volume, Point3::new(0, 0, 0), Point3::new(3, 0, 3), 5);
        volume.propagate();

        let mesher = Mesher::new()
            .with_mapping(|direction, value, _| {
                if direction == FaceDirection::TOP {
                    100
                } else {
                    value as u32
                }
            })
            .with_light_sampling(LightSampling::Neighbor);
        let mesh = mesher.mesh(&volume, Point3::new(0, 0, 0));
        assert_eq!(mesh.count(), 16);
        for face in &mesh.faces {
            assert_eq!(face.direction(), FaceDirection::TOP);
            assert_eq!(face.layer(), 100);
            assert_eq!(face.light()[0], MAX_LIGHT);
        }

        let dark = Mesher::new().mesh(&volume, Point3::new(0, 0, 0));
        assert!(dark.faces.iter().all(|f| f.light() == [0; LIGHT_CHANNELS]));
    }

    #[test]
    fn oversized_mapping_layers_are_clamped() {
        let mut volume = Volume::new(4, 4, 4, 4).unwrap();
        volume.update(Point3::new(1, 1, 1), 9, false);
        let mesher = Mesher::new().with_mapping(|_, _, _| u32::MAX);
        let mesh = mesher.mesh(&volume, Point3::new(0, 0, 0));
        assert_eq!(mesh.count(), 6);
        for (face, direction) in mesh.faces.iter().zip(FaceDirection::all()) {
            assert_eq!(face.layer(), MAX_LAYER);
            assert_eq!(face.direction(), direction);
        }
    }

    #[test]
    fn chunks_outside_the_volume_are_empty() {
        let volume = Volume::new(4, 4, 4, 4).unwrap();
        assert!(Mesher::new().mesh(&volume, Point3::new(5, 0, 0)).is_empty());
        assert!(Mesher::new().mesh(&volume, Point3::new(-1, 0, 0)).is_empty());
    }
}
