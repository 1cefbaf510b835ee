//! # Chunk Module
//!
//! A chunk is a `chunk_size`³ region of the volume identified by its chunk coordinates. It
//! keeps no copy of the voxels; all it owns is the render data last derived from them.

use cgmath::Point3;

use crate::engine_state::meshing::ChunkMesh;

/// The derived state of one chunk.
///
/// Chunks are created once per coordinate when the world is built. Their mesh is replaced
/// wholesale on every remesh and never patched.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not voxel coordinates).
    pub position: Point3<i32>,

    /// The face buffer and bounding sphere from the latest remesh.
    pub mesh: ChunkMesh,

    /// How many times this chunk has been remeshed.
    ///
    /// Renderers compare it against the revision they last uploaded to skip unchanged chunks.
    pub revision: u64,
}

impl Chunk {
    /// Creates a chunk that has not been meshed yet.
    ///
    /// # Arguments
    /// * `position` - The chunk coordinates of the new chunk
    /// * `chunk_size` - Edge length of a chunk in voxels
    pub fn new(position: Point3<i32>, chunk_size: u32) -> Self {
        Chunk {
            position,
            mesh: ChunkMesh::empty(position, chunk_size),
            revision: 0,
        }
    }

    /// Installs a freshly built mesh, replacing the previous one.
    pub fn replace_mesh(&mut self, mesh: ChunkMesh) {
        self.mesh = mesh;
        self.revision += 1;
    }

    /// `false` when the chunk has nothing to draw.
    pub fn is_visible(&self) -> bool {
        !self.mesh.is_empty()
    }
}
