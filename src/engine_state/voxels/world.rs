//! # World Module
//!
//! This module provides the `ChunkWorld` struct, which owns the volume, one [`Chunk`] per chunk
//! coordinate, and the queue of chunks waiting to be remeshed.
//!
//! ## Edit path
//!
//! 1. [`ChunkWorld::update`] applies a brush to the volume, one [`Volume::update`] per cell
//!    whose value actually changes, and accumulates the returned boxes
//! 2. Every chunk intersecting that box grown by one voxel is queued for remeshing
//! 3. The first chunk queued while the queue is idle schedules a flush
//! 4. [`ChunkWorld::flush`], called at the turn boundary, remeshes each queued chunk once
//!
//! Edits never remesh synchronously. Any number of edits between two flushes costs one
//! remesh per affected chunk.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use cgmath::Point3;
use log::{debug, info, trace};
use web_time::Instant;

use super::{
    brush::{Brush, BrushCache},
    chunk::Chunk,
    volume::{Volume, VoxelBox},
};
use crate::{
    engine_state::{
        meshing::{Mesher, Ray, RaycastHit},
        pathfinding::{pathfind, Path, PathRequest},
    },
    error::{PathfindError, VolumeError},
};

/// What a brush writes into each cell it covers.
pub enum Stroke<'a> {
    /// Writes the same value everywhere.
    Fill(u8),
    /// Computes each cell's value from `(distance from center, current value, position)`.
    ///
    /// Returning `None`, or the current value, leaves the cell untouched.
    Shape(&'a dyn Fn(f32, u8, Point3<i32>) -> Option<u8>),
}

impl Stroke<'_> {
    fn apply(&self, distance: f32, current: u8, position: Point3<i32>) -> Option<u8> {
        match self {
            Stroke::Fill(value) => Some(*value),
            Stroke::Shape(shape) => shape(distance, current, position),
        }
    }
}

/// A fixed-size voxel world split into chunks.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use voxel_volume_engine::{ChunkWorld, Mesher, Stroke, Volume};
///
/// let volume = Volume::new(32, 32, 32, 16).unwrap();
/// let mut world = ChunkWorld::new(volume, Mesher::new());
///
/// world.update(Point3::new(8, 8, 8), 3, Stroke::Fill(1));
/// assert!(world.is_flush_scheduled());
///
/// let remeshed = world.flush();
/// assert!(remeshed > 0);
/// ```
pub struct ChunkWorld {
    volume: Volume,
    mesher: Mesher,
    /// A mapping from chunk coordinates to chunk data.
    chunks: HashMap<Point3<i32>, Chunk>,
    /// Chunks waiting for the next flush, in the order they were first queued.
    remesh_queue: VecDeque<Point3<i32>>,
    queued: HashSet<Point3<i32>>,
    flush_scheduled: bool,
    brushes: BrushCache,
}

impl ChunkWorld {
    /// Creates a world around `volume` with one unmeshed chunk per chunk coordinate.
    ///
    /// Nothing is meshed until [`ChunkWorld::remesh_all`] (or an edit) and a flush.
    pub fn new(volume: Volume, mesher: Mesher) -> Self {
        let counts = volume.chunk_counts();
        let mut chunks = HashMap::with_capacity((counts.x * counts.y * counts.z) as usize);
        for z in 0..counts.z {
            for y in 0..counts.y {
                for x in 0..counts.x {
                    let position = Point3::new(x, y, z);
                    chunks.insert(position, Chunk::new(position, volume.chunk_size()));
                }
            }
        }
        info!(
            "Created world of {}x{}x{} chunks ({} voxels per edge)",
            counts.x,
            counts.y,
            counts.z,
            volume.chunk_size()
        );

        ChunkWorld {
            volume,
            mesher,
            chunks,
            remesh_queue: VecDeque::new(),
            queued: HashSet::new(),
            flush_scheduled: false,
            brushes: BrushCache::new(),
        }
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn mesher(&self) -> &Mesher {
        &self.mesher
    }

    /// Retrieves the chunk at the specified chunk coordinates.
    pub fn chunk(&self, position: Point3<i32>) -> Option<&Chunk> {
        self.chunks.get(&position)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Replaces every voxel with a generated buffer, relights the volume and queues every chunk.
    ///
    /// # Errors
    /// Returns [`VolumeError::BufferSizeMismatch`] and leaves the world untouched when the
    /// buffer does not match the volume's cell count.
    pub fn load_voxels(&mut self, voxels: &[u8]) -> Result<(), VolumeError> {
        self.volume.load_voxels(voxels)?;
        self.volume.propagate();
        self.remesh_all();
        info!("Loaded terrain into world ({} voxels)", voxels.len());
        Ok(())
    }

    /// Returns the brush of `radius`, computing it on first use.
    pub fn get_brush(&mut self, radius: u32) -> Rc<Brush> {
        self.brushes.get(radius)
    }

    /// Applies a spherical edit around `center`.
    ///
    /// Cells are visited in ascending distance from `center`. Cells outside the volume are
    /// skipped. Every chunk touched by the changed cells, or bordering them, is queued.
    ///
    /// # Arguments
    /// * `center` - Voxel at the middle of the brush
    /// * `radius` - Brush radius in voxels
    /// * `stroke` - The value, or value function, to write
    ///
    /// # Returns
    /// The box of every cell whose voxel or light value changed during this edit.
    pub fn update(&mut self, center: Point3<i32>, radius: u32, stroke: Stroke) -> VoxelBox {
        let brush = self.get_brush(radius);
        let mut session = VoxelBox::empty();
        let mut edits = 0;
        for cell in brush.offsets() {
            let position = center + cell.offset;
            let Some(index) = self.volume.voxel(position) else {
                continue;
            };
            let current = self.volume.voxels()[index];
            let Some(value) = stroke.apply(cell.distance, current, position) else {
                continue;
            };
            if value == current {
                continue;
            }
            session.union(&self.volume.update(position, value, true));
            edits += 1;
        }

        debug!(
            "Brush edit at {:?} (radius {}): {} voxels changed, {} cells affected",
            center,
            radius,
            edits,
            session.volume()
        );
        self.queue_box(&session);
        session
    }

    /// Queues every chunk that could show a change inside `changed`.
    fn queue_box(&mut self, changed: &VoxelBox) {
        let Some((min, max)) = changed
            .expanded(1)
            .chunk_range(self.volume.chunk_size() as i32)
        else {
            return;
        };
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    self.remesh(Point3::new(x, y, z));
                }
            }
        }
    }

    /// Queues the chunk at `position` for the next flush.
    ///
    /// Unknown chunk coordinates are ignored and chunks already queued stay queued once.
    pub fn remesh(&mut self, position: Point3<i32>) {
        if !self.chunks.contains_key(&position) || !self.queued.insert(position) {
            return;
        }
        if !self.flush_scheduled {
            self.flush_scheduled = true;
            trace!("Scheduled remesh flush");
        }
        self.remesh_queue.push_back(position);
    }

    /// Queues every chunk of the world.
    pub fn remesh_all(&mut self) {
        let mut positions: Vec<_> = self.chunks.keys().copied().collect();
        positions.sort_by_key(|p| (p.z, p.y, p.x));
        for position in positions {
            self.remesh(position);
        }
    }

    /// Whether a flush is pending.
    pub fn is_flush_scheduled(&self) -> bool {
        self.flush_scheduled
    }

    /// Number of chunks waiting for the next flush.
    pub fn pending_remeshes(&self) -> usize {
        self.remesh_queue.len()
    }

    /// Remeshes every queued chunk exactly once and empties the queue.
    ///
    /// # Returns
    /// How many chunks were remeshed. Zero when no flush was scheduled.
    pub fn flush(&mut self) -> usize {
        if !self.flush_scheduled {
            return 0;
        }
        let start = Instant::now();
        let mut remeshed = 0;
        while let Some(position) = self.remesh_queue.pop_front() {
            let mesh = self.mesher.mesh(&self.volume, position);
            if let Some(chunk) = self.chunks.get_mut(&position) {
                chunk.replace_mesh(mesh);
                remeshed += 1;
            }
        }
        self.queued.clear();
        self.flush_scheduled = false;
        debug!("Flushed {} chunk remeshes in {:?}", remeshed, start.elapsed());
        remeshed
    }

    /// Reserves or releases an agent's footprint. See [`Volume::obstacle`].
    pub fn obstacle(&mut self, position: Point3<i32>, enabled: bool, height: u32) {
        self.volume.obstacle(position, enabled, height);
    }

    /// Searches the volume for a walkable path. See [`pathfind`].
    pub fn pathfind(&self, request: &PathRequest) -> Result<Path, PathfindError> {
        pathfind(&self.volume, request)
    }

    /// Finds the closest face hit by `ray` across all visible chunks.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RaycastHit> {
        self.chunks
            .values()
            .filter(|chunk| chunk.is_visible())
            .filter_map(|chunk| chunk.mesh.raycast(ray, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// The voxel whose face `hit` refers to.
    pub fn hit_voxel(&self, hit: &RaycastHit) -> Option<Point3<i32>> {
        self.chunks.get(&hit.chunk).and_then(|chunk| hit.voxel(&chunk.mesh))
    }
}
