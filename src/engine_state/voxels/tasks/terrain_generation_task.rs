//! # Terrain Generation Task
//!
//! This module defines the `TerrainGenerationTask`, which runs a [`TerrainGenerator`] on a
//! worker thread and loads the finished buffer into the world on the main thread.
//!
//! The task owns its generator and the volume dimensions; the worker never sees the world.
//! The buffer comes back whole in a single result.

use std::time::Duration;

use log::{info, warn};
use web_time::Instant;

use crate::engine_state::{
    task_management::task::{Task, TaskResult},
    voxels::{world::ChunkWorld, worldgen::TerrainGenerator},
};

/// A task that fills a whole volume's worth of voxels.
///
/// This task is responsible for:
/// 1. Running the generator on a worker thread
/// 2. Loading the buffer into the world, which relights it and queues every chunk
pub struct TerrainGenerationTask {
    generator: Box<dyn TerrainGenerator>,
    width: u32,
    height: u32,
    depth: u32,
}

impl TerrainGenerationTask {
    /// Creates a new terrain generation task.
    ///
    /// # Arguments
    /// * `generator` - The generator to run
    /// * `width`, `height`, `depth` - Dimensions of the target volume
    pub fn new(generator: Box<dyn TerrainGenerator>, width: u32, height: u32, depth: u32) -> Self {
        TerrainGenerationTask {
            generator,
            width,
            height,
            depth,
        }
    }

    /// A task sized for the volume of `world`.
    pub fn for_world(generator: Box<dyn TerrainGenerator>, world: &ChunkWorld) -> Self {
        let volume = world.volume();
        Self::new(generator, volume.width(), volume.height(), volume.depth())
    }
}

impl Task for TerrainGenerationTask {
    /// Generates the voxel buffer.
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let start = Instant::now();
        let voxels = self.generator.generate(self.width, self.height, self.depth);
        Box::new(TerrainGenerationResult {
            voxels,
            elapsed: start.elapsed(),
        })
    }
}

/// The result of a terrain generation task: the finished voxel buffer.
pub struct TerrainGenerationResult {
    voxels: Vec<u8>,
    elapsed: Duration,
}

impl TaskResult for TerrainGenerationResult {
    /// Loads the buffer into the world on the main thread.
    ///
    /// A buffer that does not fit the world's volume is dropped with a warning.
    fn handle_result(self: Box<Self>, world: &mut ChunkWorld) -> Vec<Box<dyn Task + Send>> {
        info!(
            "Generated {} voxels of terrain in {:?}",
            self.voxels.len(),
            self.elapsed
        );
        if let Err(err) = world.load_voxels(&self.voxels) {
            warn!("Discarding generated terrain: {}", err);
        }
        Vec::new()
    }
}
