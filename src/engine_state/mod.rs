//! # Engine State Module
//!
//! The core engine module that owns the world and drives it turn by turn.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `voxels` - The volume, chunks, brushes, world and terrain generation
//! * `meshing` - Face culling mesher and ray queries against its output
//! * `pathfinding` - A* search over walkable voxels
//! * `task_management` - Worker threads for terrain generation
//!
//! ## Turns
//!
//! Everything that touches the world happens on the thread that owns the `EngineState`.
//! Edits made during a turn only queue remeshing; [`EngineState::tick`] marks the end of the
//! turn, applies finished background work and then flushes the remesh queue, so each
//! affected chunk is rebuilt once no matter how many edits hit it.

use cgmath::Point3;
use log::{debug, info};

use crate::{config::EngineConfig, error::VolumeError};
use meshing::Mesher;
use pathfinding::PathRequest;
use task_management::TaskManager;
use voxels::{
    tasks::terrain_generation_task::TerrainGenerationTask, world::ChunkWorld,
    worldgen::TerrainGenerator,
};

pub mod meshing;
pub mod pathfinding;
pub mod task_management;
pub mod voxels;

/// What happened during one [`EngineState::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Background task results applied to the world
    pub tasks_completed: usize,
    /// Chunks rebuilt by the remesh flush
    pub chunks_remeshed: usize,
}

/// The main state container for the voxel engine.
///
/// # Examples
///
/// ```
/// use voxel_volume_engine::{config::EngineConfig, EngineState};
///
/// let config = EngineConfig::from_json_str(
///     r#"{ "volume": { "width": 32, "height": 32, "depth": 32 } }"#,
/// )
/// .unwrap();
/// let mut engine = EngineState::new(config).unwrap();
///
/// // Main loop
/// let report = engine.tick();
/// assert_eq!(report.chunks_remeshed, 0);
/// ```
pub struct EngineState {
    config: EngineConfig,
    /// The voxel world containing all chunk data
    pub world: ChunkWorld,
    /// Task manager for background terrain generation
    pub task_manager: TaskManager,
}

impl EngineState {
    /// Creates the world described by `config` and starts the worker pool.
    ///
    /// # Errors
    /// Returns the volume's construction error when the configured dimensions are invalid.
    pub fn new(config: EngineConfig) -> Result<Self, VolumeError> {
        Self::with_mesher(config, Mesher::new())
    }

    /// Like [`EngineState::new`] with a custom mesher.
    pub fn with_mesher(config: EngineConfig, mesher: Mesher) -> Result<Self, VolumeError> {
        let volume = config.volume.build()?;
        let world = ChunkWorld::new(volume, mesher);
        let task_manager = TaskManager::new(config.workers.max(1));
        info!("Engine state initialized");
        Ok(EngineState {
            config,
            world,
            task_manager,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts generating terrain with the configured noise parameters.
    pub fn generate_terrain(&mut self) {
        let generator = self.config.terrain.generator();
        debug!("Generating terrain with seed {}", generator.seed);
        self.generate_terrain_with(Box::new(generator));
    }

    /// Starts generating terrain with `generator` on a worker thread.
    ///
    /// The result is loaded during a later [`EngineState::tick`].
    pub fn generate_terrain_with(&mut self, generator: Box<dyn TerrainGenerator>) {
        let task = TerrainGenerationTask::for_world(generator, &self.world);
        self.task_manager.publish_task(Box::new(task));
    }

    /// Blocks until all background work has been applied to the world.
    pub fn wait_for_tasks(&mut self) -> usize {
        self.task_manager.wait_until_idle(&mut self.world)
    }

    /// Ends the current turn.
    ///
    /// Applies finished task results, hands queued tasks to idle workers, then flushes the
    /// remesh queue.
    pub fn tick(&mut self) -> TickReport {
        let tasks_completed = self.task_manager.process_completed_tasks(&mut self.world);
        self.task_manager.process_queued_tasks();
        let chunks_remeshed = self.world.flush();
        TickReport {
            tasks_completed,
            chunks_remeshed,
        }
    }

    /// A path request using the configured agent height and search budget.
    pub fn path_request(&self, from: Point3<i32>, to: Point3<i32>) -> PathRequest {
        PathRequest::new(from, to)
            .with_height(self.config.pathfinding.height)
            .with_max_visited(self.config.pathfinding.max_visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::{world::Stroke, worldgen::FlatTerrain};

    fn small_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.volume.chunk_size = 8;
        config.volume.width = 16;
        config.volume.height = 16;
        config.volume.depth = 16;
        config.pathfinding.height = 2;
        config
    }

    #[test]
    fn terrain_is_meshed_on_the_tick_after_it_arrives() {
        let mut engine = EngineState::new(small_config()).unwrap();
        engine.generate_terrain_with(Box::new(FlatTerrain::new(2, 1)));
        assert_eq!(engine.wait_for_tasks(), 1);

        let report = engine.tick();
        assert_eq!(report.chunks_remeshed, 8);
        let floor = engine.world.chunk(Point3::new(0, 0, 0)).unwrap();
        // Only the top of the floor is exposed: 8x8 faces.
        assert_eq!(floor.mesh.count(), 64);
        assert!(!engine.world.chunk(Point3::new(0, 1, 0)).unwrap().is_visible());
    }

    #[test]
    fn path_requests_use_configured_defaults() {
        let mut engine = EngineState::new(small_config()).unwrap();
        engine.generate_terrain_with(Box::new(FlatTerrain::new(1, 1)));
        engine.wait_for_tasks();
        engine.tick();

        let request = engine.path_request(Point3::new(0, 1, 0), Point3::new(15, 1, 15));
        assert_eq!(request.height, 2);
        let path = engine.world.pathfind(&request).unwrap();
        assert!(path.is_usable());

        engine.world.update(Point3::new(4, 1, 4), 2, Stroke::Fill(1));
        assert_eq!(engine.tick().tasks_completed, 0);
    }

    #[test]
    fn invalid_config_fails_construction() {
        let mut config = small_config();
        config.volume.width = 12;
        assert!(matches!(
            EngineState::new(config),
            Err(VolumeError::InvalidDimensions { width: 12, .. })
        ));
    }
}
