#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Volume Engine
//!
//! A chunked voxel world engine: a dense 3D grid of material ids that can be edited in real
//! time, lit by sky light, turned into instanced face buffers per chunk and searched for
//! walkable paths.
//!
//! This crate provides the data model and algorithms only. Rendering, input and asset
//! handling belong to the embedding application, which consumes the per-chunk face buffers
//! and drives the engine turn by turn.
//!
//! ## Key Modules
//!
//! * `engine_state` - The engine driver plus the voxel, meshing, pathfinding and task modules
//! * `config` - JSON configuration
//! * `error` - Error types
//!
//! ## Usage
//!
//! ```rust
//! use cgmath::Point3;
//! use voxel_volume_engine::{
//!     engine_state::voxels::worldgen::{FlatTerrain, TerrainGenerator},
//!     ChunkWorld, Mesher, PathRequest, Stroke, Volume,
//! };
//!
//! let mut world = ChunkWorld::new(Volume::new(32, 16, 32, 16).unwrap(), Mesher::new());
//! world.load_voxels(&FlatTerrain::new(1, 1).generate(32, 16, 32)).unwrap();
//!
//! // Drop a mound in the middle, then end the turn.
//! world.update(Point3::new(16, 1, 16), 2, Stroke::Fill(2));
//! world.flush();
//!
//! let path = world
//!     .pathfind(&PathRequest::new(Point3::new(1, 1, 1), Point3::new(30, 1, 30)))
//!     .unwrap();
//! assert!(path.is_usable());
//! ```
//!
//! The native binary calls [`run`], a headless demo that logs what the engine does. For web
//! builds, `run_web` is exported to JavaScript instead.

use cgmath::{Point3, Vector3};
use log::{error, info, warn};

pub mod config;
pub mod engine_state;
pub mod error;

pub use config::EngineConfig;
pub use engine_state::{
    meshing::{ChunkMesh, FaceInstance, LightSampling, Mesher, Ray, RaycastHit},
    pathfinding::{pathfind, Path, PathOutcome, PathRequest},
    task_management::TaskManager,
    voxels::{
        face_direction::FaceDirection,
        tasks::terrain_generation_task::TerrainGenerationTask,
        volume::{Volume, VoxelBox, EMPTY, MAX_LIGHT},
        world::{ChunkWorld, Stroke},
    },
    EngineState,
};
pub use error::{ConfigError, PathfindError, VolumeError};

#[cfg(target_family = "wasm")]
use wasm_bindgen::prelude::wasm_bindgen;

/// Runs the headless demo: generate terrain, dig a crater, pathfind across it.
///
/// The config is read from the JSON file named by the first command line argument, falling
/// back to the defaults.
#[cfg(not(target_family = "wasm"))]
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                error!("Couldn't load config from {}: {}", path, err);
                return;
            }
        },
        None => EngineConfig::default(),
    };

    let mut engine = match EngineState::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            error!("Couldn't create engine: {}", err);
            return;
        }
    };
    engine.generate_terrain();
    engine.wait_for_tasks();
    simulate(&mut engine);
}

/// Web entry point. Generates terrain on the calling thread, since blocking on a worker is
/// not allowed on the browser's main thread.
#[cfg(target_family = "wasm")]
#[wasm_bindgen]
pub fn run_web() {
    use engine_state::voxels::worldgen::TerrainGenerator;

    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    if console_log::init_with_level(log::Level::Info).is_err() {
        return;
    }

    let mut engine = match EngineState::new(EngineConfig::default()) {
        Ok(engine) => engine,
        Err(err) => {
            error!("Couldn't create engine: {}", err);
            return;
        }
    };
    let volume = engine.world.volume();
    let voxels = engine
        .config()
        .terrain
        .generator()
        .generate(volume.width(), volume.height(), volume.depth());
    if let Err(err) = engine.world.load_voxels(&voxels) {
        error!("Couldn't load terrain: {}", err);
        return;
    }
    simulate(&mut engine);
}

fn simulate(engine: &mut EngineState) {
    let report = engine.tick();
    let faces: usize = engine.world.chunks().map(|chunk| chunk.mesh.count()).sum();
    info!(
        "Initial mesh: {} chunks rebuilt, {} faces",
        report.chunks_remeshed, faces
    );

    let volume = engine.world.volume();
    let (width, height, depth) = (
        volume.width() as i32,
        volume.height() as i32,
        volume.depth() as i32,
    );
    let agent_height = engine.config().pathfinding.height;
    let center = Point3::new(width / 2, height - 1, depth / 2);
    let Some(surface) = volume.ground(center, agent_height) else {
        warn!("No ground under the center of the world, nothing to do");
        return;
    };

    // Dig a crater, leaving grass on its rim.
    let crater = |distance: f32, current: u8, _position: Point3<i32>| {
        if distance <= 3.0 {
            Some(EMPTY)
        } else if current != EMPTY {
            Some(engine_state::voxels::worldgen::GRASS)
        } else {
            None
        }
    };
    let changed = engine.world.update(
        Point3::new(center.x, surface - 1, center.z),
        4,
        Stroke::Shape(&crater),
    );
    let report = engine.tick();
    info!(
        "Crater changed {} cells, {} chunks rebuilt",
        changed.volume(),
        report.chunks_remeshed
    );

    let volume = engine.world.volume();
    let from_column = Point3::new(center.x - width / 4, height - 1, center.z - depth / 4);
    let to_column = Point3::new(center.x + width / 4, height - 1, center.z + depth / 4);
    match (
        volume.ground(from_column, agent_height),
        volume.ground(to_column, agent_height),
    ) {
        (Some(from_y), Some(to_y)) => {
            let request = engine.path_request(
                Point3::new(from_column.x, from_y, from_column.z),
                Point3::new(to_column.x, to_y, to_column.z),
            );
            match engine.world.pathfind(&request) {
                Ok(path) => info!(
                    "Path {:?} -> {:?}: {:?} with {} waypoints (usable: {})",
                    request.from,
                    request.to,
                    path.outcome,
                    path.len(),
                    path.is_usable()
                ),
                Err(err) => error!("Pathfinding failed: {}", err),
            }
        }
        _ => info!("Path endpoints have no ground, skipping pathfinding"),
    }

    let ray = Ray::new(
        Point3::new(center.x as f32 + 0.3, height as f32 + 8.0, center.z as f32 + 0.6),
        Vector3::new(0.0, -1.0, 0.0),
    );
    match engine.world.raycast(&ray, (height + 16) as f32) {
        Some(hit) => info!(
            "Ray from {:?} hit {:?} in chunk {:?} at distance {:.2}",
            ray.origin,
            engine.world.hit_voxel(&hit),
            hit.chunk,
            hit.distance
        ),
        None => info!("Ray from {:?} hit nothing", ray.origin),
    }
}
