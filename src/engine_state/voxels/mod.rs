//! # Voxel Engine Core
//!
//! This module contains the voxel data model and everything that edits it.
//!
//! ## Architecture
//!
//! * **Volume**: The dense voxel grid plus its height map, light field and obstacle mask
//! * **Chunk**: The render data derived for one fixed-size cubic region
//! * **Brush**: Precomputed spherical offset sets for area edits
//! * **World**: Owns the volume and the chunks, applies edits and batches remeshing
//! * **Worldgen / Tasks**: Terrain generators and the worker task that runs them
//!
//! ## Data Flow
//!
//! 1. `ChunkWorld::update` writes voxels through `Volume::update`
//! 2. The volume re-derives its height map and light and reports what changed
//! 3. The world queues every chunk bordering the change
//! 4. One deferred flush remeshes the queued chunks
//!
//! ## Thread Safety
//!
//! Edits, flushes and pathfinding all run on the thread that owns the world. Only terrain
//! generation leaves it, and it shares nothing while it runs.

pub mod brush;
pub mod chunk;
pub mod face_direction;
pub mod tasks;
pub mod volume;
pub mod world;
pub mod worldgen;
