//! # Voxel Task System
//!
//! Tasks related to voxel world generation. They run on the task manager's workers so that
//! generating a large volume does not stall the main thread.

pub mod terrain_generation_task;
