//! # Error Types
//!
//! All errors surfaced by the volume engine. Out-of-bounds voxel reads and writes
//! are not errors; they are reported through `Option` sentinels by the volume.

use cgmath::Point3;
use thiserror::Error;

/// Errors raised while creating or loading a [`Volume`](crate::Volume).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VolumeError {
    /// One of the dimensions is not a whole number of chunks.
    #[error("dimensions {width}x{height}x{depth} are not multiples of chunk size {chunk_size}")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Requested depth.
        depth: u32,
        /// The chunk size the dimensions were checked against.
        chunk_size: u32,
    },

    /// The chunk size itself is zero.
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    /// A voxel buffer handed to the volume does not cover the grid exactly.
    #[error("voxel buffer holds {actual} cells, volume expects {expected}")]
    BufferSizeMismatch {
        /// Cell count of the volume.
        expected: usize,
        /// Length of the buffer that was supplied.
        actual: usize,
    },
}

/// Errors raised by the pathfinder.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathfindError {
    /// `from` or `to` does not index a cell of the volume.
    #[error("pathfinding endpoint {position:?} is out of bounds")]
    OutOfBounds {
        /// The offending endpoint.
        position: Point3<i32>,
    },
}

/// Errors raised while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid JSON for the expected schema.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// The config parsed but describes an impossible volume.
    #[error("invalid volume config: {0}")]
    Volume(#[from] VolumeError),
}
