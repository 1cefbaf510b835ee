//! # Engine Configuration
//!
//! JSON configuration for the engine. Every field has a default, so an empty object (`{}`)
//! is a valid config.
//!
//! ```json
//! {
//!   "volume": { "chunk_size": 16, "width": 128, "height": 64, "depth": 128 },
//!   "terrain": { "frequency": 0.009, "seed": 1337 },
//!   "pathfinding": { "height": 2 },
//!   "workers": 2
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    engine_state::{
        pathfinding::DEFAULT_MAX_VISITED,
        voxels::{
            volume::{Volume, DEFAULT_LIGHT_ATTENUATION},
            worldgen::NoiseTerrain,
        },
    },
    error::{ConfigError, VolumeError},
};

/// Dimensions and lighting of the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub chunk_size: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// Light lost per step away from the sky
    pub light_attenuation: u8,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        VolumeConfig {
            chunk_size: 16,
            width: 64,
            height: 64,
            depth: 64,
            light_attenuation: DEFAULT_LIGHT_ATTENUATION,
        }
    }
}

impl VolumeConfig {
    /// Allocates a volume with these settings.
    pub fn build(&self) -> Result<Volume, VolumeError> {
        Ok(Volume::new(self.width, self.height, self.depth, self.chunk_size)?
            .with_light_attenuation(self.light_attenuation))
    }
}

/// Parameters handed to the terrain generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub frequency: f64,
    /// Fixed seed; a random one is drawn when absent
    pub seed: Option<u32>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        TerrainConfig {
            frequency: 0.009,
            seed: None,
        }
    }
}

impl TerrainConfig {
    /// The configured seed, or a fresh random one.
    pub fn seed(&self) -> u32 {
        self.seed.unwrap_or_else(|| fastrand::u32(..i32::MAX as u32))
    }

    /// A noise generator with these parameters.
    pub fn generator(&self) -> NoiseTerrain {
        NoiseTerrain::new(self.frequency, self.seed())
    }
}

/// Defaults for path requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Agent height in cells
    pub height: u32,
    pub max_visited: usize,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        PathfindingConfig {
            height: 1,
            max_visited: DEFAULT_MAX_VISITED,
        }
    }
}

/// Top level engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub volume: VolumeConfig,
    pub terrain: TerrainConfig,
    pub pathfinding: PathfindingConfig,
    /// Terrain generation worker threads
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            volume: VolumeConfig::default(),
            terrain: TerrainConfig::default(),
            pathfinding: PathfindingConfig::default(),
            workers: 1,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: EngineConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the volume dimensions without allocating anything.
    pub fn validate(&self) -> Result<(), VolumeError> {
        let volume = &self.volume;
        Volume::validate(volume.width, volume.height, volume.depth, volume.chunk_size)
    }
}
