//! # Terrain Generation
//!
//! Generators fill a whole voxel buffer in one go, laid out exactly like the volume's voxel
//! array so the result can be copied straight in with [`Volume::load_voxels`].
//!
//! Generators are plain values that own their parameters, which lets a
//! [`TerrainGenerationTask`](super::tasks::terrain_generation_task::TerrainGenerationTask) move
//! one onto a worker thread.
//!
//! [`Volume::load_voxels`]: super::volume::Volume::load_voxels

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

/// Material of the island body.
pub const STONE: u8 = 1;
/// Material mixed into the island body.
pub const DIRT: u8 = 2;
/// Material of the top layer of every exposed column.
pub const GRASS: u8 = 3;

/// Produces the initial contents of a volume.
pub trait TerrainGenerator: Send {
    /// Returns `width * height * depth` voxels in `x + y * width + z * width * height` order.
    fn generate(&self, width: u32, height: u32, depth: u32) -> Vec<u8>;
}

/// A round island shaped by fractal noise.
///
/// Columns within the island's radius are filled up to a height driven by 3D fBm noise, with
/// the coastline frayed by the same noise. Body voxels are [`STONE`] or [`DIRT`] depending on a
/// second, finer noise field, and the topmost voxel under open air becomes [`GRASS`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseTerrain {
    /// Base frequency of the fBm noise
    pub frequency: f64,
    pub seed: u32,
}

impl NoiseTerrain {
    pub fn new(frequency: f64, seed: u32) -> Self {
        NoiseTerrain { frequency, seed }
    }
}

impl TerrainGenerator for NoiseTerrain {
    fn generate(&self, width: u32, height: u32, depth: u32) -> Vec<u8> {
        let fbm = Fbm::<Perlin>::new(self.seed).set_frequency(self.frequency);
        let detail = Perlin::new(self.seed);
        let detail_scale = self.frequency * 4.0;

        let (w, h, d) = (width as usize, height as usize, depth as usize);
        let mut voxels = vec![0u8; w * h * d];
        let radius = width.max(depth) as f64 * 0.5;
        let mut i = 0;
        for z in 0..d {
            for y in 0..h {
                for x in 0..w {
                    let index = i;
                    i += 1;
                    let dx = x as f64 - width as f64 * 0.5 + 0.5;
                    let dz = z as f64 - depth as f64 * 0.5 + 0.5;
                    let distance = (dx * dx + dz * dz).sqrt();
                    if distance > radius {
                        continue;
                    }
                    let n = fbm.get([x as f64, y as f64, z as f64]).abs();
                    let coastline = radius * (0.8 + 0.2 * n);
                    if (y as f64) < (height as f64 - 2.0) * n && distance < coastline {
                        let mix = detail
                            .get([
                                z as f64 * detail_scale,
                                x as f64 * detail_scale,
                                y as f64 * detail_scale,
                            ])
                            .abs()
                            .round();
                        voxels[index] = if mix >= 1.0 { STONE } else { DIRT };
                    } else if y > 0 && voxels[index - w] != 0 {
                        voxels[index - w] = GRASS;
                    }
                }
            }
        }
        voxels
    }
}

/// A solid floor of uniform thickness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatTerrain {
    pub thickness: u32,
    pub value: u8,
}

impl FlatTerrain {
    pub fn new(thickness: u32, value: u8) -> Self {
        FlatTerrain { thickness, value }
    }
}

impl TerrainGenerator for FlatTerrain {
    fn generate(&self, width: u32, height: u32, depth: u32) -> Vec<u8> {
        let layer = width as usize * height as usize;
        let floor = self.thickness.min(height) as usize * width as usize;
        let mut voxels = vec![0u8; layer * depth as usize];
        for slice in voxels.chunks_mut(layer) {
            slice[..floor].fill(self.value);
        }
        voxels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_terrain_fills_the_bottom_layers() {
        let voxels = FlatTerrain::new(2, 7).generate(4, 8, 3);
        assert_eq!(voxels.len(), 4 * 8 * 3);
        for z in 0..3 {
            for y in 0..8 {
                for x in 0..4 {
                    let expected = if y < 2 { 7 } else { 0 };
                    assert_eq!(voxels[x + y * 4 + z * 32], expected);
                }
            }
        }
    }

    #[test]
    fn noise_terrain_is_deterministic_and_island_shaped() {
        let generator = NoiseTerrain::new(0.05, 1337);
        let a = generator.generate(32, 16, 32);
        let b = generator.generate(32, 16, 32);
        assert_eq!(a.len(), 32 * 16 * 32);
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| v <= GRASS));
        // Corners lie outside the island radius.
        for (x, z) in [(0, 0), (31, 0), (0, 31), (31, 31)] {
            for y in 0..16 {
                assert_eq!(a[x + y * 32 + z * 32 * 16], 0);
            }
        }
    }
}
