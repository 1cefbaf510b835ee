//! # Volume Module
//!
//! The `Volume` owns the dense voxel grid and the three fields derived from or laid over it:
//!
//! - `voxels`: one byte per cell, 0 = empty, anything else is a material id
//! - `height_map`: one entry per (x, z) column, the highest occupied y + 1 (0 for an empty column)
//! - `light`: sky light intensity per cell in `0..=MAX_LIGHT`
//! - `obstacles`: one bit per cell reserved by dynamic agents
//!
//! All arrays share the linear layout `x + y * width + z * width * height`.
//!
//! ## Out-of-bounds access
//!
//! [`Volume::voxel`] is the single bounds gate. It returns `None` for any coordinate outside
//! the grid, and every other accessor treats `None` as a no-op (reads yield empty, writes are
//! dropped). Boundary-straddling queries such as face culling or brush edits at the edge of
//! the world rely on this.
//!
//! ## Obstacles vs. solidity
//!
//! The obstacle mask is deliberately independent of `voxels`. A reserved cell is still empty
//! and a solid cell is not reserved; consumers that care about both must check both.

use bitvec::prelude::BitVec;
use cgmath::Point3;
use log::{debug, info};

use crate::error::VolumeError;

pub mod bounds;
mod light;

pub use bounds::VoxelBox;
pub use light::LightPropagator;

/// Highest light intensity, held by every empty cell exposed to the sky.
pub const MAX_LIGHT: u8 = 32;

/// Intensity lost per step while light spreads away from the sky.
pub const DEFAULT_LIGHT_ATTENUATION: u8 = 2;

/// The voxel value of an empty cell.
pub const EMPTY: u8 = 0;

/// A fixed-size, chunk-aligned voxel grid.
#[derive(Debug, Clone)]
pub struct Volume {
    chunk_size: u32,
    width: u32,
    height: u32,
    depth: u32,
    light_attenuation: u8,
    voxels: Vec<u8>,
    height_map: Vec<u32>,
    light: Vec<u8>,
    obstacles: BitVec,
}

impl Volume {
    /// Creates an empty volume.
    ///
    /// # Arguments
    /// * `width`, `height`, `depth` - Dimensions in voxels; each must be a multiple of `chunk_size`
    /// * `chunk_size` - Edge length of a chunk in voxels
    ///
    /// # Errors
    /// Returns [`VolumeError::InvalidDimensions`] before allocating anything when a dimension
    /// is not a whole number of chunks.
    pub fn new(width: u32, height: u32, depth: u32, chunk_size: u32) -> Result<Self, VolumeError> {
        Self::validate(width, height, depth, chunk_size)?;
        let cells = width as usize * height as usize * depth as usize;
        info!(
            "Allocating {}x{}x{} volume ({} cells, chunk size {})",
            width, height, depth, cells, chunk_size
        );
        Ok(Volume {
            chunk_size,
            width,
            height,
            depth,
            light_attenuation: DEFAULT_LIGHT_ATTENUATION,
            voxels: vec![EMPTY; cells],
            height_map: vec![0; width as usize * depth as usize],
            light: vec![0; cells],
            obstacles: BitVec::repeat(false, cells),
        })
    }

    /// Checks the chunk-multiple rule without allocating.
    pub fn validate(
        width: u32,
        height: u32,
        depth: u32,
        chunk_size: u32,
    ) -> Result<(), VolumeError> {
        if chunk_size == 0 {
            return Err(VolumeError::ZeroChunkSize);
        }
        if width == 0
            || height == 0
            || depth == 0
            || width % chunk_size != 0
            || height % chunk_size != 0
            || depth % chunk_size != 0
        {
            return Err(VolumeError::InvalidDimensions {
                width,
                height,
                depth,
                chunk_size,
            });
        }
        Ok(())
    }

    /// Sets how much intensity light loses per step. Takes effect on the next propagation.
    pub fn with_light_attenuation(mut self, attenuation: u8) -> Self {
        self.light_attenuation = attenuation.max(1);
        self
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Intensity lost per step of light propagation.
    pub fn light_attenuation(&self) -> u8 {
        self.light_attenuation
    }

    /// Number of chunks along each axis.
    pub fn chunk_counts(&self) -> Point3<i32> {
        Point3::new(
            (self.width / self.chunk_size) as i32,
            (self.height / self.chunk_size) as i32,
            (self.depth / self.chunk_size) as i32,
        )
    }

    /// Bounds-checked index lookup.
    ///
    /// # Returns
    /// `Some(index)` into the voxel, light and obstacle arrays, or `None` (the out-of-bounds
    /// sentinel) when `position` lies outside the grid.
    #[inline]
    pub fn voxel(&self, position: Point3<i32>) -> Option<usize> {
        let (x, y, z) = (position.x, position.y, position.z);
        if x < 0
            || y < 0
            || z < 0
            || x >= self.width as i32
            || y >= self.height as i32
            || z >= self.depth as i32
        {
            return None;
        }
        let (w, h) = (self.width as usize, self.height as usize);
        Some(x as usize + y as usize * w + z as usize * w * h)
    }

    /// Inverse of [`Volume::voxel`].
    pub fn position(&self, index: usize) -> Point3<i32> {
        let (w, h) = (self.width as usize, self.height as usize);
        Point3::new(
            (index % w) as i32,
            ((index / w) % h) as i32,
            (index / (w * h)) as i32,
        )
    }

    #[inline]
    fn column(&self, x: i32, z: i32) -> usize {
        x as usize + z as usize * self.width as usize
    }

    /// The stored value at `position`, or [`EMPTY`] outside the grid.
    pub fn get(&self, position: Point3<i32>) -> u8 {
        self.voxel(position).map_or(EMPTY, |i| self.voxels[i])
    }

    /// `true` when `position` is inside the grid and holds a material.
    pub fn is_solid(&self, position: Point3<i32>) -> bool {
        self.get(position) != EMPTY
    }

    /// Light intensity at `position`, 0 outside the grid.
    pub fn light_at(&self, position: Point3<i32>) -> u8 {
        self.voxel(position).map_or(0, |i| self.light[i])
    }

    /// `true` when `position` is inside the grid and reserved by an agent.
    pub fn is_obstacle(&self, position: Point3<i32>) -> bool {
        self.voxel(position).is_some_and(|i| self.obstacles[i])
    }

    /// The cached highest occupied y + 1 of column (x, z), `None` outside the grid.
    pub fn column_height(&self, x: i32, z: i32) -> Option<u32> {
        if x < 0 || z < 0 || x >= self.width as i32 || z >= self.depth as i32 {
            return None;
        }
        Some(self.height_map[self.column(x, z)])
    }

    pub fn voxels(&self) -> &[u8] {
        &self.voxels
    }

    pub fn light(&self) -> &[u8] {
        &self.light
    }

    pub fn height_map(&self) -> &[u32] {
        &self.height_map
    }

    /// Replaces the whole voxel grid with a buffer laid out in `idx` order.
    ///
    /// The height map is rebuilt and every obstacle is released. Light is left untouched;
    /// call [`Volume::propagate`] afterwards.
    ///
    /// # Errors
    /// Returns [`VolumeError::BufferSizeMismatch`] without modifying anything when the buffer
    /// length differs from the cell count.
    pub fn load_voxels(&mut self, voxels: &[u8]) -> Result<(), VolumeError> {
        if voxels.len() != self.voxels.len() {
            return Err(VolumeError::BufferSizeMismatch {
                expected: self.voxels.len(),
                actual: voxels.len(),
            });
        }
        self.voxels.copy_from_slice(voxels);
        self.obstacles.fill(false);
        for z in 0..self.depth as i32 {
            for x in 0..self.width as i32 {
                self.refresh_column(x, z);
            }
        }
        debug!("Loaded {} voxels into volume", voxels.len());
        Ok(())
    }

    /// Recomputes the height map entry of column (x, z) by scanning down from the top.
    fn refresh_column(&mut self, x: i32, z: i32) -> u32 {
        let mut top = 0;
        for y in (0..self.height as i32).rev() {
            if self.is_solid(Point3::new(x, y, z)) {
                top = y as u32 + 1;
                break;
            }
        }
        let column = self.column(x, z);
        self.height_map[column] = top;
        top
    }

    /// Finds where something standing in column (pos.x, pos.z) would come to rest.
    ///
    /// Scans down from `pos.y` (clamped to the top of the volume) for the first cell that has
    /// a solid voxel directly beneath it and `clearance` empty cells starting at itself.
    /// Cells above the top of the volume count as empty.
    ///
    /// # Returns
    /// The resting y, or `None` when the starting cell is solid, the column is outside the
    /// grid, or there is no solid voxel below.
    pub fn ground(&self, pos: Point3<i32>, clearance: u32) -> Option<i32> {
        self.ground_within(pos, clearance, 0, self.height as i32 - 1)
    }

    /// [`Volume::ground`] restricted to supports whose y lies in `min_y..=max_y`.
    pub fn ground_within(
        &self,
        pos: Point3<i32>,
        clearance: u32,
        min_y: i32,
        max_y: i32,
    ) -> Option<i32> {
        let start = pos.y.min(self.height as i32 - 1);
        let start_cell = self.voxel(Point3::new(pos.x, start, pos.z))?;
        if self.voxels[start_cell] != EMPTY {
            return None;
        }
        for y in (min_y.max(0)..start).rev() {
            if !self.is_solid(Point3::new(pos.x, y, pos.z)) {
                continue;
            }
            if y > max_y {
                return None;
            }
            let clear = (1..=clearance as i32)
                .all(|h| !self.is_solid(Point3::new(pos.x, y + h, pos.z)));
            return clear.then_some(y + 1);
        }
        None
    }

    /// Writes `value` at `pos` and re-derives what depends on it.
    ///
    /// Updates the height map column of `pos` and, when `update_light` is set, incrementally
    /// re-propagates light around the edit.
    ///
    /// # Returns
    /// The box of every cell whose voxel or light value changed. Writing the value already
    /// stored, or writing outside the grid, changes nothing and returns an empty box.
    pub fn update(&mut self, pos: Point3<i32>, value: u8, update_light: bool) -> VoxelBox {
        let mut changed = VoxelBox::empty();
        let Some(index) = self.voxel(pos) else {
            return changed;
        };
        let previous = self.voxels[index];
        if previous == value {
            return changed;
        }
        self.voxels[index] = value;
        changed.include(pos);

        let column = self.column(pos.x, pos.z);
        let previous_top = self.height_map[column];
        let top = if value != EMPTY {
            previous_top.max(pos.y as u32 + 1)
        } else if pos.y as u32 + 1 == previous_top {
            self.refresh_column(pos.x, pos.z)
        } else {
            previous_top
        };
        self.height_map[column] = top;

        if update_light {
            let lit = LightPropagator::new(self).update(pos, previous, previous_top);
            changed.union(&lit);
        }
        changed
    }

    /// Reserves (`enabled`) or releases a vertical span of `height` cells starting at `pos`.
    ///
    /// Cells of the span outside the grid are skipped.
    pub fn obstacle(&mut self, pos: Point3<i32>, enabled: bool, height: u32) {
        for h in 0..height as i32 {
            if let Some(index) = self.voxel(Point3::new(pos.x, pos.y + h, pos.z)) {
                self.obstacles.set(index, enabled);
            }
        }
    }

    /// Recomputes the whole light field from scratch.
    pub fn propagate(&mut self) -> &mut Self {
        LightPropagator::new(self).propagate();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume() -> Volume {
        Volume::new(8, 8, 8, 4).unwrap()
    }

    #[test]
    fn construction_rejects_partial_chunks() {
        assert_eq!(
            Volume::new(10, 8, 8, 4).unwrap_err(),
            VolumeError::InvalidDimensions {
                width: 10,
                height: 8,
                depth: 8,
                chunk_size: 4
            }
        );
        assert_eq!(Volume::new(8, 8, 8, 0).unwrap_err(), VolumeError::ZeroChunkSize);
        assert!(Volume::new(10, 5, 10, 5).is_ok());
    }

    #[test]
    fn index_round_trips_to_coordinates() {
        let volume = Volume::new(8, 4, 12, 4).unwrap();
        for z in 0..12 {
            for y in 0..4 {
                for x in 0..8 {
                    let position = Point3::new(x, y, z);
                    let index = volume.voxel(position).unwrap();
                    assert_eq!(index, (x + y * 8 + z * 8 * 4) as usize);
                    assert_eq!(volume.position(index), position);
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_lookups_yield_the_sentinel() {
        let volume = volume();
        assert_eq!(volume.voxel(Point3::new(-1, 0, 0)), None);
        assert_eq!(volume.voxel(Point3::new(0, 8, 0)), None);
        assert_eq!(volume.voxel(Point3::new(0, 0, 8)), None);
        assert_eq!(volume.get(Point3::new(100, 100, 100)), EMPTY);
        assert!(!volume.is_obstacle(Point3::new(-5, 0, 0)));
    }

    #[test]
    fn update_is_observable_and_same_value_is_a_no_op() {
        let mut volume = volume();
        let pos = Point3::new(3, 2, 1);

        let changed = volume.update(pos, 7, false);
        assert_eq!(volume.get(pos), 7);
        assert!(changed.contains(pos));

        let unchanged = volume.update(pos, 7, true);
        assert!(unchanged.is_empty());

        assert!(volume.update(Point3::new(-1, 0, 0), 3, true).is_empty());
    }

    #[test]
    fn height_map_follows_column_edits() {
        let mut volume = volume();
        volume.update(Point3::new(1, 2, 1), 1, false);
        assert_eq!(volume.column_height(1, 1), Some(3));
        volume.update(Point3::new(1, 5, 1), 1, false);
        assert_eq!(volume.column_height(1, 1), Some(6));
        volume.update(Point3::new(1, 5, 1), EMPTY, false);
        assert_eq!(volume.column_height(1, 1), Some(3));
        volume.update(Point3::new(1, 2, 1), EMPTY, false);
        assert_eq!(volume.column_height(1, 1), Some(0));
    }

    #[test]
    fn ground_finds_first_support_with_clearance() {
        let mut volume = volume();
        volume.update(Point3::new(2, 1, 2), 1, false);
        volume.update(Point3::new(2, 4, 2), 1, false);

        assert_eq!(volume.ground(Point3::new(2, 7, 2), 1), Some(5));
        assert_eq!(volume.ground(Point3::new(2, 3, 2), 1), Some(2));
        // Two cells of clearance above y=2 are interrupted by the block at y=4.
        assert_eq!(volume.ground(Point3::new(2, 3, 2), 3), None);
        // Starting inside a solid voxel.
        assert_eq!(volume.ground(Point3::new(2, 4, 2), 1), None);
        // Nothing underneath.
        assert_eq!(volume.ground(Point3::new(5, 7, 5), 1), None);
        // Clamped to the top of the volume.
        assert_eq!(volume.ground(Point3::new(2, 100, 2), 1), Some(5));
    }

    #[test]
    fn obstacles_cover_a_vertical_span_independently_of_voxels() {
        let mut volume = volume();
        let base = Point3::new(4, 6, 4);
        volume.obstacle(base, true, 3);
        assert!(volume.is_obstacle(base));
        assert!(volume.is_obstacle(Point3::new(4, 7, 4)));
        // Third cell is above the grid and skipped.
        assert!(!volume.is_solid(base));

        volume.obstacle(base, false, 3);
        assert!(!volume.is_obstacle(base));
        assert!(!volume.is_obstacle(Point3::new(4, 7, 4)));
    }

    #[test]
    fn loading_rejects_wrong_sized_buffers() {
        let mut volume = volume();
        let err = volume.load_voxels(&[1; 10]).unwrap_err();
        assert_eq!(
            err,
            VolumeError::BufferSizeMismatch {
                expected: 512,
                actual: 10
            }
        );

        let mut buffer = vec![EMPTY; 512];
        let index = volume.voxel(Point3::new(0, 3, 0)).unwrap();
        buffer[index] = 2;
        volume.load_voxels(&buffer).unwrap();
        assert_eq!(volume.column_height(0, 0), Some(4));
        assert_eq!(volume.column_height(1, 0), Some(0));
    }
}
