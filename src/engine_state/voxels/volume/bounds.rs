//! Integer bounding boxes in voxel space.
//!
//! `VoxelBox` is what [`Volume::update`](super::Volume::update) hands back to callers so
//! they know which cells changed, and what the world accumulates across an edit session
//! to find the chunks that need remeshing.

use cgmath::Point3;

/// An inclusive, axis-aligned box of voxel coordinates.
///
/// The box starts out empty (`min > max` on every axis) and grows through
/// [`VoxelBox::include`] and [`VoxelBox::union`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelBox {
    /// Lowest corner, inclusive.
    pub min: Point3<i32>,
    /// Highest corner, inclusive.
    pub max: Point3<i32>,
}

impl Default for VoxelBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl VoxelBox {
    /// Returns a box containing no cells.
    pub fn empty() -> Self {
        VoxelBox {
            min: Point3::new(i32::MAX, i32::MAX, i32::MAX),
            max: Point3::new(i32::MIN, i32::MIN, i32::MIN),
        }
    }

    /// Returns a box holding exactly one cell.
    pub fn from_point(point: Point3<i32>) -> Self {
        VoxelBox {
            min: point,
            max: point,
        }
    }

    /// `true` when the box contains no cells.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grows the box so that it contains `point`.
    pub fn include(&mut self, point: Point3<i32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Grows the box so that it contains `other`. Empty boxes are ignored.
    pub fn union(&mut self, other: &VoxelBox) {
        if other.is_empty() {
            return;
        }
        self.include(other.min);
        self.include(other.max);
    }

    /// Returns a copy grown by `margin` cells on every side. Empty boxes stay empty.
    pub fn expanded(&self, margin: i32) -> Self {
        if self.is_empty() {
            return *self;
        }
        VoxelBox {
            min: Point3::new(self.min.x - margin, self.min.y - margin, self.min.z - margin),
            max: Point3::new(self.max.x + margin, self.max.y + margin, self.max.z + margin),
        }
    }

    /// `true` when `point` lies inside the box.
    pub fn contains(&self, point: Point3<i32>) -> bool {
        (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.y..=self.max.y).contains(&point.y)
            && (self.min.z..=self.max.z).contains(&point.z)
    }

    /// `true` when the two boxes share at least one cell.
    pub fn intersects(&self, other: &VoxelBox) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Number of cells inside the box.
    pub fn volume(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        let extent = |min: i32, max: i32| (max as i64 - min as i64 + 1) as u64;
        extent(self.min.x, self.max.x)
            * extent(self.min.y, self.max.y)
            * extent(self.min.z, self.max.z)
    }

    /// Chunk coordinates of every chunk whose cells overlap this box.
    ///
    /// # Arguments
    /// * `chunk_size` - Edge length of a chunk in voxels
    pub fn chunk_range(&self, chunk_size: i32) -> Option<(Point3<i32>, Point3<i32>)> {
        if self.is_empty() {
            return None;
        }
        Some((
            Point3::new(
                self.min.x.div_euclid(chunk_size),
                self.min.y.div_euclid(chunk_size),
                self.min.z.div_euclid(chunk_size),
            ),
            Point3::new(
                self.max.x.div_euclid(chunk_size),
                self.max.y.div_euclid(chunk_size),
                self.max.z.div_euclid(chunk_size),
            ),
        ))
    }
}
