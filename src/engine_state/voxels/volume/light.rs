//! # Light Propagation
//!
//! Derives the volume's light field from its voxels and height map.
//!
//! Every empty cell at or above its column's height map value is open to the sky and holds
//! [`MAX_LIGHT`]. From there light floods through empty cells (6-connected), losing the
//! volume's attenuation per step, as a breadth-first relaxation: a cell is re-queued whenever
//! a neighbor proposes a brighter value, until nothing improves. Solid cells hold 0.
//!
//! After an edit the same relaxation runs from a local frontier instead of the whole grid.
//! Light that was fed by a cell which is now solid (or by a column that lost its sky
//! exposure) is first cleared by a darkness pass, then the cleared region is refilled from
//! the brighter cells bordering it.

use std::collections::{HashMap, VecDeque};

use cgmath::Point3;
use log::{debug, info};
use web_time::Instant;

use super::{Volume, VoxelBox, EMPTY, MAX_LIGHT};
use crate::engine_state::voxels::face_direction::FaceDirection;

/// Runs full and incremental light propagation over a borrowed [`Volume`].
pub struct LightPropagator<'a> {
    volume: &'a mut Volume,
    /// Light value each touched cell held before the current incremental pass.
    original: HashMap<usize, u8>,
}

impl<'a> LightPropagator<'a> {
    /// Borrows `volume` for the duration of one propagation.
    pub fn new(volume: &'a mut Volume) -> Self {
        LightPropagator {
            volume,
            original: HashMap::new(),
        }
    }

    /// Recomputes the whole light field.
    pub fn propagate(mut self) {
        let start = Instant::now();
        self.volume.light.fill(0);

        let mut frontier = VecDeque::new();
        let (width, height, depth) = (
            self.volume.width as i32,
            self.volume.height as i32,
            self.volume.depth as i32,
        );
        for z in 0..depth {
            for x in 0..width {
                let top = self.volume.height_map[self.volume.column(x, z)] as i32;
                for y in top..height {
                    if let Some(index) = self.volume.voxel(Point3::new(x, y, z)) {
                        self.volume.light[index] = MAX_LIGHT;
                        frontier.push_back(index);
                    }
                }
            }
        }
        let sky_cells = frontier.len();
        self.relax(frontier, false);

        info!(
            "Propagated light from {} sky cells in {:?}",
            sky_cells,
            start.elapsed()
        );
    }

    /// Re-derives light after the voxel at `pos` changed from `previous` to its current value.
    ///
    /// The volume's height map must already reflect the edit; `previous_top` is the column
    /// height before it.
    ///
    /// # Returns
    /// The box of every cell whose light value ended up different.
    pub fn update(mut self, pos: Point3<i32>, previous: u8, previous_top: u32) -> VoxelBox {
        let Some(index) = self.volume.voxel(pos) else {
            return VoxelBox::empty();
        };
        let value = self.volume.voxels[index];
        let top = self.volume.height_map[self.volume.column(pos.x, pos.z)];

        let mut darkness = VecDeque::new();
        let mut frontier = VecDeque::new();

        if value != EMPTY {
            if previous == EMPTY {
                self.darken(index, &mut darkness);
                // Cells between the old column top and the new voxel lost their sky.
                for y in previous_top as i32..pos.y {
                    if let Some(shadowed) = self.volume.voxel(Point3::new(pos.x, y, pos.z)) {
                        self.darken(shadowed, &mut darkness);
                    }
                }
            }
        } else if pos.y as u32 >= top {
            for y in top as i32..=pos.y {
                if let Some(exposed) = self.volume.voxel(Point3::new(pos.x, y, pos.z)) {
                    self.set_light(exposed, MAX_LIGHT);
                    frontier.push_back(exposed);
                }
            }
        } else {
            for face in FaceDirection::all() {
                if let Some(neighbor) = self.volume.voxel(face.neighbor(pos)) {
                    if self.volume.voxels[neighbor] == EMPTY && self.volume.light[neighbor] > 0 {
                        frontier.push_back(neighbor);
                    }
                }
            }
        }

        self.clear_darkness(darkness, &mut frontier);
        self.relax(frontier, true);

        let mut changed = VoxelBox::empty();
        for (&cell, &before) in &self.original {
            if self.volume.light[cell] != before {
                changed.include(self.volume.position(cell));
            }
        }
        debug!(
            "Light update at {:?} touched {} cells, {} changed",
            pos,
            self.original.len(),
            changed.volume()
        );
        changed
    }

    fn set_light(&mut self, index: usize, level: u8) {
        let before = self.volume.light[index];
        self.original.entry(index).or_insert(before);
        self.volume.light[index] = level;
    }

    fn is_sky(&self, index: usize) -> bool {
        let pos = self.volume.position(index);
        pos.y as u32 >= self.volume.height_map[self.volume.column(pos.x, pos.z)]
    }

    fn darken(&mut self, index: usize, darkness: &mut VecDeque<(usize, u8)>) {
        let level = self.volume.light[index];
        if level > 0 {
            self.set_light(index, 0);
            darkness.push_back((index, level));
        }
    }

    /// Clears every cell whose light may have come from a darkened cell.
    ///
    /// Brighter neighbors, and sky cells, are independent sources and go to `frontier` so
    /// the cleared region can be refilled.
    fn clear_darkness(
        &mut self,
        mut darkness: VecDeque<(usize, u8)>,
        frontier: &mut VecDeque<usize>,
    ) {
        while let Some((index, level)) = darkness.pop_front() {
            let pos = self.volume.position(index);
            for face in FaceDirection::all() {
                let Some(neighbor) = self.volume.voxel(face.neighbor(pos)) else {
                    continue;
                };
                if self.volume.voxels[neighbor] != EMPTY {
                    continue;
                }
                let neighbor_level = self.volume.light[neighbor];
                if neighbor_level == 0 {
                    continue;
                }
                if neighbor_level < level && !self.is_sky(neighbor) {
                    self.set_light(neighbor, 0);
                    darkness.push_back((neighbor, neighbor_level));
                } else {
                    frontier.push_back(neighbor);
                }
            }
        }
    }

    /// Breadth-first relaxation until no empty cell can be brightened.
    fn relax(&mut self, mut frontier: VecDeque<usize>, track: bool) {
        let attenuation = self.volume.light_attenuation;
        while let Some(index) = frontier.pop_front() {
            let level = self.volume.light[index];
            if level <= attenuation {
                continue;
            }
            let proposed = level - attenuation;
            let pos = self.volume.position(index);
            for face in FaceDirection::all() {
                let Some(neighbor) = self.volume.voxel(face.neighbor(pos)) else {
                    continue;
                };
                if self.volume.voxels[neighbor] != EMPTY
                    || self.volume.light[neighbor] >= proposed
                {
                    continue;
                }
                if track {
                    self.set_light(neighbor, proposed);
                } else {
                    self.volume.light[neighbor] = proposed;
                }
                frontier.push_back(neighbor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 16^3 volume with a solid floor at y = 0 and a roof over part of it.
    fn sheltered_volume() -> Volume {
        let mut volume = Volume::new(16, 16, 16, 8).unwrap();
        for z in 0..16 {
            for x in 0..16 {
                volume.update(Point3::new(x, 0, z), 1, false);
            }
        }
        for z in 4..12 {
            for x in 4..12 {
                volume.update(Point3::new(x, 6, z), 1, false);
            }
        }
        volume.propagate();
        volume
    }

    fn fresh_light(volume: &Volume) -> Vec<u8> {
        let mut copy = volume.clone();
        copy.propagate();
        copy.light().to_vec()
    }

    #[test]
    fn sky_exposed_cells_are_fully_lit_and_solids_are_dark() {
        let volume = sheltered_volume();
        for z in 0..16 {
            for x in 0..16 {
                let top = volume.column_height(x, z).unwrap() as i32;
                for y in top..16 {
                    assert_eq!(volume.light_at(Point3::new(x, y, z)), MAX_LIGHT);
                }
            }
        }
        assert_eq!(volume.light_at(Point3::new(5, 0, 5)), 0);
        assert_eq!(volume.light_at(Point3::new(5, 6, 5)), 0);
    }

    #[test]
    fn light_fades_under_the_roof() {
        let volume = sheltered_volume();
        let attenuation = volume.light_attenuation();
        // One step in from the open edge of the roof.
        assert_eq!(
            volume.light_at(Point3::new(4, 3, 8)),
            MAX_LIGHT - attenuation
        );
        let mut previous = MAX_LIGHT;
        for x in (0..=8).map(|x| x as i32) {
            let level = volume.light_at(Point3::new(x, 3, 8));
            assert!(level <= previous, "light increased moving away from the sky at x={}", x);
            previous = level;
        }
        assert!(volume.light_at(Point3::new(8, 3, 8)) < MAX_LIGHT - attenuation);
    }

    #[test]
    fn incremental_updates_match_full_propagation() {
        let mut volume = sheltered_volume();
        // Close a gap, dig a hole in the roof, build a pillar and remove it again.
        let edits = [
            (Point3::new(3, 6, 8), 1),
            (Point3::new(8, 6, 8), EMPTY),
            (Point3::new(2, 1, 2), 1),
            (Point3::new(2, 2, 2), 1),
            (Point3::new(2, 2, 2), EMPTY),
            (Point3::new(8, 6, 8), 1),
            (Point3::new(10, 12, 10), 1),
        ];
        for (pos, value) in edits {
            volume.update(pos, value, true);
            assert_eq!(volume.light(), fresh_light(&volume).as_slice(), "after editing {:?}", pos);
        }
    }

    #[test]
    fn update_reports_cells_whose_light_changed() {
        let mut volume = sheltered_volume();
        let hole = Point3::new(8, 6, 8);
        let below = Point3::new(8, 3, 8);
        assert!(volume.light_at(below) < MAX_LIGHT);

        let changed = volume.update(hole, EMPTY, true);
        assert_eq!(volume.light_at(below), MAX_LIGHT);
        assert!(changed.contains(hole));
        assert!(changed.contains(below));
        assert!(changed.contains(Point3::new(9, 3, 8)));
    }
}
