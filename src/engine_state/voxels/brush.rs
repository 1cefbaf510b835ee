//! # Brush Module
//!
//! Precomputed offset sets for spherical area edits.
//!
//! A brush of radius `r` holds every integer offset whose cell center lies within `r` of the
//! center of the edited cell, sorted by that distance so shape functions see cells from the
//! inside out. Brushes depend on nothing but their radius, so each radius is computed once
//! and shared through a [`BrushCache`].

use std::collections::HashMap;
use std::rc::Rc;

use cgmath::{MetricSpace, Point3, Vector3};
use log::debug;

/// One cell of a brush.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushOffset {
    /// Offset from the brush center cell
    pub offset: Vector3<i32>,
    /// Distance between the cell's corner and the center cell's center
    pub distance: f32,
}

/// A distance-sorted set of offsets within a sphere.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    radius: u32,
    offsets: Vec<BrushOffset>,
}

impl Brush {
    /// Computes the brush of `radius`.
    ///
    /// Candidate offsets span `-radius..=radius + 1` on each axis; the extra layer on the
    /// positive side balances the half-cell shift of the center.
    pub fn new(radius: u32) -> Self {
        let r = radius as i32;
        let center = Point3::new(0.5f32, 0.5, 0.5);
        let mut offsets = Vec::new();
        for z in -r..=r + 1 {
            for y in -r..=r + 1 {
                for x in -r..=r + 1 {
                    let distance = Point3::new(x as f32, y as f32, z as f32).distance(center);
                    if distance <= radius as f32 {
                        offsets.push(BrushOffset {
                            offset: Vector3::new(x, y, z),
                            distance,
                        });
                    }
                }
            }
        }
        offsets.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Brush { radius, offsets }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Offsets in ascending distance order.
    pub fn offsets(&self) -> &[BrushOffset] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Brushes memoized by radius. Never invalidated.
#[derive(Debug, Default)]
pub struct BrushCache {
    brushes: HashMap<u32, Rc<Brush>>,
}

impl BrushCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the brush of `radius`, computing it on first use.
    pub fn get(&mut self, radius: u32) -> Rc<Brush> {
        self.brushes
            .entry(radius)
            .or_insert_with(|| {
                let brush = Brush::new(radius);
                debug!("Computed brush of radius {} ({} cells)", radius, brush.len());
                Rc::new(brush)
            })
            .clone()
    }

    /// Number of distinct radii computed so far.
    pub fn len(&self) -> usize {
        self.brushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brushes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_brush_is_the_eight_cells_around_the_center_corner() {
        let brush = Brush::new(1);
        assert_eq!(brush.len(), 8);
        for cell in brush.offsets() {
            assert!((0..=1).contains(&cell.offset.x));
            assert!((0..=1).contains(&cell.offset.y));
            assert!((0..=1).contains(&cell.offset.z));
        }
        assert!(Brush::new(0).is_empty());
    }

    #[test]
    fn offsets_are_sorted_by_distance_and_within_radius() {
        let brush = Brush::new(4);
        assert!(brush.len() > 8);
        assert!(brush
            .offsets()
            .windows(2)
            .all(|pair| pair[0].distance <= pair[1].distance));
        assert!(brush.offsets().iter().all(|cell| cell.distance <= 4.0));
    }

    #[test]
    fn cache_computes_each_radius_once() {
        let mut cache = BrushCache::new();
        let first = cache.get(3);
        let second = cache.get(3);
        assert!(Rc::ptr_eq(&first, &second));
        cache.get(2);
        assert_eq!(cache.len(), 2);
    }
}
