//! Area-of-interest polygon interface
//!
//! All analysis is restricted to an area-of-interest polygon supplied by
//! the enclosing generation command. The polygon geometry predicates are
//! not implemented here; [`AreaPolygon`] is the seam through which they
//! are consumed. Two implementations ship with the crate: [`Unbounded`]
//! for unrestricted runs, and [`RectangleArea`] for rectangular regions
//! (sufficient for tests and simple deployments).

use crate::coord::{block_bounds, BoundingBox};

/// Overlap predicates against the area-of-interest polygon.
///
/// Implementations must be pure: repeated calls with the same arguments
/// return the same answer, and no call mutates observable state. Decision
/// queries and guard construction call these predicates in arbitrary order.
pub trait AreaPolygon {
    /// Whether a closed ring of (lon, lat) vertices overlaps the polygon.
    ///
    /// The ring is the exterior of a changed element's bounding box; the
    /// first and last vertices coincide.
    fn ring_overlaps(&self, ring: &[(f64, f64)]) -> bool;

    /// Whether a block of `width × height` tiles at `(x, y)` overlaps
    /// the polygon.
    fn tile_block_overlaps(&self, zoom: u8, x: u32, y: u32, width: u32, height: u32) -> bool;
}

/// An area of interest covering the whole world.
///
/// Every overlap test answers `true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl AreaPolygon for Unbounded {
    fn ring_overlaps(&self, _ring: &[(f64, f64)]) -> bool {
        true
    }

    fn tile_block_overlaps(&self, _zoom: u8, _x: u32, _y: u32, _width: u32, _height: u32) -> bool {
        true
    }
}

/// A rectangular area of interest.
///
/// Overlap tests reduce to bounding-box intersection. Edges count as
/// overlapping, matching [`BoundingBox::intersects`].
#[derive(Debug, Clone, Copy)]
pub struct RectangleArea {
    bounds: BoundingBox,
}

impl RectangleArea {
    /// Create a rectangular area from its geographic bounds.
    pub fn new(bounds: BoundingBox) -> Self {
        Self { bounds }
    }

    /// The geographic bounds of this area.
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }
}

impl AreaPolygon for RectangleArea {
    fn ring_overlaps(&self, ring: &[(f64, f64)]) -> bool {
        match BoundingBox::of_points(ring.iter().copied()) {
            Some(bbox) => self.bounds.intersects(&bbox),
            None => false,
        }
    }

    fn tile_block_overlaps(&self, zoom: u8, x: u32, y: u32, width: u32, height: u32) -> bool {
        self.bounds
            .intersects(&block_bounds(zoom, x, y, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::tile_at;

    #[test]
    fn test_unbounded_accepts_everything() {
        let area = Unbounded;
        assert!(area.ring_overlaps(&BoundingBox::from_point(35.0, 32.0).exterior_ring()));
        assert!(area.tile_block_overlaps(16, 0, 0, 1, 1));
    }

    mod rectangle {
        use super::*;

        fn levant() -> RectangleArea {
            // Rectangle around the eastern Mediterranean.
            RectangleArea::new(BoundingBox::new(30.0, 28.0, 40.0, 36.0))
        }

        #[test]
        fn test_ring_inside_overlaps() {
            let ring = BoundingBox::from_point(35.0, 32.0).exterior_ring();
            assert!(levant().ring_overlaps(&ring));
        }

        #[test]
        fn test_ring_outside_does_not_overlap() {
            let ring = BoundingBox::from_point(-74.0, 40.7).exterior_ring();
            assert!(!levant().ring_overlaps(&ring));
        }

        #[test]
        fn test_ring_straddling_edge_overlaps() {
            let ring = BoundingBox::new(39.0, 31.0, 41.0, 33.0).exterior_ring();
            assert!(levant().ring_overlaps(&ring));
        }

        #[test]
        fn test_empty_ring_does_not_overlap() {
            assert!(!levant().ring_overlaps(&[]));
        }

        #[test]
        fn test_tile_inside_overlaps() {
            let tile = tile_at(35.0, 32.0, 12);
            assert!(levant().tile_block_overlaps(12, tile.x, tile.y, 1, 1));
        }

        #[test]
        fn test_tile_far_away_does_not_overlap() {
            let tile = tile_at(-74.0, 40.7, 12);
            assert!(!levant().tile_block_overlaps(12, tile.x, tile.y, 1, 1));
        }

        #[test]
        fn test_block_reaching_into_area_overlaps() {
            // A 3x3 block starting just west of the area still overlaps it.
            let tile = tile_at(29.9, 32.0, 8);
            assert!(levant().tile_block_overlaps(8, tile.x, tile.y, 3, 3));
        }
    }
}
