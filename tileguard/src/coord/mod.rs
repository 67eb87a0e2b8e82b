//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (longitude/latitude)
//! and Web Mercator tile coordinates in standard slippy-map numbering
//! (origin top-left, y increasing southward), plus the geographic
//! [`BoundingBox`] value used throughout changeset analysis.

use std::f64::consts::PI;

/// Minimum latitude representable in Web Mercator projection.
pub const MIN_LAT: f64 = -85.05112878;

/// Maximum latitude representable in Web Mercator projection.
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum valid longitude.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude.
pub const MAX_LON: f64 = 180.0;

/// Maximum supported zoom level (tile indices stay within `u32`).
pub const MAX_ZOOM: u8 = 30;

/// A tile coordinate in standard slippy-map numbering.
///
/// `x` increases eastward, `y` increases southward (row 0 is the
/// northernmost row), and each zoom level has `2^zoom × 2^zoom` tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Zoom level (0 = whole world in one tile).
    pub zoom: u8,
    /// Tile column (X coordinate, 0 = west).
    pub x: u32,
    /// Tile row (Y coordinate, 0 = north).
    pub y: u32,
}

impl TileCoord {
    /// Create a new tile coordinate.
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// The tile one zoom level coarser that covers this tile.
    ///
    /// Returns `None` at zoom 0.
    pub fn parent(&self) -> Option<TileCoord> {
        if self.zoom == 0 {
            return None;
        }
        Some(TileCoord {
            zoom: self.zoom - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// The four tiles one zoom level finer that this tile covers.
    pub fn children(&self) -> [TileCoord; 4] {
        let zoom = self.zoom + 1;
        let (x, y) = (self.x * 2, self.y * 2);
        [
            TileCoord::new(zoom, x, y),
            TileCoord::new(zoom, x + 1, y),
            TileCoord::new(zoom, x, y + 1),
            TileCoord::new(zoom, x + 1, y + 1),
        ]
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Converts geographic coordinates to the tile containing them.
///
/// Uses the standard slippy-map formula:
///
/// ```text
/// x = floor((lon + 180) / 360 * 2^zoom)
/// y = floor((1 - ln(tan(lat_rad) + 1/cos(lat_rad)) / PI) / 2 * 2^zoom)
/// ```
///
/// Inputs are clamped rather than rejected: latitude to the Web Mercator
/// range, and the resulting tile indices to `[0, 2^zoom - 1]`. Bounding
/// box corners come from dataset geometry, and a corner at the pole or the
/// antimeridian must map to the nearest valid tile, not fail the analysis.
#[inline]
pub fn tile_at(lon: f64, lat: f64, zoom: u8) -> TileCoord {
    debug_assert!(zoom <= MAX_ZOOM, "zoom {} exceeds MAX_ZOOM", zoom);

    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let lon = lon.clamp(MIN_LON, MAX_LON);

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (1u64 << zoom) - 1;

    let x = ((lon + 180.0) / 360.0 * n).floor() as i64;
    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor() as i64;

    TileCoord {
        zoom,
        x: x.clamp(0, max_index as i64) as u32,
        y: y.clamp(0, max_index as i64) as u32,
    }
}

/// Converts a tile coordinate back to geographic coordinates.
///
/// Returns the (lon, lat) of the tile's northwest corner.
#[inline]
pub fn tile_to_lon_lat(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.x as f64 / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * tile.y as f64 / n)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lon, lat)
}

/// Geographic extent of a block of tiles.
///
/// The block spans `width × height` tiles starting at `(x, y)`.
pub fn block_bounds(zoom: u8, x: u32, y: u32, width: u32, height: u32) -> BoundingBox {
    let (min_lon, max_lat) = tile_to_lon_lat(&TileCoord::new(zoom, x, y));
    let (max_lon, min_lat) = tile_to_lon_lat(&TileCoord::new(zoom, x + width, y + height));
    BoundingBox {
        min_lon,
        min_lat,
        max_lon,
        max_lat,
    }
}

/// Geographic bounding box in longitude/latitude degrees.
///
/// Immutable value semantics: extension produces a grown box covering both
/// operands. Degenerate (zero-area) boxes are valid and represent a single
/// point, e.g. the location of a changed point element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Westernmost longitude.
    pub min_lon: f64,
    /// Southernmost latitude.
    pub min_lat: f64,
    /// Easternmost longitude.
    pub max_lon: f64,
    /// Northernmost latitude.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Create a degenerate bounding box from a single point.
    pub fn from_point(lon: f64, lat: f64) -> Self {
        Self {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }

    /// The smallest box covering a sequence of (lon, lat) points.
    ///
    /// Returns `None` for an empty sequence.
    pub fn of_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (lon, lat) = iter.next()?;
        let mut bbox = Self::from_point(lon, lat);
        for (lon, lat) in iter {
            bbox.extend_point(lon, lat);
        }
        Some(bbox)
    }

    /// Grow this box to cover another box (union).
    pub fn extend(&mut self, other: &BoundingBox) {
        self.min_lon = self.min_lon.min(other.min_lon);
        self.min_lat = self.min_lat.min(other.min_lat);
        self.max_lon = self.max_lon.max(other.max_lon);
        self.max_lat = self.max_lat.max(other.max_lat);
    }

    /// Grow this box to cover a point.
    pub fn extend_point(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    /// Whether this box and another share any area (edges count).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    /// The closed exterior ring of this box as (lon, lat) vertices.
    ///
    /// Counter-clockwise starting at the southwest corner, with the first
    /// vertex repeated at the end. This is the ring handed to the
    /// area-of-interest polygon overlap test.
    pub fn exterior_ring(&self) -> [(f64, f64); 5] {
        [
            (self.min_lon, self.min_lat),
            (self.max_lon, self.min_lat),
            (self.max_lon, self.max_lat),
            (self.min_lon, self.max_lat),
            (self.min_lon, self.min_lat),
        ]
    }

    /// Center point of the box as (lon, lat).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod tile_at {
        use super::*;

        #[test]
        fn test_new_york_city_at_zoom_16() {
            // New York City: 40.7128N, 74.0060W
            let tile = tile_at(-74.0060, 40.7128, 16);
            assert_eq!(tile.x, 19295);
            assert_eq!(tile.y, 24640);
            assert_eq!(tile.zoom, 16);
        }

        #[test]
        fn test_zoom_zero_is_single_tile() {
            let tile = tile_at(35.0, 32.0, 0);
            assert_eq!(tile, TileCoord::new(0, 0, 0));
        }

        #[test]
        fn test_polar_latitude_clamps_to_top_row() {
            let tile = tile_at(0.0, 90.0, 10);
            assert_eq!(tile.y, 0);
        }

        #[test]
        fn test_antimeridian_clamps_to_last_column() {
            let tile = tile_at(180.0, 0.0, 10);
            assert_eq!(tile.x, 1023);
        }

        #[test]
        fn test_max_latitude_maps_to_smaller_row_than_min_latitude() {
            // Rows increase southward.
            let north = tile_at(10.0, 50.0, 12);
            let south = tile_at(10.0, 40.0, 12);
            assert!(north.y < south.y);
        }

        #[test]
        fn test_roundtrip_within_one_tile() {
            let (lon, lat) = (35.0, 32.0);
            let tile = tile_at(lon, lat, 16);
            let (back_lon, back_lat) = tile_to_lon_lat(&tile);

            let tile_size = 360.0 / 2.0_f64.powi(16);
            assert!((back_lon - lon).abs() < tile_size);
            assert!((back_lat - lat).abs() < tile_size);
        }
    }

    mod tile_coord {
        use super::*;

        #[test]
        fn test_parent_halves_coordinates() {
            let tile = TileCoord::new(16, 39139, 26613);
            let parent = tile.parent().unwrap();
            assert_eq!(parent, TileCoord::new(15, 19569, 13306));
        }

        #[test]
        fn test_parent_of_root_is_none() {
            assert!(TileCoord::new(0, 0, 0).parent().is_none());
        }

        #[test]
        fn test_children_cover_parent() {
            let tile = TileCoord::new(7, 76, 52);
            for child in tile.children() {
                assert_eq!(child.parent().unwrap(), tile);
            }
        }

        #[test]
        fn test_display() {
            assert_eq!(format!("{}", TileCoord::new(16, 39139, 26613)), "16/39139/26613");
        }
    }

    mod bounding_box {
        use super::*;

        #[test]
        fn test_from_point_is_degenerate() {
            let bbox = BoundingBox::from_point(35.0, 32.0);
            assert_eq!(bbox.min_lon, bbox.max_lon);
            assert_eq!(bbox.min_lat, bbox.max_lat);
        }

        #[test]
        fn test_of_points_empty_is_none() {
            assert!(BoundingBox::of_points(std::iter::empty()).is_none());
        }

        #[test]
        fn test_of_points_covers_all() {
            let bbox = BoundingBox::of_points(vec![(10.0, 50.0), (12.0, 48.0), (11.0, 49.0)])
                .unwrap();
            assert_eq!(bbox, BoundingBox::new(10.0, 48.0, 12.0, 50.0));
        }

        #[test]
        fn test_extend_is_union() {
            let mut bbox = BoundingBox::new(10.0, 48.0, 12.0, 50.0);
            bbox.extend(&BoundingBox::new(9.0, 49.0, 11.0, 52.0));
            assert_eq!(bbox, BoundingBox::new(9.0, 48.0, 12.0, 52.0));
        }

        #[test]
        fn test_intersects_overlapping() {
            let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
            let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
            assert!(a.intersects(&b));
            assert!(b.intersects(&a));
        }

        #[test]
        fn test_intersects_disjoint() {
            let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
            let b = BoundingBox::new(11.0, 0.0, 20.0, 10.0);
            assert!(!a.intersects(&b));
        }

        #[test]
        fn test_intersects_touching_edges() {
            let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
            let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
            assert!(a.intersects(&b));
        }

        #[test]
        fn test_exterior_ring_is_closed() {
            let ring = BoundingBox::new(0.0, 0.0, 10.0, 10.0).exterior_ring();
            assert_eq!(ring[0], ring[4]);
            assert_eq!(ring.len(), 5);
        }
    }

    mod block_bounds {
        use super::*;

        #[test]
        fn test_single_tile_block_matches_tile_corners() {
            let bounds = block_bounds(10, 512, 512, 1, 1);
            let (nw_lon, nw_lat) = tile_to_lon_lat(&TileCoord::new(10, 512, 512));
            let (se_lon, se_lat) = tile_to_lon_lat(&TileCoord::new(10, 513, 513));
            assert_eq!(bounds.min_lon, nw_lon);
            assert_eq!(bounds.max_lat, nw_lat);
            assert_eq!(bounds.max_lon, se_lon);
            assert_eq!(bounds.min_lat, se_lat);
        }

        #[test]
        fn test_wider_block_covers_more_longitude() {
            let one = block_bounds(10, 512, 512, 1, 1);
            let three = block_bounds(10, 512, 512, 3, 1);
            assert!(three.max_lon > one.max_lon);
            assert_eq!(three.min_lon, one.min_lon);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_tile_indices_in_grid(
                lon in -180.0..180.0_f64,
                lat in -85.05..85.05_f64,
                zoom in 0u8..=18
            ) {
                let tile = tile_at(lon, lat, zoom);
                let max_tile = 2u32.pow(zoom as u32);
                prop_assert!(tile.x < max_tile);
                prop_assert!(tile.y < max_tile);
                prop_assert_eq!(tile.zoom, zoom);
            }

            #[test]
            fn test_longitude_monotonic(
                lat in 0.0..1.0_f64,
                lon1 in -180.0..-90.0_f64,
                lon2 in -90.0..0.0_f64,
                zoom in 10u8..=15
            ) {
                let tile1 = tile_at(lon1, lat, zoom);
                let tile2 = tile_at(lon2, lat, zoom);
                prop_assert!(tile1.x < tile2.x);
            }

            #[test]
            fn test_parent_contains_child_corner(
                lon in -180.0..180.0_f64,
                lat in -85.05..85.05_f64,
                zoom in 1u8..=18
            ) {
                // The tile at zoom-1 must be the parent of the tile at zoom.
                let fine = tile_at(lon, lat, zoom);
                let coarse = tile_at(lon, lat, zoom - 1);
                prop_assert_eq!(fine.parent().unwrap(), coarse);
            }

            #[test]
            fn test_bbox_extend_commutes(
                a in (-180.0..180.0_f64, -85.0..85.0_f64),
                b in (-180.0..180.0_f64, -85.0..85.0_f64)
            ) {
                let box_a = BoundingBox::from_point(a.0, a.1);
                let box_b = BoundingBox::from_point(b.0, b.1);

                let mut ab = box_a;
                ab.extend(&box_b);
                let mut ba = box_b;
                ba.extend(&box_a);

                prop_assert_eq!(ab, ba);
            }
        }
    }
}
