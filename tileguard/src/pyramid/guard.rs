//! Guard band construction.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::area::AreaPolygon;
use crate::pyramid::{ChangedTileIndex, ZoomRange};

/// The polygon-restricted one-tile halo around every changed tile.
///
/// Derived in full from a [`ChangedTileIndex`]. Invariant: a tile belongs
/// to the guard at `zoom` only if it overlaps the area-of-interest polygon
/// and, above the coarsest analyzed level, its parent belongs to the guard
/// at `zoom - 1`. The guard at a fine zoom therefore never exceeds, in
/// covered area, the guard established at the coarser level above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardIndex {
    zooms: ZoomRange,
    guard: BTreeMap<u8, HashSet<(u32, u32)>>,
}

impl GuardIndex {
    /// Build the guard index from the changed tiles.
    ///
    /// Deterministic: building twice from the same index produces an
    /// identical result. Work is bounded by the number of distinct marked
    /// tiles - each 3x3 neighborhood candidate is examined at most once
    /// per zoom.
    pub fn build<A: AreaPolygon + ?Sized>(changed: &ChangedTileIndex, area: &A) -> Self {
        let zooms = changed.zoom_range();
        let mut guard: BTreeMap<u8, HashSet<(u32, u32)>> = BTreeMap::new();

        // Coarsest first: each level's membership test consults the level
        // above it.
        for zoom in zooms.iter() {
            let mut level = HashSet::new();
            let mut checked: HashSet<(u32, u32)> = HashSet::new();
            let span = 1i64 << zoom;

            if let Some(tiles) = changed.tiles(zoom) {
                for &(x, y) in tiles {
                    for dx in -1..=1i64 {
                        for dy in -1..=1i64 {
                            let (cx, cy) = (x as i64 + dx, y as i64 + dy);
                            if cx < 0 || cy < 0 || cx >= span || cy >= span {
                                continue;
                            }
                            let candidate = (cx as u32, cy as u32);
                            if !checked.insert(candidate) {
                                continue;
                            }
                            let parent_guarded = zoom == zooms.min()
                                || guard
                                    .get(&(zoom - 1))
                                    .is_some_and(|g| g.contains(&(candidate.0 / 2, candidate.1 / 2)));
                            if parent_guarded
                                && area.tile_block_overlaps(zoom, candidate.0, candidate.1, 1, 1)
                            {
                                level.insert(candidate);
                            }
                        }
                    }
                }
            }

            debug!(zoom, tiles = level.len(), "guard level built");
            guard.insert(zoom, level);
        }

        Self { zooms, guard }
    }

    /// The analyzed zoom range.
    pub fn zoom_range(&self) -> ZoomRange {
        self.zooms
    }

    /// Whether `(x, y)` belongs to the guard at `zoom`.
    pub fn contains(&self, zoom: u8, x: u32, y: u32) -> bool {
        self.guard
            .get(&zoom)
            .is_some_and(|tiles| tiles.contains(&(x, y)))
    }

    /// Number of guard tiles at `zoom`.
    pub fn count(&self, zoom: u8) -> usize {
        self.guard.get(&zoom).map_or(0, HashSet::len)
    }

    /// The guard tiles at `zoom`, if the zoom is analyzed.
    pub fn tiles(&self, zoom: u8) -> Option<&HashSet<(u32, u32)>> {
        self.guard.get(&zoom)
    }
}
