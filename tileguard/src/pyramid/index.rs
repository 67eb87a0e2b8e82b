//! Changed-tile pyramid index.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

/// A contiguous, inclusive range of analyzed zoom levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    min: u8,
    max: u8,
}

/// Raised when a zoom range is constructed with `min > max` or a zoom
/// beyond the representable grid.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid zoom range {min}..={max}")]
pub struct InvalidZoomRange {
    /// Requested coarsest zoom.
    pub min: u8,
    /// Requested finest zoom.
    pub max: u8,
}

impl ZoomRange {
    /// Create a zoom range spanning `min..=max`.
    pub fn new(min: u8, max: u8) -> Result<Self, InvalidZoomRange> {
        if min > max || max > crate::coord::MAX_ZOOM {
            return Err(InvalidZoomRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Coarsest analyzed zoom.
    pub fn min(&self) -> u8 {
        self.min
    }

    /// Finest analyzed zoom.
    pub fn max(&self) -> u8 {
        self.max
    }

    /// Whether `zoom` lies within the analyzed range.
    pub fn contains(&self, zoom: u8) -> bool {
        (self.min..=self.max).contains(&zoom)
    }

    /// Iterate the analyzed zooms from coarsest to finest.
    pub fn iter(&self) -> std::ops::RangeInclusive<u8> {
        self.min..=self.max
    }
}

/// Mapping from zoom level to the set of changed tiles.
///
/// Tiles are marked at the finest analyzed zoom and propagated upward;
/// once marked, a tile is never unmarked, across arbitrarily many
/// successive changeset analyses against the same index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedTileIndex {
    zooms: ZoomRange,
    changed: BTreeMap<u8, HashSet<(u32, u32)>>,
}

impl ChangedTileIndex {
    /// Create an empty index over the analyzed zoom range.
    pub fn new(zooms: ZoomRange) -> Self {
        let changed = zooms.iter().map(|zoom| (zoom, HashSet::new())).collect();
        Self { zooms, changed }
    }

    /// The analyzed zoom range.
    pub fn zoom_range(&self) -> ZoomRange {
        self.zooms
    }

    /// Whether no tile has ever been marked.
    pub fn is_empty(&self) -> bool {
        // Upward propagation makes the coarsest level non-empty whenever
        // anything is marked, but checking every level costs nothing here.
        self.changed.values().all(HashSet::is_empty)
    }

    /// Whether `(x, y)` is marked at `zoom`.
    pub fn contains(&self, zoom: u8, x: u32, y: u32) -> bool {
        self.changed
            .get(&zoom)
            .is_some_and(|tiles| tiles.contains(&(x, y)))
    }

    /// Number of marked tiles at `zoom`.
    pub fn count(&self, zoom: u8) -> usize {
        self.changed.get(&zoom).map_or(0, HashSet::len)
    }

    /// The marked tiles at `zoom`, if the zoom is analyzed.
    pub fn tiles(&self, zoom: u8) -> Option<&HashSet<(u32, u32)>> {
        self.changed.get(&zoom)
    }

    /// Mark a tile at the finest analyzed zoom and propagate the mark
    /// upward through every coarser analyzed level.
    ///
    /// Stops as soon as an already-marked tile is reached: total marking
    /// work is bounded by the number of distinct marked tiles across all
    /// levels, not by the number of changed source elements.
    pub fn mark_upwards(&mut self, x: u32, y: u32) {
        let mut zoom = self.zooms.max();
        let (mut x, mut y) = (x, y);
        loop {
            if !self.changed.entry(zoom).or_default().insert((x, y)) {
                // Fixed point: this tile and all its ancestors are marked.
                break;
            }
            if zoom == self.zooms.min() {
                break;
            }
            zoom -= 1;
            x /= 2;
            y /= 2;
        }
    }

    /// Mark every tile of an inclusive rectangle at the finest analyzed
    /// zoom, propagating each mark upward.
    pub fn mark_rect(&mut self, left: u32, top: u32, right: u32, bottom: u32) {
        for x in left..=right {
            for y in top..=bottom {
                self.mark_upwards(x, y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: u8, max: u8) -> ZoomRange {
        ZoomRange::new(min, max).unwrap()
    }

    mod zoom_range {
        use super::*;

        #[test]
        fn test_rejects_inverted_range() {
            assert_eq!(
                ZoomRange::new(12, 7),
                Err(InvalidZoomRange { min: 12, max: 7 })
            );
        }

        #[test]
        fn test_rejects_zoom_beyond_grid() {
            assert!(ZoomRange::new(0, 31).is_err());
        }

        #[test]
        fn test_single_level_range() {
            let zooms = range(10, 10);
            assert!(zooms.contains(10));
            assert!(!zooms.contains(9));
            assert_eq!(zooms.iter().count(), 1);
        }
    }

    #[test]
    fn test_new_index_is_empty() {
        let index = ChangedTileIndex::new(range(7, 16));
        assert!(index.is_empty());
        for zoom in 7..=16 {
            assert_eq!(index.count(zoom), 0);
        }
    }

    #[test]
    fn test_mark_propagates_to_every_coarser_level() {
        let mut index = ChangedTileIndex::new(range(7, 16));
        index.mark_upwards(39139, 26613);

        let (mut x, mut y) = (39139u32, 26613u32);
        for zoom in (7..=16).rev() {
            assert!(index.contains(zoom, x, y), "expected mark at {}/{}/{}", zoom, x, y);
            assert_eq!(index.count(zoom), 1);
            x /= 2;
            y /= 2;
        }
    }

    #[test]
    fn test_marking_is_idempotent() {
        let mut index = ChangedTileIndex::new(range(7, 16));
        index.mark_upwards(39139, 26613);
        let snapshot = index.clone();

        index.mark_upwards(39139, 26613);
        assert_eq!(index, snapshot);
    }

    #[test]
    fn test_sibling_marks_share_ancestors() {
        let mut index = ChangedTileIndex::new(range(7, 16));
        index.mark_upwards(100, 200);
        index.mark_upwards(101, 200);

        assert_eq!(index.count(16), 2);
        // Both tiles share the parent (50, 100) at zoom 15.
        assert_eq!(index.count(15), 1);
    }

    #[test]
    fn test_mark_rect_is_inclusive_on_both_axes() {
        let mut index = ChangedTileIndex::new(range(14, 16));
        index.mark_rect(10, 20, 12, 23);

        assert_eq!(index.count(16), 3 * 4);
        assert!(index.contains(16, 10, 20));
        assert!(index.contains(16, 12, 23));
        assert!(!index.contains(16, 13, 20));
        assert!(!index.contains(16, 12, 24));
    }

    #[test]
    fn test_contains_outside_range_is_false() {
        let mut index = ChangedTileIndex::new(range(7, 16));
        index.mark_upwards(0, 0);
        assert!(!index.contains(6, 0, 0));
        assert!(!index.contains(17, 0, 0));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_upward_propagation_invariant(
                tiles in proptest::collection::vec((0u32..65536, 0u32..65536), 1..20)
            ) {
                let mut index = ChangedTileIndex::new(range(7, 16));
                for (x, y) in tiles {
                    index.mark_upwards(x, y);
                }

                // Whenever a tile is marked at zoom+1, its parent is
                // marked at zoom.
                for zoom in 7..16u8 {
                    for &(x, y) in index.tiles(zoom + 1).unwrap() {
                        prop_assert!(
                            index.contains(zoom, x / 2, y / 2),
                            "parent of {}/{}/{} not marked",
                            zoom + 1, x, y
                        );
                    }
                }
            }

            #[test]
            fn test_marking_is_monotonic(
                first in proptest::collection::vec((0u32..65536, 0u32..65536), 1..10),
                second in proptest::collection::vec((0u32..65536, 0u32..65536), 1..10)
            ) {
                let mut index = ChangedTileIndex::new(range(7, 16));
                for &(x, y) in &first {
                    index.mark_upwards(x, y);
                }
                let before = index.clone();

                for &(x, y) in &second {
                    index.mark_upwards(x, y);
                }

                // Every previously marked tile stays marked.
                for zoom in 7..=16u8 {
                    for &(x, y) in before.tiles(zoom).unwrap() {
                        prop_assert!(index.contains(zoom, x, y));
                    }
                }
            }
        }
    }
}
