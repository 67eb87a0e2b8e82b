//! Changeset-driven tile invalidation
//!
//! [`TileInvalidator`] is the long-lived object tying the analysis
//! pipeline together: it consumes parsed changesets against base/new
//! snapshots, accumulates changed tiles into the pyramid, and answers the
//! two decision queries a rendering pipeline consumes - the per-block
//! [`TileInvalidator::generation_filter`] and the per-tile
//! [`TileInvalidator::save_filter`].
//!
//! The guard index is a cached derived view. Every analysis call
//! invalidates it; the first decision or statistics query afterwards
//! rebuilds it in full. Queries are pure and reentrant once the guard is
//! built.

mod stats;

pub use stats::{Statistics, ZoomStats};

use std::cell::RefCell;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::area::AreaPolygon;
use crate::bounds::element_bounds;
use crate::changeset::{ChangeAction, ChangeSet};
use crate::coord::{tile_at, BoundingBox, TileCoord};
use crate::pyramid::{ChangedTileIndex, GuardIndex, ZoomRange};
use crate::snapshot::{ElementKind, Snapshot, SnapshotError, SnapshotLoader, SnapshotSource};

/// Cached guard index state.
#[derive(Debug)]
enum GuardState {
    /// Invalidated; rebuilt on the next decision or statistics query.
    NotBuilt,
    /// Built from the current changed-tile index.
    Built(GuardIndex),
}

/// Per-changeset analysis summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Envelope timestamp of the analyzed changeset.
    pub timestamp: DateTime<Utc>,
    /// Point change records seen.
    pub points: u64,
    /// Line change records seen.
    pub lines: u64,
    /// Relation change records seen.
    pub relations: u64,
    /// Bounding boxes marked into the pyramid.
    pub boxes_marked: u64,
}

impl AnalysisSummary {
    fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            points: 0,
            lines: 0,
            relations: 0,
            boxes_marked: 0,
        }
    }

    fn count(&mut self, kind: ElementKind) {
        match kind {
            ElementKind::Point => self.points += 1,
            ElementKind::Line => self.lines += 1,
            ElementKind::Relation => self.relations += 1,
        }
    }
}

/// Decides which tiles must be regenerated after changeset analysis.
///
/// Created once per generation run and fed any number of changesets;
/// marks accumulate monotonically across analyses. With no analysis ever
/// performed, every tile answers "updated" - the conservative default is
/// to regenerate everything.
pub struct TileInvalidator<A: AreaPolygon> {
    area: A,
    zooms: ZoomRange,
    changed: Option<ChangedTileIndex>,
    guard: RefCell<GuardState>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl<A: AreaPolygon> TileInvalidator<A> {
    /// Create an invalidator for the analyzed zoom range, restricted to
    /// the given area-of-interest polygon.
    pub fn new(zooms: ZoomRange, area: A) -> Self {
        Self {
            area,
            zooms,
            changed: None,
            guard: RefCell::new(GuardState::NotBuilt),
            last_timestamp: None,
        }
    }

    /// The analyzed zoom range.
    pub fn zoom_range(&self) -> ZoomRange {
        self.zooms
    }

    /// The area-of-interest polygon.
    pub fn area(&self) -> &A {
        &self.area
    }

    /// Envelope timestamp of the most recently analyzed changeset.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    /// Analyze a changeset against base (pre-change) and new (post-change)
    /// snapshots, marking every affected tile.
    ///
    /// Deleted and modified elements are located in the base snapshot;
    /// created and modified elements in the new snapshot. Ids missing from
    /// a snapshot contribute nothing. An empty changeset is a no-op apart
    /// from initializing the index and invalidating the guard.
    ///
    /// May be called repeatedly with consecutive changesets; later
    /// analyses only add marks.
    pub fn analyze(
        &mut self,
        changeset: &ChangeSet,
        base: &dyn Snapshot,
        new: &dyn Snapshot,
    ) -> AnalysisSummary {
        *self.guard.borrow_mut() = GuardState::NotBuilt;
        self.last_timestamp = Some(changeset.timestamp);

        let zooms = self.zooms;
        let changed = self
            .changed
            .get_or_insert_with(|| ChangedTileIndex::new(zooms));

        let mut summary = AnalysisSummary::new(changeset.timestamp);
        if changeset.is_empty() {
            debug!("changeset is empty, nothing to analyze");
            return summary;
        }

        for record in &changeset.records {
            summary.count(record.kind);
            if matches!(record.action, ChangeAction::Delete | ChangeAction::Modify) {
                for bbox in element_bounds(base, record.kind, record.id) {
                    Self::mark_bbox(changed, &self.area, &bbox);
                    summary.boxes_marked += 1;
                }
            }
            if matches!(record.action, ChangeAction::Create | ChangeAction::Modify) {
                for bbox in element_bounds(new, record.kind, record.id) {
                    Self::mark_bbox(changed, &self.area, &bbox);
                    summary.boxes_marked += 1;
                }
            }
        }

        info!(
            timestamp = %summary.timestamp,
            points = summary.points,
            lines = summary.lines,
            relations = summary.relations,
            boxes = summary.boxes_marked,
            "changeset analyzed"
        );
        summary
    }

    /// [`analyze`](Self::analyze) with snapshot sources that may be
    /// extract paths.
    ///
    /// Extract snapshots are loaded through `loader` for the duration of
    /// this call and released when it returns; already-loaded layers stay
    /// with the caller.
    pub fn analyze_sources(
        &mut self,
        changeset: &ChangeSet,
        base: SnapshotSource<'_>,
        new: SnapshotSource<'_>,
        loader: &dyn SnapshotLoader,
    ) -> Result<AnalysisSummary, SnapshotError> {
        let base = Resolved::open(base, loader)?;
        let new = Resolved::open(new, loader)?;
        Ok(self.analyze(changeset, base.get(), new.get()))
    }

    /// Whether any analysis has marked at least one tile.
    ///
    /// The owning generation command skips execution entirely when this
    /// is false - either no changeset has been analyzed or none of the
    /// analyzed changes touched the area of interest.
    pub fn has_changes(&self) -> bool {
        self.changed.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Whether the tile at `(zoom, x, y)` must be regenerated.
    ///
    /// The single source of truth for tile decisions. Zooms outside the
    /// analyzed range are answered by extrapolating through the pyramid:
    /// finer zooms inherit their ancestor's decision at the finest
    /// analyzed level, coarser zooms answer true if any descendant at the
    /// coarsest analyzed level does.
    ///
    /// With no analysis ever performed, answers `true` for every tile.
    pub fn updated(&self, zoom: u8, x: u32, y: u32) -> bool {
        if self.changed.is_none() {
            return true;
        }
        self.ensure_guard();
        let state = self.guard.borrow();
        match &*state {
            GuardState::Built(guard) => {
                Self::resolve(guard, self.zooms, zoom, u64::from(x), u64::from(y))
            }
            GuardState::NotBuilt => unreachable!("guard index must be built before resolution"),
        }
    }

    /// Whether a block of `width x height` tiles at `(x, y)` is worth
    /// generating at all.
    ///
    /// Samples every third tile in each dimension plus the block's far
    /// edge. Exhaustive only while blocks stay a few tiles across - the
    /// sizes rendering engines actually request; for larger blocks it is
    /// an approximation that can only err towards regenerating too much
    /// at the edges it samples. [`save_filter`](Self::save_filter) remains
    /// the exact per-tile ground truth.
    pub fn generation_filter(&self, zoom: u8, x: u32, y: u32, width: u32, height: u32) -> bool {
        let generate = sample_positions(x, width).any(|sx| {
            sample_positions(y, height).any(|sy| self.updated(zoom, sx, sy))
        });
        debug!(
            zoom,
            x, y, width, height, generate, "super-tile generation filter"
        );
        generate
    }

    /// Whether an individual rendered tile is written to the output store.
    ///
    /// Exact, unconditional [`updated`](Self::updated) check.
    pub fn save_filter(&self, tile: TileCoord) -> bool {
        let save = self.updated(tile.zoom, tile.x, tile.y);
        debug!(tile = %tile, save, "tile save filter");
        save
    }

    /// Changed and to-regenerate tile counts per analyzed zoom.
    ///
    /// Forces guard construction; pure read otherwise. With no analysis
    /// ever performed every count is zero.
    pub fn statistics(&self) -> Statistics {
        self.ensure_guard();
        let state = self.guard.borrow();
        let per_zoom = self
            .zooms
            .iter()
            .map(|zoom| ZoomStats {
                zoom,
                changed: self.changed.as_ref().map_or(0, |c| c.count(zoom)),
                guard: match &*state {
                    GuardState::Built(guard) => guard.count(zoom),
                    GuardState::NotBuilt => 0,
                },
            })
            .collect();
        Statistics::new(per_zoom)
    }

    /// Mark every tile covering a bounding box, at the finest analyzed
    /// zoom, propagating marks upward. Boxes outside the area-of-interest
    /// polygon are ignored entirely.
    fn mark_bbox(changed: &mut ChangedTileIndex, area: &A, bbox: &BoundingBox) {
        if !area.ring_overlaps(&bbox.exterior_ring()) {
            return;
        }
        let max_zoom = changed.zoom_range().max();
        // Rows increase southward: the top row comes from the maximum
        // latitude, the bottom row from the minimum.
        let top_left = tile_at(bbox.min_lon, bbox.max_lat, max_zoom);
        let bottom_right = tile_at(bbox.max_lon, bbox.min_lat, max_zoom);
        changed.mark_rect(top_left.x, top_left.y, bottom_right.x, bottom_right.y);
    }

    /// Rebuild the guard index if it has been invalidated.
    ///
    /// Idempotent; a no-op while already built. Does nothing before the
    /// first analysis (there is no index to derive from).
    fn ensure_guard(&self) {
        let mut state = self.guard.borrow_mut();
        if matches!(*state, GuardState::NotBuilt) {
            if let Some(changed) = &self.changed {
                debug!("rebuilding guard index");
                *state = GuardState::Built(GuardIndex::build(changed, &self.area));
            }
        }
    }

    fn resolve(guard: &GuardIndex, zooms: ZoomRange, zoom: u8, x: u64, y: u64) -> bool {
        if zoom > zooms.max() {
            // Finer than analyzed: the decision is inherited from the
            // ancestor at the finest analyzed level.
            let shift = u32::from(zoom - zooms.max());
            let (px, py) = if shift >= u64::BITS {
                (0, 0)
            } else {
                (x >> shift, y >> shift)
            };
            return Self::resolve(guard, zooms, zooms.max(), px, py);
        }
        if zoom < zooms.min() {
            // Coarser than analyzed: updated if any of the four children
            // one level finer is.
            let zoom = zoom + 1;
            let (x, y) = (x * 2, y * 2);
            return Self::resolve(guard, zooms, zoom, x, y)
                || Self::resolve(guard, zooms, zoom, x + 1, y)
                || Self::resolve(guard, zooms, zoom, x, y + 1)
                || Self::resolve(guard, zooms, zoom, x + 1, y + 1);
        }
        debug_assert!(
            x < (1u64 << zoom) && y < (1u64 << zoom),
            "tile {}/{}/{} outside the grid",
            zoom,
            x,
            y
        );
        if x > u64::from(u32::MAX) || y > u64::from(u32::MAX) {
            return false;
        }
        guard.contains(zoom, x as u32, y as u32)
    }
}

/// Sample positions across one block dimension: every third tile from the
/// block's near edge, plus the far edge.
fn sample_positions(start: u32, extent: u32) -> impl Iterator<Item = u32> {
    let far_edge = (extent > 0).then(|| start + extent - 1);
    (start..start.saturating_add(extent))
        .step_by(3)
        .chain(far_edge)
}

/// A snapshot source resolved for the duration of one analysis call.
enum Resolved<'a> {
    Borrowed(&'a dyn Snapshot),
    Owned(Box<dyn Snapshot>),
}

impl<'a> Resolved<'a> {
    fn open(
        source: SnapshotSource<'a>,
        loader: &dyn SnapshotLoader,
    ) -> Result<Self, SnapshotError> {
        match source {
            SnapshotSource::Layer(snapshot) => Ok(Resolved::Borrowed(snapshot)),
            SnapshotSource::Extract(path) => {
                debug!(path = %path.display(), "loading snapshot extract");
                Ok(Resolved::Owned(loader.load_extract(path)?))
            }
        }
    }

    fn get(&self) -> &dyn Snapshot {
        match self {
            Resolved::Borrowed(snapshot) => *snapshot,
            Resolved::Owned(snapshot) => snapshot.as_ref(),
        }
    }
}
