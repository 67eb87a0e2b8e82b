//! Tile pyramid indexes
//!
//! The changed-tile pyramid records which tiles a changeset analysis has
//! marked, per zoom level across the analyzed range, with every mark
//! propagated upward to the coarser levels. The guard index is a derived
//! view: a one-tile halo around the marks, bounded by the area-of-interest
//! polygon and tied hierarchically to the level above.

mod guard;
mod index;

pub use guard::GuardIndex;
pub use index::{ChangedTileIndex, InvalidZoomRange, ZoomRange};
