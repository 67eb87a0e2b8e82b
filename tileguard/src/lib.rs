//! TileGuard - incremental invalidation for raster tile pyramids
//!
//! This library determines the minimal set of map tiles that must be
//! regenerated after a changeset of geographic elements (points, lines,
//! relations) has been applied to a dataset. Changed bounding boxes are
//! marked into a tile pyramid over an analyzed zoom range, a one-tile
//! guard band is derived around the marks inside an area-of-interest
//! polygon, and per-tile / per-block decision queries answer whether a
//! rendering pipeline needs to regenerate a given tile - including zoom
//! levels outside the analyzed range, by extrapolating through the pyramid.
//!
//! # High-Level API
//!
//! ```
//! use tileguard::area::Unbounded;
//! use tileguard::changeset::ChangeSet;
//! use tileguard::invalidator::TileInvalidator;
//! use tileguard::pyramid::ZoomRange;
//! use tileguard::snapshot::MemorySnapshot;
//!
//! let zooms = ZoomRange::new(7, 16).unwrap();
//! let mut invalidator = TileInvalidator::new(zooms, Unbounded);
//!
//! let xml = r#"<osmChange timestamp="2026-01-15T06:00:00Z"></osmChange>"#;
//! let changeset = ChangeSet::from_reader(xml.as_bytes()).unwrap();
//!
//! let base = MemorySnapshot::new();
//! let new = MemorySnapshot::new();
//! invalidator.analyze(&changeset, &base, &new);
//!
//! // Nothing changed, so nothing needs regeneration.
//! assert!(!invalidator.has_changes());
//! ```

pub mod area;
pub mod bounds;
pub mod changeset;
pub mod coord;
pub mod invalidator;
pub mod pyramid;
pub mod snapshot;

/// Version of the TileGuard library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
