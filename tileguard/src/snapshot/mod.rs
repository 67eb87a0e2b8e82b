//! Geographic snapshot interface
//!
//! A snapshot is one state of the dataset - "base" (pre-change) or "new"
//! (post-change) - exposing lookup-by-id for the three element kinds.
//! Loading snapshots from compact binary extracts is the caller's concern;
//! this module defines the [`Snapshot`] trait consumed by bounds
//! resolution, the [`MemorySnapshot`] in-memory implementation, and the
//! [`SnapshotSource`] / [`SnapshotLoader`] pair through which an analysis
//! accepts either an already-loaded dataset or an extract path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Identifier of a geographic element.
pub type ElementId = i64;

/// The kind of a geographic element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A single location.
    Point,
    /// An ordered path of locations.
    Line,
    /// A collection of references to other elements.
    Relation,
}

impl ElementKind {
    /// Lowercase name used in changeset documents and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Point => "point",
            ElementKind::Line => "line",
            ElementKind::Relation => "relation",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference from a relation to another element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationMember {
    /// Kind of the referenced element.
    pub kind: ElementKind,
    /// Identifier of the referenced element.
    pub id: ElementId,
}

impl RelationMember {
    /// Create a new member reference.
    pub fn new(kind: ElementKind, id: ElementId) -> Self {
        Self { kind, id }
    }
}

/// A relation: a collection of member references with key/value tags.
#[derive(Debug, Clone, Default)]
pub struct Relation {
    /// References to the relation's members, in document order.
    pub members: Vec<RelationMember>,
    /// Key/value tags.
    pub tags: HashMap<String, String>,
}

impl Relation {
    /// Create an empty relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a relation from its members.
    pub fn with_members(members: Vec<RelationMember>) -> Self {
        Self {
            members,
            tags: HashMap::new(),
        }
    }

    /// Set a tag, builder style.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Whether this relation composes one areal feature.
    ///
    /// Composition relations (tag `type=multipolygon`) describe a single
    /// area; their members' extents are accumulated into one bounding box
    /// rather than treated independently.
    pub fn is_composition(&self) -> bool {
        self.tags.get("type").is_some_and(|t| t == "multipolygon")
    }
}

/// Lookup-by-id access to one dataset snapshot.
///
/// All lookups return `None` for ids absent from the snapshot; a dangling
/// reference is not an error anywhere in the analysis.
pub trait Snapshot {
    /// The (lon, lat) location of a point element.
    fn point(&self, id: ElementId) -> Option<(f64, f64)>;

    /// The full (lon, lat) path of a line element.
    fn line(&self, id: ElementId) -> Option<&[(f64, f64)]>;

    /// A relation element.
    fn relation(&self, id: ElementId) -> Option<&Relation>;
}

/// In-memory snapshot backed by hash maps.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    points: HashMap<ElementId, (f64, f64)>,
    lines: HashMap<ElementId, Vec<(f64, f64)>>,
    relations: HashMap<ElementId, Relation>,
}

impl MemorySnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a point element.
    pub fn insert_point(&mut self, id: ElementId, lon: f64, lat: f64) {
        self.points.insert(id, (lon, lat));
    }

    /// Insert a line element with its full path.
    pub fn insert_line(&mut self, id: ElementId, path: Vec<(f64, f64)>) {
        self.lines.insert(id, path);
    }

    /// Insert a relation element.
    pub fn insert_relation(&mut self, id: ElementId, relation: Relation) {
        self.relations.insert(id, relation);
    }

    /// Number of elements across all kinds.
    pub fn len(&self) -> usize {
        self.points.len() + self.lines.len() + self.relations.len()
    }

    /// Whether the snapshot holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Snapshot for MemorySnapshot {
    fn point(&self, id: ElementId) -> Option<(f64, f64)> {
        self.points.get(&id).copied()
    }

    fn line(&self, id: ElementId) -> Option<&[(f64, f64)]> {
        self.lines.get(&id).map(Vec::as_slice)
    }

    fn relation(&self, id: ElementId) -> Option<&Relation> {
        self.relations.get(&id)
    }
}

/// One input snapshot for an analysis call.
///
/// Either a dataset the caller already holds in memory, or the path of a
/// compact binary extract to be loaded fresh (and released again when the
/// analysis returns).
#[derive(Clone, Copy)]
pub enum SnapshotSource<'a> {
    /// An already-loaded dataset; ownership stays with the caller.
    Layer(&'a dyn Snapshot),
    /// Path of an extract to load through a [`SnapshotLoader`].
    Extract(&'a Path),
}

impl std::fmt::Debug for SnapshotSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotSource::Layer(_) => f.write_str("SnapshotSource::Layer"),
            SnapshotSource::Extract(path) => {
                f.debug_tuple("SnapshotSource::Extract").field(path).finish()
            }
        }
    }
}

/// Loads snapshots from binary extracts.
///
/// The extract format is external to this crate; the enclosing pipeline
/// supplies an implementation.
pub trait SnapshotLoader {
    /// Load the extract at `path` into memory.
    fn load_extract(&self, path: &Path) -> Result<Box<dyn Snapshot>, SnapshotError>;
}

/// Errors surfaced while resolving snapshot sources.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Loading a binary extract failed.
    #[error("failed to load extract {path}: {message}")]
    ExtractLoad {
        /// Path of the extract that failed to load.
        path: PathBuf,
        /// Loader-specific failure description.
        message: String,
    },
}
