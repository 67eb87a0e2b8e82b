//! Element bounding-box resolution
//!
//! Computes the geographic extent(s) affected by a single change record,
//! recursing through relation membership. Composition relations
//! (multipolygon-style) accumulate one union box; other relations yield
//! each member's box independently, so one loose collection cannot force
//! regeneration of a huge area it does not coherently cover.
//!
//! Dangling references are skipped silently: an id absent from the given
//! snapshot simply contributes no box. A visited set guards the recursion
//! against relation-membership cycles, which OSM-style data can contain.

use std::collections::HashSet;

use crate::coord::BoundingBox;
use crate::snapshot::{ElementId, ElementKind, Snapshot};

/// Resolve the bounding box(es) affected by a change to `(kind, id)`.
///
/// - Point: one degenerate box at the element's location.
/// - Line: one box covering the line's full path.
/// - Relation: recursively resolved member boxes - accumulated into a
///   single union box for composition relations, yielded individually
///   otherwise. A composition relation with no resolvable members yields
///   nothing.
///
/// Unresolvable ids yield no boxes; repeated ids (membership cycles) are
/// visited once and then ignored.
pub fn element_bounds(snapshot: &dyn Snapshot, kind: ElementKind, id: ElementId) -> Vec<BoundingBox> {
    let mut boxes = Vec::new();
    let mut visited = HashSet::new();
    collect(snapshot, kind, id, &mut visited, &mut |bbox| {
        boxes.push(bbox)
    });
    boxes
}

fn collect(
    snapshot: &dyn Snapshot,
    kind: ElementKind,
    id: ElementId,
    visited: &mut HashSet<(ElementKind, ElementId)>,
    sink: &mut dyn FnMut(BoundingBox),
) {
    if !visited.insert((kind, id)) {
        // Already resolved within this change record; a repeat means a
        // membership cycle or a duplicated member reference.
        return;
    }
    match kind {
        ElementKind::Point => {
            if let Some((lon, lat)) = snapshot.point(id) {
                sink(BoundingBox::from_point(lon, lat));
            }
        }
        ElementKind::Line => {
            if let Some(path) = snapshot.line(id) {
                if let Some(bbox) = BoundingBox::of_points(path.iter().copied()) {
                    sink(bbox);
                }
            }
        }
        ElementKind::Relation => {
            let Some(relation) = snapshot.relation(id) else {
                return;
            };
            if relation.is_composition() {
                let mut union: Option<BoundingBox> = None;
                for member in &relation.members {
                    collect(snapshot, member.kind, member.id, visited, &mut |bbox| {
                        match &mut union {
                            Some(u) => u.extend(&bbox),
                            None => union = Some(bbox),
                        }
                    });
                }
                if let Some(bbox) = union {
                    sink(bbox);
                }
            } else {
                for member in &relation.members {
                    collect(snapshot, member.kind, member.id, visited, sink);
                }
            }
        }
    }
}
