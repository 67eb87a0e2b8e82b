//! Per-zoom analysis statistics.

/// Tile counts for one analyzed zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomStats {
    /// The zoom level.
    pub zoom: u8,
    /// Tiles directly marked as changed.
    pub changed: usize,
    /// Tiles to be regenerated (changed plus guard band).
    pub guard: usize,
}

/// Summary of changed vs. to-regenerate tiles per analyzed zoom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistics {
    per_zoom: Vec<ZoomStats>,
    total_changed: usize,
    total_guard: usize,
}

impl Statistics {
    /// Create statistics from per-zoom counts, computing the totals.
    pub fn new(per_zoom: Vec<ZoomStats>) -> Self {
        let total_changed = per_zoom.iter().map(|z| z.changed).sum();
        let total_guard = per_zoom.iter().map(|z| z.guard).sum();
        Self {
            per_zoom,
            total_changed,
            total_guard,
        }
    }

    /// Counts per zoom, coarsest first.
    pub fn per_zoom(&self) -> &[ZoomStats] {
        &self.per_zoom
    }

    /// Total changed tiles across all zooms.
    pub fn total_changed(&self) -> usize {
        self.total_changed
    }

    /// Total to-regenerate tiles across all zooms.
    pub fn total_guard(&self) -> usize {
        self.total_guard
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for z in &self.per_zoom {
            writeln!(
                f,
                "zoom {:2} has {:5} changed tiles, {:5} update tiles",
                z.zoom, z.changed, z.guard
            )?;
        }
        write!(
            f,
            "Total of    {:5} changed tiles, {:5} update tiles",
            self.total_changed, self.total_guard
        )
    }
}
