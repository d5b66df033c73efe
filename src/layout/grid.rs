//! # Grid Track Sizing and Placement
//!
//! Pure functions behind the grid element:
//! - cell placement (explicit cells first, then row-major auto-placement)
//! - track sizing from Absolute / Auto / Star definitions
//! - reconciliation of children spanning several tracks
//! - grouping rows into blocks that paginate as one unit

use std::collections::HashMap;
use std::ops::Range;

use super::distribute::{distribute_evenly, distribute_grow};
use crate::error::{QuireError, QuireResult};
use crate::geometry::EPSILON;
use crate::model::{ElementId, GridCell, GridLength};

/// Resolved position of one grid child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPlacement {
    /// Index of the child in the grid's child list.
    pub child: usize,
    pub row: usize,
    pub column: usize,
    pub row_span: usize,
    pub column_span: usize,
}

impl CellPlacement {
    pub fn row_end(&self) -> usize {
        self.row + self.row_span
    }

    pub fn column_end(&self) -> usize {
        self.column + self.column_span
    }

    fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.row..self.row_end()).flat_map(move |r| (self.column..self.column_end()).map(move |c| (r, c)))
    }
}

/// Place children on the grid.
///
/// Children with an explicit row or column are placed first; two of them
/// claiming the same cell is an error. The rest ask for (0, 0) and, when it
/// is taken, go to the first free cell in row-major order. `num_columns`
/// only bounds auto-placement.
pub fn place_children(
    cells: &[Option<GridCell>],
    ids: &[ElementId],
    num_columns: usize,
) -> QuireResult<Vec<CellPlacement>> {
    let num_columns = num_columns.max(1);
    let mut occupied: HashMap<(usize, usize), usize> = HashMap::new();
    let mut result: Vec<CellPlacement> = Vec::with_capacity(cells.len());

    // Phase 1: explicit cells.
    for (i, cell) in cells.iter().enumerate() {
        let Some(cell) = cell.filter(GridCell::is_explicit) else {
            continue;
        };
        let placement = CellPlacement {
            child: i,
            row: cell.row.unwrap_or(0),
            column: cell.column.unwrap_or(0),
            row_span: cell.row_span.max(1),
            column_span: cell.column_span.max(1),
        };
        for (r, c) in placement.cells() {
            if let Some(&owner) = occupied.get(&(r, c)) {
                return Err(QuireError::OverlappingCells {
                    first: ids[owner],
                    second: ids[i],
                    row: r,
                    column: c,
                });
            }
            occupied.insert((r, c), i);
        }
        result.push(placement);
    }

    // Phase 2: implicit cells.
    for (i, cell) in cells.iter().enumerate() {
        let cell = cell.unwrap_or_default();
        if cell.is_explicit() {
            continue;
        }
        let row_span = cell.row_span.max(1);
        let column_span = cell.column_span.max(1).min(num_columns);
        let is_free = |row: usize, column: usize| {
            column + column_span <= num_columns
                && (row..row + row_span)
                    .all(|r| (column..column + column_span).all(|c| !occupied.contains_key(&(r, c))))
        };

        let mut row = 0;
        let mut column = 0;
        while !is_free(row, column) {
            column += 1;
            if column + column_span > num_columns {
                column = 0;
                row += 1;
            }
        }

        let placement = CellPlacement {
            child: i,
            row,
            column,
            row_span,
            column_span,
        };
        for rc in placement.cells() {
            occupied.insert(rc, i);
        }
        result.push(placement);
    }

    result.sort_by_key(|p| p.child);
    Ok(result)
}

/// Whether a track behaves like Auto under the given stretch policy.
pub fn is_auto_like(track: GridLength, stretch_stars: bool) -> bool {
    match track {
        GridLength::Auto => true,
        GridLength::Star(_) => !stretch_stars,
        GridLength::Absolute(_) => false,
    }
}

/// Decide whether star tracks share out `available`. Stars collapse to
/// Auto when their total weight is zero, or when the space is infinite,
/// or when the grid is not filling and has no explicit size.
pub fn stars_stretch(tracks: &[GridLength], available: f64, fill_or_explicit: bool) -> bool {
    let total_weight: f64 = tracks
        .iter()
        .map(|t| match t {
            GridLength::Star(w) => w.max(0.0),
            _ => 0.0,
        })
        .sum();
    total_weight > 0.0 && available.is_finite() && fill_or_explicit
}

/// Resolve track sizes in points.
///
/// 1. Absolute tracks get their fixed size.
/// 2. Auto-like tracks get `auto_sizes[i]`, the largest single-track child.
/// 3. Spanning children grow the Auto-like tracks they cover.
/// 4. Star tracks (when stretching) share what is left by weight.
pub fn resolve_tracks(
    tracks: &[GridLength],
    available: f64,
    spacing: f64,
    auto_sizes: &[f64],
    spans: &[SpanRequirement],
    stretch_stars: bool,
) -> Vec<f64> {
    if tracks.is_empty() {
        return vec![];
    }

    let mut sizes: Vec<f64> = tracks
        .iter()
        .enumerate()
        .map(|(i, track)| match track {
            GridLength::Absolute(pts) => pts.max(0.0),
            _ if is_auto_like(*track, stretch_stars) => auto_sizes.get(i).copied().unwrap_or(0.0),
            _ => 0.0,
        })
        .collect();

    distribute_stars(tracks, &mut sizes, available, spacing, stretch_stars);
    if reconcile_spans(tracks, &mut sizes, spacing, spans, stretch_stars) {
        // Auto tracks grew; give the stars what is left now.
        for (i, track) in tracks.iter().enumerate() {
            if matches!(track, GridLength::Star(_)) && stretch_stars {
                sizes[i] = 0.0;
            }
        }
        distribute_stars(tracks, &mut sizes, available, spacing, stretch_stars);
    }
    sizes
}

fn distribute_stars(
    tracks: &[GridLength],
    sizes: &mut [f64],
    available: f64,
    spacing: f64,
    stretch_stars: bool,
) {
    if !stretch_stars {
        return;
    }
    let fixed: f64 = tracks
        .iter()
        .zip(sizes.iter())
        .filter(|(t, _)| !matches!(t, GridLength::Star(_)))
        .map(|(_, s)| *s)
        .sum();
    let remaining = (available - fixed - total_spacing(tracks.len(), spacing)).max(0.0);

    let mut shares: Vec<(f64, f64)> = tracks
        .iter()
        .filter_map(|t| match t {
            GridLength::Star(w) => Some((0.0, *w)),
            _ => None,
        })
        .collect();
    distribute_grow(&mut shares, remaining);

    let mut share = shares.into_iter();
    for (i, track) in tracks.iter().enumerate() {
        if matches!(track, GridLength::Star(_)) {
            sizes[i] = share.next().map_or(0.0, |(size, _)| size);
        }
    }
}

/// A child covering more than one track on an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanRequirement {
    pub start: usize,
    pub span: usize,
    /// Intrinsic size of the child along the axis.
    pub size: f64,
}

/// Grow Auto-like tracks so every spanning child fits. The deficit is split
/// evenly over the Auto-like tracks in the span; Absolute and stretching
/// Star tracks never grow. Returns whether any track changed.
pub fn reconcile_spans(
    tracks: &[GridLength],
    sizes: &mut [f64],
    spacing: f64,
    spans: &[SpanRequirement],
    stretch_stars: bool,
) -> bool {
    let mut ordered: Vec<&SpanRequirement> = spans.iter().filter(|s| s.span > 1).collect();
    ordered.sort_by_key(|s| s.span);

    let mut changed = false;
    for req in ordered {
        let end = (req.start + req.span).min(sizes.len());
        if req.start >= end {
            continue;
        }
        let current = span_extent(req.start, end, sizes, spacing);
        let deficit = req.size - current;
        if deficit <= EPSILON {
            continue;
        }
        let auto_tracks: Vec<usize> = (req.start..end)
            .filter(|&i| is_auto_like(tracks[i], stretch_stars))
            .collect();
        if !auto_tracks.is_empty() {
            distribute_evenly(sizes, &auto_tracks, deficit);
            changed = true;
        }
    }
    changed
}

/// Total spacing between `count` tracks.
pub fn total_spacing(count: usize, spacing: f64) -> f64 {
    if count > 1 {
        spacing * (count - 1) as f64
    } else {
        0.0
    }
}

/// Offset of a track from the start of the grid's content box.
pub fn track_offset(index: usize, sizes: &[f64], spacing: f64) -> f64 {
    sizes.iter().take(index).map(|s| s + spacing).sum()
}

/// Size covered by tracks `start..end`, including the spacing between them.
pub fn span_extent(start: usize, end: usize, sizes: &[f64], spacing: f64) -> f64 {
    let end = end.min(sizes.len());
    if start >= end {
        return 0.0;
    }
    sizes[start..end].iter().sum::<f64>() + total_spacing(end - start, spacing)
}

/// Group rows into blocks that must stay on one page.
///
/// A boundary between two rows is only allowed when no child spans across
/// it, so overlapping spans merge transitively into a single block.
pub fn row_blocks(num_rows: usize, placements: &[CellPlacement]) -> Vec<Range<usize>> {
    let mut can_break_before = vec![true; num_rows];
    for p in placements {
        for r in (p.row + 1)..p.row_end().min(num_rows) {
            can_break_before[r] = false;
        }
    }

    let mut blocks = Vec::new();
    let mut start = 0;
    for (r, &can_break) in can_break_before.iter().enumerate().skip(1) {
        if can_break {
            blocks.push(start..r);
            start = r;
        }
    }
    if num_rows > 0 {
        blocks.push(start..num_rows);
    }
    blocks
}
