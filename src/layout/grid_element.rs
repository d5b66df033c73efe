//! # Grid Layout
//!
//! Places children on rows and columns, sizes the tracks, and splits
//! between row blocks across pages. Track math lives in [`super::grid`];
//! this module drives the children through Measure and Arrange.

use std::ops::Range;

use super::grid::{self, CellPlacement, SpanRequirement};
use super::page_break::{decide_break, fit_count, BreakDecision, BreakRules};
use super::{
    arrange_element, continuation_element, measure_element, render_element, ArrangeState, Arrangement,
    ElementRenderer, GenerationContext, MeasureState, Measured,
};
use crate::canvas::Canvas;
use crate::error::{QuireError, QuireResult};
use crate::geometry::{Rect, Size};
use crate::model::{Element, ElementId, ElementKind, GridCell, GridElement, GridLength};
use crate::style::Alignment;

pub(crate) struct GridRenderer;

#[derive(Debug, Clone)]
pub(crate) struct GridMeasure {
    placements: Vec<CellPlacement>,
    columns: Vec<f64>,
    rows: Vec<f64>,
    /// Row ranges that must stay together on one page.
    blocks: Vec<Range<usize>>,
}

fn column_tracks(grid: &GridElement, count: usize) -> Vec<GridLength> {
    if grid.columns.is_empty() {
        return vec![GridLength::default(); count];
    }
    (0..count)
        .map(|c| grid.columns.get(c).map_or(GridLength::Auto, |d| d.width))
        .collect()
}

fn row_tracks(grid: &GridElement, count: usize) -> Vec<GridLength> {
    (0..count)
        .map(|r| grid.rows.get(r).map_or(GridLength::Auto, |d| d.height))
        .collect()
}

impl ElementRenderer for GridRenderer {
    fn can_split(&self) -> bool {
        true
    }

    fn measure(
        &self,
        ctx: &mut GenerationContext<'_>,
        id: ElementId,
        el: &Element,
        available: Size,
    ) -> QuireResult<Measured> {
        let ElementKind::Grid(grid) = &el.kind else {
            return Err(QuireError::UnknownElement { element: id });
        };

        let cells = el
            .children
            .iter()
            .map(|&child| ctx.element(child).map(|c| c.cell))
            .collect::<QuireResult<Vec<Option<GridCell>>>>()?;
        let explicit_columns = cells
            .iter()
            .flatten()
            .filter(|c| c.is_explicit())
            .map(|c| c.column.unwrap_or(0) + c.column_span.max(1))
            .max()
            .unwrap_or(0);
        let num_columns = grid.columns.len().max(explicit_columns).max(1);
        let placements = grid::place_children(&cells, &el.children, num_columns)?;
        let num_rows = placements
            .iter()
            .map(CellPlacement::row_end)
            .max()
            .unwrap_or(0)
            .max(grid.rows.len());

        // Columns: intrinsic widths for Auto-like tracks, then stars.
        let col_tracks = column_tracks(grid, num_columns);
        let fills = el.style.width.is_some() || el.style.horizontal_alignment == Alignment::Fill;
        let stretch_columns = grid::stars_stretch(&col_tracks, available.width, fills);
        let mut col_auto = vec![0.0; num_columns];
        let mut col_spans = Vec::new();
        for p in &placements {
            let touches_auto = (p.column..p.column_end().min(num_columns))
                .any(|c| grid::is_auto_like(col_tracks[c], stretch_columns));
            if !touches_auto {
                continue;
            }
            let info = measure_element(ctx, el.children[p.child], Size::unbounded())?;
            if p.column_span == 1 {
                col_auto[p.column] = f64::max(col_auto[p.column], info.width);
            } else {
                col_spans.push(SpanRequirement {
                    start: p.column,
                    span: p.column_span,
                    size: info.width,
                });
            }
        }
        let columns = grid::resolve_tracks(
            &col_tracks,
            available.width,
            grid.column_spacing,
            &col_auto,
            &col_spans,
            stretch_columns,
        );

        // Rows: measure every child at its final cell width.
        let mut row_auto = vec![0.0; num_rows];
        let mut row_spans = Vec::new();
        for p in &placements {
            let width = grid::span_extent(p.column, p.column_end(), &columns, grid.column_spacing);
            let info = measure_element(ctx, el.children[p.child], Size::new(width, f64::INFINITY))?;
            if p.row_span == 1 {
                row_auto[p.row] = f64::max(row_auto[p.row], info.height);
            } else {
                row_spans.push(SpanRequirement {
                    start: p.row,
                    span: p.row_span,
                    size: info.height,
                });
            }
        }
        let r_tracks = row_tracks(grid, num_rows);
        let stretch_rows = grid::stars_stretch(&r_tracks, available.height, el.style.height.is_some());
        let rows = grid::resolve_tracks(
            &r_tracks,
            available.height,
            grid.row_spacing,
            &row_auto,
            &row_spans,
            stretch_rows,
        );

        let size = Size::new(
            grid::span_extent(0, columns.len(), &columns, grid.column_spacing),
            grid::span_extent(0, rows.len(), &rows, grid.row_spacing),
        );
        tracing::trace!(element = %id, columns = ?columns, rows = ?rows, "grid tracks resolved");

        Ok(Measured {
            size,
            state: MeasureState::Grid(GridMeasure {
                blocks: grid::row_blocks(num_rows, &placements),
                placements,
                columns,
                rows,
            }),
        })
    }

    fn arrange(
        &self,
        ctx: &mut GenerationContext<'_>,
        id: ElementId,
        el: &Element,
        content: Rect,
        state: &MeasureState,
    ) -> QuireResult<Arrangement> {
        let (ElementKind::Grid(grid), MeasureState::Grid(measure)) = (&el.kind, state) else {
            return Err(QuireError::ArrangeBeforeMeasure { element: id });
        };
        let spacing = grid.row_spacing;

        // The spacing above a block belongs to it, except for the first.
        let block_heights: Vec<f64> = measure
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                let gap = if i > 0 { spacing } else { 0.0 };
                gap + grid::span_extent(block.start, block.end, &measure.rows, spacing)
            })
            .collect();

        let taken_blocks = if el.style.height.is_some() {
            measure.blocks.len()
        } else {
            match decide_break(content.height, &block_heights, BreakRules::default()) {
                BreakDecision::Place => measure.blocks.len(),
                BreakDecision::Split {
                    items_on_current_page,
                } => items_on_current_page,
                BreakDecision::MoveToNextPage if ctx.force_progress() => {
                    fit_count(content.height, &block_heights).max(1)
                }
                BreakDecision::MoveToNextPage => return Ok(Arrangement::deferred(id)),
            }
        };
        let taken_rows = taken_blocks
            .checked_sub(1)
            .and_then(|last| measure.blocks.get(last))
            .map_or(0, |block| block.end);

        // Cells always receive their full track extent.
        let previous = ctx.set_force_progress(true);
        let mut arranged = Vec::new();
        for p in measure.placements.iter().filter(|p| p.row < taken_rows) {
            let slot = Rect::new(
                content.x + grid::track_offset(p.column, &measure.columns, grid.column_spacing),
                content.y + grid::track_offset(p.row, &measure.rows, spacing),
                grid::span_extent(p.column, p.column_end(), &measure.columns, grid.column_spacing),
                grid::span_extent(p.row, p.row_end(), &measure.rows, spacing),
            );
            let child = el.children[p.child];
            let info = arrange_element(ctx, child, slot)?;
            if let Some(rest) = info.continuation.filter(|&rest| rest != child) {
                ctx.discard(rest);
            }
            arranged.push(child);
        }
        ctx.set_force_progress(previous);

        let continuation = if taken_rows < measure.rows.len() {
            Some(self.remainder(ctx, el, grid, measure, taken_rows)?)
        } else {
            None
        };
        let height = block_heights[..taken_blocks].iter().sum();
        if continuation.is_some() {
            tracing::debug!(element = %id, rows = taken_rows, "grid split");
        }

        Ok(Arrangement {
            height,
            state: ArrangeState::Children(arranged),
            continuation,
        })
    }

    fn render(
        &self,
        ctx: &mut GenerationContext<'_>,
        _el: &Element,
        _content: Rect,
        state: &ArrangeState,
        canvas: &mut dyn Canvas,
    ) -> QuireResult<()> {
        if let ArrangeState::Children(children) = state {
            for &child in children {
                render_element(ctx, child, canvas)?;
            }
        }
        Ok(())
    }
}

impl GridRenderer {
    /// A grid holding rows `first..`. Remaining children are copied with
    /// their cells shifted up; their own subtrees are shared.
    fn remainder(
        &self,
        ctx: &mut GenerationContext<'_>,
        el: &Element,
        grid: &GridElement,
        measure: &GridMeasure,
        first: usize,
    ) -> QuireResult<ElementId> {
        let mut children = Vec::new();
        for p in measure.placements.iter().filter(|p| p.row >= first) {
            let mut child = (*ctx.element(el.children[p.child])?).clone();
            child.cell = Some(GridCell::at(p.row - first, p.column).spanning(p.row_span, p.column_span));
            children.push(ctx.insert_element(child));
        }

        let mut rest = grid.clone();
        rest.rows = grid.rows.iter().skip(first).copied().collect();
        Ok(ctx.insert_element(continuation_element(el, ElementKind::Grid(rest), children)))
    }
}
