//! # Layout Engine
//!
//! Every element goes through three phases, driven by the paginator:
//!
//! 1. **Measure** against an available size whose axes may be infinite.
//!    The result is cached in the [`GenerationContext`] under the element's id.
//! 2. **Arrange** into a definite slot. Splittable elements that do not fit
//!    place what they can and hand back a *continuation*: a new, independent
//!    element holding the unconsumed remainder.
//! 3. **Render** the arranged state onto a [`Canvas`].
//!
//! The functions here are the single dispatch point. They apply the box
//! model shared by all variants (margin, padding, explicit size, alignment,
//! background) and hand the content box to the variant's renderer. Container
//! renderers recurse through these same functions for their children.

pub mod context;
mod distribute;
pub mod grid;
mod grid_element;
mod image;
pub mod page_break;
pub mod paginate;
mod paragraph;
mod rule;
mod stack;

pub use context::{GenerationContext, LayoutPhase, PageInfo};
pub use paginate::{paginate, PageOutput, PageSettings};

use serde::Serialize;

use crate::canvas::Canvas;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{QuireError, QuireResult};
use crate::geometry::{Rect, Size, EPSILON};
use crate::model::{Element, ElementId, ElementKind};
use crate::style::Alignment;
use context::{ArrangedRecord, LayoutEntry};

/// The outcome of Measure: the element's desired size including margins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutInfo {
    pub element: ElementId,
    pub width: f64,
    pub height: f64,
}

impl LayoutInfo {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// The outcome of Arrange.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrangedInfo {
    pub element: ElementId,
    pub layout: LayoutInfo,
    /// The margin box actually used on this page. For a split element this
    /// covers only the consumed part.
    pub rect: Rect,
    /// The unconsumed remainder. Equal to `element` when nothing at all was
    /// placed and the whole element must move to the next page.
    pub continuation: Option<ElementId>,
}

impl ArrangedInfo {
    pub fn consumed_nothing(&self) -> bool {
        self.continuation == Some(self.element)
    }

    pub fn is_split(&self) -> bool {
        matches!(self.continuation, Some(c) if c != self.element)
    }
}

/// Variant-specific measure results kept between Measure and Arrange.
#[derive(Debug, Clone)]
pub(crate) enum MeasureState {
    Empty,
    Paragraph(paragraph::ParagraphMeasure),
    Image(image::ImageState),
    Rule,
    Grid(grid_element::GridMeasure),
    Stack(stack::StackMeasure),
}

/// Variant-specific arrange results consumed by Render.
#[derive(Debug, Clone)]
pub(crate) enum ArrangeState {
    Empty,
    Paragraph(paragraph::ParagraphArrange),
    Image(image::ImageState),
    Rule,
    Children(Vec<ElementId>),
}

pub(crate) struct Measured {
    /// Content-box size.
    pub size: Size,
    pub state: MeasureState,
}

pub(crate) struct Arrangement {
    /// Content-box height actually used.
    pub height: f64,
    pub state: ArrangeState,
    pub continuation: Option<ElementId>,
}

impl Arrangement {
    /// Nothing fits: the whole element moves on.
    pub fn deferred(id: ElementId) -> Self {
        Self {
            height: 0.0,
            state: ArrangeState::Empty,
            continuation: Some(id),
        }
    }
}

/// The per-variant algorithm. Renderers only ever see their content box;
/// the box model is applied around them by the dispatch functions below.
pub(crate) trait ElementRenderer {
    /// Whether the element may split across pages when it has no explicit height.
    fn can_split(&self) -> bool {
        false
    }

    fn measure(
        &self,
        ctx: &mut GenerationContext<'_>,
        id: ElementId,
        el: &Element,
        available: Size,
    ) -> QuireResult<Measured>;

    fn arrange(
        &self,
        ctx: &mut GenerationContext<'_>,
        id: ElementId,
        el: &Element,
        content: Rect,
        state: &MeasureState,
    ) -> QuireResult<Arrangement>;

    fn render(
        &self,
        ctx: &mut GenerationContext<'_>,
        el: &Element,
        content: Rect,
        state: &ArrangeState,
        canvas: &mut dyn Canvas,
    ) -> QuireResult<()>;
}

fn renderer_for(kind: &ElementKind) -> &'static dyn ElementRenderer {
    match kind {
        ElementKind::Paragraph(_) => &paragraph::ParagraphRenderer,
        ElementKind::Image(_) => &image::ImageRenderer,
        ElementKind::Rule(_) => &rule::RuleRenderer,
        ElementKind::Grid(_) => &grid_element::GridRenderer,
        ElementKind::VerticalStack { .. } => &stack::VerticalStackRenderer,
        ElementKind::HorizontalStack { .. } => &stack::HorizontalStackRenderer,
    }
}

/// Build the element that carries a split element's remainder. It copies
/// the original's box style and grid cell but never points back at it.
pub(crate) fn continuation_element(el: &Element, kind: ElementKind, children: Vec<ElementId>) -> Element {
    let mut style = el.style.clone();
    style.break_before = false;
    Element {
        kind,
        style,
        children,
        cell: el.cell,
        name: el.name.clone(),
    }
}

// ── Measure ─────────────────────────────────────────────────────

/// Measure an element against `available` (its margin box may use at most
/// this much; infinite axes mean "report the intrinsic size").
pub fn measure_element(
    ctx: &mut GenerationContext<'_>,
    id: ElementId,
    available: Size,
) -> QuireResult<LayoutInfo> {
    let el = ctx.element(id)?;
    let style = &el.style;

    let border_available = Size::new(
        style
            .width
            .unwrap_or(available.width - style.margin.horizontal())
            .max(0.0),
        style
            .height
            .unwrap_or(available.height - style.margin.vertical())
            .max(0.0),
    );
    let content_available = border_available.shrink(&style.padding);

    if content_available.is_empty() {
        tracing::trace!(element = %id, kind = el.kind_name(), "zero-area content box, skipped");
        ctx.set_entry(
            id,
            LayoutEntry {
                phase: LayoutPhase::Measured,
                available: content_available,
                content: Size::ZERO,
                border: Size::ZERO,
                skipped: true,
                state: MeasureState::Empty,
                arranged: None,
            },
        );
        return Ok(LayoutInfo {
            element: id,
            width: 0.0,
            height: 0.0,
        });
    }

    let measured = renderer_for(&el.kind).measure(ctx, id, &el, content_available)?;
    let border = Size::new(
        style
            .width
            .unwrap_or(measured.size.width + style.padding.horizontal()),
        style
            .height
            .unwrap_or(measured.size.height + style.padding.vertical()),
    );
    tracing::trace!(
        element = %id,
        kind = el.kind_name(),
        width = border.width,
        height = border.height,
        "measured"
    );

    ctx.set_entry(
        id,
        LayoutEntry {
            phase: LayoutPhase::Measured,
            available: content_available,
            content: measured.size,
            border,
            skipped: false,
            state: measured.state,
            arranged: None,
        },
    );

    Ok(LayoutInfo {
        element: id,
        width: border.width + style.margin.horizontal(),
        height: border.height + style.margin.vertical(),
    })
}

// ── Arrange ─────────────────────────────────────────────────────

/// Arrange a measured element into `slot`, the margin box its parent offers.
///
/// Width follows explicit size, then `Fill`, then the measured size; height
/// the same. Splittable content taller than the slot is split. Atomic
/// content taller than the slot moves on whole, unless the context demands
/// progress, in which case it is clamped and reported as overflow.
pub fn arrange_element(
    ctx: &mut GenerationContext<'_>,
    id: ElementId,
    slot: Rect,
) -> QuireResult<ArrangedInfo> {
    let el = ctx.element(id)?;
    let entry = ctx
        .entry(id)
        .ok_or(QuireError::ArrangeBeforeMeasure { element: id })?;

    let style = &el.style;
    let layout = LayoutInfo {
        element: id,
        width: entry.border.width + style.margin.horizontal(),
        height: entry.border.height + style.margin.vertical(),
    };

    if entry.skipped {
        let rect = Rect::new(slot.x, slot.y, 0.0, 0.0);
        record_arranged(ctx, id, rect, rect, false, ArrangeState::Empty);
        return Ok(ArrangedInfo {
            element: id,
            layout,
            rect,
            continuation: None,
        });
    }

    let desired = entry.border;
    let measured_content = entry.content;
    let measured_against = entry.available;
    let mut state = entry.state.clone();

    let renderer = renderer_for(&el.kind);
    let splittable = style.height.is_none() && renderer.can_split();
    let inner = slot.inset(&style.margin);
    let deferred = ArrangedInfo {
        element: id,
        layout,
        rect: Rect::new(slot.x, slot.y, slot.width, 0.0),
        continuation: Some(id),
    };

    // Width: explicit, then Fill, then measured.
    let needed_width = match style.width {
        Some(_) => desired.width,
        None => measured_content.width + style.padding.horizontal(),
    };
    let wanted_width = if style.width.is_none() && style.horizontal_alignment == Alignment::Fill {
        inner.width
    } else {
        desired.width
    };
    let width = wanted_width.min(inner.width);
    let mut overflow = needed_width > inner.width + EPSILON;

    // Height: explicit, then Fill, then measured.
    let height = if desired.height > inner.height + EPSILON {
        if splittable {
            inner.height
        } else if !ctx.force_progress() {
            tracing::trace!(element = %id, "does not fit, deferred");
            return Ok(deferred);
        } else {
            overflow = true;
            inner.height
        }
    } else if style.height.is_none() && style.vertical_alignment == Alignment::Fill {
        inner.height
    } else {
        desired.height
    };

    let x = inner.x + style.horizontal_alignment.offset(inner.width, width);
    let y = inner.y + style.vertical_alignment.offset(inner.height, height);
    let border = Rect::new(x, y, width, height);
    let content = border.inset(&style.padding);

    // Narrower than measured: lay out again at the final width.
    if content.width + EPSILON < measured_content.width
        && measured_against.width > content.width + EPSILON
    {
        let remeasured = renderer.measure(ctx, id, &el, Size::new(content.width, f64::INFINITY))?;
        if remeasured.size.height > content.height + EPSILON && !splittable {
            overflow = true;
        }
        if let Some(entry) = ctx.entry_mut(id) {
            entry.content = remeasured.size;
            entry.state = remeasured.state.clone();
        }
        state = remeasured.state;
    }

    let arrangement = renderer.arrange(ctx, id, &el, content, &state)?;
    if arrangement.height > content.height + EPSILON {
        overflow = true;
    }
    let mut continuation = arrangement.continuation;
    if continuation == Some(id) {
        if !ctx.force_progress() {
            tracing::trace!(element = %id, "nothing fits, deferred");
            return Ok(deferred);
        }
        continuation = None;
        overflow = true;
    }
    if let Some(rest) = continuation {
        if !splittable {
            // Fixed-size boxes never split; the remainder is clipped away.
            ctx.discard(rest);
            continuation = None;
            overflow = true;
        }
    }

    let border = match continuation {
        Some(_) => border.with_height((arrangement.height + style.padding.vertical()).min(border.height)),
        None => border,
    };
    let content = border.inset(&style.padding);

    if overflow {
        let message = format!(
            "{} needs {:.1}x{:.1}pt but its slot is {:.1}x{:.1}pt; clamped",
            el.describe(id),
            needed_width,
            desired.height,
            inner.width,
            inner.height
        );
        ctx.report_once(
            format!("overflow:{id}"),
            Diagnostic::warning(DiagnosticCode::LayoutOverflow, message).for_element(id),
        );
    }

    record_arranged(ctx, id, border, content, overflow, arrangement.state);
    let rect = border.outset(&style.margin);
    tracing::trace!(
        element = %id,
        kind = el.kind_name(),
        y = rect.y,
        height = rect.height,
        split = continuation.is_some(),
        "arranged"
    );

    Ok(ArrangedInfo {
        element: id,
        layout,
        rect,
        continuation,
    })
}

fn record_arranged(
    ctx: &mut GenerationContext<'_>,
    id: ElementId,
    border: Rect,
    content: Rect,
    clip: bool,
    state: ArrangeState,
) {
    if let Some(entry) = ctx.entry_mut(id) {
        entry.phase = LayoutPhase::Arranged;
        entry.arranged = Some(ArrangedRecord {
            border,
            content,
            clip,
            state,
        });
    }
}

// ── Render ──────────────────────────────────────────────────────

/// Draw an arranged element. An element without arrange state draws nothing.
pub fn render_element(
    ctx: &mut GenerationContext<'_>,
    id: ElementId,
    canvas: &mut dyn Canvas,
) -> QuireResult<()> {
    let Some(record) = ctx.entry(id).and_then(|entry| entry.arranged.clone()) else {
        tracing::warn!(element = %id, "render requested before arrange; nothing drawn");
        return Ok(());
    };
    let el = ctx.element(id)?;

    if record.clip {
        canvas.save();
        canvas.clip_rect(record.border);
    }
    if let Some(background) = el.style.background {
        if !record.border.is_empty() {
            canvas.draw_rect(record.border, Some(background), None);
        }
    }
    renderer_for(&el.kind).render(ctx, &el, record.content, &record.state, canvas)?;
    if record.clip {
        canvas.restore();
    }

    if let Some(entry) = ctx.entry_mut(id) {
        entry.phase = LayoutPhase::Rendered;
    }
    Ok(())
}
