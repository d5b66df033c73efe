//! # Pagination
//!
//! Flows the top-level elements onto pages. Each page starts with an empty
//! body; elements are measured against the body width, arranged into the
//! space that is left, and rendered into the page's draw list. An element
//! that does not fit ends the page and heads the next one. At the top of an
//! empty page the head must consume something, so every page makes progress
//! and the loop always terminates.
//!
//! Headers and footers are laid out last, once the page count is known, so
//! `{page}` and `{pages}` can be substituted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use super::context::PageInfo;
use super::{arrange_element, measure_element, render_element, GenerationContext};
use crate::canvas::{DrawCall, DrawList};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{QuireError, QuireResult};
use crate::geometry::{Edges, Rect, Size};
use crate::model::{ElementId, Node, NodeKind, PageConfig, PageGeometry};

const PAGE_PLACEHOLDER: &str = "{page}";
const PAGES_PLACEHOLDER: &str = "{pages}";

/// Resolved page geometry plus the repeating page furniture.
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub width: f64,
    pub height: f64,
    pub margin: Edges,
    /// Vertical gap between consecutive top-level elements, and between the
    /// body and a header or footer.
    pub spacing: f64,
    pub header: Option<Node>,
    pub footer: Option<Node>,
}

impl PageSettings {
    pub fn from_config(config: &PageConfig, geometry: &dyn PageGeometry) -> Self {
        let (width, height) = geometry.dimensions(config.size, config.orientation);
        Self {
            width,
            height,
            margin: config.margin,
            spacing: config.spacing.max(0.0),
            header: None,
            footer: None,
        }
    }

    pub fn with_furniture(mut self, header: Option<Node>, footer: Option<Node>) -> Self {
        self.header = header;
        self.footer = footer;
        self
    }

    /// The page area inside the margins.
    pub fn content_rect(&self) -> Rect {
        let page = Rect::new(0.0, 0.0, self.width, self.height);
        let content = page.inset(&self.margin);
        Rect::new(content.x, content.y, content.width.max(0.0), content.height.max(0.0))
    }
}

/// One finished page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageOutput {
    /// 1-based.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    pub draw_calls: Vec<DrawCall>,
    /// Diagnostics raised while this page was laid out.
    pub diagnostics: Vec<Diagnostic>,
}

impl PageOutput {
    /// The text of every text draw call, in drawing order.
    pub fn text_content(&self) -> Vec<&str> {
        self.draw_calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Lay out `roots` page by page.
///
/// `cancel` is checked before each page starts; a set flag stops generation
/// with [`QuireError::Cancelled`].
#[tracing::instrument(skip_all, fields(elements = roots.len()))]
pub fn paginate(
    ctx: &mut GenerationContext<'_>,
    roots: &[ElementId],
    settings: &PageSettings,
    cancel: Option<&AtomicBool>,
) -> QuireResult<Vec<PageOutput>> {
    let content = settings.content_rect();
    let header_height = reserve(ctx, settings.header.as_ref(), content)?;
    let footer_height = reserve(ctx, settings.footer.as_ref(), content)?;
    let gap = |h: f64| if h > 0.0 { h + settings.spacing } else { 0.0 };
    let body_top = content.y + gap(header_height);
    let body = Rect::new(
        content.x,
        body_top,
        content.width,
        (content.bottom() - gap(footer_height) - body_top).max(0.0),
    );

    // Everything inserted after this point is a continuation.
    let first_transient = ctx.arena().len();
    let mut queue: VecDeque<ElementId> = roots.iter().copied().collect();
    let mut bodies: Vec<(DrawList, Vec<Diagnostic>)> = Vec::new();

    while !queue.is_empty() || bodies.is_empty() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            tracing::debug!(pages = bodies.len(), "pagination cancelled");
            return Err(QuireError::Cancelled {
                pages_completed: bodies.len(),
            });
        }

        let number = bodies.len() + 1;
        ctx.set_page(PageInfo {
            number,
            width: settings.width,
            height: settings.height,
            content: body,
        });
        let mut list = DrawList::new();
        let placed = fill_page(ctx, &mut queue, body, settings.spacing, first_transient, &mut list)?;

        tracing::debug!(page = number, placed, queued = queue.len(), "page committed");
        bodies.push((list, ctx.take_page_diagnostics()));
    }

    let total = bodies.len();
    let mut pages = Vec::with_capacity(total);
    for (index, (body_list, mut diagnostics)) in bodies.into_iter().enumerate() {
        let number = index + 1;
        let mut list = DrawList::new();
        if let Some(header) = &settings.header {
            let slot = content.with_height(header_height);
            place_furniture(ctx, header, number, total, slot, &mut list)?;
        }
        list.append(body_list);
        if let Some(footer) = &settings.footer {
            let slot = Rect::new(
                content.x,
                content.bottom() - footer_height,
                content.width,
                footer_height,
            );
            place_furniture(ctx, footer, number, total, slot, &mut list)?;
        }
        diagnostics.extend(ctx.take_page_diagnostics());

        pages.push(PageOutput {
            number,
            width: settings.width,
            height: settings.height,
            draw_calls: list.into_calls(),
            diagnostics,
        });
    }
    Ok(pages)
}

/// Place queue elements on one page body. Returns how many were placed.
fn fill_page(
    ctx: &mut GenerationContext<'_>,
    queue: &mut VecDeque<ElementId>,
    body: Rect,
    spacing: f64,
    first_transient: usize,
    list: &mut DrawList,
) -> QuireResult<usize> {
    let mut y = body.y;
    let mut placed = 0;

    while let Some(&head) = queue.front() {
        let at_top = placed == 0;
        if !at_top && ctx.element(head)?.style.break_before {
            break;
        }

        let top = if at_top { y } else { y + spacing };
        let remaining = (body.bottom() - top).max(0.0);
        let info = measure_element(ctx, head, Size::new(body.width, f64::INFINITY))?;

        let previous = ctx.set_force_progress(at_top);
        let arranged = arrange_element(ctx, head, Rect::new(body.x, top, body.width, info.height.min(remaining)));
        ctx.set_force_progress(previous);
        let arranged = arranged?;

        if arranged.consumed_nothing() {
            if at_top {
                // Forced arrangement always consumes; never spin on a head that refuses.
                let message = format!(
                    "{} placed nothing at the top of a page; dropped",
                    ctx.element(head)?.describe(head)
                );
                tracing::warn!(element = %head, "{message}");
                ctx.report(Diagnostic::warning(DiagnosticCode::LayoutOverflow, message).for_element(head));
                queue.pop_front();
                continue;
            }
            break;
        }

        render_element(ctx, head, list)?;
        queue.pop_front();
        if head.index() >= first_transient {
            ctx.discard(head);
        }
        placed += 1;
        y = top + arranged.rect.height;

        if let Some(rest) = arranged.continuation {
            queue.push_front(rest);
            break;
        }
    }
    Ok(placed)
}

/// Height a header or footer takes out of every page.
fn reserve(ctx: &mut GenerationContext<'_>, template: Option<&Node>, content: Rect) -> QuireResult<f64> {
    let Some(template) = template else {
        return Ok(0.0);
    };
    let id = ctx.arena_mut().insert_tree(template);
    let measured = measure_element(ctx, id, Size::new(content.width, f64::INFINITY));
    discard_tree(ctx, id);
    Ok(measured?.height.min(content.height))
}

fn place_furniture(
    ctx: &mut GenerationContext<'_>,
    template: &Node,
    number: usize,
    total: usize,
    slot: Rect,
    list: &mut DrawList,
) -> QuireResult<()> {
    let node = substitute_page_numbers(template, number, total);
    let id = ctx.arena_mut().insert_tree(&node);
    let previous = ctx.set_force_progress(true);
    let result = measure_element(ctx, id, Size::new(slot.width, f64::INFINITY))
        .and_then(|_| arrange_element(ctx, id, slot))
        .and_then(|_| render_element(ctx, id, list));
    ctx.set_force_progress(previous);
    discard_tree(ctx, id);
    result
}

fn discard_tree(ctx: &mut GenerationContext<'_>, id: ElementId) {
    if let Ok(element) = ctx.element(id) {
        for &child in &element.children {
            discard_tree(ctx, child);
        }
    }
    ctx.discard(id);
}

/// Replace `{page}` and `{pages}` in every paragraph of the tree.
fn substitute_page_numbers(node: &Node, number: usize, total: usize) -> Node {
    let replace = |text: &str| {
        text.replace(PAGES_PLACEHOLDER, &total.to_string())
            .replace(PAGE_PLACEHOLDER, &number.to_string())
    };
    let mut node = node.clone();
    if let NodeKind::Paragraph { text, spans, .. } = &mut node.kind {
        *text = replace(text);
        for span in spans.iter_mut() {
            span.text = replace(&span.text);
        }
    }
    node.children = node
        .children
        .iter()
        .map(|child| substitute_page_numbers(child, number, total))
        .collect();
    node
}
