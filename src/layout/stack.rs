//! # Stack Layout
//!
//! Vertical stacks place children top to bottom and split between (or
//! inside) children. Horizontal stacks place children side by side; when
//! they split, every column carries its own remainder onto the next page.

use super::distribute::distribute_grow;
use super::grid::total_spacing;
use super::{
    arrange_element, continuation_element, measure_element, render_element, ArrangeState, Arrangement,
    ElementRenderer, GenerationContext, MeasureState, Measured,
};
use crate::canvas::Canvas;
use crate::error::{QuireError, QuireResult};
use crate::geometry::{Rect, Size, EPSILON};
use crate::model::{Element, ElementId, ElementKind};
use crate::style::{Alignment, BoxStyle};

pub(crate) struct VerticalStackRenderer;
pub(crate) struct HorizontalStackRenderer;

#[derive(Debug, Clone)]
pub(crate) struct StackMeasure {
    /// Margin-box size each child was measured to, in child order. For a
    /// horizontal stack the width is the slot the child was given.
    slots: Vec<Size>,
}

fn spacing_of(el: &Element) -> f64 {
    match el.kind {
        ElementKind::VerticalStack { spacing } | ElementKind::HorizontalStack { spacing } => {
            spacing.max(0.0)
        }
        _ => 0.0,
    }
}

fn render_children(
    ctx: &mut GenerationContext<'_>,
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

impl ElementRenderer for VerticalStackRenderer {
    fn can_split(&self) -> bool {
        true
    }

    fn measure(
        &self,
        ctx: &mut GenerationContext<'_>,
        _id: ElementId,
        el: &Element,
        available: Size,
    ) -> QuireResult<Measured> {
        let mut slots = Vec::with_capacity(el.children.len());
        for &child in &el.children {
            let info = measure_element(ctx, child, Size::new(available.width, f64::INFINITY))?;
            slots.push(info.size());
        }
        let width = slots.iter().map(|s| s.width).fold(0.0, f64::max);
        let height = slots.iter().map(|s| s.height).sum::<f64>()
            + total_spacing(slots.len(), spacing_of(el));
        Ok(Measured {
            size: Size::new(width, height),
            state: MeasureState::Stack(StackMeasure { slots }),
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
        let MeasureState::Stack(measure) = state else {
            return Err(QuireError::ArrangeBeforeMeasure { element: id });
        };
        let spacing = spacing_of(el);
        let force = ctx.force_progress();

        let mut y = content.y;
        let mut arranged = Vec::with_capacity(el.children.len());
        let mut carried: Option<Vec<ElementId>> = None;

        for (i, &child) in el.children.iter().enumerate() {
            if i > 0 && ctx.element(child)?.style.break_before {
                carried = Some(el.children[i..].to_vec());
                break;
            }
            let top = if i > 0 { y + spacing } else { y };
            let desired = measure.slots.get(i).map_or(0.0, |s| s.height);
            let remaining = (content.bottom() - top).max(0.0);
            let slot = Rect::new(content.x, top, content.width, desired.min(remaining));

            let info = arrange_element(ctx, child, slot)?;
            // Only the first child inherits the obligation to make progress.
            ctx.set_force_progress(false);

            if info.consumed_nothing() {
                if i == 0 {
                    ctx.set_force_progress(force);
                    return Ok(Arrangement::deferred(id));
                }
                carried = Some(el.children[i..].to_vec());
                break;
            }
            arranged.push(child);
            y = top + info.rect.height;
            if let Some(rest) = info.continuation {
                let mut children = vec![rest];
                children.extend_from_slice(&el.children[i + 1..]);
                carried = Some(children);
                break;
            }
        }
        ctx.set_force_progress(force);

        let continuation = carried.map(|children| {
            let element = continuation_element(el, el.kind.clone(), children);
            ctx.insert_element(element)
        });
        Ok(Arrangement {
            height: (y - content.y).max(0.0),
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
        render_children(ctx, state, canvas)
    }
}

impl ElementRenderer for HorizontalStackRenderer {
    fn can_split(&self) -> bool {
        true
    }

    fn measure(
        &self,
        ctx: &mut GenerationContext<'_>,
        _id: ElementId,
        el: &Element,
        available: Size,
    ) -> QuireResult<Measured> {
        let count = el.children.len();
        let gaps = total_spacing(count, spacing_of(el));
        let mut widths = vec![0.0; count];
        let mut fills = Vec::new();
        let mut used = gaps;

        // Explicit widths, then intrinsic widths for auto children.
        for (i, &child) in el.children.iter().enumerate() {
            let style = ctx.element(child)?.style.clone();
            widths[i] = match style.width {
                Some(width) => width + style.margin.horizontal(),
                None if style.horizontal_alignment == Alignment::Fill && available.width.is_finite() => {
                    fills.push(i);
                    continue;
                }
                None => {
                    let intrinsic = measure_element(ctx, child, Size::unbounded())?.width;
                    if available.width.is_finite() {
                        intrinsic.min((available.width - used).max(0.0))
                    } else {
                        intrinsic
                    }
                }
            };
            used += widths[i];
        }

        // Fill children share what is left equally.
        if !fills.is_empty() {
            let mut shares: Vec<(f64, f64)> = fills.iter().map(|_| (0.0, 1.0)).collect();
            distribute_grow(&mut shares, available.width - used);
            for (&i, (share, _)) in fills.iter().zip(shares) {
                widths[i] = share;
            }
        }

        let mut slots = Vec::with_capacity(count);
        for (&child, &width) in el.children.iter().zip(&widths) {
            let info = measure_element(ctx, child, Size::new(width, f64::INFINITY))?;
            slots.push(Size::new(width, info.height));
        }

        let width = widths.iter().sum::<f64>() + gaps;
        let height = slots.iter().map(|s| s.height).fold(0.0, f64::max);
        Ok(Measured {
            size: Size::new(width, height),
            state: MeasureState::Stack(StackMeasure { slots }),
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
        let MeasureState::Stack(measure) = state else {
            return Err(QuireError::ArrangeBeforeMeasure { element: id });
        };
        let spacing = spacing_of(el);
        let force = ctx.force_progress();

        let mut x = content.x;
        let mut height: f64 = 0.0;
        let mut arranged = Vec::with_capacity(el.children.len());
        // Per column: what the next page must still lay out.
        let mut carried: Vec<Option<ElementId>> = Vec::with_capacity(el.children.len());

        for (i, &child) in el.children.iter().enumerate() {
            let width = measure.slots.get(i).map_or(0.0, |s| s.width);
            ctx.set_force_progress(force);
            let info = arrange_element(ctx, child, Rect::new(x, content.y, width, content.height))?;
            if info.consumed_nothing() {
                carried.push(Some(child));
            } else {
                arranged.push(child);
                height = height.max(info.rect.height);
                carried.push(info.continuation);
            }
            x += width + spacing;
        }
        ctx.set_force_progress(force);

        if !el.children.is_empty() && arranged.is_empty() {
            return Ok(Arrangement::deferred(id));
        }

        let continuation = if carried.iter().any(Option::is_some) {
            let mut children = Vec::with_capacity(carried.len());
            for (i, rest) in carried.into_iter().enumerate() {
                let child = match rest {
                    Some(rest) => rest,
                    // A finished column keeps its width on the next page.
                    None => {
                        let width = measure.slots.get(i).map_or(0.0, |s| s.width);
                        ctx.insert_element(Element::new(
                            ElementKind::VerticalStack { spacing: 0.0 },
                            BoxStyle::default().with_width(width),
                        ))
                    }
                };
                children.push(child);
            }
            let element = continuation_element(el, el.kind.clone(), children);
            Some(ctx.insert_element(element))
        } else {
            None
        };

        Ok(Arrangement {
            height: if height < EPSILON { 0.0 } else { height },
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
        render_children(ctx, state, canvas)
    }
}
