//! Rules: a horizontal or vertical line that stretches along its axis.

use super::{ArrangeState, Arrangement, ElementRenderer, GenerationContext, MeasureState, Measured};
use crate::canvas::{Canvas, Stroke};
use crate::error::{QuireError, QuireResult};
use crate::geometry::{Point, Rect, Size};
use crate::model::{Element, ElementId, ElementKind, RuleOrientation};

pub(crate) struct RuleRenderer;

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

impl ElementRenderer for RuleRenderer {
    fn measure(
        &self,
        _ctx: &mut GenerationContext<'_>,
        id: ElementId,
        el: &Element,
        available: Size,
    ) -> QuireResult<Measured> {
        let ElementKind::Rule(rule) = &el.kind else {
            return Err(QuireError::UnknownElement { element: id });
        };
        let thickness = rule.thickness.max(0.0);
        let size = match rule.orientation {
            RuleOrientation::Horizontal => Size::new(finite_or_zero(available.width), thickness),
            RuleOrientation::Vertical => Size::new(thickness, finite_or_zero(available.height)),
        };
        Ok(Measured {
            size,
            state: MeasureState::Rule,
        })
    }

    fn arrange(
        &self,
        _ctx: &mut GenerationContext<'_>,
        _id: ElementId,
        _el: &Element,
        content: Rect,
        _state: &MeasureState,
    ) -> QuireResult<Arrangement> {
        Ok(Arrangement {
            height: content.height,
            state: ArrangeState::Rule,
            continuation: None,
        })
    }

    fn render(
        &self,
        _ctx: &mut GenerationContext<'_>,
        el: &Element,
        content: Rect,
        _state: &ArrangeState,
        canvas: &mut dyn Canvas,
    ) -> QuireResult<()> {
        let ElementKind::Rule(rule) = &el.kind else {
            return Ok(());
        };
        if rule.thickness <= 0.0 {
            return Ok(());
        }
        let stroke = Stroke::new(rule.color, rule.thickness);
        match rule.orientation {
            RuleOrientation::Horizontal => {
                let y = content.y + content.height / 2.0;
                canvas.draw_line(Point::new(content.x, y), Point::new(content.right(), y), stroke);
            }
            RuleOrientation::Vertical => {
                let x = content.x + content.width / 2.0;
                canvas.draw_line(Point::new(x, content.y), Point::new(x, content.bottom()), stroke);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawCall, DrawList};
    use crate::diagnostics::NullSink;
    use crate::font::FontContext;
    use crate::image_loader::DefaultImageDecoder;
    use crate::layout::{arrange_element, measure_element, render_element};
    use crate::model::{ElementArena, Node};
    use crate::style::Color;

    #[test]
    fn horizontal_rule_spans_the_width() {
        let fonts = FontContext::new();
        let mut arena = ElementArena::new();
        let id = arena.insert_tree(&Node::rule(2.0, Color::BLACK));
        let mut ctx = GenerationContext::new(arena, &fonts, &DefaultImageDecoder, &NullSink);

        let info = measure_element(&mut ctx, id, Size::new(120.0, f64::INFINITY)).unwrap();
        assert_eq!(info.size(), Size::new(120.0, 2.0));
        arrange_element(&mut ctx, id, Rect::new(10.0, 10.0, 120.0, 2.0)).unwrap();
        let mut list = DrawList::new();
        render_element(&mut ctx, id, &mut list).unwrap();
        assert_eq!(
            list.calls(),
            &[DrawCall::Line {
                from: Point::new(10.0, 11.0),
                to: Point::new(130.0, 11.0),
                stroke: Stroke::new(Color::BLACK, 2.0),
            }]
        );
    }

    #[test]
    fn vertical_rule_has_no_intrinsic_height() {
        let fonts = FontContext::new();
        let mut arena = ElementArena::new();
        let id = arena.insert_tree(&Node::vertical_rule(1.0, Color::BLACK));
        let mut ctx = GenerationContext::new(arena, &fonts, &DefaultImageDecoder, &NullSink);
        let info = measure_element(&mut ctx, id, Size::new(50.0, f64::INFINITY)).unwrap();
        assert_eq!(info.size(), Size::new(1.0, 0.0));
    }

    #[test]
    fn zero_thickness_draws_nothing() {
        let fonts = FontContext::new();
        let mut arena = ElementArena::new();
        let id = arena.insert_tree(&Node::rule(0.0, Color::BLACK));
        let mut ctx = GenerationContext::new(arena, &fonts, &DefaultImageDecoder, &NullSink);
        measure_element(&mut ctx, id, Size::new(50.0, f64::INFINITY)).unwrap();
        arrange_element(&mut ctx, id, Rect::new(0.0, 0.0, 50.0, 0.0)).unwrap();
        let mut list = DrawList::new();
        render_element(&mut ctx, id, &mut list).unwrap();
        assert!(list.is_empty());
    }
}
