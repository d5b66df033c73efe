//! Image layout. Images never split; an image that cannot be decoded still
//! takes space and draws a visible placeholder.

use super::{ArrangeState, Arrangement, ElementRenderer, GenerationContext, MeasureState, Measured};
use crate::canvas::{Canvas, Stroke};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{QuireError, QuireResult};
use crate::font::DEFAULT_FAMILY;
use crate::geometry::{Point, Rect, Size};
use crate::image_loader::DecodedImage;
use crate::model::{Element, ElementId, ElementKind};
use crate::style::Color;

/// Points per CSS pixel.
const PX_TO_PT: f64 = 0.75;
/// Placeholder width when nothing else constrains it.
const PLACEHOLDER_WIDTH: f64 = 100.0;
const PLACEHOLDER_LABEL: &str = "[Image Load Error]";
const PLACEHOLDER_FONT_SIZE: f64 = 8.0;

pub(crate) struct ImageRenderer;

#[derive(Debug, Clone)]
pub(crate) struct ImageState {
    pub src: String,
    /// `None` when the source could not be decoded.
    pub decoded: Option<DecodedImage>,
}

impl ImageState {
    fn aspect(&self) -> Option<f64> {
        self.decoded.as_ref().and_then(DecodedImage::aspect_ratio)
    }
}

impl ElementRenderer for ImageRenderer {
    fn measure(
        &self,
        ctx: &mut GenerationContext<'_>,
        id: ElementId,
        el: &Element,
        available: Size,
    ) -> QuireResult<Measured> {
        let ElementKind::Image(image) = &el.kind else {
            return Err(QuireError::UnknownElement { element: id });
        };

        let decoded = match ctx.decode_image(id, &image.src) {
            Ok(decoded) => Some(decoded),
            Err(reason) => {
                ctx.report_once(
                    format!("image:{id}"),
                    Diagnostic::warning(
                        DiagnosticCode::ImageDecodeError,
                        format!("{}: {reason}", el.describe(id)),
                    )
                    .for_element(id),
                );
                None
            }
        };
        let state = ImageState {
            src: image.src.clone(),
            decoded,
        };

        let explicit_width = el.style.width.is_some();
        let explicit_height = el.style.height.is_some();
        let size = match (state.decoded.as_ref(), state.aspect()) {
            (Some(decoded), Some(ratio)) => match (explicit_width, explicit_height) {
                (true, true) => available,
                (true, false) => Size::new(available.width, available.width * ratio),
                (false, true) => Size::new(available.height / ratio, available.height),
                (false, false) => {
                    let width = (decoded.width_px as f64 * PX_TO_PT).min(available.width);
                    Size::new(width, width * ratio)
                }
            },
            _ => {
                let width = if explicit_width {
                    available.width
                } else {
                    available.width.min(PLACEHOLDER_WIDTH)
                };
                let height = if explicit_height { available.height } else { width * 0.75 };
                Size::new(width, height)
            }
        };

        Ok(Measured {
            size,
            state: MeasureState::Image(state),
        })
    }

    fn arrange(
        &self,
        _ctx: &mut GenerationContext<'_>,
        id: ElementId,
        _el: &Element,
        content: Rect,
        state: &MeasureState,
    ) -> QuireResult<Arrangement> {
        let MeasureState::Image(image) = state else {
            return Err(QuireError::ArrangeBeforeMeasure { element: id });
        };
        Ok(Arrangement {
            height: content.height,
            state: ArrangeState::Image(image.clone()),
            continuation: None,
        })
    }

    fn render(
        &self,
        ctx: &mut GenerationContext<'_>,
        _el: &Element,
        content: Rect,
        state: &ArrangeState,
        canvas: &mut dyn Canvas,
    ) -> QuireResult<()> {
        let ArrangeState::Image(image) = state else {
            return Ok(());
        };
        match (image.decoded.as_ref(), image.aspect()) {
            (Some(_), Some(ratio)) => canvas.draw_image(&image.src, fit_rect(content, ratio)),
            (Some(_), None) => {}
            (None, _) => draw_placeholder(ctx, content, canvas),
        }
        Ok(())
    }
}

/// The largest rect with the given aspect ratio centered inside `bounds`.
fn fit_rect(bounds: Rect, ratio: f64) -> Rect {
    let (width, height) = if bounds.width * ratio <= bounds.height {
        (bounds.width, bounds.width * ratio)
    } else {
        (bounds.height / ratio, bounds.height)
    };
    Rect::new(
        bounds.x + (bounds.width - width) / 2.0,
        bounds.y + (bounds.height - height) / 2.0,
        width,
        height,
    )
}

fn draw_placeholder(ctx: &GenerationContext<'_>, content: Rect, canvas: &mut dyn Canvas) {
    canvas.draw_rect(content, None, Some(Stroke::new(Color::RED, 1.0)));

    let fonts = ctx.fonts();
    let family = fonts.default_family().unwrap_or(DEFAULT_FAMILY);
    let font = fonts.resolve(family, 400, false);
    let text_width = fonts.measure_text(&font, PLACEHOLDER_FONT_SIZE, PLACEHOLDER_LABEL);
    let metrics = fonts.metrics(&font, PLACEHOLDER_FONT_SIZE);
    let x = content.x + ((content.width - text_width) / 2.0).max(0.0);
    let y = content.y + (content.height + metrics.ascent - metrics.descent) / 2.0;

    canvas.save();
    canvas.clip_rect(content);
    canvas.draw_text(
        PLACEHOLDER_LABEL,
        Point::new(x, y),
        &font,
        PLACEHOLDER_FONT_SIZE,
        Color::RED,
    );
    canvas.restore();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawCall, DrawList};
    use crate::diagnostics::CollectingSink;
    use crate::font::FontContext;
    use crate::image_loader::DefaultImageDecoder;
    use crate::layout::{arrange_element, measure_element, render_element};
    use crate::model::{ElementArena, Node};
    use crate::style::BoxStyle;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    fn render(node: &Node, width: f64) -> (DrawList, CollectingSink, Size) {
        let fonts = FontContext::new();
        let sink = CollectingSink::new();
        let mut arena = ElementArena::new();
        let id = arena.insert_tree(node);
        let mut ctx = GenerationContext::new(arena, &fonts, &DefaultImageDecoder, &sink);
        let info = measure_element(&mut ctx, id, Size::new(width, f64::INFINITY)).unwrap();
        arrange_element(&mut ctx, id, Rect::new(0.0, 0.0, width, info.height)).unwrap();
        let mut list = DrawList::new();
        render_element(&mut ctx, id, &mut list).unwrap();
        drop(ctx);
        (list, sink, info.size())
    }

    #[test]
    fn broken_image_draws_a_placeholder() {
        let (list, sink, size) = render(&Node::image("data:image/png;base64,AAAA"), 300.0);
        assert_eq!(size, Size::new(100.0, 75.0));
        assert_eq!(sink.count(DiagnosticCode::ImageDecodeError), 1);
        assert!(matches!(
            list.calls()[0],
            DrawCall::Rect { stroke: Some(Stroke { color, .. }), .. } if color == Color::RED
        ));
        assert_eq!(list.text_content(), vec![PLACEHOLDER_LABEL]);
    }

    #[test]
    fn natural_size_uses_pixels_at_three_quarters() {
        let (list, sink, size) = render(&Node::image(PIXEL), 300.0);
        assert_eq!(size, Size::new(0.75, 0.75));
        assert!(sink.diagnostics().is_empty());
        assert!(matches!(&list.calls()[0], DrawCall::Image { src, .. } if src == PIXEL));
    }

    #[test]
    fn explicit_width_keeps_aspect() {
        let node = Node::image(PIXEL).with_style(BoxStyle::default().with_width(40.0));
        let (_, _, size) = render(&node, 300.0);
        assert_eq!(size, Size::new(40.0, 40.0));
    }

    #[test]
    fn fit_rect_centers_letterboxed_content() {
        let rect = fit_rect(Rect::new(0.0, 0.0, 100.0, 50.0), 1.0);
        assert_eq!(rect, Rect::new(25.0, 0.0, 50.0, 50.0));
    }
}
