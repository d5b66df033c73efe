//! # Paragraph Layout
//!
//! Resolves fonts per span, breaks the styled characters into lines, and
//! splits between lines when the paragraph runs off the page. The unplaced
//! lines become a new paragraph so the next page can lay them out afresh.

use std::collections::HashMap;

use super::page_break::{decide_break, fit_count, BreakDecision, BreakRules};
use super::{
    continuation_element, ArrangeState, Arrangement, ElementRenderer, GenerationContext, MeasureState,
    Measured,
};
use crate::canvas::{Canvas, Stroke};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{QuireError, QuireResult};
use crate::font::{FontHandle, LineMetrics, DEFAULT_FAMILY};
use crate::geometry::{Point, Rect, Size, EPSILON};
use crate::model::{Element, ElementId, ElementKind, ParagraphElement, Span};
use crate::style::{Color, ResolvedTextStyle, TextAlign, TextDecoration, TextStyle, TextTransform};
use crate::text::{self, BrokenLine, LineBox, StyledChar, ELLIPSIS};

pub(crate) struct ParagraphRenderer;

/// Everything needed to draw text of one span.
#[derive(Debug, Clone)]
pub(crate) struct TextRun {
    pub font: FontHandle,
    pub size: f64,
    pub color: Color,
    pub decoration: TextDecoration,
    pub metrics: LineMetrics,
}

#[derive(Debug, Clone)]
pub(crate) struct ParagraphMeasure {
    pub runs: Vec<TextRun>,
    pub lines: Vec<BrokenLine>,
    pub boxes: Vec<LineBox>,
    pub style: ResolvedTextStyle,
}

#[derive(Debug, Clone)]
pub(crate) struct ParagraphArrange {
    pub runs: Vec<TextRun>,
    pub lines: Vec<BrokenLine>,
    /// Baseline of each line from the top of the content box.
    pub baselines: Vec<f64>,
    pub align: TextAlign,
}

impl ElementRenderer for ParagraphRenderer {
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
        let ElementKind::Paragraph(para) = &el.kind else {
            return Err(QuireError::UnknownElement { element: id });
        };
        let style = para.text_style.resolve_over(ctx.text_defaults());

        let mut runs = Vec::with_capacity(para.spans().len().max(1));
        let mut chars: Vec<StyledChar> = Vec::with_capacity(para.text().len());
        let mut widths: HashMap<(usize, char), f64> = HashMap::new();

        for (run, (span, range)) in para.spans().iter().zip(para.ranges()).enumerate() {
            let span_style = span.style.resolve_over(&style);
            let text_run = build_run(ctx, id, &span_style);
            let fonts = ctx.fonts();
            let preceding = para.text()[..range.start].chars().next_back();
            let transformed = span_style.text_transform.apply_after(&span.text, preceding);
            for ch in transformed.chars().filter(|&c| c != '\r') {
                let width = *widths.entry((run, ch)).or_insert_with(|| {
                    let mut buf = [0u8; 4];
                    fonts.measure_text(&text_run.font, text_run.size, ch.encode_utf8(&mut buf))
                });
                chars.push(StyledChar::new(ch, run, width));
            }
            runs.push(text_run);
        }
        if runs.is_empty() {
            runs.push(build_run(ctx, id, &style));
        }

        let fonts = ctx.fonts();
        let mut ellipsis = String::new();
        ellipsis.push(ELLIPSIS);
        let ellipsis_width = |run: usize| {
            runs.get(run)
                .map_or(0.0, |r| fonts.measure_text(&r.font, r.size, &ellipsis))
        };
        let mut lines = text::break_into_lines(&chars, available.width, style.line_break, &ellipsis_width);
        if !style.line_break.is_truncation() && !para.soft_breaks().is_empty() {
            text::restore_soft_breaks(&mut lines, &para.newline_kinds());
        }
        let boxes = line_boxes(&lines, &runs, style.line_spacing);

        let width = lines.iter().map(|l| l.width).fold(0.0, f64::max);
        let height = text::block_height(&boxes);
        tracing::trace!(element = %id, lines = lines.len(), width, height, "paragraph measured");

        Ok(Measured {
            size: Size::new(width, height),
            state: MeasureState::Paragraph(ParagraphMeasure {
                runs,
                lines,
                boxes,
                style,
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
        let (ElementKind::Paragraph(para), MeasureState::Paragraph(measure)) = (&el.kind, state) else {
            return Err(QuireError::ArrangeBeforeMeasure { element: id });
        };

        let total = measure.lines.len();
        let mut take = total;
        if el.style.height.is_none() && text::block_height(&measure.boxes) > content.height + EPSILON {
            let increments = text::line_increments(&measure.boxes);
            let rules = BreakRules {
                breakable: true,
                min_orphan_lines: measure.style.min_orphan_lines.max(1) as usize,
                min_widow_lines: measure.style.min_widow_lines.max(1) as usize,
            };
            take = match decide_break(content.height, &increments, rules) {
                BreakDecision::Place => total,
                BreakDecision::Split {
                    items_on_current_page,
                } => items_on_current_page,
                BreakDecision::MoveToNextPage if ctx.force_progress() => {
                    fit_count(content.height, &increments).clamp(1, total)
                }
                BreakDecision::MoveToNextPage => return Ok(Arrangement::deferred(id)),
            };
        }

        let continuation = if take < total {
            let rest = remainder(para, &measure.lines[take..]);
            let element = continuation_element(el, ElementKind::Paragraph(rest), Vec::new());
            let rest_id = ctx.insert_element(element);
            tracing::debug!(element = %id, placed = take, carried = total - take, "paragraph split");
            Some(rest_id)
        } else {
            None
        };

        let boxes = &measure.boxes[..take];
        Ok(Arrangement {
            height: text::block_height(boxes),
            state: ArrangeState::Paragraph(ParagraphArrange {
                runs: measure.runs.clone(),
                lines: measure.lines[..take].to_vec(),
                baselines: text::baselines(boxes),
                align: measure.style.text_align,
            }),
            continuation,
        })
    }

    fn render(
        &self,
        _ctx: &mut GenerationContext<'_>,
        _el: &Element,
        content: Rect,
        state: &ArrangeState,
        canvas: &mut dyn Canvas,
    ) -> QuireResult<()> {
        let ArrangeState::Paragraph(arranged) = state else {
            return Ok(());
        };
        for (line, baseline) in arranged.lines.iter().zip(&arranged.baselines) {
            let y = content.y + baseline;
            for fragment in text::position_line(line, content.width, arranged.align) {
                let Some(run) = arranged.runs.get(fragment.run) else {
                    continue;
                };
                let x = content.x + fragment.x;
                canvas.draw_text(&fragment.text, Point::new(x, y), &run.font, run.size, run.color);
                draw_decoration(canvas, run, x, y, fragment.width);
            }
        }
        Ok(())
    }
}

fn build_run(ctx: &mut GenerationContext<'_>, id: ElementId, style: &ResolvedTextStyle) -> TextRun {
    let font = resolve_font(
        ctx,
        id,
        style.font_family.as_deref(),
        style.font_weight,
        style.font_style.is_italic(),
    );
    let metrics = ctx.fonts().metrics(&font, style.font_size);
    TextRun {
        font,
        size: style.font_size,
        color: style.color,
        decoration: style.text_decoration,
        metrics,
    }
}

/// Requested family, then the page default, then the provider's default,
/// then whatever was registered first. An unknown request is reported once.
fn resolve_font(
    ctx: &mut GenerationContext<'_>,
    id: ElementId,
    requested: Option<&str>,
    weight: u32,
    italic: bool,
) -> FontHandle {
    let fonts = ctx.fonts();
    let family = match requested {
        Some(family) if fonts.contains(family) => Some(family.to_string()),
        Some(family) => {
            ctx.report_once(
                format!("font:{family}"),
                Diagnostic::warning(
                    DiagnosticCode::FontNotFound,
                    format!("font family '{family}' is not registered; falling back"),
                )
                .for_element(id),
            );
            None
        }
        None => None,
    };

    let family = family
        .or_else(|| {
            ctx.text_defaults()
                .font_family
                .clone()
                .filter(|f| fonts.contains(f))
        })
        .or_else(|| fonts.default_family().map(str::to_string))
        .or_else(|| fonts.first_family().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_FAMILY.to_string());
    fonts.resolve(&family, weight, italic)
}

fn line_boxes(lines: &[BrokenLine], runs: &[TextRun], line_spacing: f64) -> Vec<LineBox> {
    let spacing = line_spacing.max(0.0);
    let mut last_run = 0;
    lines
        .iter()
        .map(|line| {
            let mut used = line.runs();
            match used.last() {
                Some(&run) => last_run = run,
                None => used.push(last_run),
            }
            let mut line_box = LineBox {
                ascent: 0.0,
                descent: 0.0,
                advance: 0.0,
            };
            for metrics in used.iter().filter_map(|&r| runs.get(r)).map(|r| r.metrics) {
                line_box.ascent = line_box.ascent.max(metrics.ascent);
                line_box.descent = line_box.descent.max(metrics.descent);
                line_box.advance = line_box.advance.max(metrics.line_advance * spacing);
            }
            line_box
        })
        .collect()
}

fn draw_decoration(canvas: &mut dyn Canvas, run: &TextRun, x: f64, baseline: f64, width: f64) {
    let y = match run.decoration {
        TextDecoration::None => return,
        TextDecoration::Underline => baseline + run.size * 0.1,
        TextDecoration::LineThrough => baseline - run.metrics.ascent * 0.35,
    };
    let thickness = (run.size / 18.0).max(0.5);
    canvas.draw_line(
        Point::new(x, y),
        Point::new(x + width, y),
        Stroke::new(run.color, thickness),
    );
}

/// A paragraph holding `lines`. Lines are rejoined with newlines so the
/// remainder wraps the same way at the same width; newlines that replace a
/// wrap are recorded as soft breaks. Explicit spans keep their styles;
/// characters are regrouped by the span they came from. The carried text is
/// already transformed, so the remainder does not transform it again.
fn remainder(para: &ParagraphElement, lines: &[BrokenLine]) -> ParagraphElement {
    let mut soft_breaks = Vec::new();
    let mut len = 0;

    let rest = if !para.has_explicit_spans() {
        let mut text = String::new();
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                if !lines[i - 1].ends_segment {
                    soft_breaks.push(len);
                }
                len += 1;
                text.push('\n');
            }
            let line_text = line.text();
            len += line_text.len();
            text.push_str(&line_text);
        }
        ParagraphElement::plain(&text, untransformed(&para.text_style))
    } else {
        let style_of = |run: usize| -> TextStyle {
            para.spans()
                .get(run)
                .map(|s| untransformed(&s.style))
                .unwrap_or_else(|| untransformed(&TextStyle::default()))
        };
        let mut spans: Vec<Span> = Vec::new();
        let mut current: Option<usize> = None;
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                if !lines[i - 1].ends_segment {
                    soft_breaks.push(len);
                }
                len += 1;
                match spans.last_mut() {
                    Some(span) => span.text.push('\n'),
                    None => {
                        spans.push(Span::styled("\n", style_of(0)));
                        current = Some(0);
                    }
                }
            }
            for c in &line.chars {
                if current != Some(c.run) {
                    spans.push(Span::styled("", style_of(c.run)));
                    current = Some(c.run);
                }
                if let Some(span) = spans.last_mut() {
                    span.text.push(c.ch);
                }
                len += c.ch.len_utf8();
            }
        }
        ParagraphElement::from_spans(spans, untransformed(&para.text_style))
    };
    rest.with_soft_breaks(soft_breaks)
}

fn untransformed(style: &TextStyle) -> TextStyle {
    TextStyle {
        text_transform: Some(TextTransform::None),
        ..style.clone()
    }
}
