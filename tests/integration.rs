//! Integration tests for the Quire layout pipeline.
//!
//! These tests exercise the full path from a document tree (or JSON) to
//! per-page draw calls. They verify:
//! - Text wraps, truncates, and splits across pages correctly
//! - Grid tracks resolve and children auto-place row-major
//! - Pagination always terminates and honors forced breaks
//! - Recoverable problems become diagnostics, fatal ones become errors
//! - Headers and footers see the final page count

use std::sync::atomic::AtomicBool;

use quire::canvas::{DrawCall, DrawList};
use quire::diagnostics::{CollectingSink, DiagnosticCode};
use quire::font::FontContext;
use quire::geometry::{Edges, Rect, Size};
use quire::image_loader::DefaultImageDecoder;
use quire::layout::{arrange_element, measure_element, render_element, GenerationContext};
use quire::model::*;
use quire::style::*;
use quire::text::{self, StyledChar};
use quire::{LayoutOptions, PageOutput, QuireError};

// ─── Helpers ────────────────────────────────────────────────────

fn courier(size: f64) -> TextStyle {
    TextStyle {
        font_family: Some("Courier".to_string()),
        font_size: Some(size),
        ..Default::default()
    }
}

fn block(height: f64) -> Node {
    Node::vstack(0.0, vec![]).with_style(BoxStyle::default().with_height(height))
}

/// A page whose content area is exactly `width` x `height`.
fn page(width: f64, height: f64) -> PageConfig {
    PageConfig {
        size: PageSize::Custom { width, height },
        orientation: if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        },
        margin: Edges::default(),
        ..Default::default()
    }
}

fn doc_on(page: PageConfig, children: Vec<Node>) -> Document {
    Document {
        page,
        ..Document::new(children)
    }
}

fn layout_collecting(doc: &Document, sink: &CollectingSink) -> Result<Vec<PageOutput>, QuireError> {
    let fonts = quire::document_fonts(doc)?;
    let options = LayoutOptions {
        fonts: &fonts,
        images: &DefaultImageDecoder,
        sink,
        geometry: &StandardPageGeometry,
        cancel: None,
    };
    quire::layout_document_with(doc, &options)
}

/// Horizontal extent of every line drawn.
fn line_spans(calls: &[DrawCall]) -> Vec<(f64, f64)> {
    calls
        .iter()
        .filter_map(|call| match call {
            DrawCall::Line { from, to, .. } => Some((from.x, to.x)),
            _ => None,
        })
        .collect()
}

fn all_text(pages: &[PageOutput]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|p| p.text_content())
        .map(str::to_string)
        .collect()
}

fn courier_chars(text: &str) -> Vec<StyledChar> {
    text.chars().map(|ch| StyledChar::new(ch, 0, 6.0)).collect()
}

// ─── Basic Pipeline Tests ───────────────────────────────────────

#[test]
fn test_empty_document_has_one_blank_page() {
    let pages = quire::layout_document(&Document::default()).unwrap();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].draw_calls.is_empty());
    assert_eq!(pages[0].number, 1);
}

#[test]
fn test_single_paragraph() {
    let doc = Document::new(vec![Node::paragraph("Hello, World!", TextStyle::default())]);
    let pages = quire::layout_document(&doc).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].text_content(), vec!["Hello, World!"]);
    // A4 portrait.
    assert!((pages[0].width - 595.28).abs() < 1e-9);
}

#[test]
fn test_render_json_produces_pages() {
    let json = r#"{
        "page": { "size": "Letter" },
        "children": [
            { "kind": { "type": "Paragraph", "text": "From JSON" } },
            { "kind": { "type": "Rule", "thickness": 2 } }
        ]
    }"#;
    let output = quire::render_json(json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    let pages = value.as_array().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0]["width"], 612.0);
    let calls = pages[0]["drawCalls"].as_array().unwrap();
    assert_eq!(calls[0]["op"], "text");
    assert_eq!(calls[0]["text"], "From JSON");
    assert_eq!(calls[1]["op"], "line");
}

#[test]
fn test_invalid_json_is_a_parse_error() {
    let err = quire::render_json("{ \"children\": [ }").unwrap_err();
    assert!(matches!(err, QuireError::Parse { .. }));
}

#[test]
fn test_render_many_keeps_order() {
    let short = doc_on(page(200.0, 100.0), vec![block(10.0)]);
    let long = doc_on(page(200.0, 100.0), vec![block(60.0), block(60.0), block(60.0)]);
    let results = quire::render_many(&[long, short]);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().len(), 3);
    assert_eq!(results[1].as_ref().unwrap().len(), 1);
}

// ─── Text Tests ─────────────────────────────────────────────────

#[test]
fn test_no_wrap_is_always_one_line() {
    let style = TextStyle {
        line_break: Some(LineBreakMode::NoWrap),
        ..courier(10.0)
    };
    for width in [20.0, 60.0, 400.0] {
        let doc = doc_on(
            page(width, 200.0),
            vec![Node::paragraph("a line that is much wider than the narrow pages", style.clone())],
        );
        let pages = quire::layout_document(&doc).unwrap();
        assert_eq!(pages[0].text_content().len(), 1, "width {width}");
    }
}

#[test]
fn test_word_wrap_lines_fit_the_width() {
    let text = "the quick brown fox jumps over the lazy dog and keeps running far away";
    let widest_word = 7.0 * 6.0;
    for width in [widest_word, 60.0, 100.0, 250.0] {
        let lines = text::break_into_lines(&courier_chars(text), width, LineBreakMode::WordWrap, &|_| 6.0);
        for line in &lines {
            assert!(line.width <= width + 1e-9, "'{}' is wider than {width}", line.text());
        }
    }
}

#[test]
fn test_truncation_is_idempotent() {
    let chars = courier_chars("Quarterly revenue by region and product line");
    for mode in [
        LineBreakMode::HeadTruncation,
        LineBreakMode::MiddleTruncation,
        LineBreakMode::TailTruncation,
    ] {
        let once = text::truncate(&chars, 90.0, mode, &|_| 6.0);
        let twice = text::truncate(&once, 90.0, mode, &|_| 6.0);
        assert_eq!(once, twice, "{mode:?}");
        assert!(once.iter().map(|c| c.width).sum::<f64>() <= 90.0);
    }
}

#[test]
fn test_span_text_round_trip() {
    let spans = vec![
        Span::new("Plain "),
        Span::styled("bold", TextStyle {
            font_weight: Some(700),
            ..Default::default()
        }),
        Span::new(" and é accents"),
    ];
    let para = ParagraphElement::from_spans(spans.clone(), TextStyle::default());
    let joined: String = spans.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(para.text(), joined);
    for (span, range) in para.spans().iter().zip(para.ranges()) {
        assert_eq!(&para.text()[range.clone()], span.text);
    }
}

#[test]
fn test_paragraph_splits_after_three_lines() {
    // 40 four-letter words: 199 characters. At 6pt per Courier glyph and
    // 180pt of width, six words fit per line.
    let words: Vec<&str> = std::iter::repeat("abcd").take(40).collect();
    let text = words.join(" ");
    let expected: Vec<String> = words.chunks(6).map(|c| c.join(" ")).collect();

    let fonts = FontContext::new();
    let sink = CollectingSink::new();
    let mut arena = ElementArena::new();
    let id = arena.insert_tree(&Node::paragraph(&text, courier(10.0)));
    let mut ctx = GenerationContext::new(arena, &fonts, &DefaultImageDecoder, &sink);

    measure_element(&mut ctx, id, Size::new(180.0, f64::INFINITY)).unwrap();
    // Three lines need 31.86pt, four need 43.86pt.
    let arranged = arrange_element(&mut ctx, id, Rect::new(0.0, 0.0, 180.0, 35.0)).unwrap();
    assert!(arranged.is_split());
    assert!((arranged.rect.height - 31.86).abs() < 1e-6);

    let rest = ctx.element(arranged.continuation.unwrap()).unwrap();
    match &rest.kind {
        ElementKind::Paragraph(p) => assert_eq!(p.text(), expected[3..].join("\n")),
        other => panic!("continuation should be a paragraph, got {}", other.name()),
    }

    let mut list = DrawList::new();
    render_element(&mut ctx, id, &mut list).unwrap();
    assert_eq!(list.text_content(), expected[..3].iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn test_long_paragraph_flows_across_pages() {
    let text = (1..=20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    // Room for four 12pt-advance lines per page.
    let doc = doc_on(page(200.0, 50.0), vec![Node::paragraph(&text, courier(10.0))]);
    let pages = quire::layout_document(&doc).unwrap();
    assert_eq!(pages.len(), 5);
    let expected: Vec<String> = (1..=20).map(|i| format!("line {i}")).collect();
    assert_eq!(all_text(&pages), expected);
}

#[test]
fn test_unknown_font_warns_once() {
    let style = TextStyle {
        font_family: Some("Comic Sans".to_string()),
        ..Default::default()
    };
    let doc = Document::new(vec![
        Node::paragraph("one", style.clone()),
        Node::paragraph("two", style),
    ]);
    let sink = CollectingSink::new();
    let pages = layout_collecting(&doc, &sink).unwrap();
    assert_eq!(sink.count(DiagnosticCode::FontNotFound), 1);
    assert_eq!(pages[0].diagnostics.len(), 1);
    assert_eq!(pages[0].text_content(), vec!["one", "two"]);
}

// ─── Grid Tests ─────────────────────────────────────────────────

#[test]
fn test_grid_auto_and_star_columns() {
    let grid = Node::grid(
        vec![GridLength::Auto, GridLength::Star(1.0), GridLength::Star(2.0)],
        vec![],
        vec![
            Node::rule(1.0, Color::BLACK)
                .with_style(BoxStyle::default().with_width(50.0))
                .in_cell(GridCell::at(0, 0)),
            Node::rule(1.0, Color::BLACK).in_cell(GridCell::at(0, 1)),
            Node::rule(1.0, Color::BLACK).in_cell(GridCell::at(0, 2)),
        ],
    );
    let pages = quire::layout_document(&doc_on(page(300.0, 400.0), vec![grid])).unwrap();
    let spans = line_spans(&pages[0].draw_calls);

    assert_eq!(spans.len(), 3);
    assert!((spans[0].1 - spans[0].0 - 50.0).abs() < 1e-9);
    assert!((spans[1].1 - spans[1].0 - 250.0 / 3.0).abs() < 1e-9);
    assert!((spans[2].1 - spans[2].0 - 500.0 / 3.0).abs() < 1e-9);
    // Columns tile the full content width.
    assert!((spans[2].1 - 300.0).abs() < 1e-9);
}

#[test]
fn test_grid_auto_placement_is_row_major() {
    let children = (0..5).map(|_| block(10.0)).collect();
    let grid = Node::grid(
        vec![GridLength::Star(1.0), GridLength::Star(1.0)],
        vec![],
        children,
    )
    .with_grid_spacing(0.0, 2.0);

    let fonts = FontContext::new();
    let sink = CollectingSink::new();
    let mut arena = ElementArena::new();
    let id = arena.insert_tree(&grid);
    let mut ctx = GenerationContext::new(arena, &fonts, &DefaultImageDecoder, &sink);
    let info = measure_element(&mut ctx, id, Size::new(100.0, f64::INFINITY)).unwrap();
    // Three rows of 10pt with two 2pt gaps.
    assert_eq!(info.height, 34.0);
    let arranged = arrange_element(&mut ctx, id, Rect::new(0.0, 0.0, 100.0, 34.0)).unwrap();
    assert_eq!(arranged.continuation, None);
}

#[test]
fn test_grid_overlapping_cells_is_fatal() {
    let grid = Node::grid(
        vec![GridLength::Star(1.0), GridLength::Star(1.0)],
        vec![],
        vec![
            block(10.0).in_cell(GridCell::at(0, 1)),
            block(10.0).in_cell(GridCell::at(0, 0).spanning(1, 2)),
        ],
    );
    let err = quire::layout_document(&Document::new(vec![grid])).unwrap_err();
    assert!(matches!(err, QuireError::OverlappingCells { row: 0, column: 1, .. }));
}

#[test]
fn test_grid_rows_continue_on_the_next_page() {
    let rows: Vec<Node> = (1..=6)
        .map(|i| Node::paragraph(&format!("row {i}"), courier(10.0)))
        .collect();
    let grid = Node::grid(vec![GridLength::Star(1.0)], vec![], rows).with_grid_spacing(0.0, 2.0);
    // Each row is 7.86pt; with 2pt gaps three rows need 27.58pt.
    let pages = quire::layout_document(&doc_on(page(200.0, 30.0), vec![grid])).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].text_content(), vec!["row 1", "row 2", "row 3"]);
    assert_eq!(pages[1].text_content(), vec!["row 4", "row 5", "row 6"]);
}

// ─── Stack Tests ────────────────────────────────────────────────

#[test]
fn test_vertical_stack_splits_between_children() {
    let stack = Node::vstack(
        5.0,
        (1..=6)
            .map(|i| Node::paragraph(&format!("item {i}"), courier(10.0)))
            .collect(),
    );
    let pages = quire::layout_document(&doc_on(page(200.0, 40.0), vec![stack])).unwrap();
    assert!(pages.len() > 1);
    let expected: Vec<String> = (1..=6).map(|i| format!("item {i}")).collect();
    assert_eq!(all_text(&pages), expected);
}

#[test]
fn test_horizontal_stack_columns_continue_independently() {
    let left = (1..=6).map(|i| format!("L{i}")).collect::<Vec<_>>().join("\n");
    let right = "R1\nR2".to_string();
    let stack = Node::hstack(
        10.0,
        vec![
            Node::paragraph(&left, courier(10.0)),
            Node::paragraph(&right, courier(10.0)),
        ],
    );
    // Four lines per page.
    let pages = quire::layout_document(&doc_on(page(200.0, 50.0), vec![stack])).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].text_content(), vec!["L1", "L2", "L3", "L4", "R1", "R2"]);
    assert_eq!(pages[1].text_content(), vec!["L5", "L6"]);
}

// ─── Pagination Tests ───────────────────────────────────────────

#[test]
fn test_element_taller_than_any_page_terminates() {
    let doc = doc_on(
        page(200.0, 100.0),
        vec![block(1000.0), Node::paragraph("after", TextStyle::default())],
    );
    let sink = CollectingSink::new();
    let pages = layout_collecting(&doc, &sink).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(sink.count(DiagnosticCode::LayoutOverflow), 1);
    assert_eq!(pages[1].text_content(), vec!["after"]);
}

#[test]
fn test_break_before_starts_a_new_page() {
    let mut breaking = BoxStyle::default();
    breaking.break_before = true;
    let doc = Document::new(vec![
        Node::paragraph("first", TextStyle::default()),
        Node::paragraph("second", TextStyle::default()).with_style(breaking),
    ]);
    let pages = quire::layout_document(&doc).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1].text_content(), vec!["second"]);
}

#[test]
fn test_page_spacing_between_top_level_elements() {
    let mut config = page(200.0, 100.0);
    config.spacing = 30.0;
    // 40 + 30 + 40 > 100: the second block moves on.
    let pages = quire::layout_document(&doc_on(config, vec![block(40.0), block(40.0)])).unwrap();
    assert_eq!(pages.len(), 2);
}

#[test]
fn test_header_and_footer_see_the_page_count() {
    let mut doc = doc_on(
        page(300.0, 100.0),
        vec![block(60.0), block(60.0), block(60.0)],
    );
    doc.header = Some(Node::paragraph("Report", TextStyle::default()));
    doc.footer = Some(Node::paragraph("Page {page} of {pages}", TextStyle::default()));
    let pages = quire::layout_document(&doc).unwrap();
    assert_eq!(pages.len(), 3);
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(
            page.text_content(),
            vec!["Report".to_string(), format!("Page {} of 3", i + 1)]
        );
    }
}

#[test]
fn test_cancellation_reports_completed_pages() {
    let doc = Document::new(vec![block(10.0)]);
    let fonts = FontContext::new();
    let sink = CollectingSink::new();
    let cancel = AtomicBool::new(true);
    let options = LayoutOptions {
        fonts: &fonts,
        images: &DefaultImageDecoder,
        sink: &sink,
        geometry: &StandardPageGeometry,
        cancel: Some(&cancel),
    };
    let err = quire::layout_document_with(&doc, &options).unwrap_err();
    assert!(matches!(err, QuireError::Cancelled { pages_completed: 0 }));
}

// ─── Error Handling Tests ───────────────────────────────────────

#[test]
fn test_arrange_before_measure_is_fatal() {
    let fonts = FontContext::new();
    let sink = CollectingSink::new();
    let mut arena = ElementArena::new();
    let id = arena.insert_tree(&Node::paragraph("x", TextStyle::default()));
    let mut ctx = GenerationContext::new(arena, &fonts, &DefaultImageDecoder, &sink);
    let err = arrange_element(&mut ctx, id, Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap_err();
    assert!(matches!(err, QuireError::ArrangeBeforeMeasure { .. }));
}

#[test]
fn test_undecodable_image_draws_placeholder() {
    let doc = Document::new(vec![Node::image("data:image/png;base64,bm90IGFuIGltYWdl")]);
    let sink = CollectingSink::new();
    let pages = layout_collecting(&doc, &sink).unwrap();

    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, DiagnosticCode::ImageDecodeError);
    assert_eq!(diagnostics[0].severity, quire::Severity::Warning);

    let calls = &pages[0].draw_calls;
    assert!(calls.iter().any(|call| matches!(
        call,
        DrawCall::Rect { stroke: Some(stroke), fill: None, .. } if stroke.color == Color::RED
    )));
    assert_eq!(pages[0].text_content(), vec!["[Image Load Error]"]);
}

#[test]
fn test_bad_custom_font_is_fatal() {
    let mut doc = Document::new(vec![]);
    doc.fonts.push(FontEntry {
        family: "Broken".to_string(),
        src: "AAAA".to_string(),
        weight: 400,
        italic: false,
    });
    let err = quire::layout_document(&doc).unwrap_err();
    assert!(matches!(err, QuireError::Font(_)));
}
