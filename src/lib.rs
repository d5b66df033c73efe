//! # Quire
//!
//! A measure/arrange layout engine that flows element trees into pages.
//!
//! The page is the unit of layout. Every element is measured against the
//! space a page offers, arranged into what is left of the current page, and
//! split into an independent *continuation* when it does not fit. Nothing is
//! laid out on an infinite canvas and sliced afterwards.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    — Document tree, flattened into an element arena
//!       ↓
//!   [layout]   — Measure → Arrange → Render per element, paginated
//!       ↓         ([text], [font], [image_loader] as collaborators)
//!   [canvas]   — Draw calls per page
//! ```

pub mod canvas;
pub mod diagnostics;
pub mod error;
pub mod font;
pub mod geometry;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod style;
pub mod text;

use std::sync::atomic::AtomicBool;

pub use canvas::{Canvas, DrawCall, DrawList, Stroke};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticCode, DiagnosticSink, Severity, TracingSink};
pub use error::{QuireError, QuireResult};
pub use layout::{PageOutput, PageSettings};
pub use model::{Document, Node};

use font::{FontContext, FontProvider};
use image_loader::{DefaultImageDecoder, ImageDecoder};
use layout::GenerationContext;
use model::{ElementArena, ElementId, PageGeometry, StandardPageGeometry};

/// The collaborators one layout run talks to.
pub struct LayoutOptions<'a> {
    pub fonts: &'a dyn FontProvider,
    pub images: &'a dyn ImageDecoder,
    pub sink: &'a dyn DiagnosticSink,
    pub geometry: &'a dyn PageGeometry,
    /// Checked between pages.
    pub cancel: Option<&'a AtomicBool>,
}

/// Build the font context for a document: the built-in faces plus every
/// font the document registers.
pub fn document_fonts(document: &Document) -> QuireResult<FontContext> {
    let mut fonts = FontContext::new();
    for entry in &document.fonts {
        fonts.register_entry(entry)?;
    }
    Ok(fonts)
}

/// Lay out a document into pages.
///
/// This is the primary entry point. Diagnostics go to `tracing` and are also
/// attached to the page they were raised on.
pub fn layout_document(document: &Document) -> QuireResult<Vec<PageOutput>> {
    let fonts = document_fonts(document)?;
    let options = LayoutOptions {
        fonts: &fonts,
        images: &DefaultImageDecoder,
        sink: &TracingSink,
        geometry: &StandardPageGeometry,
        cancel: None,
    };
    layout_document_with(document, &options)
}

/// Lay out a document with caller-supplied collaborators.
pub fn layout_document_with(document: &Document, options: &LayoutOptions<'_>) -> QuireResult<Vec<PageOutput>> {
    let mut arena = ElementArena::new();
    let roots: Vec<ElementId> = document
        .children
        .iter()
        .map(|node| arena.insert_tree(node))
        .collect();

    let mut ctx = GenerationContext::new(arena, options.fonts, options.images, options.sink)
        .with_page_defaults(&document.page);
    let settings = PageSettings::from_config(&document.page, options.geometry)
        .with_furniture(document.header.clone(), document.footer.clone());

    let pages = layout::paginate(&mut ctx, &roots, &settings, options.cancel)?;
    tracing::debug!(pages = pages.len(), "document laid out");
    Ok(pages)
}

/// Lay out a document described as JSON and return the pages as JSON.
pub fn render_json(json: &str) -> QuireResult<String> {
    let document: Document = serde_json::from_str(json)?;
    let pages = layout_document(&document)?;
    Ok(serde_json::to_string_pretty(&pages)?)
}

/// Lay out independent documents in parallel, one thread and one
/// generation context per document. Results keep the input order.
pub fn render_many(documents: &[Document]) -> Vec<QuireResult<Vec<PageOutput>>> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = documents
            .iter()
            .map(|document| scope.spawn(move || layout_document(document)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}
