//! # Generation Context
//!
//! Per-render state shared by every renderer: the element arena, the
//! external collaborators, page metadata, and the layout-state cache keyed
//! by [`ElementId`]. One context lives for one document render and is never
//! shared across threads.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::{ArrangeState, MeasureState};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{QuireError, QuireResult};
use crate::font::FontProvider;
use crate::geometry::{Rect, Size};
use crate::image_loader::{self, DecodedImage, ImageDecoder};
use crate::model::{Element, ElementArena, ElementId, PageConfig};
use crate::style::{ResolvedTextStyle, DEFAULT_FONT_SIZE};

/// Where an element is in the Measure → Arrange → Render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPhase {
    Unmeasured,
    Measured,
    Arranged,
    Rendered,
}

/// The page currently being laid out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    /// 1-based.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    /// The area inside the page margins.
    pub content: Rect,
}

impl Default for PageInfo {
    fn default() -> Self {
        Self {
            number: 1,
            width: 0.0,
            height: 0.0,
            content: Rect::default(),
        }
    }
}

/// Cached measure result for one element.
#[derive(Debug, Clone)]
pub(crate) struct LayoutEntry {
    pub phase: LayoutPhase,
    /// Content-box space the element was measured against.
    pub available: Size,
    /// Measured content-box size.
    pub content: Size,
    /// Desired border-box size (content plus padding, or the explicit size).
    pub border: Size,
    /// Zero-area element: measured to nothing and skipped.
    pub skipped: bool,
    pub state: MeasureState,
    pub arranged: Option<ArrangedRecord>,
}

/// What Arrange decided, consumed by Render.
#[derive(Debug, Clone)]
pub(crate) struct ArrangedRecord {
    pub border: Rect,
    pub content: Rect,
    /// The element overflowed its slot and draws clipped.
    pub clip: bool,
    pub state: ArrangeState,
}

pub struct GenerationContext<'a> {
    arena: ElementArena,
    fonts: &'a dyn FontProvider,
    images: &'a dyn ImageDecoder,
    sink: &'a dyn DiagnosticSink,
    page: PageInfo,
    text_defaults: ResolvedTextStyle,
    cache: HashMap<ElementId, LayoutEntry>,
    decoded: HashMap<ElementId, Result<DecodedImage, String>>,
    reported: HashSet<String>,
    page_diagnostics: Vec<Diagnostic>,
    force_progress: bool,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        arena: ElementArena,
        fonts: &'a dyn FontProvider,
        images: &'a dyn ImageDecoder,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            arena,
            fonts,
            images,
            sink,
            page: PageInfo::default(),
            text_defaults: ResolvedTextStyle::default(),
            cache: HashMap::new(),
            decoded: HashMap::new(),
            reported: HashSet::new(),
            page_diagnostics: Vec::new(),
            force_progress: false,
        }
    }

    /// Take the default font and size from the page configuration.
    pub fn with_page_defaults(mut self, config: &PageConfig) -> Self {
        self.text_defaults.font_family = config.default_font.clone();
        self.text_defaults.font_size = config.default_font_size.unwrap_or(DEFAULT_FONT_SIZE);
        self
    }

    // ── Elements ────────────────────────────────────────────────

    pub fn arena(&self) -> &ElementArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut ElementArena {
        &mut self.arena
    }

    pub fn element(&self, id: ElementId) -> QuireResult<Rc<Element>> {
        self.arena
            .get_shared(id)
            .ok_or(QuireError::UnknownElement { element: id })
    }

    /// Add an element created during layout, such as a continuation.
    pub fn insert_element(&mut self, element: Element) -> ElementId {
        self.arena.insert(element)
    }

    /// Drop an element and its cached layout. Children are left alone; a
    /// continuation shares them with the element it was split from.
    pub fn discard(&mut self, id: ElementId) {
        self.cache.remove(&id);
        self.decoded.remove(&id);
        self.arena.remove(id);
    }

    // ── Collaborators ───────────────────────────────────────────

    pub fn fonts(&self) -> &'a dyn FontProvider {
        self.fonts
    }

    pub fn text_defaults(&self) -> &ResolvedTextStyle {
        &self.text_defaults
    }

    /// Decode an image once per element; later calls reuse the result.
    pub fn decode_image(&mut self, id: ElementId, src: &str) -> Result<DecodedImage, String> {
        let images = self.images;
        self.decoded
            .entry(id)
            .or_insert_with(|| image_loader::load_image(images, src))
            .clone()
    }

    // ── Page ────────────────────────────────────────────────────

    pub fn page(&self) -> &PageInfo {
        &self.page
    }

    pub fn set_page(&mut self, page: PageInfo) {
        self.page = page;
    }

    // ── Diagnostics ─────────────────────────────────────────────

    /// Deliver a diagnostic to the sink and to the current page.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.page_diagnostics.push(diagnostic.clone());
        self.sink.submit(diagnostic);
    }

    /// Like [`Self::report`], but only the first diagnostic per `key` is
    /// delivered during this render.
    pub fn report_once(&mut self, key: String, diagnostic: Diagnostic) {
        if self.reported.insert(key) {
            self.report(diagnostic);
        }
    }

    pub fn take_page_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.page_diagnostics)
    }

    // ── Layout state ────────────────────────────────────────────

    pub fn phase(&self, id: ElementId) -> LayoutPhase {
        self.cache
            .get(&id)
            .map_or(LayoutPhase::Unmeasured, |entry| entry.phase)
    }

    pub(crate) fn entry(&self, id: ElementId) -> Option<&LayoutEntry> {
        self.cache.get(&id)
    }

    pub(crate) fn entry_mut(&mut self, id: ElementId) -> Option<&mut LayoutEntry> {
        self.cache.get_mut(&id)
    }

    /// Store a measure result. A re-measure replaces the previous entry.
    pub(crate) fn set_entry(&mut self, id: ElementId, entry: LayoutEntry) {
        self.cache.insert(id, entry);
    }

    /// Set when the element being arranged sits at the top of an empty
    /// page: it must consume something even if it does not fit.
    pub fn force_progress(&self) -> bool {
        self.force_progress
    }

    /// Returns the previous value.
    pub fn set_force_progress(&mut self, force: bool) -> bool {
        std::mem::replace(&mut self.force_progress, force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingSink, DiagnosticCode};
    use crate::font::FontContext;
    use crate::image_loader::DefaultImageDecoder;
    use crate::model::ElementKind;
    use crate::style::BoxStyle;

    #[test]
    fn report_once_dedupes_by_key() {
        let fonts = FontContext::new();
        let sink = CollectingSink::new();
        let mut ctx = GenerationContext::new(ElementArena::new(), &fonts, &DefaultImageDecoder, &sink);
        for _ in 0..3 {
            ctx.report_once(
                "font:Comic".to_string(),
                Diagnostic::warning(DiagnosticCode::FontNotFound, "Comic"),
            );
        }
        assert_eq!(sink.count(DiagnosticCode::FontNotFound), 1);
        assert_eq!(ctx.take_page_diagnostics().len(), 1);
        assert!(ctx.take_page_diagnostics().is_empty());
    }

    #[test]
    fn stale_ids_are_unknown() {
        let fonts = FontContext::new();
        let sink = CollectingSink::new();
        let mut ctx = GenerationContext::new(ElementArena::new(), &fonts, &DefaultImageDecoder, &sink);
        let id = ctx.insert_element(Element::new(
            ElementKind::VerticalStack { spacing: 0.0 },
            BoxStyle::default(),
        ));
        assert!(ctx.element(id).is_ok());
        ctx.discard(id);
        assert!(matches!(
            ctx.element(id),
            Err(QuireError::UnknownElement { element }) if element == id
        ));
        assert_eq!(ctx.phase(id), LayoutPhase::Unmeasured);
    }

    #[test]
    fn image_decodes_are_cached() {
        let fonts = FontContext::new();
        let sink = CollectingSink::new();
        let mut ctx = GenerationContext::new(ElementArena::new(), &fonts, &DefaultImageDecoder, &sink);
        let id = ctx.insert_element(Element::new(
            ElementKind::VerticalStack { spacing: 0.0 },
            BoxStyle::default(),
        ));
        let first = ctx.decode_image(id, "garbage");
        // A different src for the same element still returns the cached result.
        let second = ctx.decode_image(id, "");
        assert_eq!(first, second);
    }
}
