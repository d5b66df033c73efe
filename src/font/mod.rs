//! # Font Management
//!
//! The layout engine only sees fonts through the [`FontProvider`] trait:
//! resolve a family to a handle, measure text with a handle, and read the
//! handle's vertical metrics. Glyph shaping and kerning are out of scope;
//! a string's width is the sum of its characters' advances.
//!
//! [`FontContext`] is the provider used by default. It knows the standard
//! Helvetica, Times and Courier faces and any TrueType/OpenType fonts
//! registered from the document, whose metrics are read with ttf-parser.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use std::collections::HashMap;

use crate::error::{QuireError, QuireResult};
use crate::model::FontEntry;

/// Family used when nothing else resolves.
pub const DEFAULT_FAMILY: &str = "Helvetica";

/// A resolved face: what layout measured with and what draw calls name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontHandle {
    /// The registered family this handle belongs to.
    pub family: String,
    pub weight: u32,
    pub italic: bool,
    /// Concrete face name, e.g. "Helvetica-Bold".
    pub face: String,
}

/// Vertical metrics scaled to a font size, in points. `descent` is positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f64,
    pub descent: f64,
    /// Baseline-to-baseline distance.
    pub line_advance: f64,
}

/// The font collaborator consumed by text layout.
pub trait FontProvider {
    /// Whether `family` was registered.
    fn contains(&self, family: &str) -> bool;

    /// The provider's preferred family, if it has one.
    fn default_family(&self) -> Option<&str>;

    /// The first family ever registered.
    fn first_family(&self) -> Option<&str>;

    /// Resolve a family. Unknown families resolve to the system default
    /// handle instead of failing.
    fn resolve(&self, family: &str, weight: u32, italic: bool) -> FontHandle;

    /// Width of `text` in points.
    fn measure_text(&self, font: &FontHandle, size: f64, text: &str) -> f64;

    fn metrics(&self, font: &FontHandle, size: f64) -> LineMetrics;
}

/// A font registry that maps font family + weight + style to font data.
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
    /// Family display names in registration order.
    families: Vec<String>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    /// Lowercased family name.
    pub family: String,
    pub weight: u32,
    pub italic: bool,
}

impl FontKey {
    fn new(family: &str, weight: u32, italic: bool) -> Self {
        Self {
            family: family.to_lowercase(),
            weight,
            italic,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the built-in faces.
    Standard(StandardFont),
    /// A TrueType/OpenType font registered from the document.
    Custom {
        name: String,
        /// Parsed metrics from ttf-parser.
        metrics: CustomFontMetrics,
    },
}

impl FontData {
    fn face_name(&self) -> &str {
        match self {
            FontData::Standard(font) => font.face_name(),
            FontData::Custom { name, .. } => name,
        }
    }
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    pub fn line_metrics(&self, font_size: f64) -> LineMetrics {
        let scale = font_size / self.units_per_em as f64;
        let ascent = self.ascender as f64 * scale;
        let descent = -(self.descender as f64) * scale;
        LineMetrics {
            ascent,
            descent,
            line_advance: ascent + descent + self.line_gap.max(0) as f64 * scale,
        }
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut default_advance = 0u16;

        // Sample the Basic Multilingual Plane to build the width map
        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Some(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            line_gap: face.line_gap(),
        })
    }
}

/// The built-in faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    pub fn face_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => &metrics::HELVETICA_METRICS,
            Self::HelveticaBold | Self::HelveticaBoldOblique => &metrics::HELVETICA_BOLD_METRICS,
            Self::TimesRoman | Self::TimesBold | Self::TimesItalic | Self::TimesBoldItalic => {
                &metrics::TIMES_METRICS
            }
            Self::Courier | Self::CourierBold | Self::CourierOblique | Self::CourierBoldOblique => {
                &metrics::COURIER_METRICS
            }
        }
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            fonts: HashMap::new(),
            families: Vec::new(),
        };

        let standard_mappings = [
            (("Helvetica", 400, false), StandardFont::Helvetica),
            (("Helvetica", 700, false), StandardFont::HelveticaBold),
            (("Helvetica", 400, true), StandardFont::HelveticaOblique),
            (("Helvetica", 700, true), StandardFont::HelveticaBoldOblique),
            (("Times", 400, false), StandardFont::TimesRoman),
            (("Times", 700, false), StandardFont::TimesBold),
            (("Times", 400, true), StandardFont::TimesItalic),
            (("Times", 700, true), StandardFont::TimesBoldItalic),
            (("Courier", 400, false), StandardFont::Courier),
            (("Courier", 700, false), StandardFont::CourierBold),
            (("Courier", 400, true), StandardFont::CourierOblique),
            (("Courier", 700, true), StandardFont::CourierBoldOblique),
        ];

        for ((family, weight, italic), font) in standard_mappings {
            registry.insert(family, weight, italic, FontData::Standard(font));
        }

        registry
    }

    fn insert(&mut self, family: &str, weight: u32, italic: bool, data: FontData) {
        if !self.contains_family(family) {
            self.families.push(family.to_string());
        }
        self.fonts.insert(FontKey::new(family, weight, italic), data);
    }

    pub fn contains_family(&self, family: &str) -> bool {
        let lower = family.to_lowercase();
        self.fonts.keys().any(|k| k.family == lower)
    }

    /// Display name of a registered family, as it was first registered.
    fn canonical_family(&self, family: &str) -> Option<&str> {
        self.families
            .iter()
            .find(|f| f.eq_ignore_ascii_case(family))
            .map(String::as_str)
    }

    pub fn first_family(&self) -> Option<&str> {
        self.families.first().map(String::as_str)
    }

    /// Look up a font, falling back to Helvetica if not found.
    pub fn resolve(&self, family: &str, weight: u32, italic: bool) -> (FontKey, &FontData) {
        let snapped_weight = if weight >= 600 { 700 } else { 400 };
        let candidates = [
            FontKey::new(family, weight, italic),
            FontKey::new(family, snapped_weight, italic),
            FontKey::new(family, snapped_weight, false),
            FontKey::new(family, 400, false),
            FontKey::new(DEFAULT_FAMILY, snapped_weight, italic),
        ];
        for key in candidates {
            if let Some(font) = self.fonts.get(&key) {
                return (key, font);
            }
        }
        // Helvetica regular is registered by `new` and never removed.
        let key = FontKey::new(DEFAULT_FAMILY, 400, false);
        let font = self
            .fonts
            .get(&key)
            .map(|f| f as &FontData)
            .unwrap_or(&FontData::Standard(StandardFont::Helvetica));
        (key, font)
    }

    /// Register a custom font from raw TrueType/OpenType bytes.
    pub fn register(
        &mut self,
        family: &str,
        weight: u32,
        italic: bool,
        data: &[u8],
    ) -> QuireResult<()> {
        let metrics = CustomFontMetrics::from_font_data(data).ok_or_else(|| {
            QuireError::Font(format!("'{family}' is not a parseable TrueType/OpenType font"))
        })?;
        self.insert(
            family,
            weight,
            italic,
            FontData::Custom {
                name: family.to_string(),
                metrics,
            },
        );
        Ok(())
    }

    /// Iterate over all registered fonts.
    pub fn iter(&self) -> impl Iterator<Item = (&FontKey, &FontData)> {
        self.fonts.iter()
    }
}

/// Shared font context used by layout. Provides text measurement with real
/// glyph metrics.
pub struct FontContext {
    registry: FontRegistry,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// Register a document font entry (base64 or data URI).
    pub fn register_entry(&mut self, entry: &FontEntry) -> QuireResult<()> {
        let b64 = match entry.src.find(',') {
            Some(comma) if entry.src.starts_with("data:") => &entry.src[comma + 1..],
            _ => entry.src.as_str(),
        };
        let bytes = {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(b64.trim())
                .map_err(|e| QuireError::Font(format!("'{}': base64 decode error: {e}", entry.family)))?
        };
        self.registry
            .register(&entry.family, entry.weight, entry.italic, &bytes)
    }

    fn data_for(&self, font: &FontHandle) -> &FontData {
        self.registry.resolve(&font.family, font.weight, font.italic).1
    }

    /// Access the underlying font registry.
    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    /// Access the underlying font registry mutably.
    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}

impl FontProvider for FontContext {
    fn contains(&self, family: &str) -> bool {
        self.registry.contains_family(family)
    }

    fn default_family(&self) -> Option<&str> {
        self.registry.canonical_family(DEFAULT_FAMILY)
    }

    fn first_family(&self) -> Option<&str> {
        self.registry.first_family()
    }

    fn resolve(&self, family: &str, weight: u32, italic: bool) -> FontHandle {
        let (key, data) = self.registry.resolve(family, weight, italic);
        let family = self
            .registry
            .canonical_family(&key.family)
            .unwrap_or(DEFAULT_FAMILY)
            .to_string();
        FontHandle {
            family,
            weight: key.weight,
            italic: key.italic,
            face: data.face_name().to_string(),
        }
    }

    fn measure_text(&self, font: &FontHandle, size: f64, text: &str) -> f64 {
        match self.data_for(font) {
            FontData::Standard(std_font) => std_font.metrics().measure_string(text, size),
            FontData::Custom { metrics, .. } => {
                text.chars().map(|ch| metrics.char_width(ch, size)).sum()
            }
        }
    }

    fn metrics(&self, font: &FontHandle, size: f64) -> LineMetrics {
        match self.data_for(font) {
            FontData::Standard(std_font) => {
                let m = std_font.metrics();
                let ascent = m.ascender as f64 / 1000.0 * size;
                let descent = m.descender as f64 / 1000.0 * size;
                LineMetrics {
                    ascent,
                    descent,
                    line_advance: ascent + descent + m.line_gap as f64 / 1000.0 * size,
                }
            }
            FontData::Custom { metrics, .. } => metrics.line_metrics(size),
        }
    }
}
