//! # Style System
//!
//! Two groups of properties:
//!
//! - [`BoxStyle`]: the layout-affecting attributes every element carries
//!   (explicit size, margin, padding, alignment, background).
//! - [`TextStyle`]: typography for paragraphs and spans. Every field is
//!   optional; unset fields are filled in at resolution time from the
//!   owning paragraph, then from the page defaults.

use crate::geometry::Edges;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Placement of an element inside the slot its parent gives it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Start,
    Center,
    End,
    #[default]
    Fill,
}

impl Alignment {
    /// Offset of an item of `size` inside a slot of `slot` along one axis.
    /// `Fill` items are expected to already be slot-sized and sit at 0.
    pub fn offset(&self, slot: f64, size: f64) -> f64 {
        let free = (slot - size).max(0.0);
        match self {
            Alignment::Start | Alignment::Fill => 0.0,
            Alignment::Center => free / 2.0,
            Alignment::End => free,
        }
    }
}

/// Horizontal alignment of text lines inside a paragraph's content box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Start,
    Center,
    End,
    Justify,
}

/// How a paragraph treats text wider than its box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineBreakMode {
    /// Each newline-separated segment is one line and may overflow.
    NoWrap,
    /// Greedy fill, breaking at the last opportunity before the overflow.
    #[default]
    WordWrap,
    /// Single line, `…` replaces the start.
    HeadTruncation,
    /// Single line, `…` replaces the middle.
    MiddleTruncation,
    /// Single line, `…` replaces the end.
    TailTruncation,
}

impl LineBreakMode {
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            LineBreakMode::HeadTruncation
                | LineBreakMode::MiddleTruncation
                | LineBreakMode::TailTruncation
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

impl FontStyle {
    pub fn is_italic(&self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::Oblique)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

impl TextTransform {
    pub fn apply(&self, text: &str) -> String {
        self.apply_after(text, None)
    }

    /// Transform `text` as a slice of a longer string whose character just
    /// before it is `preceding`. Capitalization only starts a word after
    /// whitespace or at the very start.
    pub fn apply_after(&self, text: &str, preceding: Option<char>) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::Lowercase => text.to_lowercase(),
            TextTransform::Capitalize => {
                let mut result = String::with_capacity(text.len());
                let mut prev_is_whitespace = preceding.map_or(true, char::is_whitespace);
                for ch in text.chars() {
                    if prev_is_whitespace && ch.is_alphabetic() {
                        result.extend(ch.to_uppercase());
                    } else {
                        result.push(ch);
                    }
                    prev_is_whitespace = ch.is_whitespace();
                }
                result
            }
        }
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

fn opaque() -> f64 {
    1.0
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const RED: Color = Color {
        r: 1.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0) as f64 / 255.0;
        match hex.len() {
            3 => Self::rgb(
                channel(hex[0..1].repeat(2).as_str()),
                channel(hex[1..2].repeat(2).as_str()),
                channel(hex[2..3].repeat(2).as_str()),
            ),
            6 => Self::rgb(channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
            _ => Color::BLACK,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Layout-affecting attributes shared by every element variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoxStyle {
    /// Explicit border-box width in points.
    pub width: Option<f64>,
    /// Explicit border-box height in points.
    pub height: Option<f64>,
    pub margin: Edges,
    pub padding: Edges,
    pub horizontal_alignment: Alignment,
    pub vertical_alignment: Alignment,
    pub background: Option<Color>,
    /// Start this element on a fresh page.
    pub break_before: bool,
}

impl BoxStyle {
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_margin(mut self, margin: Edges) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_padding(mut self, padding: Edges) -> Self {
        self.padding = padding;
        self
    }

    pub fn aligned(mut self, horizontal: Alignment, vertical: Alignment) -> Self {
        self.horizontal_alignment = horizontal;
        self.vertical_alignment = vertical;
        self
    }

    /// Margin plus padding: everything between the parent slot and the content box.
    pub fn insets(&self) -> Edges {
        self.margin.add(&self.padding)
    }
}

/// Typography overrides for a paragraph or a span. `None` means inherit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub font_weight: Option<u32>,
    pub font_style: Option<FontStyle>,
    pub color: Option<Color>,
    pub text_decoration: Option<TextDecoration>,
    pub text_transform: Option<TextTransform>,
    pub text_align: Option<TextAlign>,
    pub line_break: Option<LineBreakMode>,
    /// Multiplier applied to the font's baseline-to-baseline advance.
    pub line_spacing: Option<f64>,
    /// Minimum lines left at the bottom of a page when a paragraph splits.
    pub min_orphan_lines: Option<u32>,
    /// Minimum lines carried to the next page when a paragraph splits.
    pub min_widow_lines: Option<u32>,
}

impl TextStyle {
    /// Layer `self` over `base`, producing concrete values. The font family
    /// is kept as requested; it is resolved against the font provider later.
    pub fn resolve_over(&self, base: &ResolvedTextStyle) -> ResolvedTextStyle {
        ResolvedTextStyle {
            font_family: self
                .font_family
                .clone()
                .or_else(|| base.font_family.clone()),
            font_size: self.font_size.unwrap_or(base.font_size).max(0.0),
            font_weight: self.font_weight.unwrap_or(base.font_weight),
            font_style: self.font_style.unwrap_or(base.font_style),
            color: self.color.unwrap_or(base.color),
            text_decoration: self.text_decoration.unwrap_or(base.text_decoration),
            text_transform: self.text_transform.unwrap_or(base.text_transform),
            text_align: self.text_align.unwrap_or(base.text_align),
            line_break: self.line_break.unwrap_or(base.line_break),
            line_spacing: self.line_spacing.unwrap_or(base.line_spacing),
            min_orphan_lines: self.min_orphan_lines.unwrap_or(base.min_orphan_lines),
            min_widow_lines: self.min_widow_lines.unwrap_or(base.min_widow_lines),
        }
    }
}

/// Text style with every value concrete except the family, which stays a
/// request until the font provider confirms it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
    pub font_weight: u32,
    pub font_style: FontStyle,
    pub color: Color,
    pub text_decoration: TextDecoration,
    pub text_transform: TextTransform,
    pub text_align: TextAlign,
    pub line_break: LineBreakMode,
    pub line_spacing: f64,
    pub min_orphan_lines: u32,
    pub min_widow_lines: u32,
}

impl Default for ResolvedTextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: DEFAULT_FONT_SIZE,
            font_weight: 400,
            font_style: FontStyle::Normal,
            color: Color::BLACK,
            text_decoration: TextDecoration::None,
            text_transform: TextTransform::None,
            text_align: TextAlign::Start,
            line_break: LineBreakMode::WordWrap,
            line_spacing: 1.0,
            min_orphan_lines: 1,
            min_widow_lines: 1,
        }
    }
}
