//! # Document Model
//!
//! The input representation for the layout engine. A document is a tree of
//! nodes, each with a kind, box style properties, and children. This is the
//! shape that arrives as JSON or is built by a higher-level API.
//!
//! Before layout the tree is flattened into an [`ElementArena`]; the layout
//! engine only ever talks about elements by [`ElementId`].

mod arena;

pub use arena::{
    Element, ElementArena, ElementId, ElementKind, GridElement, ImageElement, ParagraphElement,
    RuleElement,
};

pub use crate::geometry::Edges;
use crate::style::{BoxStyle, Color, TextStyle};
use serde::{Deserialize, Serialize};

/// A complete document ready for layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The top-level content, flowed page after page in order.
    pub children: Vec<Node>,

    /// Page configuration shared by every page.
    #[serde(default)]
    pub page: PageConfig,

    /// Custom fonts to register before layout. Each entry contains
    /// the font family name, base64-encoded font data, weight, and style.
    #[serde(default)]
    pub fonts: Vec<FontEntry>,

    /// Repeated at the top of every page's content area.
    #[serde(default)]
    pub header: Option<Node>,

    /// Repeated at the bottom of every page's content area.
    #[serde(default)]
    pub footer: Option<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }
}

/// A custom font to register with the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontEntry {
    /// Font family name (e.g. "Inter", "Roboto").
    pub family: String,
    /// Base64-encoded font data, or a data URI (e.g. "data:font/ttf;base64,...").
    pub src: String,
    /// Font weight (100-900). Defaults to 400.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Whether this is an italic variant.
    #[serde(default)]
    pub italic: bool,
}

fn default_weight() -> u32 {
    400
}

/// Configuration for a page: size, margins, orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    /// Page size. Defaults to A4.
    #[serde(default)]
    pub size: PageSize,

    #[serde(default)]
    pub orientation: Orientation,

    /// Page margins in points (1/72 inch).
    #[serde(default = "default_margin")]
    pub margin: Edges,

    /// Vertical gap between consecutive top-level elements.
    #[serde(default)]
    pub spacing: f64,

    /// Family used by paragraphs that don't name one.
    #[serde(default)]
    pub default_font: Option<String>,

    /// Size used by paragraphs that don't set one.
    #[serde(default)]
    pub default_font_size: Option<f64>,
}

fn default_margin() -> Edges {
    Edges::uniform(54.0) // ~0.75 inch
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin: default_margin(),
            spacing: 0.0,
            default_font: None,
            default_font_size: None,
        }
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Maps a page size and orientation to physical dimensions.
pub trait PageGeometry {
    /// Returns (width, height) in points.
    fn dimensions(&self, size: PageSize, orientation: Orientation) -> (f64, f64);
}

/// ISO and US paper sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPageGeometry;

impl PageGeometry for StandardPageGeometry {
    fn dimensions(&self, size: PageSize, orientation: Orientation) -> (f64, f64) {
        let (w, h) = match size {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (width, height),
        };
        match orientation {
            Orientation::Portrait => (w.min(h), w.max(h)),
            Orientation::Landscape => (w.max(h), w.min(h)),
        }
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// What kind of node this is.
    pub kind: NodeKind,

    /// Box style properties for this node.
    #[serde(default)]
    pub style: BoxStyle,

    /// Child nodes (containers only).
    #[serde(default)]
    pub children: Vec<Node>,

    /// Optional identifier, carried into diagnostics for debugging.
    #[serde(default)]
    pub id: Option<String>,

    /// Cell coordinates when this node is a grid child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<GridCell>,
}

/// The different kinds of nodes in the document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// Text. When `spans` is non-empty, `text` is ignored and the paragraph's
    /// text is the concatenation of the span texts.
    Paragraph {
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        spans: Vec<Span>,
        #[serde(default, rename = "textStyle")]
        text_style: TextStyle,
    },

    /// A raster image.
    Image {
        /// Data URI, raw base64, or file path.
        #[serde(default)]
        src: String,
    },

    /// A straight line.
    Rule {
        #[serde(default = "default_thickness")]
        thickness: f64,
        #[serde(default)]
        color: Color,
        #[serde(default)]
        orientation: RuleOrientation,
    },

    /// A table of rows and columns; children carry their cell coordinates.
    Grid {
        #[serde(default)]
        columns: Vec<ColumnDefinition>,
        #[serde(default)]
        rows: Vec<RowDefinition>,
        #[serde(default, rename = "columnSpacing")]
        column_spacing: f64,
        #[serde(default, rename = "rowSpacing")]
        row_spacing: f64,
    },

    /// Children placed top to bottom.
    VerticalStack {
        #[serde(default)]
        spacing: f64,
    },

    /// Children placed left to right.
    HorizontalStack {
        #[serde(default)]
        spacing: f64,
    },
}

fn default_thickness() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOrientation {
    #[default]
    Horizontal,
    Vertical,
}

/// An ordered run of text with optional style overrides. Unset fields
/// inherit from the owning paragraph when the paragraph is measured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(default)]
    pub style: TextStyle,
}

impl Span {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            style: TextStyle::default(),
        }
    }

    pub fn styled(text: &str, style: TextStyle) -> Self {
        Self {
            text: text.to_string(),
            style,
        }
    }
}

/// The size of one grid track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GridLength {
    /// Fixed size in points.
    Absolute(f64),
    /// Sized to the largest single-track child.
    Auto,
    /// Weighted share of the space left after absolute and auto tracks.
    Star(f64),
}

impl Default for GridLength {
    fn default() -> Self {
        GridLength::Star(1.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub width: GridLength,
}

impl ColumnDefinition {
    pub fn new(width: GridLength) -> Self {
        Self { width }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RowDefinition {
    pub height: GridLength,
}

impl RowDefinition {
    pub fn new(height: GridLength) -> Self {
        Self { height }
    }
}

/// Attached grid coordinates. A cell with neither `row` nor `column` set is
/// implicit: it asks for (0, 0) and is auto-placed if that cell is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    #[serde(default)]
    pub row: Option<usize>,
    #[serde(default)]
    pub column: Option<usize>,
    #[serde(default = "default_span")]
    pub row_span: usize,
    #[serde(default = "default_span")]
    pub column_span: usize,
}

fn default_span() -> usize {
    1
}

impl Default for GridCell {
    fn default() -> Self {
        Self {
            row: None,
            column: None,
            row_span: 1,
            column_span: 1,
        }
    }
}

impl GridCell {
    pub fn at(row: usize, column: usize) -> Self {
        Self {
            row: Some(row),
            column: Some(column),
            ..Default::default()
        }
    }

    pub fn spanning(mut self, row_span: usize, column_span: usize) -> Self {
        self.row_span = row_span.max(1);
        self.column_span = column_span.max(1);
        self
    }

    pub fn is_explicit(&self) -> bool {
        self.row.is_some() || self.column.is_some()
    }
}

impl Node {
    fn with_kind(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            style: BoxStyle::default(),
            children,
            id: None,
            cell: None,
        }
    }

    /// Create a plain-text paragraph.
    pub fn paragraph(text: &str, text_style: TextStyle) -> Self {
        Self::with_kind(
            NodeKind::Paragraph {
                text: text.to_string(),
                spans: vec![],
                text_style,
            },
            vec![],
        )
    }

    /// Create a paragraph from explicit spans.
    pub fn rich_paragraph(spans: Vec<Span>, text_style: TextStyle) -> Self {
        Self::with_kind(
            NodeKind::Paragraph {
                text: String::new(),
                spans,
                text_style,
            },
            vec![],
        )
    }

    pub fn image(src: &str) -> Self {
        Self::with_kind(
            NodeKind::Image {
                src: src.to_string(),
            },
            vec![],
        )
    }

    pub fn rule(thickness: f64, color: Color) -> Self {
        Self::with_kind(
            NodeKind::Rule {
                thickness,
                color,
                orientation: RuleOrientation::Horizontal,
            },
            vec![],
        )
    }

    pub fn vertical_rule(thickness: f64, color: Color) -> Self {
        Self::with_kind(
            NodeKind::Rule {
                thickness,
                color,
                orientation: RuleOrientation::Vertical,
            },
            vec![],
        )
    }

    pub fn vstack(spacing: f64, children: Vec<Node>) -> Self {
        Self::with_kind(NodeKind::VerticalStack { spacing }, children)
    }

    pub fn hstack(spacing: f64, children: Vec<Node>) -> Self {
        Self::with_kind(NodeKind::HorizontalStack { spacing }, children)
    }

    pub fn grid(columns: Vec<GridLength>, rows: Vec<GridLength>, children: Vec<Node>) -> Self {
        Self::with_kind(
            NodeKind::Grid {
                columns: columns.into_iter().map(ColumnDefinition::new).collect(),
                rows: rows.into_iter().map(RowDefinition::new).collect(),
                column_spacing: 0.0,
                row_spacing: 0.0,
            },
            children,
        )
    }

    /// Set the grid spacing. No effect on non-grid nodes.
    pub fn with_grid_spacing(mut self, column: f64, row: f64) -> Self {
        if let NodeKind::Grid {
            column_spacing,
            row_spacing,
            ..
        } = &mut self.kind
        {
            *column_spacing = column;
            *row_spacing = row;
        }
        self
    }

    pub fn with_style(mut self, style: BoxStyle) -> Self {
        self.style = style;
        self
    }

    pub fn in_cell(mut self, cell: GridCell) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}
