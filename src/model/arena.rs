//! Element arena.
//!
//! Elements are immutable values stored in slots and addressed by a
//! generational [`ElementId`]. Layout caches are keyed by that id, so two
//! elements with identical properties are still distinct entities, and an id
//! whose slot was freed and reused can never alias the new occupant.

use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use serde::Serialize;

use super::{ColumnDefinition, GridCell, Node, NodeKind, RowDefinition, RuleOrientation, Span};
use crate::style::{BoxStyle, Color, TextStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId {
    index: u32,
    generation: u32,
}

impl ElementId {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)?;
        if self.generation > 0 {
            write!(f, "v{}", self.generation)?;
        }
        Ok(())
    }
}

/// One node of the content tree, with children referenced by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    pub style: BoxStyle,
    pub children: Vec<ElementId>,
    /// Attached grid coordinates, read by the parent grid.
    pub cell: Option<GridCell>,
    /// Caller-supplied identifier, for diagnostics only.
    pub name: Option<String>,
}

impl Element {
    pub fn new(kind: ElementKind, style: BoxStyle) -> Self {
        Self {
            kind,
            style,
            children: Vec::new(),
            cell: None,
            name: None,
        }
    }

    pub fn with_children(mut self, children: Vec<ElementId>) -> Self {
        self.children = children;
        self
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// A label for log lines and diagnostics.
    pub fn describe(&self, id: ElementId) -> String {
        match &self.name {
            Some(name) => format!("{} '{}' ({})", self.kind_name(), name, id),
            None => format!("{} {}", self.kind_name(), id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Paragraph(ParagraphElement),
    Image(ImageElement),
    Rule(RuleElement),
    Grid(GridElement),
    VerticalStack { spacing: f64 },
    HorizontalStack { spacing: f64 },
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Paragraph(p) if p.has_explicit_spans() => "SpanParagraph",
            ElementKind::Paragraph(_) => "Paragraph",
            ElementKind::Image(_) => "Image",
            ElementKind::Rule(_) => "Rule",
            ElementKind::Grid(_) => "Grid",
            ElementKind::VerticalStack { .. } => "VerticalStack",
            ElementKind::HorizontalStack { .. } => "HorizontalStack",
        }
    }
}

/// Paragraph content: one implicit span for plain text, or an ordered list
/// of explicit spans. `text` is always the concatenation of the span texts
/// and `ranges[i]` is span `i`'s byte range inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphElement {
    text: String,
    spans: Vec<Span>,
    ranges: Vec<Range<usize>>,
    explicit_spans: bool,
    /// Byte offsets of newlines in `text` that stand for soft wraps.
    soft_breaks: Vec<usize>,
    pub text_style: TextStyle,
}

impl ParagraphElement {
    pub fn plain(text: &str, text_style: TextStyle) -> Self {
        Self {
            text: text.to_string(),
            spans: vec![Span::new(text)],
            ranges: vec![0..text.len()],
            explicit_spans: false,
            soft_breaks: Vec::new(),
            text_style,
        }
    }

    pub fn from_spans(spans: Vec<Span>, text_style: TextStyle) -> Self {
        let mut text = String::new();
        let mut ranges = Vec::with_capacity(spans.len());
        for span in &spans {
            let start = text.len();
            text.push_str(&span.text);
            ranges.push(start..text.len());
        }
        Self {
            text,
            spans,
            ranges,
            explicit_spans: true,
            soft_breaks: Vec::new(),
            text_style,
        }
    }

    /// The paragraph's logical text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Byte range of each span inside [`Self::text`].
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn has_explicit_spans(&self) -> bool {
        self.explicit_spans
    }

    /// Mark the newlines at these byte offsets as soft wraps. Offsets that
    /// do not point at a newline are ignored.
    pub fn with_soft_breaks(mut self, offsets: Vec<usize>) -> Self {
        self.soft_breaks = offsets
            .into_iter()
            .filter(|&at| self.text.as_bytes().get(at) == Some(&b'\n'))
            .collect();
        self
    }

    pub fn soft_breaks(&self) -> &[usize] {
        &self.soft_breaks
    }

    /// For each newline of the text, in order, whether it is a soft wrap.
    pub fn newline_kinds(&self) -> Vec<bool> {
        self.text
            .match_indices('\n')
            .map(|(at, _)| self.soft_breaks.contains(&at))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageElement {
    pub src: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleElement {
    pub thickness: f64,
    pub color: Color,
    pub orientation: RuleOrientation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridElement {
    pub columns: Vec<ColumnDefinition>,
    pub rows: Vec<RowDefinition>,
    pub column_spacing: f64,
    pub row_spacing: f64,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    element: Option<Rc<Element>>,
}

/// Owns every element of one document render.
#[derive(Debug, Clone, Default)]
pub struct ElementArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ElementArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: Element) -> ElementId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.element = Some(Rc::new(element));
            ElementId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                element: Some(Rc::new(element)),
            });
            ElementId {
                index,
                generation: 0,
            }
        }
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.slot(id).and_then(|slot| slot.element.as_deref())
    }

    /// A shared handle, for callers that need the element while mutating
    /// the arena.
    pub fn get_shared(&self, id: ElementId) -> Option<Rc<Element>> {
        self.slot(id).and_then(|slot| slot.element.clone())
    }

    fn slot(&self, id: ElementId) -> Option<&Slot> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Free a slot. The id, and every copy of it, goes stale.
    pub fn remove(&mut self, id: ElementId) -> Option<Rc<Element>> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let element = slot.element.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(element)
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.element.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten a node tree into the arena, children first.
    pub fn insert_tree(&mut self, node: &Node) -> ElementId {
        let children: Vec<ElementId> = node
            .children
            .iter()
            .map(|child| self.insert_tree(child))
            .collect();

        let kind = match &node.kind {
            NodeKind::Paragraph {
                text,
                spans,
                text_style,
            } => {
                if spans.is_empty() {
                    ElementKind::Paragraph(ParagraphElement::plain(text, text_style.clone()))
                } else {
                    ElementKind::Paragraph(ParagraphElement::from_spans(
                        spans.clone(),
                        text_style.clone(),
                    ))
                }
            }
            NodeKind::Image { src } => ElementKind::Image(ImageElement { src: src.clone() }),
            NodeKind::Rule {
                thickness,
                color,
                orientation,
            } => ElementKind::Rule(RuleElement {
                thickness: thickness.max(0.0),
                color: *color,
                orientation: *orientation,
            }),
            NodeKind::Grid {
                columns,
                rows,
                column_spacing,
                row_spacing,
            } => ElementKind::Grid(GridElement {
                columns: columns.clone(),
                rows: rows.clone(),
                column_spacing: column_spacing.max(0.0),
                row_spacing: row_spacing.max(0.0),
            }),
            NodeKind::VerticalStack { spacing } => ElementKind::VerticalStack {
                spacing: spacing.max(0.0),
            },
            NodeKind::HorizontalStack { spacing } => ElementKind::HorizontalStack {
                spacing: spacing.max(0.0),
            },
        };

        self.insert(Element {
            kind,
            style: node.style.clone(),
            children,
            cell: node.cell.map(|c| c.spanning(c.row_span, c.column_span)),
            name: node.id.clone(),
        })
    }
}
