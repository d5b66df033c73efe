//! Structured error types for the Quire layout engine.
//!
//! Only fatal conditions live here. Content problems that layout can work
//! around (missing fonts, undecodable images, overflow) are reported through
//! [`crate::diagnostics`] instead and never unwind.

use crate::model::ElementId;

pub type QuireResult<T> = Result<T, QuireError>;

/// The unified error type returned by all public Quire API functions.
#[derive(thiserror::Error, Debug)]
pub enum QuireError {
    /// JSON input failed to parse as a valid Quire document.
    #[error("failed to parse document: {source}{}", format_hint(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    /// Arrange was called for an element that has no measure result.
    #[error("element {element} was arranged before it was measured")]
    ArrangeBeforeMeasure { element: ElementId },

    /// Two grid children explicitly claim the same cell.
    #[error("grid children {first} and {second} both occupy cell (row {row}, column {column})")]
    OverlappingCells {
        first: ElementId,
        second: ElementId,
        row: usize,
        column: usize,
    },

    /// An element id that does not resolve to a live element reached dispatch.
    #[error("unknown element {element}")]
    UnknownElement { element: ElementId },

    /// A custom font could not be decoded or parsed.
    #[error("font error: {0}")]
    Font(String),

    /// Generation was cancelled at a page boundary.
    #[error("generation cancelled after {pages_completed} page(s)")]
    Cancelled { pages_completed: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl From<serde_json::Error> for QuireError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the Quire document schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        QuireError::Parse { source: e, hint }
    }
}
