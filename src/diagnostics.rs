//! # Diagnostics
//!
//! Non-fatal, structured signals raised while laying out content. Every
//! diagnostic is paired with a locally substituted layout result, so the
//! caller always gets a complete page even when something went wrong.

use std::cell::RefCell;
use std::fmt;

use serde::Serialize;

use crate::model::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    /// A font alias was not registered; the default typeface was used.
    FontNotFound,
    /// Image bytes could not be loaded or decoded; a placeholder was drawn.
    ImageDecodeError,
    /// An element needed more room than its container offered and was clamped.
    LayoutOverflow,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::FontNotFound => "font-not-found",
            DiagnosticCode::ImageDecodeError => "image-decode-error",
            DiagnosticCode::LayoutOverflow => "layout-overflow",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementId>,
}

impl Diagnostic {
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            element: None,
        }
    }

    pub fn for_element(mut self, element: ElementId) -> Self {
        self.element = Some(element);
        self
    }
}

/// Receives diagnostics. Fire-and-forget: implementations must not panic and
/// must not block generation.
pub trait DiagnosticSink {
    fn submit(&self, diagnostic: Diagnostic);
}

/// Drops everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn submit(&self, _diagnostic: Diagnostic) {}
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn submit(&self, d: Diagnostic) {
        match d.severity {
            Severity::Info => tracing::info!(code = %d.code, element = ?d.element, "{}", d.message),
            Severity::Warning => {
                tracing::warn!(code = %d.code, element = ?d.element, "{}", d.message)
            }
            Severity::Error => {
                tracing::error!(code = %d.code, element = ?d.element, "{}", d.message)
            }
        }
    }
}

/// Keeps every diagnostic in memory, in submission order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    collected: RefCell<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.collected.borrow().clone()
    }

    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.collected
            .borrow()
            .iter()
            .filter(|d| d.code == code)
            .count()
    }
}

impl DiagnosticSink for CollectingSink {
    fn submit(&self, diagnostic: Diagnostic) {
        self.collected.borrow_mut().push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_counts_by_code() {
        let sink = CollectingSink::new();
        sink.submit(Diagnostic::warning(DiagnosticCode::FontNotFound, "Comic"));
        sink.submit(Diagnostic::warning(DiagnosticCode::LayoutOverflow, "too tall"));
        sink.submit(Diagnostic::warning(DiagnosticCode::FontNotFound, "Papyrus"));
        assert_eq!(sink.count(DiagnosticCode::FontNotFound), 2);
        assert_eq!(sink.count(DiagnosticCode::ImageDecodeError), 0);
        assert_eq!(sink.diagnostics()[1].message, "too tall");
    }

    #[test]
    fn codes_have_stable_names() {
        assert_eq!(DiagnosticCode::ImageDecodeError.to_string(), "image-decode-error");
        assert_eq!(DiagnosticCode::LayoutOverflow.as_str(), "layout-overflow");
    }
}
