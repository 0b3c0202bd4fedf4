//! Template error and source location types.

use std::fmt;

/// A byte range in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Merges two spans into one that covers both.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }
}

/// An error raised while parsing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    /// The error message.
    pub message: String,
    /// Where in the template the error occurred.
    pub span: Span,
}

impl TemplateError {
    /// Creates a new template error.
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at position {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for TemplateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let merged = Span::new(5, 10).merge(Span::new(2, 7));
        assert_eq!(merged, Span::new(2, 10));
    }

    #[test]
    fn test_display() {
        let err = TemplateError::new("unclosed tag", Span::new(3, 5));
        assert_eq!(err.to_string(), "unclosed tag at position 3..5");
    }
}
