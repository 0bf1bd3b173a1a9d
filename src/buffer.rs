//! Editable copy of the translation unit. A pass run replaces at most one
//! range; the buffer refuses a second edit so the rewrite stays the single
//! mutation point.

use thiserror::Error;

use crate::span::Span;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("edit range {start}..{end} is outside the buffer (length {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("edit range {start}..{end} does not fall on character boundaries")]
    NotCharBoundary { start: usize, end: usize },

    #[error("buffer was already edited at {start}..{end}")]
    AlreadyEdited { start: usize, end: usize },
}

#[derive(Debug, Clone)]
pub struct SourceBuffer {
    text: String,
    /// Range of the replacement text in the edited buffer.
    edit: Option<Span>,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), edit: None }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_modified(&self) -> bool {
        self.edit.is_some()
    }

    /// Replaces `span` (byte offsets into the unedited text) with `replacement`.
    pub fn replace(&mut self, span: Span, replacement: &str) -> Result<(), BufferError> {
        if let Some(done) = self.edit {
            return Err(BufferError::AlreadyEdited { start: done.start, end: done.end });
        }
        if span.start > span.end || span.end > self.text.len() {
            return Err(BufferError::OutOfBounds { start: span.start, end: span.end, len: self.text.len() });
        }
        if !self.text.is_char_boundary(span.start) || !self.text.is_char_boundary(span.end) {
            return Err(BufferError::NotCharBoundary { start: span.start, end: span.end });
        }
        self.text.replace_range(span.start..span.end, replacement);
        self.edit = Some(Span::new(span.start, span.start + replacement.len()));
        Ok(())
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
