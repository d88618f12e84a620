//! Spans, edit operations and the text mutation capability.
//!
//! All offsets are UTF-8 byte offsets into the full document. Every offset a
//! caller hands in must fall on a char boundary; [`Document`] rejects the rest.

use crate::error::{SyncEditError, SyncEditResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A half-open byte range `start..end` in the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} after end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Caret containment: both bounds are inclusive, so a caret sitting right
    /// after the last character still belongs to the span.
    pub fn contains_caret(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Text covered by the span, if the span is valid for `text`.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.range())
    }

    /// Map the span through an edit applied elsewhere in the document.
    ///
    /// Returns `None` when the edit lands strictly inside the span (or
    /// deletes any of its characters); such a span no longer describes the
    /// text it was created for.
    pub fn rebase(&self, edit: &EditOperation) -> Option<Span> {
        if edit.intersects(self) {
            return None;
        }
        let start = edit.map_offset(self.start, Bias::After);
        let end = if self.is_empty() {
            start
        } else {
            edit.map_offset(self.end, Bias::Before)
        };
        Some(Span::new(start, end))
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

/// Which side of an insertion an offset sitting exactly on it ends up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Stay in front of the inserted text.
    Before,
    /// Move past the inserted text.
    After,
}

/// The atomic text mutation mirrored across a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditOperation {
    Insert { position: usize, text: String },
    Delete { position: usize, length: usize },
}

impl EditOperation {
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        Self::Insert {
            position,
            text: text.into(),
        }
    }

    pub fn delete(position: usize, length: usize) -> Self {
        Self::Delete { position, length }
    }

    pub fn position(&self) -> usize {
        match self {
            Self::Insert { position, .. } | Self::Delete { position, .. } => *position,
        }
    }

    /// Net change in document length.
    pub fn delta(&self) -> isize {
        match self {
            Self::Insert { text, .. } => text.len() as isize,
            Self::Delete { length, .. } => -(*length as isize),
        }
    }

    pub fn is_noop(&self) -> bool {
        match self {
            Self::Insert { text, .. } => text.is_empty(),
            Self::Delete { length, .. } => *length == 0,
        }
    }

    /// Map an offset of the pre-edit document to the post-edit document.
    pub fn map_offset(&self, offset: usize, bias: Bias) -> usize {
        match self {
            Self::Insert { position, text } => {
                if offset > *position || (offset == *position && bias == Bias::After) {
                    offset + text.len()
                } else {
                    offset
                }
            }
            Self::Delete { position, length } => {
                let removed_end = position + length;
                if offset >= removed_end {
                    offset - length
                } else if offset > *position {
                    *position
                } else {
                    offset
                }
            }
        }
    }

    /// Whether the edit changes any text inside `span`.
    ///
    /// Insertions exactly on a span boundary do not count: the new text lies
    /// outside the span.
    pub fn intersects(&self, span: &Span) -> bool {
        if self.is_noop() {
            return false;
        }
        match self {
            Self::Insert { position, .. } => span.start < *position && *position < span.end,
            Self::Delete { position, length } => {
                let removed_end = position + length;
                if span.is_empty() {
                    *position < span.start && removed_end > span.start
                } else {
                    *position < span.end && removed_end > span.start
                }
            }
        }
    }
}

/// Text mutation primitives supplied by the host editor.
pub trait TextBuffer {
    /// Current full document text.
    fn text(&self) -> &str;

    /// Insert `text` at `offset`.
    fn insert(&mut self, offset: usize, text: &str) -> SyncEditResult<()>;

    /// Delete `range`, returning the removed text.
    fn delete(&mut self, range: Range<usize>) -> SyncEditResult<String>;

    fn len(&self) -> usize {
        self.text().len()
    }

    fn is_empty(&self) -> bool {
        self.text().is_empty()
    }

    /// Apply an edit and return the operation that undoes it.
    fn apply(&mut self, edit: &EditOperation) -> SyncEditResult<EditOperation> {
        match edit {
            EditOperation::Insert { position, text } => {
                self.insert(*position, text)?;
                Ok(EditOperation::delete(*position, text.len()))
            }
            EditOperation::Delete { position, length } => {
                let removed = self.delete(*position..position + length)?;
                Ok(EditOperation::insert(*position, removed))
            }
        }
    }
}

/// In-memory document used by standalone hosts and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn into_string(self) -> String {
        self.text
    }

    fn check_offset(&self, offset: usize) -> SyncEditResult<()> {
        if self.text.is_char_boundary(offset) {
            Ok(())
        } else {
            Err(SyncEditError::invalid_offset(offset, self.text.len()))
        }
    }
}

impl TextBuffer for Document {
    fn text(&self) -> &str {
        &self.text
    }

    fn insert(&mut self, offset: usize, text: &str) -> SyncEditResult<()> {
        self.check_offset(offset)?;
        self.text.insert_str(offset, text);
        Ok(())
    }

    fn delete(&mut self, range: Range<usize>) -> SyncEditResult<String> {
        if range.start > range.end
            || !self.text.is_char_boundary(range.start)
            || !self.text.is_char_boundary(range.end)
        {
            return Err(SyncEditError::invalid_range(
                range.start,
                range.end,
                self.text.len(),
            ));
        }
        Ok(self.text.drain(range).collect())
    }
}
