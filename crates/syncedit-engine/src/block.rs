//! The selected block a session works on.

use syncedit_foundation::{Bias, EditOperation, Span, SyncEditError, SyncEditResult};

/// Selected document range plus the text it held when the session started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    span: Span,
    snapshot: String,
}

impl Block {
    /// Snapshot `span` of `document`.
    pub fn capture(document: &str, span: Span) -> SyncEditResult<Self> {
        let snapshot = span
            .slice(document)
            .ok_or_else(|| SyncEditError::invalid_range(span.start, span.end, document.len()))?;
        Ok(Self {
            span,
            snapshot: snapshot.to_string(),
        })
    }

    /// Current bounds in the document.
    pub fn span(&self) -> Span {
        self.span
    }

    /// Text of the block at session start. Never updated by edits.
    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    pub fn start(&self) -> usize {
        self.span.start
    }

    /// Keep the bounds in step with the document. Insertions exactly at either
    /// bound are taken into the block.
    pub(crate) fn rebase(&mut self, edit: &EditOperation) {
        let start = edit.map_offset(self.span.start, Bias::Before);
        let end = edit.map_offset(self.span.end, Bias::After);
        self.span = Span::new(start, end.max(start));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_validates_range() {
        let block = Block::capture("let x = y;", Span::new(4, 9)).unwrap();
        assert_eq!(block.snapshot(), "x = y");
        assert!(Block::capture("short", Span::new(2, 40)).is_err());
    }

    #[test]
    fn test_rebase_grows_at_edges() {
        let mut block = Block::capture("0123456789", Span::new(2, 6)).unwrap();
        block.rebase(&EditOperation::insert(6, "ab"));
        assert_eq!(block.span(), Span::new(2, 8));
        block.rebase(&EditOperation::insert(2, "c"));
        assert_eq!(block.span(), Span::new(2, 9));
        block.rebase(&EditOperation::insert(0, "zz"));
        assert_eq!(block.span(), Span::new(4, 11));
        block.rebase(&EditOperation::delete(5, 3));
        assert_eq!(block.span(), Span::new(4, 8));
        // snapshot stays as captured
        assert_eq!(block.snapshot(), "2345");
    }
}
