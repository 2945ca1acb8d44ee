//! Edit buffer over an immutable snapshot of a document.
//!
//! Edits are addressed in positions of the *original* text and must not
//! overlap; nothing is applied until [`EditBuffer::apply`], which produces
//! the new text in one go.

use crate::model::{Position, Range};
use crate::text::LineIndex;
use serde::Serialize;
use thiserror::Error;

/// Replace `range` with `new_text`. An empty range is an insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    pub fn insert(at: Position, new_text: impl Into<String>) -> Self {
        Self::replace(Range::empty(at), new_text)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("edit position {line}:{character} is outside the document")]
    OutOfBounds { line: u32, character: u32 },

    #[error("edit at {line}:{character} overlaps another edit")]
    Overlap { line: u32, character: u32 },

    #[error("edit range starting at {line}:{character} ends before it starts")]
    Reversed { line: u32, character: u32 },
}

#[derive(Debug)]
struct Pending {
    start: usize,
    end: usize,
    edit: TextEdit,
}

#[derive(Debug)]
pub struct EditBuffer<'a> {
    index: LineIndex<'a>,
    pending: Vec<Pending>,
}

impl<'a> EditBuffer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            index: LineIndex::new(source),
            pending: Vec::new(),
        }
    }

    pub fn replace(&mut self, range: Range, new_text: impl Into<String>) -> Result<(), EditError> {
        self.push(TextEdit::replace(range, new_text))
    }

    pub fn insert(&mut self, at: Position, new_text: impl Into<String>) -> Result<(), EditError> {
        self.push(TextEdit::insert(at, new_text))
    }

    /// Queue an edit. Fails without queuing when the edit falls outside the
    /// document or overlaps a queued one; insertions at the same point are
    /// kept in the order they were pushed.
    pub fn push(&mut self, edit: TextEdit) -> Result<(), EditError> {
        let start = self.offset(edit.range.start)?;
        let end = self.offset(edit.range.end)?;
        if end < start {
            return Err(EditError::Reversed {
                line: edit.range.start.line,
                character: edit.range.start.character,
            });
        }
        if self.pending.iter().any(|p| start < p.end && p.start < end) {
            return Err(EditError::Overlap {
                line: edit.range.start.line,
                character: edit.range.start.character,
            });
        }
        self.pending.push(Pending { start, end, edit });
        Ok(())
    }

    fn offset(&self, pos: Position) -> Result<usize, EditError> {
        self.index.offset(pos).ok_or(EditError::OutOfBounds {
            line: pos.line,
            character: pos.character,
        })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The new text with every queued edit applied.
    pub fn apply(&self) -> String {
        let source = self.index.text();
        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for p in self.sorted() {
            out.push_str(&source[cursor..p.start]);
            out.push_str(&p.edit.new_text);
            cursor = p.end;
        }
        out.push_str(&source[cursor..]);
        out
    }

    /// Queued edits in document order.
    pub fn into_edits(self) -> Vec<TextEdit> {
        let mut pending = self.pending;
        pending.sort_by_key(|p| (p.start, p.end));
        pending.into_iter().map(|p| p.edit).collect()
    }

    fn sorted(&self) -> Vec<&Pending> {
        let mut sorted: Vec<&Pending> = self.pending.iter().collect();
        sorted.sort_by_key(|p| (p.start, p.end));
        sorted
    }
}

/// Apply `edits` to `source` atomically: either every edit applies or an
/// error is returned and nothing changes.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let mut buffer = EditBuffer::new(source);
    for edit in edits {
        buffer.push(edit.clone())?;
    }
    Ok(buffer.apply())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_against_original_positions() {
        let source = "alpha beta\ngamma";
        let mut buffer = EditBuffer::new(source);
        buffer.replace(Range::on_line(1, 0, 5), "GAMMA").unwrap();
        buffer.replace(Range::on_line(0, 0, 5), "a").unwrap();
        buffer.insert(Position::new(0, 10), "!").unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.apply(), "a beta!\nGAMMA");
    }

    #[test]
    fn rejects_overlap_and_keeps_buffer_intact() {
        let mut buffer = EditBuffer::new("function f()");
        buffer.replace(Range::on_line(0, 9, 10), "M.f").unwrap();
        let err = buffer.replace(Range::on_line(0, 0, 11), "x").unwrap_err();
        assert_eq!(err, EditError::Overlap { line: 0, character: 0 });
        assert_eq!(buffer.apply(), "function M.f()");
    }

    #[test]
    fn adjacent_edits_do_not_overlap() {
        let mut buffer = EditBuffer::new("abcd");
        buffer.replace(Range::on_line(0, 0, 2), "X").unwrap();
        buffer.replace(Range::on_line(0, 2, 4), "Y").unwrap();
        buffer.insert(Position::new(0, 2), "-").unwrap();
        assert_eq!(buffer.apply(), "X-Y");
    }

    #[test]
    fn out_of_bounds() {
        let mut buffer = EditBuffer::new("one\ntwo");
        assert_eq!(
            buffer.insert(Position::new(2, 0), "x"),
            Err(EditError::OutOfBounds { line: 2, character: 0 })
        );
        assert_eq!(
            buffer.insert(Position::new(0, 4), "x"),
            Err(EditError::OutOfBounds { line: 0, character: 4 })
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn reversed_range() {
        let mut buffer = EditBuffer::new("abc");
        let range = Range::new(Position::new(0, 2), Position::new(0, 1));
        assert!(matches!(buffer.replace(range, ""), Err(EditError::Reversed { .. })));
    }

    #[test]
    fn into_edits_is_sorted() {
        let mut buffer = EditBuffer::new("a\nb");
        buffer.insert(Position::new(1, 1), "2").unwrap();
        buffer.insert(Position::new(0, 0), "1").unwrap();
        let edits = buffer.into_edits();
        assert_eq!(edits[0].new_text, "1");
        assert_eq!(edits[1].new_text, "2");
    }

    #[test]
    fn apply_edits_is_all_or_nothing() {
        let edits = vec![
            TextEdit::replace(Range::on_line(0, 0, 3), "ONE"),
            TextEdit::replace(Range::on_line(0, 1, 2), "x"),
        ];
        assert!(apply_edits("one", &edits).is_err());
        assert_eq!(apply_edits("one", &edits[..1]).unwrap(), "ONE");
    }
}
