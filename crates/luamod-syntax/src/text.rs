//! Line and column bookkeeping shared by the indexer and the rewriter.
//!
//! Lines are split on `\n` only: a file ending in a newline has a final empty
//! line, and a `\r` before the newline stays part of its line. Columns are
//! UTF-16 code units, the unit editors and LSP clients count in.

use crate::model::Position;

/// Split text into the lines the scanners walk.
pub fn lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Number of UTF-16 code units in `s`.
pub fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

/// UTF-16 column of the byte offset `byte` within `line`.
pub fn utf16_col(line: &str, byte: usize) -> u32 {
    utf16_len(&line[..byte])
}

/// Byte offset of the UTF-16 column `col` within `line`.
///
/// `None` when the column lies past the end of the line or inside a
/// surrogate pair.
pub fn byte_col(line: &str, col: u32) -> Option<usize> {
    let mut units = 0u32;
    for (i, ch) in line.char_indices() {
        if units == col {
            return Some(i);
        }
        if units > col {
            return None;
        }
        units += ch.len_utf16() as u32;
    }
    (units == col).then_some(line.len())
}

/// Maps positions to byte offsets for one immutable snapshot of a document.
#[derive(Debug)]
pub struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, starts }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Text of line `line`, without its trailing `\n`.
    pub fn line(&self, line: usize) -> Option<&'a str> {
        let start = *self.starts.get(line)?;
        let end = self
            .starts
            .get(line + 1)
            .map_or(self.text.len(), |next| next - 1);
        Some(&self.text[start..end])
    }

    /// Byte offset of `pos` in the whole text.
    pub fn offset(&self, pos: Position) -> Option<usize> {
        let line = pos.line as usize;
        let text = self.line(line)?;
        Some(self.starts[line] + byte_col(text, pos.character)?)
    }
}
