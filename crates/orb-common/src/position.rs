//! Source locations.
//!
//! `CodeLoc` is the unit every diagnostic and every `NodeVal` carries
//! (spec.md §3, §6). It names a file (via [`StringId`](crate::StringId))
//! plus a half-open byte range, with line/column resolved lazily through a
//! [`LineMap`] only when a diagnostic actually needs to be printed.

use crate::interner::StringId;

pub type CodeIndex = u32;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CodeLoc {
    pub file: StringId,
    pub start: CodeIndex,
    pub end: CodeIndex,
}

impl CodeLoc {
    #[must_use]
    pub fn new(file: StringId, start: CodeIndex, end: CodeIndex) -> Self {
        Self { file, start, end }
    }

    /// A zero-width location at `start`, used for synthesized nodes (e.g.
    /// macro-substituted leaves before the call-site location is applied).
    #[must_use]
    pub fn point(file: StringId, at: CodeIndex) -> Self {
        Self::new(file, at, at)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Maps byte offsets within one file's source text to 1-indexed
/// line/column pairs, matching the `file:line:col` diagnostic prefix of
/// spec.md §7.
#[derive(Debug, Clone)]
pub struct LineMap {
    line_starts: Vec<u32>,
}

impl LineMap {
    #[must_use]
    pub fn build(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(u32::try_from(i + 1).unwrap_or(u32::MAX));
            }
        }
        Self { line_starts }
    }

    #[must_use]
    pub fn offset_to_position(&self, offset: u32) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_point) => insert_point.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        Position {
            line: u32::try_from(line).unwrap_or(u32::MAX) + 1,
            column: offset.saturating_sub(line_start) + 1,
        }
    }

    #[must_use]
    pub fn line_start(&self, line_zero_indexed: usize) -> Option<u32> {
        self.line_starts.get(line_zero_indexed).copied()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_line_and_column() {
        let map = LineMap::build("abc\ndef\nghi");
        assert_eq!(map.offset_to_position(0), Position { line: 1, column: 1 });
        assert_eq!(map.offset_to_position(4), Position { line: 2, column: 1 });
        assert_eq!(map.offset_to_position(9), Position { line: 3, column: 2 });
    }
}
