//! Byte-offset source spans and the line/column mapper (spec §4, "source mapper").

use serde::{Deserialize, Serialize};

/// A half-open byte range into the original query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }
}

/// Maps byte offsets into 1-based (line, column) pairs. Built once per
/// source text; line starts are found up front so lookups are a binary
/// search rather than a rescan.
#[derive(Debug, Clone)]
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based (line, column) for a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        (line_idx + 1, offset - line_start + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_offsets_across_lines() {
        let map = SourceMap::new("MATCH (n)\nRETURN n");
        assert_eq!(map.line_col(0), (1, 1));
        assert_eq!(map.line_col(10), (2, 1));
        assert_eq!(map.line_col(17), (2, 8));
    }
}
