//! Unicode source stream and position tracking.
//!
//! The parser walks the source as a stream of Unicode code points rather
//! than bytes. Every AST node is annotated with the byte-range span it
//! consumed, carried as a plain field on the node rather than a side
//! table keyed by node identity — the parser always knows the span at
//! construction time, so there is nothing to look up later and nothing
//! that can dangle if the source string moves (see DESIGN.md).

/// A byte-range span into the original UTF-8 source text.
///
/// Invariant: `end >= start`, and both are valid byte offsets into the
/// source text, for every span produced anywhere in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(end >= start, "Span end ({}) < start ({})", end, start);
        Span { start, end }
    }

    /// Merge two spans into one covering both.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// A cursor over a source string's Unicode code points, tracking the
/// current byte offset so callers can record spans. Positions are plain
/// byte offsets, so the parser can save and restore them cheaply when a
/// grammar rule needs lookahead before committing.
#[derive(Clone)]
pub struct Cursor<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Cursor { source, pos: 0 }
    }

    /// Current byte offset (the offset of the next unconsumed character,
    /// or `source.len()` at end of input).
    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    pub fn peek_at(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn source(&self) -> &'a str {
        self.source
    }
}

/// Resolves byte offsets to 1-indexed (line, column) pairs for
/// diagnostics. Columns count Unicode scalar values, not bytes.
pub struct SourceMap<'a> {
    source: &'a str,
}

impl<'a> SourceMap<'a> {
    pub fn new(source: &'a str) -> Self {
        SourceMap { source }
    }

    /// Returns `(line, column, line_text)`, 1-indexed.
    pub fn locate(&self, byte_offset: usize) -> (usize, usize, &'a str) {
        let offset = byte_offset.min(self.source.len());
        let mut line = 1;
        let mut line_start = 0;
        for (i, c) in self.source.char_indices() {
            if i >= offset {
                break;
            }
            if c == '\n' {
                line += 1;
                line_start = i + 1;
            }
        }
        let line_end = self.source[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(self.source.len());
        let column = self.source[line_start..offset].chars().count() + 1;
        (line, column, &self.source[line_start..line_end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_walks_code_points() {
        let mut cursor = Cursor::new("aé汉");
        assert_eq!(cursor.advance(), Some('a'));
        assert_eq!(cursor.offset(), 1);
        assert_eq!(cursor.advance(), Some('é'));
        assert_eq!(cursor.offset(), 3);
        assert_eq!(cursor.advance(), Some('汉'));
        assert!(cursor.is_at_end());
    }

    #[test]
    fn source_map_locates_lines() {
        let src = "line one\nline two\nline three";
        let map = SourceMap::new(src);
        let (line, col, text) = map.locate(0);
        assert_eq!((line, col, text), (1, 1, "line one"));
        let offset_of_two = src.find("two").unwrap();
        let (line, col, text) = map.locate(offset_of_two);
        assert_eq!(line, 2);
        assert_eq!(text, "line two");
        assert_eq!(col, "line ".len() + 1);
    }

    #[test]
    fn span_merge() {
        let a = Span::new(2, 5);
        let b = Span::new(1, 3);
        assert_eq!(a.to(b), Span::new(1, 5));
    }
}
