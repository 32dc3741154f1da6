//! Human-readable diagnostic rendering.
//!
//! The core never formats a diagnostic itself — it returns structured
//! `ParseError`/`CodegenError` values with a `Span`; only the CLI driver
//! renders them to text, so embedders can format errors however they
//! like.

use crate::source::{SourceMap, Span};

/// Renders `<file>:<line>:<col>: <message>` followed by the offending
/// source line and a caret under the column the span starts at.
pub fn render(file: &str, source: &str, span: Span, message: &str) -> String {
    let map = SourceMap::new(source);
    let (line, column, line_text) = map.locate(span.start);
    let caret_padding = " ".repeat(column.saturating_sub(1));
    format!(
        "{}:{}:{}: {}\n{}\n{}^",
        file, line, column, message, line_text, caret_padding
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_file_line_col_and_caret() {
        let source = "func f() -> i32 {\n    return x;\n}";
        let offset = source.find('x').unwrap();
        let rendered = render("t.gl", source, Span::new(offset, offset + 1), "unknown identifier 'x'");
        let mut lines = rendered.lines();
        assert_eq!(lines.next().unwrap(), "t.gl:2:12: unknown identifier 'x'");
        assert_eq!(lines.next().unwrap(), "    return x;");
        assert_eq!(lines.next().unwrap(), "           ^");
    }
}
