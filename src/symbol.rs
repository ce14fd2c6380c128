//! Context items - the excerpts the resolver hands back
//!
//! Every definable unit found in a file (function, method, class, local,
//! assignment target, lambda, call site) is described by a [`ContextItem`]:
//! a kind tag, a qualified name, its literal source range and the text it covers.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind tag carried by every [`ContextItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Whole file (root of a context tree)
    Module,
    /// Free function or named function value
    Function,
    /// Function defined inside a class or struct body
    Method,
    /// Anonymous function, closure or lambda
    Lambda,
    /// Class, struct, interface or enum
    Class,
    /// Local declaration or assignment target
    Variable,
    /// Function parameter
    Parameter,
    /// Call site
    Call,
    /// Prototype or forward declaration without a body
    Declaration,
    /// A compacted run of source with no single owning definition
    Excerpt,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Module => "module",
            ItemKind::Function => "function",
            ItemKind::Method => "method",
            ItemKind::Lambda => "lambda",
            ItemKind::Class => "class",
            ItemKind::Variable => "variable",
            ItemKind::Parameter => "parameter",
            ItemKind::Call => "call",
            ItemKind::Declaration => "declaration",
            ItemKind::Excerpt => "excerpt",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Byte span `[start, end)` plus the 1-based lines it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl SourceRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// A resolved, literal source excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextItem {
    pub kind: ItemKind,
    /// Scope-chain qualified name, e.g. `global>outer>inner`
    pub qualified_name: String,
    pub text: String,
    pub range: SourceRange,
}

impl ContextItem {
    /// Cut an item for `start..end` out of `source`.
    pub fn from_source(
        kind: ItemKind,
        qualified_name: impl Into<String>,
        source: &str,
        lines: &LineIndex,
        start: usize,
        end: usize,
    ) -> Self {
        let (start, end) = snap_to_chars(source, start, end);
        Self {
            kind,
            qualified_name: qualified_name.into(),
            text: source[start..end].to_string(),
            range: lines.range(start, end),
        }
    }

    /// Key used downstream to drop duplicate excerpts: `path:startLine~endLine`.
    pub fn identity_key(&self, path: &Path) -> String {
        format!(
            "{}:{}~{}",
            path.display(),
            self.range.start_line,
            self.range.end_line
        )
    }
}

/// Line lookup over one file's content.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset at which each line starts
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            starts,
            len: source.len(),
        }
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        self.starts.partition_point(|&start| start <= offset)
    }

    /// Build a [`SourceRange`]; the end line is the line of the last covered byte.
    pub fn range(&self, start: usize, end: usize) -> SourceRange {
        let start_line = self.line_of(start);
        let end_line = if end > start {
            self.line_of(end - 1)
        } else {
            start_line
        };
        SourceRange {
            start,
            end,
            start_line,
            end_line,
        }
    }

    /// Byte offset of the start of a 1-based line, clamped to the content.
    pub fn line_start(&self, line: usize) -> usize {
        match line {
            0 => 0,
            n => self.starts.get(n - 1).copied().unwrap_or(self.len),
        }
    }

    /// Byte offset just past the end of a 1-based line (including its newline).
    pub fn line_end(&self, line: usize) -> usize {
        self.starts.get(line).copied().unwrap_or(self.len)
    }
}

/// Clamp a byte span to `source` and widen it onto char boundaries.
pub fn snap_to_chars(source: &str, start: usize, end: usize) -> (usize, usize) {
    let mut start = start.min(source.len());
    let mut end = end.min(source.len()).max(start);
    while !source.is_char_boundary(start) {
        start -= 1;
    }
    while !source.is_char_boundary(end) {
        end += 1;
    }
    (start, end)
}

/// Clamp a byte span to `source` and narrow it onto char boundaries.
pub fn shrink_to_chars(source: &str, start: usize, end: usize) -> (usize, usize) {
    let mut start = start.min(source.len());
    let mut end = end.min(source.len());
    while !source.is_char_boundary(start) {
        start += 1;
    }
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    (start, end.max(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_names_match_json() {
        for kind in [
            ItemKind::Module,
            ItemKind::Function,
            ItemKind::Method,
            ItemKind::Lambda,
            ItemKind::Class,
            ItemKind::Variable,
            ItemKind::Parameter,
            ItemKind::Call,
            ItemKind::Declaration,
            ItemKind::Excerpt,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
            let parsed: ItemKind = serde_json::from_str(&json).unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_line_index() {
        let source = "a = 1\nb = 2\n\nc = 3";
        let lines = LineIndex::new(source);
        assert_eq!(lines.line_of(0), 1);
        assert_eq!(lines.line_of(5), 1);
        assert_eq!(lines.line_of(6), 2);
        assert_eq!(lines.line_of(12), 3);
        assert_eq!(lines.line_of(source.len()), 4);
        assert_eq!(lines.line_start(2), 6);
        assert_eq!(lines.line_end(2), 12);
    }

    #[test]
    fn test_range_end_line_is_last_byte() {
        let source = "line one\nline two\n";
        let lines = LineIndex::new(source);
        // Span ending right after the first newline still belongs to line 1.
        let range = lines.range(0, 9);
        assert_eq!(range.start_line, 1);
        assert_eq!(range.end_line, 1);
        let range = lines.range(0, 10);
        assert_eq!(range.end_line, 2);
    }

    #[test]
    fn test_identity_key() {
        let source = "local x = 1\nlocal y = 2\n";
        let lines = LineIndex::new(source);
        let item = ContextItem::from_source(ItemKind::Variable, "global>y", source, &lines, 12, 23);
        assert_eq!(item.text, "local y = 2");
        assert_eq!(item.identity_key(Path::new("src/a.lua")), "src/a.lua:2~2");
    }

    #[test]
    fn test_snap_to_chars() {
        let source = "é = 1";
        assert_eq!(snap_to_chars(source, 1, 3), (0, 3));
        assert_eq!(snap_to_chars(source, 4, 100), (4, source.len()));
    }

    #[test]
    fn test_shrink_to_chars() {
        let source = "x = \"é\"";
        // 'é' occupies bytes 5 and 6.
        assert_eq!(shrink_to_chars(source, 6, 8), (7, 8));
        assert_eq!(shrink_to_chars(source, 0, 6), (0, 5));
        assert_eq!(shrink_to_chars(source, 6, 6), (7, 7));
        assert_eq!(shrink_to_chars(source, 2, 100), (2, source.len()));
    }
}
