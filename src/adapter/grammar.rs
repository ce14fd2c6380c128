//! Tree-sitter parsing shared by the grammar-backed adapters

use super::framework::{Language, ParseError, SyntaxTree};
use std::sync::OnceLock;
use tree_sitter::{Node, Parser};

/// Compiled tree-sitter grammar for `language`, built once per process.
/// `None` for languages parsed without tree-sitter.
pub fn grammar(language: Language) -> Option<&'static tree_sitter::Language> {
    static PYTHON: OnceLock<tree_sitter::Language> = OnceLock::new();
    static JAVASCRIPT: OnceLock<tree_sitter::Language> = OnceLock::new();
    static TYPESCRIPT: OnceLock<tree_sitter::Language> = OnceLock::new();
    static TSX: OnceLock<tree_sitter::Language> = OnceLock::new();
    static CPP: OnceLock<tree_sitter::Language> = OnceLock::new();

    let grammar = match language {
        Language::Lua => return None,
        Language::Python => PYTHON.get_or_init(|| tree_sitter_python::LANGUAGE.into()),
        Language::JavaScript => JAVASCRIPT.get_or_init(|| tree_sitter_javascript::LANGUAGE.into()),
        Language::TypeScript => TYPESCRIPT.get_or_init(|| tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        Language::Tsx => TSX.get_or_init(|| tree_sitter_typescript::LANGUAGE_TSX.into()),
        Language::Cpp => CPP.get_or_init(|| tree_sitter_cpp::LANGUAGE.into()),
    };
    Some(grammar)
}

/// Parse `source` with the grammar of `language`. Trees containing error or
/// missing nodes are rejected unless `tolerate_errors` is set.
pub fn parse_tree(language: Language, source: &str, tolerate_errors: bool) -> Result<SyntaxTree, ParseError> {
    let grammar = grammar(language)
        .ok_or_else(|| ParseError::new(language, "no tree-sitter grammar", source, 0))?;
    let mut parser = Parser::new();
    parser
        .set_language(grammar)
        .map_err(|e| ParseError::new(language, format!("failed to set language: {}", e), source, 0))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::new(language, "parser produced no tree", source, 0))?;

    let root = tree.root_node();
    if root.has_error() && !tolerate_errors {
        let (offset, message) = first_error(root).unwrap_or((0, "syntax error".to_string()));
        return Err(ParseError::new(language, message, source, offset));
    }
    Ok(SyntaxTree::Tree(tree))
}

/// Offset and description of the first error or missing node.
fn first_error(node: Node<'_>) -> Option<(usize, String)> {
    if node.is_missing() {
        return Some((node.start_byte(), format!("missing {}", node.kind())));
    }
    if node.is_error() {
        return Some((node.start_byte(), "unexpected input".to_string()));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_source() {
        let tree = parse_tree(Language::Python, "x = 1\n", false).unwrap();
        assert_eq!(tree.root().kind(), "module");
    }

    #[test]
    fn test_error_rejected_with_location() {
        let source = "x = 1\ndef broken(:\n    pass\n";
        let err = parse_tree(Language::Python, source, false).unwrap_err();
        assert_eq!(err.language, Language::Python);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_grammar_built_once() {
        let first = grammar(Language::Cpp).unwrap();
        let second = grammar(Language::Cpp).unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(grammar(Language::Lua).is_none());
    }

    #[test]
    fn test_error_tolerated() {
        let source = "x = 1\ndef broken(:\n    pass\n";
        assert!(parse_tree(Language::Python, source, true).is_ok());
    }
}
