//! Language adapter framework
//!
//! Each supported language provides a parser and a set of [`LanguageRules`]
//! that classify its nodes. Everything downstream of the parser talks to
//! syntax through [`SyntaxRef`], which only exposes the node kind, its
//! children, its named fields and its byte range.

use crate::builder::LanguageRules;
use std::ops::Range;
use std::path::Path;

use super::lua::ast::Node as LuaNode;

/// Languages with a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Lua,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Cpp,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Lua => "lua",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::Cpp => "cpp",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured parse failure. Never a panic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{language} syntax error at line {line}: {message}")]
pub struct ParseError {
    pub language: Language,
    pub message: String,
    /// Byte offset of the first offending token
    pub offset: usize,
    /// 1-based line of `offset`
    pub line: usize,
}

impl ParseError {
    pub fn new(language: Language, message: impl Into<String>, source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let line = source.as_bytes()[..offset]
            .iter()
            .filter(|b| **b == b'\n')
            .count()
            + 1;
        Self {
            language,
            message: message.into(),
            offset,
            line,
        }
    }
}

/// A parsed file.
pub enum SyntaxTree {
    Lua(LuaNode),
    Tree(tree_sitter::Tree),
}

impl SyntaxTree {
    pub fn root(&self) -> SyntaxRef<'_> {
        match self {
            SyntaxTree::Lua(chunk) => SyntaxRef::Lua(chunk),
            SyntaxTree::Tree(tree) => SyntaxRef::Tree(tree.root_node()),
        }
    }
}

impl std::fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyntaxTree::Lua(chunk) => f.debug_tuple("Lua").field(&chunk.kind).finish(),
            SyntaxTree::Tree(tree) => f.debug_tuple("Tree").field(&tree.root_node().kind()).finish(),
        }
    }
}

/// Borrowed handle on a node of either tree shape.
#[derive(Debug, Clone, Copy)]
pub enum SyntaxRef<'t> {
    Lua(&'t LuaNode),
    Tree(tree_sitter::Node<'t>),
}

impl<'t> SyntaxRef<'t> {
    pub fn kind(&self) -> &'static str {
        match self {
            SyntaxRef::Lua(node) => node.kind.as_str(),
            SyntaxRef::Tree(node) => node.kind(),
        }
    }

    /// Named children in document order.
    pub fn children(&self) -> Vec<SyntaxRef<'t>> {
        match self {
            SyntaxRef::Lua(node) => node.children.iter().map(|(_, c)| SyntaxRef::Lua(c)).collect(),
            SyntaxRef::Tree(node) => {
                let mut cursor = node.walk();
                node.named_children(&mut cursor).map(SyntaxRef::Tree).collect()
            }
        }
    }

    /// First child stored under `field`.
    pub fn field(&self, field: &str) -> Option<SyntaxRef<'t>> {
        match self {
            SyntaxRef::Lua(node) => node
                .children
                .iter()
                .find(|(f, _)| *f == field)
                .map(|(_, c)| SyntaxRef::Lua(c)),
            SyntaxRef::Tree(node) => node.child_by_field_name(field).map(SyntaxRef::Tree),
        }
    }

    /// Every child stored under `field`.
    pub fn fields(&self, field: &str) -> Vec<SyntaxRef<'t>> {
        match self {
            SyntaxRef::Lua(node) => node
                .children
                .iter()
                .filter(|(f, _)| *f == field)
                .map(|(_, c)| SyntaxRef::Lua(c))
                .collect(),
            SyntaxRef::Tree(node) => {
                let mut cursor = node.walk();
                node.children_by_field_name(field, &mut cursor)
                    .filter(|c| c.is_named())
                    .map(SyntaxRef::Tree)
                    .collect()
            }
        }
    }

    pub fn byte_range(&self) -> Range<usize> {
        match self {
            SyntaxRef::Lua(node) => node.start..node.end,
            SyntaxRef::Tree(node) => node.byte_range(),
        }
    }

    pub fn start(&self) -> usize {
        self.byte_range().start
    }

    pub fn end(&self) -> usize {
        self.byte_range().end
    }

    /// Source text covered by the node.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.byte_range()).unwrap_or("")
    }

    /// First child of the given kind.
    pub fn child_of_kind(&self, kind: &str) -> Option<SyntaxRef<'t>> {
        self.children().into_iter().find(|c| c.kind() == kind)
    }
}

/// Trait implemented by all language adapters
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Get the file extensions this adapter handles (without dot)
    fn file_extensions(&self) -> &[&str];

    /// Check if this adapter can handle a file
    fn can_handle(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.file_extensions()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Parse `source`. Grammar trees containing error nodes are rejected
    /// unless `tolerate_errors` is set.
    fn parse(&self, source: &str, tolerate_errors: bool) -> Result<SyntaxTree, ParseError>;

    /// Node classification used by the tree builder.
    fn rules(&self) -> &dyn LanguageRules;
}

/// Registry of language adapters
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter
    pub fn register(&mut self, adapter: impl LanguageAdapter + 'static) {
        self.adapters.push(Box::new(adapter));
    }

    /// Find an adapter for a file. `None` means the file yields no context.
    pub fn find_adapter(&self, path: &Path) -> Option<&dyn LanguageAdapter> {
        self.adapters
            .iter()
            .find(|a| a.can_handle(path))
            .map(|a| a.as_ref())
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.adapters.iter().map(|a| a.language()))
            .finish()
    }
}

/// Create a default registry with all built-in adapters
pub fn default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(super::lua::LuaAdapter::new());
    registry.register(super::python::PythonAdapter::new());
    registry.register(super::javascript::JavaScriptAdapter::javascript());
    registry.register(super::javascript::JavaScriptAdapter::typescript());
    registry.register(super::javascript::JavaScriptAdapter::tsx());
    registry.register(super::cpp::CppAdapter::new());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_by_extension() {
        let registry = default_registry();
        let lang = |p: &str| registry.find_adapter(Path::new(p)).map(|a| a.language());

        assert_eq!(lang("init.lua"), Some(Language::Lua));
        assert_eq!(lang("app/models.py"), Some(Language::Python));
        assert_eq!(lang("web/index.js"), Some(Language::JavaScript));
        assert_eq!(lang("web/main.ts"), Some(Language::TypeScript));
        assert_eq!(lang("web/App.tsx"), Some(Language::Tsx));
        assert_eq!(lang("src/stack.cpp"), Some(Language::Cpp));
        assert_eq!(lang("src/stack.h"), Some(Language::Cpp));
        assert_eq!(lang("src/util.C"), Some(Language::Cpp));
        assert_eq!(lang("README.md"), None);
        assert_eq!(lang("Makefile"), None);
    }

    #[test]
    fn test_parse_error_line() {
        let source = "local a = 1\nlocal = 2\n";
        let err = ParseError::new(Language::Lua, "unexpected '='", source, 18);
        assert_eq!(err.line, 2);
        assert_eq!(err.to_string(), "lua syntax error at line 2: unexpected '='");
    }

    #[test]
    fn test_syntax_ref_over_tree_sitter() {
        let registry = default_registry();
        let adapter = registry.find_adapter(Path::new("a.py")).unwrap();
        let source = "def f(x):\n    return x\n";
        let tree = adapter.parse(source, false).unwrap();
        let root = tree.root();
        assert_eq!(root.kind(), "module");

        let func = root.children()[0];
        assert_eq!(func.kind(), "function_definition");
        assert_eq!(func.field("name").map(|n| n.text(source)), Some("f"));
        assert_eq!(func.byte_range(), 0..source.len() - 1);
        assert!(func.field("nonexistent").is_none());
    }

    #[test]
    fn test_syntax_ref_over_lua() {
        let registry = default_registry();
        let adapter = registry.find_adapter(Path::new("a.lua")).unwrap();
        let source = "local function f(x) return x end";
        let tree = adapter.parse(source, false).unwrap();
        let root = tree.root();
        assert_eq!(root.kind(), "Chunk");

        let func = root.children()[0];
        assert_eq!(func.kind(), "LocalFunction");
        assert_eq!(func.field("identifier").map(|n| n.text(source)), Some("f"));
        assert_eq!(func.fields("parameters").len(), 1);
        assert_eq!(func.byte_range(), 0..source.len());
    }
}
