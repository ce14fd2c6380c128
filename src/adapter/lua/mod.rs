//! Lua adapter
//!
//! Lua has no maintained tree-sitter grammar in our dependency set, so it
//! ships its own lexer and recursive-descent parser. The resulting tree uses
//! the node names of the common Lua AST conventions (`LocalStatement`,
//! `MemberExpression`, ...).

pub mod ast;
pub mod lexer;
pub mod parser;

use crate::adapter::framework::{Language, LanguageAdapter, ParseError, SyntaxRef, SyntaxTree};
use crate::builder::{
    AssignSpec, BlockSpec, CallSpec, Construct, FunctionSpec, LanguageRules, LocalSpec, ParamSpec,
};
use crate::scope::NamePath;
use crate::symbol::ItemKind;

pub struct LuaAdapter {
    rules: LuaRules,
}

impl LuaAdapter {
    pub fn new() -> Self {
        Self { rules: LuaRules }
    }
}

impl Default for LuaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for LuaAdapter {
    fn language(&self) -> Language {
        Language::Lua
    }

    fn file_extensions(&self) -> &[&str] {
        &["lua"]
    }

    fn parse(&self, source: &str, _tolerate_errors: bool) -> Result<SyntaxTree, ParseError> {
        parser::parse(source).map(SyntaxTree::Lua)
    }

    fn rules(&self) -> &dyn LanguageRules {
        &self.rules
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LuaRules;

/// `a`, `a.b.c` as a name path; anything else (calls, indexing) is not a path.
fn path_of(node: SyntaxRef<'_>, source: &str) -> Option<NamePath> {
    let mut members = Vec::new();
    let mut node = node;
    while node.kind() == "MemberExpression" {
        members.push(node.field("identifier")?.text(source));
        node = node.field("base")?;
    }
    if node.kind() != "Identifier" {
        return None;
    }
    let mut path = NamePath::simple(node.text(source));
    for member in members.into_iter().rev() {
        path.push(".", member);
    }
    Some(path)
}

fn function_spec<'t>(node: SyntaxRef<'t>, source: &str, name: Option<NamePath>, local: bool) -> FunctionSpec<'t> {
    let kind = if name.is_some() {
        ItemKind::Function
    } else {
        ItemKind::Lambda
    };
    let mut spec = match name {
        Some(name) => FunctionSpec::named(name, local, kind),
        None => FunctionSpec::anonymous(kind),
    };
    spec.params = node
        .fields("parameters")
        .into_iter()
        .filter(|p| p.kind() == "Identifier")
        .map(|p| ParamSpec::new(p.text(source)))
        .collect();
    spec.body = node.fields("body");
    spec.body_start = spec.body.first().map(|b| b.start());
    spec
}

impl LanguageRules for LuaRules {
    fn classify<'t>(&self, node: SyntaxRef<'t>, source: &str) -> Construct<'t> {
        match node.kind() {
            "LocalStatement" => Construct::Local(LocalSpec {
                targets: node
                    .fields("variables")
                    .iter()
                    .map(|v| v.text(source).to_string())
                    .collect(),
                values: node.fields("init"),
            }),
            "AssignmentStatement" => {
                let mut targets = Vec::new();
                let mut others = Vec::new();
                for variable in node.fields("variables") {
                    match path_of(variable, source) {
                        Some(path) => targets.push(path),
                        None => others.push(variable),
                    }
                }
                Construct::Assign(AssignSpec {
                    targets,
                    values: node.fields("init"),
                    others,
                })
            }
            "CallExpression" => {
                let base = node.field("base");
                let callee = base.and_then(|b| path_of(b, source));
                Construct::Call(CallSpec {
                    callee_node: if callee.is_none() { base } else { None },
                    callee,
                    args: node.fields("arguments"),
                })
            }
            "FunctionDeclaration" => {
                let Some(identifier) = node.field("identifier") else {
                    return Construct::Other;
                };
                let name = path_of(identifier, source);
                let method = identifier.text(source).contains(':');
                let mut spec = function_spec(node, source, name, false);
                if method {
                    spec.kind = ItemKind::Method;
                    spec.receiver = identifier
                        .field("base")
                        .and_then(|b| path_of(b, source))
                        .map(|owner| ("self", owner));
                }
                Construct::Function(spec)
            }
            "LocalFunction" => {
                let name = node
                    .field("identifier")
                    .map(|i| NamePath::simple(i.text(source)));
                Construct::Function(function_spec(node, source, name, true))
            }
            "FunctionExpression" => Construct::Function(function_spec(node, source, None, false)),
            "Identifier" => Construct::Identifier(node.text(source).to_string()),
            "MemberExpression" => match path_of(node, source) {
                Some(path) => Construct::Member(path),
                None => Construct::Walk(node.field("base").into_iter().collect()),
            },
            "TableKeyString" => Construct::Walk(node.field("value").into_iter().collect()),
            "DoStatement" | "ElseClause" => Construct::Block(BlockSpec::scope(node.fields("body"))),
            "WhileStatement" | "IfClause" | "ElseifClause" => Construct::Block(BlockSpec {
                header: node.field("condition").into_iter().collect(),
                ..BlockSpec::scope(node.fields("body"))
            }),
            "RepeatStatement" => {
                // The condition sees locals of the loop body.
                let mut body = node.fields("body");
                body.extend(node.field("condition"));
                Construct::Block(BlockSpec::scope(body))
            }
            "ForNumericStatement" => Construct::Block(BlockSpec {
                scoped: true,
                bindings: node
                    .field("variable")
                    .map(|v| v.text(source).to_string())
                    .into_iter()
                    .collect(),
                header: ["start", "end", "step"]
                    .iter()
                    .filter_map(|f| node.field(f))
                    .collect(),
                body: node.fields("body"),
            }),
            "ForGenericStatement" => Construct::Block(BlockSpec {
                scoped: true,
                bindings: node
                    .fields("variables")
                    .iter()
                    .map(|v| v.text(source).to_string())
                    .collect(),
                header: node.fields("iterators"),
                body: node.fields("body"),
            }),
            "Property" | "StringLiteral" | "NumericLiteral" | "BooleanLiteral" | "NilLiteral"
            | "VarargLiteral" | "GotoStatement" | "LabelStatement" | "BreakStatement" => Construct::Skip,
            _ => Construct::Other,
        }
    }

    fn receiver(&self) -> Option<&'static str> {
        Some("self")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_statement<'t>(tree: &'t SyntaxTree) -> SyntaxRef<'t> {
        tree.root().children()[0]
    }

    #[test]
    fn test_method_declaration() {
        let source = "function a.b:c(x, ...) return x end";
        let tree = LuaAdapter::new().parse(source, false).unwrap();
        match LuaRules.classify(first_statement(&tree), source) {
            Construct::Function(spec) => {
                assert_eq!(spec.name.unwrap().full(), "a.b.c");
                assert_eq!(spec.kind, ItemKind::Method);
                let (receiver, owner) = spec.receiver.unwrap();
                assert_eq!(receiver, "self");
                assert_eq!(owner.full(), "a.b");
                let params: Vec<&str> = spec.params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(params, vec!["x"]);
                assert_eq!(spec.body_start, Some(source.find("return").unwrap()));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_targets() {
        let source = "M.x, t[k] = 1, 2";
        let tree = LuaAdapter::new().parse(source, false).unwrap();
        match LuaRules.classify(first_statement(&tree), source) {
            Construct::Assign(spec) => {
                assert_eq!(spec.targets, vec![NamePath::parse("M.x")]);
                assert_eq!(spec.others.len(), 1);
                assert_eq!(spec.values.len(), 2);
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_method_call_callee() {
        let source = "obj:send(msg)";
        let tree = LuaAdapter::new().parse(source, false).unwrap();
        let call = first_statement(&tree).field("expression").unwrap();
        match LuaRules.classify(call, source) {
            Construct::Call(spec) => {
                assert_eq!(spec.callee.unwrap().full(), "obj.send");
                assert_eq!(spec.args.len(), 1);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_generic_for_bindings() {
        let source = "for k, v in pairs(t) do print(k) end";
        let tree = LuaAdapter::new().parse(source, false).unwrap();
        match LuaRules.classify(first_statement(&tree), source) {
            Construct::Block(spec) => {
                assert!(spec.scoped);
                assert_eq!(spec.bindings, vec!["k", "v"]);
                assert_eq!(spec.header.len(), 1);
                assert_eq!(spec.body.len(), 1);
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_is_structured() {
        let err = LuaAdapter::new().parse("local = 1", false).unwrap_err();
        assert_eq!(err.language, Language::Lua);
        assert_eq!(err.line, 1);
    }
}
