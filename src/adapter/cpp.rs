//! C and C++ language adapter
//!
//! Both languages go through the C++ grammar, which accepts nearly all C.
//! Member functions are named `Class::method`; inside a class body the
//! short names of sibling members resolve to them.

use super::framework::{Language, LanguageAdapter, ParseError, SyntaxRef, SyntaxTree};
use super::grammar::parse_tree;
use crate::builder::{
    AssignSpec, BlockSpec, CallSpec, ClassMember, ClassSpec, Construct, DeclarationSpec, FunctionSpec,
    LanguageRules, LocalSpec, ParamSpec,
};
use crate::scope::NamePath;
use crate::symbol::ItemKind;

const SEPARATOR: &str = "::";

pub struct CppAdapter {
    rules: CppRules,
}

impl CppAdapter {
    pub fn new() -> Self {
        Self {
            rules: CppRules,
        }
    }
}

impl Default for CppAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for CppAdapter {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn file_extensions(&self) -> &[&str] {
        &["c", "cc", "cpp", "cxx", "h", "hh", "hpp"]
    }

    fn parse(&self, source: &str, tolerate_errors: bool) -> Result<SyntaxTree, ParseError> {
        parse_tree(Language::Cpp, source, tolerate_errors)
    }

    fn rules(&self) -> &dyn LanguageRules {
        &self.rules
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CppRules;

fn path_of(node: SyntaxRef<'_>, source: &str) -> Option<NamePath> {
    let mut fields = Vec::new();
    let mut node = node;
    let mut path = loop {
        match node.kind() {
            "identifier" | "this" | "type_identifier" => break NamePath::simple(node.text(source)),
            "qualified_identifier" => break NamePath::parse(node.text(source)),
            "field_expression" => {
                fields.push(node.field("field")?.text(source));
                node = node.field("argument")?;
            }
            "template_function" => node = node.field("name")?,
            _ => return None,
        }
    };
    for field in fields.into_iter().rev() {
        path.push(SEPARATOR, field);
    }
    Some(path)
}

/// Strip pointer, reference and parenthesized wrappers down to the
/// declarator that carries the name.
fn core_declarator(mut node: SyntaxRef<'_>) -> SyntaxRef<'_> {
    loop {
        let inner = match node.kind() {
            "pointer_declarator" | "parenthesized_declarator" | "attributed_declarator" | "array_declarator"
            | "init_declarator" => node.field("declarator"),
            "reference_declarator" => node.children().into_iter().next(),
            _ => None,
        };
        match inner {
            Some(inner) => node = inner,
            None => return node,
        }
    }
}

/// Function declarator below `node`, if it declares a function.
fn function_declarator(node: SyntaxRef<'_>) -> Option<SyntaxRef<'_>> {
    let core = core_declarator(node);
    (core.kind() == "function_declarator").then_some(core)
}

/// Written name of a declarator: `f`, `Stack::push`, `~Stack`.
fn declarator_name(node: SyntaxRef<'_>, source: &str) -> Option<String> {
    let core = core_declarator(node);
    let named = if core.kind() == "function_declarator" {
        core_declarator(core.field("declarator")?)
    } else {
        core
    };
    match named.kind() {
        "identifier" | "field_identifier" | "type_identifier" | "qualified_identifier" | "destructor_name"
        | "operator_name" => Some(named.text(source).to_string()),
        _ => None,
    }
}

fn parameters<'t>(declarator: SyntaxRef<'t>, source: &str) -> Vec<ParamSpec<'t>> {
    let Some(list) = declarator.field("parameters") else {
        return Vec::new();
    };
    list.children()
        .into_iter()
        .filter_map(|param| {
            let name = declarator_name(param.field("declarator")?, source)?;
            Some(ParamSpec {
                name,
                default: param.field("default_value"),
            })
        })
        .collect()
}

fn body_of<'t>(spec: &mut FunctionSpec<'t>, node: SyntaxRef<'t>) {
    if let Some(body) = node.field("body") {
        spec.body_start = Some(body.start());
        spec.body = if body.kind() == "compound_statement" {
            body.children()
        } else {
            vec![body]
        };
    }
}

fn function_definition<'t>(node: SyntaxRef<'t>, source: &str) -> Option<FunctionSpec<'t>> {
    let declarator = function_declarator(node.field("declarator")?)?;
    let written = declarator_name(declarator, source)?;
    let name = NamePath::parse(&written);

    let mut spec = FunctionSpec::named(name, false, ItemKind::Function);
    if let Some((owner, _)) = written.rsplit_once(SEPARATOR) {
        spec.kind = ItemKind::Method;
        spec.receiver = Some(("this", NamePath::parse(owner)));
    }
    spec.params = parameters(declarator, source);
    body_of(&mut spec, node);
    spec
        .extras
        .extend(node.field("type").filter(|t| t.kind() != "primitive_type"));
    Some(spec)
}

fn class_members<'t>(body: Option<SyntaxRef<'t>>, source: &str) -> Vec<ClassMember<'t>> {
    let Some(body) = body else {
        return Vec::new();
    };
    let mut members = Vec::new();
    for child in body.children() {
        match child.kind() {
            "function_definition" => {
                let name = child
                    .field("declarator")
                    .and_then(function_declarator)
                    .and_then(|d| declarator_name(d, source));
                match name {
                    Some(name) => members.push(ClassMember::Method { name, node: child }),
                    None => members.push(ClassMember::Other(child)),
                }
            }
            "field_declaration" => {
                let declarators = child.fields("declarator");
                if declarators.is_empty() {
                    members.push(ClassMember::Other(child));
                }
                for declarator in declarators {
                    let Some(name) = declarator_name(declarator, source) else {
                        continue;
                    };
                    if function_declarator(declarator).is_some() {
                        members.push(ClassMember::Prototype { name, node: child });
                    } else {
                        members.push(ClassMember::Field {
                            name,
                            node: child,
                            value: child.field("default_value"),
                        });
                    }
                }
            }
            "access_specifier" | "comment" => {}
            _ => members.push(ClassMember::Other(child)),
        }
    }
    members
}

impl LanguageRules for CppRules {
    fn classify<'t>(&self, node: SyntaxRef<'t>, source: &str) -> Construct<'t> {
        match node.kind() {
            "function_definition" => match function_definition(node, source) {
                Some(spec) => Construct::Function(spec),
                None => Construct::Other,
            },
            "lambda_expression" => {
                let mut spec = FunctionSpec::anonymous(ItemKind::Lambda);
                if let Some(declarator) = node.field("declarator") {
                    spec.params = parameters(declarator, source);
                }
                body_of(&mut spec, node);
                Construct::Function(spec)
            }
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                let (Some(name), Some(body)) = (node.field("name"), node.field("body")) else {
                    return Construct::Skip;
                };
                Construct::Class(ClassSpec {
                    name: name.text(source).to_string(),
                    bases: node.child_of_kind("base_class_clause").into_iter().collect(),
                    members: class_members(Some(body), source),
                })
            }
            "declaration" => {
                let declarators = node.fields("declarator");
                if let Some(prototype) = declarators.iter().copied().find_map(function_declarator) {
                    return match declarator_name(prototype, source) {
                        Some(name) => Construct::Declaration(DeclarationSpec {
                            name: NamePath::parse(&name),
                            kind: ItemKind::Declaration,
                            prototype: true,
                            exprs: Vec::new(),
                        }),
                        None => Construct::Skip,
                    };
                }
                let mut targets = Vec::new();
                let mut values = Vec::new();
                for declarator in declarators {
                    targets.extend(declarator_name(declarator, source));
                    values.extend(declarator.field("value"));
                }
                values.extend(node.field("type").filter(|t| t.kind() != "primitive_type"));
                Construct::Local(LocalSpec { targets, values })
            }
            "type_definition" => {
                let name = node
                    .fields("declarator")
                    .into_iter()
                    .find_map(|d| declarator_name(d, source));
                match name {
                    Some(name) => Construct::Declaration(DeclarationSpec {
                        name: NamePath::simple(name),
                        kind: ItemKind::Variable,
                        prototype: false,
                        exprs: node.field("type").into_iter().collect(),
                    }),
                    None => Construct::Other,
                }
            }
            "enum_specifier" => match (node.field("name"), node.field("body")) {
                (Some(name), Some(_)) => Construct::Declaration(DeclarationSpec {
                    name: NamePath::simple(name.text(source)),
                    kind: ItemKind::Class,
                    prototype: false,
                    exprs: Vec::new(),
                }),
                _ => Construct::Skip,
            },
            "preproc_def" | "preproc_function_def" => match node.field("name") {
                Some(name) => Construct::Declaration(DeclarationSpec {
                    name: NamePath::simple(name.text(source)),
                    kind: if node.kind() == "preproc_def" {
                        ItemKind::Variable
                    } else {
                        ItemKind::Function
                    },
                    prototype: false,
                    exprs: Vec::new(),
                }),
                None => Construct::Skip,
            },
            "assignment_expression" => {
                let values: Vec<SyntaxRef<'t>> = node.field("right").into_iter().collect();
                let Some(left) = node.field("left") else {
                    return Construct::Other;
                };
                match path_of(left, source) {
                    Some(path) => Construct::Assign(AssignSpec {
                        targets: vec![path],
                        values,
                        others: Vec::new(),
                    }),
                    None => Construct::Assign(AssignSpec {
                        targets: Vec::new(),
                        values,
                        others: vec![left],
                    }),
                }
            }
            "call_expression" => {
                let function = node.field("function");
                let callee = function.and_then(|f| path_of(f, source));
                Construct::Call(CallSpec {
                    callee_node: if callee.is_none() { function } else { None },
                    callee,
                    args: node.field("arguments").into_iter().collect(),
                })
            }
            "new_expression" => Construct::Call(CallSpec {
                callee: node.field("type").and_then(|t| path_of(t, source)),
                callee_node: None,
                args: node.field("arguments").into_iter().collect(),
            }),
            "field_expression" | "qualified_identifier" => match path_of(node, source) {
                Some(path) => Construct::Member(path),
                None => Construct::Walk(node.field("argument").into_iter().collect()),
            },
            "identifier" | "type_identifier" => Construct::Identifier(node.text(source).to_string()),
            "compound_statement" | "for_statement" => Construct::Block(BlockSpec::scope(node.children())),
            "for_range_loop" => Construct::Block(BlockSpec {
                scoped: true,
                bindings: node
                    .field("declarator")
                    .and_then(|d| declarator_name(d, source))
                    .into_iter()
                    .collect(),
                header: node.field("right").into_iter().collect(),
                body: node.field("body").into_iter().collect(),
            }),
            "namespace_definition" | "linkage_specification" => Construct::Walk(node.field("body").into_iter().collect()),
            "preproc_include" | "using_declaration" | "alias_declaration" | "namespace_alias_definition"
            | "field_identifier" | "namespace_identifier" | "primitive_type" | "string_literal" | "raw_string_literal"
            | "char_literal" | "number_literal" | "true" | "false" | "null" | "nullptr" | "this" | "comment"
            | "access_specifier" | "sized_type_specifier" | "auto" => Construct::Skip,
            _ => Construct::Other,
        }
    }

    fn member_separator(&self) -> &'static str {
        SEPARATOR
    }

    fn receiver(&self) -> Option<&'static str> {
        Some("this")
    }

    fn implicit_members(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SyntaxTree {
        CppAdapter::new().parse(source, false).unwrap()
    }

    #[test]
    fn test_out_of_line_method() {
        let source = "int *Stack::top(const Item &item, int n = 2) { return data; }\n";
        let tree = parse(source);
        match CppRules.classify(tree.root().children()[0], source) {
            Construct::Function(spec) => {
                assert_eq!(spec.name.unwrap().full(), "Stack::top");
                assert_eq!(spec.kind, ItemKind::Method);
                assert_eq!(spec.receiver.unwrap().1.full(), "Stack");
                let params: Vec<&str> = spec.params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(params, vec!["item", "n"]);
                assert!(spec.params[1].default.is_some());
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_prototype_and_variables() {
        let source = "int helper(int v);\nstatic int count = 0, limit = MAX;\n";
        let tree = parse(source);
        let nodes = tree.root().children();
        assert!(matches!(
            CppRules.classify(nodes[0], source),
            Construct::Declaration(DeclarationSpec { prototype: true, .. })
        ));
        match CppRules.classify(nodes[1], source) {
            Construct::Local(spec) => {
                assert_eq!(spec.targets, vec!["count", "limit"]);
                assert_eq!(spec.values.len(), 2);
            }
            other => panic!("expected local, got {:?}", other),
        }
    }

    #[test]
    fn test_class_members() {
        let source = "struct Point : Base {\n  int x, y;\n  int norm() const { return x * x; }\n  void reset();\n};\n";
        let tree = parse(source);
        let node = tree.root().child_of_kind("struct_specifier").unwrap();
        match CppRules.classify(node, source) {
            Construct::Class(spec) => {
                assert_eq!(spec.name, "Point");
                assert_eq!(spec.bases.len(), 1);
                let names: Vec<&str> = spec
                    .members
                    .iter()
                    .filter_map(|m| match m {
                        ClassMember::Field { name, .. } => Some(name.as_str()),
                        ClassMember::Method { name, .. } => Some(name.as_str()),
                        ClassMember::Prototype { name, .. } => Some(name.as_str()),
                        ClassMember::Other(_) => None,
                    })
                    .collect();
                assert_eq!(names, vec!["x", "y", "norm", "reset"]);
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_macros() {
        let source = "#define LIMIT 10\n#define MAX(a, b) ((a) > (b) ? (a) : (b))\n";
        let tree = parse(source);
        let kinds: Vec<ItemKind> = tree
            .root()
            .children()
            .into_iter()
            .filter_map(|n| match CppRules.classify(n, source) {
                Construct::Declaration(spec) => Some(spec.kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![ItemKind::Variable, ItemKind::Function]);
    }
}
