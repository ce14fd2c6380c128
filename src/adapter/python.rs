//! Python language adapter

use super::framework::{Language, LanguageAdapter, ParseError, SyntaxRef, SyntaxTree};
use super::grammar::parse_tree;
use crate::builder::{
    AssignSpec, BlockSpec, CallSpec, ClassMember, ClassSpec, Construct, FunctionSpec, ImportBinding,
    ImportTarget, LanguageRules, LocalSpec, ParamSpec,
};
use crate::scope::NamePath;
use crate::symbol::ItemKind;

/// Python language adapter
pub struct PythonAdapter {
    rules: PythonRules,
}

impl PythonAdapter {
    pub fn new() -> Self {
        Self {
            rules: PythonRules,
        }
    }
}

impl Default for PythonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn file_extensions(&self) -> &[&str] {
        &["py", "pyi"]
    }

    fn parse(&self, source: &str, tolerate_errors: bool) -> Result<SyntaxTree, ParseError> {
        parse_tree(Language::Python, source, tolerate_errors)
    }

    fn rules(&self) -> &dyn LanguageRules {
        &self.rules
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonRules;

fn path_of(node: SyntaxRef<'_>, source: &str) -> Option<NamePath> {
    let mut attributes = Vec::new();
    let mut node = node;
    while node.kind() == "attribute" {
        attributes.push(node.field("attribute")?.text(source));
        node = node.field("object")?;
    }
    if node.kind() != "identifier" {
        return None;
    }
    let mut path = NamePath::simple(node.text(source));
    for attribute in attributes.into_iter().rev() {
        path.push(".", attribute);
    }
    Some(path)
}

/// Identifiers bound by an assignment or loop target.
fn target_names(node: SyntaxRef<'_>, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        "identifier" => out.push(node.text(source).to_string()),
        "pattern_list" | "tuple_pattern" | "list_pattern" | "list_splat_pattern" | "parenthesized_expression" => {
            for child in node.children() {
                target_names(child, source, out);
            }
        }
        _ => {}
    }
}

fn parameters<'t>(node: Option<SyntaxRef<'t>>, source: &str) -> Vec<ParamSpec<'t>> {
    let Some(node) = node else {
        return Vec::new();
    };
    let mut params = Vec::new();
    for child in node.children() {
        match child.kind() {
            "identifier" => params.push(ParamSpec::new(child.text(source))),
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = child.field("name") {
                    params.push(ParamSpec {
                        name: name.text(source).to_string(),
                        default: child.field("value"),
                    });
                }
            }
            "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                let name = child
                    .children()
                    .into_iter()
                    .find_map(|c| match c.kind() {
                        "identifier" => Some(c),
                        "list_splat_pattern" | "dictionary_splat_pattern" => c.child_of_kind("identifier"),
                        _ => None,
                    });
                if let Some(name) = name {
                    params.push(ParamSpec::new(name.text(source)));
                }
            }
            _ => {}
        }
    }
    params
}

/// Name defined by a function or decorated definition.
fn definition_name(node: SyntaxRef<'_>, source: &str) -> Option<String> {
    let node = if node.kind() == "decorated_definition" {
        node.field("definition")?
    } else {
        node
    };
    node.field("name").map(|n| n.text(source).to_string())
}

fn class_members<'t>(body: Option<SyntaxRef<'t>>, source: &str) -> Vec<ClassMember<'t>> {
    let Some(body) = body else {
        return Vec::new();
    };
    body.children()
        .into_iter()
        .map(|child| {
            let is_function = match child.kind() {
                "function_definition" => true,
                "decorated_definition" => child
                    .field("definition")
                    .is_some_and(|d| d.kind() == "function_definition"),
                _ => false,
            };
            if is_function {
                if let Some(name) = definition_name(child, source) {
                    return ClassMember::Method { name, node: child };
                }
            }

            if child.kind() == "expression_statement" {
                if let Some(assignment) = child.child_of_kind("assignment") {
                    if let Some(left) = assignment.field("left").filter(|l| l.kind() == "identifier") {
                        return ClassMember::Field {
                            name: left.text(source).to_string(),
                            node: child,
                            value: assignment.field("right"),
                        };
                    }
                }
            }
            ClassMember::Other(child)
        })
        .collect()
}

/// `a.b.c` imported as a whole binds `a`.
fn import_bindings(node: SyntaxRef<'_>, source: &str) -> Vec<ImportBinding> {
    node.fields("name")
        .into_iter()
        .filter_map(|name| {
            let (local, _) = imported_name(name, source)?;
            let head = local.split('.').next().unwrap_or(&local).to_string();
            Some(ImportBinding {
                name: head,
                target: ImportTarget::Module,
            })
        })
        .collect()
}

/// `from m import a, b as c` binds `a` and `c`.
fn from_import_bindings(node: SyntaxRef<'_>, source: &str) -> Vec<ImportBinding> {
    node.fields("name")
        .into_iter()
        .filter_map(|name| {
            let (local, symbol) = imported_name(name, source)?;
            Some(ImportBinding {
                name: local,
                target: ImportTarget::Symbol(symbol),
            })
        })
        .collect()
}

/// (bound name, imported symbol) of one import name.
fn imported_name(node: SyntaxRef<'_>, source: &str) -> Option<(String, String)> {
    match node.kind() {
        "dotted_name" => {
            let text = node.text(source).to_string();
            let symbol = text.rsplit('.').next().unwrap_or(&text).to_string();
            Some((text, symbol))
        }
        "aliased_import" => {
            let name = node.field("name")?.text(source);
            let alias = node.field("alias")?.text(source).to_string();
            let symbol = name.rsplit('.').next().unwrap_or(name).to_string();
            Some((alias, symbol))
        }
        _ => None,
    }
}

impl LanguageRules for PythonRules {
    fn classify<'t>(&self, node: SyntaxRef<'t>, source: &str) -> Construct<'t> {
        match node.kind() {
            "function_definition" => {
                let Some(name) = node.field("name") else {
                    return Construct::Other;
                };
                let mut spec = FunctionSpec::named(NamePath::simple(name.text(source)), true, ItemKind::Function);
                spec.params = parameters(node.field("parameters"), source);
                spec.body = match node.field("body") {
                    Some(body) if body.kind() == "block" => body.children(),
                    body => body.into_iter().collect(),
                };
                spec.body_start = node.field("body").map(|b| b.start());
                spec.extras = node.field("return_type").into_iter().collect();
                Construct::Function(spec)
            }
            "lambda" => {
                let mut spec = FunctionSpec::anonymous(ItemKind::Lambda);
                spec.params = parameters(node.field("parameters"), source);
                spec.body = node.field("body").into_iter().collect();
                spec.body_start = node.field("body").map(|b| b.start());
                Construct::Function(spec)
            }
            "decorated_definition" => {
                let Some(definition) = node.field("definition") else {
                    return Construct::Other;
                };
                let decorators: Vec<SyntaxRef<'t>> = node
                    .children()
                    .into_iter()
                    .filter(|c| c.kind() == "decorator")
                    .collect();
                match self.classify(definition, source) {
                    Construct::Function(mut spec) => {
                        spec.extras.extend(decorators);
                        Construct::Function(spec)
                    }
                    Construct::Class(mut spec) => {
                        spec.bases.extend(decorators);
                        Construct::Class(spec)
                    }
                    other => other,
                }
            }
            "class_definition" => {
                let Some(name) = node.field("name") else {
                    return Construct::Other;
                };
                Construct::Class(ClassSpec {
                    name: name.text(source).to_string(),
                    bases: node.field("superclasses").into_iter().collect(),
                    members: class_members(node.field("body"), source),
                })
            }
            "assignment" | "augmented_assignment" => {
                let Some(left) = node.field("left") else {
                    return Construct::Other;
                };
                let mut values: Vec<SyntaxRef<'t>> = node.field("right").into_iter().collect();
                values.extend(node.field("type"));

                if node.kind() == "assignment" {
                    let mut targets = Vec::new();
                    target_names(left, source, &mut targets);
                    if !targets.is_empty() {
                        return Construct::Local(LocalSpec { targets, values });
                    }
                }
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
            "call" => {
                let function = node.field("function");
                let callee = function.and_then(|f| path_of(f, source));
                Construct::Call(CallSpec {
                    callee_node: if callee.is_none() { function } else { None },
                    callee,
                    args: node.field("arguments").into_iter().collect(),
                })
            }
            "attribute" => match path_of(node, source) {
                Some(path) => Construct::Member(path),
                None => Construct::Walk(node.field("object").into_iter().collect()),
            },
            "identifier" => Construct::Identifier(node.text(source).to_string()),
            "keyword_argument" => Construct::Walk(node.field("value").into_iter().collect()),
            "for_statement" => {
                let mut bindings = Vec::new();
                if let Some(left) = node.field("left") {
                    target_names(left, source, &mut bindings);
                }
                let mut body: Vec<SyntaxRef<'t>> = node.field("body").into_iter().collect();
                body.extend(node.field("alternative"));
                Construct::Block(BlockSpec {
                    scoped: false,
                    bindings,
                    header: node.field("right").into_iter().collect(),
                    body,
                })
            }
            "list_comprehension" | "set_comprehension" | "dictionary_comprehension" | "generator_expression" => {
                let mut bindings = Vec::new();
                let mut header = Vec::new();
                let mut body: Vec<SyntaxRef<'t>> = node.field("body").into_iter().collect();
                for child in node.children() {
                    match child.kind() {
                        "for_in_clause" => {
                            if let Some(left) = child.field("left") {
                                target_names(left, source, &mut bindings);
                            }
                            header.extend(child.fields("right"));
                        }
                        "if_clause" => body.push(child),
                        _ => {}
                    }
                }
                Construct::Block(BlockSpec {
                    scoped: true,
                    bindings,
                    header,
                    body,
                })
            }
            "import_statement" => Construct::Import(import_bindings(node, source)),
            "import_from_statement" => Construct::Import(from_import_bindings(node, source)),
            "global_statement" | "nonlocal_statement" | "integer" | "float" | "true" | "false" | "none"
            | "comment" | "escape_sequence" | "string_content" => Construct::Skip,
            _ => Construct::Other,
        }
    }

    fn receiver(&self) -> Option<&'static str> {
        Some("self")
    }

    fn hoists_functions(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SyntaxTree {
        PythonAdapter::new().parse(source, false).unwrap()
    }

    #[test]
    fn test_function_parameters() {
        let source = "def f(a, b=1, *args, c: int = 2, **kw) -> T:\n    return a\n";
        let tree = parse(source);
        let node = tree.root().children()[0];
        match PythonRules.classify(node, source) {
            Construct::Function(spec) => {
                let names: Vec<&str> = spec.params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["a", "b", "args", "c", "kw"]);
                assert!(spec.params[1].default.is_some());
                assert_eq!(spec.extras.len(), 1);
                assert_eq!(spec.body_start, Some(source.find("return").unwrap()));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_imports() {
        let source = "import os.path\nimport numpy as np\nfrom .util import helper, other as o\n";
        let tree = parse(source);
        let bindings: Vec<ImportBinding> = tree
            .root()
            .children()
            .into_iter()
            .flat_map(|n| match PythonRules.classify(n, source) {
                Construct::Import(b) => b,
                _ => Vec::new(),
            })
            .collect();

        let pairs: Vec<(&str, &ImportTarget)> = bindings.iter().map(|b| (b.name.as_str(), &b.target)).collect();
        assert_eq!(
            pairs,
            vec![
                ("os", &ImportTarget::Module),
                ("np", &ImportTarget::Module),
                ("helper", &ImportTarget::Symbol("helper".to_string())),
                ("o", &ImportTarget::Symbol("other".to_string())),
            ]
        );
    }

    #[test]
    fn test_class_members() {
        let source = "@dataclass\nclass C(Base):\n    size = 3\n    @property\n    def area(self):\n        return 1\n";
        let tree = parse(source);
        let node = tree.root().children()[0];
        match PythonRules.classify(node, source) {
            Construct::Class(spec) => {
                assert_eq!(spec.name, "C");
                // superclasses plus the decorator
                assert_eq!(spec.bases.len(), 2);
                assert!(matches!(&spec.members[0], ClassMember::Field { name, .. } if name == "size"));
                assert!(matches!(&spec.members[1], ClassMember::Method { name, .. } if name == "area"));
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_tuple_assignment_targets() {
        let source = "a, (b, c) = f()\n";
        let tree = parse(source);
        let statement = tree.root().children()[0];
        let assignment = statement.children()[0];
        match PythonRules.classify(assignment, source) {
            Construct::Local(spec) => assert_eq!(spec.targets, vec!["a", "b", "c"]),
            other => panic!("expected local, got {:?}", other),
        }
    }
}
