//! JavaScript and TypeScript language adapter
//!
//! One set of rules serves both grammars; TypeScript only adds node kinds
//! (interfaces, type aliases, typed parameters) on top of JavaScript's.

use super::framework::{Language, LanguageAdapter, ParseError, SyntaxRef, SyntaxTree};
use super::grammar::parse_tree;
use crate::builder::{
    AssignSpec, BlockSpec, CallSpec, ClassMember, ClassSpec, Construct, DeclarationSpec, FunctionSpec,
    ImportBinding, ImportTarget, LanguageRules, LocalSpec, ParamSpec,
};
use crate::scope::NamePath;
use crate::symbol::ItemKind;

pub struct JavaScriptAdapter {
    language: Language,
    extensions: &'static [&'static str],
    rules: JavaScriptRules,
}

impl JavaScriptAdapter {
    pub fn javascript() -> Self {
        Self {
            language: Language::JavaScript,
            extensions: &["js", "jsx", "mjs", "cjs"],
            rules: JavaScriptRules,
        }
    }

    pub fn typescript() -> Self {
        Self {
            language: Language::TypeScript,
            extensions: &["ts", "mts", "cts"],
            rules: JavaScriptRules,
        }
    }

    pub fn tsx() -> Self {
        Self {
            language: Language::Tsx,
            extensions: &["tsx"],
            rules: JavaScriptRules,
        }
    }
}

impl LanguageAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        self.language
    }

    fn file_extensions(&self) -> &[&str] {
        self.extensions
    }

    fn parse(&self, source: &str, tolerate_errors: bool) -> Result<SyntaxTree, ParseError> {
        parse_tree(self.language, source, tolerate_errors)
    }

    fn rules(&self) -> &dyn LanguageRules {
        &self.rules
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptRules;

/// `a.b.c` as a name path. Chains are followed iteratively, so their
/// length is bounded only by the source.
fn path_of(node: SyntaxRef<'_>, source: &str) -> Option<NamePath> {
    let mut members = Vec::new();
    let mut node = node;
    while node.kind() == "member_expression" {
        members.push(node.field("property")?.text(source));
        node = node.field("object")?;
    }
    let mut path = match node.kind() {
        "identifier" | "this" => NamePath::simple(node.text(source)),
        _ => return None,
    };
    for member in members.into_iter().rev() {
        path.push(".", member);
    }
    Some(path)
}

/// Names bound by a destructuring pattern.
fn pattern_names(node: SyntaxRef<'_>, source: &str, out: &mut Vec<String>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => out.push(node.text(source).to_string()),
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            for child in node.children() {
                pattern_names(child, source, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.field("value") {
                pattern_names(value, source, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.field("left") {
                pattern_names(left, source, out);
            }
        }
        _ => {}
    }
}

fn parameters<'t>(node: SyntaxRef<'t>, source: &str) -> Vec<ParamSpec<'t>> {
    if let Some(single) = node.field("parameter") {
        return vec![ParamSpec::new(single.text(source))];
    }
    let Some(list) = node.field("parameters") else {
        return Vec::new();
    };

    let mut params = Vec::new();
    for child in list.children() {
        let (pattern, default) = match child.kind() {
            "assignment_pattern" => (child.field("left"), child.field("right")),
            "required_parameter" | "optional_parameter" => (child.field("pattern"), child.field("value")),
            _ => (Some(child), None),
        };
        let mut names = Vec::new();
        if let Some(pattern) = pattern {
            pattern_names(pattern, source, &mut names);
        }
        let mut names = names.into_iter();
        if let Some(first) = names.next() {
            params.push(ParamSpec { name: first, default });
        }
        params.extend(names.map(ParamSpec::new));
    }
    params
}

fn function_spec<'t>(node: SyntaxRef<'t>, source: &str, name: Option<NamePath>, kind: ItemKind) -> FunctionSpec<'t> {
    let mut spec = match name {
        Some(name) => FunctionSpec::named(name, true, kind),
        None => FunctionSpec::anonymous(kind),
    };
    spec.params = parameters(node, source);
    if let Some(body) = node.field("body") {
        spec.body_start = Some(body.start());
        spec.body = if body.kind() == "statement_block" {
            body.children()
        } else {
            vec![body]
        };
    }
    spec.extras = node.field("return_type").into_iter().collect();
    spec
}

fn class_members<'t>(body: Option<SyntaxRef<'t>>, source: &str) -> Vec<ClassMember<'t>> {
    let Some(body) = body else {
        return Vec::new();
    };
    let name_of = |node: SyntaxRef<'_>, field: &str| node.field(field).map(|n| n.text(source).to_string());

    body.children()
        .into_iter()
        .map(|child| match child.kind() {
            "method_definition" => match name_of(child, "name") {
                Some(name) => ClassMember::Method { name, node: child },
                None => ClassMember::Other(child),
            },
            "field_definition" | "public_field_definition" => {
                match name_of(child, "property").or_else(|| name_of(child, "name")) {
                    Some(name) => ClassMember::Field {
                        name,
                        node: child,
                        value: child.field("value"),
                    },
                    None => ClassMember::Other(child),
                }
            }
            "method_signature" | "abstract_method_signature" => match name_of(child, "name") {
                Some(name) => ClassMember::Prototype { name, node: child },
                None => ClassMember::Other(child),
            },
            _ => ClassMember::Other(child),
        })
        .collect()
}

/// `const x = require('m')` and `const { a, b } = require('m')`.
fn require_bindings(declarators: &[SyntaxRef<'_>], source: &str) -> Option<Vec<ImportBinding>> {
    let mut bindings = Vec::new();
    for declarator in declarators {
        let value = declarator.field("value")?;
        let is_require = value.kind() == "call_expression"
            && value.field("function").is_some_and(|f| f.text(source) == "require");
        if !is_require {
            return None;
        }
        let name = declarator.field("name")?;
        if name.kind() == "identifier" {
            bindings.push(ImportBinding {
                name: name.text(source).to_string(),
                target: ImportTarget::Module,
            });
        } else {
            let mut names = Vec::new();
            pattern_names(name, source, &mut names);
            bindings.extend(names.into_iter().map(|n| ImportBinding {
                target: ImportTarget::Symbol(n.clone()),
                name: n,
            }));
        }
    }
    Some(bindings)
}

fn import_bindings(node: SyntaxRef<'_>, source: &str) -> Vec<ImportBinding> {
    let Some(clause) = node.child_of_kind("import_clause") else {
        return Vec::new();
    };
    let mut bindings = Vec::new();
    for child in clause.children() {
        match child.kind() {
            "identifier" => {
                let name = child.text(source).to_string();
                bindings.push(ImportBinding {
                    target: ImportTarget::Symbol(name.clone()),
                    name,
                });
            }
            "namespace_import" => {
                if let Some(alias) = child.child_of_kind("identifier") {
                    bindings.push(ImportBinding {
                        name: alias.text(source).to_string(),
                        target: ImportTarget::Module,
                    });
                }
            }
            "named_imports" => {
                for specifier in child.children() {
                    let Some(name) = specifier.field("name") else {
                        continue;
                    };
                    let symbol = name.text(source).to_string();
                    let local = specifier
                        .field("alias")
                        .map(|a| a.text(source).to_string())
                        .unwrap_or_else(|| symbol.clone());
                    bindings.push(ImportBinding {
                        name: local,
                        target: ImportTarget::Symbol(symbol),
                    });
                }
            }
            _ => {}
        }
    }
    bindings
}

impl LanguageRules for JavaScriptRules {
    fn classify<'t>(&self, node: SyntaxRef<'t>, source: &str) -> Construct<'t> {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                let name = node.field("name").map(|n| NamePath::simple(n.text(source)));
                Construct::Function(function_spec(node, source, name, ItemKind::Function))
            }
            "function_expression" | "function" | "generator_function" | "arrow_function" => {
                Construct::Function(function_spec(node, source, None, ItemKind::Lambda))
            }
            "method_definition" => Construct::Function(function_spec(node, source, None, ItemKind::Method)),
            "class_declaration" | "abstract_class_declaration" | "class" => {
                let Some(name) = node.field("name") else {
                    return Construct::Other;
                };
                Construct::Class(ClassSpec {
                    name: name.text(source).to_string(),
                    bases: node.child_of_kind("class_heritage").into_iter().collect(),
                    members: class_members(node.field("body"), source),
                })
            }
            "lexical_declaration" | "variable_declaration" => {
                let declarators: Vec<SyntaxRef<'t>> = node
                    .children()
                    .into_iter()
                    .filter(|c| c.kind() == "variable_declarator")
                    .collect();
                if let Some(bindings) = require_bindings(&declarators, source) {
                    return Construct::Import(bindings);
                }
                let mut targets = Vec::new();
                let mut values = Vec::new();
                for declarator in &declarators {
                    if let Some(name) = declarator.field("name") {
                        pattern_names(name, source, &mut targets);
                    }
                    values.extend(declarator.field("value"));
                }
                Construct::Local(LocalSpec { targets, values })
            }
            "assignment_expression" | "augmented_assignment_expression" => {
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
            "call_expression" | "new_expression" => {
                let function = node.field("function").or_else(|| node.field("constructor"));
                let callee = function.and_then(|f| path_of(f, source));
                Construct::Call(CallSpec {
                    callee_node: if callee.is_none() { function } else { None },
                    callee,
                    args: node.field("arguments").into_iter().collect(),
                })
            }
            "member_expression" => match path_of(node, source) {
                Some(path) => Construct::Member(path),
                None => Construct::Walk(node.field("object").into_iter().collect()),
            },
            "identifier" | "type_identifier" | "shorthand_property_identifier" => {
                Construct::Identifier(node.text(source).to_string())
            }
            "statement_block" | "for_statement" | "class_static_block" => {
                Construct::Block(BlockSpec::scope(node.children()))
            }
            "for_in_statement" => {
                let mut bindings = Vec::new();
                if let Some(left) = node.field("left") {
                    pattern_names(left, source, &mut bindings);
                }
                Construct::Block(BlockSpec {
                    scoped: true,
                    bindings,
                    header: node.field("right").into_iter().collect(),
                    body: node.field("body").into_iter().collect(),
                })
            }
            "import_statement" => Construct::Import(import_bindings(node, source)),
            "interface_declaration" | "enum_declaration" | "type_alias_declaration" => {
                let Some(name) = node.field("name") else {
                    return Construct::Other;
                };
                let kind = if node.kind() == "type_alias_declaration" {
                    ItemKind::Variable
                } else {
                    ItemKind::Class
                };
                Construct::Declaration(DeclarationSpec {
                    name: NamePath::simple(name.text(source)),
                    kind,
                    prototype: false,
                    exprs: node.field("body").or_else(|| node.field("value")).into_iter().collect(),
                })
            }
            "function_signature" => match node.field("name") {
                Some(name) => Construct::Declaration(DeclarationSpec {
                    name: NamePath::simple(name.text(source)),
                    kind: ItemKind::Declaration,
                    prototype: true,
                    exprs: Vec::new(),
                }),
                None => Construct::Skip,
            },
            "property_identifier" | "private_property_identifier" | "shorthand_property_identifier_pattern"
            | "statement_identifier" | "string" | "number" | "regex" | "comment" | "true" | "false" | "null"
            | "undefined" | "this" | "super" | "predefined_type" | "hash_bang_line" | "jsx_text" => Construct::Skip,
            _ => Construct::Other,
        }
    }

    fn receiver(&self) -> Option<&'static str> {
        Some("this")
    }

    fn hoists_functions(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(adapter: &JavaScriptAdapter, source: &str) -> Vec<ImportBinding> {
        let tree = adapter.parse(source, false).unwrap();
        tree.root()
            .children()
            .into_iter()
            .flat_map(|n| match JavaScriptRules.classify(n, source) {
                Construct::Import(b) => b,
                _ => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_import_forms() {
        let source = "import def, { a, b as c } from './m';\nimport * as ns from 'lib';\nconst { x } = require('./x');\nconst fs = require('fs');\n";
        let names: Vec<(String, ImportTarget)> = first(&JavaScriptAdapter::javascript(), source)
            .into_iter()
            .map(|b| (b.name, b.target))
            .collect();
        assert_eq!(
            names,
            vec![
                ("def".to_string(), ImportTarget::Symbol("def".to_string())),
                ("a".to_string(), ImportTarget::Symbol("a".to_string())),
                ("c".to_string(), ImportTarget::Symbol("b".to_string())),
                ("ns".to_string(), ImportTarget::Module),
                ("x".to_string(), ImportTarget::Symbol("x".to_string())),
                ("fs".to_string(), ImportTarget::Module),
            ]
        );
    }

    #[test]
    fn test_arrow_parameters() {
        let source = "const f = (a, b = 2, { c }, ...rest) => a;\n";
        let adapter = JavaScriptAdapter::javascript();
        let tree = adapter.parse(source, false).unwrap();
        let declarator = tree.root().children()[0].children()[0];
        let arrow = declarator.field("value").unwrap();
        match JavaScriptRules.classify(arrow, source) {
            Construct::Function(spec) => {
                let names: Vec<&str> = spec.params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["a", "b", "c", "rest"]);
                assert!(spec.params[1].default.is_some());
                assert!(spec.name.is_none());
                assert_eq!(spec.body.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_class_members() {
        let source = "class Cart extends Base {\n  items = [];\n  add(item) { this.items.push(item); }\n}\n";
        let adapter = JavaScriptAdapter::javascript();
        let tree = adapter.parse(source, false).unwrap();
        match JavaScriptRules.classify(tree.root().children()[0], source) {
            Construct::Class(spec) => {
                assert_eq!(spec.name, "Cart");
                assert_eq!(spec.bases.len(), 1);
                assert!(matches!(&spec.members[0], ClassMember::Field { name, .. } if name == "items"));
                assert!(matches!(&spec.members[1], ClassMember::Method { name, .. } if name == "add"));
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_typescript_declarations() {
        let source = "interface Shape { area(): number }\ntype Id = string;\nfunction size(s: Shape): number { return s.area(); }\n";
        let adapter = JavaScriptAdapter::typescript();
        let tree = adapter.parse(source, false).unwrap();
        let kinds: Vec<&str> = tree
            .root()
            .children()
            .into_iter()
            .map(|n| match JavaScriptRules.classify(n, source) {
                Construct::Declaration(_) => "declaration",
                Construct::Function(_) => "function",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["declaration", "declaration", "function"]);
    }
}
