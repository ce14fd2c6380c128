//! Tree builder
//!
//! One walk over a parsed file produces up to two outputs:
//! - an outline ([`ContextTreeNode`]) of every definition, statement and
//!   call site, nested by containment, used to map a span to definitions,
//!   plus every name read with its location
//! - a [`FileIndex`] mapping qualified names to excerpts and to the names
//!   they reference
//!
//! References are recorded in two tiers. A definition `Q` depends on the
//! data it reads and on `callee-declare` for every call it makes, while
//! `Q-declare` depends on the data only. Following a call therefore pulls in
//! the callee and what it reads, but not the callee's own callees.

mod construct;

pub use construct::*;

use crate::adapter::{SyntaxRef, SyntaxTree};
use crate::graph::{declare_name, FileIndex};
use crate::scope::{global_name, NamePath, ScopeKind, ScopeTracker, GLOBAL};
use crate::symbol::{ContextItem, ItemKind, LineIndex};
use crate::tree::{ContextTreeNode, TreeAssembler};
use std::collections::BTreeSet;

/// Nesting beyond this is not walked.
const MAX_DEPTH: usize = 512;

/// Which outputs a walk produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Outline only
    Outline,
    /// Definition map and dependency graph only
    Dependencies,
    Full,
}

impl BuildMode {
    fn outline(self) -> bool {
        matches!(self, BuildMode::Outline | BuildMode::Full)
    }

    fn dependencies(self) -> bool {
        matches!(self, BuildMode::Dependencies | BuildMode::Full)
    }
}

/// A name read at `start..end`, resolved to its qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameUse {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// Result of one walk.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub outline: Option<ContextTreeNode>,
    /// Filled alongside the outline
    pub uses: Vec<NameUse>,
    pub index: FileIndex,
}

impl FileAnalysis {
    /// Qualified names read inside `[start, end)`, in source order.
    pub fn uses_within(&self, start: usize, end: usize) -> impl Iterator<Item = &str> {
        self.uses
            .iter()
            .filter(move |u| start <= u.start && u.end <= end)
            .map(|u| u.name.as_str())
    }
}

/// Walk `tree` and build what `mode` asks for.
pub fn analyze(tree: &SyntaxTree, source: &str, rules: &dyn LanguageRules, mode: BuildMode) -> FileAnalysis {
    let mut walker = Walker::new(source, rules, mode);
    walker.walk(tree.root());
    walker.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    /// Needed by both `Q` and `Q-declare`
    Data,
    /// Needed by `Q` only
    Call,
}

/// Pending references of one open definition or statement.
#[derive(Debug)]
struct Collector {
    names: Vec<String>,
    declare: Option<String>,
    /// Scope whose locals are not dependencies
    scope: Option<String>,
    /// References stop propagating outward here
    boundary: bool,
    data: BTreeSet<String>,
    calls: BTreeSet<String>,
}

impl Collector {
    fn statement(names: Vec<String>) -> Self {
        Self {
            names,
            declare: None,
            scope: None,
            boundary: false,
            data: BTreeSet::new(),
            calls: BTreeSet::new(),
        }
    }

    fn definition(name: &str, scope: Option<String>) -> Self {
        Self {
            names: vec![name.to_string()],
            declare: Some(declare_name(name)),
            scope,
            boundary: true,
            data: BTreeSet::new(),
            calls: BTreeSet::new(),
        }
    }

    fn is_internal(&self, target: &str) -> bool {
        if self.names.iter().any(|n| n == target) {
            return true;
        }
        match &self.scope {
            Some(scope) => target
                .strip_prefix(scope.as_str())
                .is_some_and(|rest| rest.starts_with('>')),
            None => false,
        }
    }
}

/// Where and under which name a function gets defined.
#[derive(Debug)]
struct Site {
    qualified: String,
    /// Scope name entered for the body
    scope: String,
    start: usize,
    end: usize,
    kind: ItemKind,
    receiver: Option<(&'static str, String)>,
    /// Sibling members visible by their short name
    members: Vec<(String, String)>,
}

impl Site {
    fn new(qualified: String, scope: String, node: SyntaxRef<'_>, kind: ItemKind) -> Self {
        Self {
            qualified,
            scope,
            start: node.start(),
            end: node.end(),
            kind,
            receiver: None,
            members: Vec::new(),
        }
    }
}

struct Walker<'s, 'r> {
    source: &'s str,
    lines: LineIndex,
    rules: &'r dyn LanguageRules,
    mode: BuildMode,
    scopes: ScopeTracker,
    outline: Option<TreeAssembler>,
    uses: Vec<NameUse>,
    index: FileIndex,
    collectors: Vec<Collector>,
    depth: usize,
}

impl<'s, 'r> Walker<'s, 'r> {
    fn new(source: &'s str, rules: &'r dyn LanguageRules, mode: BuildMode) -> Self {
        let lines = LineIndex::new(source);
        let outline = mode.outline().then(|| {
            TreeAssembler::new(ContextItem::from_source(
                ItemKind::Module,
                GLOBAL,
                source,
                &lines,
                0,
                source.len(),
            ))
        });
        Self {
            source,
            lines,
            rules,
            mode,
            scopes: ScopeTracker::new(),
            outline,
            uses: Vec::new(),
            index: FileIndex::new(),
            collectors: Vec::new(),
            depth: 0,
        }
    }

    fn finish(self) -> FileAnalysis {
        FileAnalysis {
            outline: self.outline.map(TreeAssembler::finish),
            uses: self.uses,
            index: self.index,
        }
    }

    fn walk(&mut self, node: SyntaxRef<'_>) {
        if self.depth >= MAX_DEPTH {
            tracing::debug!(kind = node.kind(), offset = node.start(), "nesting too deep, skipping");
            return;
        }
        self.depth += 1;

        match self.rules.classify(node, self.source) {
            Construct::Function(spec) => self.function(node, spec, None),
            Construct::Class(spec) => self.class(node, spec),
            Construct::Declaration(spec) => self.declaration(node, spec),
            Construct::Local(spec) => self.local(node, spec),
            Construct::Assign(spec) => self.assign(node, spec),
            Construct::Call(spec) => self.call(node, spec),
            Construct::Identifier(name) => self.reference(node, &NamePath::simple(name)),
            Construct::Member(path) => self.reference(node, &path),
            Construct::Block(spec) => self.block(node, spec),
            Construct::Import(bindings) => self.import(bindings),
            Construct::Walk(nodes) => self.walk_all(&nodes),
            Construct::Skip => {}
            Construct::Other => self.walk_all(&node.children()),
        }

        self.depth -= 1;
    }

    fn walk_all(&mut self, nodes: &[SyntaxRef<'_>]) {
        for node in nodes {
            self.walk(*node);
        }
    }

    // -- recording ------------------------------------------------------

    fn item(&self, kind: ItemKind, name: &str, start: usize, end: usize) -> ContextItem {
        ContextItem::from_source(kind, name, self.source, &self.lines, start, end)
    }

    fn define(&mut self, name: &str, item: ContextItem) {
        if self.mode.dependencies() {
            self.index.definitions.define(name, item);
        }
    }

    fn open(&mut self, item: ContextItem) {
        if let Some(outline) = self.outline.as_mut() {
            outline.open(item);
        }
    }

    fn close(&mut self) {
        if let Some(outline) = self.outline.as_mut() {
            outline.close();
        }
    }

    /// Add a reference to every open collector up to the innermost definition.
    fn record(&mut self, target: String, tier: Tier) {
        self.record_with(target, tier, true);
    }

    /// Full edge from the enclosing definition to a nested one.
    fn record_nested(&mut self, target: &str) {
        self.record_with(target.to_string(), Tier::Call, false);
    }

    fn record_with(&mut self, target: String, tier: Tier, skip_internal: bool) {
        if !self.mode.dependencies() {
            return;
        }
        for collector in self.collectors.iter_mut().rev() {
            if !(skip_internal && collector.is_internal(&target)) {
                match tier {
                    Tier::Data => collector.data.insert(target.clone()),
                    Tier::Call => collector.calls.insert(target.clone()),
                };
            }
            if collector.boundary {
                break;
            }
        }
    }

    fn pop_collector(&mut self) {
        let Some(collector) = self.collectors.pop() else {
            return;
        };
        if !self.mode.dependencies() {
            return;
        }
        let graph = &mut self.index.dependencies;
        for name in &collector.names {
            graph.add_edges(name, collector.data.iter().chain(collector.calls.iter()).cloned());
        }
        if let Some(declare) = &collector.declare {
            graph.add_edges(declare, collector.data.iter().cloned());
        }
    }

    fn is_receiver(&self, name: &str) -> bool {
        self.rules.receiver() == Some(name)
    }

    // -- constructs -----------------------------------------------------

    fn reference(&mut self, node: SyntaxRef<'_>, path: &NamePath) {
        if path.is_simple() && self.is_receiver(&path.head) {
            return;
        }
        let resolved = self.scopes.resolve_path(path);
        let mut names = Vec::with_capacity(2);
        if let Some(head) = resolved.head {
            if !self.is_receiver(&path.head) {
                names.push(head);
            }
        }
        names.push(resolved.qualified);

        for name in names {
            if self.mode.outline() {
                self.uses.push(NameUse {
                    name: name.clone(),
                    start: node.start(),
                    end: node.end(),
                });
            }
            self.record(name, Tier::Data);
        }
    }

    fn function(&mut self, node: SyntaxRef<'_>, spec: FunctionSpec<'_>, site: Option<Site>) {
        self.walk_all(&spec.extras);
        let site = match site {
            Some(site) => site,
            None => self.function_site(node, &spec),
        };
        self.define_function(site, spec);
    }

    fn function_site(&mut self, node: SyntaxRef<'_>, spec: &FunctionSpec<'_>) -> Site {
        let (qualified, scope) = match &spec.name {
            None => {
                let scope = span_name(node.start(), node.end());
                (self.scopes.qualify(&scope), scope)
            }
            Some(path) if spec.local => {
                let scope = path.full();
                (self.scopes.bind(&scope), scope)
            }
            Some(path) if path.is_simple() => {
                let qualified = match self.scopes.lookup(&path.head) {
                    Some(bound) => bound.to_string(),
                    None => self.scopes.bind_global(&path.head),
                };
                (qualified, path.head.clone())
            }
            Some(path) => (self.scopes.resolve_path(path).qualified, path.full()),
        };

        let mut site = Site::new(qualified, scope, node, spec.kind);
        site.receiver = spec
            .receiver
            .as_ref()
            .map(|(name, target)| (*name, self.scopes.resolve_path(target).qualified));
        site
    }

    fn define_function(&mut self, site: Site, spec: FunctionSpec<'_>) {
        let body_start = spec.body_start.unwrap_or(site.end).clamp(site.start, site.end);
        let header_end = trim_end(self.source, site.start, body_start);

        if site.kind != ItemKind::Method {
            self.record_nested(&site.qualified);
        }
        let item = self.item(site.kind, &site.qualified, site.start, site.end);
        self.define(&site.qualified, item.clone());
        self.define(&declare_name(&site.qualified), item.clone());
        self.open(item);

        self.scopes.enter(&site.scope, ScopeKind::Function);
        let scope = self.scopes.current_name().to_string();
        self.collectors
            .push(Collector::definition(&site.qualified, Some(scope)));

        if let Some((name, target)) = &site.receiver {
            self.scopes.bind_alias(name, target.clone());
        }
        for (name, target) in &site.members {
            self.scopes.bind_alias(name, target.clone());
        }

        for param in spec.params {
            if site.receiver.as_ref().is_some_and(|(name, _)| *name == param.name) {
                continue;
            }
            let qualified = self.scopes.bind(&param.name);
            let item = self.item(ItemKind::Parameter, &qualified, site.start, header_end);
            self.define(&qualified, item);
            if let Some(default) = param.default {
                self.walk(default);
            }
        }
        if self.rules.hoists_functions() {
            self.hoist(&spec.body);
        }
        self.walk_all(&spec.body);

        self.scopes.exit();
        self.pop_collector();
        self.close();
    }

    /// Bind the functions declared directly in `body` before any of it is walked.
    fn hoist(&mut self, body: &[SyntaxRef<'_>]) {
        for node in body {
            if let Construct::Function(FunctionSpec {
                name: Some(name),
                local: true,
                ..
            }) = self.rules.classify(*node, self.source)
            {
                if name.is_simple() {
                    self.scopes.bind(&name.head);
                }
            }
        }
    }

    fn class(&mut self, node: SyntaxRef<'_>, spec: ClassSpec<'_>) {
        let qualified = self.scopes.bind(&spec.name);
        self.record_nested(&qualified);

        let item = self.item(ItemKind::Class, &qualified, node.start(), node.end());
        self.define(&qualified, item.clone());
        self.define(&declare_name(&qualified), item.clone());
        self.open(item);
        self.collectors.push(Collector::definition(&qualified, None));
        self.walk_all(&spec.bases);

        let separator = self.rules.member_separator();
        let member_name = |name: &str| format!("{}{}{}", qualified, separator, name);
        let scope_name = |name: &str| format!("{}{}{}", spec.name, separator, name);

        let visible: Vec<(String, String)> = if self.rules.implicit_members() {
            spec.members
                .iter()
                .filter_map(|member| match member {
                    ClassMember::Method { name, .. }
                    | ClassMember::Field { name, .. }
                    | ClassMember::Prototype { name, .. } => Some((name.clone(), member_name(name))),
                    ClassMember::Other(_) => None,
                })
                .collect()
        } else {
            Vec::new()
        };
        let receiver = self.rules.receiver().map(|r| (r, qualified.clone()));

        for member in spec.members {
            match member {
                ClassMember::Method { name, node } => match self.rules.classify(node, self.source) {
                    Construct::Function(fspec) => {
                        let mut site = Site::new(member_name(&name), scope_name(&name), node, ItemKind::Method);
                        site.receiver = receiver.clone();
                        site.members = visible.clone();
                        self.function(node, fspec, Some(site));
                    }
                    _ => self.walk(node),
                },
                ClassMember::Field { name, node, value } => {
                    let field = member_name(&name);
                    if let Some(value) = value {
                        if let Construct::Function(fspec) = self.rules.classify(value, self.source) {
                            if fspec.name.is_none() {
                                let mut site = Site::new(field, scope_name(&name), node, ItemKind::Method);
                                site.receiver = receiver.clone();
                                site.members = visible.clone();
                                self.function(value, fspec, Some(site));
                                continue;
                            }
                        }
                    }
                    let item = self.item(ItemKind::Variable, &field, node.start(), node.end());
                    self.define(&field, item.clone());
                    self.define(&declare_name(&field), item.clone());
                    self.open(item);
                    self.collectors.push(Collector::statement(vec![field]));
                    if let Some(value) = value {
                        self.walk(value);
                    }
                    self.pop_collector();
                    self.close();
                }
                ClassMember::Prototype { name, node } => {
                    let method = member_name(&name);
                    let item = self.item(ItemKind::Declaration, &method, node.start(), node.end());
                    self.define(&declare_name(&method), item.clone());
                    self.open(item);
                    self.close();
                }
                ClassMember::Other(node) => self.walk(node),
            }
        }

        self.pop_collector();
        self.close();
    }

    fn declaration(&mut self, node: SyntaxRef<'_>, spec: DeclarationSpec<'_>) {
        let qualified = if spec.name.is_simple() {
            self.scopes.bind(&spec.name.head)
        } else {
            self.scopes.resolve_path(&spec.name).qualified
        };
        let kind = if spec.prototype {
            ItemKind::Declaration
        } else {
            spec.kind
        };

        let item = self.item(kind, &qualified, node.start(), node.end());
        if !spec.prototype {
            self.define(&qualified, item.clone());
        }
        self.define(&declare_name(&qualified), item.clone());
        self.open(item);
        self.collectors.push(Collector::statement(vec![qualified]));
        self.walk_all(&spec.exprs);
        self.pop_collector();
        self.close();
    }

    fn local(&mut self, node: SyntaxRef<'_>, spec: LocalSpec<'_>) {
        if let ([target], [value]) = (spec.targets.as_slice(), spec.values.as_slice()) {
            if let Construct::Function(fspec) = self.rules.classify(*value, self.source) {
                if fspec.name.is_none() {
                    let qualified = self.scopes.bind(target);
                    let site = Site::new(qualified, target.clone(), node, ItemKind::Function);
                    self.function(*value, fspec, Some(site));
                    return;
                }
            }
        }

        let names: Vec<String> = spec.targets.iter().map(|t| self.scopes.qualify(t)).collect();
        self.statement(node, names, &[], &spec.values);
        for target in &spec.targets {
            self.scopes.bind(target);
        }
    }

    fn assign(&mut self, node: SyntaxRef<'_>, spec: AssignSpec<'_>) {
        let mut names = Vec::with_capacity(spec.targets.len());
        for path in &spec.targets {
            let name = if path.is_simple() {
                match self.scopes.lookup(&path.head) {
                    Some(bound) => bound.to_string(),
                    None => self.scopes.bind_global(&path.head),
                }
            } else {
                let resolved = self.scopes.resolve_path(path);
                if let Some(head) = resolved.head {
                    if !self.is_receiver(&path.head) {
                        self.record(head, Tier::Data);
                    }
                }
                resolved.qualified
            };
            names.push(name);
        }

        if let ([target], [value], [name]) = (spec.targets.as_slice(), spec.values.as_slice(), names.as_slice()) {
            if let Construct::Function(fspec) = self.rules.classify(*value, self.source) {
                if fspec.name.is_none() {
                    let site = Site::new(name.clone(), target.full(), node, ItemKind::Function);
                    self.function(*value, fspec, Some(site));
                    return;
                }
            }
        }

        self.statement(node, names, &spec.others, &spec.values);
    }

    /// One outline node and one collector shared by every target.
    fn statement(&mut self, node: SyntaxRef<'_>, names: Vec<String>, others: &[SyntaxRef<'_>], values: &[SyntaxRef<'_>]) {
        let Some(first) = names.first() else {
            self.walk_all(others);
            self.walk_all(values);
            return;
        };

        let outline_item = self.item(ItemKind::Variable, first, node.start(), node.end());
        for name in &names {
            let item = self.item(ItemKind::Variable, name, node.start(), node.end());
            self.define(name, item);
        }
        self.open(outline_item);
        self.collectors.push(Collector::statement(names));
        self.walk_all(others);
        self.walk_all(values);
        self.pop_collector();
        self.close();
    }

    fn call(&mut self, node: SyntaxRef<'_>, spec: CallSpec<'_>) {
        let site = self.scopes.qualify(&span_name(node.start(), node.end()));
        let item = self.item(ItemKind::Call, &site, node.start(), node.end());
        self.define(&site, item.clone());
        self.open(item);
        self.collectors.push(Collector::statement(vec![site]));

        match (spec.callee, spec.callee_node) {
            (Some(path), _) => {
                let resolved = self.scopes.resolve_path(&path);
                if let Some(head) = resolved.head {
                    if !self.is_receiver(&path.head) {
                        self.record(head, Tier::Data);
                    }
                }
                self.record(declare_name(&resolved.qualified), Tier::Call);
            }
            (None, Some(callee)) => self.walk(callee),
            (None, None) => {}
        }
        self.walk_all(&spec.args);

        self.pop_collector();
        self.close();
    }

    fn block(&mut self, node: SyntaxRef<'_>, spec: BlockSpec<'_>) {
        if spec.scoped {
            self.scopes.enter(&span_name(node.start(), node.end()), ScopeKind::Block);
        }

        if spec.bindings.is_empty() {
            self.walk_all(&spec.header);
        } else {
            let body_start = spec.body.first().map_or(node.end(), |b| b.start());
            let header_end = trim_end(self.source, node.start(), body_start.clamp(node.start(), node.end()));
            let names: Vec<String> = spec.bindings.iter().map(|b| self.scopes.qualify(b)).collect();

            for name in &names {
                let item = self.item(ItemKind::Variable, name, node.start(), header_end);
                self.define(name, item);
            }
            let outline_item = self.item(ItemKind::Variable, &names[0], node.start(), header_end);
            self.open(outline_item);
            self.collectors.push(Collector::statement(names));
            self.walk_all(&spec.header);
            self.pop_collector();
            self.close();

            for binding in &spec.bindings {
                self.scopes.bind(binding);
            }
        }
        self.walk_all(&spec.body);

        if spec.scoped {
            self.scopes.exit();
        }
    }

    fn import(&mut self, bindings: Vec<ImportBinding>) {
        for binding in bindings {
            match binding.target {
                ImportTarget::Symbol(symbol) => self.scopes.bind_alias(&binding.name, global_name(&symbol)),
                ImportTarget::Module => self.scopes.bind_module_alias(&binding.name),
            }
        }
    }
}

/// Scope name of an anonymous function, block or call site.
fn span_name(start: usize, end: usize) -> String {
    format!("{}~{}", start, end)
}

/// `end` moved back over trailing whitespace.
fn trim_end(source: &str, start: usize, end: usize) -> usize {
    match source.get(start..end) {
        Some(text) => start + text.trim_end().len(),
        None => end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{default_registry, AdapterRegistry};
    use std::path::Path;

    fn run(registry: &AdapterRegistry, file: &str, source: &str, mode: BuildMode) -> FileAnalysis {
        let adapter = registry.find_adapter(Path::new(file)).unwrap();
        let tree = adapter.parse(source, false).unwrap();
        analyze(&tree, source, adapter.rules(), mode)
    }

    fn deps(analysis: &FileAnalysis, name: &str) -> Vec<String> {
        analysis
            .index
            .dependencies
            .neighbors(name)
            .map(str::to_string)
            .collect()
    }

    fn text_of<'a>(analysis: &'a FileAnalysis, name: &str) -> &'a str {
        &analysis.index.definitions.get(name).unwrap().text
    }

    const LUA_CHAIN: &str = "local g = 1\n\nlocal function a()\n  return b()\nend\n\nfunction b()\n  return g\nend\n";

    #[test]
    fn test_two_tier_edges() {
        let registry = default_registry();
        let analysis = run(&registry, "m.lua", LUA_CHAIN, BuildMode::Dependencies);

        assert_eq!(deps(&analysis, "global>a"), vec!["global>b-declare"]);
        assert!(deps(&analysis, "global>a-declare").is_empty());
        assert_eq!(deps(&analysis, "global>b-declare"), vec!["global>g"]);

        assert_eq!(text_of(&analysis, "global>b-declare"), "function b()\n  return g\nend");
        assert_eq!(text_of(&analysis, "global>g"), "local g = 1");
        assert!(analysis.outline.is_none());
    }

    #[test]
    fn test_outline_nesting() {
        let registry = default_registry();
        let analysis = run(&registry, "m.lua", LUA_CHAIN, BuildMode::Outline);
        let outline = analysis.outline.unwrap();
        let walked: Vec<(usize, ItemKind, String)> = outline
            .walk()
            .into_iter()
            .map(|(d, i)| (d, i.kind, i.qualified_name.clone()))
            .collect();

        assert_eq!(walked.len(), 4);
        assert_eq!(walked[0], (0, ItemKind::Variable, "global>g".to_string()));
        assert_eq!(walked[1], (0, ItemKind::Function, "global>a".to_string()));
        assert_eq!(walked[2].0, 1);
        assert_eq!(walked[2].1, ItemKind::Call);
        assert!(walked[2].2.starts_with("global>a>"));
        assert_eq!(walked[3], (0, ItemKind::Function, "global>b".to_string()));
        assert!(analysis.index.definitions.is_empty());
    }

    #[test]
    fn test_locals_and_params_are_not_dependencies() {
        let registry = default_registry();
        let source = "local function f(p)\n  local x = p + limit\n  return x\nend\n";
        let analysis = run(&registry, "m.lua", source, BuildMode::Full);

        assert_eq!(deps(&analysis, "global>f"), vec!["global>limit"]);
        assert_eq!(deps(&analysis, "global>f>x"), vec!["global>f>p", "global>limit"]);
        assert_eq!(text_of(&analysis, "global>f>p"), "local function f(p)");
        assert_eq!(
            analysis.index.definitions.get("global>f>p").unwrap().kind,
            ItemKind::Parameter
        );
    }

    #[test]
    fn test_block_scopes_shadow() {
        let registry = default_registry();
        let source = "local x = 1\nlocal function f()\n  do\n    local x = 2\n    use(x)\n  end\n  return x\nend\n";
        let analysis = run(&registry, "m.lua", source, BuildMode::Dependencies);

        // The outer function reads the global x, the inner block its own x.
        let f = deps(&analysis, "global>f");
        assert!(f.contains(&"global>x".to_string()));
        assert!(f.contains(&"global>use-declare".to_string()));
        assert!(
            analysis
                .index
                .definitions
                .names()
                .iter()
                .any(|n| n.starts_with("global>f>") && n.ends_with(">x"))
        );
    }

    #[test]
    fn test_method_receiver_and_members() {
        let registry = default_registry();
        let source = "local M = {}\n\nfunction M.helper()\n  return 1\nend\n\nfunction M:run()\n  return self.helper() + M.count\nend\n";
        let analysis = run(&registry, "m.lua", source, BuildMode::Dependencies);

        let run_deps = deps(&analysis, "global>M.run");
        assert!(run_deps.contains(&"global>M.helper-declare".to_string()));
        assert!(run_deps.contains(&"global>M.count".to_string()));
        assert!(run_deps.contains(&"global>M".to_string()));
        assert!(analysis.index.definitions.contains("global>M.helper-declare"));
    }

    #[test]
    fn test_nested_closure_reached_from_enclosing() {
        let registry = default_registry();
        let source = "local function outer()\n  local inner = function()\n    return secret\n  end\n  return inner\nend\n";
        let analysis = run(&registry, "m.lua", source, BuildMode::Dependencies);

        assert!(deps(&analysis, "global>outer").contains(&"global>outer>inner".to_string()));
        assert!(!deps(&analysis, "global>outer-declare").contains(&"global>outer>inner".to_string()));
        assert_eq!(deps(&analysis, "global>outer>inner"), vec!["global>secret"]);
    }

    #[test]
    fn test_python_class_methods() {
        let registry = default_registry();
        let source = "from util import helper as h\n\nclass Stack(Base):\n    def push(self, x):\n        self.items.append(x)\n        return h(x)\n\n    def size(self):\n        return len(self.items)\n";
        let analysis = run(&registry, "s.py", source, BuildMode::Full);

        assert!(analysis.index.definitions.contains("global>Stack"));
        assert!(analysis.index.definitions.contains("global>Stack.push"));
        assert!(analysis.index.definitions.contains("global>Stack.push>x"));
        assert_eq!(deps(&analysis, "global>Stack"), vec!["global>Base"]);

        let push = deps(&analysis, "global>Stack.push");
        assert!(push.contains(&"global>helper-declare".to_string()));
        assert!(!push.iter().any(|d| d.contains("self")));
        assert!(deps(&analysis, "global>Stack.size").contains(&"global>Stack.items".to_string()));

        let outline = analysis.outline.unwrap();
        let methods: Vec<&str> = outline
            .walk()
            .into_iter()
            .filter(|(_, i)| i.kind == ItemKind::Method)
            .map(|(_, i)| i.qualified_name.as_str())
            .collect();
        assert_eq!(methods, vec!["global>Stack.push", "global>Stack.size"]);
    }

    #[test]
    fn test_javascript_arrow_binding() {
        let registry = default_registry();
        let source = "const base = 2;\nconst scale = (v) => v * base;\nfunction run() { return scale(3); }\n";
        let analysis = run(&registry, "a.js", source, BuildMode::Dependencies);

        assert_eq!(text_of(&analysis, "global>scale"), "const scale = (v) => v * base;");
        assert_eq!(deps(&analysis, "global>scale-declare"), vec!["global>base"]);
        assert_eq!(deps(&analysis, "global>run"), vec!["global>scale-declare"]);
    }

    #[test]
    fn test_cpp_prototype_replaced_by_body() {
        let registry = default_registry();
        let source = "int helper(int v);\n\nint run() { return helper(1); }\n\nint helper(int v) { return v * LIMIT; }\n";
        let analysis = run(&registry, "a.cpp", source, BuildMode::Dependencies);

        let declared = analysis.index.definitions.get("global>helper-declare").unwrap();
        assert_eq!(declared.kind, ItemKind::Function);
        assert!(declared.text.starts_with("int helper(int v) {"));
        assert_eq!(deps(&analysis, "global>run"), vec!["global>helper-declare"]);
        assert_eq!(deps(&analysis, "global>helper-declare"), vec!["global>LIMIT"]);
    }

    #[test]
    fn test_long_member_chains() {
        let registry = default_registry();
        let chain = std::iter::once("a".to_string())
            .chain((1..5000).map(|i| format!("m{}", i)))
            .collect::<Vec<_>>()
            .join(".");

        for (file, source) in [
            ("m.lua", format!("x = {}\n", chain)),
            ("m.py", format!("x = {}\n", chain)),
            ("m.js", format!("x = {};\n", chain)),
            ("m.cpp", format!("int x = {};\n", chain)),
        ] {
            let analysis = run(&registry, file, &source, BuildMode::Full);
            let x = deps(&analysis, "global>x");
            assert!(x.contains(&"global>a".to_string()), "{}", file);
            assert!(x.iter().any(|d| d.ends_with("m4999")), "{}", file);
            assert!(analysis.uses_within(0, source.len()).any(|u| u == "global>a"), "{}", file);
        }
    }

    #[test]
    fn test_uses_inside_a_statement() {
        let registry = default_registry();
        let source = "local g = 1\nlocal function f(p)\n  return g + p\nend\n";
        let analysis = run(&registry, "m.lua", source, BuildMode::Outline);

        let start = source.find("g + p").unwrap();
        let used: Vec<&str> = analysis.uses_within(start, start + "g + p".len()).collect();
        assert_eq!(used, vec!["global>g", "global>f>p"]);
        assert_eq!(analysis.uses_within(0, start).count(), 0);
    }

    #[test]
    fn test_nested_functions_are_hoisted() {
        let registry = default_registry();
        let js = "function run() {\n  return helper();\n  function helper() { return 1; }\n}\n";
        let analysis = run(&registry, "a.js", js, BuildMode::Dependencies);
        let run_deps = deps(&analysis, "global>run");
        assert!(run_deps.contains(&"global>run>helper".to_string()));
        assert!(!run_deps.contains(&"global>helper-declare".to_string()));
        assert!(analysis.index.definitions.contains("global>run>helper-declare"));

        let py = "def run():\n    def later():\n        return helper()\n    def helper():\n        return 1\n    return later()\n";
        let analysis = run(&registry, "a.py", py, BuildMode::Dependencies);
        assert!(deps(&analysis, "global>run>later").contains(&"global>run>helper-declare".to_string()));

        // Lua locals are only visible after their declaration.
        let lua = "local function run()\n  helper()\n  local function helper() end\nend\n";
        let analysis = run(&registry, "m.lua", lua, BuildMode::Dependencies);
        assert!(deps(&analysis, "global>run").contains(&"global>helper-declare".to_string()));
    }

    #[test]
    fn test_cpp_class_members() {
        let registry = default_registry();
        let source = "class Stack {\npublic:\n  void push(int v) { grow(); data[size++] = v; }\n  void grow();\nprivate:\n  int size;\n};\n\nvoid Stack::grow() { resize(size * 2); }\n";
        let analysis = run(&registry, "s.hpp", source, BuildMode::Dependencies);

        let push = deps(&analysis, "global>Stack::push");
        assert!(push.contains(&"global>Stack::grow-declare".to_string()));
        assert!(push.contains(&"global>Stack::size".to_string()));
        assert!(analysis.index.definitions.contains("global>Stack::size"));

        let grow = analysis.index.definitions.get("global>Stack::grow-declare").unwrap();
        assert_eq!(grow.kind, ItemKind::Method);
        assert!(grow.text.starts_with("void Stack::grow()"));
        assert!(deps(&analysis, "global>Stack::grow").contains(&"global>resize-declare".to_string()));
    }
}
