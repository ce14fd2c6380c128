//! Scope stack maintained during one traversal
//!
//! Resolution order for a name:
//! 1. Current scope
//! 2. Ancestor chain up to the root
//! 3. Fallback to `global>name`, so resolution never fails

use super::graph::{global_name, qualify, ScopeGraph, ScopeId, ScopeKind, GLOBAL};
use std::collections::HashMap;

/// A possibly dotted reference such as `M.helper` or `Stack::push`.
///
/// `head` is the first identifier; `suffix` is everything after it,
/// separator included, so `head + suffix` reproduces the written path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamePath {
    pub head: String,
    pub suffix: String,
}

impl NamePath {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            head: name.into(),
            suffix: String::new(),
        }
    }

    pub fn dotted(head: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            suffix: suffix.into(),
        }
    }

    /// Split a written path at the first `.`, `:` or `::`.
    pub fn parse(path: &str) -> Self {
        match path.find(['.', ':']) {
            Some(at) if at > 0 => Self::dotted(&path[..at], &path[at..]),
            _ => Self::simple(path),
        }
    }

    pub fn is_simple(&self) -> bool {
        self.suffix.is_empty()
    }

    pub fn full(&self) -> String {
        format!("{}{}", self.head, self.suffix)
    }

    /// Append one more member segment.
    pub fn push(&mut self, separator: &str, member: &str) {
        self.suffix.push_str(separator);
        self.suffix.push_str(member);
    }
}

impl std::fmt::Display for NamePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.head, self.suffix)
    }
}

/// Outcome of resolving a [`NamePath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub qualified: String,
    /// Qualified name of the head alone, when it differs from `qualified`
    pub head: Option<String>,
}

/// Stack of nested scopes for a single AST walk.
#[derive(Debug)]
pub struct ScopeTracker {
    graph: ScopeGraph,
    stack: Vec<ScopeId>,
    /// Scopes already created, per depth, keyed by (parent, name)
    memo: Vec<HashMap<(ScopeId, String), ScopeId>>,
}

impl Default for ScopeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self {
            graph: ScopeGraph::new(),
            stack: vec![ScopeId::root()],
            memo: Vec::new(),
        }
    }

    pub fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or_else(ScopeId::root)
    }

    pub fn current_name(&self) -> &str {
        self.graph.full_name(self.current())
    }

    /// Enter a child scope, reusing the one created earlier for the same
    /// depth, parent and name.
    pub fn enter(&mut self, name: &str, kind: ScopeKind) -> ScopeId {
        let parent = self.current();
        let depth = self.stack.len();
        if self.memo.len() < depth {
            self.memo.resize_with(depth, HashMap::new);
        }

        let key = (parent, name.to_string());
        let id = match self.memo[depth - 1].get(&key).copied() {
            Some(id) => id,
            None => {
                let id = self.graph.add_scope(parent, name, kind);
                self.memo[depth - 1].insert(key, id);
                id
            }
        };
        self.stack.push(id);
        id
    }

    /// Leave the current scope. The root is never popped.
    pub fn exit(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Qualified name `name` would get in the current scope.
    pub fn qualify(&self, name: &str) -> String {
        qualify(self.current_name(), name)
    }

    /// Bind `name` in the current scope and return its qualified name.
    pub fn bind(&mut self, name: &str) -> String {
        let qualified = self.qualify(name);
        self.graph.bind(self.current(), name, qualified.clone());
        qualified
    }

    /// Bind `name` in the current scope to an existing qualified name.
    pub fn bind_alias(&mut self, name: &str, qualified: impl Into<String>) {
        self.graph.bind(self.current(), name, qualified);
    }

    /// Bind `name` in the root scope.
    pub fn bind_global(&mut self, name: &str) -> String {
        let qualified = global_name(name);
        self.graph.bind(ScopeId::root(), name, qualified.clone());
        qualified
    }

    /// Bind `name` to the root itself, so `name.member` resolves to `global>member`.
    pub fn bind_module_alias(&mut self, name: &str) {
        self.graph.bind(self.current(), name, GLOBAL);
    }

    /// Nearest binding of `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.graph.lookup(self.current(), name)
    }

    /// Resolve `name`, falling back to `global>name`.
    pub fn resolve(&self, name: &str) -> String {
        self.lookup(name)
            .map(str::to_string)
            .unwrap_or_else(|| global_name(name))
    }

    /// Resolve a member path: an exact binding of the whole path wins,
    /// otherwise the head is resolved and the suffix appended.
    pub fn resolve_path(&self, path: &NamePath) -> ResolvedPath {
        if path.is_simple() {
            return ResolvedPath {
                qualified: self.resolve(&path.head),
                head: None,
            };
        }

        let full = path.full();
        if let Some(qualified) = self.lookup(&full) {
            return ResolvedPath {
                qualified: qualified.to_string(),
                head: None,
            };
        }

        let head = self.resolve(&path.head);
        let qualified = if head == GLOBAL {
            let member = path.suffix.trim_start_matches(['.', ':']);
            global_name(member)
        } else {
            format!("{}{}", head, path.suffix)
        };
        ResolvedPath {
            qualified,
            head: (head != GLOBAL).then_some(head),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_falls_back_to_global() {
        let mut tracker = ScopeTracker::new();
        tracker.enter("f", ScopeKind::Function);
        tracker.enter("4~20", ScopeKind::Block);
        assert_eq!(tracker.resolve("never_bound"), "global>never_bound");
    }

    #[test]
    fn test_nearest_binding_wins() {
        let mut tracker = ScopeTracker::new();
        assert_eq!(tracker.bind("x"), "global>x");
        tracker.enter("f", ScopeKind::Function);
        assert_eq!(tracker.resolve("x"), "global>x");
        assert_eq!(tracker.bind("x"), "global>f>x");
        assert_eq!(tracker.resolve("x"), "global>f>x");
        tracker.exit();
        assert_eq!(tracker.resolve("x"), "global>x");
    }

    #[test]
    fn test_exit_never_pops_root() {
        let mut tracker = ScopeTracker::new();
        tracker.exit();
        tracker.exit();
        assert_eq!(tracker.current(), ScopeId::root());
        assert_eq!(tracker.current_name(), "global");
    }

    #[test]
    fn test_enter_is_memoized() {
        let mut tracker = ScopeTracker::new();
        let first = tracker.enter("f", ScopeKind::Function);
        tracker.bind("local");
        tracker.exit();

        let again = tracker.enter("f", ScopeKind::Function);
        assert_eq!(first, again);
        assert_eq!(tracker.resolve("local"), "global>f>local");
        tracker.exit();

        // Same name under a different parent is a different scope.
        tracker.enter("g", ScopeKind::Function);
        let nested = tracker.enter("f", ScopeKind::Function);
        assert_ne!(nested, first);
        assert_eq!(tracker.current_name(), "global>g>f");
    }

    #[test]
    fn test_resolve_path() {
        let mut tracker = ScopeTracker::new();
        tracker.bind("M");
        tracker.enter("run", ScopeKind::Function);

        let path = NamePath::parse("M.helper");
        assert_eq!(path.head, "M");
        assert_eq!(path.suffix, ".helper");
        let resolved = tracker.resolve_path(&path);
        assert_eq!(resolved.qualified, "global>M.helper");
        assert_eq!(resolved.head.as_deref(), Some("global>M"));

        tracker.bind_alias("self", "global>Widget");
        let resolved = tracker.resolve_path(&NamePath::parse("self.draw"));
        assert_eq!(resolved.qualified, "global>Widget.draw");

        tracker.bind_alias("Widget.draw", "global>Widget.draw");
        let resolved = tracker.resolve_path(&NamePath::parse("Widget.draw"));
        assert_eq!(resolved.qualified, "global>Widget.draw");
        assert_eq!(resolved.head, None);
    }

    #[test]
    fn test_module_alias() {
        let mut tracker = ScopeTracker::new();
        tracker.bind_module_alias("os");
        let resolved = tracker.resolve_path(&NamePath::parse("os.path"));
        assert_eq!(resolved.qualified, "global>path");
        assert_eq!(resolved.head, None);

        let resolved = tracker.resolve_path(&NamePath::parse("std::vector"));
        assert_eq!(resolved.qualified, "global>std::vector");
    }
}
