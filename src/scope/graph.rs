//! Scope arena for name binding
//!
//! Scopes live in a flat arena addressed by [`ScopeId`]; each record keeps
//! its parent as an index, so the chain can be walked without shared
//! ownership and the whole arena can be dropped in one go after a traversal.

use std::collections::HashMap;

/// Name of the root scope and prefix of every qualified name.
pub const GLOBAL: &str = "global";

/// Separator between scope levels in a qualified name.
pub const LEVEL_SEPARATOR: char = '>';

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// Create a root scope ID
    pub fn root() -> Self {
        Self(0)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// File level scope
    Module,
    /// Function, method or lambda body
    Function,
    /// Loop, conditional or explicit block
    Block,
}

/// One scope record.
#[derive(Debug, Clone)]
pub struct Scope {
    pub name: String,
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    /// `parent.full_name + ">" + name`; the root is `global`
    pub full_name: String,
    /// binding name -> qualified name
    bindings: HashMap<String, String>,
}

impl Scope {
    pub fn is_block_scope(&self) -> bool {
        self.kind == ScopeKind::Block
    }
}

/// Arena of scopes created during one traversal.
#[derive(Debug, Clone)]
pub struct ScopeGraph {
    scopes: Vec<Scope>,
}

impl Default for ScopeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeGraph {
    /// Create an arena holding only the root scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                name: GLOBAL.to_string(),
                parent: None,
                kind: ScopeKind::Module,
                full_name: GLOBAL.to_string(),
                bindings: HashMap::new(),
            }],
        }
    }

    /// Create a new child scope
    pub fn add_scope(&mut self, parent: ScopeId, name: impl Into<String>, kind: ScopeKind) -> ScopeId {
        let name = name.into();
        let full_name = qualify(&self.get(parent).full_name, &name);
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            name,
            parent: Some(parent),
            kind,
            full_name,
            bindings: HashMap::new(),
        });
        id
    }

    pub fn get(&self, scope: ScopeId) -> &Scope {
        &self.scopes[scope.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Get the parent of a scope
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.get(scope).parent
    }

    pub fn full_name(&self, scope: ScopeId) -> &str {
        &self.get(scope).full_name
    }

    /// Bind `name` in `scope` to an explicit qualified name.
    pub fn bind(&mut self, scope: ScopeId, name: impl Into<String>, qualified: impl Into<String>) {
        self.scopes[scope.index()]
            .bindings
            .insert(name.into(), qualified.into());
    }

    /// Look up a binding in a scope (not walking parents)
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&str> {
        self.get(scope).bindings.get(name).map(String::as_str)
    }

    /// Look up a binding walking up the scope chain
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&str> {
        self.scope_chain(scope)
            .into_iter()
            .find_map(|s| self.lookup_local(s, name))
    }

    /// Get scope chain from a scope up to root
    pub fn scope_chain(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut chain = vec![scope];
        let mut current = scope;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }
}

/// Join a scope's full name and a child level.
pub fn qualify(parent: &str, name: &str) -> String {
    format!("{}{}{}", parent, LEVEL_SEPARATOR, name)
}

/// Qualified name an unbound identifier falls back to.
pub fn global_name(name: &str) -> String {
    qualify(GLOBAL, name)
}
