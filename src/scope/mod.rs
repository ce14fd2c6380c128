//! Scope model - lexical scopes and qualified names
//!
//! Every identifier a traversal meets is resolved to a qualified name built
//! from the chain of enclosing scopes (`global>outer>inner>name`). Names that
//! are never bound fall back to `global>name`.

pub mod graph;
pub mod tracker;

pub use graph::{global_name, qualify, Scope, ScopeGraph, ScopeId, ScopeKind, GLOBAL};
pub use tracker::{NamePath, ResolvedPath, ScopeTracker};
