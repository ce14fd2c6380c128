//! # codectx - scope-aware code context resolution
//!
//! Given a file and a byte span, codectx finds the other source excerpts a
//! reader needs to understand that span: the definitions it depends on,
//! followed transitively through lexical scopes and across
//! `import`/`require`/`#include` boundaries up to a bounded depth.
//!
//! codectx provides:
//! - Language adapters behind one syntax capability (a bespoke Lua parser
//!   plus tree-sitter grammars for Python, JavaScript, TypeScript and C/C++)
//! - Scope tracking that turns identifiers into qualified names
//! - Per-file outlines, definition maps and two-tier dependency graphs
//! - An interval set that compacts marked definitions into excerpts
//! - Include resolution and a depth-bounded cross-file orchestrator

pub mod adapter;
pub mod builder;
pub mod config;
pub mod graph;
pub mod interval;
pub mod output;
pub mod query;
pub mod scope;
pub mod symbol;
pub mod tree;
pub mod ui;
pub mod workspace;

// Re-exports for convenient access
pub use adapter::{default_registry, AdapterRegistry, Language, ParseError};
pub use config::{load_config, ResolverConfig};
pub use interval::IntervalSet;
pub use query::{ContextResolver, ResolveRequest, ResolvedContext};
pub use symbol::{ContextItem, ItemKind, SourceRange};
pub use tree::ContextTreeNode;
pub use workspace::{DiskFiles, FileProvider, MemoryFiles, Workspace, WorkspaceProvider};

/// Result type alias for codectx operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for codectx operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}
