//! Language Adapter Framework
//!
//! Each language provides a parser and a set of rules that classify its
//! nodes for the tree builder. The core engine never sees language-specific
//! logic. Files with no adapter yield no context.

pub mod cpp;
pub mod framework;
pub mod grammar;
pub mod javascript;
pub mod lua;
pub mod python;

pub use framework::{
    default_registry, AdapterRegistry, Language, LanguageAdapter, ParseError, SyntaxRef, SyntaxTree,
};
