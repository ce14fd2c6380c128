//! Resolution across files: include handling and the request orchestrator.

pub mod include;
pub mod resolver;

pub use include::{extract_includes, IncludeResolver, IncludeSyntax};
pub use resolver::{ContextResolver, FileContext, IncludeEntry, ResolveRequest, ResolvedContext};
