//! Quiver Query - query compilation and execution.
//!
//! This crate turns query text into reusable compiled definitions:
//!
//! - `ast`: Expression AST produced by the parser
//! - `parser`: The parser boundary and parser pool
//! - `compiler`: AST to closure compilation with constant folding
//! - `path`: Path resolution over records, collections and arguments
//! - `sort`: Multi-key stable ordering
//! - `extension`: Named extension functions callable from queries
//! - `regex_cache`: Shared compiled patterns
//! - `cache`: Per-text definition cache
//! - `executor`: Filter, project and sort over a snapshot of items

pub mod ast;
pub mod cache;
pub mod compiler;
pub mod context;
pub mod executor;
pub mod extension;
pub mod parser;
pub mod path;
pub mod regex_cache;
pub mod sort;

pub use cache::{QueryCache, QueryDefinition};
pub use compiler::{Compiled, Compiler, Evaluator};
pub use context::EvalContext;
pub use executor::execute;
pub use extension::{ExtensionFn, ExtensionRegistry};
pub use parser::{ParsedQuery, ParserFactory, ParserPool, PathCollector, QueryParser};
pub use path::PathEvaluator;
pub use regex_cache::RegexCache;
pub use sort::Comparator;
