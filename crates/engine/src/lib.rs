//! Quiver Engine - live queries over observable data.
//!
//! An [`Engine`] creates observable records and collections, compiles query
//! text through a caller-supplied parser, and runs queries either once
//! (`query`) or live (`dynamic`). A live result is an ordinary observable
//! collection that is recomputed in place after every notification batch
//! touching what the query reads, so live queries can be chained.
//!
//! # Example
//!
//! ```rust
//! use quiver_core::{FieldMap, Result, Value};
//! use quiver_engine::Engine;
//! use quiver_query::ast::{BinaryOp, Node, PathComponent, PathRoot};
//! use quiver_query::{ParsedQuery, ParserFactory, PathCollector, QueryParser};
//! use std::rc::Rc;
//!
//! /// Reads `field` and keeps items where it is above 2.
//! struct AboveTwo;
//!
//! impl QueryParser for AboveTwo {
//!     fn parse(&mut self, text: &str, paths: &mut PathCollector) -> Result<ParsedQuery> {
//!         let field = paths.path_node(PathRoot::Local, vec![PathComponent::Key(Value::from(text))]);
//!         Ok(ParsedQuery::all().with_filter(Node::binary(BinaryOp::Gt, field, Node::literal(2))))
//!     }
//! }
//!
//! let factory: ParserFactory = Rc::new(|| -> Box<dyn QueryParser> { Box::new(AboveTwo) });
//! let engine = Engine::builder().parser(factory).build().unwrap();
//!
//! let record = engine.record(FieldMap::from_pairs([("age", 1)]));
//! let people = engine.collection(vec![record.clone().into()]);
//! let adults = engine.dynamic(&people, "age", &[]).unwrap();
//! assert!(adults.is_empty());
//!
//! record.set("age", 30).unwrap();
//! assert_eq!(adults.len(), 1);
//! ```

pub mod config;
pub mod engine;
pub mod events;
mod live;

pub use config::{EngineConfig, DEFAULT_PARSER_POOL_CAPACITY};
pub use engine::{Engine, EngineBuilder, EngineStats};
pub use events::{CollectionEvent, ListenerHandle};
