//! Quiver Core - Values and observable data model for the Quiver query engine.
//!
//! This crate provides the foundational types shared by every other layer:
//!
//! - `Value`: Runtime values (null, booleans, numbers, strings, plain arrays and
//!   objects, observable records and collections)
//! - `coerce`: Loose, type-coercing operators (`==`, `<`, `+`, truthiness, ...)
//! - `FieldMap`: Sorted key/value storage used by objects and records
//! - `Record` / `Collection`: Observable data with a stable identity that report
//!   mutations through a `ChangeSink`
//! - `Error`: Error types for compilation, evaluation and dispatch
//!
//! # Example
//!
//! ```rust
//! use quiver_core::{coerce, Collection, FieldMap, Record, Value};
//!
//! let record = Record::detached(1, FieldMap::from_pairs([("name", "a"), ("age", "3")]));
//! assert!(coerce::loose_eq(&record.get("age"), &Value::from(3)));
//!
//! let items = Collection::detached(2, vec![Value::Record(record)]);
//! assert_eq!(items.len(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod coerce;
mod error;
mod map;
mod observable;
mod types;
mod value;

pub use error::{Error, Result};
pub use map::FieldMap;
pub use observable::{ChangeEvent, ChangeSink, Collection, EventKey, ObjectId, Record, WeakCollection};
pub use types::ValueKind;
pub use value::Value;
