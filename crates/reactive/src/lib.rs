//! Quiver Reactive - Change propagation for the Quiver query engine.
//!
//! Observable records and collections publish `ChangeEvent`s into a
//! `ChangeBus`. The bus coalesces events per `(target, key)`, dispatches them
//! to listeners in batches, and after each batch flushes the `Scheduler`,
//! which recomputes every result set marked dirty during that batch.
//!
//! # Core Concepts
//!
//! - `ChangeBus`: Listener routing, coalescing queue, batched dispatch with a
//!   bounded number of cycles
//! - `ListenerRegistry`: `(target, key)` listener table with wildcards
//! - `Scheduler`: Insertion-ordered, de-duplicated recompute jobs
//!
//! # Example
//!
//! ```rust
//! use quiver_core::{ChangeEvent, EventKey, FieldMap, Record};
//! use quiver_reactive::ChangeBus;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let bus = Rc::new(ChangeBus::default());
//! let record = Record::new(bus.next_object_id(), FieldMap::from_pairs([("age", 3)]), bus.sink());
//!
//! let hits = Rc::new(Cell::new(0));
//! let counter = hits.clone();
//! bus.subscribe(
//!     Some(record.id()),
//!     Some(EventKey::field("age")),
//!     Rc::new(move |_: &ChangeEvent| counter.set(counter.get() + 1)),
//! );
//!
//! record.set("age", 4).unwrap();
//! assert_eq!(hits.get(), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod bus;
pub mod listener;
pub mod scheduler;

pub use bus::{ChangeBus, DEFAULT_MAX_NOTIFY_CYCLES};
pub use listener::{Listener, ListenerKey, ListenerRegistry};
pub use scheduler::{Job, Scheduler};
