//! Compiled query cache.
//!
//! Each distinct query text is parsed and compiled once; the resulting
//! definition is shared by every execution and every live query over it.
//! Keys are the exact text, with no normalization.

use crate::ast::PathNode;
use crate::compiler::{Compiled, Compiler};
use crate::parser::{ParsedQuery, ParserPool};
use crate::sort::Comparator;
use hashbrown::HashMap;
use quiver_core::Result;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A compiled query.
pub struct QueryDefinition {
    pub filter: Compiled,
    pub select: Option<Compiled>,
    pub sort: Option<Comparator>,
    /// Sort matched items before projecting them
    pub sort_first: bool,
    /// Every path the query reads, in parse order
    pub paths: Vec<Rc<PathNode>>,
}

impl QueryDefinition {
    /// Compiles the pieces of a parsed query.
    pub fn compile(
        parsed: &ParsedQuery,
        paths: Vec<Rc<PathNode>>,
        compiler: &Compiler<'_>,
    ) -> Result<Self> {
        let filter = compiler.compile(&parsed.filter)?;
        let select = match &parsed.select {
            Some(node) => Some(compiler.compile(node)?),
            None => None,
        };
        let sort = compiler.compile_order(&parsed.order)?;
        Ok(Self {
            filter,
            select,
            sort,
            sort_first: parsed.sort_first,
            paths,
        })
    }
}

impl fmt::Debug for QueryDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDefinition")
            .field("filter", &self.filter)
            .field("select", &self.select)
            .field("sorted", &self.sort.is_some())
            .field("sort_first", &self.sort_first)
            .field("paths", &self.paths.len())
            .finish()
    }
}

/// Query text -> compiled definition.
pub struct QueryCache {
    parsers: ParserPool,
    entries: RefCell<HashMap<String, Rc<QueryDefinition>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl QueryCache {
    pub fn new(parsers: ParserPool) -> Self {
        Self {
            parsers,
            entries: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Returns the definition for `text`, parsing and compiling it on a miss.
    ///
    /// `compile` is handed the parsed query and its dependency paths. No
    /// borrow of the cache is held while the parser or `compile` run, and a
    /// failed compilation caches nothing.
    pub fn get_or_compile<F>(&self, text: &str, compile: F) -> Result<Rc<QueryDefinition>>
    where
        F: FnOnce(&ParsedQuery, Vec<Rc<PathNode>>) -> Result<QueryDefinition>,
    {
        let cached = self.entries.borrow().get(text).cloned();
        if let Some(definition) = cached {
            self.hits.set(self.hits.get() + 1);
            return Ok(definition);
        }
        self.misses.set(self.misses.get() + 1);

        let (parsed, paths) = self.parsers.parse(text)?;
        let definition = Rc::new(compile(&parsed, paths)?);
        tracing::debug!(
            query = text,
            paths = definition.paths.len(),
            folded = definition.filter.is_literal(),
            "compiled query"
        );

        self.entries
            .borrow_mut()
            .insert(text.to_string(), definition.clone());
        Ok(definition)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.borrow().contains_key(text)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    /// Returns the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits.get() + self.misses.get();
        if total == 0 {
            0.0
        } else {
            self.hits.get() as f64 / total as f64
        }
    }

    pub fn parsers(&self) -> &ParserPool {
        &self.parsers
    }

    /// Drops every cached definition and resets the counters.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        drop(entries);
        self.hits.set(0);
        self.misses.set(0);
    }
}
