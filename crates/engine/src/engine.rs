//! The engine: owns the change bus, the query cache and the extension table,
//! and hands out observable records, collections and query results.

use crate::config::EngineConfig;
use crate::live::{self, LiveQuery};
use quiver_core::{coerce, Collection, Error, FieldMap, Record, Result, Value};
use quiver_query::{
    execute, Compiler, EvalContext, ExtensionFn, ExtensionRegistry, ParserFactory, ParserPool,
    QueryCache, QueryDefinition, RegexCache,
};
use quiver_reactive::ChangeBus;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

struct EngineShared {
    config: EngineConfig,
    bus: Rc<ChangeBus>,
    cache: QueryCache,
    extensions: RefCell<ExtensionRegistry>,
    regexes: Rc<RegexCache>,
}

/// Counters describing an engine's caches and subscriptions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub cached_queries: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub idle_parsers: usize,
    pub cached_patterns: usize,
    pub listeners: usize,
    pub pending_refreshes: usize,
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    config: EngineConfig,
    parser: Option<ParserFactory>,
    extensions: Vec<(String, ExtensionFn)>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            parser: None,
            extensions: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the factory producing query parsers. Required.
    pub fn parser(mut self, factory: ParserFactory) -> Self {
        self.parser = Some(factory);
        self
    }

    /// Registers an extension function; it may shadow the built-in `select`.
    pub fn extension(mut self, name: &str, func: ExtensionFn) -> Self {
        self.extensions.push((name.to_string(), func));
        self
    }

    /// Builds the engine.
    ///
    /// Fails with [`Error::MissingCollaborator`] when no parser was supplied.
    pub fn build(self) -> Result<Engine> {
        let factory = self
            .parser
            .ok_or_else(|| Error::missing_collaborator("parser"))?;
        let config = self.config;
        let user_extensions = self.extensions;

        let shared = Rc::new_cyclic(|weak: &Weak<EngineShared>| {
            let mut extensions = ExtensionRegistry::new();
            extensions.register("select", select_extension(weak.clone()));
            extensions.register_all(user_extensions);
            EngineShared {
                config,
                bus: Rc::new(ChangeBus::new(config.max_notify_cycles)),
                cache: QueryCache::new(ParserPool::new(factory, config.parser_pool_capacity)),
                extensions: RefCell::new(extensions),
                regexes: Rc::new(RegexCache::new()),
            }
        });
        Ok(Engine { shared })
    }
}

/// `select(text, params...)`: a snapshot sub-query over the current source.
fn select_extension(engine: Weak<EngineShared>) -> ExtensionFn {
    Rc::new(move |ctx: &EvalContext<'_>, args: &[Value]| -> Result<Value> {
        let shared = engine
            .upgrade()
            .ok_or_else(|| Error::invalid_operation("select called after its engine was dropped"))?;
        let text = args.first().map(coerce::to_string).unwrap_or_default();
        let params = args.get(1..).unwrap_or_default();
        let results = Engine { shared }.query(ctx.source, &text, params)?;
        Ok(Value::from(results))
    })
}

/// A query engine instance.
///
/// Engines are independent: each has its own bus, object identities, query
/// cache and extension table. Cloning an `Engine` clones a handle.
#[derive(Clone)]
pub struct Engine {
    shared: Rc<EngineShared>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Returns the change bus records and collections of this engine publish to.
    pub fn bus(&self) -> &Rc<ChangeBus> {
        &self.shared.bus
    }

    /// Creates an observable record with a fixed set of fields.
    pub fn record(&self, fields: FieldMap) -> Record {
        let bus = &self.shared.bus;
        Record::new(bus.next_object_id(), fields, bus.sink())
    }

    /// Creates an observable collection.
    pub fn collection(&self, items: Vec<Value>) -> Collection {
        let bus = &self.shared.bus;
        Collection::new(bus.next_object_id(), items, bus.sink())
    }

    /// Registers an extension function, returning the one it replaces.
    ///
    /// Queries already compiled keep the function they resolved.
    pub fn register_extension(&self, name: &str, func: ExtensionFn) -> Option<ExtensionFn> {
        self.shared.extensions.borrow_mut().register(name, func)
    }

    pub fn register_extensions<I, S>(&self, functions: I)
    where
        I: IntoIterator<Item = (S, ExtensionFn)>,
        S: AsRef<str>,
    {
        let functions: Vec<(S, ExtensionFn)> = functions.into_iter().collect();
        self.shared.extensions.borrow_mut().register_all(functions);
    }

    /// Returns true if an extension is registered under `name`.
    pub fn has_extension(&self, name: &str) -> bool {
        self.shared.extensions.borrow().contains(name)
    }

    /// Runs `text` once over `source`.
    ///
    /// The result is a new collection that never updates.
    pub fn query(&self, source: &Collection, text: &str, params: &[Value]) -> Result<Collection> {
        let definition = self.definition(text)?;
        let ctx = EvalContext::new(source, params);
        let rows = execute(&definition, &source.to_vec(), &ctx)?;
        Ok(self.collection(rows))
    }

    /// Runs `text` over `source` and keeps the result up to date.
    ///
    /// The returned collection is refreshed in place after every batch that
    /// touches the source or a field the query reads. Dropping the last
    /// handle to it stops the updates.
    pub fn dynamic(&self, source: &Collection, text: &str, params: &[Value]) -> Result<Collection> {
        let definition = self.definition(text)?;
        let params: Rc<[Value]> = Rc::from(params);
        let result = self.collection(Vec::new());

        let live = LiveQuery::attach(
            &self.shared.bus,
            &result,
            source,
            definition.clone(),
            params.clone(),
        );
        result.retain(Rc::new(live));

        self.shared
            .bus
            .batch(|| live::refresh(&result, source, &definition, &params))??;
        Ok(result)
    }

    /// Wraps `items` in a new collection and runs a live query over it.
    pub fn from_values(&self, items: Vec<Value>, text: &str, params: &[Value]) -> Result<Collection> {
        let source = self.collection(items);
        self.dynamic(&source, text, params)
    }

    /// Runs `f` with notifications held, then delivers them as one batch.
    pub fn batch<T>(&self, f: impl FnOnce() -> T) -> Result<T> {
        self.shared.bus.batch(f)
    }

    pub fn stats(&self) -> EngineStats {
        let shared = &self.shared;
        EngineStats {
            cached_queries: shared.cache.len(),
            cache_hits: shared.cache.hits(),
            cache_misses: shared.cache.misses(),
            idle_parsers: shared.cache.parsers().idle_count(),
            cached_patterns: shared.regexes.len(),
            listeners: shared.bus.listener_count(),
            pending_refreshes: shared.bus.scheduler().dirty_count(),
        }
    }

    /// Returns the compiled definition of `text`, compiling it on first use.
    pub fn definition(&self, text: &str) -> Result<Rc<QueryDefinition>> {
        let shared = &self.shared;
        shared.cache.get_or_compile(text, |parsed, paths| {
            let extensions = shared.extensions.borrow();
            let compiler = Compiler::new(&extensions, shared.regexes.clone());
            QueryDefinition::compile(parsed, paths, &compiler)
        })
    }
}
