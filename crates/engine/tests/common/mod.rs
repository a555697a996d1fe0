//! Shared fixtures: a parser driven by per-text scripts.

#![allow(dead_code)]

use quiver_core::{coerce, Collection, Error, Result, Value};
use quiver_engine::{Engine, EngineConfig};
use quiver_query::ast::{Node, PathComponent, PathRoot};
use quiver_query::{ParsedQuery, ParserFactory, PathCollector, QueryParser};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type Script = Rc<dyn Fn(&mut PathCollector) -> ParsedQuery>;

/// Query text -> how to build it.
#[derive(Clone, Default)]
pub struct Scripts {
    scripts: Rc<RefCell<HashMap<String, Script>>>,
}

impl Scripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define<F>(&self, text: &str, build: F) -> &Self
    where
        F: Fn(&mut PathCollector) -> ParsedQuery + 'static,
    {
        self.scripts
            .borrow_mut()
            .insert(text.to_string(), Rc::new(build));
        self
    }

    pub fn factory(&self) -> ParserFactory {
        let scripts = self.scripts.clone();
        Rc::new(move || -> Box<dyn QueryParser> {
            Box::new(ScriptedParser {
                scripts: scripts.clone(),
            })
        })
    }
}

struct ScriptedParser {
    scripts: Rc<RefCell<HashMap<String, Script>>>,
}

impl QueryParser for ScriptedParser {
    fn parse(&mut self, text: &str, paths: &mut PathCollector) -> Result<ParsedQuery> {
        let script = self.scripts.borrow().get(text).cloned();
        match script {
            Some(build) => Ok(build(paths)),
            None => Err(Error::invalid_operation(format!("no script for '{}'", text))),
        }
    }
}

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn engine(scripts: &Scripts) -> Engine {
    engine_with(scripts, EngineConfig::default())
}

pub fn engine_with(scripts: &Scripts, config: EngineConfig) -> Engine {
    init_tracing();
    match Engine::builder().config(config).parser(scripts.factory()).build() {
        Ok(engine) => engine,
        Err(err) => panic!("engine failed to build: {}", err),
    }
}

/// `@a.b.c`
pub fn local(paths: &mut PathCollector, keys: &[&str]) -> Node {
    paths.path_node(PathRoot::Local, components(keys))
}

/// `%i.a.b`
pub fn arg(paths: &mut PathCollector, index: usize, keys: &[&str]) -> Node {
    paths.path_node(PathRoot::Arg(index), components(keys))
}

pub fn components(keys: &[&str]) -> Vec<PathComponent> {
    keys.iter()
        .map(|key| PathComponent::Key(Value::from(*key)))
        .collect()
}

/// String form of every item, or of field `name` when items are records.
pub fn strings(items: &Collection) -> Vec<String> {
    items
        .to_vec()
        .iter()
        .map(|item| match item.as_record() {
            Some(record) => coerce::to_string(&record.get("name")),
            None => coerce::to_string(item),
        })
        .collect()
}
