//! Live queries.
//!
//! A live query keeps its result collection up to date. Changes reach it
//! through three invalidation listeners that share one refresh job:
//!
//! - the source listener hears content changes of the source collection;
//! - the query listener hears changes to the arguments argument-rooted paths
//!   read (fields of a record argument, contents of a collection argument);
//! - the record listener hears changes to the fields record-relative paths
//!   read, on any record.
//!
//! A path with a computed key subscribes its target with a wildcard key. The
//! state lives exactly as long as the result collection.

use quiver_core::{ChangeEvent, Collection, EventKey, ObjectId, Result, Value, WeakCollection};
use quiver_query::ast::PathRoot;
use quiver_query::{execute, EvalContext, QueryDefinition};
use quiver_reactive::{ChangeBus, Job, Listener};
use std::rc::{Rc, Weak};

/// Re-runs `definition` over `source` and replaces the contents of `result`.
pub(crate) fn refresh(
    result: &Collection,
    source: &Collection,
    definition: &QueryDefinition,
    params: &[Value],
) -> Result<()> {
    let items = source.to_vec();
    let ctx = EvalContext::new(source, params);
    let rows = execute(definition, &items, &ctx)?;
    result.replace_all(rows)
}

/// Which invalidation listener a dependency is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    Source,
    Query,
    Record,
}

type Dependency = (Route, Option<ObjectId>, Option<EventKey>);

struct Subscription {
    target: Option<ObjectId>,
    key: Option<EventKey>,
    listener: Listener,
}

/// Subscriptions of a live query; retained by its result collection.
pub(crate) struct LiveQuery {
    bus: Weak<ChangeBus>,
    subscriptions: Vec<Subscription>,
}

impl LiveQuery {
    /// Subscribes a refresh of `result` to everything the query reads.
    pub(crate) fn attach(
        bus: &Rc<ChangeBus>,
        result: &Collection,
        source: &Collection,
        definition: Rc<QueryDefinition>,
        params: Rc<[Value]>,
    ) -> Self {
        let wanted = dependencies(source, &definition, &params);
        let arg_collections: Vec<ObjectId> = params
            .iter()
            .filter_map(|param| param.as_collection().map(Collection::id))
            .collect();
        let job = refresh_job(result.downgrade(), source.clone(), definition, params);

        let result_id = result.id();
        let source_listener = invalidator(bus, result_id, job.clone(), |_| true);
        // Wildcard keys would otherwise hear the content events of result
        // collections, including this one.
        let query_listener = invalidator(bus, result_id, job.clone(), move |event| {
            event.key != EventKey::Content || arg_collections.contains(&event.target)
        });
        let record_listener = invalidator(bus, result_id, job, |event| {
            event.key != EventKey::Content
        });

        let mut subscriptions = Vec::with_capacity(wanted.len());
        for (route, target, key) in wanted {
            let listener = match route {
                Route::Source => &source_listener,
                Route::Query => &query_listener,
                Route::Record => &record_listener,
            };
            if bus.subscribe(target, key.clone(), listener.clone()) {
                subscriptions.push(Subscription {
                    target,
                    key,
                    listener: listener.clone(),
                });
            }
        }

        tracing::debug!(
            result = result_id,
            source = source.id(),
            subscriptions = subscriptions.len(),
            "live query attached"
        );

        Self {
            bus: Rc::downgrade(bus),
            subscriptions,
        }
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        for sub in self.subscriptions.drain(..) {
            bus.unsubscribe(sub.target, sub.key, &sub.listener);
        }
    }
}

/// A listener that schedules `job` for `result_id` on events it `accepts`.
fn invalidator<F>(bus: &Rc<ChangeBus>, result_id: ObjectId, job: Job, accepts: F) -> Listener
where
    F: Fn(&ChangeEvent) -> bool + 'static,
{
    let bus = Rc::downgrade(bus);
    Rc::new(move |event: &ChangeEvent| {
        if !accepts(event) {
            return;
        }
        if let Some(bus) = bus.upgrade() {
            bus.scheduler().mark_dirty(result_id, job.clone());
        }
    })
}

fn refresh_job(
    result: WeakCollection,
    source: Collection,
    definition: Rc<QueryDefinition>,
    params: Rc<[Value]>,
) -> Job {
    Rc::new(move || -> Result<()> {
        match result.upgrade() {
            Some(result) => refresh(&result, &source, &definition, &params),
            None => Ok(()),
        }
    })
}

fn path_keys(key: &str) -> impl Iterator<Item = EventKey> {
    let length = (key == "length").then_some(EventKey::Length);
    std::iter::once(EventKey::field(key)).chain(length)
}

/// Lists the `(route, target, key)` triples a live query listens on.
fn dependencies(source: &Collection, definition: &QueryDefinition, params: &[Value]) -> Vec<Dependency> {
    let mut wanted = vec![(Route::Source, Some(source.id()), Some(EventKey::Content))];
    for path in &definition.paths {
        let (route, target) = match path.root {
            PathRoot::Local => (Route::Record, None),
            PathRoot::Arg(idx) => {
                let arg = params.get(idx);
                if let Some(Value::Collection(items)) = arg {
                    wanted.push((Route::Query, Some(items.id()), Some(EventKey::Content)));
                }
                (Route::Query, arg.and_then(Value::object_id))
            }
        };
        for key in path.literal_keys() {
            wanted.extend(path_keys(&key).map(|event_key| (route, target, Some(event_key))));
        }
        if path.has_computed_key() {
            wanted.push((route, target, None));
        }
    }
    wanted
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::{FieldMap, Record};
    use quiver_query::ast::{BinaryOp, Node, PathComponent};
    use quiver_query::{Compiler, ExtensionRegistry, ParsedQuery, PathCollector, RegexCache};

    fn definition(build: impl FnOnce(&mut PathCollector) -> ParsedQuery) -> Rc<QueryDefinition> {
        let mut collector = PathCollector::new();
        let parsed = build(&mut collector);
        let extensions = ExtensionRegistry::new();
        let compiler = Compiler::new(&extensions, Rc::new(RegexCache::new()));
        Rc::new(QueryDefinition::compile(&parsed, collector.take(), &compiler).unwrap())
    }

    fn key(name: &str) -> PathComponent {
        PathComponent::Key(Value::from(name))
    }

    #[test]
    fn test_dependencies() {
        let bus = Rc::new(ChangeBus::default());
        let source = Collection::new(bus.next_object_id(), Vec::new(), bus.sink());
        let limit = Record::new(bus.next_object_id(), FieldMap::from_pairs([("min", 1)]), bus.sink());
        let def = definition(|paths| {
            let age = paths.path_node(PathRoot::Local, vec![key("age")]);
            let min = paths.path_node(PathRoot::Arg(0), vec![key("min")]);
            let count = paths.path_node(PathRoot::Arg(1), vec![key("length")]);
            ParsedQuery::all().with_filter(Node::binary(
                BinaryOp::And,
                Node::binary(BinaryOp::Gt, age, min),
                count,
            ))
        });
        let params = [Value::from(limit.clone()), Value::from(5)];

        let wanted = dependencies(&source, &def, &params);
        assert_eq!(
            wanted,
            vec![
                (Route::Source, Some(source.id()), Some(EventKey::Content)),
                (Route::Record, None, Some(EventKey::field("age"))),
                (Route::Query, Some(limit.id()), Some(EventKey::field("min"))),
                (Route::Query, None, Some(EventKey::field("length"))),
                (Route::Query, None, Some(EventKey::Length)),
            ]
        );
    }

    #[test]
    fn test_computed_key_subscribes_wildcard() {
        let bus = Rc::new(ChangeBus::default());
        let source = Collection::new(bus.next_object_id(), Vec::new(), bus.sink());
        let inner = Record::new(bus.next_object_id(), FieldMap::from_pairs([("score", 1)]), bus.sink());
        let def = definition(|paths| {
            let field = paths.path_node(PathRoot::Local, vec![key("field")]);
            let picked = paths.path_node(
                PathRoot::Arg(0),
                vec![PathComponent::Computed(field)],
            );
            ParsedQuery::all().with_filter(picked)
        });
        let params = [Value::from(inner.clone())];

        let wanted = dependencies(&source, &def, &params);
        assert!(wanted.contains(&(Route::Record, None, Some(EventKey::field("field")))));
        assert!(wanted.contains(&(Route::Query, Some(inner.id()), None)));
    }

    #[test]
    fn test_routes_use_distinct_listeners() {
        let bus = Rc::new(ChangeBus::default());
        let source = Collection::new(bus.next_object_id(), Vec::new(), bus.sink());
        let result = Collection::new(bus.next_object_id(), Vec::new(), bus.sink());
        let def = definition(|paths| {
            let name = paths.path_node(PathRoot::Local, vec![key("name")]);
            let names = paths.path_node(PathRoot::Arg(0), Vec::new());
            ParsedQuery::all().with_filter(Node::binary(BinaryOp::In, name, names))
        });
        let params: Rc<[Value]> = Rc::from(vec![Value::from(source.clone())]);

        // The source doubles as the argument: its content is heard by both
        // the source and the query listener.
        let live = LiveQuery::attach(&bus, &result, &source, def, params);
        assert_eq!(bus.listener_count(), 3);
        let listeners: Vec<&Listener> = live.subscriptions.iter().map(|sub| &sub.listener).collect();
        assert!(!Rc::ptr_eq(listeners[0], listeners[1]));
        assert!(!Rc::ptr_eq(listeners[1], listeners[2]));
        assert!(!Rc::ptr_eq(listeners[0], listeners[2]));
        drop(live);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_detach_on_drop() {
        let bus = Rc::new(ChangeBus::default());
        let source = Collection::new(bus.next_object_id(), Vec::new(), bus.sink());
        let result = Collection::new(bus.next_object_id(), Vec::new(), bus.sink());
        let def = definition(|paths| {
            let age = paths.path_node(PathRoot::Local, vec![key("age")]);
            let again = paths.path_node(PathRoot::Local, vec![key("age")]);
            ParsedQuery::all().with_filter(Node::binary(BinaryOp::Eq, age, again))
        });

        let live = LiveQuery::attach(&bus, &result, &source, def, Rc::from(Vec::new()));
        // The repeated `age` path subscribes once.
        assert_eq!(bus.listener_count(), 2);
        drop(live);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_refresh_job_skips_dropped_result() {
        let source = Collection::detached(1, vec![Value::from(1)]);
        let result = Collection::detached(2, Vec::new());
        let def = definition(|_| ParsedQuery::all());
        let job = refresh_job(result.downgrade(), source.clone(), def, Rc::from(Vec::new()));

        job().unwrap();
        assert_eq!(result.to_vec(), [Value::from(1)]);
        drop(result);
        assert!(job().is_ok());
    }
}
