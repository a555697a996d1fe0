//! Parser boundary.
//!
//! Query text is parsed by an external collaborator implementing
//! [`QueryParser`]. The parser must build every path node through the
//! [`PathCollector`] it is handed, which is how a query's dependency paths
//! are discovered.

use crate::ast::{Node, OrderSpec, PathComponent, PathNode, PathRoot};
use quiver_core::{Error, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// The pieces of one parsed query.
#[derive(Clone, Debug)]
pub struct ParsedQuery {
    /// Filter predicate; an absent `where` clause is the literal `true`
    pub filter: Node,
    /// Projection; `None` selects the item itself
    pub select: Option<Node>,
    pub order: Vec<OrderSpec>,
    /// Sort matched items before projecting them
    pub sort_first: bool,
}

impl ParsedQuery {
    /// A query that keeps every item as is.
    pub fn all() -> Self {
        Self {
            filter: Node::literal(true),
            select: None,
            order: Vec::new(),
            sort_first: false,
        }
    }

    pub fn with_filter(mut self, filter: Node) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_select(mut self, select: Node) -> Self {
        self.select = Some(select);
        self
    }

    pub fn with_order(mut self, order: Vec<OrderSpec>, sort_first: bool) -> Self {
        self.order = order;
        self.sort_first = sort_first;
        self
    }
}

/// Records the path nodes a parser creates.
#[derive(Debug, Default)]
pub struct PathCollector {
    paths: Vec<Rc<PathNode>>,
}

impl PathCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a path node and records it as a dependency.
    pub fn path(&mut self, root: PathRoot, components: Vec<PathComponent>) -> Rc<PathNode> {
        let node = Rc::new(PathNode::new(root, components));
        self.paths.push(node.clone());
        node
    }

    /// Like [`path`](Self::path), wrapped as an expression node.
    pub fn path_node(&mut self, root: PathRoot, components: Vec<PathComponent>) -> Node {
        Node::Path(self.path(root, components))
    }

    pub fn paths(&self) -> &[Rc<PathNode>] {
        &self.paths
    }

    /// Hands out the recorded paths and resets the collector.
    pub fn take(&mut self) -> Vec<Rc<PathNode>> {
        std::mem::take(&mut self.paths)
    }
}

/// A query text parser.
pub trait QueryParser {
    fn parse(&mut self, text: &str, paths: &mut PathCollector) -> Result<ParsedQuery>;
}

/// Creates parser instances for the pool.
pub type ParserFactory = Rc<dyn Fn() -> Box<dyn QueryParser>>;

/// Reuses parser instances across compilations.
pub struct ParserPool {
    factory: ParserFactory,
    idle: RefCell<Vec<Box<dyn QueryParser>>>,
    capacity: usize,
}

impl ParserPool {
    /// Creates a pool keeping at most `capacity` idle parsers.
    pub fn new(factory: ParserFactory, capacity: usize) -> Self {
        Self {
            factory,
            idle: RefCell::new(Vec::new()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn idle_count(&self) -> usize {
        self.idle.borrow().len()
    }

    /// Parses `text`, returning the query and its dependency paths.
    ///
    /// Errors other than compile errors are reported as [`Error::Parse`].
    pub fn parse(&self, text: &str) -> Result<(ParsedQuery, Vec<Rc<PathNode>>)> {
        let pooled = self.idle.borrow_mut().pop();
        let mut parser = match pooled {
            Some(parser) => parser,
            None => (self.factory)(),
        };

        let mut collector = PathCollector::new();
        let parsed = parser.parse(text, &mut collector);
        self.release(parser);

        match parsed {
            Ok(query) => Ok((query, collector.take())),
            Err(err) if err.is_compile_error() => Err(err),
            Err(err) => Err(Error::parse(text, err.to_string())),
        }
    }

    fn release(&self, parser: Box<dyn QueryParser>) {
        let mut idle = self.idle.borrow_mut();
        if idle.len() < self.capacity {
            idle.push(parser);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use quiver_core::Value;
    use std::cell::Cell;

    /// Understands `field > n` and nothing else.
    struct GreaterThan;

    impl QueryParser for GreaterThan {
        fn parse(&mut self, text: &str, paths: &mut PathCollector) -> Result<ParsedQuery> {
            let (field, bound) = text
                .split_once('>')
                .ok_or_else(|| Error::invalid_operation("expected '>'"))?;
            let bound: f64 = bound
                .trim()
                .parse()
                .map_err(|_| Error::invalid_operation("expected a number"))?;
            let path = paths.path_node(
                PathRoot::Local,
                vec![PathComponent::Key(Value::from(field.trim()))],
            );
            Ok(ParsedQuery::all().with_filter(Node::binary(
                BinaryOp::Gt,
                path,
                Node::literal(bound),
            )))
        }
    }

    fn counting_pool(created: &Rc<Cell<usize>>, capacity: usize) -> ParserPool {
        let created = created.clone();
        let factory: ParserFactory = Rc::new(move || -> Box<dyn QueryParser> {
            created.set(created.get() + 1);
            Box::new(GreaterThan)
        });
        ParserPool::new(factory, capacity)
    }

    #[test]
    fn test_collects_paths() {
        let created = Rc::new(Cell::new(0));
        let pool = counting_pool(&created, 2);
        let (query, paths) = pool.parse("age > 30").unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].to_string(), "@.age");
        match query.filter {
            Node::Binary { left, .. } => match *left {
                Node::Path(node) => assert!(Rc::ptr_eq(&node, &paths[0])),
                _ => panic!("Expected path operand"),
            },
            _ => panic!("Expected binary filter"),
        }
    }

    #[test]
    fn test_parsers_are_reused() {
        let created = Rc::new(Cell::new(0));
        let pool = counting_pool(&created, 1);
        pool.parse("a > 1").unwrap();
        pool.parse("b > 2").unwrap();
        assert_eq!(created.get(), 1);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_zero_capacity_never_pools() {
        let created = Rc::new(Cell::new(0));
        let pool = counting_pool(&created, 0);
        pool.parse("a > 1").unwrap();
        pool.parse("a > 1").unwrap();
        assert_eq!(created.get(), 2);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_failures_become_parse_errors() {
        let created = Rc::new(Cell::new(0));
        let pool = counting_pool(&created, 1);
        let err = pool.parse("nonsense").unwrap_err();
        assert!(matches!(err, Error::Parse { ref query, .. } if query == "nonsense"));
        // The parser goes back to the pool even after a failure.
        assert_eq!(pool.idle_count(), 1);
    }
}
