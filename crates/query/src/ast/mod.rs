//! AST module for query expressions, paths and ordering.

mod node;

pub use node::{BinaryOp, Node, OrderSpec, PathComponent, PathNode, PathRoot, UnaryOp};
