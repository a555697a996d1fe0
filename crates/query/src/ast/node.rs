//! Expression AST definitions.

use quiver_core::{coerce, Error, Result, Value};
use std::fmt;
use std::rc::Rc;

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Logical
    And,
    Or,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    // Membership / pattern
    In,
    Regex,
}

impl BinaryOp {
    /// Returns the parser tag for this operator.
    pub fn tag(&self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "neq",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "gte",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "lte",
            BinaryOp::In => "in",
            BinaryOp::Regex => "regex",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        let op = match tag {
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            "add" => BinaryOp::Add,
            "sub" => BinaryOp::Sub,
            "mul" => BinaryOp::Mul,
            "div" => BinaryOp::Div,
            "mod" => BinaryOp::Mod,
            "eq" => BinaryOp::Eq,
            "neq" => BinaryOp::Ne,
            "gt" => BinaryOp::Gt,
            "gte" => BinaryOp::Ge,
            "lt" => BinaryOp::Lt,
            "lte" => BinaryOp::Le,
            "in" => BinaryOp::In,
            "regex" | "re" => BinaryOp::Regex,
            _ => return None,
        };
        Some(op)
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    /// Returns the parser tag for this operator.
    pub fn tag(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "neg",
        }
    }
}

/// Where a path walk starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathRoot {
    /// The record being evaluated.
    Local,
    /// The i-th external argument of the query.
    Arg(usize),
}

/// One step of a path.
#[derive(Clone, Debug)]
pub enum PathComponent {
    /// A literal key.
    Key(Value),
    /// A key computed from an expression over the current record.
    Computed(Node),
}

/// A path expression such as `a.b[0]` or `%1.name`.
#[derive(Clone, Debug)]
pub struct PathNode {
    pub root: PathRoot,
    pub components: Vec<PathComponent>,
}

impl PathNode {
    /// Creates a path node.
    pub fn new(root: PathRoot, components: Vec<PathComponent>) -> Self {
        Self { root, components }
    }

    /// Returns the literal keys of this path as strings, in order.
    ///
    /// Computed components have no static key and are skipped.
    pub fn literal_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.components.iter().filter_map(|c| match c {
            PathComponent::Key(key) => Some(coerce::to_string(key)),
            PathComponent::Computed(_) => None,
        })
    }

    /// Returns true if any key of this path is only known at evaluation time.
    pub fn has_computed_key(&self) -> bool {
        self.components
            .iter()
            .any(|c| matches!(c, PathComponent::Computed(_)))
    }
}

impl fmt::Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            PathRoot::Local => write!(f, "@")?,
            PathRoot::Arg(idx) => write!(f, "%{}", idx)?,
        }
        for component in &self.components {
            match component {
                PathComponent::Key(key) => write!(f, ".{}", coerce::to_string(key))?,
                PathComponent::Computed(_) => write!(f, "[..]")?,
            }
        }
        Ok(())
    }
}

/// One key of an `order by` clause.
#[derive(Clone, Debug)]
pub struct OrderSpec {
    pub path: Rc<PathNode>,
    pub ascending: bool,
}

impl OrderSpec {
    /// Ascending order on `path`.
    pub fn asc(path: Rc<PathNode>) -> Self {
        Self {
            path,
            ascending: true,
        }
    }

    /// Descending order on `path`.
    pub fn desc(path: Rc<PathNode>) -> Self {
        Self {
            path,
            ascending: false,
        }
    }
}

/// Expression AST node. Immutable once built.
#[derive(Clone, Debug)]
pub enum Node {
    /// Literal value.
    Literal(Value),
    /// Unary operation.
    Unary { op: UnaryOp, operand: Box<Node> },
    /// Binary operation.
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `cond ? then : otherwise`
    Ternary {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    /// Path lookup; the same `Rc` is recorded as a dependency path.
    Path(Rc<PathNode>),
    /// Object literal.
    Object(Vec<(String, Node)>),
    /// Array literal.
    Array(Vec<Node>),
    /// Extension function call.
    Func { name: String, args: Vec<Node> },
}

impl Node {
    /// Creates a literal node.
    pub fn literal(value: impl Into<Value>) -> Self {
        Node::Literal(value.into())
    }

    /// Creates a unary node.
    pub fn unary(op: UnaryOp, operand: Node) -> Self {
        Node::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Creates a binary node.
    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a ternary node.
    pub fn ternary(cond: Node, then: Node, otherwise: Node) -> Self {
        Node::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Creates an object literal node.
    pub fn object<K: Into<String>>(members: impl IntoIterator<Item = (K, Node)>) -> Self {
        Node::Object(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Creates an array literal node.
    pub fn array(items: impl IntoIterator<Item = Node>) -> Self {
        Node::Array(items.into_iter().collect())
    }

    /// Creates an extension call node.
    pub fn func(name: impl Into<String>, args: impl IntoIterator<Item = Node>) -> Self {
        Node::Func {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Builds an operator node from a parser tag.
    ///
    /// Covers the unary (`not`, `neg`), binary, ternary (`tern`) and array
    /// (`arr`) tags. Paths, object literals and calls carry structure that
    /// does not fit a flat operand list and use their own constructors.
    pub fn from_tag(tag: &str, operands: Vec<Node>) -> Result<Node> {
        let arity = |expected: usize| -> Result<()> {
            if operands.len() == expected {
                Ok(())
            } else {
                Err(Error::invalid_operands(tag, expected, operands.len()))
            }
        };

        match tag {
            "not" | "neg" => {
                arity(1)?;
                let op = if tag == "not" {
                    UnaryOp::Not
                } else {
                    UnaryOp::Neg
                };
                let mut operands = operands.into_iter();
                match operands.next() {
                    Some(operand) => Ok(Node::unary(op, operand)),
                    None => Err(Error::invalid_operands(tag, 1, 0)),
                }
            }
            "tern" | "ternary" => {
                arity(3)?;
                match <[Node; 3]>::try_from(operands) {
                    Ok([cond, then, otherwise]) => Ok(Node::ternary(cond, then, otherwise)),
                    Err(rest) => Err(Error::invalid_operands(tag, 3, rest.len())),
                }
            }
            "arr" => Ok(Node::Array(operands)),
            _ => {
                let op = BinaryOp::from_tag(tag).ok_or_else(|| Error::unknown_operator(tag))?;
                arity(2)?;
                match <[Node; 2]>::try_from(operands) {
                    Ok([left, right]) => Ok(Node::binary(op, left, right)),
                    Err(rest) => Err(Error::invalid_operands(tag, 2, rest.len())),
                }
            }
        }
    }

    /// Returns the literal value if this node is a literal.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Node::Literal(value) => Some(value),
            _ => None,
        }
    }
}
