//! Expression compiler.
//!
//! Turns an AST into a tree of closures. Subtrees whose operands are all
//! literals are evaluated once, here, and become literals themselves. Paths,
//! object and array templates, and extension calls always stay dynamic.

use crate::ast::{BinaryOp, Node, OrderSpec, PathComponent, PathNode, UnaryOp};
use crate::context::EvalContext;
use crate::extension::ExtensionRegistry;
use crate::path::{PathEvaluator, PathStep};
use crate::regex_cache::RegexCache;
use crate::sort::{Comparator, SortKey};
use quiver_core::{coerce, Error, FieldMap, Result, Value};
use std::fmt;
use std::rc::Rc;

/// A compiled expression evaluated against one record.
pub type Evaluator = Rc<dyn Fn(&Value, &EvalContext<'_>) -> Result<Value>>;

/// Result of compiling an expression.
#[derive(Clone)]
pub enum Compiled {
    /// Folded to a constant at compile time.
    Literal(Value),
    /// Depends on the record, the arguments or an extension.
    Dynamic(Evaluator),
}

impl Compiled {
    /// Evaluates against `record`.
    pub fn evaluate(&self, record: &Value, ctx: &EvalContext<'_>) -> Result<Value> {
        match self {
            Compiled::Literal(value) => Ok(value.clone()),
            Compiled::Dynamic(eval) => eval(record, ctx),
        }
    }

    /// Returns the folded value, if any.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Compiled::Literal(value) => Some(value),
            Compiled::Dynamic(_) => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Compiled::Literal(_))
    }
}

impl fmt::Debug for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compiled::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Compiled::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Applies a unary operator.
pub fn apply_unary(op: UnaryOp, operand: &Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!coerce::truthy(operand)),
        UnaryOp::Neg => coerce::neg(operand),
    }
}

/// Applies a non-short-circuiting binary operator other than `regex`.
pub fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::And => {
            if coerce::truthy(left) {
                right.clone()
            } else {
                left.clone()
            }
        }
        BinaryOp::Or => {
            if coerce::truthy(left) {
                left.clone()
            } else {
                right.clone()
            }
        }
        BinaryOp::Add => coerce::add(left, right),
        BinaryOp::Sub => coerce::sub(left, right),
        BinaryOp::Mul => coerce::mul(left, right),
        BinaryOp::Div => coerce::div(left, right),
        BinaryOp::Mod => coerce::rem(left, right),
        BinaryOp::Eq => Value::Bool(coerce::loose_eq(left, right)),
        BinaryOp::Ne => Value::Bool(!coerce::loose_eq(left, right)),
        BinaryOp::Gt => Value::Bool(coerce::gt(left, right)),
        BinaryOp::Ge => Value::Bool(coerce::gte(left, right)),
        BinaryOp::Lt => Value::Bool(coerce::lt(left, right)),
        BinaryOp::Le => Value::Bool(coerce::lte(left, right)),
        BinaryOp::In => Value::Bool(contains(right, left)),
        BinaryOp::Regex => Value::Bool(false),
    }
}

/// Membership test behind `in`.
///
/// Arrays and collections are searched with strict equality; objects and
/// records are checked for the key. Anything else contains nothing.
pub fn contains(container: &Value, needle: &Value) -> bool {
    match container {
        Value::Array(items) => items.iter().any(|item| coerce::strict_eq(item, needle)),
        Value::Collection(items) => items
            .to_vec()
            .iter()
            .any(|item| coerce::strict_eq(item, needle)),
        Value::Object(_) | Value::Record(_) => container.has_key(needle),
        _ => false,
    }
}

fn regex_match(regexes: &RegexCache, pattern: &Value, subject: &Value) -> Result<Value> {
    match pattern {
        Value::String(pattern) => {
            let matched = regexes.is_match(pattern, &coerce::to_string(subject))?;
            Ok(Value::Bool(matched))
        }
        _ => Ok(Value::Bool(false)),
    }
}

/// Compiles AST nodes against an extension table and a pattern cache.
pub struct Compiler<'a> {
    extensions: &'a ExtensionRegistry,
    regexes: Rc<RegexCache>,
}

impl<'a> Compiler<'a> {
    pub fn new(extensions: &'a ExtensionRegistry, regexes: Rc<RegexCache>) -> Self {
        Self {
            extensions,
            regexes,
        }
    }

    /// Compiles an expression.
    pub fn compile(&self, node: &Node) -> Result<Compiled> {
        match node {
            Node::Literal(value) => Ok(Compiled::Literal(value.clone())),
            Node::Unary { op, operand } => self.compile_unary(*op, operand),
            Node::Binary { op, left, right } => self.compile_binary(*op, left, right),
            Node::Ternary {
                cond,
                then,
                otherwise,
            } => self.compile_ternary(cond, then, otherwise),
            Node::Path(path) => {
                let path = self.compile_path(path)?;
                Ok(Compiled::Dynamic(Rc::new(
                    move |record: &Value, ctx: &EvalContext<'_>| path.resolve(record, ctx),
                )))
            }
            Node::Object(members) => self.compile_object(members),
            Node::Array(items) => self.compile_array(items),
            Node::Func { name, args } => self.compile_func(name, args),
        }
    }

    /// Compiles a path, folding constant computed keys.
    pub fn compile_path(&self, path: &PathNode) -> Result<PathEvaluator> {
        let mut steps = Vec::with_capacity(path.components.len());
        for component in &path.components {
            let step = match component {
                PathComponent::Key(key) => PathStep::Key(key.clone()),
                PathComponent::Computed(node) => match self.compile(node)? {
                    Compiled::Literal(key) => PathStep::Key(key),
                    Compiled::Dynamic(eval) => PathStep::Computed(eval),
                },
            };
            steps.push(step);
        }
        Ok(PathEvaluator::new(path.root, steps))
    }

    /// Compiles an `order by` clause. Returns `None` for an empty clause.
    pub fn compile_order(&self, order: &[OrderSpec]) -> Result<Option<Comparator>> {
        if order.is_empty() {
            return Ok(None);
        }
        let keys = order
            .iter()
            .map(|spec| {
                Ok(SortKey::new(
                    self.compile_path(&spec.path)?,
                    spec.ascending,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Comparator::new(keys)))
    }

    fn compile_unary(&self, op: UnaryOp, operand: &Node) -> Result<Compiled> {
        match self.compile(operand)? {
            Compiled::Literal(value) => Ok(Compiled::Literal(apply_unary(op, &value))),
            operand => Ok(Compiled::Dynamic(Rc::new(
                move |record: &Value, ctx: &EvalContext<'_>| {
                    Ok(apply_unary(op, &operand.evaluate(record, ctx)?))
                },
            ))),
        }
    }

    fn compile_binary(&self, op: BinaryOp, left: &Node, right: &Node) -> Result<Compiled> {
        let left = self.compile(left)?;
        let right = self.compile(right)?;

        if op == BinaryOp::Regex {
            let regexes = self.regexes.clone();
            return fold_or_defer(left, right, move |pattern: &Value, subject: &Value| {
                regex_match(&regexes, pattern, subject)
            });
        }

        if let (Compiled::Literal(l), Compiled::Literal(r)) = (&left, &right) {
            return Ok(Compiled::Literal(apply_binary(op, l, r)));
        }

        let eval: Evaluator = match op {
            BinaryOp::And => Rc::new(move |record: &Value, ctx: &EvalContext<'_>| {
                let l = left.evaluate(record, ctx)?;
                if coerce::truthy(&l) {
                    right.evaluate(record, ctx)
                } else {
                    Ok(l)
                }
            }),
            BinaryOp::Or => Rc::new(move |record: &Value, ctx: &EvalContext<'_>| {
                let l = left.evaluate(record, ctx)?;
                if coerce::truthy(&l) {
                    Ok(l)
                } else {
                    right.evaluate(record, ctx)
                }
            }),
            _ => Rc::new(move |record: &Value, ctx: &EvalContext<'_>| {
                let l = left.evaluate(record, ctx)?;
                let r = right.evaluate(record, ctx)?;
                Ok(apply_binary(op, &l, &r))
            }),
        };
        Ok(Compiled::Dynamic(eval))
    }

    fn compile_ternary(&self, cond: &Node, then: &Node, otherwise: &Node) -> Result<Compiled> {
        let cond = self.compile(cond)?;
        let then = self.compile(then)?;
        let otherwise = self.compile(otherwise)?;

        if let (Compiled::Literal(c), Compiled::Literal(t), Compiled::Literal(o)) =
            (&cond, &then, &otherwise)
        {
            let picked = if coerce::truthy(c) { t } else { o };
            return Ok(Compiled::Literal(picked.clone()));
        }

        Ok(Compiled::Dynamic(Rc::new(
            move |record: &Value, ctx: &EvalContext<'_>| {
                if coerce::truthy(&cond.evaluate(record, ctx)?) {
                    then.evaluate(record, ctx)
                } else {
                    otherwise.evaluate(record, ctx)
                }
            },
        )))
    }

    fn compile_object(&self, members: &[(String, Node)]) -> Result<Compiled> {
        let members = members
            .iter()
            .map(|(key, node)| Ok((key.clone(), self.compile(node)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Compiled::Dynamic(Rc::new(
            move |record: &Value, ctx: &EvalContext<'_>| {
                let mut fields = FieldMap::with_capacity(members.len());
                for (key, member) in &members {
                    fields.insert(key.clone(), member.evaluate(record, ctx)?);
                }
                Ok(Value::from(fields))
            },
        )))
    }

    fn compile_array(&self, items: &[Node]) -> Result<Compiled> {
        let items = self.compile_all(items)?;
        Ok(Compiled::Dynamic(Rc::new(
            move |record: &Value, ctx: &EvalContext<'_>| {
                Ok(Value::from(evaluate_all(&items, record, ctx)?))
            },
        )))
    }

    fn compile_func(&self, name: &str, args: &[Node]) -> Result<Compiled> {
        let func = self
            .extensions
            .get(name)
            .ok_or_else(|| Error::unknown_extension(name))?;
        let args = self.compile_all(args)?;
        Ok(Compiled::Dynamic(Rc::new(
            move |record: &Value, ctx: &EvalContext<'_>| {
                let values = evaluate_all(&args, record, ctx)?;
                func(ctx, &values)
            },
        )))
    }

    fn compile_all(&self, nodes: &[Node]) -> Result<Vec<Compiled>> {
        nodes.iter().map(|node| self.compile(node)).collect()
    }
}

fn evaluate_all(items: &[Compiled], record: &Value, ctx: &EvalContext<'_>) -> Result<Vec<Value>> {
    items.iter().map(|item| item.evaluate(record, ctx)).collect()
}

fn fold_or_defer<F>(left: Compiled, right: Compiled, apply: F) -> Result<Compiled>
where
    F: Fn(&Value, &Value) -> Result<Value> + 'static,
{
    match (left, right) {
        (Compiled::Literal(l), Compiled::Literal(r)) => Ok(Compiled::Literal(apply(&l, &r)?)),
        (left, right) => Ok(Compiled::Dynamic(Rc::new(
            move |record: &Value, ctx: &EvalContext<'_>| {
                let l = left.evaluate(record, ctx)?;
                let r = right.evaluate(record, ctx)?;
                apply(&l, &r)
            },
        ))),
    }
}
