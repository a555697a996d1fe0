//! Path resolution.
//!
//! A path walks from the current record (or an argument) through a sequence
//! of keys. Observable collections met along the way are drilled into: the
//! walk continues from their first item, and an empty collection ends it
//! with `Null`.

use crate::ast::PathRoot;
use crate::compiler::Evaluator;
use crate::context::EvalContext;
use quiver_core::{Result, Value};

/// A compiled path component.
#[derive(Clone)]
pub enum PathStep {
    /// Literal key (including computed keys that folded to a constant)
    Key(Value),
    /// Key computed from the current record on every walk
    Computed(Evaluator),
}

/// A compiled path.
#[derive(Clone)]
pub struct PathEvaluator {
    root: PathRoot,
    steps: Vec<PathStep>,
}

impl PathEvaluator {
    /// Creates a path evaluator.
    pub fn new(root: PathRoot, steps: Vec<PathStep>) -> Self {
        Self { root, steps }
    }

    /// Returns where the walk starts.
    pub fn root(&self) -> PathRoot {
        self.root
    }

    /// Resolves the path for `record`.
    ///
    /// Computed keys are evaluated against `record` itself, never against the
    /// current walk position.
    pub fn resolve(&self, record: &Value, ctx: &EvalContext<'_>) -> Result<Value> {
        let mut current = match self.root {
            PathRoot::Local => record.clone(),
            PathRoot::Arg(idx) => ctx.param(idx),
        };

        for step in &self.steps {
            let drilled = match &current {
                Value::Collection(items) => Some(items.first()),
                _ => None,
            };
            match drilled {
                Some(Some(first)) => current = first,
                Some(None) => return Ok(Value::Null),
                None => {}
            }
            if current.is_null() {
                return Ok(Value::Null);
            }

            current = match step {
                PathStep::Key(key) => current.get_key(key),
                PathStep::Computed(eval) => current.get_key(&eval(record, ctx)?),
            };
        }
        Ok(current)
    }
}
