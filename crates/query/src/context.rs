//! Evaluation context for query execution.

use quiver_core::{Collection, Value};

/// What an evaluator can see besides the current record: the collection the
/// query runs over and the query's external arguments.
#[derive(Clone, Copy, Debug)]
pub struct EvalContext<'a> {
    pub source: &'a Collection,
    pub params: &'a [Value],
}

impl<'a> EvalContext<'a> {
    /// Creates a new evaluation context.
    pub fn new(source: &'a Collection, params: &'a [Value]) -> Self {
        Self { source, params }
    }

    /// Returns the i-th argument, or `Null` when it was not supplied.
    pub fn param(&self, index: usize) -> Value {
        self.params.get(index).cloned().unwrap_or(Value::Null)
    }
}
