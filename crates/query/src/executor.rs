//! Query execution.

use crate::cache::QueryDefinition;
use crate::context::EvalContext;
use quiver_core::{coerce, Result, Value};

/// Runs `definition` over `items`: filter, then project and sort.
///
/// With `sort_first` set and a projection present, matched items are sorted
/// before they are projected, so order keys read the source items. Otherwise
/// the projected results are sorted.
pub fn execute(
    definition: &QueryDefinition,
    items: &[Value],
    ctx: &EvalContext<'_>,
) -> Result<Vec<Value>> {
    let project = |item: &Value| -> Result<Value> {
        match &definition.select {
            Some(select) => select.evaluate(item, ctx),
            None => Ok(item.clone()),
        }
    };

    if let (Some(sort), Some(_), true) = (
        &definition.sort,
        &definition.select,
        definition.sort_first,
    ) {
        let matched = filter(definition, items, ctx)?;
        let sorted = sort.sort(matched, ctx)?;
        return sorted.iter().map(project).collect();
    }

    let mut results = Vec::new();
    for item in items {
        if coerce::truthy(&definition.filter.evaluate(item, ctx)?) {
            results.push(project(item)?);
        }
    }
    match &definition.sort {
        Some(sort) => sort.sort(results, ctx),
        None => Ok(results),
    }
}

fn filter(definition: &QueryDefinition, items: &[Value], ctx: &EvalContext<'_>) -> Result<Vec<Value>> {
    let mut matched = Vec::new();
    for item in items {
        if coerce::truthy(&definition.filter.evaluate(item, ctx)?) {
            matched.push(item.clone());
        }
    }
    Ok(matched)
}
