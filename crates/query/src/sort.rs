//! Result ordering.

use crate::context::EvalContext;
use crate::path::PathEvaluator;
use quiver_core::{coerce, Result, Value};
use std::cmp::Ordering;

/// One key of an ordering: where to read it and which way it runs.
#[derive(Clone)]
pub struct SortKey {
    path: PathEvaluator,
    ascending: bool,
}

impl SortKey {
    pub fn new(path: PathEvaluator, ascending: bool) -> Self {
        Self { path, ascending }
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }
}

/// Compares two key values using loose equality and loose ordering.
///
/// Values that are neither equal nor ordered (NaN, mixed objects) land on
/// the "less" side, so the relation need not be a total order.
pub fn compare_values(a: &Value, b: &Value, ascending: bool) -> Ordering {
    if coerce::loose_eq(a, b) {
        return Ordering::Equal;
    }
    let greater = if ascending {
        coerce::gt(a, b)
    } else {
        coerce::lt(a, b)
    };
    if greater {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

/// Chains sort keys left to right; the first non-equal key decides.
#[derive(Clone)]
pub struct Comparator {
    keys: Vec<SortKey>,
}

impl Comparator {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compares two rows of extracted keys.
    pub fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        for ((key, a), b) in self.keys.iter().zip(a).zip(b) {
            match compare_values(a, b, key.ascending) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    fn extract(&self, item: &Value, ctx: &EvalContext<'_>) -> Result<Vec<Value>> {
        self.keys
            .iter()
            .map(|key| key.path.resolve(item, ctx))
            .collect()
    }

    /// Sorts `items`, stable.
    ///
    /// Each item's keys are resolved once up front.
    pub fn sort(&self, items: Vec<Value>, ctx: &EvalContext<'_>) -> Result<Vec<Value>> {
        if items.len() < 2 {
            return Ok(items);
        }
        let decorated = items
            .into_iter()
            .map(|item| Ok((self.extract(&item, ctx)?, item)))
            .collect::<Result<Vec<_>>>()?;
        let sorted = merge_sort_by(decorated, &mut |a: &(Vec<Value>, Value), b: &(Vec<Value>, Value)| {
            self.compare_keys(&a.0, &b.0)
        });
        Ok(sorted.into_iter().map(|(_, item)| item).collect())
    }
}

/// Stable top-down merge sort.
///
/// Only ever asks whether the right element should come strictly before the
/// left one, so it terminates and keeps ties in order for any comparator.
pub fn merge_sort_by<T, F>(mut items: Vec<T>, compare: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort_by(items, compare);
    let right = merge_sort_by(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare(l, r) == Ordering::Greater,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged
}
