//! Property-based tests for the compiler and the sorter.
//!
//! Folding must be invisible: an expression over literals evaluates to the
//! same value whether its operands are constants or read from a record.
//! Sorting must be stable and deterministic.

use proptest::prelude::*;
use quiver_core::{coerce, Collection, Value};
use quiver_query::ast::{BinaryOp, Node, PathComponent, PathNode, PathRoot, UnaryOp};
use quiver_query::path::PathStep;
use quiver_query::sort::{merge_sort_by, Comparator, SortKey};
use quiver_query::{Compiler, EvalContext, ExtensionRegistry, PathEvaluator, RegexCache};
use std::rc::Rc;

/// Strategy for scalar operands, including the loose-typing edge cases.
fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-100i32..100).prop_map(Value::from),
        prop::sample::select(vec!["", "0", "1", "abc", " 12 ", "0x1f", "Infinity"])
            .prop_map(Value::from),
    ]
}

fn op_strategy() -> impl Strategy<Value = BinaryOp> {
    prop::sample::select(vec![
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Gt,
        BinaryOp::Ge,
        BinaryOp::Lt,
        BinaryOp::Le,
    ])
}

fn field(name: &str) -> Node {
    Node::Path(Rc::new(PathNode::new(
        PathRoot::Local,
        vec![PathComponent::Key(Value::from(name))],
    )))
}

fn evaluate(node: &Node, record: &Value) -> Value {
    let extensions = ExtensionRegistry::new();
    let compiler = Compiler::new(&extensions, Rc::new(RegexCache::new()));
    let source = Collection::detached(1, Vec::new());
    let ctx = EvalContext::new(&source, &[]);
    compiler
        .compile(node)
        .and_then(|compiled| compiled.evaluate(record, &ctx))
        .unwrap()
}

proptest! {
    /// Property: folding a binary operator matches evaluating it at runtime.
    #[test]
    fn folding_matches_runtime(a in scalar_strategy(), b in scalar_strategy(), op in op_strategy()) {
        let folded = evaluate(&Node::binary(op, Node::literal(a.clone()), Node::literal(b.clone())), &Value::Null);
        let record = Value::object([("a", a), ("b", b)]);
        let dynamic = evaluate(&Node::binary(op, field("a"), field("b")), &record);
        prop_assert_eq!(folded, dynamic);
    }

    /// Property: folding a ternary picks the same branch as runtime evaluation.
    #[test]
    fn ternary_folding_matches_runtime(c in scalar_strategy(), t in scalar_strategy(), o in scalar_strategy()) {
        let folded = evaluate(
            &Node::ternary(Node::literal(c.clone()), Node::literal(t.clone()), Node::literal(o.clone())),
            &Value::Null,
        );
        let record = Value::object([("c", c), ("t", t), ("o", o)]);
        let dynamic = evaluate(&Node::ternary(field("c"), field("t"), field("o")), &record);
        prop_assert_eq!(folded, dynamic);
    }

    /// Property: `not` always yields a boolean, and double negation is truthiness.
    #[test]
    fn double_not_is_truthiness(a in scalar_strategy()) {
        let node = Node::unary(UnaryOp::Not, Node::unary(UnaryOp::Not, field("a")));
        let result = evaluate(&node, &Value::object([("a", a.clone())]));
        prop_assert_eq!(result, Value::Bool(coerce::truthy(&a)));
    }

    /// Property: merge sort agrees with the standard stable sort on total orders.
    #[test]
    fn merge_sort_matches_std(keys in prop::collection::vec(-20i32..20, 0..80)) {
        let tagged: Vec<(i32, usize)> = keys.into_iter().enumerate().map(|(i, k)| (k, i)).collect();
        let mut expected = tagged.clone();
        expected.sort_by(|a, b| a.0.cmp(&b.0));
        let sorted = merge_sort_by(tagged, &mut |a: &(i32, usize), b: &(i32, usize)| a.0.cmp(&b.0));
        prop_assert_eq!(sorted, expected);
    }

    /// Property: sorting numeric keys is idempotent and keeps ties in source order.
    #[test]
    fn comparator_sort_is_stable(ages in prop::collection::vec(0i32..10, 0..40)) {
        let items: Vec<Value> = ages
            .into_iter()
            .enumerate()
            .map(|(i, age)| Value::object([("age", Value::from(age)), ("pos", Value::from(i))]))
            .collect();
        let comparator = Comparator::new(vec![SortKey::new(
            PathEvaluator::new(PathRoot::Local, vec![PathStep::Key(Value::from("age"))]),
            true,
        )]);
        let source = Collection::detached(1, Vec::new());
        let ctx = EvalContext::new(&source, &[]);

        let once = comparator.sort(items.clone(), &ctx).unwrap();
        let twice = comparator.sort(once.clone(), &ctx).unwrap();
        prop_assert_eq!(once.len(), items.len());
        prop_assert_eq!(&once, &twice);

        let key = |v: &Value, k: &str| coerce::to_number(&v.get_key(&Value::from(k)));
        for pair in once.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(key(a, "age") <= key(b, "age"));
            if key(a, "age") == key(b, "age") {
                prop_assert!(key(a, "pos") < key(b, "pos"));
            }
        }
    }
}
