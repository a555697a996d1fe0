//! Extension function registry.
//!
//! Queries call extensions by name (`upper(name)`, `select('...')`). Names are
//! case-insensitive and resolved when a query is compiled.

use crate::context::EvalContext;
use hashbrown::HashMap;
use quiver_core::{Result, Value};
use std::rc::Rc;

/// An extension function: receives the evaluation context and its evaluated
/// arguments.
pub type ExtensionFn = Rc<dyn Fn(&EvalContext<'_>, &[Value]) -> Result<Value>>;

/// Case-insensitive name -> function table.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    functions: HashMap<String, ExtensionFn>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `func` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: &str, func: ExtensionFn) -> Option<ExtensionFn> {
        self.functions.insert(name.to_lowercase(), func)
    }

    /// Registers several functions at once.
    pub fn register_all<I, S>(&mut self, functions: I)
    where
        I: IntoIterator<Item = (S, ExtensionFn)>,
        S: AsRef<str>,
    {
        for (name, func) in functions {
            self.register(name.as_ref(), func);
        }
    }

    /// Looks up a function by name.
    pub fn get(&self, name: &str) -> Option<ExtensionFn> {
        self.functions.get(&name.to_lowercase()).cloned()
    }

    /// Returns true if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }

    /// Returns the number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::{coerce, Collection};

    fn upper() -> ExtensionFn {
        Rc::new(|_: &EvalContext<'_>, args: &[Value]| -> Result<Value> {
            let text = args.first().map(coerce::to_string).unwrap_or_default();
            Ok(Value::from(text.to_uppercase()))
        })
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = ExtensionRegistry::new();
        registry.register("Upper", upper());

        assert!(registry.contains("upper"));
        assert!(registry.contains("UPPER"));
        assert!(registry.get("missing").is_none());

        let source = Collection::detached(1, Vec::new());
        let ctx = EvalContext::new(&source, &[]);
        let func = registry.get("uPpEr").unwrap();
        assert_eq!(func(&ctx, &[Value::from("ab")]).unwrap(), Value::from("AB"));
    }

    #[test]
    fn test_register_all() {
        let mut registry = ExtensionRegistry::new();
        registry.register_all([("one", upper()), ("Two", upper())]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("two"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ExtensionRegistry::new();
        assert!(registry.register("f", upper()).is_none());
        assert!(registry.register("F", upper()).is_some());
        assert_eq!(registry.len(), 1);
    }
}
