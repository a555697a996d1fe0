//! Compiled regex patterns shared by every query of an engine.

use hashbrown::HashMap;
use quiver_core::{Error, Result};
use regex::Regex;
use std::cell::RefCell;

/// Pattern text -> compiled regex.
#[derive(Default)]
pub struct RegexCache {
    patterns: RefCell<HashMap<String, Regex>>,
}

impl RegexCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled form of `pattern`, compiling it on first use.
    pub fn get(&self, pattern: &str) -> Result<Regex> {
        if let Some(regex) = self.patterns.borrow().get(pattern) {
            return Ok(regex.clone());
        }
        let regex =
            Regex::new(pattern).map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
        self.patterns
            .borrow_mut()
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    /// Tests `text` against `pattern`.
    pub fn is_match(&self, pattern: &str, text: &str) -> Result<bool> {
        Ok(self.get(pattern)?.is_match(text))
    }

    /// Returns the number of cached patterns.
    pub fn len(&self) -> usize {
        self.patterns.borrow().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.patterns.borrow().is_empty()
    }
}
