//! Engine configuration.

use quiver_reactive::DEFAULT_MAX_NOTIFY_CYCLES;

/// Default number of idle parsers kept for reuse.
pub const DEFAULT_PARSER_POOL_CAPACITY: usize = 4;

/// Tunables for an [`Engine`](crate::Engine).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Ceiling on cascading notification cycles per outer publish
    pub max_notify_cycles: usize,
    /// Idle parser instances kept between compilations
    pub parser_pool_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_notify_cycles: DEFAULT_MAX_NOTIFY_CYCLES,
            parser_pool_capacity: DEFAULT_PARSER_POOL_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_notify_cycles(mut self, cycles: usize) -> Self {
        self.max_notify_cycles = cycles;
        self
    }

    pub fn with_parser_pool_capacity(mut self, capacity: usize) -> Self {
        self.parser_pool_capacity = capacity;
        self
    }
}
