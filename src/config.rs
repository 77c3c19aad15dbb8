//! Engine configuration

use crate::interpreter::constants::DEFAULT_MAX_CALL_DEPTH;

/// Resource ceilings for one run of the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Largest number of simultaneously active calls, `main` included
    pub max_call_depth: usize,
    /// Largest number of statements executed before the run is aborted
    pub max_steps: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_steps: None,
        }
    }
}

impl EngineConfig {
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_steps(mut self, steps: Option<u64>) -> Self {
        self.max_steps = steps;
        self
    }
}
