//! Execution limits.

use std::time::Duration;

use crate::Phase;

/// Validated engine options.
///
/// Built by the driver from a document's `options` merged with host
/// overrides; the engine only reads it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Applies to every phase without its own budget.
    pub timeout: Option<Duration>,
    pub timeout_begin: Option<Duration>,
    pub timeout_action: Option<Duration>,
    pub timeout_end: Option<Duration>,
    /// Maximum iterations of any single loop execution.
    pub loop_limit: Option<u64>,
}

impl EngineOptions {
    /// Wall-clock budget of a phase.
    pub fn timeout_for(&self, phase: Phase) -> Option<Duration> {
        let specific = match phase {
            Phase::Begin => self.timeout_begin,
            Phase::Action | Phase::Merge => self.timeout_action,
            Phase::End => self.timeout_end,
        };
        specific.or(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_specific_timeout_wins() {
        let options = EngineOptions {
            timeout: Some(Duration::from_millis(100)),
            timeout_end: Some(Duration::from_millis(5)),
            ..EngineOptions::default()
        };
        assert_eq!(options.timeout_for(Phase::End), Some(Duration::from_millis(5)));
        assert_eq!(options.timeout_for(Phase::Action), Some(Duration::from_millis(100)));
    }
}
