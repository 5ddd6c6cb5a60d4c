//! Engine settings.
//!
//! Every field has a default, so an empty `[engine]` table (or no config
//! file at all) gives the stock calculator.

use serde::{Deserialize, Serialize};

/// Decimal places shown for rendered values.
pub const DEFAULT_PRECISION: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub precision: u32,
    /// Passes before the divergence guard poisons still-changing names.
    /// Never below one pass per entry plus one, which any acyclic list
    /// settles within, so only cycles ever reach it.
    pub max_passes: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            max_passes: None,
        }
    }
}

impl EngineConfig {
    pub fn pass_limit(&self, entry_count: usize) -> usize {
        let acyclic_bound = entry_count + 1;
        self.max_passes.map_or(acyclic_bound, |passes| passes.max(acyclic_bound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.precision, 5);
        assert_eq!(config.pass_limit(3), 4);
    }

    #[test]
    fn explicit_limit_never_undercuts_acyclic_bound() {
        let config = EngineConfig {
            max_passes: Some(0),
            ..EngineConfig::default()
        };
        assert_eq!(config.pass_limit(0), 1);
        assert_eq!(config.pass_limit(10), 11);

        let config = EngineConfig {
            max_passes: Some(50),
            ..EngineConfig::default()
        };
        assert_eq!(config.pass_limit(10), 50);
    }
}
