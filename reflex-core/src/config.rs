//! Engine Configuration
//!
//! The engine has a single process-wide configuration, installed with
//! [`configure`] and read with [`config`]. The defaults are suitable for
//! almost every program. One setting bounds how often a write may re-trigger
//! itself before propagation is cut off, the other bounds how far a single
//! write may grow an array.

use std::sync::OnceLock;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};

/// Default bound on nested trigger propagation.
pub const DEFAULT_MAX_TRIGGER_DEPTH: usize = 256;

/// Default bound on array length reachable through a write.
pub const DEFAULT_MAX_ARRAY_LEN: usize = 1 << 24;

/// Largest array length allowed at all: 2^32 - 1, so the last valid index is
/// 2^32 - 2.
pub const ARRAY_LEN_LIMIT: usize = u32::MAX as usize;

/// Process-wide engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many times a trigger of one `(target, key)` may be nested inside
    /// another trigger of the same `(target, key)` on a thread. A computation
    /// that writes back to what it reads would otherwise recurse until the
    /// stack overflows.
    ///
    /// Only re-entry of the same property counts. A long acyclic chain (a
    /// derived value of a derived value, and so on) nests one trigger per
    /// link but never re-enters a property, so it propagates whatever its
    /// length.
    pub max_trigger_depth: usize,

    /// Upper bound on an array's length after a write. Writing index `i`
    /// grows the array to `i + 1` slots, so an index at or past this bound is
    /// rejected instead of allocating the holes in between. Capped at
    /// [`ARRAY_LEN_LIMIT`].
    pub max_array_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_trigger_depth: DEFAULT_MAX_TRIGGER_DEPTH,
            max_array_len: DEFAULT_MAX_ARRAY_LEN,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a configuration from JSON. Missing fields take
    /// their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ReactiveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_trigger_depth == 0 {
            return Err(ReactiveError::Config(
                "max_trigger_depth must be at least 1".to_string(),
            ));
        }
        if self.max_array_len > ARRAY_LEN_LIMIT {
            return Err(ReactiveError::Config(format!(
                "max_array_len must be at most {ARRAY_LEN_LIMIT}"
            )));
        }
        Ok(())
    }
}

static CONFIG: OnceLock<RwLock<EngineConfig>> = OnceLock::new();

fn global() -> &'static RwLock<EngineConfig> {
    CONFIG.get_or_init(|| RwLock::new(EngineConfig::default()))
}

/// Install a new process-wide configuration.
pub fn configure(config: EngineConfig) -> Result<()> {
    config.validate()?;
    tracing::debug!(
        max_trigger_depth = config.max_trigger_depth,
        max_array_len = config.max_array_len,
        "engine configured"
    );
    *global().write() = config;
    Ok(())
}

/// Get a copy of the current configuration.
pub fn config() -> EngineConfig {
    global().read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn parses_depth() {
        let config = EngineConfig::from_json(r#"{ "max_trigger_depth": 16 }"#).unwrap();
        assert_eq!(config.max_trigger_depth, 16);
    }

    #[test]
    fn rejects_zero_depth() {
        let err = EngineConfig::from_json(r#"{ "max_trigger_depth": 0 }"#).unwrap_err();
        assert!(matches!(err, ReactiveError::Config(_)));
        let zero = EngineConfig {
            max_trigger_depth: 0,
            ..EngineConfig::default()
        };
        assert!(configure(zero).is_err());
    }

    #[test]
    fn array_len_is_capped_at_js_limit() {
        let config = EngineConfig::from_json(r#"{ "max_array_len": 4294967295 }"#).unwrap();
        assert_eq!(config.max_array_len, ARRAY_LEN_LIMIT);

        let err = EngineConfig::from_json(r#"{ "max_array_len": 4294967296 }"#).unwrap_err();
        assert!(matches!(err, ReactiveError::Config(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(EngineConfig::from_json("not json").is_err());
    }
}
