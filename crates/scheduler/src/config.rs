use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fairlane_core::FairlaneError;

// ── Defaults ────────────────────────────────────────────────────────

fn default_pool_size() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_drain_timeout_secs() -> u64 {
    30
}

// ── PoolConfig ──────────────────────────────────────────────────────

/// Static configuration for a [`crate::pool::Pool`].
///
/// Parsed from TOML or built in code; consumed at construction. The pool
/// is not hot-reconfigurable — changing sizes mid-run requires draining
/// and building a new pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of executor slots. Each slot runs at most one task at a time.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Maximum number of admitted-but-not-running tasks across all tenant
    /// queues. `0` is legal and turns the pool into pure load-shedding:
    /// anything that cannot start immediately is rejected.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Fixed round-robin order of tenant keys. Submissions under a tenant
    /// not listed here are refused.
    pub tenants: Vec<String>,

    /// How long `shutdown(drain = true)` waits for in-flight and queued
    /// tasks before aborting what remains.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl PoolConfig {
    /// Build a config in code with the default drain timeout.
    pub fn new<S: Into<String>>(
        pool_size: usize,
        queue_capacity: usize,
        tenants: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            pool_size,
            queue_capacity,
            tenants: tenants.into_iter().map(Into::into).collect(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, FairlaneError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FairlaneError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check structural invariants the scheduler depends on.
    pub fn validate(&self) -> Result<(), FairlaneError> {
        if self.pool_size == 0 {
            return Err(FairlaneError::Config(
                "pool_size must be at least 1".into(),
            ));
        }
        if self.tenants.is_empty() {
            return Err(FairlaneError::Config(
                "at least one tenant must be configured".into(),
            ));
        }
        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            if !seen.insert(tenant.as_str()) {
                return Err(FairlaneError::Config(format!(
                    "duplicate tenant in round-robin order: {tenant}"
                )));
            }
        }
        Ok(())
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_with_defaults() {
        let config = PoolConfig::from_toml_str(r#"tenants = ["a", "b"]"#).unwrap();
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.tenants, vec!["a", "b"]);
        assert_eq!(config.drain_timeout_secs, 30);
    }

    #[test]
    fn parses_explicit_fields() {
        let config = PoolConfig::from_toml_str(
            r#"
            pool_size = 2
            queue_capacity = 3
            tenants = ["alpha", "beta", "gamma"]
            drain_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.queue_capacity, 3);
        assert_eq!(config.tenants.len(), 3);
        assert_eq!(config.drain_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_zero_pool_size() {
        let err = PoolConfig::new(0, 8, ["a"]).validate().unwrap_err();
        assert!(matches!(err, FairlaneError::Config(_)));
    }

    #[test]
    fn rejects_empty_tenant_list() {
        let tenants: Vec<String> = vec![];
        let err = PoolConfig::new(2, 8, tenants).validate().unwrap_err();
        assert!(matches!(err, FairlaneError::Config(_)));
    }

    #[test]
    fn rejects_duplicate_tenants() {
        let err = PoolConfig::new(2, 8, ["a", "b", "a"]).validate().unwrap_err();
        assert!(matches!(err, FairlaneError::Config(_)));
    }

    #[test]
    fn zero_queue_capacity_is_legal() {
        assert!(PoolConfig::new(1, 0, ["a"]).validate().is_ok());
    }

    #[test]
    fn invalid_toml_reports_parse_error() {
        let err = PoolConfig::from_toml_str("pool_size = \"two\"").unwrap_err();
        assert!(matches!(err, FairlaneError::ConfigParse(_)));
    }
}
