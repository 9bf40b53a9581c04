//! Scheduler settings, loaded from the environment.

use std::env;

use thiserror::Error;
use tracing::info;

pub const SCHEDULER_NAME_VAR: &str = "YIELD_EFFECT_SCHEDULER_NAME";
pub const PASS_THROUGH_LIMIT_VAR: &str = "YIELD_EFFECT_PASS_THROUGH_LIMIT";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got `{value}`")]
    InvalidNumber { key: &'static str, value: String },
}

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Label attached to every task span.
    pub name: String,
    /// Maximum consecutive pass-through yields before the task fails.
    /// `None` means unbounded.
    pub pass_through_limit: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: "yield-effect".to_string(),
            pass_through_limit: None,
        }
    }
}

impl SchedulerConfig {
    /// Load overrides from environment variables. Unset variables keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load overrides from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(name) = lookup(SCHEDULER_NAME_VAR).filter(|s| !s.trim().is_empty()) {
            config.name = name.trim().to_string();
        }

        if let Some(raw) = lookup(PASS_THROUGH_LIMIT_VAR) {
            let limit = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidNumber {
                    key: PASS_THROUGH_LIMIT_VAR,
                    value: raw.clone(),
                })?;
            config.pass_through_limit = Some(limit);
        }

        Ok(config)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_pass_through_limit(mut self, limit: usize) -> Self {
        self.pass_through_limit = Some(limit);
        self
    }

    pub fn log_settings(&self) {
        info!("Scheduler config loaded:");
        info!("  {}: {}", SCHEDULER_NAME_VAR, self.name);
        match self.pass_through_limit {
            Some(limit) => info!("  {}: {}", PASS_THROUGH_LIMIT_VAR, limit),
            None => info!("  {}: <unbounded>", PASS_THROUGH_LIMIT_VAR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = SchedulerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert!(config.pass_through_limit.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = SchedulerConfig::from_lookup(lookup(&[
            (SCHEDULER_NAME_VAR, " checkout "),
            (PASS_THROUGH_LIMIT_VAR, "500"),
        ]))
        .unwrap();
        assert_eq!(config.name, "checkout");
        assert_eq!(config.pass_through_limit, Some(500));
    }

    #[test]
    fn rejects_bad_limits() {
        for bad in ["zero", "0", "-3"] {
            let err = SchedulerConfig::from_lookup(lookup(&[(PASS_THROUGH_LIMIT_VAR, bad)]))
                .unwrap_err();
            assert_eq!(
                err,
                ConfigError::InvalidNumber {
                    key: PASS_THROUGH_LIMIT_VAR,
                    value: bad.to_string()
                }
            );
        }
    }
}
