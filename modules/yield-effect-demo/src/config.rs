use std::time::Duration;

use anyhow::{Context, Result};

/// Demo settings loaded from the environment (and `.env` when present).
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    pub product_id: String,
    pub user_id: String,
    /// When false, card validation fails and the order is rolled back.
    pub happy_path: bool,
    /// Base latency of the mock services. Individual services take a
    /// multiple of this.
    pub latency: Duration,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            product_id: "PRDCT_ID_1122".to_string(),
            user_id: "USR_ID_9999".to_string(),
            happy_path: true,
            latency: Duration::from_millis(250),
        }
    }
}

impl DemoConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let latency = match lookup("ORDER_LATENCY_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("ORDER_LATENCY_MS must be a number, got `{raw}`"))?,
            ),
            None => defaults.latency,
        };

        Ok(Self {
            product_id: lookup("ORDER_PRODUCT_ID").unwrap_or(defaults.product_id),
            user_id: lookup("ORDER_USER_ID").unwrap_or(defaults.user_id),
            happy_path: lookup("ORDER_HAPPY_PATH")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(defaults.happy_path),
            latency,
        })
    }

    pub fn log_settings(&self) {
        tracing::info!("Demo config loaded:");
        tracing::info!("  ORDER_PRODUCT_ID: {}", self.product_id);
        tracing::info!("  ORDER_USER_ID: {}", self.user_id);
        tracing::info!("  ORDER_HAPPY_PATH: {}", self.happy_path);
        tracing::info!("  ORDER_LATENCY_MS: {}", self.latency.as_millis());
    }
}
