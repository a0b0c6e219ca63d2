use crate::{env_or_default, env_parse, ConfigError, FromEnv};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PRICING_API_URL: &str = "http://localhost:8000/v1/products/graphql";

/// Where prices come from and how hard to hit it
#[derive(Clone, Debug, PartialEq)]
pub struct PricingApiConfig {
    /// GraphQL endpoint of the pricing catalog API
    pub url: String,
    pub timeout: Duration,
    /// Offline catalog file; when set the HTTP API is not used
    pub catalog_path: Option<PathBuf>,
    /// Resources priced at once
    pub concurrency: usize,
}

impl Default for PricingApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PRICING_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            catalog_path: None,
            concurrency: 8,
        }
    }
}

impl FromEnv for PricingApiConfig {
    /// Reads from environment variables:
    /// - PRICING_API_URL: defaults to the local catalog API
    /// - PRICING_API_TIMEOUT_SECS: defaults to 30
    /// - PRICING_CATALOG_PATH: optional offline catalog
    /// - ESTIMATOR_CONCURRENCY: defaults to 8, must be positive
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_or_default("PRICING_API_URL", DEFAULT_PRICING_API_URL);
        let timeout = Duration::from_secs(env_parse("PRICING_API_TIMEOUT_SECS", 30u64)?);
        let catalog_path = env::var("PRICING_CATALOG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let concurrency: usize = env_parse("ESTIMATOR_CONCURRENCY", 8)?;
        if concurrency == 0 {
            return Err(ConfigError::ParseError {
                key: "ESTIMATOR_CONCURRENCY".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            url,
            timeout,
            catalog_path,
            concurrency,
        })
    }
}
