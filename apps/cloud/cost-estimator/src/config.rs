//! Configuration for the cost estimator

use core_config::{Environment, FromEnv, PricingApiConfig};
use eyre::{Result, WrapErr};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub pricing: PricingApiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: Environment::from_env(),
            pricing: PricingApiConfig::from_env().wrap_err("Invalid pricing configuration")?,
        })
    }

    /// Apply command-line overrides on top of the environment
    pub fn with_overrides(
        mut self,
        catalog: Option<PathBuf>,
        api_url: Option<String>,
        concurrency: Option<usize>,
    ) -> Self {
        if catalog.is_some() {
            self.pricing.catalog_path = catalog;
        }
        if let Some(url) = api_url {
            self.pricing.url = url;
        }
        if let Some(concurrency) = concurrency.filter(|c| *c > 0) {
            self.pricing.concurrency = concurrency;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            environment: Environment::Development,
            pricing: PricingApiConfig::default(),
        }
    }

    #[test]
    fn test_overrides_replace_environment_values() {
        let config = config().with_overrides(
            Some(PathBuf::from("catalog.json")),
            Some("http://pricing:4000/graphql".to_string()),
            Some(2),
        );
        assert_eq!(config.pricing.catalog_path, Some(PathBuf::from("catalog.json")));
        assert_eq!(config.pricing.url, "http://pricing:4000/graphql");
        assert_eq!(config.pricing.concurrency, 2);
    }

    #[test]
    fn test_absent_overrides_keep_environment_values() {
        let config = config().with_overrides(None, None, Some(0));
        assert_eq!(config.pricing, PricingApiConfig::default());
    }
}
