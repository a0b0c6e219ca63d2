//! Caller-supplied usage quantities for dynamic costs.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{EstimateError, EstimateResult};

/// `{ "<resource identifier>": { "<dynamic cost name>": <units> } }`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct UsageOverrides {
    by_resource: HashMap<String, HashMap<String, f64>>,
}

impl UsageOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> EstimateResult<Self> {
        serde_json::from_str(text).map_err(|e| EstimateError::UsageFile(e.to_string()))
    }

    pub async fn load(path: impl AsRef<Path>) -> EstimateResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EstimateError::UsageFile(format!("{}: {}", path.display(), e)))?;
        let overrides = Self::from_json(&text)?;
        info!(path = %path.display(), resources = overrides.by_resource.len(), "Loaded usage overrides");
        Ok(overrides)
    }

    pub fn set(&mut self, identifier: impl Into<String>, cost_name: impl Into<String>, units: f64) {
        self.by_resource
            .entry(identifier.into())
            .or_default()
            .insert(cost_name.into(), units);
    }

    pub fn get(&self, identifier: &str, cost_name: &str) -> Option<f64> {
        self.by_resource.get(identifier)?.get(cost_name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_resource.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookup_by_resource_and_cost_name() {
        let usage = UsageOverrides::from_json(
            r#"{ "root.resource.google_storage_bucket.assets": { "Storage": 250 } }"#,
        )
        .unwrap();

        let id = "root.resource.google_storage_bucket.assets";
        assert_eq!(usage.get(id, "Storage"), Some(250.0));
        assert_eq!(usage.get(id, "Operations"), None);
        assert_eq!(usage.get("root.resource.other.x", "Storage"), None);
    }

    #[test]
    fn test_malformed_file() {
        let err = UsageOverrides::from_json(r#"{ "a": { "Storage": "lots" } }"#).unwrap_err();
        assert!(matches!(err, EstimateError::UsageFile(_)));
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "root.resource.google_compute_address.ip": {{ "IP address (unused)": 730 }} }}"#).unwrap();

        let usage = UsageOverrides::load(file.path()).await.unwrap();
        assert_eq!(
            usage.get("root.resource.google_compute_address.ip", "IP address (unused)"),
            Some(730.0)
        );

        let missing = UsageOverrides::load(file.path().with_extension("missing")).await;
        assert!(missing.is_err());
    }
}
