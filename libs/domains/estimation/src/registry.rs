//! Resource-type dispatch: maps a resource type to its cost model factory.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::config::Resource;
use crate::cost::CostModel;
use crate::error::{EstimateError, EstimateResult};
use crate::resources::gcp::{
    ArtifactRegistryRepository, BigQueryDataset, BigQueryTable, CloudFunctionsFunction,
    CloudRunJob, CloudRunService, ComputeAddress, ComputeDisk, ComputeForwardingRule,
    ComputeImage, ComputeInstance, SqlDatabaseInstance, StorageBucket,
};
use crate::resources::{ResourceIndex, factory};

/// Constructor stored in the registry
pub type ModelFactory =
    fn(&str, &Resource, &ResourceIndex) -> EstimateResult<Box<dyn CostModel>>;

static GCP: Lazy<ResourceRegistry> = Lazy::new(|| {
    ResourceRegistry::empty()
        .register("google_artifact_registry_repository", factory::<ArtifactRegistryRepository>)
        .register("google_bigquery_dataset", factory::<BigQueryDataset>)
        .register("google_bigquery_table", factory::<BigQueryTable>)
        .register("google_cloud_run_v2_job", factory::<CloudRunJob>)
        .register("google_cloud_run_v2_service", factory::<CloudRunService>)
        .register("google_cloudfunctions_function", factory::<CloudFunctionsFunction>)
        .register("google_compute_address", factory::<ComputeAddress>)
        .register("google_compute_disk", factory::<ComputeDisk>)
        .register("google_compute_forwarding_rule", factory::<ComputeForwardingRule>)
        .register("google_compute_image", factory::<ComputeImage>)
        .register("google_compute_instance", factory::<ComputeInstance>)
        .register("google_sql_database_instance", factory::<SqlDatabaseInstance>)
        .register("google_storage_bucket", factory::<StorageBucket>)
});

/// Immutable table of resource types with a cost model
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    factories: HashMap<String, ModelFactory>,
}

impl ResourceRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every GCP resource type this crate can price, built on first use
    pub fn gcp() -> &'static ResourceRegistry {
        &GCP
    }

    pub fn register(mut self, resource_type: impl Into<String>, factory: ModelFactory) -> Self {
        self.factories.insert(resource_type.into(), factory);
        self
    }

    pub fn lookup(&self, resource_type: &str) -> Option<ModelFactory> {
        self.factories.get(resource_type).copied()
    }

    /// Instantiate the cost model for `resource`
    pub fn create(&self, resource: &Resource, index: &ResourceIndex) -> EstimateResult<Box<dyn CostModel>> {
        let factory = self
            .lookup(&resource.resource_type)
            .ok_or_else(|| EstimateError::UnregisteredResourceType(resource.resource_type.clone()))?;
        factory(&resource.name, resource, index)
    }

    /// Registered types in lexical order
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
