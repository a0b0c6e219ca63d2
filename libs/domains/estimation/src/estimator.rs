//! Estimation pipeline: dispatch every resource to its cost model and price
//! them concurrently.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ResolvedModule, Resource, ResourceKind};
use crate::cost::{CostModel, FixedCost, ResourceCosts};
use crate::error::EstimateError;
use crate::pricing::PricingClient;
use crate::registry::ResourceRegistry;
use crate::resources::ResourceIndex;
use crate::usage::UsageOverrides;

/// Resources priced at once unless configured otherwise
pub const DEFAULT_CONCURRENCY: usize = 8;

/// A dynamic cost evaluated at a usage quantity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicEstimate {
    pub name: String,
    pub unit: String,
    pub units: f64,
    /// Whether `units` came from the usage overrides
    pub overridden: bool,
    pub monthly_cost: f64,
}

/// Cost entries of one priced resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceEstimate {
    pub identifier: String,
    pub resource_type: String,
    pub fixed_costs: Vec<FixedCost>,
    pub dynamic_costs: Vec<DynamicEstimate>,
}

impl ResourceEstimate {
    pub fn new(resource: &Resource, costs: ResourceCosts, usage: &UsageOverrides) -> Self {
        let dynamic_costs = costs
            .dynamic_costs
            .iter()
            .map(|cost| {
                let units = usage.get(&resource.identifier, &cost.name);
                let evaluated = units.unwrap_or(cost.default_units);
                DynamicEstimate {
                    name: cost.name.clone(),
                    unit: cost.unit.clone(),
                    units: evaluated,
                    overridden: units.is_some(),
                    monthly_cost: cost.compute_cost(evaluated),
                }
            })
            .collect();

        Self {
            identifier: resource.identifier.clone(),
            resource_type: resource.resource_type.clone(),
            fixed_costs: costs.fixed_costs,
            dynamic_costs,
        }
    }

    pub fn monthly_cost(&self) -> f64 {
        self.fixed_costs.iter().map(|c| c.monthly_cost).sum::<f64>()
            + self.dynamic_costs.iter().map(|c| c.monthly_cost).sum::<f64>()
    }
}

/// A resource with no cost model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedResource {
    pub identifier: String,
    pub resource_type: String,
}

/// A resource whose model could not be built or priced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedResource {
    pub identifier: String,
    pub resource_type: String,
    pub error: String,
}

impl FailedResource {
    fn new(resource: &Resource, error: &EstimateError) -> Self {
        Self {
            identifier: resource.identifier.clone(),
            resource_type: resource.resource_type.clone(),
            error: error.to_string(),
        }
    }
}

/// Outcome of one estimation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Estimate {
    /// Sorted by identifier
    pub priced: Vec<ResourceEstimate>,
    pub skipped: Vec<SkippedResource>,
    pub failed: Vec<FailedResource>,
}

impl Estimate {
    pub fn monthly_total(&self) -> f64 {
        self.priced.iter().map(ResourceEstimate::monthly_cost).sum()
    }

    pub fn find(&self, identifier: &str) -> Option<&ResourceEstimate> {
        self.priced.iter().find(|r| r.identifier == identifier)
    }
}

/// Prices a resolved configuration tree
pub struct Estimator<'r> {
    client: Arc<dyn PricingClient>,
    registry: &'r ResourceRegistry,
    concurrency: usize,
}

impl<'r> Estimator<'r> {
    pub fn new(client: Arc<dyn PricingClient>, registry: &'r ResourceRegistry) -> Self {
        Self {
            client,
            registry,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Number of resources priced concurrently; clamped to at least one
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[instrument(skip_all, fields(module = %tree.identifier))]
    pub async fn estimate(&self, tree: &ResolvedModule, usage: &UsageOverrides) -> Estimate {
        let resources = tree.all_resources();
        let index = ResourceIndex::new(resources.iter().copied());
        let mut estimate = Estimate::default();

        let mut models: Vec<(&Resource, Box<dyn CostModel>)> = Vec::new();
        for resource in resources {
            if resource.kind == ResourceKind::Data {
                debug!(identifier = %resource.identifier, "Data source is not priced");
                continue;
            }
            match self.registry.create(resource, &index) {
                Ok(model) => models.push((resource, model)),
                Err(EstimateError::UnregisteredResourceType(resource_type)) => {
                    warn!(
                        identifier = %resource.identifier,
                        resource_type = %resource_type,
                        "Resource type not registered, skipping"
                    );
                    estimate.skipped.push(SkippedResource {
                        identifier: resource.identifier.clone(),
                        resource_type,
                    });
                }
                Err(e) => {
                    warn!(identifier = %resource.identifier, error = %e, "Failed to build cost model");
                    estimate.failed.push(FailedResource::new(resource, &e));
                }
            }
        }

        info!(
            resources = models.len(),
            skipped = estimate.skipped.len(),
            concurrency = self.concurrency,
            "Pricing resources"
        );

        let client = self.client.as_ref();
        let mut outcomes = stream::iter(models)
            .map(|(resource, model)| async move { (resource, model.fetch_costs(client).await) })
            .buffer_unordered(self.concurrency);

        while let Some((resource, outcome)) = outcomes.next().await {
            match outcome {
                Ok(costs) => {
                    let priced = ResourceEstimate::new(resource, costs, usage);
                    info!(
                        identifier = %priced.identifier,
                        monthly_cost = priced.monthly_cost(),
                        "Resource priced"
                    );
                    estimate.priced.push(priced);
                }
                Err(e) => {
                    error!(identifier = %resource.identifier, error = %e, "Pricing failed");
                    estimate.failed.push(FailedResource::new(resource, &e));
                }
            }
        }

        estimate.priced.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        estimate.failed.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Module;
    use crate::cost::{DynamicCost, UsageFormula};
    use crate::error::PricingError;
    use crate::pricing::{MockPricingClient, PriceResult};
    use crate::resources::testing::{priced, resource};
    use serde_json::json;

    fn tree(resources: Vec<Resource>) -> ResolvedModule {
        let mut root = Module::root();
        for r in resources {
            root.add_resource(r);
        }
        root.resolve().unwrap()
    }

    fn bucket(name: &str) -> Resource {
        resource(
            "google_storage_bucket",
            name,
            json!({ "location": "US", "storage_class": "STANDARD" }),
        )
    }

    #[test]
    fn test_resource_estimate_applies_overrides() {
        let r = bucket("assets");
        let mut costs = ResourceCosts::default();
        costs
            .fixed(FixedCost::new("Capacity", "GB", 10.0, 0.5))
            .dynamic(DynamicCost::new("Storage", "GB", 4.0, UsageFormula::linear(0.25)));

        let defaults = ResourceEstimate::new(&r, costs.clone(), &UsageOverrides::none());
        assert_eq!(defaults.monthly_cost(), 6.0);
        assert!(!defaults.dynamic_costs[0].overridden);

        let mut usage = UsageOverrides::none();
        usage.set(&r.identifier, "Storage", 100.0);
        let overridden = ResourceEstimate::new(&r, costs, &usage);
        assert_eq!(overridden.dynamic_costs[0].units, 100.0);
        assert!(overridden.dynamic_costs[0].overridden);
        assert_eq!(overridden.monthly_cost(), 30.0);
    }

    #[tokio::test]
    async fn test_skips_unregistered_and_prices_the_rest() {
        let network = resource("google_compute_network", "vpc", json!({}));
        let tree = tree(vec![network, bucket("assets")]);

        let mut client = MockPricingClient::new();
        client
            .expect_fetch_products()
            .times(1)
            .returning(|queries| Ok(queries.iter().map(|q| priced(q, "0.026", "GiBy.mo")).collect()));

        let estimate = Estimator::new(Arc::new(client), ResourceRegistry::gcp())
            .estimate(&tree, &UsageOverrides::none())
            .await;

        assert_eq!(estimate.priced.len(), 1);
        assert_eq!(estimate.priced[0].dynamic_costs[0].unit, "GB");
        assert_eq!(
            estimate.skipped,
            vec![SkippedResource {
                identifier: "root.resource.google_compute_network.vpc".into(),
                resource_type: "google_compute_network".into(),
            }]
        );
        assert!(estimate.failed.is_empty());
    }

    #[tokio::test]
    async fn test_batch_failure_is_isolated() {
        let failing = resource(
            "google_storage_bucket",
            "eu_assets",
            json!({ "location": "EU", "storage_class": "STANDARD" }),
        );
        let tree = tree(vec![failing, bucket("us_assets")]);

        let mut client = MockPricingClient::new();
        client.expect_fetch_products().times(2).returning(|queries| {
            if queries[0].product_filter.region.as_deref() == Some("europe") {
                Err(PricingError::Request("connection reset".into()))
            } else {
                Ok(queries.iter().map(|q| PriceResult::new(q, vec![])).collect())
            }
        });

        let estimate = Estimator::new(Arc::new(client), ResourceRegistry::gcp())
            .with_concurrency(2)
            .estimate(&tree, &UsageOverrides::none())
            .await;

        assert_eq!(estimate.priced.len(), 1);
        assert_eq!(estimate.priced[0].identifier, "root.resource.google_storage_bucket.us_assets");
        assert_eq!(estimate.failed.len(), 1);
        assert!(estimate.failed[0].error.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_invalid_resource_fails_alone() {
        let no_location = resource("google_storage_bucket", "broken", json!({}));
        let tree = tree(vec![no_location, bucket("ok")]);

        let mut client = MockPricingClient::new();
        client
            .expect_fetch_products()
            .returning(|queries| Ok(queries.iter().map(|q| priced(q, "1", "GB")).collect()));

        let estimate = Estimator::new(Arc::new(client), ResourceRegistry::gcp())
            .estimate(&tree, &UsageOverrides::none())
            .await;

        assert_eq!(estimate.priced.len(), 1);
        assert_eq!(estimate.failed.len(), 1);
        assert_eq!(estimate.failed[0].identifier, "root.resource.google_storage_bucket.broken");
    }

    #[tokio::test]
    async fn test_results_sorted_and_totalled() {
        let tree = tree(vec![bucket("zeta"), bucket("alpha"), bucket("mid")]);

        let mut client = MockPricingClient::new();
        client
            .expect_fetch_products()
            .returning(|queries| Ok(queries.iter().map(|q| priced(q, "0.5", "GB")).collect()));

        let mut usage = UsageOverrides::none();
        usage.set("root.resource.google_storage_bucket.alpha", "Storage", 10.0);
        usage.set("root.resource.google_storage_bucket.zeta", "Storage", 2.0);

        let estimate = Estimator::new(Arc::new(client), ResourceRegistry::gcp())
            .with_concurrency(3)
            .estimate(&tree, &usage)
            .await;

        let ids: Vec<_> = estimate.priced.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "root.resource.google_storage_bucket.alpha",
                "root.resource.google_storage_bucket.mid",
                "root.resource.google_storage_bucket.zeta",
            ]
        );
        assert_eq!(estimate.monthly_total(), 6.0);
        assert_eq!(estimate.find("root.resource.google_storage_bucket.mid").map(|r| r.monthly_cost()), Some(0.0));
    }
}
