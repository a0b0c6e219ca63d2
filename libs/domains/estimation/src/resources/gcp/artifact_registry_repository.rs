use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{AttributeFilter, PriceFilter, PriceQuery, PricedResults, ProductFilter};
use crate::resources::{FromResource, ResourceIndex};

/// Free storage per month, in GB
const FREE_STORAGE_GB: f64 = 0.5;

/// `google_artifact_registry_repository`: storage beyond the free allowance
#[derive(Debug)]
pub struct ArtifactRegistryRepository {
    storage: PriceQuery,
}

impl FromResource for ArtifactRegistryRepository {
    fn from_resource(_name: &str, _resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let storage = PriceQuery::new(
            ProductFilter::gcp("Artifact Registry")
                .family("ApplicationServices")
                .attribute(AttributeFilter::eq("description", "Artifact Registry Storage"))
                .attribute(AttributeFilter::eq("resource_group", "Storage")),
        )
        .with_price_filter(
            PriceFilter::default()
                .purchase_option("OnDemand")
                .start_usage_amount("0.5"),
        );

        Ok(Self { storage })
    }
}

impl CostModel for ArtifactRegistryRepository {
    fn queries(&self) -> Vec<PriceQuery> {
        vec![self.storage.clone()]
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let rate = results.rate(&self.storage);
        let mut costs = ResourceCosts::default();
        costs.dynamic(DynamicCost::new(
            "Storage",
            rate.unit_or("GB"),
            0.0,
            UsageFormula::free_allowance(rate.usd, FREE_STORAGE_GB),
        ));
        costs
    }
}
