use crate::attributes::AttributeExt;
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{PriceQuery, PricedResults};
use crate::resources::gcp::compute_disk::storage_query;
use crate::resources::{FromResource, ResourceIndex};

const DEFAULT_REGION: &str = "us-central1";

/// `google_compute_image`: image storage
#[derive(Debug)]
pub struct ComputeImage {
    storage_gb: f64,
    storage: PriceQuery,
}

impl FromResource for ComputeImage {
    fn from_resource(_name: &str, resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let attributes = &resource.attributes;
        let region = attributes
            .string_attr("region")
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let storage_gb = attributes
            .f64_attr("storage_gb")
            .filter(|gb| *gb != 0.0)
            .or_else(|| attributes.f64_attr("storage_size"))
            .unwrap_or(0.0);

        Ok(Self {
            storage_gb,
            storage: storage_query(&region, "Storage Image"),
        })
    }
}

impl CostModel for ComputeImage {
    fn queries(&self) -> Vec<PriceQuery> {
        vec![self.storage.clone()]
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let rate = results.rate(&self.storage);
        let mut costs = ResourceCosts::default();
        costs.dynamic(DynamicCost::new(
            "Storage",
            rate.unit_or("GB"),
            self.storage_gb,
            UsageFormula::linear(rate.usd),
        ));
        costs
    }
}
