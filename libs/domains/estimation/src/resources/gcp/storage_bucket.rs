use crate::attributes::AttributeExt;
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{AttributeFilter, PriceQuery, PricedResults, ProductFilter};
use crate::region::bucket_region_and_group;
use crate::resources::{FromResource, ResourceIndex, required_str};

/// Excludes early-delete line items
const NOT_EARLY_DELETE: &str = r"/^(?!.*?\(Early Delete\))/";

/// `google_storage_bucket`: storage only, operations and retrieval are not priced
#[derive(Debug)]
pub struct StorageBucket {
    storage: PriceQuery,
}

impl FromResource for StorageBucket {
    fn from_resource(_name: &str, resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let location = required_str(resource, "location")?;
        let storage_class = resource
            .attributes
            .string_attr("storage_class")
            .unwrap_or_else(|| "STANDARD".to_string());
        let (region, group) = bucket_region_and_group(&location, &storage_class);

        let storage = PriceQuery::new(
            ProductFilter::gcp("Cloud Storage")
                .region(region)
                .attribute(AttributeFilter::eq("resource_group", group))
                .attribute(AttributeFilter::regex("description", NOT_EARLY_DELETE)),
        );

        Ok(Self { storage })
    }
}

impl CostModel for StorageBucket {
    fn queries(&self) -> Vec<PriceQuery> {
        vec![self.storage.clone()]
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let rate = results.rate(&self.storage);
        let mut costs = ResourceCosts::default();
        costs.dynamic(DynamicCost::new(
            "Storage",
            "GB",
            0.0,
            UsageFormula::linear(rate.usd),
        ));
        costs
    }
}
