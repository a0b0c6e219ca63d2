use crate::attributes::AttributeExt;
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{AttributeFilter, PriceFilter, PriceQuery, PricedResults, ProductFilter};
use crate::resources::{FromResource, ResourceIndex};

/// `google_compute_address`: static IP held while unused
#[derive(Debug)]
pub struct ComputeAddress {
    static_ip: PriceQuery,
}

impl FromResource for ComputeAddress {
    fn from_resource(_name: &str, resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let mut filter = ProductFilter::gcp("Compute Engine")
            .family("Network")
            .attribute(AttributeFilter::regex("description", "^Static Ip Charge.*"));
        filter.region = resource.attributes.string_attr("region");

        Ok(Self {
            static_ip: PriceQuery::new(filter)
                .with_price_filter(PriceFilter::default().start_usage_amount("1.0")),
        })
    }
}

impl CostModel for ComputeAddress {
    fn queries(&self) -> Vec<PriceQuery> {
        vec![self.static_ip.clone()]
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let rate = results.rate(&self.static_ip);
        let mut costs = ResourceCosts::default();
        costs.dynamic(DynamicCost::new(
            "IP address (unused)",
            rate.unit_or("hours"),
            0.0,
            UsageFormula::linear(rate.usd),
        ));
        costs
    }
}
