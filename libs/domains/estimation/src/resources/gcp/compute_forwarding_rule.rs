use crate::attributes::AttributeExt;
use crate::config::Resource;
use crate::cost::{CostModel, FixedCost, ResourceCosts};
use crate::error::EstimateResult;
use crate::pricing::{AttributeFilter, PriceFilter, PriceQuery, PricedResults, ProductFilter};
use crate::resources::{FromResource, ResourceIndex};

/// Hours billed for a forwarding rule in a month
const MONTHLY_HOURS: f64 = 24.0 * 30.0;

/// `google_compute_forwarding_rule`: minimum forwarding rule charge
#[derive(Debug)]
pub struct ComputeForwardingRule {
    forwarding: PriceQuery,
}

impl FromResource for ComputeForwardingRule {
    fn from_resource(_name: &str, resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let mut filter = ProductFilter::gcp("Networking").family("Network").attribute(
            AttributeFilter::regex("description", "/^Cloud Load Balancer Forwarding Rule Minimum/i"),
        );
        filter.region = resource.attributes.string_attr("region");

        Ok(Self {
            forwarding: PriceQuery::new(filter)
                .with_price_filter(PriceFilter::default().purchase_option("OnDemand")),
        })
    }
}

impl CostModel for ComputeForwardingRule {
    fn queries(&self) -> Vec<PriceQuery> {
        vec![self.forwarding.clone()]
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let rate = results.rate(&self.forwarding);
        let mut costs = ResourceCosts::default();
        costs.fixed(FixedCost::new(
            "Forwarding rules",
            rate.unit_or("hours"),
            MONTHLY_HOURS,
            rate.usd,
        ));
        costs
    }
}
