use crate::attributes::AttributeExt;
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{AttributeFilter, PriceFilter, PriceQuery, PricedResults, ProductFilter};
use crate::region::location_to_region;
use crate::resources::{FromResource, ResourceIndex};

/// Location BigQuery uses when a dataset declares none
pub(crate) const DEFAULT_LOCATION: &str = "US";

/// Free on-demand analysis per month, in TB
const FREE_QUERY_TB: f64 = 1.0;

/// `google_bigquery_dataset`: on-demand query analysis
#[derive(Debug)]
pub struct BigQueryDataset {
    monthly_queries_tb: f64,
    analysis: PriceQuery,
}

impl FromResource for BigQueryDataset {
    fn from_resource(_name: &str, resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let attributes = &resource.attributes;
        let region = location_to_region(attributes.str_attr("location").unwrap_or(DEFAULT_LOCATION));

        let analysis = PriceQuery::new(
            ProductFilter::gcp("BigQuery")
                .family("ApplicationServices")
                .region(&region)
                .attribute(AttributeFilter::eq("description", format!("Analysis ({region})"))),
        )
        .with_price_filter(PriceFilter::default().start_usage_amount("1.0"));

        Ok(Self {
            monthly_queries_tb: attributes.f64_attr("monthly_queries_tb").unwrap_or(0.0),
            analysis,
        })
    }
}

impl CostModel for BigQueryDataset {
    fn queries(&self) -> Vec<PriceQuery> {
        vec![self.analysis.clone()]
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let rate = results.rate(&self.analysis);
        let mut costs = ResourceCosts::default();
        costs.dynamic(DynamicCost::new(
            "Queries (on-demand)",
            rate.unit_or("TB"),
            self.monthly_queries_tb,
            UsageFormula::free_up_to(rate.usd, FREE_QUERY_TB),
        ));
        costs
    }
}
