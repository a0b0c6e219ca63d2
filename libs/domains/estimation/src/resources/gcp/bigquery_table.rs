use crate::attributes::AttributeExt;
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{AttributeFilter, PriceFilter, PriceQuery, PricedResults, ProductFilter};
use crate::region::{location_to_region, storage_api_region};
use crate::resources::gcp::bigquery_dataset::DEFAULT_LOCATION;
use crate::resources::{FromResource, ResourceIndex};

const DATASET_TYPE: &str = "google_bigquery_dataset";
const FREE_STORAGE_GB: f64 = 10.0;
const FREE_WRITE_API_GB: f64 = 2048.0;

fn bigquery_query(service: &str, region: &str, description: AttributeFilter, start_usage: &str) -> PriceQuery {
    PriceQuery::new(
        ProductFilter::gcp(service)
            .family("ApplicationServices")
            .region(region)
            .attribute(description),
    )
    .with_price_filter(PriceFilter::default().start_usage_amount(start_usage))
}

#[derive(Debug, Default)]
struct TableUsage {
    active_storage_gb: f64,
    long_term_storage_gb: f64,
    streaming_inserts_mb: f64,
    storage_write_api_gb: f64,
    storage_read_api_tb: f64,
}

#[derive(Debug)]
struct StorageApi {
    write: PriceQuery,
    read: PriceQuery,
}

/// `google_bigquery_table`: storage, streaming inserts and Storage API traffic
#[derive(Debug)]
pub struct BigQueryTable {
    usage: TableUsage,
    active_storage: PriceQuery,
    long_term_storage: PriceQuery,
    streaming_inserts: PriceQuery,
    storage_api: Option<StorageApi>,
}

/// Location of the dataset the table lives in.
///
/// `dataset_id` is either a reference to a dataset resource, or the literal
/// dataset id some dataset resource declares.
fn dataset_location<'a>(table: &Resource, index: &'a ResourceIndex) -> Option<&'a str> {
    let dataset = index
        .follow(table, "dataset_id")
        .filter(|r| r.resource_type == DATASET_TYPE)
        .or_else(|| {
            let id = table.attributes.str_attr("dataset_id")?;
            index.with_attribute(DATASET_TYPE, "dataset_id", id).into_iter().next()
        })?;
    dataset.attributes.str_attr("location")
}

impl FromResource for BigQueryTable {
    fn from_resource(_name: &str, resource: &Resource, index: &ResourceIndex) -> EstimateResult<Self> {
        let attributes = &resource.attributes;
        let region = location_to_region(dataset_location(resource, index).unwrap_or(DEFAULT_LOCATION));
        let usage_of = |key: &str| attributes.f64_attr(key).unwrap_or(0.0);

        let storage_api = storage_api_region(&region).map(|api| StorageApi {
            write: bigquery_query(
                "BigQuery Storage API",
                &region,
                AttributeFilter::eq("description", format!("BigQuery Storage API - Write ({api})")),
                "2048",
            ),
            read: bigquery_query(
                "BigQuery Storage API",
                &region,
                AttributeFilter::regex("description", "BigQuery Storage API - Read"),
                "0.0",
            ),
        });

        Ok(Self {
            usage: TableUsage {
                active_storage_gb: usage_of("monthly_active_storage_gb"),
                long_term_storage_gb: usage_of("monthly_long_term_storage_gb"),
                streaming_inserts_mb: usage_of("monthly_streaming_inserts_mb"),
                storage_write_api_gb: usage_of("monthly_storage_write_api_gb"),
                storage_read_api_tb: usage_of("monthly_storage_read_api_tb"),
            },
            active_storage: bigquery_query(
                "BigQuery",
                &region,
                AttributeFilter::eq("description", format!("Active Logical Storage ({region})")),
                "10.0",
            ),
            long_term_storage: bigquery_query(
                "BigQuery",
                &region,
                AttributeFilter::eq("description", format!("Long Term Logical Storage ({region})")),
                "10.0",
            ),
            streaming_inserts: bigquery_query(
                "BigQuery",
                &region,
                AttributeFilter::eq("description", format!("Streaming Insert ({region})")),
                "0.0",
            ),
            storage_api,
        })
    }
}

impl CostModel for BigQueryTable {
    fn queries(&self) -> Vec<PriceQuery> {
        let mut queries = vec![
            self.active_storage.clone(),
            self.long_term_storage.clone(),
            self.streaming_inserts.clone(),
        ];
        if let Some(api) = &self.storage_api {
            queries.push(api.write.clone());
            queries.push(api.read.clone());
        }
        queries
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let active = results.rate(&self.active_storage);
        let long_term = results.rate(&self.long_term_storage);
        let inserts = results.rate(&self.streaming_inserts);

        let mut costs = ResourceCosts::default();
        costs
            .dynamic(DynamicCost::new(
                "Active storage",
                active.unit_or("GB"),
                self.usage.active_storage_gb,
                UsageFormula::free_up_to(active.usd, FREE_STORAGE_GB),
            ))
            .dynamic(DynamicCost::new(
                "Long-term storage",
                long_term.unit_or("GB"),
                self.usage.long_term_storage_gb,
                UsageFormula::free_up_to(long_term.usd, FREE_STORAGE_GB),
            ))
            .dynamic(DynamicCost::new(
                "Streaming inserts",
                inserts.unit_or("MB"),
                self.usage.streaming_inserts_mb,
                UsageFormula::linear(inserts.usd),
            ));

        if let Some(api) = &self.storage_api {
            let write = results.rate(&api.write);
            let read = results.rate(&api.read);
            costs
                .dynamic(DynamicCost::new(
                    "Storage write API",
                    write.unit_or("GB"),
                    self.usage.storage_write_api_gb,
                    UsageFormula::free_up_to(write.usd, FREE_WRITE_API_GB),
                ))
                .dynamic(DynamicCost::new(
                    "Storage read API",
                    read.unit_or("TB"),
                    self.usage.storage_read_api_tb,
                    UsageFormula::linear(read.usd),
                ));
        }

        costs
    }
}
