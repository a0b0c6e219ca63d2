use crate::attributes::{AttributeExt, AttributeSet};
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{AttributeFilter, PriceFilter, PriceQuery, PricedResults, ProductFilter};
use crate::region::RegionTier;
use crate::resources::{FromResource, ResourceIndex, required_str};

pub(crate) const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const HOURS_PER_MONTH: f64 = 730.0;
const FREE_REQUESTS: f64 = 2_000_000.0;

pub(crate) fn cloud_run_query(region: &str, description: impl Into<String>, start_usage: &str) -> PriceQuery {
    PriceQuery::new(
        ProductFilter::gcp("Cloud Run")
            .family("ApplicationServices")
            .region(region)
            .attribute(AttributeFilter::eq("description", description)),
    )
    .with_price_filter(PriceFilter::default().start_usage_amount(start_usage))
}

/// Usage inputs of a service, as declared
#[derive(Debug, Clone, Default, PartialEq)]
struct ServiceUsage {
    cpu_limit: f64,
    memory_gib: f64,
    throttled: bool,
    min_instances: f64,
    monthly_requests: Option<f64>,
    average_request_ms: Option<f64>,
    concurrency: Option<f64>,
    instance_hours: Option<f64>,
}

impl ServiceUsage {
    fn from_attributes(attributes: &AttributeSet) -> Self {
        Self {
            cpu_limit: attributes.f64_attr("cpu_limit").unwrap_or(0.0),
            memory_gib: attributes.f64_attr("memory_limit").unwrap_or(0.0) / BYTES_PER_GIB,
            throttled: attributes.bool_attr("is_throttling_enabled").unwrap_or(false),
            min_instances: attributes.f64_attr("min_instance_count").unwrap_or(0.0),
            monthly_requests: attributes.f64_attr("monthly_requests"),
            average_request_ms: attributes.f64_attr("average_request_duration_ms"),
            concurrency: attributes.f64_attr("concurrent_requests_per_instance"),
            instance_hours: attributes.f64_attr("instance_hrs"),
        }
    }

    /// Allocation seconds of one unit of `per_instance` (vCPU or GiB).
    ///
    /// Throttled services are billed while serving requests only; otherwise
    /// minimum instances are billed for their declared or full-month hours.
    /// Unknown request figures give no estimate.
    fn allocation_seconds(&self, per_instance: f64) -> Option<f64> {
        if self.throttled {
            let requests = self.monthly_requests?;
            let seconds = self.average_request_ms? / 1000.0;
            let concurrency = self.concurrency?;
            return Some(requests * seconds / concurrency * per_instance);
        }
        match self.instance_hours {
            Some(hours) if hours > 0.0 => Some(hours * 3600.0 * per_instance * self.min_instances),
            _ => Some(self.min_instances * HOURS_PER_MONTH * 3600.0 * per_instance),
        }
    }

    fn cpu_seconds(&self) -> f64 {
        self.allocation_seconds(self.cpu_limit)
            .filter(|s| s.is_finite())
            .unwrap_or(0.0)
    }

    fn gib_seconds(&self) -> f64 {
        self.allocation_seconds(self.memory_gib)
            .filter(|s| s.is_finite())
            .unwrap_or(0.0)
    }
}

/// `google_cloud_run_v2_service`: CPU and memory allocation, requests
#[derive(Debug)]
pub struct CloudRunService {
    usage: ServiceUsage,
    cpu: PriceQuery,
    memory: PriceQuery,
    requests: PriceQuery,
}

impl FromResource for CloudRunService {
    fn from_resource(_name: &str, resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let region = required_str(resource, "location")?;
        let tier = RegionTier::of(&region);

        Ok(Self {
            usage: ServiceUsage::from_attributes(&resource.attributes),
            cpu: cloud_run_query(&region, tier.describe("CPU Allocation Time"), "0.0"),
            memory: cloud_run_query(&region, tier.describe("Memory Allocation Time"), "0.0"),
            requests: cloud_run_query("global", "Requests", "2000000.0"),
        })
    }
}

impl CostModel for CloudRunService {
    fn queries(&self) -> Vec<PriceQuery> {
        vec![self.cpu.clone(), self.memory.clone(), self.requests.clone()]
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let cpu = results.rate(&self.cpu);
        let memory = results.rate(&self.memory);
        let requests = results.rate(&self.requests);

        let mut costs = ResourceCosts::default();
        costs
            .dynamic(DynamicCost::new(
                "CPU allocation time",
                cpu.unit_or("vCPU-seconds"),
                self.usage.cpu_seconds(),
                UsageFormula::linear(cpu.usd),
            ))
            .dynamic(DynamicCost::new(
                "Memory allocation time",
                memory.unit_or("GiB-seconds"),
                self.usage.gib_seconds(),
                UsageFormula::linear(memory.usd),
            ))
            .dynamic(DynamicCost::new(
                "Number of requests",
                requests.unit_or("requests"),
                self.usage.monthly_requests.unwrap_or(0.0),
                UsageFormula::free_up_to(requests.usd, FREE_REQUESTS),
            ));
        costs
    }
}
