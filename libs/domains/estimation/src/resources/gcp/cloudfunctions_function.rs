use crate::attributes::AttributeExt;
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{AttributeFilter, PriceFilter, PriceQuery, PricedResults, ProductFilter};
use crate::resources::{FromResource, ResourceIndex};

const DEFAULT_REGION: &str = "us-central1";
const DEFAULT_MEMORY_MB: f64 = 256.0;
const DEFAULT_DURATION_MS: f64 = 100.0;
const FREE_INVOCATIONS: f64 = 2_000_000.0;

fn functions_query(region: &str, pattern: &str, start_usage: &str) -> PriceQuery {
    PriceQuery::new(
        ProductFilter::gcp("Cloud Run Functions")
            .family("ApplicationServices")
            .region(region)
            .attribute(AttributeFilter::regex("description", pattern)),
    )
    .with_price_filter(PriceFilter::default().start_usage_amount(start_usage))
}

/// `google_cloudfunctions_function` (1st gen): compute time and invocations
#[derive(Debug)]
pub struct CloudFunctionsFunction {
    invocations: f64,
    memory_mb: f64,
    duration_ms: f64,
    cpu: PriceQuery,
    memory: PriceQuery,
    calls: PriceQuery,
}

impl CloudFunctionsFunction {
    /// Memory is billed per GiB, CPU per GHz scaled from memory in decimal units
    fn gb_seconds(&self) -> f64 {
        self.invocations * (self.memory_mb / 1024.0) * (self.duration_ms / 1000.0)
    }

    fn ghz_seconds(&self) -> f64 {
        self.invocations * (self.memory_mb / 1000.0) * (self.duration_ms / 1000.0)
    }
}

impl FromResource for CloudFunctionsFunction {
    fn from_resource(_name: &str, resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let attributes = &resource.attributes;
        let region = attributes
            .string_attr("region")
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let positive = |key: &str, default: f64| {
            attributes
                .f64_attr(key)
                .filter(|v| *v != 0.0)
                .unwrap_or(default)
        };

        Ok(Self {
            invocations: attributes.f64_attr("monthly_function_invocations").unwrap_or(0.0),
            memory_mb: positive("available_memory_mb", DEFAULT_MEMORY_MB),
            duration_ms: positive("request_duration_ms", DEFAULT_DURATION_MS),
            cpu: functions_query(&region, r"\(1st Gen\) CPU Time", "0.0"),
            memory: functions_query(&region, r"\(1st Gen\) Memory Time", "0.0"),
            calls: functions_query("global", r"\(1st Gen\) Invocations", "2000000.0"),
        })
    }
}

impl CostModel for CloudFunctionsFunction {
    fn queries(&self) -> Vec<PriceQuery> {
        vec![self.cpu.clone(), self.memory.clone(), self.calls.clone()]
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let cpu = results.rate(&self.cpu);
        let memory = results.rate(&self.memory);
        let calls = results.rate(&self.calls);

        let mut costs = ResourceCosts::default();
        costs
            .dynamic(DynamicCost::new(
                "CPU",
                cpu.unit_or("GHz-seconds"),
                self.ghz_seconds(),
                UsageFormula::linear(cpu.usd),
            ))
            .dynamic(DynamicCost::new(
                "Memory",
                memory.unit_or("GB-seconds"),
                self.gb_seconds(),
                UsageFormula::linear(memory.usd),
            ))
            .dynamic(DynamicCost::new(
                "Invocations",
                calls.unit_or("invocations"),
                self.invocations,
                UsageFormula::free_up_to(calls.usd, FREE_INVOCATIONS),
            ));
        costs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{assemble_missing, description, resource};
    use serde_json::json;

    #[test]
    fn test_defaults_and_usage() {
        let r = resource(
            "google_cloudfunctions_function",
            "hook",
            json!({ "monthly_function_invocations": 1000000 }),
        );
        let model = CloudFunctionsFunction::from_resource("hook", &r, &ResourceIndex::default()).unwrap();

        assert_eq!(model.cpu.product_filter.region.as_deref(), Some("us-central1"));
        assert_eq!(model.calls.product_filter.region.as_deref(), Some("global"));
        assert_eq!(description(&model.memory).1, Some(r"\(1st Gen\) Memory Time"));

        assert!((model.gb_seconds() - 25000.0).abs() < 1e-6);
        assert!((model.ghz_seconds() - 25600.0).abs() < 1e-6);

        let costs = assemble_missing(&model);
        let names: Vec<_> = costs.dynamic_costs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["CPU", "Memory", "Invocations"]);
        assert_eq!(costs.dynamic_costs[0].unit, "GHz-seconds");
        assert_eq!(costs.dynamic_costs[2].unit, "invocations");
    }

    #[test]
    fn test_declared_memory_and_duration() {
        let r = resource(
            "google_cloudfunctions_function",
            "hook",
            json!({
                "region": "europe-west1",
                "available_memory_mb": 1024,
                "request_duration_ms": 500,
                "monthly_function_invocations": 10
            }),
        );
        let model = CloudFunctionsFunction::from_resource("hook", &r, &ResourceIndex::default()).unwrap();
        assert_eq!(model.gb_seconds(), 5.0);
        assert!((model.ghz_seconds() - 5.12).abs() < 1e-9);
    }
}
