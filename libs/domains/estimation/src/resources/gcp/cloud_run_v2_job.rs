use crate::attributes::AttributeExt;
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{PriceQuery, PricedResults};
use crate::resources::gcp::cloud_run_v2_service::{BYTES_PER_GIB, cloud_run_query};
use crate::resources::{FromResource, ResourceIndex, required_str};

/// `google_cloud_run_v2_job`: CPU and memory allocated by executions
#[derive(Debug)]
pub struct CloudRunJob {
    cpu_seconds: f64,
    gib_seconds: f64,
    cpu: PriceQuery,
    memory: PriceQuery,
}

impl FromResource for CloudRunJob {
    fn from_resource(_name: &str, resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let region = required_str(resource, "location")?;
        let attributes = &resource.attributes;

        let cpu_limit = attributes.f64_attr("cpu_limit").unwrap_or(0.0);
        let memory_gib = attributes.f64_attr("memory_limit").unwrap_or(0.0) / BYTES_PER_GIB;
        let task_count = attributes.f64_attr("task_count").unwrap_or(1.0);

        // task-seconds per month; unknown without both usage figures
        let task_seconds = attributes
            .f64_attr("monthly_job_executions")
            .zip(attributes.f64_attr("average_task_execution_mins"))
            .map(|(executions, minutes)| executions * task_count * minutes * 60.0);

        Ok(Self {
            cpu_seconds: task_seconds.map(|s| s * cpu_limit).unwrap_or(0.0),
            gib_seconds: task_seconds.map(|s| s * memory_gib).unwrap_or(0.0),
            cpu: cloud_run_query(&region, format!("CPU Allocation Time (Jobs) in {region}"), "0.0"),
            memory: cloud_run_query(&region, format!("Memory Allocation Time (Jobs) in {region}"), "0.0"),
        })
    }
}

impl CostModel for CloudRunJob {
    fn queries(&self) -> Vec<PriceQuery> {
        vec![self.cpu.clone(), self.memory.clone()]
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let cpu = results.rate(&self.cpu);
        let memory = results.rate(&self.memory);

        let mut costs = ResourceCosts::default();
        costs
            .dynamic(DynamicCost::new(
                "CPU allocation time",
                cpu.unit_or("vCPU-seconds"),
                self.cpu_seconds,
                UsageFormula::linear(cpu.usd),
            ))
            .dynamic(DynamicCost::new(
                "Memory allocation time",
                memory.unit_or("GiB-seconds"),
                self.gib_seconds,
                UsageFormula::linear(memory.usd),
            ));
        costs
    }
}
