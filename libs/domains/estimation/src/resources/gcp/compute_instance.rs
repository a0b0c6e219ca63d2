use crate::attributes::AttributeExt;
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{AttributeFilter, PriceFilter, PriceQuery, PricedResults, ProductFilter};
use crate::region::zone_to_region;
use crate::resources::gcp::compute_disk::{DiskType, capacity_query, storage_query};
use crate::resources::{FromResource, ResourceIndex, required_str};

const HOURS_PER_MONTH: f64 = 730.0;
const LOCAL_SSD_GB: f64 = 375.0;
const DEFAULT_PURCHASE_OPTION: &str = "OnDemand";

#[derive(Debug)]
struct Accelerator {
    accelerator_type: String,
    query: PriceQuery,
}

#[derive(Debug)]
struct BootDisk {
    disk_type: String,
    size: f64,
    query: PriceQuery,
}

/// `google_compute_instance`: machine hours, boot and scratch disks, GPUs
#[derive(Debug)]
pub struct ComputeInstance {
    machine_type: String,
    purchase_option: String,
    monthly_hours: f64,
    scratch_disks: f64,
    usage: PriceQuery,
    boot_disk: Option<BootDisk>,
    scratch: Option<PriceQuery>,
    accelerators: Vec<Accelerator>,
}

fn is_preemptible(purchase_option: &str) -> bool {
    purchase_option.eq_ignore_ascii_case("preemptible")
}

/// Capitalize each whitespace-separated word, lowercasing the rest
fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// `nvidia-tesla-t4` -> `/^Nvidia Tesla T4 GPU running/`; empty for single-word types
fn accelerator_pattern(accelerator_type: &str, purchase_option: &str) -> String {
    let parts: Vec<&str> = accelerator_type.split('-').collect();
    if parts.len() < 2 {
        return String::new();
    }
    let prefix = format!("{} {} GPU", title_case(parts[0]), title_case(&parts[1..].join(" ")));
    if is_preemptible(purchase_option) {
        format!("/^{prefix} attached to Spot Preemptible VMs running/")
    } else {
        format!("/^{prefix} running/")
    }
}

fn scratch_pattern(purchase_option: &str) -> &'static str {
    if is_preemptible(purchase_option) {
        "/^SSD backed Local Storage attached to Spot Preemptible VMs/"
    } else {
        "/^SSD backed Local Storage( in .*)?$/"
    }
}

impl FromResource for ComputeInstance {
    fn from_resource(_name: &str, resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let attributes = &resource.attributes;
        let region = zone_to_region(&required_str(resource, "zone")?);
        let machine_type = required_str(resource, "machine_type")?;
        let purchase_option = attributes
            .string_attr("purchase_option")
            .unwrap_or_else(|| DEFAULT_PURCHASE_OPTION.to_string());
        let scratch_disks = attributes.f64_attr("scratch_disks").unwrap_or(0.0);

        let usage = PriceQuery::new(
            ProductFilter::gcp("Compute Engine")
                .family("Compute Instance")
                .region(&region)
                .attribute(AttributeFilter::regex("machineType", format!("^{machine_type}$"))),
        )
        .with_price_filter(PriceFilter::default().purchase_option(&purchase_option));

        let boot_disk = attributes
            .bool_attr("has_boot_disk")
            .unwrap_or(false)
            .then(|| {
                let disk_type = attributes
                    .string_attr("boot_disk_type")
                    .unwrap_or_else(|| "pd-standard".to_string());
                BootDisk {
                    size: attributes.f64_attr("boot_disk_size").unwrap_or(0.0),
                    query: capacity_query(&region, DiskType::parse(&disk_type)),
                    disk_type,
                }
            });

        let scratch = (scratch_disks > 0.0).then(|| storage_query(&region, scratch_pattern(&purchase_option)));

        let accelerators = attributes
            .blocks("guest_accelerators")
            .into_iter()
            .filter_map(|block| block.string_attr("type"))
            .map(|accelerator_type| Accelerator {
                query: PriceQuery::new(
                    ProductFilter::gcp("Compute Engine")
                        .family("Compute")
                        .region(&region)
                        .attribute(AttributeFilter::regex(
                            "description",
                            accelerator_pattern(&accelerator_type, &purchase_option),
                        )),
                )
                .with_price_filter(PriceFilter::default().start_usage_amount("0.0")),
                accelerator_type,
            })
            .collect();

        Ok(Self {
            machine_type,
            monthly_hours: attributes
                .f64_attr("monthly_hrs")
                .filter(|h| *h != 0.0)
                .unwrap_or(HOURS_PER_MONTH),
            purchase_option,
            scratch_disks,
            usage,
            boot_disk,
            scratch,
            accelerators,
        })
    }
}

impl CostModel for ComputeInstance {
    fn queries(&self) -> Vec<PriceQuery> {
        let mut queries = vec![self.usage.clone()];
        queries.extend(self.boot_disk.as_ref().map(|d| d.query.clone()));
        queries.extend(self.scratch.clone());
        queries.extend(self.accelerators.iter().map(|a| a.query.clone()));
        queries
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let mut costs = ResourceCosts::default();

        let usage = results.rate(&self.usage);
        costs.dynamic(DynamicCost::new(
            format!(
                "Instance usage (Linux/UNIX, {}, {})",
                self.purchase_option, self.machine_type
            ),
            usage.unit_or("hours"),
            self.monthly_hours,
            UsageFormula::linear(usage.usd),
        ));

        if let Some(disk) = &self.boot_disk {
            let rate = results.rate(&disk.query);
            costs.dynamic(DynamicCost::new(
                format!("Boot disk ({})", disk.disk_type),
                rate.unit_or("GB"),
                disk.size,
                UsageFormula::linear(rate.usd),
            ));
        }

        if let Some(query) = &self.scratch {
            let rate = results.rate(query);
            costs.dynamic(DynamicCost::new(
                "Local SSD provisioned storage",
                rate.unit_or("GB"),
                LOCAL_SSD_GB * self.scratch_disks,
                UsageFormula::linear(rate.usd),
            ));
        }

        for accelerator in &self.accelerators {
            let rate = results.rate(&accelerator.query);
            costs.dynamic(DynamicCost::new(
                format!("Guest accelerator ({})", accelerator.accelerator_type),
                rate.unit_or("hours"),
                self.monthly_hours,
                UsageFormula::linear(rate.usd),
            ));
        }

        costs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{assemble_at, description, resource};
    use serde_json::json;

    #[test]
    fn test_minimal_instance() {
        let r = resource(
            "google_compute_instance",
            "vm",
            json!({ "zone": "us-central1-a", "machine_type": "e2-medium" }),
        );
        let model = ComputeInstance::from_resource("vm", &r, &ResourceIndex::default()).unwrap();
        assert_eq!(model.queries().len(), 1);
        assert_eq!(
            model.usage.price_filter.as_ref().and_then(|p| p.purchase_option.as_deref()),
            Some("OnDemand")
        );

        let costs = assemble_at(&model, "0.0335");
        let usage = &costs.dynamic_costs[0];
        assert_eq!(usage.name, "Instance usage (Linux/UNIX, OnDemand, e2-medium)");
        assert_eq!(usage.default_units, 730.0);
        assert!((usage.default_cost() - 24.455).abs() < 1e-9);
    }

    #[test]
    fn test_disks_and_accelerators() {
        let r = resource(
            "google_compute_instance",
            "gpu",
            json!({
                "zone": "europe-west4-b",
                "machine_type": "n1-standard-8",
                "purchase_option": "preemptible",
                "has_boot_disk": true,
                "boot_disk_type": "pd-ssd",
                "boot_disk_size": 50,
                "scratch_disks": 2,
                "monthly_hrs": 100,
                "guest_accelerators": [{ "type": "nvidia-tesla-t4", "count": 1 }]
            }),
        );
        let model = ComputeInstance::from_resource("gpu", &r, &ResourceIndex::default()).unwrap();
        assert_eq!(model.queries().len(), 4);
        assert_eq!(
            description(model.scratch.as_ref().unwrap()).1,
            Some("/^SSD backed Local Storage attached to Spot Preemptible VMs/")
        );
        assert_eq!(
            description(&model.accelerators[0].query).1,
            Some("/^Nvidia Tesla T4 GPU attached to Spot Preemptible VMs running/")
        );

        let costs = assemble_at(&model, "1");
        let summary: Vec<_> = costs
            .dynamic_costs
            .iter()
            .map(|c| (c.name.as_str(), c.default_units))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Instance usage (Linux/UNIX, preemptible, n1-standard-8)", 100.0),
                ("Boot disk (pd-ssd)", 50.0),
                ("Local SSD provisioned storage", 750.0),
                ("Guest accelerator (nvidia-tesla-t4)", 100.0),
            ]
        );
    }

    #[test]
    fn test_accelerator_patterns() {
        assert_eq!(
            accelerator_pattern("nvidia-l4", "OnDemand"),
            "/^Nvidia L4 GPU running/"
        );
        assert_eq!(accelerator_pattern("tpu", "OnDemand"), "");
    }

    #[test]
    fn test_zone_is_required() {
        let r = resource("google_compute_instance", "vm", json!({ "machine_type": "e2-small" }));
        assert!(ComputeInstance::from_resource("vm", &r, &ResourceIndex::default()).is_err());
    }
}
