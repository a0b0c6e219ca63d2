use crate::attributes::AttributeExt;
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, FixedCost, ResourceCosts, UsageFormula};
use crate::error::EstimateResult;
use crate::pricing::{AttributeFilter, PriceFilter, PriceQuery, PricedResults, ProductFilter};
use crate::region::zone_to_region;
use crate::resources::{FromResource, ResourceIndex, required_str};

/// Bound on image/snapshot/disk reference chains
const MAX_REFERENCE_DEPTH: usize = 8;

/// Persistent disk type, as far as pricing distinguishes them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskType {
    Balanced,
    Ssd,
    Extreme,
    HyperdiskExtreme,
    Standard,
}

impl DiskType {
    pub fn parse(value: &str) -> Self {
        match value {
            "pd-balanced" => DiskType::Balanced,
            "pd-ssd" => DiskType::Ssd,
            "pd-extreme" => DiskType::Extreme,
            "hyperdisk-extreme" => DiskType::HyperdiskExtreme,
            _ => DiskType::Standard,
        }
    }

    /// Catalog description pattern of the capacity SKU
    pub fn capacity_pattern(self) -> &'static str {
        match self {
            DiskType::Balanced => "/^Balanced PD Capacity/",
            DiskType::Ssd => "/^SSD backed PD Capacity/",
            DiskType::Extreme => "/^Extreme PD Capacity/",
            DiskType::HyperdiskExtreme => "/^Hyperdisk Extreme Capacity( in .*)?$/",
            DiskType::Standard => "/^Storage PD Capacity/",
        }
    }

    pub fn iops_pattern(self) -> Option<&'static str> {
        match self {
            DiskType::Extreme => Some("/^Extreme PD IOPS/"),
            DiskType::HyperdiskExtreme => Some("/^Hyperdisk Extreme IOPS( in .*)?$/"),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DiskType::Balanced => "Balanced provisioned storage (pd-balanced)",
            DiskType::Ssd => "SSD provisioned storage (pd-ssd)",
            DiskType::Extreme => "Extreme provisioned storage (pd-extreme)",
            DiskType::HyperdiskExtreme => "Hyperdisk provisioned storage (hyperdisk-extreme)",
            DiskType::Standard => "Standard provisioned storage (pd-standard)",
        }
    }

    /// Size in GB when nothing else determines it
    pub fn default_size(self) -> f64 {
        match self {
            DiskType::Balanced | DiskType::Ssd => 100.0,
            DiskType::Extreme | DiskType::HyperdiskExtreme => 1000.0,
            DiskType::Standard => 500.0,
        }
    }
}

/// Capacity query for a disk type in a region
pub(crate) fn capacity_query(region: &str, disk_type: DiskType) -> PriceQuery {
    storage_query(region, disk_type.capacity_pattern())
}

pub(crate) fn storage_query(region: &str, description_pattern: &str) -> PriceQuery {
    PriceQuery::new(
        ProductFilter::gcp("Compute Engine")
            .family("Storage")
            .region(region)
            .attribute(AttributeFilter::regex("description", description_pattern)),
    )
    .with_price_filter(PriceFilter::default().start_usage_amount("0.0"))
}

/// `google_compute_disk`: provisioned capacity, plus IOPS for extreme types
#[derive(Debug)]
pub struct ComputeDisk {
    disk_type: DiskType,
    size: f64,
    iops: f64,
    capacity: PriceQuery,
    provisioned_iops: Option<PriceQuery>,
}

impl FromResource for ComputeDisk {
    fn from_resource(_name: &str, resource: &Resource, index: &ResourceIndex) -> EstimateResult<Self> {
        let region = zone_to_region(&required_str(resource, "zone")?);
        let disk_type = DiskType::parse(resource.attributes.str_attr("type").unwrap_or_default());
        let size = disk_size(resource, index, 0);
        let iops = resource.attributes.f64_attr("iops").unwrap_or(0.0);

        Ok(Self {
            disk_type,
            size,
            iops,
            capacity: capacity_query(&region, disk_type),
            provisioned_iops: disk_type
                .iops_pattern()
                .map(|pattern| storage_query(&region, pattern)),
        })
    }
}

impl CostModel for ComputeDisk {
    fn queries(&self) -> Vec<PriceQuery> {
        std::iter::once(self.capacity.clone())
            .chain(self.provisioned_iops.clone())
            .collect()
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let mut costs = ResourceCosts::default();

        let capacity = results.rate(&self.capacity);
        costs.fixed(FixedCost::new(
            self.disk_type.label(),
            capacity.unit_or("gigabyte month"),
            self.size,
            capacity.usd,
        ));

        if let Some(query) = &self.provisioned_iops {
            let rate = results.rate(query);
            costs.dynamic(DynamicCost::new(
                "Provisioned IOPS",
                rate.unit_or("IOPS"),
                self.iops,
                UsageFormula::linear(rate.usd),
            ));
        }

        costs
    }
}

/// Declared size, else the size implied by a referenced image or snapshot,
/// else the type default.
fn disk_size(disk: &Resource, index: &ResourceIndex, depth: usize) -> f64 {
    if let Some(size) = disk.attributes.f64_attr("size").filter(|s| *s != 0.0) {
        return size;
    }
    if depth < MAX_REFERENCE_DEPTH {
        if let Some(image) = index.follow(disk, "image") {
            return image_size(image, index, depth + 1);
        }
        if let Some(snapshot) = index.follow(disk, "snapshot") {
            return snapshot_size(snapshot, index, depth + 1);
        }
    }
    DiskType::parse(disk.attributes.str_attr("type").unwrap_or_default()).default_size()
}

fn image_size(image: &Resource, index: &ResourceIndex, depth: usize) -> f64 {
    if let Some(size) = image.attributes.f64_attr("disk_size_gb").filter(|s| *s != 0.0) {
        return size;
    }
    if depth >= MAX_REFERENCE_DEPTH {
        return 0.0;
    }
    if let Some(disk) = index.follow(image, "source_disk") {
        return disk_size(disk, index, depth + 1);
    }
    if let Some(source) = index.follow(image, "source_image") {
        return image_size(source, index, depth + 1);
    }
    if let Some(snapshot) = index.follow(image, "source_snapshot") {
        return snapshot_size(snapshot, index, depth + 1);
    }
    0.0
}

fn snapshot_size(snapshot: &Resource, index: &ResourceIndex, depth: usize) -> f64 {
    match index.follow(snapshot, "source_disk") {
        Some(disk) if depth < MAX_REFERENCE_DEPTH => disk_size(disk, index, depth + 1),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{assemble_at, assemble_missing, description, resource};
    use serde_json::json;

    fn build(attributes: serde_json::Value, siblings: &[Resource]) -> ComputeDisk {
        let disk = resource("google_compute_disk", "data", attributes);
        let index = ResourceIndex::new(siblings.iter().chain(std::iter::once(&disk)));
        ComputeDisk::from_resource("data", &disk, &index).unwrap()
    }

    #[test]
    fn test_ssd_disk_fixed_capacity() {
        let model = build(json!({ "zone": "us-central1-a", "type": "pd-ssd", "size": 200 }), &[]);

        assert_eq!(model.capacity.product_filter.region.as_deref(), Some("us-central1"));
        assert_eq!(description(&model.capacity).1, Some("/^SSD backed PD Capacity/"));
        assert!(model.provisioned_iops.is_none());

        let costs = assemble_at(&model, "0.17");
        assert_eq!(costs.fixed_costs.len(), 1);
        assert_eq!(costs.fixed_costs[0].name, "SSD provisioned storage (pd-ssd)");
        assert_eq!(costs.fixed_costs[0].quantity, 200.0);
        assert!((costs.fixed_costs[0].monthly_cost - 34.0).abs() < 1e-9);
        assert!(costs.dynamic_costs.is_empty());
    }

    #[test]
    fn test_extreme_disk_adds_iops() {
        let model = build(
            json!({ "zone": "europe-west1-b", "type": "hyperdisk-extreme", "iops": 5000 }),
            &[],
        );
        assert_eq!(model.queries().len(), 2);
        assert_eq!(model.size, 1000.0);

        let costs = assemble_at(&model, "0.01");
        assert_eq!(costs.dynamic_costs[0].name, "Provisioned IOPS");
        assert_eq!(costs.dynamic_costs[0].default_units, 5000.0);
        assert!((costs.dynamic_costs[0].default_cost() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_sizes_and_labels() {
        let standard = build(json!({ "zone": "us-east1-c" }), &[]);
        assert_eq!(standard.size, 500.0);
        assert_eq!(standard.disk_type.label(), "Standard provisioned storage (pd-standard)");
        assert_eq!(build(json!({ "zone": "us-east1-c", "type": "pd-balanced" }), &[]).size, 100.0);
    }

    #[test]
    fn test_size_from_referenced_image_and_snapshot() {
        let image = resource("google_compute_image", "base", json!({ "disk_size_gb": 30 }));
        let model = build(
            json!({ "zone": "us-east1-c", "image": "${google_compute_image.base.self_link}" }),
            std::slice::from_ref(&image),
        );
        assert_eq!(model.size, 30.0);

        let source = resource("google_compute_disk", "source", json!({ "zone": "us-east1-c", "size": 64 }));
        let snapshot = resource(
            "google_compute_snapshot",
            "snap",
            json!({ "source_disk": "${google_compute_disk.source.id}" }),
        );
        let model = build(
            json!({ "zone": "us-east1-c", "snapshot": "${google_compute_snapshot.snap.id}" }),
            &[source, snapshot],
        );
        assert_eq!(model.size, 64.0);
    }

    #[test]
    fn test_missing_price_keeps_default_unit() {
        let model = build(json!({ "zone": "us-central1-a", "size": 10 }), &[]);
        let costs = assemble_missing(&model);
        assert_eq!(costs.fixed_costs[0].unit, "gigabyte month");
        assert_eq!(costs.fixed_costs[0].monthly_cost, 0.0);
    }
}
