use crate::attributes::{AttributeExt, AttributeSet};
use crate::config::Resource;
use crate::cost::{CostModel, DynamicCost, FixedCost, ResourceCosts, UsageFormula};
use crate::error::{EstimateError, EstimateResult};
use crate::pricing::{AttributeFilter, PriceQuery, PricedResults, ProductFilter};
use crate::resources::{FromResource, ResourceIndex, required_str};
use strum::Display;

const HOURS_PER_MONTH: f64 = 730.0;
const LIGHTWEIGHT_RAM_MB: f64 = 3840.0;
const STANDARD_RAM_MB_PER_VCPU: f64 = 3840.0;
const HIGHMEM_RAM_MB_PER_VCPU: f64 = 6656.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DatabaseEngine {
    MySQL,
    PostgreSQL,
    #[strum(serialize = "SQL Server")]
    SqlServer,
}

impl DatabaseEngine {
    pub fn from_version(version: &str) -> Self {
        let version = version.to_lowercase();
        if version.starts_with("postgres") {
            DatabaseEngine::PostgreSQL
        } else if version.starts_with("sqlserver") {
            DatabaseEngine::SqlServer
        } else {
            DatabaseEngine::MySQL
        }
    }
}

/// Machine tier, e.g. `db-f1-micro`, `db-custom-2-7680`, `db-n1-standard-4`
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseTier(String);

impl DatabaseTier {
    fn lower(&self) -> String {
        self.0.to_lowercase()
    }

    fn parts(&self) -> Vec<&str> {
        self.0.split('-').collect()
    }

    /// Catalog resource group of shared-core tiers
    pub fn shared_group(&self) -> Option<&'static str> {
        match self.lower().as_str() {
            "db-f1-micro" => Some("SQLGen2InstancesF1Micro"),
            "db-g1-small" => Some("SQLGen2InstancesG1Small"),
            _ => None,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.lower().starts_with("db-custom-")
    }

    pub fn vcpus(&self) -> Option<f64> {
        let parts = self.parts();
        if parts.len() < 3 {
            return None;
        }
        let index = if self.is_custom() { 2 } else { parts.len() - 1 };
        parts[index].parse().ok()
    }

    pub fn memory_gb(&self) -> Option<f64> {
        let lower = self.lower();
        if self.is_custom() {
            let parts = self.parts();
            if parts.len() < 4 {
                return None;
            }
            return parts.last()?.parse::<f64>().ok().map(|mb| mb / 1024.0);
        }
        if lower.starts_with("db-n1-standard-") {
            return self.vcpus().map(|v| v * STANDARD_RAM_MB_PER_VCPU / 1024.0);
        }
        if lower.starts_with("db-n1-highmem-") {
            return self.vcpus().map(|v| v * HIGHMEM_RAM_MB_PER_VCPU / 1024.0);
        }
        self.shared_group().map(|_| LIGHTWEIGHT_RAM_MB / 1024.0)
    }
}

#[derive(Debug)]
enum InstanceQueries {
    Shared { query: PriceQuery, memory_gb: f64 },
    Dedicated { memory: PriceQuery, cpu: PriceQuery, vcpus: f64 },
}

/// `google_sql_database_instance`: storage, idle public IP, instance time
#[derive(Debug)]
pub struct SqlDatabaseInstance {
    disk_type: String,
    disk_size: f64,
    storage: PriceQuery,
    public_ip: Option<PriceQuery>,
    instance: InstanceQueries,
}

fn cloud_sql_filter(region: Option<&str>) -> ProductFilter {
    let mut filter = ProductFilter::gcp("Cloud SQL");
    filter.region = region.map(str::to_string);
    filter
}

/// `ZONAL` -> `Zonal`
fn title_case(value: &str) -> String {
    let lower = value.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl FromResource for SqlDatabaseInstance {
    fn from_resource(_name: &str, resource: &Resource, _index: &ResourceIndex) -> EstimateResult<Self> {
        let attributes = &resource.attributes;
        let empty = AttributeSet::new();
        let settings = attributes.block("settings").unwrap_or(&empty);
        let ip_configuration = settings.block("ip_configuration");

        let engine = DatabaseEngine::from_version(&required_str(resource, "database_version")?);
        let region = attributes.string_attr("region");
        let availability = title_case(
            settings
                .str_attr("availability_type")
                .or_else(|| attributes.str_attr("availability_type"))
                .unwrap_or("ZONAL"),
        );
        let disk_type = settings
            .string_attr("disk_type")
            .unwrap_or_else(|| "PD_SSD".to_string());
        let disk_size = settings
            .f64_attr("disk_size")
            .filter(|s| *s != 0.0)
            .unwrap_or(10.0);
        let public_ip = ip_configuration
            .and_then(|ip| ip.bool_attr("ipv4_enabled"))
            .unwrap_or(false);
        let tier = DatabaseTier(settings.string_attr("tier").unwrap_or_else(|| "db-f1-micro".to_string()));

        let ssd = disk_type == "PD_SSD";
        let storage = PriceQuery::new(
            cloud_sql_filter(region.as_deref())
                .attribute(AttributeFilter::eq(
                    "resource_group",
                    if ssd || engine == DatabaseEngine::MySQL { "SSD" } else { "PDStandard" },
                ))
                .attribute(AttributeFilter::regex(
                    "description",
                    format!(
                        "{engine}: {availability} - {}",
                        if ssd { "Standard storage" } else { "Low cost storage" }
                    ),
                )),
        );

        let public_ip = public_ip.then(|| {
            PriceQuery::new(
                cloud_sql_filter(Some("global"))
                    .attribute(AttributeFilter::eq("resource_group", "IpAddress"))
                    .attribute(AttributeFilter::regex("description", "/IP address idling - hour/")),
            )
        });

        let instance = match tier.shared_group() {
            Some(group) => InstanceQueries::Shared {
                query: PriceQuery::new(
                    cloud_sql_filter(region.as_deref())
                        .attribute(AttributeFilter::eq("resource_group", group))
                        .attribute(AttributeFilter::regex(
                            "description",
                            format!("Cloud SQL for {engine}: {availability}"),
                        )),
                ),
                memory_gb: tier.memory_gb().unwrap_or(LIGHTWEIGHT_RAM_MB / 1024.0),
            },
            None => {
                let vcpus = tier.vcpus().ok_or_else(|| {
                    EstimateError::invalid_resource(
                        &resource.identifier,
                        format!("tier {} has no vCPU data", tier.0),
                    )
                })?;
                let dedicated = |dimension: &str| {
                    PriceQuery::new(
                        cloud_sql_filter(region.as_deref())
                            .family("ApplicationServices")
                            .attribute(AttributeFilter::regex(
                                "description",
                                format!("{engine}: {availability} - {dimension}"),
                            )),
                    )
                };
                InstanceQueries::Dedicated {
                    memory: dedicated("RAM"),
                    cpu: dedicated("vCPU"),
                    vcpus,
                }
            }
        };

        Ok(Self {
            disk_type,
            disk_size,
            storage,
            public_ip,
            instance,
        })
    }
}

impl CostModel for SqlDatabaseInstance {
    fn queries(&self) -> Vec<PriceQuery> {
        let mut queries = vec![self.storage.clone()];
        queries.extend(self.public_ip.clone());
        match &self.instance {
            InstanceQueries::Shared { query, .. } => queries.push(query.clone()),
            InstanceQueries::Dedicated { memory, cpu, .. } => {
                queries.push(memory.clone());
                queries.push(cpu.clone());
            }
        }
        queries
    }

    fn assemble(&self, results: &PricedResults) -> ResourceCosts {
        let mut costs = ResourceCosts::default();

        let storage = results.rate(&self.storage);
        costs.fixed(FixedCost::new(
            format!("Monthly {} storage cost", self.disk_type.replace("PD_", "")),
            storage.unit_or("gigabyte month"),
            self.disk_size,
            storage.usd,
        ));

        if let Some(query) = &self.public_ip {
            let rate = results.rate(query);
            costs.dynamic(DynamicCost::new(
                "Idle Public IP address cost",
                rate.unit_or("hour"),
                0.0,
                UsageFormula::linear(rate.usd),
            ));
        }

        match &self.instance {
            InstanceQueries::Shared { query, memory_gb } => {
                let rate = results.rate(query);
                costs.dynamic(DynamicCost::new(
                    "Shared instance vCPU cost",
                    rate.unit_or("hour"),
                    HOURS_PER_MONTH,
                    UsageFormula::linear(rate.usd).with_multiplier(*memory_gb),
                ));
            }
            InstanceQueries::Dedicated { memory, cpu, vcpus } => {
                let ram = results.rate(memory);
                let vcpu = results.rate(cpu);
                costs
                    .dynamic(DynamicCost::new(
                        "Memory cost",
                        ram.unit_or("hour"),
                        HOURS_PER_MONTH,
                        UsageFormula::linear(ram.usd),
                    ))
                    .dynamic(DynamicCost::new(
                        "vCPU cost",
                        vcpu.unit_or("hour"),
                        HOURS_PER_MONTH,
                        UsageFormula::linear(vcpu.usd).with_multiplier(*vcpus),
                    ));
            }
        }

        costs
    }
}
