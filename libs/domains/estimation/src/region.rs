//! Region derivations shared by the GCP cost models.

use strum::{Display, EnumString};

/// Asian regions billed at Cloud Run's tier 1 rates
const ASIA_TIER_1_REGIONS: &[&str] = &[
    "asia-east1",
    "asia-northeast1",
    "asia-northeast2",
    "asia-south1",
];

/// Multi-region storage locations
const MULTI_REGIONS: &[&str] = &["asia", "eu", "us", "asia1", "eur4", "nam4"];

/// `us-central1-a` -> `us-central1`
pub fn zone_to_region(zone: &str) -> String {
    let cut = zone
        .char_indices()
        .rev()
        .nth(1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    zone[..cut].to_string()
}

/// Dataset location code to a concrete region: `US` and `EU` map to their
/// default regions, anything else passes through.
pub fn location_to_region(location: &str) -> String {
    match location {
        "US" => "us-east1".to_string(),
        "EU" => "europe-west1".to_string(),
        other => other.to_string(),
    }
}

/// Multi-region name used by the BigQuery Storage API catalog entries
pub fn storage_api_region(region: &str) -> Option<&'static str> {
    let lower = region.to_lowercase();
    if lower.starts_with("us") {
        Some("us")
    } else if lower.starts_with("europe") {
        Some("europe")
    } else {
        None
    }
}

/// Cloud Run pricing tier of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum RegionTier {
    #[strum(serialize = "Tier 1")]
    Tier1,
    #[strum(serialize = "Tier 2")]
    Tier2,
}

impl RegionTier {
    pub fn of(region: &str) -> Self {
        if region.starts_with("us")
            || region.starts_with("europe")
            || ASIA_TIER_1_REGIONS.contains(&region)
        {
            RegionTier::Tier1
        } else {
            RegionTier::Tier2
        }
    }

    /// Catalog description for a Cloud Run allocation dimension
    pub fn describe(self, dimension: &str) -> String {
        match self {
            RegionTier::Tier1 => dimension.to_string(),
            RegionTier::Tier2 => format!("{dimension} (tier 2)"),
        }
    }
}

/// Catalog region and resource group of a storage bucket
pub fn bucket_region_and_group(location: &str, storage_class: &str) -> (String, &'static str) {
    let mut region = location.to_lowercase();
    let mut group = match storage_class.to_lowercase().as_str() {
        "nearline" => "NearlineStorage",
        "coldline" => "ColdlineStorage",
        "archive" => "ArchiveStorage",
        _ => "RegionalStorage",
    };

    if group == "RegionalStorage" && MULTI_REGIONS.contains(&region.as_str()) {
        group = "MultiRegionalStorage";
    }
    if region == "eu" && group == "MultiRegionalStorage" {
        region = "europe".to_string();
    }

    (region, group)
}
