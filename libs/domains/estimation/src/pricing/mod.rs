//! Pricing catalog boundary: query model, product model and the client trait.

pub mod catalog;
pub mod correlate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::PricingResult;

pub use catalog::ProductCatalog;
pub use correlate::{PricedResults, Rate};

/// Vendor name used by every query in this crate
pub const GCP_VENDOR: &str = "gcp";

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque correlation token, unique per constructed query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(u64);

impl QueryId {
    fn next() -> Self {
        QueryId(NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// A request for the price of one line item.
///
/// Two queries built from identical filters still carry different ids; a
/// clone keeps the id of its original.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    id: QueryId,
    pub product_filter: ProductFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_filter: Option<PriceFilter>,
}

impl PriceQuery {
    pub fn new(product_filter: ProductFilter) -> Self {
        Self {
            id: QueryId::next(),
            product_filter,
            price_filter: None,
        }
    }

    pub fn with_price_filter(mut self, price_filter: PriceFilter) -> Self {
        self.price_filter = Some(price_filter);
        self
    }

    pub fn id(&self) -> QueryId {
        self.id
    }
}

/// Product selection criteria
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_filters: Vec<AttributeFilter>,
}

impl ProductFilter {
    /// Filter on a GCP service
    pub fn gcp(service: impl Into<String>) -> Self {
        Self {
            vendor_name: Some(GCP_VENDOR.to_string()),
            service: Some(service.into()),
            ..Default::default()
        }
    }

    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.product_family = Some(family.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn attribute(mut self, filter: AttributeFilter) -> Self {
        self.attribute_filters.push(filter);
        self
    }
}

/// Match on one product attribute, by literal value or by pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilter {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_regex: Option<String>,
}

impl AttributeFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            value_regex: None,
        }
    }

    /// Pattern filter; `/pattern/flags` notation is accepted
    pub fn regex(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            value_regex: Some(pattern.into()),
        }
    }
}

/// Price selection criteria within a matched product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_usage_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_usage_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_purchase_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_offering_class: Option<String>,
}

impl PriceFilter {
    pub fn purchase_option(mut self, option: impl Into<String>) -> Self {
        self.purchase_option = Some(option.into());
        self
    }

    pub fn start_usage_amount(mut self, amount: impl Into<String>) -> Self {
        self.start_usage_amount = Some(amount.into());
        self
    }

    /// Present filter fields as `(camelCase key, value)` pairs
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("purchaseOption", &self.purchase_option),
            ("unit", &self.unit),
            ("description", &self.description),
            ("descriptionRegex", &self.description_regex),
            ("startUsageAmount", &self.start_usage_amount),
            ("endUsageAmount", &self.end_usage_amount),
            ("termLength", &self.term_length),
            ("termPurchaseOption", &self.term_purchase_option),
            ("termOfferingClass", &self.term_offering_class),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

/// A catalog product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub product_hash: Option<String>,
    pub vendor_name: Option<String>,
    pub service: Option<String>,
    pub product_family: Option<String>,
    pub region: Option<String>,
    pub sku: Option<String>,
    pub attributes: Map<String, Value>,
    pub prices: Vec<Price>,
}

/// One price point of a product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Price {
    /// USD rate as the catalog renders it, e.g. `"0.020000000"`
    pub usd: Option<String>,
    pub purchase_option: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub start_usage_amount: Option<String>,
    pub end_usage_amount: Option<String>,
    pub term_length: Option<String>,
    pub term_purchase_option: Option<String>,
    pub term_offering_class: Option<String>,
}

impl Price {
    pub fn usd_rate(&self) -> Option<f64> {
        self.usd.as_deref().and_then(|s| s.trim().parse().ok())
    }

    /// Value of a price field by its camelCase filter key
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "purchaseOption" => self.purchase_option.as_deref(),
            "unit" => self.unit.as_deref(),
            "description" | "descriptionRegex" => self.description.as_deref(),
            "startUsageAmount" => self.start_usage_amount.as_deref(),
            "endUsageAmount" => self.end_usage_amount.as_deref(),
            "termLength" => self.term_length.as_deref(),
            "termPurchaseOption" => self.term_purchase_option.as_deref(),
            "termOfferingClass" => self.term_offering_class.as_deref(),
            _ => None,
        }
    }
}

/// Catalog answer to one [`PriceQuery`], tagged with the query's id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResult {
    pub query_id: QueryId,
    pub products: Vec<Product>,
}

impl PriceResult {
    pub fn new(query: &PriceQuery, products: Vec<Product>) -> Self {
        Self {
            query_id: query.id(),
            products,
        }
    }
}

/// Pricing catalog client.
///
/// Implementations answer a batch of queries, tagging each result with the id
/// of the query it answers. Timeouts and retries are the client's concern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PricingClient: Send + Sync {
    async fn fetch_products(&self, queries: &[PriceQuery]) -> PricingResult<Vec<PriceResult>>;
}
