//! Offline product catalog answering queries from an in-memory product list.

use async_trait::async_trait;
use fancy_regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{PricingError, PricingResult};
use crate::pricing::{
    AttributeFilter, Price, PriceFilter, PriceQuery, PriceResult, PricingClient, Product,
    ProductFilter,
};

/// In-memory pricing catalog
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped { products: Vec<Product> },
    Bare(Vec<Product>),
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Parse a catalog document: a product array, or `{"products": [...]}`
    pub fn from_json(text: &str) -> PricingResult<Self> {
        let file: CatalogFile =
            serde_json::from_str(text).map_err(|e| PricingError::Catalog(e.to_string()))?;
        let products = match file {
            CatalogFile::Wrapped { products } | CatalogFile::Bare(products) => products,
        };
        Ok(Self::new(products))
    }

    pub async fn load(path: impl AsRef<Path>) -> PricingResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PricingError::Catalog(format!("{}: {}", path.display(), e)))?;
        let catalog = Self::from_json(&text)?;
        info!(path = %path.display(), products = catalog.len(), "Loaded product catalog");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products matching a query, each keeping only the prices that match
    pub fn lookup(&self, query: &PriceQuery) -> Vec<Product> {
        let attribute_matchers: Vec<AttributeMatcher> = query
            .product_filter
            .attribute_filters
            .iter()
            .map(AttributeMatcher::new)
            .collect();
        let price_matcher = query.price_filter.as_ref().map(PriceMatcher::new);

        let matched: Vec<Product> = self
            .products
            .iter()
            .filter(|p| matches_product(&query.product_filter, p))
            .filter(|p| attribute_matchers.iter().all(|m| m.matches(p)))
            .filter_map(|p| match &price_matcher {
                Some(matcher) => {
                    let prices: Vec<Price> = p
                        .prices
                        .iter()
                        .filter(|price| matcher.matches(price))
                        .cloned()
                        .collect();
                    (!prices.is_empty()).then(|| Product {
                        prices,
                        ..p.clone()
                    })
                }
                None => Some(p.clone()),
            })
            .collect();

        debug!(query = %query.id(), matched = matched.len(), "Catalog lookup");
        matched
    }
}

#[async_trait]
impl PricingClient for ProductCatalog {
    async fn fetch_products(&self, queries: &[PriceQuery]) -> PricingResult<Vec<PriceResult>> {
        Ok(queries
            .iter()
            .map(|q| PriceResult::new(q, self.lookup(q)))
            .collect())
    }
}

fn matches_product(filter: &ProductFilter, product: &Product) -> bool {
    field_matches(&filter.vendor_name, &product.vendor_name)
        && field_matches(&filter.service, &product.service)
        && field_matches(&filter.product_family, &product.product_family)
        && field_matches(&filter.region, &product.region)
        && field_matches(&filter.sku, &product.sku)
}

fn field_matches(expected: &Option<String>, actual: &Option<String>) -> bool {
    match expected {
        Some(expected) => actual.as_deref() == Some(expected.as_str()),
        None => true,
    }
}

/// Compile `pattern` or `/pattern/flags`, honouring the `i` flag.
///
/// Look-around and backreferences are supported. Returns `None` (after a
/// warning) for malformed patterns; such a filter does not constrain the match.
pub fn compile_pattern(pattern: &str) -> Option<Regex> {
    let (body, case_insensitive) = match pattern.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((body, flags)) => (body, flags.contains('i')),
        None => (pattern, false),
    };
    let source = if case_insensitive {
        format!("(?i){body}")
    } else {
        body.to_string()
    };

    match Regex::new(&source) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Malformed pattern ignored");
            None
        }
    }
}

enum AttributeMatcher<'a> {
    Equals { key: &'a str, value: &'a str },
    Pattern { key: &'a str, regex: Regex },
    Any,
}

impl<'a> AttributeMatcher<'a> {
    fn new(filter: &'a AttributeFilter) -> Self {
        if let Some(value) = filter.value.as_deref() {
            return AttributeMatcher::Equals {
                key: &filter.key,
                value,
            };
        }
        match filter.value_regex.as_deref().and_then(compile_pattern) {
            Some(regex) => AttributeMatcher::Pattern {
                key: &filter.key,
                regex,
            },
            None => AttributeMatcher::Any,
        }
    }

    fn matches(&self, product: &Product) -> bool {
        match self {
            AttributeMatcher::Equals { key, value } => {
                attribute_text(product, key).as_deref() == Some(*value)
            }
            AttributeMatcher::Pattern { key, regex } => attribute_text(product, key)
                .is_some_and(|text| pattern_matches(regex, &text)),
            AttributeMatcher::Any => true,
        }
    }
}

fn attribute_text(product: &Product, key: &str) -> Option<String> {
    match product.attributes.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

struct PriceMatcher<'a> {
    fields: Vec<(&'static str, &'a str)>,
    description_regex: Option<Regex>,
}

impl<'a> PriceMatcher<'a> {
    fn new(filter: &'a PriceFilter) -> Self {
        Self {
            fields: filter
                .fields()
                .into_iter()
                .filter(|(key, _)| *key != "descriptionRegex")
                .collect(),
            description_regex: filter.description_regex.as_deref().and_then(compile_pattern),
        }
    }

    fn matches(&self, price: &Price) -> bool {
        let fields_match = self
            .fields
            .iter()
            .all(|(key, expected)| price.field(key).is_some_and(|actual| loosely_equal(expected, actual)));
        let description_matches = match &self.description_regex {
            Some(regex) => price
                .description
                .as_deref()
                .is_some_and(|d| pattern_matches(regex, d)),
            None => true,
        };
        fields_match && description_matches
    }
}

/// A match that exceeds the backtracking limit counts as no match
fn pattern_matches(regex: &Regex, text: &str) -> bool {
    regex.is_match(text).unwrap_or_else(|e| {
        warn!(pattern = %regex.as_str(), error = %e, "Pattern evaluation failed");
        false
    })
}

/// Equality, numeric when both sides parse as numbers (`"0"` == `"0.0"`)
fn loosely_equal(expected: &str, actual: &str) -> bool {
    match (expected.trim().parse::<f64>(), actual.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => expected == actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> ProductCatalog {
        ProductCatalog::from_json(
            &json!({
                "products": [
                    {
                        "productHash": "a1",
                        "vendorName": "gcp",
                        "service": "Cloud Storage",
                        "productFamily": "Storage",
                        "region": "us-east1",
                        "attributes": { "resource_group": "MultiRegionalStorage", "description": "Standard Storage US Multi-region" },
                        "prices": [
                            { "usd": "0.026", "unit": "GiBy.mo", "startUsageAmount": "0" },
                            { "usd": "0.020", "unit": "GiBy.mo", "startUsageAmount": "1024" }
                        ]
                    },
                    {
                        "productHash": "b2",
                        "vendorName": "gcp",
                        "service": "Compute Engine",
                        "productFamily": "Network",
                        "region": "us-central1",
                        "attributes": { "description": "Static Ip Charge" },
                        "prices": [
                            { "usd": "0.01", "unit": "h", "purchaseOption": "OnDemand", "startUsageAmount": "1.0" }
                        ]
                    }
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_product_and_attribute_filters() {
        let query = PriceQuery::new(
            ProductFilter::gcp("Compute Engine")
                .family("Network")
                .region("us-central1")
                .attribute(AttributeFilter::regex("description", "^Static Ip Charge.*")),
        );
        let products = catalog().lookup(&query);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_hash.as_deref(), Some("b2"));

        let wrong_region = PriceQuery::new(ProductFilter::gcp("Compute Engine").region("europe-west1"));
        assert!(catalog().lookup(&wrong_region).is_empty());
    }

    #[test]
    fn test_case_insensitive_slash_notation() {
        let query = PriceQuery::new(
            ProductFilter::gcp("Compute Engine")
                .attribute(AttributeFilter::regex("description", "/^static ip/i")),
        );
        assert_eq!(catalog().lookup(&query).len(), 1);
    }

    #[test]
    fn test_look_ahead_excludes_early_delete() {
        let catalog = ProductCatalog::from_json(
            &json!([
                {
                    "productHash": "early",
                    "vendorName": "gcp",
                    "service": "Cloud Storage",
                    "region": "us",
                    "attributes": {
                        "resource_group": "MultiRegionalStorage",
                        "description": "Multi-Region Standard Storage US (Early Delete)"
                    },
                    "prices": [{ "usd": "0.99", "unit": "GiBy.mo" }]
                },
                {
                    "productHash": "standard",
                    "vendorName": "gcp",
                    "service": "Cloud Storage",
                    "region": "us",
                    "attributes": {
                        "resource_group": "MultiRegionalStorage",
                        "description": "Multi-Region Standard Storage US"
                    },
                    "prices": [{ "usd": "0.026", "unit": "GiBy.mo" }]
                }
            ])
            .to_string(),
        )
        .unwrap();

        let query = PriceQuery::new(
            ProductFilter::gcp("Cloud Storage")
                .region("us")
                .attribute(AttributeFilter::eq("resource_group", "MultiRegionalStorage"))
                .attribute(AttributeFilter::regex("description", r"/^(?!.*?\(Early Delete\))/")),
        );
        let products = catalog.lookup(&query);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_hash.as_deref(), Some("standard"));
        assert_eq!(products[0].prices[0].usd.as_deref(), Some("0.026"));
    }

    #[test]
    fn test_malformed_pattern_does_not_constrain() {
        assert!(compile_pattern("/(unclosed/").is_none());
        let query = PriceQuery::new(
            ProductFilter::gcp("Compute Engine").attribute(AttributeFilter::regex("description", "(unclosed")),
        );
        assert_eq!(catalog().lookup(&query).len(), 1);
    }

    #[test]
    fn test_price_filter_is_numeric() {
        let query = PriceQuery::new(ProductFilter::gcp("Cloud Storage"))
            .with_price_filter(PriceFilter::default().start_usage_amount("0.0"));
        let products = catalog().lookup(&query);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].prices.len(), 1);
        assert_eq!(products[0].prices[0].usd.as_deref(), Some("0.026"));

        let none = PriceQuery::new(ProductFilter::gcp("Cloud Storage"))
            .with_price_filter(PriceFilter::default().purchase_option("OnDemand"));
        assert!(catalog().lookup(&none).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_products_tags_results() {
        let a = PriceQuery::new(ProductFilter::gcp("Cloud Storage"));
        let b = PriceQuery::new(ProductFilter::gcp("Cloud Storage"));
        let results = catalog()
            .fetch_products(&[a.clone(), b.clone()])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].query_id, a.id());
        assert_eq!(results[1].query_id, b.id());
    }

    #[test]
    fn test_bare_array_and_bad_documents() {
        let bare = ProductCatalog::from_json(r#"[{"service": "BigQuery"}]"#).unwrap();
        assert_eq!(bare.len(), 1);
        assert!(matches!(
            ProductCatalog::from_json("{not json"),
            Err(PricingError::Catalog(_))
        ));
    }
}
