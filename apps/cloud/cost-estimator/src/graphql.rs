//! Pricing API client speaking the catalog's GraphQL dialect.

use async_trait::async_trait;
use domain_estimation::error::{PricingError, PricingResult};
use domain_estimation::pricing::{
    AttributeFilter, PriceFilter, PriceQuery, PriceResult, PricingClient, Product, ProductFilter,
};
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, instrument};

/// One GraphQL request per query, issued concurrently
pub struct GraphQlPricingClient {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ProductsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    #[serde(default)]
    products: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl GraphQlPricingClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> PricingResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PricingError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn fetch_one(&self, query: &PriceQuery) -> PricingResult<PriceResult> {
        let document = render_query(query);
        debug!(query = %query.id(), document = %document, "Sending pricing query");

        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "query": document }))
            .send()
            .await
            .map_err(|e| PricingError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PricingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| PricingError::Parse(e.to_string()))?;

        if let Some(error) = body.errors.first() {
            return Err(PricingError::Parse(error.message.clone()));
        }

        let products = body
            .data
            .map(|d| d.products)
            .unwrap_or_default()
            .into_iter()
            .map(decode_product)
            .collect::<PricingResult<Vec<Product>>>()?;

        Ok(PriceResult::new(query, products))
    }
}

#[async_trait]
impl PricingClient for GraphQlPricingClient {
    #[instrument(skip_all, fields(queries = queries.len()))]
    async fn fetch_products(&self, queries: &[PriceQuery]) -> PricingResult<Vec<PriceResult>> {
        try_join_all(queries.iter().map(|q| self.fetch_one(q))).await
    }
}

/// The API may return `attributes` as an object or as a JSON-encoded string
fn decode_product(mut raw: Value) -> PricingResult<Product> {
    let encoded = match raw.get("attributes") {
        Some(Value::String(text)) => Some(
            serde_json::from_str::<Map<String, Value>>(text).map_err(|e| PricingError::Parse(e.to_string()))?,
        ),
        _ => None,
    };
    if let Some(attributes) = encoded {
        raw["attributes"] = Value::Object(attributes);
    }
    serde_json::from_value(raw).map_err(|e| PricingError::Parse(e.to_string()))
}

/// Render the `products` query for one price query
pub fn render_query(query: &PriceQuery) -> String {
    let price_args = query
        .price_filter
        .as_ref()
        .map(render_price_filter)
        .unwrap_or_default();

    format!(
        "{{ products(filter: {{{}}}) {{ productHash sku service attributes prices(filter: {{{}}}) {{ purchaseOption unit usd }} }} }}",
        render_product_filter(&query.product_filter),
        price_args
    )
}

fn quoted(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn render_product_filter(filter: &ProductFilter) -> String {
    let mut args: Vec<String> = [
        ("vendorName", &filter.vendor_name),
        ("service", &filter.service),
        ("productFamily", &filter.product_family),
        ("region", &filter.region),
        ("sku", &filter.sku),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_deref().map(|v| format!("{key}: {}", quoted(v))))
    .collect();

    if !filter.attribute_filters.is_empty() {
        let rendered: Vec<String> = filter.attribute_filters.iter().map(render_attribute_filter).collect();
        args.push(format!("attributeFilters: [{}]", rendered.join(", ")));
    }
    args.join(", ")
}

fn render_attribute_filter(filter: &AttributeFilter) -> String {
    let mut fields = vec![format!("key: {}", quoted(&filter.key))];
    if let Some(value) = filter.value.as_deref().filter(|v| !v.is_empty()) {
        fields.push(format!("value: {}", quoted(value)));
    }
    if let Some(pattern) = filter.value_regex.as_deref().filter(|v| !v.is_empty()) {
        fields.push(format!("valueRegex: {}", quoted(pattern)));
    }
    format!("{{{}}}", fields.join(", "))
}

fn render_price_filter(filter: &PriceFilter) -> String {
    filter
        .fields()
        .into_iter()
        .map(|(key, value)| format!("{key}: {}", quoted(value)))
        .collect::<Vec<_>>()
        .join(", ")
}
