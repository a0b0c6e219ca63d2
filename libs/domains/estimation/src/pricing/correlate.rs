use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::error::{PricingError, PricingResult};
use crate::pricing::{PriceQuery, PriceResult, Product, QueryId};

/// Batch results keyed by the query that produced them
#[derive(Debug, Default)]
pub struct PricedResults {
    by_query: HashMap<QueryId, Vec<Product>>,
}

impl PricedResults {
    /// Match every result to exactly one submitted query by token.
    ///
    /// A result for a token nobody submitted, or a second result for the same
    /// token, fails the batch. A submitted query with no result is kept as a
    /// lookup miss.
    pub fn correlate(queries: &[PriceQuery], results: Vec<PriceResult>) -> PricingResult<Self> {
        let submitted: HashSet<QueryId> = queries.iter().map(PriceQuery::id).collect();
        let mut by_query = HashMap::with_capacity(results.len());

        for result in results {
            if !submitted.contains(&result.query_id) {
                return Err(PricingError::UnknownQuery(result.query_id.value()));
            }
            if by_query.insert(result.query_id, result.products).is_some() {
                return Err(PricingError::DuplicateResult(result.query_id.value()));
            }
        }

        Ok(Self { by_query })
    }

    pub fn len(&self) -> usize {
        self.by_query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_query.is_empty()
    }

    pub fn products(&self, query: &PriceQuery) -> &[Product] {
        self.by_query
            .get(&query.id())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First product's first price, or a zero rate when the catalog had none
    pub fn rate(&self, query: &PriceQuery) -> Rate {
        let price = self
            .products(query)
            .first()
            .and_then(|product| product.prices.first());

        match price {
            Some(price) => Rate {
                usd: price.usd_rate().unwrap_or_default(),
                unit: price.unit.clone(),
                found: true,
            },
            None => {
                warn!(
                    query = %query.id(),
                    service = ?query.product_filter.service,
                    region = ?query.product_filter.region,
                    "No price found, using zero rate"
                );
                Rate::miss()
            }
        }
    }
}

/// A unit price taken from a catalog answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rate {
    pub usd: f64,
    pub unit: Option<String>,
    pub found: bool,
}

impl Rate {
    pub fn miss() -> Self {
        Self::default()
    }

    /// Catalog unit, or the model's assumed unit on a miss
    pub fn unit_or(&self, default: &str) -> String {
        self.unit.clone().unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{Price, ProductFilter};

    fn product(usd: &str, unit: &str) -> Product {
        Product {
            prices: vec![Price {
                usd: Some(usd.into()),
                unit: Some(unit.into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_queries_correlate_separately() {
        let filter = ProductFilter::gcp("Cloud Storage").region("us-east1");
        let a = PriceQuery::new(filter.clone());
        let b = PriceQuery::new(filter);
        let queries = vec![a.clone(), b.clone()];

        // results arrive out of order
        let results = vec![
            PriceResult::new(&b, vec![product("0.02", "GiBy.mo")]),
            PriceResult::new(&a, vec![product("0.01", "GiBy.mo")]),
        ];

        let priced = PricedResults::correlate(&queries, results).unwrap();
        assert_eq!(priced.len(), 2);
        assert_eq!(priced.rate(&a).usd, 0.01);
        assert_eq!(priced.rate(&b).usd, 0.02);
    }

    #[test]
    fn test_unknown_token_fails_batch() {
        let submitted = PriceQuery::new(ProductFilter::gcp("BigQuery"));
        let stranger = PriceQuery::new(ProductFilter::gcp("BigQuery"));

        let err = PricedResults::correlate(
            std::slice::from_ref(&submitted),
            vec![PriceResult::new(&stranger, vec![])],
        )
        .unwrap_err();
        assert!(matches!(err, PricingError::UnknownQuery(id) if id == stranger.id().value()));
    }

    #[test]
    fn test_duplicate_result_fails_batch() {
        let q = PriceQuery::new(ProductFilter::gcp("BigQuery"));
        let err = PricedResults::correlate(
            std::slice::from_ref(&q),
            vec![PriceResult::new(&q, vec![]), PriceResult::new(&q, vec![])],
        )
        .unwrap_err();
        assert!(matches!(err, PricingError::DuplicateResult(_)));
    }

    #[test]
    fn test_missing_result_is_zero_rate() {
        let q = PriceQuery::new(ProductFilter::gcp("Networking"));
        let priced = PricedResults::correlate(std::slice::from_ref(&q), vec![]).unwrap();

        let rate = priced.rate(&q);
        assert_eq!(rate, Rate::miss());
        assert_eq!(rate.unit_or("hours"), "hours");
        assert!(priced.products(&q).is_empty());
    }

    #[test]
    fn test_product_without_prices_is_a_miss() {
        let q = PriceQuery::new(ProductFilter::gcp("Networking"));
        let priced = PricedResults::correlate(
            std::slice::from_ref(&q),
            vec![PriceResult::new(&q, vec![Product::default()])],
        )
        .unwrap();
        assert_eq!(priced.rate(&q), Rate::miss());
    }
}
