//! Cost entries and the contract every resource cost model implements.

use async_trait::async_trait;
use serde::Serialize;
use strum::Display;

use crate::error::EstimateResult;
use crate::pricing::{PriceQuery, PricedResults, PricingClient};

/// A cost independent of usage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedCost {
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub monthly_cost: f64,
}

impl FixedCost {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            quantity,
            unit_price,
            monthly_cost: quantity * unit_price,
        }
    }
}

/// How usage above a free threshold is billed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FreeTierBilling {
    /// Once over the threshold, every unit is billed
    Whole,
    /// Only the units above the threshold are billed
    Excess,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FreeTier {
    pub threshold: f64,
    pub billing: FreeTierBilling,
}

/// Pure usage-to-USD function of a dynamic cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageFormula {
    pub unit_price: f64,
    /// Applied on top of the unit price (e.g. memory GB per shared vCPU hour)
    pub multiplier: f64,
    pub free_tier: Option<FreeTier>,
}

impl UsageFormula {
    pub fn linear(unit_price: f64) -> Self {
        Self {
            unit_price,
            multiplier: 1.0,
            free_tier: None,
        }
    }

    /// Free up to `threshold`; past it the whole usage is billed
    pub fn free_up_to(unit_price: f64, threshold: f64) -> Self {
        Self::linear(unit_price).with_free_tier(threshold, FreeTierBilling::Whole)
    }

    /// Free up to `threshold`; past it only the excess is billed
    pub fn free_allowance(unit_price: f64, threshold: f64) -> Self {
        Self::linear(unit_price).with_free_tier(threshold, FreeTierBilling::Excess)
    }

    pub fn with_free_tier(mut self, threshold: f64, billing: FreeTierBilling) -> Self {
        self.free_tier = Some(FreeTier { threshold, billing });
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn cost(&self, units: f64) -> f64 {
        let rate = self.unit_price * self.multiplier;
        match self.free_tier {
            Some(FreeTier { threshold, .. }) if units <= threshold => 0.0,
            Some(FreeTier {
                threshold,
                billing: FreeTierBilling::Excess,
            }) => (units - threshold) * rate,
            _ => units * rate,
        }
    }
}

/// A cost parameterized by a usage quantity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicCost {
    pub name: String,
    pub unit: String,
    pub default_units: f64,
    pub formula: UsageFormula,
}

impl DynamicCost {
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        default_units: f64,
        formula: UsageFormula,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            default_units,
            formula,
        }
    }

    pub fn compute_cost(&self, units: f64) -> f64 {
        self.formula.cost(units)
    }

    pub fn default_cost(&self) -> f64 {
        self.compute_cost(self.default_units)
    }
}

/// Cost entries of one resource
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceCosts {
    pub fixed_costs: Vec<FixedCost>,
    pub dynamic_costs: Vec<DynamicCost>,
}

impl ResourceCosts {
    pub fn fixed(&mut self, cost: FixedCost) -> &mut Self {
        self.fixed_costs.push(cost);
        self
    }

    pub fn dynamic(&mut self, cost: DynamicCost) -> &mut Self {
        self.dynamic_costs.push(cost);
        self
    }
}

/// Pricing behaviour of one resource type.
///
/// Models build their queries at construction, then [`CostModel::fetch_costs`]
/// submits them as one batch and hands the correlated answers to
/// [`CostModel::assemble`].
#[async_trait]
pub trait CostModel: Send + Sync {
    /// Queries this resource needs, one per priced dimension
    fn queries(&self) -> Vec<PriceQuery>;

    /// Turn correlated answers into cost entries
    fn assemble(&self, results: &PricedResults) -> ResourceCosts;

    async fn fetch_costs(&self, client: &dyn PricingClient) -> EstimateResult<ResourceCosts> {
        let queries = self.queries();
        let results = if queries.is_empty() {
            Vec::new()
        } else {
            client.fetch_products(&queries).await?
        };
        let priced = PricedResults::correlate(&queries, results)?;
        Ok(self.assemble(&priced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EstimateError, PricingError};
    use crate::pricing::{MockPricingClient, Price, PriceResult, Product, ProductFilter};

    #[test]
    fn test_fixed_cost_monthly() {
        let cost = FixedCost::new("SSD provisioned storage (pd-ssd)", "GiBy.mo", 100.0, 0.17);
        assert!((cost.monthly_cost - 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_whole_billing_boundary() {
        let formula = UsageFormula::free_up_to(0.02, 0.5);
        assert_eq!(formula.cost(0.0), 0.0);
        assert_eq!(formula.cost(0.5), 0.0);
        assert!((formula.cost(1.0) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_excess_billing_boundary() {
        let formula = UsageFormula::free_allowance(0.02, 0.5);
        assert_eq!(formula.cost(0.5), 0.0);
        assert!((formula.cost(1.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_formulas_are_monotonic() {
        let formulas = [
            UsageFormula::linear(0.1),
            UsageFormula::free_up_to(0.1, 10.0),
            UsageFormula::free_allowance(0.1, 10.0),
            UsageFormula::linear(0.1).with_multiplier(3.75),
        ];
        for formula in formulas {
            let mut previous = formula.cost(0.0);
            for step in 1..=400 {
                let current = formula.cost(step as f64 * 0.1);
                assert!(current >= previous, "{formula:?} decreased at step {step}");
                previous = current;
            }
        }
    }

    #[test]
    fn test_multiplier_scales_rate() {
        let formula = UsageFormula::linear(0.01).with_multiplier(0.6);
        assert!((formula.cost(730.0) - 4.38).abs() < 1e-9);
    }

    struct Single {
        query: PriceQuery,
    }

    impl CostModel for Single {
        fn queries(&self) -> Vec<PriceQuery> {
            vec![self.query.clone()]
        }

        fn assemble(&self, results: &PricedResults) -> ResourceCosts {
            let rate = results.rate(&self.query);
            let mut costs = ResourceCosts::default();
            costs.dynamic(DynamicCost::new(
                "Storage",
                rate.unit_or("GB"),
                0.0,
                UsageFormula::linear(rate.usd),
            ));
            costs
        }
    }

    #[tokio::test]
    async fn test_fetch_costs_batches_and_correlates() {
        let model = Single {
            query: PriceQuery::new(ProductFilter::gcp("Cloud Storage")),
        };
        let expected_id = model.query.id();

        let mut client = MockPricingClient::new();
        client
            .expect_fetch_products()
            .withf(move |queries| queries.len() == 1 && queries[0].id() == expected_id)
            .times(1)
            .returning(|queries| {
                Ok(vec![PriceResult::new(
                    &queries[0],
                    vec![Product {
                        prices: vec![Price {
                            usd: Some("0.02".into()),
                            unit: Some("GiBy.mo".into()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }],
                )])
            });

        let costs = model.fetch_costs(&client).await.unwrap();
        assert_eq!(costs.dynamic_costs[0].unit, "GiBy.mo");
        assert!((costs.dynamic_costs[0].compute_cost(50.0) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_batch_failure_fails_resource() {
        let model = Single {
            query: PriceQuery::new(ProductFilter::gcp("Cloud Storage")),
        };

        let mut client = MockPricingClient::new();
        client
            .expect_fetch_products()
            .returning(|_| Err(PricingError::Request("timeout".into())));

        let err = model.fetch_costs(&client).await.unwrap_err();
        assert!(matches!(err, EstimateError::Pricing(PricingError::Request(_))));
    }
}
