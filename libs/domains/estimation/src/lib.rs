//! Estimation Domain
//!
//! Turns a directory of infrastructure configuration into monthly cost
//! estimates.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ TreeBuilder │  ← Files → blocks → module tree
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Resolver   │  ← `${var.x}` substitution, arithmetic
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Registry   │  ← Resource type → cost model
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Estimator  │  ← Batched price queries, cost entries
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_estimation::{
//!     Estimator, ProductCatalog, ResourceRegistry, TreeBuilder, UsageOverrides,
//! };
//!
//! # async fn run() -> domain_estimation::EstimateResult<()> {
//! let tree = TreeBuilder::new().build("./infra")?.resolve()?;
//! let catalog = ProductCatalog::load("catalog.json").await?;
//!
//! let estimate = Estimator::new(Arc::new(catalog), ResourceRegistry::gcp())
//!     .estimate(&tree, &UsageOverrides::none())
//!     .await;
//! println!("{:.2} USD/month", estimate.monthly_total());
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod config;
pub mod cost;
pub mod error;
pub mod estimator;
pub mod pricing;
pub mod region;
pub mod registry;
pub mod resources;
pub mod usage;

// Re-export commonly used types
pub use config::{Module, ResolvedModule, Resource, ResourceKind, TreeBuilder};
pub use cost::{CostModel, DynamicCost, FixedCost, ResourceCosts, UsageFormula};
pub use error::{EstimateError, EstimateResult, PricingError, PricingResult};
pub use estimator::{Estimate, Estimator, FailedResource, ResourceEstimate, SkippedResource};
pub use pricing::{PriceQuery, PriceResult, PricingClient, ProductCatalog};
pub use registry::ResourceRegistry;
pub use usage::UsageOverrides;
