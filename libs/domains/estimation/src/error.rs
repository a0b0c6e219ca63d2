use std::path::PathBuf;
use thiserror::Error;

/// Result type for estimation operations
pub type EstimateResult<T> = Result<T, EstimateError>;

/// Result type for pricing catalog lookups
pub type PricingResult<T> = Result<T, PricingError>;

/// Errors that can occur while building, resolving or pricing a configuration
#[derive(Debug, Error)]
pub enum EstimateError {
    /// The directory (and every module it includes) declared no blocks
    #[error("No configuration found in {}", path.display())]
    NoConfigurationFound { path: PathBuf },

    /// A variable has neither a default nor a caller-supplied input
    #[error("Variable '{variable}' in module '{module}' has no default and no input")]
    UnresolvedVariable { module: String, variable: String },

    /// No cost model is registered for the resource type
    #[error("Resource type '{0}' is not registered")]
    UnregisteredResourceType(String),

    /// The resource attributes cannot be turned into price queries
    #[error("Invalid resource {identifier}: {reason}")]
    InvalidResource { identifier: String, reason: String },

    /// The pricing batch for a resource failed
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// Reading a configuration directory or file failed
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed
    #[error("Failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// A usage override file is malformed
    #[error("Invalid usage file: {0}")]
    UsageFile(String),
}

impl EstimateError {
    pub fn invalid_resource(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        EstimateError::InvalidResource {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error makes every downstream price meaningless
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EstimateError::NoConfigurationFound { .. }
                | EstimateError::UnresolvedVariable { .. }
                | EstimateError::Io { .. }
        )
    }
}

/// Errors raised at the pricing catalog boundary
#[derive(Debug, Error)]
pub enum PricingError {
    /// Transport failure talking to the catalog
    #[error("Pricing request failed: {0}")]
    Request(String),

    /// The catalog answered with a non-success status
    #[error("Pricing API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The catalog answer could not be decoded
    #[error("Failed to parse pricing response: {0}")]
    Parse(String),

    /// A result carried a correlation token no submitted query owns
    #[error("Result for unknown query {0}")]
    UnknownQuery(u64),

    /// Two results carried the same correlation token
    #[error("Duplicate result for query {0}")]
    DuplicateResult(u64),

    /// The offline catalog could not be loaded
    #[error("Failed to load catalog: {0}")]
    Catalog(String),
}
