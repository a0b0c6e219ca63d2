//! Cost Estimator
//!
//! Builds the module tree of an infrastructure configuration directory,
//! resolves its variables and prices every supported resource against the
//! pricing catalog.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_estimation::{
    Estimator, PricingClient, ProductCatalog, ResolvedModule, ResourceRegistry, TreeBuilder,
    UsageOverrides,
};
use eyre::{Result, WrapErr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

mod config;
mod graphql;
mod report;

use config::Config;
use graphql::GraphQlPricingClient;
use report::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "cost-estimator")]
#[command(about = "Estimate monthly cloud costs of an infrastructure configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Price every supported resource in a configuration directory
    Estimate {
        /// Root directory of the configuration
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Offline product catalog (JSON) used instead of the pricing API
        #[arg(short, long, env = "PRICING_CATALOG_PATH")]
        catalog: Option<PathBuf>,

        /// Pricing API GraphQL endpoint
        #[arg(long)]
        api_url: Option<String>,

        /// Usage overrides (JSON): identifier -> cost name -> units
        #[arg(short, long)]
        usage_file: Option<PathBuf>,

        /// Resources priced at once
        #[arg(long)]
        concurrency: Option<usize>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the resolved module tree as JSON
    Inspect {
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,
    },

    /// List the resource types that can be priced
    ResourceTypes,
}

fn load_tree(directory: &Path) -> Result<ResolvedModule> {
    let tree = TreeBuilder::new()
        .build(directory)
        .wrap_err_with(|| format!("Failed to build configuration tree from {}", directory.display()))?;
    tree.resolve().wrap_err("Failed to resolve variables")
}

async fn pricing_client(config: &Config) -> Result<Arc<dyn PricingClient>> {
    match &config.pricing.catalog_path {
        Some(path) => {
            let catalog = ProductCatalog::load(path)
                .await
                .wrap_err_with(|| format!("Failed to load catalog {}", path.display()))?;
            Ok(Arc::new(catalog))
        }
        None => {
            info!(url = %config.pricing.url, "Using pricing API");
            let client = GraphQlPricingClient::new(&config.pricing.url, config.pricing.timeout)
                .wrap_err("Failed to create pricing API client")?;
            Ok(Arc::new(client))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<()> {
    // needs neither configuration nor logging
    if let Commands::ResourceTypes = cli.command {
        for resource_type in ResourceRegistry::gcp().resource_types() {
            println!("{resource_type}");
        }
        return Ok(());
    }

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    match cli.command {
        Commands::Estimate {
            directory,
            catalog,
            api_url,
            usage_file,
            concurrency,
            format,
        } => {
            let config = config.with_overrides(catalog, api_url, concurrency);
            let tree = load_tree(&directory)?;

            let usage = match usage_file {
                Some(path) => UsageOverrides::load(&path)
                    .await
                    .wrap_err("Failed to load usage overrides")?,
                None => UsageOverrides::none(),
            };

            let client = pricing_client(&config).await?;
            let estimate = Estimator::new(client, ResourceRegistry::gcp())
                .with_concurrency(config.pricing.concurrency)
                .estimate(&tree, &usage)
                .await;

            info!(
                priced = estimate.priced.len(),
                skipped = estimate.skipped.len(),
                failed = estimate.failed.len(),
                monthly_total = estimate.monthly_total(),
                "Estimate complete"
            );
            println!("{}", report::render(&estimate, format)?);
        }

        Commands::Inspect { directory } => {
            let tree = load_tree(&directory)?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }

        Commands::ResourceTypes => {}
    }

    Ok(())
}
