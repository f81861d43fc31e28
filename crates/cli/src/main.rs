//! rmodels command line entry point.
//!
//! Pre-warms, clears and inspects the local mirrors of configured models.
//! Logs go to stderr; command output goes to stdout.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rmodels_client::CacheResolver;
use rmodels_core::{AppConfig, Catalog, Entity};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rmodels", version, about = "Mirror remote paginated models into local SQLite caches")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve models now, building any cache that is missing or stale.
    Cache {
        /// Model names; all configured models when omitted.
        models: Vec<String>,
    },
    /// Discard cache files and TTL markers so the next access rebuilds.
    Clear {
        /// Model names; all configured models when omitted.
        models: Vec<String>,
    },
    /// Print the cache decision for each model without network access.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("load configuration")?;
    tracing::debug!(command = ?cli.command, models = config.models.len(), "loaded configuration");
    let catalog = Catalog::from_config(&config);
    let resolver = CacheResolver::from_config(&config).await?;

    match cli.command {
        Command::Cache { models } => {
            for entity in select(&catalog, &models)? {
                let handle = resolver
                    .resolve(entity)
                    .await
                    .with_context(|| format!("resolve {}", entity.name()))?;
                println!(
                    "{}: {} ({} rows, {})",
                    entity.name(),
                    handle.state(),
                    handle.count().await?,
                    handle.location()
                );
            }
        }
        Command::Clear { models } => {
            for entity in select(&catalog, &models)? {
                let removed = resolver.invalidate(entity.name()).await?;
                let outcome = if removed { "cleared" } else { "no cache file" };
                println!("{}: {outcome}", entity.name());
            }
        }
        Command::Status => {
            for entity in catalog.iter() {
                let state = resolver.inspect(entity).await?;
                println!("{}: {state} ({})", entity.name(), resolver.cache_file(entity).display());
            }
        }
    }

    Ok(())
}

/// Named models, or every configured model when `names` is empty.
fn select<'a>(catalog: &'a Catalog, names: &[String]) -> Result<Vec<&'a Entity>> {
    if names.is_empty() {
        return Ok(catalog.iter().collect());
    }

    names
        .iter()
        .map(|name| match catalog.get(name) {
            Some(entity) => Ok(entity),
            None => bail!("model `{name}` is not configured"),
        })
        .collect()
}
