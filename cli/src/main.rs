//! Watchpost CLI
//!
//! Command-line interface for checking and querying the data sources that
//! feed alert evaluation.
//!
//! # Usage
//!
//! ```bash
//! watchpost --datasources sources.json check
//! watchpost query logs-prod '{app="api"} |= "error"' --limit 50
//! watchpost events cluster-prod BackOff --scope 30
//! ```

#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use providers::chrono::{DateTime, Utc};
use providers::config::{load_data_sources, DataSource, DataSourceKind};
use providers::models::{Direction, QueryOptions};
use providers::provider::{self, HealthStatus, KubernetesProvider};
use providers::{CancellationToken, ProviderError};
use serde::Serialize;
use tokio::task::JoinSet;

/// Watchpost CLI - query alerting data sources
#[derive(Parser)]
#[command(name = "watchpost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON data-source list
    #[arg(
        short,
        long,
        env = "WATCHPOST_DATASOURCES",
        default_value = "datasources.json"
    )]
    datasources: String,

    /// Emit logs as JSON
    #[arg(long, env = "WATCHPOST_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every configured data source (or one, by name)
    Check {
        /// Only check this data source
        source: Option<String>,
    },
    /// Run one bounded query against one or more data sources
    Query {
        /// Data source name; repeat to query several concurrently
        #[arg(short, long = "source", required = true)]
        sources: Vec<String>,

        /// Query expression (LogQL for Loki, event reason for Kubernetes)
        query: String,

        /// Scan direction
        #[arg(long)]
        direction: Option<Direction>,

        /// Maximum number of entries (0 uses the default)
        #[arg(long, default_value_t = 0)]
        limit: u32,

        /// Window start (RFC3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Window end (RFC3339)
        #[arg(long)]
        end: Option<DateTime<Utc>>,

        /// Recency window in minutes for cluster events
        #[arg(long)]
        scope: Option<u32>,
    },
    /// List raw warning events from a Kubernetes data source
    Events {
        /// Data source name
        source: String,

        /// Event reason to match
        reason: String,

        /// Recency window in minutes
        #[arg(long, default_value_t = providers::models::DEFAULT_EVENT_SCOPE_MINUTES)]
        scope: u32,
    },
}

/// Health line printed by `check`.
#[derive(Debug, Serialize)]
struct SourceHealth {
    source: String,
    #[serde(flatten)]
    status: HealthStatus,
}

/// Query result printed by `query`.
#[derive(Debug, Serialize)]
struct SourceResult {
    source: String,
    #[serde(flatten)]
    output: providers::models::QueryOutput,
    external_labels: providers::models::Labels,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Returns a token canceled on Ctrl+C.
fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, cancelling in-flight calls");
            trigger.cancel();
        }
    });
    cancel
}

fn select_sources(all: Vec<DataSource>, names: &[String]) -> Result<Vec<DataSource>> {
    if names.is_empty() {
        return Ok(all);
    }

    names
        .iter()
        .map(|name| {
            all.iter()
                .find(|s| &s.name == name)
                .cloned()
                .with_context(|| format!("Unknown data source '{name}'"))
        })
        .collect()
}

/// Short classification of a query failure for log output.
fn failure_kind(err: &ProviderError) -> &'static str {
    if err.is_cancelled() {
        "cancelled"
    } else if err.is_backend_error() {
        "backend"
    } else {
        "client"
    }
}

fn ensure_kubernetes(source: &DataSource) -> Result<()> {
    if source.kind != DataSourceKind::Kubernetes {
        bail!(
            "Data source '{}' is of kind '{}', events require a kubernetes source",
            source.name,
            source.kind
        );
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

async fn run_check(sources: Vec<DataSource>, cancel: CancellationToken) -> Result<()> {
    let mut tasks = JoinSet::new();
    for source in sources {
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let status = match provider::build(&source).await {
                Ok(provider) => HealthStatus::probe(provider.as_ref(), &cancel).await,
                Err(e) => HealthStatus::from_check(&Err(e)),
            };
            SourceHealth {
                source: source.name,
                status,
            }
        });
    }

    let mut unhealthy = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let health = joined.context("Health check task failed")?;
        if !health.status.healthy {
            unhealthy += 1;
        }
        print_json(&health)?;
    }

    if unhealthy > 0 {
        bail!("{unhealthy} data source(s) unhealthy");
    }
    Ok(())
}

async fn run_query(
    sources: Vec<DataSource>,
    options: QueryOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let mut tasks = JoinSet::new();
    for source in sources {
        let cancel = cancel.clone();
        let options = options.clone();
        tasks.spawn(async move {
            let result = async {
                let provider = provider::build(&source).await?;
                let output = provider.query(&options, &cancel).await?;
                Ok::<_, ProviderError>(SourceResult {
                    source: source.name.clone(),
                    output,
                    external_labels: provider.external_labels().clone(),
                })
            }
            .await;
            (source.name, result)
        });
    }

    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (name, result) = joined.context("Query task failed")?;
        match result {
            Ok(result) => {
                tracing::info!(source = %name, count = result.output.count, "Query complete");
                print_json(&result)?;
            }
            Err(e) if e.is_cancelled() => {
                failed += 1;
                tracing::info!(source = %name, "Query cancelled");
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(
                    source = %name,
                    kind = failure_kind(&e),
                    error = %e,
                    "Query failed, skipping this evaluation cycle"
                );
            }
        }
    }

    if failed > 0 {
        bail!("{failed} data source(s) failed to answer");
    }
    Ok(())
}

async fn run_events(source: DataSource, reason: &str, scope: u32, cancel: CancellationToken) -> Result<()> {
    ensure_kubernetes(&source)?;

    let provider = KubernetesProvider::connect(&source)
        .await
        .with_context(|| format!("Failed to connect to '{}'", source.name))?;

    let events = provider
        .get_warning_events(reason, scope, &cancel)
        .await
        .with_context(|| format!("Failed to list events from '{}'", source.name))?;

    for event in &events {
        print_json(event)?;
    }
    tracing::info!(source = %source.name, reason, count = events.len(), "Listed warning events");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let Some(command) = cli.command else {
        println!("Watchpost CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for usage information");
        return Ok(());
    };

    let all = load_data_sources(&cli.datasources)
        .with_context(|| format!("Failed to load data sources from {}", cli.datasources))?;
    let cancel = shutdown_token();

    match command {
        Commands::Check { source } => {
            let names: Vec<String> = source.into_iter().collect();
            run_check(select_sources(all, &names)?, cancel).await
        }
        Commands::Query {
            sources,
            query,
            direction,
            limit,
            start,
            end,
            scope,
        } => {
            let options = QueryOptions {
                query,
                direction,
                limit,
                start,
                end,
                scope,
            };
            run_query(select_sources(all, &sources)?, options, cancel).await
        }
        Commands::Events {
            source,
            reason,
            scope,
        } => {
            let mut selected = select_sources(all, &[source])?;
            let source = selected.remove(0);
            run_events(source, &reason, scope, cancel).await
        }
    }
}
