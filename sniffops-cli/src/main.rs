// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! SniffOps Dashboard CLI
//!
//! Terminal front end for browsing recorded Kubernetes tool invocations.

mod config;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{DashboardConfig, SourceMode};
use sniffops_client::{ClientConfig, HttpTraceStore};
use sniffops_core::RiskLevel;
use sniffops_query::{
    FetchOutcome, FixtureTraceStore, PageSize, PageState, QueryController, QueryPatch,
    ResultPage, StatsPeriod, TraceQuery, TraceStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Page size used to back the stats view when the store cannot aggregate
const STATS_SAMPLE_SIZE: u32 = 100;

#[derive(Parser)]
#[command(name = "sniffops-dash")]
#[command(about = "SniffOps - audit trail of AI-driven Kubernetes operations", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/sniffops/dashboard.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dashboard API address, overrides the config file
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Browse the built-in sample traces instead of the API
    #[arg(long, global = true)]
    fixture: bool,

    /// Output as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Verbose mode
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List traces
    Traces(TracesArgs),

    /// Show a single trace in detail
    Show {
        /// Trace ID
        id: String,
    },

    /// Risk, tool usage and cost statistics
    Stats {
        /// Period: 1h, 24h, 7d, 30d or all
        #[arg(long)]
        period: Option<StatsPeriod>,

        /// Number of tools to list
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Available filter values
    Filters,
}

#[derive(clap::Args, Default)]
struct TracesArgs {
    /// Saved view as a query string (e.g. "namespace=production&limit=25")
    #[arg(long)]
    query: Option<String>,

    /// Filter by tool name
    #[arg(long)]
    tool: Option<String>,

    /// Filter by namespace
    #[arg(long)]
    namespace: Option<String>,

    /// Filter by risk level
    #[arg(long)]
    risk: Option<RiskLevel>,

    /// Search command and target resource
    #[arg(long)]
    search: Option<String>,

    /// Start of the time range (ms since epoch)
    #[arg(long)]
    start: Option<i64>,

    /// End of the time range (ms since epoch)
    #[arg(long)]
    end: Option<i64>,

    /// Rows per page: 10, 25, 50 or 100
    #[arg(long)]
    limit: Option<u32>,

    /// Page number, starting at 1
    #[arg(long)]
    page: Option<u64>,

    /// Append this many further pages (timeline mode)
    #[arg(long, default_value = "0")]
    more: usize,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "sniffops=debug"
    } else {
        "sniffops=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_store(config: &DashboardConfig) -> Result<Arc<dyn TraceStore>> {
    match config.source.mode {
        SourceMode::Fixture => {
            info!("Using built-in sample traces");
            let now = chrono::Utc::now().timestamp_millis();
            Ok(Arc::new(FixtureTraceStore::sample(now)))
        }
        SourceMode::Http => {
            info!("Using dashboard API at {}", config.api.base_url);
            let client =
                ClientConfig::new(config.api.base_url.clone()).with_timeout(config.timeout());
            let store = HttpTraceStore::new(client).context("Failed to create API client")?;
            Ok(Arc::new(store))
        }
    }
}

/// Start from the saved view (or the configured page size), then apply flags
fn build_query(args: &TracesArgs, default_size: PageSize) -> Result<TraceQuery> {
    let base = match &args.query {
        Some(saved) => TraceQuery::parse(saved),
        None => TraceQuery::default().with_patch(QueryPatch::new().limit(default_size)),
    };

    let mut patch = QueryPatch::new();
    if let Some(tool) = &args.tool {
        patch = patch.tool(tool);
    }
    if let Some(namespace) = &args.namespace {
        patch = patch.namespace(namespace);
    }
    if let Some(risk) = args.risk {
        patch = patch.risk(risk);
    }
    if let Some(search) = &args.search {
        patch = patch.search(search);
    }
    if args.start.is_some() {
        patch = patch.start(args.start);
    }
    if args.end.is_some() {
        patch = patch.end(args.end);
    }
    if let Some(limit) = args.limit {
        let size = PageSize::try_from(limit).context("Invalid --limit")?;
        patch = patch.limit(size);
    }

    let mut query = base.with_patch(patch);
    if let Some(page) = args.page {
        query = query.with_patch(query.window(0).go_to_page(page));
    }
    Ok(query)
}

/// The page to print: settled, or the last good one after a failed append
fn settled_page(controller: &QueryController) -> Result<ResultPage> {
    match controller.current_page() {
        PageState::Ready(page) => Ok(page),
        PageState::Failed {
            query,
            cause,
            last_good: Some(page),
        } if page.query != query => {
            warn!("Failed to load more traces: {}", cause);
            Ok(page)
        }
        PageState::Failed { query, cause, .. } => {
            anyhow::bail!("Failed to load traces for ?{}: {}", query, cause)
        }
        PageState::Idle | PageState::Pending { .. } => anyhow::bail!("No traces loaded"),
    }
}

async fn cmd_traces(
    controller: &QueryController,
    args: TracesArgs,
    default_size: PageSize,
    json: bool,
) -> Result<()> {
    let query = build_query(&args, default_size)?;
    controller.set_query(query).settled().await;

    for _ in 0..args.more {
        let Some(handle) = controller.load_more() else {
            break;
        };
        if handle.settled().await != FetchOutcome::Shown {
            break;
        }
    }

    let page = settled_page(controller)?;

    if json {
        let body = serde_json::json!({
            "query": page.query.serialize(),
            "total": page.total,
            "traces": page.traces,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let shared = page.query.serialize();
    if shared.is_empty() {
        println!("View: (all traces)");
    } else {
        println!("View: ?{}", shared);
    }
    println!();
    println!("{}", render::trace_table(&page.traces));
    println!();
    if args.more > 0 {
        let suffix = if page.has_more() { "" } else { " (end)" };
        println!("Loaded {} of {} results{}", page.traces.len(), page.total, suffix);
    } else {
        println!("{}", render::pagination_footer(&page.window()));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = DashboardConfig::load(cli.config.clone())?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if cli.fixture {
        config.source.mode = SourceMode::Fixture;
    }
    config.validate().context("Invalid configuration")?;

    let controller = QueryController::new(open_store(&config)?);

    match cli.command {
        Commands::Traces(args) => {
            cmd_traces(&controller, args, config.view.page_size, cli.json).await?;
        }

        Commands::Show { id } => {
            let trace = controller
                .trace(&id)
                .await
                .with_context(|| format!("Failed to load trace {}", id))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&trace)?);
            } else {
                println!("{}", render::trace_detail(&trace));
            }
        }

        Commands::Stats { period, top } => {
            let period = period.unwrap_or(config.view.stats_period);

            // Recent traces back the local fallback if the store cannot aggregate
            let sample = TraceQuery::default().with_patch(
                QueryPatch::new().limit(PageSize::new(STATS_SAMPLE_SIZE).unwrap_or_default()),
            );
            controller.set_query(sample).settled().await;

            let report = controller.stats(period).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render::stats_report(&report, top));
            }
        }

        Commands::Filters => {
            let options = controller
                .filter_options()
                .await
                .context("Failed to load filter options")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                println!("{}", render::filter_options(&options));
            }
        }
    }

    Ok(())
}
