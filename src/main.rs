use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crm_insights::client::cache::CLIENT_CACHE;
use crm_insights::client::{Credentials, RestClient};
use crm_insights::config::Config;
use crm_insights::{export, logging, pipeline, DashboardError, FlatTable};

#[derive(Parser)]
#[command(name = "crm-insights")]
#[command(about = "CRM analytics report fetcher, normalizer and CSV exporter")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a report, normalize it and write it out as CSV
    Fetch {
        /// Report id (falls back to report.default_report_id in the config)
        #[arg(long)]
        report_id: Option<String>,
        /// Output CSV path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the first rows of a normalized report
    Preview {
        #[arg(long)]
        report_id: Option<String>,
        /// Number of rows to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List the columns of a report with their inferred types
    Columns {
        #[arg(long)]
        report_id: Option<String>,
    },
}

fn resolve_report_id(config: &Config, arg: Option<String>) -> anyhow::Result<String> {
    match arg.or_else(|| config.report.default_report_id.clone()) {
        Some(id) => Ok(id.trim().to_string()),
        None => bail!("No report id given; pass --report-id or set report.default_report_id"),
    }
}

/// Reuses a cached session for these credentials, or logs in and caches one.
async fn acquire_client(config: &Config, credentials: &Credentials) -> anyhow::Result<Arc<RestClient>> {
    CLIENT_CACHE.set_ttl(Duration::from_secs(config.cache.ttl_seconds));
    if let Some(client) = CLIENT_CACHE.get(credentials) {
        return Ok(client);
    }

    let client = Arc::new(
        RestClient::login(
            credentials,
            &config.salesforce.api_version,
            Duration::from_secs(config.salesforce.timeout_seconds),
        )
        .await?,
    );
    CLIENT_CACHE.insert(credentials.clone(), Arc::clone(&client));
    Ok(client)
}

async fn fetch_normalized(
    config: &Config,
    report_id: &str,
) -> anyhow::Result<(FlatTable, pipeline::FetchSummary)> {
    let credentials = config.credentials_from_env()?;
    let client = acquire_client(config, &credentials).await?;
    let result = pipeline::fetch_table(client.as_ref(), report_id).await?;
    Ok(result)
}

fn print_preview(table: &FlatTable, limit: usize) {
    println!("{}", table.column_names().join(" | "));
    for row in 0..table.n_rows().min(limit) {
        let cells: Vec<String> = table
            .row_text(row)
            .into_iter()
            .map(|cell| cell.unwrap_or_default())
            .collect();
        println!("{}", cells.join(" | "));
    }
    if table.n_rows() > limit {
        println!("… ({} of {} rows shown)", limit, table.n_rows());
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Fetch { report_id, out } => {
            let report_id = resolve_report_id(&config, report_id)?;
            let (table, summary) = fetch_normalized(&config, &report_id).await?;

            let out = out.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "report_{}_{}.csv",
                    report_id,
                    Utc::now().format("%Y%m%d")
                ))
            });
            let mut file = std::fs::File::create(&out)?;
            export::write_csv(&table, &mut file)?;
            info!("Wrote {}", out.display());

            println!("\n📊 Report {}:", summary.report_id);
            println!("   Rows: {}", summary.rows);
            println!("   Columns: {}", summary.columns);
            println!("   Output file: {}", out.display());
        }
        Commands::Preview { report_id, limit } => {
            let report_id = resolve_report_id(&config, report_id)?;
            let (table, _) = fetch_normalized(&config, &report_id).await?;
            print_preview(&table, limit);
        }
        Commands::Columns { report_id } => {
            let report_id = resolve_report_id(&config, report_id)?;
            let (table, _) = fetch_normalized(&config, &report_id).await?;
            for column in &table.columns {
                let kind = if column.values.is_numeric() {
                    "numeric"
                } else {
                    "text"
                };
                println!("{:<8} {}", kind, column.name);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Run failed: {e}");
        if let Some(DashboardError::Auth { message }) = e.downcast_ref::<DashboardError>() {
            eprintln!("❌ Credential error: {message}");
            eprintln!("   - Make sure the security token is the most recent one you were emailed");
            eprintln!("   - Password and token are case sensitive");
            eprintln!("   - Too many failed attempts can lock the user out for ~15 minutes");
        }
        return Err(e);
    }
    Ok(())
}
