use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kore_core::{KoreConfig, MemoryStore, ScopeBypass};
use kore_erp::jobs::{generate_invoices, portfolio_report, spawn_invoice_schedule};
use kore_erp::services::BillingPeriod;
use kore_erp::seed::seed_demo;

#[derive(Parser)]
#[command(name = "kore-erp")]
#[command(about = "KORE ERP - multi-agency property management")]
#[command(version = "0.1.0")]
struct Cli {
    /// Register the demo agencies and their portfolios first
    #[arg(long, global = true)]
    seed_demo: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (default)
    Serve {
        /// Seconds between scheduled invoice runs; 0 disables the schedule
        #[arg(long)]
        invoice_every: Option<u64>,
    },
    /// Draft invoices for one billing period, agency by agency
    Invoices {
        /// Billing period, YYYY-MM
        #[arg(long)]
        period: BillingPeriod,
    },
    /// Count buildings and units per agency (audited cross-agency read)
    Portfolio {
        #[arg(long)]
        reason: String,
        #[arg(long)]
        actor: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let erp = kore_erp::build_with(KoreConfig::from_env(), Arc::new(MemoryStore::new()))?;

    if cli.seed_demo {
        seed_demo(&erp).await?;
    }

    match cli.command.unwrap_or(Commands::Serve { invoice_every: None }) {
        Commands::Serve { invoice_every } => {
            let every = invoice_every
                .or_else(|| erp.config.get_u64("jobs.invoice_interval_secs"))
                .unwrap_or(3600);
            if every > 0 {
                spawn_invoice_schedule(&erp, Duration::from_secs(every));
            }
            println!("[kore] listening on http://{}", erp.addr());
            erp.listen().await?;
        }
        Commands::Invoices { period } => {
            let run = generate_invoices(&erp.jobs, &erp.repos, &erp.agencies, period).await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Commands::Portfolio { reason, actor } => {
            let report = portfolio_report(&erp.jobs, &erp.repos, ScopeBypass::new(reason, actor)?).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
