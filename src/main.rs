use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use equity_blotter::blotter;
use equity_blotter::bulk;
use equity_blotter::entry::{self, EntryMode};
use equity_blotter::equities::client::DEFAULT_BASE_URL;
use equity_blotter::equities::{Action, EquitiesClient, Side, Transaction};
use equity_blotter::PositionService;

#[derive(Parser, Debug)]
#[command(name = "equity-blotter")]
#[command(author, version, about = "Console blotter for the equity positions service")]
struct Args {
    /// Base URL of the positions service
    #[arg(long, env = "EQUITIES_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show net positions per security
    Positions,

    /// Show the transaction history
    Transactions,

    /// Submit a single transaction
    Add {
        /// Trade this transaction belongs to
        #[arg(long)]
        trade_id: i64,

        /// Version of the transaction within its trade
        #[arg(long, default_value = "1")]
        version: i32,

        /// Security code, e.g. REL
        #[arg(long)]
        security_code: String,

        /// Number of units
        #[arg(long)]
        quantity: i32,

        /// INSERT, UPDATE or CANCEL
        #[arg(long, default_value = "INSERT")]
        action: Action,

        /// BUY or SELL
        #[arg(long, default_value = "BUY")]
        side: Side,
    },

    /// Edit the latest version of an existing transaction
    Update {
        /// Transaction id assigned by the service
        #[arg(long)]
        transaction_id: i64,

        /// Trade this transaction belongs to
        #[arg(long)]
        trade_id: i64,

        /// Version of the transaction within its trade
        #[arg(long)]
        version: i32,

        /// Security code, e.g. REL
        #[arg(long)]
        security_code: String,

        /// Number of units
        #[arg(long)]
        quantity: i32,

        /// INSERT, UPDATE or CANCEL
        #[arg(long, default_value = "UPDATE")]
        action: Action,

        /// BUY or SELL
        #[arg(long, default_value = "BUY")]
        side: Side,
    },

    /// Submit a comma-separated bulk block (one transaction per line)
    Bulk {
        /// Read the block from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Use the service's async bulk endpoint
        #[arg(long)]
        async_mode: bool,
    },

    /// Delete every transaction and position held by the service
    Clear,

    /// Seed the service's sample transaction set
    SampleData,

    /// Probe service health
    Health,

    /// Show the service's processing watermark
    State,

    /// Rebuild positions from scratch on the service
    Recalculate,

    /// Poll the service and re-render whenever either list changes
    Watch {
        /// Refresh interval in seconds
        #[arg(short, long, default_value = "5")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("equity_blotter=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let client = EquitiesClient::with_timeout(
        args.base_url.clone(),
        Duration::from_secs(args.timeout_secs),
    );
    let service = PositionService::new(client);

    match args.command {
        Commands::Positions => {
            let positions = service.refresh_positions().await?;
            print!("{}", blotter::positions_table(&positions));
        }

        Commands::Transactions => {
            let transactions = service.refresh_transactions().await?;
            print!("{}", blotter::transactions_table(&transactions));
        }

        Commands::Add {
            trade_id,
            version,
            security_code,
            quantity,
            action,
            side,
        } => {
            let transaction = Transaction {
                transaction_id: None,
                trade_id,
                version,
                security_code,
                quantity,
                action,
                side,
                is_latest_version: None,
            };
            submit(&service, transaction, EntryMode::New).await?;
        }

        Commands::Update {
            transaction_id,
            trade_id,
            version,
            security_code,
            quantity,
            action,
            side,
        } => {
            let history = service.refresh_transactions().await?;
            let current = history
                .iter()
                .find(|t| t.transaction_id == Some(transaction_id))
                .ok_or_else(|| anyhow!("Transaction {} not found", transaction_id))?;
            if !blotter::is_latest_version(current, &history) {
                return Err(anyhow!(blotter::EDIT_LATEST_ONLY));
            }

            let transaction = Transaction {
                transaction_id: Some(transaction_id),
                trade_id,
                version,
                security_code,
                quantity,
                action,
                side,
                is_latest_version: None,
            };
            submit(&service, transaction, EntryMode::Edit).await?;
        }

        Commands::Bulk { file, async_mode } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?,
                None => std::io::read_to_string(std::io::stdin().lock())?,
            };
            if text.trim().is_empty() {
                return Err(anyhow!("Please enter transactions."));
            }

            let transactions = bulk::parse_bulk(&text);
            if transactions.is_empty() {
                return Err(anyhow!("No valid transactions found."));
            }

            let positions = if async_mode {
                service.process_bulk_async(&transactions).await?
            } else {
                service.process_bulk(&transactions).await?
            };
            info!("{} transactions processed successfully", transactions.len());
            print!("{}", blotter::positions_table(&positions));
            print!("{}", blotter::transactions_table(&service.transactions()));
        }

        Commands::Clear => {
            service.clear_all().await?;
            info!("All transactions and positions cleared");
        }

        Commands::SampleData => {
            let positions = service.load_sample_data().await?;
            print!("{}", blotter::positions_table(&positions));
            print!("{}", blotter::transactions_table(&service.transactions()));
        }

        Commands::Health => match service.check_health().await {
            Ok(body) => {
                println!("Connected ({})", String::from_utf8_lossy(&body).trim());
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                println!("Disconnected");
                return Err(anyhow!("Backend service is not available."));
            }
        },

        Commands::State => {
            let state = service.processing_state().await?;
            println!("State key:                  {}", state.state_key);
            println!(
                "Last processed transaction: {}",
                state
                    .last_processed_transaction_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!(
                "Last processed at:          {}",
                state
                    .last_processed_timestamp
                    .map(|ts| ts.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }

        Commands::Recalculate => {
            let positions = service.force_recalculation().await?;
            print!("{}", blotter::positions_table(&positions));
        }

        Commands::Watch { interval } => {
            watch(service, interval).await?;
        }
    }

    Ok(())
}

/// Validate and submit one transaction, then print the refreshed blotter
async fn submit(
    service: &PositionService,
    transaction: Transaction,
    mode: EntryMode,
) -> Result<()> {
    entry::validate(&transaction, mode).map_err(|e| anyhow!(e))?;

    let positions = service.process_transaction(&transaction).await?;
    match mode {
        EntryMode::New => info!("Transaction added successfully"),
        EntryMode::Edit => info!("Transaction updated successfully"),
    }
    print!("{}", blotter::positions_table(&positions));
    print!("{}", blotter::transactions_table(&service.transactions()));
    Ok(())
}

/// Refresh on an interval and re-render whenever a subscription fires
async fn watch(service: PositionService, interval_secs: u64) -> Result<()> {
    match service.check_health().await {
        Ok(_) => info!("Backend status: Connected"),
        Err(_) => warn!("Backend service is not available."),
    }

    let mut positions_rx = service.subscribe_positions();
    let mut transactions_rx = service.subscribe_transactions();
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    info!("Watching (refresh every {}s, Ctrl-C to stop)", interval_secs.max(1));

    loop {
        let changed = tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = service.refresh_all().await {
                    warn!("Refresh failed: {}", e);
                }
                false
            }
            res = positions_rx.changed() => {
                res?;
                true
            }
            res = transactions_rx.changed() => {
                res?;
                true
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                break;
            }
        };

        if changed {
            // Drain both notifications so one refresh renders once.
            positions_rx.borrow_and_update();
            transactions_rx.borrow_and_update();
            render(&service);
        }
    }

    Ok(())
}

/// Print both tables from the current cache snapshots
fn render(service: &PositionService) {
    println!("=== {} ===", chrono::Local::now().format("%H:%M:%S"));
    print!("{}", blotter::positions_table(&service.positions()));
    print!("{}", blotter::transactions_table(&service.transactions()));
}
