//! Errandline - terminal client for errandline vendors and dispatchers.
//!
//! Vendors review and process orders, manage catalogue prices and request
//! payouts. Dispatchers see their assigned deliveries and mark them complete.
//! Every list works offline from the last successful fetch.

mod app;
mod render;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use errandline_core::auth::Role;
use errandline_core::config::Config;
use errandline_core::vendor::PriceUpdate;

use app::{App, Reported};

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "errandline.log";

#[derive(Parser, Debug)]
#[command(name = "errandline", version, about = "Errandline vendor and dispatcher client")]
struct Cli {
    /// Override the backend base URL for this run
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in as a vendor or dispatcher
    Login {
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
        /// Username (vendor) or email (dispatcher)
        #[arg(long)]
        login: Option<String>,
    },
    /// End the session on this device
    Logout {
        /// Also remove the saved password from the keychain
        #[arg(long)]
        forget: bool,
    },
    /// Show who is logged in
    Status,
    /// List orders, or show one
    Orders {
        id: Option<i64>,
        /// Show cached data without contacting the backend
        #[arg(long)]
        offline: bool,
    },
    /// Payment history
    Transactions {
        #[arg(long)]
        offline: bool,
    },
    /// Vendor catalogue
    Items {
        #[arg(long)]
        offline: bool,
    },
    /// Vendor home screen
    Dashboard {
        #[arg(long)]
        offline: bool,
    },
    /// Refresh every list for the current role
    Refresh,
    /// Start work on a paid order (vendor)
    Process { id: i64 },
    /// Mark an assigned order delivered (dispatcher)
    Complete { id: i64 },
    /// Request a payout to the vendor bank account
    Withdraw { amount: String },
    /// Manage catalogue items (vendor)
    Item {
        #[command(subcommand)]
        command: ItemCommand,
    },
    /// Push notification registration
    Push {
        #[command(subcommand)]
        command: PushCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ItemCommand {
    /// Set a flat price, or per-service laundry prices
    Price {
        id: i64,
        #[arg(long, conflicts_with_all = ["wash", "iron", "starch"])]
        price: Option<String>,
        #[arg(long)]
        wash: Option<String>,
        #[arg(long)]
        iron: Option<String>,
        #[arg(long)]
        starch: Option<String>,
    },
    /// Remove an item from the catalogue
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum PushCommand {
    /// Show the stored device token and whether the backend has it
    Status,
    /// Report the device token to the backend
    Sync,
    /// Remove the device token from the backend and this device
    Unregister,
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.to_lowercase().parse::<Role>().map_err(|e| e.to_string())
}

/// Initialize the tracing subscriber. Warnings go to stderr; everything at
/// the filter level also goes to a daily log file when a data directory
/// exists.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file = Config::default()
        .log_dir()
        .ok()
        .and_then(|dir| std::fs::create_dir_all(&dir).ok().map(|_| dir))
        .map(|dir| tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX)));

    let (file_layer, guard) = match file {
        Some((writer, guard)) => (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

/// Print a failure unless the user has already seen it as a notice.
fn report(err: &anyhow::Error) -> ExitCode {
    if !err.is::<Reported>() {
        eprintln!("Error: {:#}", err);
    }
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();
    info!("Errandline starting");

    match run(cli).await {
        Ok(()) => {
            info!("Errandline finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            debug!(error = %e, "Errandline failed");
            report(&e)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut app = App::new(cli.base_url).await?;

    match cli.command {
        Command::Login { role, login } => app.login(role, login).await?,
        Command::Logout { forget } => app.logout(forget).await?,
        Command::Status => print!("{}", render::session(app.state())),
        Command::Orders { id: Some(id), .. } => app.show_order(id)?,
        Command::Orders { id: None, offline } => app.show_orders(offline).await?,
        Command::Transactions { offline } => app.show_transactions(offline).await?,
        Command::Items { offline } => app.show_items(offline).await?,
        Command::Dashboard { offline } => app.show_dashboard(offline).await?,
        Command::Refresh => app.refresh_all().await?,
        Command::Process { id } => app.process_order(id).await?,
        Command::Complete { id } => app.complete_order(id).await?,
        Command::Withdraw { amount } => app.withdraw(&amount).await?,
        Command::Item { command } => match command {
            ItemCommand::Price { id, price, wash, iron, starch } => {
                let update = match price {
                    Some(price) => PriceUpdate::flat(&price)?,
                    None => PriceUpdate::laundry(
                        wash.as_deref().unwrap_or(""),
                        iron.as_deref().unwrap_or(""),
                        starch.as_deref().unwrap_or(""),
                    )?,
                };
                app.update_item_price(id, update).await?
            }
            ItemCommand::Delete { id } => app.delete_item(id).await?,
        },
        Command::Push { command } => match command {
            PushCommand::Status => app.push_status()?,
            PushCommand::Sync => app.push_sync().await?,
            PushCommand::Unregister => app.push_unregister().await?,
        },
    }
    Ok(())
}
