//! capstan-bank binary — serves the demo banking API.

use std::net::SocketAddr;

use anyhow::Context;
use capstan_bank::{BankState, router};
use capstan_core::Settings;
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "capstan-bank", about = "Simple Bank demo API")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Force simulated withdrawal failures on, regardless of environment.
    #[arg(long)]
    fail_withdrawals: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,capstan_bank=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    // Explicit flag > BANK_FAIL_WITHDRAWALS > default off.
    let mut settings = Settings::new();
    if cli.fail_withdrawals {
        settings = settings.with_override("bank_fail_withdrawals", "true");
    }
    let fail_withdrawals = settings.get_bool("bank_fail_withdrawals").unwrap_or(false);
    if fail_withdrawals {
        warn!("simulated withdrawal failures are enabled");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    info!(%addr, "bank API starting");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding listener")?;
    axum::serve(listener, router(BankState { fail_withdrawals })).await?;

    Ok(())
}
