use anyhow::Result;
use clap::Parser;
use colored::*;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod cli;
mod constants;
mod report;
mod sheets;
mod speedtest;
mod utils;

use cli::{Cli, Status};
use constants::{CREDENTIALS_FILE, SPEEDTEST_SERVER_ID, SPREADSHEET_ENV};
use report::MeasurementRow;
use sheets::SheetsClient;
use speedtest::SpeedtestClient;
use utils::format::format_bandwidth;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let status = Status::new(cli.quiet);

    status.line("Checking OAuth credentials...");
    let sheets = SheetsClient::authorize(Path::new(CREDENTIALS_FILE)).await?;

    let name = sheets::spreadsheet_name(env::var(SPREADSHEET_ENV).ok());
    let sheet = sheets.open_by_name(&name).await?;

    status.line(format!(
        "Starting speed test against server {}...",
        SPEEDTEST_SERVER_ID.cyan()
    ));
    let client = SpeedtestClient::new()?;
    let candidates = client.servers_by_id(&[SPEEDTEST_SERVER_ID]).await?;
    let selected = client.best_server(candidates).await?;
    let download = client.download(&selected.server).await?;
    let upload = client.upload(&selected.server).await?;
    status.line(format!(
        "Speed test finished: {} down, {} up, {:.1} ms ping",
        format_bandwidth(download).green(),
        format_bandwidth(upload).green(),
        selected.latency_ms
    ));

    let row = MeasurementRow::now(download, upload, selected.latency_ms);
    sheets.append_row(&sheet, &row).await?;
    status.line(format!("Results written to spreadsheet '{}'", name.cyan()));

    Ok(())
}
