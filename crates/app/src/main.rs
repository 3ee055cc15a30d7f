use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "reimburse")]
#[command(about = "Read receipt photos and append them to a reimbursement spreadsheet")]
pub struct Cli {
    /// TOML configuration file (defaults match the reimbursement template)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Use this transcript for every image instead of running OCR
    #[arg(long, global = true)]
    pub ocr_text: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the fields extracted from each receipt as JSON
    Extract {
        /// Receipt images, in the order they should appear on the sheet
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Extract receipts and append them to the first free template rows
    Send {
        /// Link to the Google Sheet (shared with the service identity as Editor)
        #[arg(long)]
        sheet_url: String,

        /// OAuth access token for the service identity
        #[arg(long, env = "REIMBURSE_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,

        /// Receipt images, in the order they should appear on the sheet
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", commands::user_message(&e));
            ExitCode::FAILURE
        }
    }
}
