use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use reimburse_core::{Config, ConfigError, LocatorError, ReceiptRecord, SheetLocator};
use reimburse_ocr::{
    BatchOutcome, ImageInput, MockRecognizer, OcrBackend, PipelineError, ReceiptPipeline,
};
use reimburse_sheets::{GoogleSheetsClient, RecordEmitter, SheetsError};

use crate::{Cli, Command};

#[derive(Debug, Serialize)]
struct ExtractedRow<'a> {
    name: &'a str,
    #[serde(flatten)]
    record: &'a ReceiptRecord,
    expense_type: &'a str,
    project: &'a str,
    receipt_flag: &'a str,
}

#[derive(Debug, Serialize)]
struct FailedRow<'a> {
    name: &'a str,
    error: String,
}

#[derive(Debug, Serialize)]
struct ExtractOutput<'a> {
    receipts: Vec<ExtractedRow<'a>>,
    failures: Vec<FailedRow<'a>>,
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let recognizer = build_recognizer(cli.ocr_text.as_deref(), &config).await?;

    match cli.command {
        Command::Extract { images } => {
            let outcome = process(recognizer, &config, &images).await?;
            println!("{}", serde_json::to_string_pretty(&extract_output(&outcome))?);
        }
        Command::Send { sheet_url, access_token, images } => {
            // Reject a bad link before spending time on OCR.
            let locator = SheetLocator::parse(&sheet_url)?;
            let emitter = RecordEmitter::new(&config.destination)?;

            let outcome = process(recognizer, &config, &images).await?;
            report_failures(&outcome);

            let client = GoogleSheetsClient::new(
                &locator,
                access_token,
                config.destination.service_identity.clone(),
            );
            let records = outcome.records();
            if records.is_empty() {
                println!("No receipts could be read; nothing was added.");
                return Ok(());
            }
            let report = emitter.emit(&client, &records).await?;
            println!(
                "Added {} receipt(s) to rows {}-{}!",
                report.count, report.start_row, report.end_row
            );
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Ok(Config::load(p)?),
        None => Ok(Config::default()),
    }
}

async fn build_recognizer(ocr_text: Option<&Path>, config: &Config) -> Result<Box<dyn OcrBackend>> {
    if let Some(path) = ocr_text {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading OCR transcript {}", path.display()))?;
        return Ok(Box::new(MockRecognizer::new(text)));
    }
    tesseract_recognizer(config)
}

#[cfg(feature = "tesseract")]
fn tesseract_recognizer(config: &Config) -> Result<Box<dyn OcrBackend>> {
    use reimburse_ocr::recognizer::tesseract_backend::TesseractRecognizer;
    Ok(Box::new(TesseractRecognizer::new(
        config.recognition.data_path.clone(),
        &config.recognition.language,
    )))
}

#[cfg(not(feature = "tesseract"))]
fn tesseract_recognizer(_config: &Config) -> Result<Box<dyn OcrBackend>> {
    Err(reimburse_ocr::OcrError::NotAvailable.into())
}

async fn read_images(paths: &[PathBuf]) -> Result<Vec<ImageInput>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        images.push(ImageInput::new(name, bytes));
    }
    Ok(images)
}

/// Run the whole batch off the async runtime; OCR is CPU-bound.
async fn process(
    recognizer: Box<dyn OcrBackend>,
    config: &Config,
    paths: &[PathBuf],
) -> Result<BatchOutcome> {
    let images = read_images(paths).await?;
    let pipeline = ReceiptPipeline::new(recognizer, config);
    let outcome = tokio::task::spawn_blocking(move || pipeline.process_batch(&images))
        .await
        .context("receipt processing task panicked")??;
    tracing::info!(
        processed = outcome.receipts.len(),
        failed = outcome.failures.len(),
        "batch complete"
    );
    Ok(outcome)
}

fn extract_output(outcome: &BatchOutcome) -> ExtractOutput<'_> {
    ExtractOutput {
        receipts: outcome
            .receipts
            .iter()
            .map(|e| ExtractedRow {
                name: &e.name,
                record: &e.receipt.record,
                expense_type: e.receipt.record.expense_type(),
                project: e.receipt.record.project(),
                receipt_flag: e.receipt.record.receipt_flag(),
            })
            .collect(),
        failures: outcome
            .failures
            .iter()
            .map(|f| FailedRow { name: &f.name, error: f.error.to_string() })
            .collect(),
    }
}

fn report_failures(outcome: &BatchOutcome) {
    for f in &outcome.failures {
        eprintln!("Skipped {}: {}", f.name, f.error);
    }
}

/// What the user sees when a command fails.
///
/// Known failures print their own message; anything else is unexpected and
/// gets the full error chain for debugging.
pub fn user_message(err: &anyhow::Error) -> String {
    let known = err.downcast_ref::<SheetsError>().is_some()
        || err.downcast_ref::<PipelineError>().is_some()
        || err.downcast_ref::<LocatorError>().is_some()
        || err.downcast_ref::<ConfigError>().is_some()
        || err.downcast_ref::<reimburse_ocr::OcrError>().is_some();
    if known {
        format!("{err:#}")
    } else {
        format!("An unexpected error occurred.\n{err:?}")
    }
}
