use std::path::Path;
use thiserror::Error;

use reimburse_core::{BatchPolicy, Config, PreprocessConfig, ReceiptRecord};

use crate::extract::Extractor;
use crate::loader::{self, LoadError};
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{self, OcrBackend, OcrError};
use crate::types::{ImageInput, RecognitionOutput};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("Receipt {index} ({name}): {source}")]
    Image {
        /// 1-based position in the upload.
        index: usize,
        name: String,
        #[source]
        source: Box<PipelineError>,
    },
}

/// The result of a single receipt processing run.
#[derive(Debug, Clone)]
pub struct ProcessedReceipt {
    /// Text the recognition engine produced, kept for review and debugging.
    pub recognition: RecognitionOutput,
    /// Structured fields extracted from it.
    pub record: ReceiptRecord,
}

/// A successfully processed image and where it sat in the upload.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    /// 0-based position in the upload.
    pub index: usize,
    pub name: String,
    pub receipt: ProcessedReceipt,
}

#[derive(Debug)]
pub struct BatchFailure {
    /// 0-based position in the upload.
    pub index: usize,
    pub name: String,
    pub error: PipelineError,
}

/// Records in upload order, plus any images skipped under [`BatchPolicy::BestEffort`].
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub receipts: Vec<BatchEntry>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn records(&self) -> Vec<ReceiptRecord> {
        self.receipts.iter().map(|e| e.receipt.record.clone()).collect()
    }
}

/// Orchestrates: decode → preprocess → OCR (one or two passes) → extract.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
    preprocess: PreprocessConfig,
    dual_pass: bool,
    extractor: Extractor,
    policy: BatchPolicy,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R, config: &Config) -> Self {
        Self {
            recognizer,
            preprocess: config.preprocess.clone(),
            dual_pass: config.recognition.dual_pass,
            extractor: Extractor::new(&config.extract),
            policy: config.batch.policy,
        }
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<ProcessedReceipt, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        self.process_bytes(&bytes)
    }

    /// Process raw bytes of one uploaded image.
    pub fn process_bytes(&self, data: &[u8]) -> Result<ProcessedReceipt, PipelineError> {
        // 1. Decode.
        let raw = loader::load_image(data)?;

        // 2. Preprocess image.
        let prepared = preprocess::preprocess(&raw, &self.preprocess);
        drop(raw);
        let png = prepared.to_png()?;

        // 3. Run OCR.
        let recognition = recognizer::recognize_page(&self.recognizer, &png, self.dual_pass)?;

        // 4. Extract structured fields.
        let record = self.extractor.extract(&recognition);

        Ok(ProcessedReceipt { recognition, record })
    }

    /// Process every image in upload order, one at a time.
    ///
    /// Under [`BatchPolicy::FailFast`] the first failure aborts the batch;
    /// under [`BatchPolicy::BestEffort`] failures are collected and the
    /// remaining images still run.
    pub fn process_batch(&self, images: &[ImageInput]) -> Result<BatchOutcome, PipelineError> {
        let mut outcome = BatchOutcome::default();
        for (index, input) in images.iter().enumerate() {
            tracing::info!(index = index + 1, name = %input.name, "processing receipt");
            match self.process_bytes(&input.bytes) {
                Ok(receipt) => {
                    tracing::debug!(name = %input.name, record = ?receipt.record, "extracted receipt");
                    outcome.receipts.push(BatchEntry { index, name: input.name.clone(), receipt });
                }
                Err(error) => match self.policy {
                    BatchPolicy::FailFast => {
                        return Err(PipelineError::Image {
                            index: index + 1,
                            name: input.name.clone(),
                            source: Box::new(error),
                        });
                    }
                    BatchPolicy::BestEffort => {
                        tracing::warn!(name = %input.name, "skipping receipt: {error}");
                        outcome.failures.push(BatchFailure { index, name: input.name.clone(), error });
                    }
                },
            }
        }
        Ok(outcome)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::MockRecognizer;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn config(policy: BatchPolicy) -> Config {
        let mut c = Config::default();
        // Keep test images tiny.
        c.preprocess.resolution_floor = 16;
        c.batch.policy = policy;
        c
    }

    fn batch() -> Vec<ImageInput> {
        vec![
            ImageInput::new("a.png", tiny_png()),
            ImageInput::new("b.txt", b"not an image".to_vec()),
            ImageInput::new("c.png", tiny_png()),
        ]
    }

    #[test]
    fn process_bytes_produces_record() {
        let pipeline = ReceiptPipeline::new(
            MockRecognizer::new("JOE'S COFFEE\n03/14/2024\nTotal $13.50 USD\nVISA"),
            &config(BatchPolicy::FailFast),
        );
        let result = pipeline.process_bytes(&tiny_png()).unwrap();
        assert_eq!(result.record.description, "JOE'S COFFEE");
        assert_eq!(result.record.date, "03/14/2024");
        assert_eq!(result.record.local_amount_text(), "13.50");
        assert_eq!(result.record.currency_text(), "USD");
        assert_eq!(result.recognition.text.lines().count(), 4);
    }

    #[test]
    fn dual_pass_feeds_sparse_lines_to_extractor() {
        let recognizer = MockRecognizer::new("Latte 4.00\nTotal 4.00").with_sparse("BLUE BOTTLE");
        let pipeline = ReceiptPipeline::new(recognizer, &config(BatchPolicy::FailFast));
        let result = pipeline.process_bytes(&tiny_png()).unwrap();
        assert_eq!(result.recognition.lines[0], "BLUE BOTTLE");
        assert_eq!(result.record.description, "BLUE BOTTLE");
    }

    #[test]
    fn undecodable_bytes_fail_with_unreadable_image() {
        let pipeline =
            ReceiptPipeline::new(MockRecognizer::new(""), &config(BatchPolicy::FailFast));
        let err = pipeline.process_bytes(b"GIF89a garbage").unwrap_err();
        assert!(matches!(err, PipelineError::Load(LoadError::UnreadableImage { .. })));
    }

    #[test]
    fn fail_fast_aborts_on_first_bad_image() {
        let pipeline =
            ReceiptPipeline::new(MockRecognizer::new("X"), &config(BatchPolicy::FailFast));
        let err = pipeline.process_batch(&batch()).unwrap_err();
        match err {
            PipelineError::Image { index, name, source } => {
                assert_eq!(index, 2);
                assert_eq!(name, "b.txt");
                assert!(matches!(*source, PipelineError::Load(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn best_effort_keeps_order_and_reports_failures() {
        let pipeline =
            ReceiptPipeline::new(MockRecognizer::new("X"), &config(BatchPolicy::BestEffort));
        let outcome = pipeline.process_batch(&batch()).unwrap();
        let names: Vec<&str> = outcome.receipts.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "c.png"]);
        assert_eq!(outcome.receipts[1].index, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert_eq!(outcome.failures[0].name, "b.txt");
        assert_eq!(outcome.records().len(), 2);
    }

    #[test]
    fn default_config_skips_bad_image_and_keeps_siblings() {
        let mut c = Config::default();
        c.preprocess.resolution_floor = 16;
        let pipeline = ReceiptPipeline::new(MockRecognizer::new("X"), &c);
        let outcome = pipeline.process_batch(&batch()).unwrap();
        let names: Vec<&str> = outcome.receipts.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "c.png"]);
        assert_eq!(outcome.failures[0].name, "b.txt");
    }

    #[test]
    fn empty_batch_is_empty_outcome() {
        let pipeline =
            ReceiptPipeline::new(MockRecognizer::new("X"), &config(BatchPolicy::FailFast));
        let outcome = pipeline.process_batch(&[]).unwrap();
        assert!(outcome.receipts.is_empty() && outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn process_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, tiny_png()).unwrap();

        let pipeline =
            ReceiptPipeline::new(MockRecognizer::new("CAFE\n9.99"), &config(BatchPolicy::FailFast));
        let result = pipeline.process_file(&path).await.unwrap();
        assert_eq!(result.record.local_amount_text(), "9.99");
    }

    #[tokio::test]
    async fn process_file_missing_is_io_error() {
        let pipeline =
            ReceiptPipeline::new(MockRecognizer::new(""), &config(BatchPolicy::FailFast));
        let err = pipeline.process_file(Path::new("/nonexistent/receipt.png")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
