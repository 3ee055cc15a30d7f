use std::collections::HashSet;
use thiserror::Error;

use crate::types::RecognitionOutput;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available - build with `tesseract` feature")]
    NotAvailable,
}

/// How the engine should segment the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentationMode {
    /// Running text in blocks and paragraphs (line items).
    FullPage,
    /// Scattered words with no assumed layout (headers, totals, footers).
    SparseText,
}

impl SegmentationMode {
    /// Tesseract `--psm` value.
    pub fn psm(self) -> u8 {
        match self {
            SegmentationMode::FullPage => 3,
            SegmentationMode::SparseText => 11,
        }
    }
}

/// Abstraction over an OCR backend.
/// Implementations accept PNG image bytes and return the recognized text.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_png: &[u8], mode: SegmentationMode) -> Result<String, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image_png: &[u8], mode: SegmentationMode) -> Result<String, OcrError> {
        (**self).recognize(image_png, mode)
    }
}

/// Run the full-page pass, and the sparse pass when `dual_pass` is set.
pub fn recognize_page<R: OcrBackend + ?Sized>(
    backend: &R,
    image_png: &[u8],
    dual_pass: bool,
) -> Result<RecognitionOutput, OcrError> {
    let text = backend.recognize(image_png, SegmentationMode::FullPage)?;
    if !dual_pass {
        return Ok(RecognitionOutput::from_text(text));
    }
    let sparse = backend.recognize(image_png, SegmentationMode::SparseText)?;
    let lines = merge_lines(&[sparse.as_str(), text.as_str()]);
    tracing::debug!(
        sparse_lines = sparse.lines().count(),
        full_lines = text.lines().count(),
        merged = lines.len(),
        "merged recognition passes"
    );
    Ok(RecognitionOutput { text, lines })
}

/// Concatenate the lines of each pass in order, keeping only the first
/// occurrence of each line. Lines are trimmed and blank ones dropped.
pub fn merge_lines(passes: &[&str]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::new();
    for line in passes.iter().flat_map(|p| p.lines()).map(str::trim) {
        if !line.is_empty() && seen.insert(line) {
            merged.push(line.to_string());
        }
    }
    merged
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns preset text - useful for unit testing the extraction pipeline
/// without requiring Tesseract to be installed.
pub struct MockRecognizer {
    pub text: String,
    /// Returned for [`SegmentationMode::SparseText`]; falls back to `text`.
    pub sparse_text: Option<String>,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), sparse_text: None }
    }

    pub fn with_sparse(mut self, sparse: impl Into<String>) -> Self {
        self.sparse_text = Some(sparse.into());
        self
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_png: &[u8], mode: SegmentationMode) -> Result<String, OcrError> {
        match (mode, &self.sparse_text) {
            (SegmentationMode::SparseText, Some(sparse)) => Ok(sparse.clone()),
            _ => Ok(self.text.clone()),
        }
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, SegmentationMode};
    use leptess::{LepTess, Variable};

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_png: &[u8], mode: SegmentationMode) -> Result<String, OcrError> {
            // A fresh engine per call keeps the backend stateless, so it is Sync.
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, &mode.psm().to_string())
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_png)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingRecognizer;

    impl OcrBackend for FailingRecognizer {
        fn recognize(&self, _: &[u8], _: SegmentationMode) -> Result<String, OcrError> {
            Err(OcrError::Engine("engine crashed".into()))
        }
    }

    #[test]
    fn mock_returns_preset_text() {
        let r = MockRecognizer::new("STARBUCKS\n$5.50\nVISA");
        assert_eq!(
            r.recognize(b"fake image data", SegmentationMode::FullPage).unwrap(),
            "STARBUCKS\n$5.50\nVISA"
        );
    }

    #[test]
    fn mock_sparse_mode_falls_back_to_text() {
        let r = MockRecognizer::new("hello");
        assert_eq!(r.recognize(b"", SegmentationMode::SparseText).unwrap(), "hello");
        let r = r.with_sparse("sparse");
        assert_eq!(r.recognize(b"", SegmentationMode::SparseText).unwrap(), "sparse");
        assert_eq!(r.recognize(b"", SegmentationMode::FullPage).unwrap(), "hello");
    }

    #[test]
    fn psm_values() {
        assert_eq!(SegmentationMode::FullPage.psm(), 3);
        assert_eq!(SegmentationMode::SparseText.psm(), 11);
    }

    #[test]
    fn merge_puts_sparse_first_and_dedups() {
        let sparse = "JOE'S COFFEE\nTotal 13.50\nThank you";
        let full = "JOE'S COFFEE\nLatte 4.00\nTotal 13.50\nLatte 4.00";
        assert_eq!(
            merge_lines(&[sparse, full]),
            vec!["JOE'S COFFEE", "Total 13.50", "Thank you", "Latte 4.00"]
        );
    }

    #[test]
    fn merge_drops_blank_lines_and_trims() {
        assert_eq!(merge_lines(&["  a \n\n   \nb", "a\n b"]), vec!["a", "b"]);
    }

    #[test]
    fn merge_is_exact_match_only() {
        assert_eq!(merge_lines(&["Total", "TOTAL"]), vec!["Total", "TOTAL"]);
    }

    #[test]
    fn single_pass_skips_sparse_mode() {
        let r = MockRecognizer::new("full").with_sparse("sparse");
        let out = recognize_page(&r, b"", false).unwrap();
        assert_eq!(out.text, "full");
        assert_eq!(out.lines, vec!["full"]);
    }

    #[test]
    fn dual_pass_merges_both_modes() {
        let r = MockRecognizer::new("Latte 4.00\nTotal 4.00").with_sparse("CAFE\nTotal 4.00");
        let out = recognize_page(&r, b"", true).unwrap();
        assert_eq!(out.text, "Latte 4.00\nTotal 4.00");
        assert_eq!(out.lines, vec!["CAFE", "Total 4.00", "Latte 4.00"]);
    }

    #[test]
    fn engine_errors_propagate() {
        let err = recognize_page(&FailingRecognizer, b"", true).unwrap_err();
        assert!(err.to_string().contains("engine crashed"));
    }
}
