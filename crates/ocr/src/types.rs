use serde::{Deserialize, Serialize};

/// Text produced by the recognition engine for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionOutput {
    /// Full-page pass, as returned by the engine.
    pub text: String,
    /// Trimmed, non-blank lines in reading order; sparse-pass lines first
    /// when a second pass ran, duplicates removed.
    pub lines: Vec<String>,
}

impl RecognitionOutput {
    /// Single-pass output: the lines are just the blob's own lines.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = crate::recognizer::merge_lines(&[text.as_str()]);
        Self { text, lines }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.lines.is_empty()
    }
}

/// One uploaded file: a display name for diagnostics plus its bytes.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }
}
