//! Pipeline and destination settings, loaded from TOML.
//!
//! Every section has defaults matching the reimbursement template, so an
//! empty file (or no file) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::{column_index, ColumnSchema, SchemaError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid column schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preprocess: PreprocessConfig,
    pub recognition: RecognitionConfig,
    pub extract: ExtractConfig,
    pub batch: BatchConfig,
    pub destination: DestinationConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validated()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.destination.schema = self.destination.schema.resolve()?;
        column_index(&self.destination.date_column)?;
        if self.destination.first_data_row == 0 {
            return Err(ConfigError::Invalid("destination.first_data_row must be >= 1".into()));
        }
        if !(0.0..50.0).contains(&self.preprocess.clip_percent) {
            return Err(ConfigError::Invalid(
                "preprocess.clip_percent must be in [0, 50)".into(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Images whose longest side is shorter than this are upscaled to it.
    pub resolution_floor: u32,
    /// Percentage of pixels clipped at each end before the contrast stretch.
    pub clip_percent: f32,
    pub sharpen: bool,
    pub sharpen_sigma: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { resolution_floor: 1500, clip_percent: 1.0, sharpen: false, sharpen_sigma: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Run a sparse-text pass in addition to the full-page pass.
    pub dual_pass: bool,
    pub language: String,
    pub data_path: Option<String>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self { dual_pass: true, language: "eng".to_string(), data_path: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// How many lines from the top are considered for the merchant name.
    pub merchant_scan_lines: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { merchant_scan_lines: 10 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Abort the whole batch on the first image that fails.
    FailFast,
    /// Keep going; report failed images alongside the records that succeeded.
    #[default]
    BestEffort,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub policy: BatchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// First template row that may receive a receipt (1-based).
    pub first_data_row: u32,
    /// Column checked for blank/placeholder values when locating free rows.
    pub date_column: String,
    /// Cell values that count as an unused template row.
    pub placeholders: Vec<String>,
    /// How many rows below `first_data_row` are read when locating free rows.
    pub scan_rows: u32,
    /// Worksheet title; the first sheet when unset.
    pub worksheet: Option<String>,
    /// Identity that must be granted editor access to the sheet.
    pub service_identity: String,
    pub schema: ColumnSchema,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            first_data_row: 19,
            date_column: "B".to_string(),
            placeholders: vec!["".to_string(), "None".to_string(), "-".to_string()],
            scan_rows: 500,
            worksheet: None,
            service_identity: "reimbursements@reimbursements.iam.gserviceaccount.com".to_string(),
            schema: ColumnSchema::default(),
        }
    }
}
