use reimburse_core::{LocatorError, SchemaError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error(
        "I don't have access to that sheet yet. Open it, click Share, add {identity} \
         as an Editor, then try again."
    )]
    AccessDenied { identity: String },
    #[error("Google Sheets API error: {0}")]
    Backend(String),
    #[error(transparent)]
    InvalidLocator(#[from] LocatorError),
    #[error("Invalid column schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("Invalid cell range: '{0}'")]
    InvalidRange(String),
    #[error("No free template row in {0}; extend the sheet or raise destination.scan_rows")]
    NoFreeRow(String),
    #[error("Unexpected spreadsheet error: {0}")]
    Unclassified(String),
}
