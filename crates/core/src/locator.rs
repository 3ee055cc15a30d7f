use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("That doesn't look like a Google Sheets link: '{0}'")]
    InvalidLocator(String),
}

fn re_sheet_id() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("invalid regex"))
}

/// Opaque identifier of the destination spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLocator {
    pub spreadsheet_id: String,
}

impl SheetLocator {
    /// Pull the spreadsheet id out of a share or edit URL.
    pub fn parse(url: &str) -> Result<Self, LocatorError> {
        let id = re_sheet_id()
            .captures(url)
            .and_then(|c| c.get(1))
            .ok_or_else(|| LocatorError::InvalidLocator(url.to_string()))?;
        Ok(SheetLocator { spreadsheet_id: id.as_str().to_string() })
    }
}
