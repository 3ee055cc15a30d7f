//! Google Sheets REST (v4) writer.
//!
//! The client never authenticates by itself: it is handed an OAuth access
//! token that some other component already obtained for the service identity.

use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use reimburse_core::SheetLocator;

use crate::error::SheetsError;
use crate::writer::{RangeUpdate, SheetWriter, WriteRequest};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

pub struct GoogleSheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
    service_identity: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateBody<'a> {
    value_input_option: &'static str,
    data: &'a [RangeUpdate],
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GoogleSheetsClient {
    pub fn new(
        locator: &SheetLocator,
        access_token: impl Into<String>,
        service_identity: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: SHEETS_API_BASE.to_string(),
            spreadsheet_id: locator.spreadsheet_id.clone(),
            access_token: access_token.into(),
            service_identity: service_identity.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `{base}/{id}/{segments...}`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SheetsError::Unclassified(format!("bad API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Unclassified("API base URL cannot hold a path".into()))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body, &self.service_identity))
    }
}

impl SheetWriter for GoogleSheetsClient {
    async fn read_column(&self, range: &str) -> Result<Vec<String>, SheetsError> {
        let url = self.url(&["values", range])?;
        tracing::debug!(%url, "reading template column");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(transport)?;
        let response = self.check(response).await?;
        let body: ValueRange = response
            .json()
            .await
            .map_err(|e| SheetsError::Unclassified(format!("unreadable values response: {e}")))?;
        Ok(body.values.iter().map(|row| row.first().map(cell_text).unwrap_or_default()).collect())
    }

    async fn write(&self, request: &WriteRequest) -> Result<(), SheetsError> {
        let url = self.url(&["values:batchUpdate"])?;
        let body = BatchUpdateBody { value_input_option: "USER_ENTERED", data: &request.updates };
        tracing::debug!(%url, ranges = request.updates.len(), "writing receipt rows");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        self.check(response).await?;
        Ok(())
    }
}

fn transport(e: reqwest::Error) -> SheetsError {
    SheetsError::Backend(e.to_string())
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Map a non-success response onto the error taxonomy.
fn classify_failure(status: StatusCode, body: &str, identity: &str) -> SheetsError {
    if matches!(status, StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED) {
        return SheetsError::AccessDenied { identity: identity.to_string() };
    }
    let detail = match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(env) if !env.error.message.is_empty() => {
            if env.error.status.is_empty() {
                env.error.message
            } else {
                format!("{} ({})", env.error.message, env.error.status)
            }
        }
        _ if body.trim().is_empty() => status.canonical_reason().unwrap_or("no body").to_string(),
        _ => body.trim().to_string(),
    };
    SheetsError::Backend(format!("HTTP {}: {detail}", status.as_u16()))
}
