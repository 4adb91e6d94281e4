//! Google Sheets v4 values API backend.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use sheetbase_common::{Result, SheetbaseError};
use sheetbase_http::{HttpClient, HttpMethod, HttpResponse, RequestBuilder};
use std::sync::Arc;
use tracing::instrument;

use super::{SheetsBackend, TableRange};
use crate::auth::TokenProvider;

/// How the service interprets written cell strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueInputOption {
    /// Parsed as if typed into the UI (numbers, dates, booleans)
    #[default]
    UserEntered,
    /// Stored verbatim as text
    Raw,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::UserEntered => "USER_ENTERED",
            ValueInputOption::Raw => "RAW",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Backend over the Sheets REST API.
#[derive(Clone)]
pub struct SheetsApi {
    http: HttpClient,
    tokens: Arc<dyn TokenProvider>,
    value_input: ValueInputOption,
}

impl SheetsApi {
    /// `http` must carry the API base URL.
    pub fn new(http: HttpClient, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            tokens,
            value_input: ValueInputOption::default(),
        }
    }

    pub fn value_input(mut self, option: ValueInputOption) -> Self {
        self.value_input = option;
        self
    }

    fn spreadsheet_path(store_id: &str) -> String {
        format!("/v4/spreadsheets/{}", urlencoding::encode(store_id))
    }

    fn values_path(store_id: &str, range: &TableRange) -> String {
        format!(
            "{}/values/{}",
            Self::spreadsheet_path(store_id),
            urlencoding::encode(&range.to_a1())
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<HttpResponse> {
        let token = self.tokens.access_token().await?;
        let response = self.http.execute(request.bearer_auth(token)).await?;
        if !response.is_success() {
            return Err(remote_error(&response));
        }
        Ok(response)
    }
}

#[async_trait]
impl SheetsBackend for SheetsApi {
    #[instrument(skip(self))]
    async fn list_tables(&self, store_id: &str) -> Result<Vec<String>> {
        let request = self
            .http
            .request(HttpMethod::Get, &Self::spreadsheet_path(store_id))
            .query("fields", "sheets.properties.title");
        let body: SpreadsheetResponse = self.send(request).await?.json_as()?;
        Ok(body.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    #[instrument(skip(self, range), fields(range = %range))]
    async fn read_range(&self, store_id: &str, range: &TableRange) -> Result<Vec<Vec<String>>> {
        let request = self
            .http
            .request(HttpMethod::Get, &Self::values_path(store_id, range))
            .query("majorDimension", "ROWS");
        let body: ValueRangeResponse = self.send(request).await?.json_as()?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    #[instrument(skip(self, range), fields(range = %range))]
    async fn clear_range(&self, store_id: &str, range: &TableRange) -> Result<()> {
        let path = format!("{}:clear", Self::values_path(store_id, range));
        let request = self.http.request(HttpMethod::Post, &path).json_value(json!({}));
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, range, rows), fields(range = %range, rows = rows.len()))]
    async fn append_rows(
        &self,
        store_id: &str,
        range: &TableRange,
        rows: &[Vec<String>],
    ) -> Result<()> {
        let path = format!("{}:append", Self::values_path(store_id, range));
        let request = self
            .http
            .request(HttpMethod::Post, &path)
            .query("valueInputOption", self.value_input.as_str())
            .query("insertDataOption", "INSERT_ROWS")
            .json_value(json!({
                "range": range.to_a1(),
                "majorDimension": "ROWS",
                "values": rows,
            }));
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, range, rows), fields(range = %range, rows = rows.len()))]
    async fn write_range(
        &self,
        store_id: &str,
        range: &TableRange,
        rows: &[Vec<String>],
    ) -> Result<()> {
        let path = format!("{}/values:batchUpdate", Self::spreadsheet_path(store_id));
        let request = self.http.request(HttpMethod::Post, &path).json_value(json!({
            "valueInputOption": self.value_input.as_str(),
            "data": [{
                "range": range.to_a1(),
                "majorDimension": "ROWS",
                "values": rows,
            }],
        }));
        self.send(request).await?;
        Ok(())
    }
}

impl std::fmt::Debug for SheetsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsApi")
            .field("http", &self.http)
            .field("value_input", &self.value_input)
            .finish()
    }
}

fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Map a non-2xx response to `Remote`, keeping the service's own message.
///
/// Understands both the API error envelope (`{"error": {"message": ..}}`)
/// and the OAuth one (`{"error": "..", "error_description": ".."}`).
pub(crate) fn remote_error(response: &HttpResponse) -> SheetbaseError {
    let message = response
        .json()
        .ok()
        .and_then(|body| match &body["error"] {
            Value::Object(err) => err.get("message").and_then(Value::as_str).map(str::to_string),
            Value::String(code) => Some(
                body["error_description"]
                    .as_str()
                    .map(|desc| format!("{}: {}", code, desc))
                    .unwrap_or_else(|| code.clone()),
            ),
            _ => None,
        })
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(&response.body);
            text.chars().take(200).collect()
        });

    SheetbaseError::Remote {
        status: Some(response.status_code),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetbase_http::response::HttpResponseBuilder;

    #[test]
    fn test_remote_error_api_envelope() {
        let response = HttpResponseBuilder::new()
            .status_code(400)
            .body(
                br#"{"error": {"code": 400, "message": "Unable to parse range: 'Nope'", "status": "INVALID_ARGUMENT"}}"#
                    .to_vec(),
            )
            .build();
        assert_eq!(
            remote_error(&response),
            SheetbaseError::Remote {
                status: Some(400),
                message: "Unable to parse range: 'Nope'".to_string(),
            }
        );
    }

    #[test]
    fn test_remote_error_oauth_envelope() {
        let response = HttpResponseBuilder::new()
            .status_code(400)
            .body(br#"{"error": "invalid_grant", "error_description": "Invalid JWT Signature."}"#.to_vec())
            .build();
        assert_eq!(
            remote_error(&response).to_string(),
            "Remote service error (400): invalid_grant: Invalid JWT Signature."
        );
    }

    #[test]
    fn test_remote_error_plain_body() {
        let response = HttpResponseBuilder::new()
            .status_code(502)
            .body(b"Bad Gateway".to_vec())
            .build();
        assert_eq!(remote_error(&response).status(), Some(502));
        assert!(remote_error(&response).to_string().ends_with("Bad Gateway"));
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(json!("a")), "a");
        assert_eq!(cell_to_string(json!(12)), "12");
        assert_eq!(cell_to_string(json!(true)), "true");
        assert_eq!(cell_to_string(Value::Null), "");
    }

    #[test]
    fn test_paths_encode_range() {
        assert_eq!(
            SheetsApi::values_path("abc", &TableRange::whole("My Table")),
            "/v4/spreadsheets/abc/values/%27My%20Table%27"
        );
    }
}
