//! JSON API client — the single point of entry for backend HTTP calls.
//!
//! The backend wraps most responses in a `{ "success": bool, "data": T }`
//! envelope; the enveloped helpers unwrap it. A handful of endpoints return
//! the payload bare, so `from_enveloped_or_plain` tolerates both shapes.

use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Server returned an unsuccessful response envelope")]
    Envelope,
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorMessage {
    message: String,
}

/// Thin reqwest wrapper carrying the base URL and optional bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    /// Raw client, for requests that bypass the API host (presigned PUTs).
    pub fn http(&self) -> &Client {
        &self.client
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Value, ServiceError> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_error_message(&body);
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("API call succeeded: {status}");
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        Ok(response.json::<Value>().await?)
    }

    pub async fn get_value(&self, path: &str) -> Result<Value, ServiceError> {
        self.execute(self.request(Method::GET, path)).await
    }

    pub async fn post_value<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, ServiceError> {
        self.execute(self.request(Method::POST, path).json(body))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ServiceError> {
        self.execute(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// GET expecting a `{ success, data }` envelope.
    pub async fn get_enveloped<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        unwrap_envelope(serde_json::from_value(self.get_value(path).await?)?)
    }

    /// POST expecting a `{ success, data }` envelope.
    pub async fn post_enveloped<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        unwrap_envelope(serde_json::from_value(self.post_value(path, body).await?)?)
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, ServiceError> {
    if !envelope.success {
        return Err(ServiceError::Envelope);
    }
    envelope.data.ok_or(ServiceError::Envelope)
}

/// Accepts either an enveloped payload or the bare payload itself.
pub fn from_enveloped_or_plain<T: DeserializeOwned>(value: Value) -> Result<T, ServiceError> {
    if value.get("success").is_some() {
        return unwrap_envelope(serde_json::from_value(value)?);
    }
    Ok(serde_json::from_value(value)?)
}

/// Pulls a human-readable message out of an error body, falling back to the
/// raw text when it is not the expected JSON shape.
fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_error_message_extracts_structured_message() {
        let body = r#"{"error":{"code":"VALIDATION_ERROR","message":"bad input"}}"#;
        assert_eq!(parse_error_message(body), "bad input");
    }

    #[test]
    fn parse_error_message_falls_back_to_raw_body() {
        assert_eq!(parse_error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn enveloped_payload_is_unwrapped() {
        let value = json!({"success": true, "data": {"tailoringId": "t-1"}});
        let parsed: Value = from_enveloped_or_plain(value).unwrap();
        assert_eq!(parsed["tailoringId"], "t-1");
    }

    #[test]
    fn plain_payload_passes_through() {
        let value = json!({"tailoringId": "t-2"});
        let parsed: Value = from_enveloped_or_plain(value).unwrap();
        assert_eq!(parsed["tailoringId"], "t-2");
    }

    #[test]
    fn unsuccessful_envelope_is_an_error() {
        let value = json!({"success": false, "data": null});
        let result: Result<Value, _> = from_enveloped_or_plain(value);
        assert!(matches!(result, Err(ServiceError::Envelope)));
    }
}
