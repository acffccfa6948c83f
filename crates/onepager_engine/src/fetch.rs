use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode};
use serde_json::Value;

use crate::{BackendConfig, FailureKind, FetchError};

/// Longest plain-text error body worth showing to a user.
const MAX_TEXT_ERROR_CHARS: usize = 500;

pub(crate) fn build_client(config: &BackendConfig) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

pub(crate) fn parse_url(url: &str) -> Result<reqwest::Url, FetchError> {
    reqwest::Url::parse(url).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
}

pub(crate) fn with_query(url: &str, key: &str, value: &str) -> Result<reqwest::Url, FetchError> {
    let mut parsed = parse_url(url)?;
    parsed.query_pairs_mut().append_pair(key, value);
    Ok(parsed)
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

pub(crate) fn status_error(status: StatusCode, message: impl Into<String>) -> FetchError {
    FetchError::new(FailureKind::HttpStatus(status.as_u16()), message)
}

/// Parse a 2xx JSON body; any other status is an error.
pub(crate) async fn read_json(response: Response) -> Result<Value, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status, status.to_string()));
    }
    response.json::<Value>().await.map_err(map_reqwest_error)
}

/// Stream the body into memory, failing once it exceeds `max_bytes`.
pub(crate) async fn read_body(response: Response, max_bytes: u64) -> Result<Bytes, FetchError> {
    if let Some(content_len) = response.content_length() {
        if content_len > max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(content_len),
                },
                "response too large",
            ));
        }
    }

    let mut buffer = BytesMut::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = buffer.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(next_len),
                },
                "response too large",
            ));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

/// What a failed response says about itself.
pub(crate) struct ErrorDetails {
    pub message: String,
    /// The body carried `validationError: true`.
    pub flagged_validation: bool,
}

pub(crate) async fn error_details(response: Response) -> ErrorDetails {
    let status = response.status();
    let fallback = format!("HTTP {}", status.as_u16());
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    if is_json {
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        let message = ["message", "error"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .unwrap_or(fallback);
        let flagged_validation = body.get("validationError") == Some(&Value::Bool(true));
        return ErrorDetails {
            message,
            flagged_validation,
        };
    }

    let text = response.text().await.unwrap_or_default();
    let message = if !text.trim().is_empty() && text.chars().count() < MAX_TEXT_ERROR_CHARS {
        text.trim().to_string()
    } else {
        fallback
    };
    ErrorDetails {
        message,
        flagged_validation: false,
    }
}
