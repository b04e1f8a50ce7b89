//! Error types shared by the API client, drivers and store

use serde::{Deserialize, Serialize};
use transfer_http::FetchError;

/// Error body returned by the console API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        default,
        rename = "detailedMessage",
        skip_serializing_if = "Option::is_none"
    )]
    pub detailed_message: Option<String>,
}

/// UI-facing error shape carried by error snack messages
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponseHandler {
    pub error_message: String,
    pub detailed_error: String,
}

impl ErrorResponseHandler {
    pub fn new(error_message: impl Into<String>, detailed_error: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            detailed_error: detailed_error.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("A network error occurred: {0}")]
    Network(String),
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("download incomplete: expected {expected} bytes, received {received}")]
    SizeMismatch { expected: u64, received: u64 },
    #[error("transfer cancelled")]
    Cancelled,
    #[error("{0}")]
    Validation(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Db(String),
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        ConsoleError::Network(err.to_string())
    }
}

impl From<FetchError> for ConsoleError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Network(msg) => ConsoleError::Network(msg),
            FetchError::Io(e) => ConsoleError::Io(e),
            FetchError::Cancelled => ConsoleError::Cancelled,
        }
    }
}

/// Pull `detailedMessage` out of a JSON error body, if there is one.
pub fn detailed_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiError>(body)
        .ok()
        .and_then(|e| e.detailed_message)
        .filter(|m| !m.is_empty())
}

/// Turn an API error body into the snack message shape.
pub fn error_to_handler(err: &ApiError) -> ErrorResponseHandler {
    ErrorResponseHandler {
        error_message: err
            .message
            .clone()
            .unwrap_or_else(|| "An error occurred".to_string()),
        detailed_error: err.detailed_message.clone().unwrap_or_default(),
    }
}

impl ConsoleError {
    /// Snack message shape for any client-side failure
    pub fn to_handler(&self) -> ErrorResponseHandler {
        match self {
            ConsoleError::Http { message, .. } => {
                let parsed: ApiError = serde_json::from_str(message).unwrap_or(ApiError {
                    message: Some(message.clone()),
                    detailed_message: None,
                });
                error_to_handler(&parsed)
            }
            ConsoleError::Network(msg) => {
                ErrorResponseHandler::new("A network error occurred.", msg.clone())
            }
            other => ErrorResponseHandler::new(other.to_string(), ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detailed_message_reads_console_error_body() {
        let body = r#"{"message":"invalid","detailedMessage":"Bucket is locked"}"#;
        assert_eq!(detailed_message(body).as_deref(), Some("Bucket is locked"));
        assert_eq!(detailed_message("<html>"), None);
        assert_eq!(detailed_message(r#"{"detailedMessage":""}"#), None);
    }

    #[test]
    fn http_error_maps_to_handler_from_json_body() {
        let err = ConsoleError::Http {
            status: 403,
            message: r#"{"message":"Access Denied","detailedMessage":"not allowed"}"#.into(),
        };
        let handler = err.to_handler();
        assert_eq!(handler.error_message, "Access Denied");
        assert_eq!(handler.detailed_error, "not allowed");
    }

    #[test]
    fn plain_http_error_body_becomes_error_message() {
        let err = ConsoleError::Http {
            status: 502,
            message: "Bad Gateway".into(),
        };
        assert_eq!(err.to_handler().error_message, "Bad Gateway");
    }
}
