use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::Decode(e.to_string())
        } else {
            AppError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Decode(e.to_string())
    }
}

impl AppError {
    /// Builds the error for a non-success HTTP response.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => AppError::Unauthorized,
            404 => AppError::NotFound,
            _ => AppError::Api {
                status,
                message: extract_detail(&body),
            },
        }
    }

    /// Returns whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Transport(_) => true,
            AppError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound)
    }

    /// HTTP status that produced this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AppError::Api { status, .. } => Some(*status),
            AppError::NotFound => Some(404),
            AppError::Unauthorized => Some(401),
            _ => None,
        }
    }
}

/// Pulls a human readable message out of a DRF-style error body
/// (`{"detail": "..."}`, `{"field": ["..."]}`), falling back to the raw text.
fn extract_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return if body.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            body.trim().to_string()
        };
    };

    if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
        return detail.to_string();
    }

    if let Some(fields) = value.as_object() {
        let messages: Vec<String> = fields
            .iter()
            .filter_map(|(field, v)| {
                let text = match v {
                    serde_json::Value::Array(items) => items
                        .iter()
                        .filter_map(|i| i.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                    serde_json::Value::String(s) => s.clone(),
                    _ => return None,
                };
                Some(format!("{field}: {text}"))
            })
            .collect();
        if !messages.is_empty() {
            return messages.join("; ");
        }
    }

    value.to_string()
}

/// User-visible stakes of a failed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Primary action (composing a message): surfaced to the user
    Alert,
    /// Best-effort side action: logged and dropped
    Logged,
}

pub fn log_failure(action: &str, severity: Severity, err: &AppError) {
    match severity {
        Severity::Alert => error!(action, error = %err, "action failed"),
        Severity::Logged => warn!(action, error = %err, "best-effort action failed"),
    }
}
