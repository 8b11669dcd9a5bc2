use crate::models::ErrorEnvelope;
use crate::validation::FieldErrors;
use axum::response::{Html, IntoResponse, Response};
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("session expired")]
    Unauthorized { envelope: ErrorEnvelope },

    #[error("session refresh failed with HTTP {status}")]
    RefreshFailed {
        status: StatusCode,
        envelope: ErrorEnvelope,
    },

    #[error("server answered HTTP {status}")]
    Status {
        status: StatusCode,
        envelope: ErrorEnvelope,
    },

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input")]
    Validation(FieldErrors),
}

impl ApiError {
    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            ApiError::Unauthorized { envelope }
            | ApiError::RefreshFailed { envelope, .. }
            | ApiError::Status { envelope, .. } => Some(envelope),
            _ => None,
        }
    }

    /// The server's own message if it sent one, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.envelope()
            .and_then(|envelope| envelope.error_message.clone())
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized { .. } | ApiError::RefreshFailed { .. }
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::RefreshFailed { status, .. } | ApiError::Status { status, .. } => {
                Some(*status)
            }
            ApiError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// A failure of the local web front end itself, shown as an error page.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        let status = match &err {
            ApiError::Transport(_) => StatusCode::BAD_GATEWAY,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            other => other.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        };
        Self {
            status,
            message: err.user_message(&err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Html(crate::ui::render_error(self.status, &self.message))).into_response()
    }
}
