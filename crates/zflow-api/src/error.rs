use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use zflow_pipeline::PipelineError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Not signed in")]
    Unauthorized,

    #[error("User session expired. Please sign in again.")]
    SessionExpired,

    #[error("Authentication failed. Please sign in again.")]
    AuthFailed,

    #[error("No tokens left")]
    InsufficientTokens,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// A call to the model or identity provider failed.
    #[error("{context}")]
    Upstream {
        context: &'static str,
        details: String,
    },

    #[error("Internal server error")]
    Persistence(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::SessionExpired | Self::AuthFailed => {
                StatusCode::UNAUTHORIZED
            }
            Self::InsufficientTokens => StatusCode::PAYMENT_REQUIRED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { .. } | Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.to_string(),
            "success": false,
        });

        match &self {
            Self::Upstream { details, .. } => {
                body["details"] = json!(details);
            }
            Self::Persistence(e) => {
                error!("Persistence failure: {:#}", e);
            }
            _ => {}
        }

        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::EmptyMessage => Self::InvalidInput("Please enter a message".into()),
            PipelineError::WorkspaceNotFound(_) => Self::NotFound("Workspace"),
            PipelineError::NotOwner(_) => Self::Forbidden,
            PipelineError::UserNotFound(_) => Self::SessionExpired,
            PipelineError::InsufficientTokens => Self::InsufficientTokens,
            PipelineError::Persistence(e) => Self::Persistence(e),
        }
    }
}
