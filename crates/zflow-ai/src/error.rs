use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("request to model failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("generated code is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("generated code has unexpected shape: {0}")]
    Schema(String),
}

impl AiError {
    /// Parse and schema failures come from the model's output rather than
    /// the transport, so a caller can keep going without the result.
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Schema(_))
    }
}
