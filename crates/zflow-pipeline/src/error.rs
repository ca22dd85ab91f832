use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("workspace {0} not found")]
    WorkspaceNotFound(String),

    #[error("workspace {0} belongs to another user")]
    NotOwner(String),

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("no tokens left")]
    InsufficientTokens,

    #[error("persistence failure: {0}")]
    Persistence(#[from] anyhow::Error),
}
