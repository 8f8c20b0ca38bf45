use thiserror::Error;

/// Why a send did not produce a bot message
#[derive(Debug, Error)]
pub enum SendError {
    #[error("input is empty")]
    EmptyInput,

    #[error("a message is already being sent")]
    AlreadySending,

    #[error("Error del servidor: {status} {body}")]
    Server { status: u16, body: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid JSON in reply: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("send task did not complete: {0}")]
    Task(String),
}

impl SendError {
    /// Dropped submissions. These never reach the user or the error banner.
    pub fn is_silent(&self) -> bool {
        matches!(self, SendError::EmptyInput | SendError::AlreadySending)
    }
}
