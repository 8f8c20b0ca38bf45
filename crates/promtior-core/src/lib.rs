pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod pipeline;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use client::{ChatBackend, RagClient, INVOKE_PATH};
pub use config::Config;
pub use error::SendError;
pub use payload::{normalize, Content, ResponsePayload, EMPTY_RESPONSE_TEXT};
pub use pipeline::{ChatView, PendingSend, SendPipeline, SendState, ERROR_BANNER_TEXT};
pub use state::{ChatMessage, ChatRole};
pub use transcript::{Row, Transcript, TYPING_TEXT};
