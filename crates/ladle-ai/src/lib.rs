pub mod client;
pub mod image;
pub mod normalize;
pub mod schema;

pub use client::{GenerationRequest, OpenAiClient};

use thiserror::Error;

/// Failure modes of the generation adapter. `is_client_error` tells the
/// HTTP boundary whether to answer 400 or 500.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("provider request failed: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("run ended with status: {0}")]
    RunFailed(String),

    #[error("run did not finish within {0} polls")]
    PollBudgetExhausted(u32),

    #[error("unexpected response format")]
    UnexpectedFormat,

    #[error("invalid recipe payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("provider response missing field: {0}")]
    MissingField(&'static str),
}

impl GenerationError {
    /// True for malformed/unparseable responses (caller answers 400),
    /// false for transport and provider-side failures (500).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GenerationError::UnexpectedFormat | GenerationError::InvalidPayload(_)
        )
    }
}
