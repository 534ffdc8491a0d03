//! Errors returned by providers

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LLMError>;

#[derive(Error, Debug)]
pub enum LLMError {
    /// A required setting was not supplied
    #[error("missing setting {0}")]
    MissingSetting(&'static str),

    /// The endpoint rejected the API key
    #[error("chat endpoint rejected the API key")]
    Unauthorized,

    /// The endpoint does not serve the requested model
    #[error("model '{0}' is not available")]
    UnknownModel(String),

    #[error("rate limited by chat endpoint: {0}")]
    RateLimited(String),

    /// Any other non-success status
    #[error("chat endpoint answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The reply could not be understood
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl LLMError {
    /// Whether sending the same request again cannot succeed
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::MissingSetting(_) | Self::Unauthorized | Self::UnknownModel(_)
        )
    }
}
