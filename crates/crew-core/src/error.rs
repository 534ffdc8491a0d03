//! Error types for crew-core

use thiserror::Error;

/// Result type alias for crew operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent and crew operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Agent or crew initialization failed
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// Crew definition is invalid (unknown agent, unknown tool, bad template)
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Task graph is not a valid DAG
    #[error("Invalid task graph: {0}")]
    InvalidGraph(String),

    /// A task exceeded its agent's execution time limit
    #[error("Task '{task}' timed out after {seconds}s")]
    Timeout {
        /// Task name
        task: String,
        /// Limit that was exceeded
        seconds: u64,
    },
}

impl Error {
    /// Whether a failed task attempt may be retried
    ///
    /// Configuration and graph errors are deterministic and never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProcessingFailed(_) | Self::Timeout { .. } | Self::Generic(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout {
            task: "market_research".to_string(),
            seconds: 180,
        };
        assert_eq!(err.to_string(), "Task 'market_research' timed out after 180s");
    }

    #[test]
    fn test_retryable() {
        assert!(Error::ProcessingFailed("llm".into()).is_retryable());
        assert!(!Error::Configuration("unknown tool".into()).is_retryable());
        assert!(!Error::InvalidGraph("cycle".into()).is_retryable());
    }
}
