//! Error types for the report pipeline

use thiserror::Error;

/// Report pipeline errors
#[derive(Debug, Error)]
pub enum ReportError {
    /// Invalid or empty ticker provided
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    /// Provider answered but had nothing for the ticker
    #[error("Data not available for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    /// Provider refused the request rate
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Report source missing or unreadable
    #[error("Conversion error: {0}")]
    ConversionError(String),

    /// External document renderer missing or failed
    #[error("Renderer error: {0}")]
    RendererError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Crew engine error
    #[error("Crew error: {0}")]
    Crew(#[from] crew_core::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Tool failures surface to the agent loop as processing errors
impl From<ReportError> for crew_core::Error {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Crew(inner) => inner,
            ReportError::ConfigError(msg) => crew_core::Error::Configuration(msg),
            other => crew_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}

impl From<crew_llm::LLMError> for ReportError {
    fn from(err: crew_llm::LLMError) -> Self {
        ReportError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReportError::InvalidTicker(String::new());
        assert_eq!(err.to_string(), "Invalid ticker: ");

        let err = ReportError::DataUnavailable {
            ticker: "IBM".to_string(),
            reason: "No data found".to_string(),
        };
        assert_eq!(err.to_string(), "Data not available for IBM: No data found");
    }

    #[test]
    fn test_error_conversion() {
        let report_err = ReportError::YahooFinanceError("Test error".to_string());
        let crew_err: crew_core::Error = report_err.into();

        match crew_err {
            crew_core::Error::ProcessingFailed(msg) => {
                assert!(msg.contains("Yahoo Finance error"));
            }
            _ => panic!("Expected ProcessingFailed variant"),
        }
    }

    #[test]
    fn test_crew_error_round_trips_unchanged() {
        let err: ReportError = crew_core::Error::InvalidGraph("cycle".to_string()).into();
        let back: crew_core::Error = err.into();
        assert!(matches!(back, crew_core::Error::InvalidGraph(msg) if msg == "cycle"));
    }

    #[test]
    fn test_config_error_maps_to_configuration() {
        let crew_err: crew_core::Error = ReportError::ConfigError("missing".to_string()).into();
        assert!(matches!(crew_err, crew_core::Error::Configuration(_)));
    }
}
