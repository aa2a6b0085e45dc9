/// Centralized error types for the market feed
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    // Remote Errors
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    // Network Errors
    #[error("Network error: {0}")]
    NetworkError(String),

    // Data Errors
    #[error("Decode failed: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("Serialization failed: {0}")]
    SerializationError(serde_json::Error),

    // Publisher Errors
    #[error("Publisher closed")]
    PublisherClosed,
}

pub type Result<T> = std::result::Result<T, FeedError>;

impl FeedError {
    /// Classify a non-2xx HTTP status. 5xx is the remote's fault, everything
    /// else is treated as a rejected request.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        if (500..600).contains(&status) {
            FeedError::ServerError { status, message }
        } else {
            FeedError::ClientError { status, message }
        }
    }

    /// Map a transport failure from reqwest
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::NetworkError(format!("request timeout: {}", err))
        } else if err.is_connect() {
            FeedError::NetworkError(format!("connection failed: {}", err))
        } else {
            FeedError::NetworkError(format!("request failed: {}", err))
        }
    }

    /// Permanent until restart: retrying on the next cycle will not help
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FeedError::ConfigError(_) | FeedError::MissingCredential(_)
        )
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            FeedError::ConfigError(_) => "CFG_001",
            FeedError::MissingCredential(_) => "CFG_002",
            FeedError::ClientError { .. } => "REMOTE_001",
            FeedError::ServerError { .. } => "REMOTE_002",
            FeedError::NetworkError(_) => "NET_001",
            FeedError::DecodeError(_) => "DATA_001",
            FeedError::SerializationError(_) => "DATA_002",
            FeedError::PublisherClosed => "PUB_001",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            FeedError::from_status(503, "unavailable"),
            FeedError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            FeedError::from_status(401, "bad key"),
            FeedError::ClientError { status: 401, .. }
        ));
        assert!(matches!(
            FeedError::from_status(302, ""),
            FeedError::ClientError { status: 302, .. }
        ));
    }

    #[test]
    fn test_configuration_flag() {
        assert!(FeedError::MissingCredential("COINGECKO_API_KEY".to_string()).is_configuration());
        assert!(!FeedError::NetworkError("refused".to_string()).is_configuration());
        assert_eq!(FeedError::PublisherClosed.error_code(), "PUB_001");
    }
}
