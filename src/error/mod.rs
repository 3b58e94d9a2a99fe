//! Error types for draftmail.
//!
//! Two user-facing error kinds exist: [`GenerationError`] for anything that
//! goes wrong while talking to the text-generation service, and
//! [`DispatchError`] for anything that goes wrong while handing the message
//! to the mail server. [`AppError`] unions them with configuration failures.

use thiserror::Error;

/// Result type alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Top-level application error.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration problem (missing key, bad URL, bad flag value).
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The text-generation service failed.
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// The mail transport failed.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Base URL did not parse.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Some other invalid setting.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from the text-generation service.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The HTTP layer failed before a response was produced.
    #[error("transport failure: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// The API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Deserialization(String),

    /// The response contained no usable candidate text.
    #[error("the model returned no text")]
    EmptyResponse,

    /// The prompt or response was blocked by the service.
    #[error("content blocked by the service: {reason}")]
    Blocked {
        /// Block reason reported by the service.
        reason: String,
    },
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::Deserialization(err.to_string())
    }
}

impl From<url::ParseError> for GenerationError {
    fn from(err: url::ParseError) -> Self {
        GenerationError::Deserialization(format!("invalid request URL: {err}"))
    }
}

/// Errors from the mail transport.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// TCP connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A network operation timed out.
    #[error("timed out: {0}")]
    Timeout(String),

    /// TLS negotiation failed.
    #[error("TLS failure: {0}")]
    Tls(String),

    /// The server spoke something we could not parse, or refused STARTTLS.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server rejected our credentials.
    #[error("authentication failed ({code}): {message}")]
    Authentication {
        /// SMTP reply code.
        code: u16,
        /// Server message.
        message: String,
    },

    /// The server rejected the transaction (sender, recipient, or data).
    #[error("server rejected the message ({code}): {message}")]
    Rejected {
        /// SMTP reply code.
        code: u16,
        /// Server message.
        message: String,
    },
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused => {
                DispatchError::Connection(format!("connection refused: {err}"))
            }
            std::io::ErrorKind::TimedOut => DispatchError::Timeout(err.to_string()),
            std::io::ErrorKind::ConnectionReset => {
                DispatchError::Connection(format!("connection reset: {err}"))
            }
            _ => DispatchError::Connection(err.to_string()),
        }
    }
}
