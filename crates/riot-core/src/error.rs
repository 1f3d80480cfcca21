//! Error types for the R-IoT core library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the backend or the AI API.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (connection refused, DNS, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// The body could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Local file access (config, chat history)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The AI API returned an error payload or an unusable answer
    #[error("Gemini API error: {0}")]
    Api(String),

    /// The AI call did not finish within the configured window
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// No API key configured for the AI call
    #[error("Gemini API key not configured")]
    MissingApiKey,

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}
