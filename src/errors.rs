/*!
 * Error types for the ebook translator.
 *
 * Engines report `EngineError`, the orchestrator wraps them into
 * `TranslationError`, and document adapters signal through `ConversionError`.
 * Application-level plumbing uses `anyhow` and converts into `AppError` at the
 * binary boundary.
 */

use thiserror::Error;

/// Errors raised by translation engines
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine answered with data the parser could not understand
    #[error("Unexpected result from engine: {0}")]
    UnexpectedResult(String),

    /// The HTTP request could not be completed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error returned by the remote API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error body returned by the API
        message: String,
    },

    /// An API key does not match the engine's key pattern
    #[error("Bad API key format: {0}")]
    BadApiKeyFormat(String),

    /// Every configured API key has been rotated out
    #[error("No available API key")]
    NoAvailableApiKey,

    /// The configured model cannot be used for the requested flow
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// Language display name unknown to the engine's code table
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Declarative engine data failed validation
    #[error("Invalid engine data: {0}")]
    InvalidEngineData(String),

    /// A user preference holds a value the engine cannot use
    #[error("Invalid engine preference: {0}")]
    InvalidPreference(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(error: reqwest::Error) -> Self {
        Self::RequestFailed(error.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        Self::UnexpectedResult(error.to_string())
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Retries were exhausted for a paragraph
    #[error("Translation failed: {0}")]
    Failed(String),

    /// Cooperative cancellation, either requested or forced by a fatal error
    #[error("Translation canceled: {0}")]
    Canceled(String),

    /// Nothing to translate
    #[error("There is no content that needs to be translated.")]
    NoContent,

    /// Error coming straight from an engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl TranslationError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled(_))
    }
}

/// Signals from document adapters and the extractor
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Stop the conversion pipeline on purpose
    #[error("Conversion aborted")]
    Abort,

    /// The conversion could not be completed
    #[error("Conversion failed: {0}")]
    Failed(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the translation cache
    #[error("Cache error: {0}")]
    Cache(String),

    /// Error from an engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from document conversion
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Cache(error.to_string())
    }
}
