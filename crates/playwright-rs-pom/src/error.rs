// Error types for playwright-rs-pom

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for framework operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the framework's wrappers, screens and lifecycle.
///
/// An element that does not show up within its visibility window is *not* an
/// error: visibility checks return `Ok(false)` for that case.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be read
    #[error("Failed to read configuration file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration is missing a required key or has a value of the wrong type
    ///
    /// Every recognized key is required. The message names the offending key
    /// path as reported by the JSON deserializer.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Browser automation failure (launch, navigation, element action)
    #[error("Browser error: {0}")]
    Browser(#[from] playwright_rs::Error),

    /// HTTP transport failure talking to the API under test
    ///
    /// Non-2xx statuses are not errors; they are reported in the response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Document database failure
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// I/O error (screenshots, report, log directory)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL built from the configured base URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Timeout waiting for a page to settle
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A screen object was used after the session moved to another screen
    ///
    /// Screen transitions hand out a new screen value; any value issued
    /// before the latest transition is rejected.
    #[error("Stale screen: {screen} was used after the session moved to another screen")]
    StaleScreen { screen: &'static str },

    /// Invalid argument provided to a framework method
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error with additional context
    #[error("{0}: {1}")]
    Context(String, #[source] Box<Error>),
}

impl Error {
    /// Adds context to the error
    pub fn context(self, msg: impl Into<String>) -> Self {
        Error::Context(msg.into(), Box::new(self))
    }

    /// The innermost error, past any context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context(_, inner) => inner.root(),
            other => other,
        }
    }
}
