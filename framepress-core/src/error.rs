//! Error types for framepress

use thiserror::Error;

/// Result type alias using FramepressError
pub type Result<T> = std::result::Result<T, FramepressError>;

/// Main error type for framepress operations
#[derive(Debug, Error)]
pub enum FramepressError {
    /// Capture device error
    #[error("Capture error: {0}")]
    Source(String),

    /// Output device error
    #[error("Output error: {0}")]
    Sink(String),

    /// Pixel format conversion error
    #[error("Convert error: {0}")]
    Convert(String),

    /// Encoder error
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FramepressError>,
    },
}

impl FramepressError {
    /// Create a capture device error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create an output device error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a conversion error
    pub fn convert(msg: impl Into<String>) -> Self {
        Self::Convert(msg.into())
    }

    /// Create an encoder error
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

// Conversions from external error types

impl From<ffmpeg_next::Error> for FramepressError {
    fn from(err: ffmpeg_next::Error) -> Self {
        Self::Encoder(err.to_string())
    }
}
