use thiserror::Error;

/// Result type for fatal compiler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors of the compiler itself.
///
/// User-level problems in the compiled program never appear here; they are
/// reported as diagnostics through a [`crate::diagnostics::DiagnosticListener`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source not found: {name}")]
    SourceNotFound { name: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal compiler error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create an internal invariant-violation error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}
