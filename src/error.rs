//! Error types and handling for imgate

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Input could not be decoded into an image
    #[error("failed to decode image: {message} (file: {file:?})")]
    DecodeError {
        message: String,
        file: Option<PathBuf>,
    },

    /// Output could not be encoded or written
    #[error("failed to write image: {message} (file: {file:?})")]
    EncodeError {
        message: String,
        file: Option<PathBuf>,
    },

    /// External encoder could not be started or exited non-zero
    #[error("{program} failed: {message}")]
    SubprocessError { program: String, message: String },

    /// Output format not supported
    #[error("Unsupported image format: {format} (file: {file:?})")]
    UnsupportedFormat {
        format: String,
        file: Option<PathBuf>,
    },

    /// Caller-supplied path resolves outside the configured base directory
    #[error("path {path:?} escapes base directory {base:?}")]
    PathOutsideSandbox { path: PathBuf, base: PathBuf },

    /// Operation parameters out of bounds
    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),

    /// Runtime errors (blocking task panics, join failures)
    #[error("System error: {message}")]
    SystemError { message: String },
}

impl GatewayError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(message: S, file: Option<PathBuf>) -> Self {
        Self::DecodeError {
            message: message.into(),
            file,
        }
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(message: S, file: Option<PathBuf>) -> Self {
        Self::EncodeError {
            message: message.into(),
            file,
        }
    }

    /// Create a new subprocess error
    pub fn subprocess<P: Into<String>, S: Into<String>>(program: P, message: S) -> Self {
        Self::SubprocessError {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S, file: Option<PathBuf>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
            file,
        }
    }

    /// Create a new invalid parameters error
    pub fn invalid_parameters<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a new system error
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::SystemError {
            message: message.into(),
        }
    }

    /// Whether the caller is at fault (maps to 400 rather than 500)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameters { .. } | Self::PathOutsideSandbox { .. }
        )
    }
}

impl From<toml::de::Error> for GatewayError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

impl From<tokio::task::JoinError> for GatewayError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::system(format!("Task join error: {}", err))
    }
}

/// Error context extension for adding file path information
pub trait ErrorContext<T> {
    /// Add file context to an error
    fn with_file_context(self, file: PathBuf) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<GatewayError>,
{
    fn with_file_context(self, file: PathBuf) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();

            match &mut error {
                GatewayError::DecodeError { file: ref mut f, .. }
                | GatewayError::EncodeError { file: ref mut f, .. }
                | GatewayError::UnsupportedFormat { file: ref mut f, .. } => {
                    if f.is_none() {
                        *f = Some(file);
                    }
                }
                _ => {}
            }

            error
        })
    }
}
