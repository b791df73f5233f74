//! Parameter bounds and input checks run before any work is done

use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::config::ProcessingConfig;
use crate::error::{Result, GatewayError};
use crate::operation::Operation;

/// Checks operation parameters against configured limits
#[derive(Debug, Clone)]
pub struct ParameterValidator {
    max_dimension: u32,
    min_quality: i64,
    max_quality: i64,
}

impl ParameterValidator {
    /// Create a validator with default limits
    pub fn new() -> Self {
        Self::from_config(&ProcessingConfig::default())
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
            min_quality: config.min_quality,
            max_quality: config.max_quality,
        }
    }

    /// Validate an operation's numeric parameters
    pub fn validate(&self, operation: &Operation) -> Result<()> {
        match *operation {
            Operation::Resize { width, height } => {
                self.check_dimension("width", width)?;
                self.check_dimension("height", height)
            }
            Operation::Convert => Ok(()),
            Operation::Compress { quality } => {
                if quality < self.min_quality || quality > self.max_quality {
                    return Err(GatewayError::invalid_parameters(format!(
                        "quality must be between {} and {}, got {}",
                        self.min_quality, self.max_quality, quality
                    )));
                }
                Ok(())
            }
        }
    }

    fn check_dimension(&self, name: &str, value: u32) -> Result<()> {
        if value == 0 || value > self.max_dimension {
            return Err(GatewayError::invalid_parameters(format!(
                "{} must be between 1 and {}, got {}",
                name, self.max_dimension, value
            )));
        }
        Ok(())
    }
}

impl Default for ParameterValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Confirm the input can be opened for reading.
///
/// Returns the raw I/O error so callers can report it verbatim.
pub async fn ensure_readable(path: &Path) -> std::io::Result<()> {
    let file = fs::File::open(path).await?;
    let metadata = file.metadata().await?;
    debug!("Input {:?} opened ({} bytes)", path, metadata.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resize_bounds() {
        let validator = ParameterValidator::new();
        assert!(validator.validate(&Operation::Resize { width: 640, height: 480 }).is_ok());
        assert!(validator.validate(&Operation::Resize { width: 0, height: 480 }).is_err());
        assert!(validator.validate(&Operation::Resize { width: 10, height: 16385 }).is_err());
    }

    #[test]
    fn test_quality_bounds() {
        let validator = ParameterValidator::from_config(&ProcessingConfig {
            min_quality: 2,
            max_quality: 31,
            ..ProcessingConfig::default()
        });
        assert!(validator.validate(&Operation::Compress { quality: 2 }).is_ok());
        assert!(validator.validate(&Operation::Compress { quality: 31 }).is_ok());

        let err = validator.validate(&Operation::Compress { quality: 80 }).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("between 2 and 31"));
    }

    #[test]
    fn test_convert_has_no_parameters() {
        assert!(ParameterValidator::new().validate(&Operation::Convert).is_ok());
    }

    #[tokio::test]
    async fn test_ensure_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.png");
        assert_eq!(
            ensure_readable(&path).await.unwrap_err().kind(),
            std::io::ErrorKind::NotFound
        );

        std::fs::write(&path, b"x").unwrap();
        assert!(ensure_readable(&path).await.is_ok());
    }
}
