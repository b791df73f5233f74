//! Configuration management for imgate

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{Result, GatewayError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener settings
    pub server: ServerConfig,

    /// Output locations and optional sandbox
    pub paths: PathsConfig,

    /// Resize/convert settings and parameter bounds
    pub processing: ProcessingConfig,

    /// External encoder used by compress
    pub compress: CompressConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the gateway binds to
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

/// Output path rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Every resize writes here; concurrent resizes overwrite each other
    pub resize_output: PathBuf,

    /// Directory compressed files are written to
    pub compress_dir: PathBuf,

    /// Prefix prepended to the input base name for compressed files
    pub compress_prefix: String,

    /// Confine caller-supplied paths to this directory (None = unrestricted)
    pub base_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            resize_output: PathBuf::from("assets/resized_image.jpeg"),
            compress_dir: PathBuf::from("assets"),
            compress_prefix: "compressed_".to_string(),
            base_dir: None,
        }
    }
}

/// Decode/encode settings and request parameter bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// JPEG quality used when resize/convert write their output (1-100)
    pub jpeg_quality: u8,

    /// Resampling filter used by resize
    pub filter: ResampleFilter,

    /// Largest accepted width or height for resize
    pub max_dimension: u32,

    /// Lowest accepted compress quality
    pub min_quality: i64,

    /// Highest accepted compress quality
    pub max_quality: i64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 95,
            filter: ResampleFilter::Triangle,
            max_dimension: 16384,
            min_quality: 0,
            max_quality: 100,
        }
    }
}

/// Compress encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    /// Which transcoder implementation to use
    pub backend: TranscoderBackend,

    /// Encoder executable (looked up on PATH when not absolute)
    pub program: PathBuf,

    /// Fixed output width
    pub width: u32,

    /// Fixed output height
    pub height: u32,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            backend: TranscoderBackend::Ffmpeg,
            program: PathBuf::from("ffmpeg"),
            width: 640,
            height: 480,
        }
    }
}

/// Available compress backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscoderBackend {
    /// Spawn the configured ffmpeg-compatible program
    Ffmpeg,
    /// Scale and re-encode in process with the `image` crate
    Native,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Resampling filters exposed in configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    /// Nearest neighbor (fastest, lowest quality)
    Nearest,
    /// Bilinear interpolation
    Triangle,
    /// Catmull-Rom cubic spline
    CatmullRom,
    /// Gaussian blur
    Gaussian,
    /// Lanczos with radius 3
    Lanczos3,
}

/// Image formats the gateway reads or writes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Tiff,
    Bmp,
}

impl ImageFormat {
    /// Get MIME type for this format
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| GatewayError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        match config_extension(path.as_ref()).as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(GatewayError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        }
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = match config_extension(path.as_ref()).as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| GatewayError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| GatewayError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(GatewayError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| GatewayError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let processing = &self.processing;
        if processing.jpeg_quality == 0 || processing.jpeg_quality > 100 {
            return Err(GatewayError::config(
                format!("jpeg_quality must be between 1-100, got {}", processing.jpeg_quality)
            ));
        }

        if processing.max_dimension == 0 {
            return Err(GatewayError::config("max_dimension must be greater than 0"));
        }

        if processing.min_quality > processing.max_quality {
            return Err(GatewayError::config(format!(
                "min_quality ({}) is greater than max_quality ({})",
                processing.min_quality, processing.max_quality
            )));
        }

        if self.compress.width == 0 || self.compress.height == 0 {
            return Err(GatewayError::config(
                "compress width and height must be greater than 0"
            ));
        }

        if self.compress.backend == TranscoderBackend::Ffmpeg
            && self.compress.program.as_os_str().is_empty()
        {
            return Err(GatewayError::config("compress program must not be empty"));
        }

        if self.paths.resize_output.file_name().is_none() {
            return Err(GatewayError::config(format!(
                "resize_output {:?} does not name a file",
                self.paths.resize_output
            )));
        }

        if self
            .paths
            .base_dir
            .as_ref()
            .is_some_and(|base| base.as_os_str().is_empty())
        {
            return Err(GatewayError::config("base_dir must not be empty"));
        }

        if self.paths.compress_prefix.contains(['/', '\\']) {
            return Err(GatewayError::config(
                "compress_prefix contains a path separator"
            ));
        }

        Ok(())
    }
}

fn config_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(config.paths.resize_output, PathBuf::from("assets/resized_image.jpeg"));
        assert_eq!((config.compress.width, config.compress.height), (640, 480));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [compress]
            backend = "native"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.compress.backend, TranscoderBackend::Native);
        assert_eq!(config.compress.program, PathBuf::from("ffmpeg"));
        assert_eq!(config.paths.compress_prefix, "compressed_");
    }

    #[test]
    fn test_config_file_io() {
        let dir = tempdir().unwrap();
        let config = Config::default();

        let toml_path = dir.path().join("imgate.toml");
        config.to_file(&toml_path).unwrap();
        let loaded = Config::from_file(&toml_path).unwrap();
        assert!(loaded.validate().is_ok());

        let yaml_path = dir.path().join("imgate.yaml");
        config.to_file(&yaml_path).unwrap();
        let loaded = Config::from_file(&yaml_path).unwrap();
        assert_eq!(loaded.compress.program, config.compress.program);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempdir().unwrap();
        let err = Config::default().to_file(dir.path().join("imgate.ini")).unwrap_err();
        assert!(matches!(err, GatewayError::ConfigError { .. }));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.processing.jpeg_quality = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.processing.min_quality = 50;
        config.processing.max_quality = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.paths.compress_prefix = "../".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.paths.base_dir = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_image_format_properties() {
        assert_eq!(ImageFormat::WebP.mime_type(), "image/webp");
    }
}
