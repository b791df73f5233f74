//! imgate - HTTP gateway for image file operations
//!
//! Three POST endpoints read an image from a caller-supplied path, run one
//! operation on it and stream the produced file back:
//!
//! - `/resize`: exact-size resample, written to a single fixed output path
//! - `/convert`: re-encode as JPEG to a caller-chosen path
//! - `/compress`: scale to a fixed size through an external encoder
//!   (ffmpeg by default), written next to other compressed outputs
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use imgate::{Config, GatewayServer};
//!
//! # async fn run() -> imgate::Result<()> {
//! let config = Config::default();
//! imgate::init_with_config(&config)?;
//! GatewayServer::new(&config)?.serve(config.server.bind).await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod operation;
pub mod paths;
pub mod processing;
pub mod server;

// Re-export commonly used types
pub use config::{Config, ImageFormat, ResampleFilter, TranscoderBackend};
pub use error::{GatewayError, Result};
pub use operation::{Operation, OperationRequest};
pub use paths::PathResolver;
pub use processing::{OperationExecutor, OperationResult, Transcoder};
pub use server::GatewayServer;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use processing::FfmpegTranscoder;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with default settings (`RUST_LOG`, plain text)
pub fn init() -> Result<()> {
    init_with_config(&Config::default())
}

/// Initialize logging from configuration and report encoder availability.
///
/// `RUST_LOG` overrides `logging.level` when set. Calling this more than
/// once is harmless; only the first subscriber is installed.
pub fn init_with_config(config: &Config) -> Result<()> {
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .map_err(|e| GatewayError::config(format!("Invalid log level: {}", e)))?;

    let installed = if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    };

    if installed {
        info!("imgate v{} initialized", VERSION);
    }

    check_encoder(config);
    Ok(())
}

fn check_encoder(config: &Config) {
    if config.compress.backend != TranscoderBackend::Ffmpeg {
        return;
    }

    if FfmpegTranscoder::new(&config.compress.program).is_available() {
        info!("Compress encoder: {}", config.compress.program.display());
    } else {
        warn!(
            "Compress encoder {:?} not found; /compress requests will fail",
            config.compress.program
        );
    }
}
