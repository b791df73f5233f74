//! Image operation executor
//!
//! Resize and convert run through the `image` crate on the blocking pool;
//! compress is delegated to a [`Transcoder`]. Every successful call leaves a
//! readable file at the returned path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, ErrorContext};
use crate::operation::Operation;

pub mod formats;
pub mod resize;
pub mod transcode;
pub mod validation;

pub use formats::*;
pub use resize::Resampler;
pub use transcode::{FfmpegTranscoder, NativeTranscoder, TranscodeParams, Transcoder};
pub use validation::ParameterValidator;

/// Runs one operation from an input file to an output file
#[derive(Clone)]
pub struct OperationExecutor {
    resampler: Resampler,
    jpeg_quality: u8,
    compress_size: (u32, u32),
    transcoder: Arc<dyn Transcoder>,
}

impl OperationExecutor {
    /// Create an executor from configuration
    pub fn new(config: &Config) -> Self {
        Self::with_transcoder(config, transcode::from_config(&config.compress))
    }

    /// Create an executor with an explicit compress backend
    pub fn with_transcoder(config: &Config, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            resampler: Resampler::new(config.processing.filter),
            jpeg_quality: config.processing.jpeg_quality,
            compress_size: (config.compress.width, config.compress.height),
            transcoder,
        }
    }

    /// Execute `operation`, reading `input_path` and writing `output_path`
    pub async fn execute<P: AsRef<Path>>(
        &self,
        operation: Operation,
        input_path: P,
        output_path: P,
    ) -> Result<OperationResult> {
        let start_time = Instant::now();
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        debug!("Executing {} : {:?} -> {:?}", operation, input_path, output_path);

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await
                .with_file_context(output_path.to_path_buf())?;
        }

        match operation {
            Operation::Resize { width, height } => {
                self.resize(input_path, output_path, width, height).await?
            }
            Operation::Convert => self.convert(input_path, output_path).await?,
            Operation::Compress { quality } => {
                let (width, height) = self.compress_size;
                let params = TranscodeParams { width, height, quality };
                self.transcoder.transcode(input_path, output_path, &params).await?
            }
        }

        // the produced file must be there before anyone is told about it
        let metadata = fs::metadata(output_path).await
            .with_file_context(output_path.to_path_buf())?;

        let result = OperationResult {
            operation,
            output_path: output_path.to_path_buf(),
            file_size: metadata.len(),
            elapsed: start_time.elapsed(),
        };

        debug!(
            "{} finished in {:.1}ms ({} bytes)",
            operation.name(),
            result.elapsed.as_secs_f64() * 1000.0,
            result.file_size
        );

        Ok(result)
    }

    async fn resize(&self, input: &Path, output: &Path, width: u32, height: u32) -> Result<()> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        let resampler = self.resampler;
        let quality = self.jpeg_quality;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let image = resize::decode(&input)?;
            let resized = resampler.resample(&image, width, height);
            resize::encode_to_path(&resized, &output, quality)
        })
        .await?
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        let quality = self.jpeg_quality;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let image = resize::decode(&input)?;
            resize::encode_jpeg(&image, &output, quality)
        })
        .await?
    }
}

impl std::fmt::Debug for OperationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationExecutor")
            .field("resampler", &self.resampler)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("compress_size", &self.compress_size)
            .field("transcoder", &self.transcoder.name())
            .finish()
    }
}

/// A successfully produced file
#[derive(Debug, Clone)]
pub struct OperationResult {
    pub operation: Operation,
    pub output_path: PathBuf,
    pub file_size: u64,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscoderBackend;
    use crate::error::GatewayError;
    use image::{DynamicImage, Rgba, RgbaImage};
    use tempfile::tempdir;

    fn native_config() -> Config {
        let mut config = Config::default();
        config.compress.backend = TranscoderBackend::Native;
        config
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255])))
            .save(path)
            .unwrap();
    }

    #[tokio::test]
    async fn test_resize_writes_exact_size_jpeg() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("nested/out/resized.jpeg");
        write_png(&input, 200, 100);

        let executor = OperationExecutor::new(&native_config());
        let result = executor
            .execute(Operation::Resize { width: 50, height: 60 }, &input, &output)
            .await
            .unwrap();

        assert_eq!(result.output_path, output);
        assert!(result.file_size > 0);
        let produced = image::open(&output).unwrap();
        assert_eq!((produced.width(), produced.height()), (50, 60));
    }

    #[tokio::test]
    async fn test_convert_always_writes_jpeg() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.jpg");
        write_png(&input, 30, 20);

        OperationExecutor::new(&native_config())
            .execute(Operation::Convert, &input, &output)
            .await
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_compress_uses_fixed_scale() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("compressed_in.png");
        write_png(&input, 1000, 800);

        OperationExecutor::new(&native_config())
            .execute(Operation::Compress { quality: 50 }, &input, &output)
            .await
            .unwrap();

        let produced = image::open(&output).unwrap();
        assert_eq!((produced.width(), produced.height()), (640, 480));
    }

    #[tokio::test]
    async fn test_decode_failure_surfaces() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        std::fs::write(&input, b"garbage").unwrap();

        let err = OperationExecutor::new(&native_config())
            .execute(Operation::Convert, &input, &dir.path().join("out.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::DecodeError { .. }));
    }
}
