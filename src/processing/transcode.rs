//! Encoder boundary used by compress.
//!
//! The [`Transcoder`] trait is the narrow seam between the gateway and
//! whatever actually scales and re-encodes the file. Production uses
//! [`FfmpegTranscoder`]; [`NativeTranscoder`] keeps everything in process
//! and is handy where no encoder binary is installed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{CompressConfig, ResampleFilter, TranscoderBackend};
use crate::error::{GatewayError, Result};
use crate::processing::resize::{self, Resampler};

/// Parameters handed to a transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeParams {
    pub width: u32,
    pub height: u32,
    /// Passed to the encoder as-is
    pub quality: i64,
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Scale `input` to the target size and write it to `output`
    async fn transcode(&self, input: &Path, output: &Path, params: &TranscodeParams) -> Result<()>;

    /// Name used in logs and error messages
    fn name(&self) -> &str;
}

/// Build the transcoder selected by configuration
pub fn from_config(config: &CompressConfig) -> Arc<dyn Transcoder> {
    match config.backend {
        TranscoderBackend::Ffmpeg => Arc::new(FfmpegTranscoder::new(&config.program)),
        TranscoderBackend::Native => Arc::new(NativeTranscoder::default()),
    }
}

/// Runs an ffmpeg-compatible executable
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    display_name: String,
}

impl FfmpegTranscoder {
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        let program = program.as_ref().to_path_buf();
        let display_name = program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string_lossy().into_owned());
        Self {
            program,
            display_name,
        }
    }

    /// Command-line arguments for one invocation
    pub fn args(input: &Path, output: &Path, params: &TranscodeParams) -> Vec<String> {
        vec![
            // never block on the overwrite prompt
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-vf".to_string(),
            format!("scale={}:{}", params.width, params.height),
            "-q:v".to_string(),
            params.quality.to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }

    /// Whether the program can be found on PATH (or at its absolute path)
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, params: &TranscodeParams) -> Result<()> {
        let args = Self::args(input, output, params);
        debug!("Running {:?} {}", self.program, args.join(" "));

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GatewayError::subprocess(&self.display_name, format!("failed to start: {}", e)))?;

        if result.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&result.stderr);
        let detail = stderr.lines().rev().find(|line| !line.trim().is_empty());
        warn!(
            program = %self.display_name,
            status = %result.status,
            "encoder exited unsuccessfully"
        );

        Err(GatewayError::subprocess(
            &self.display_name,
            match detail {
                Some(line) => format!("{}: {}", result.status, line.trim()),
                None => result.status.to_string(),
            },
        ))
    }

    fn name(&self) -> &str {
        &self.display_name
    }
}

/// Scales and re-encodes with the `image` crate.
///
/// Quality is interpreted as JPEG quality and clamped to 1-100; the output
/// format follows the output extension.
#[derive(Debug, Clone, Copy)]
pub struct NativeTranscoder {
    resampler: Resampler,
}

impl NativeTranscoder {
    pub fn new(filter: ResampleFilter) -> Self {
        Self {
            resampler: Resampler::new(filter),
        }
    }
}

impl Default for NativeTranscoder {
    fn default() -> Self {
        // closest match to ffmpeg's bicubic scaler
        Self::new(ResampleFilter::CatmullRom)
    }
}

#[async_trait]
impl Transcoder for NativeTranscoder {
    async fn transcode(&self, input: &Path, output: &Path, params: &TranscodeParams) -> Result<()> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        let params = *params;
        let resampler = self.resampler;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let image = resize::decode(&input)?;
            let scaled = resampler.resample(&image, params.width, params.height);
            let quality = u8::try_from(params.quality.clamp(1, 100)).unwrap_or(100);
            resize::encode_to_path(&scaled, &output, quality)
        })
        .await?
    }

    fn name(&self) -> &str {
        "native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use tempfile::tempdir;

    const PARAMS: TranscodeParams = TranscodeParams {
        width: 64,
        height: 48,
        quality: 40,
    };

    #[test]
    fn test_ffmpeg_args() {
        let args = FfmpegTranscoder::args(Path::new("in.png"), Path::new("out.png"), &PARAMS);
        assert_eq!(
            args,
            vec!["-y", "-i", "in.png", "-vf", "scale=64:48", "-q:v", "40", "out.png"]
        );
    }

    #[test]
    fn test_quality_passed_through_untouched() {
        let params = TranscodeParams { quality: -7, ..PARAMS };
        let args = FfmpegTranscoder::args(Path::new("a"), Path::new("b"), &params);
        assert!(args.contains(&"-7".to_string()));
    }

    #[test]
    fn test_from_config_selects_backend() {
        let mut config = CompressConfig::default();
        assert_eq!(from_config(&config).name(), "ffmpeg");
        config.backend = TranscoderBackend::Native;
        assert_eq!(from_config(&config).name(), "native");
    }

    #[tokio::test]
    async fn test_missing_program_is_subprocess_error() {
        let dir = tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new(dir.path().join("no-such-encoder"));
        assert!(!transcoder.is_available());

        let err = transcoder
            .transcode(&dir.path().join("in.png"), &dir.path().join("out.png"), &PARAMS)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SubprocessError { .. }));
        assert!(err.to_string().contains("failed to start"));
    }

    #[tokio::test]
    async fn test_native_scales_to_target() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("compressed_in.png");
        DynamicImage::ImageRgb8(RgbImage::new(100, 80)).save(&input).unwrap();

        NativeTranscoder::default()
            .transcode(&input, &output, &PARAMS)
            .await
            .unwrap();

        let produced = image::open(&output).unwrap();
        assert_eq!((produced.width(), produced.height()), (64, 48));
    }

    #[tokio::test]
    async fn test_native_decode_failure() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.png");
        std::fs::write(&input, b"nope").unwrap();

        let err = NativeTranscoder::default()
            .transcode(&input, &dir.path().join("out.jpg"), &PARAMS)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::DecodeError { .. }));
    }
}
