//! Decode, resample and encode primitives built on the `image` crate.
//!
//! All functions here are blocking; callers run them on the blocking pool.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

use crate::config::{ImageFormat, ResampleFilter};
use crate::error::{GatewayError, Result};
use crate::processing::formats::detect_format_from_path;

impl From<ResampleFilter> for image::imageops::FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => image::imageops::FilterType::Nearest,
            ResampleFilter::Triangle => image::imageops::FilterType::Triangle,
            ResampleFilter::CatmullRom => image::imageops::FilterType::CatmullRom,
            ResampleFilter::Gaussian => image::imageops::FilterType::Gaussian,
            ResampleFilter::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Exact-size resampler; aspect ratio is not preserved
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    filter: ResampleFilter,
}

impl Resampler {
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }

    /// Resample `image` to exactly `width` x `height`
    pub fn resample(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        debug!(
            "Resampling {}x{} -> {}x{} using {:?}",
            image.width(),
            image.height(),
            width,
            height,
            self.filter
        );

        if image.width() == width && image.height() == height {
            return image.clone();
        }

        image.resize_exact(width, height, self.filter.into())
    }
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(ResampleFilter::Triangle)
    }
}

/// Decode the image at `path`, guessing the format from its content
pub fn decode(path: &Path) -> Result<DynamicImage> {
    let reader = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| GatewayError::decode(e.to_string(), Some(path.to_path_buf())))?;

    let image = reader
        .decode()
        .map_err(|e| GatewayError::decode(e.to_string(), Some(path.to_path_buf())))?;

    debug!("Decoded {:?}: {}x{}", path, image.width(), image.height());
    Ok(image)
}

/// Write `image` as a colour JPEG regardless of the path's extension
pub fn encode_jpeg(image: &DynamicImage, path: &Path, quality: u8) -> Result<()> {
    let file = File::create(path).map_err(|e| encode_error(path, e))?;
    let mut writer = BufWriter::new(file);

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder).map_err(|e| encode_error(path, e))?;
    writer.flush().map_err(|e| encode_error(path, e))?;

    Ok(())
}

/// Write `image` in the format named by the path's extension.
///
/// Unknown or missing extensions fall back to JPEG.
pub fn encode_to_path(image: &DynamicImage, path: &Path, quality: u8) -> Result<()> {
    match detect_format_from_path(path) {
        Ok(ImageFormat::Jpeg) | Err(_) => encode_jpeg(image, path, quality),
        Ok(format) => image
            .save_with_format(path, format.into())
            .map_err(|e| encode_error(path, e)),
    }
}

fn encode_error(path: &Path, err: impl std::fmt::Display) -> GatewayError {
    GatewayError::encode(err.to_string(), Some(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn sample(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 128])))
    }

    #[test]
    fn test_resample_exact_ignores_aspect() {
        let resized = Resampler::default().resample(&sample(100, 50), 30, 90);
        assert_eq!((resized.width(), resized.height()), (30, 90));
    }

    #[test]
    fn test_resample_noop_when_same_size() {
        let resized = Resampler::new(ResampleFilter::Lanczos3).resample(&sample(8, 8), 8, 8);
        assert_eq!((resized.width(), resized.height()), (8, 8));
    }

    #[test]
    fn test_encode_jpeg_drops_alpha() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        encode_jpeg(&sample(12, 7), &path, 90).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
        let decoded = decode(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 7));
    }

    #[test]
    fn test_encode_to_path_follows_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        encode_to_path(&sample(4, 4), &path, 90).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert!(matches!(decode(&path), Err(GatewayError::DecodeError { .. })));
    }

    #[test]
    fn test_encode_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.jpg");
        assert!(matches!(
            encode_jpeg(&sample(2, 2), &path, 90),
            Err(GatewayError::EncodeError { .. })
        ));
    }
}
