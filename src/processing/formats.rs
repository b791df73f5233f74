//! Image format detection and content-type selection

use std::path::Path;
use crate::config::ImageFormat;
use crate::error::{Result, GatewayError};

/// Fallback when neither the extension nor the content identify the file
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Detect image format from file extension
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<ImageFormat> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| GatewayError::unsupported_format(
            "Unknown".to_string(),
            Some(path.to_path_buf())
        ))?;

    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        "webp" => Ok(ImageFormat::WebP),
        "gif" => Ok(ImageFormat::Gif),
        "tiff" | "tif" => Ok(ImageFormat::Tiff),
        "bmp" => Ok(ImageFormat::Bmp),
        _ => Err(GatewayError::unsupported_format(
            extension.to_string(),
            Some(path.to_path_buf())
        )),
    }
}

/// Convert our ImageFormat to image crate format
impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::WebP => image::ImageFormat::WebP,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Tiff => image::ImageFormat::Tiff,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// Get supported input formats
pub fn supported_input_formats() -> &'static [&'static str] {
    &["jpg", "jpeg", "png", "webp", "gif", "tiff", "tif", "bmp"]
}

/// Pick a Content-Type for a produced file.
///
/// The extension wins, as a static file server would do; otherwise the
/// leading bytes are sniffed.
pub fn content_type_for(path: &Path, head: &[u8]) -> &'static str {
    if let Ok(format) = detect_format_from_path(path) {
        return format.mime_type();
    }

    infer::get(head)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .unwrap_or(OCTET_STREAM)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 16] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
    ];

    #[test]
    fn test_detect_format_from_path() {
        assert_eq!(detect_format_from_path("a/b.JPEG").unwrap(), ImageFormat::Jpeg);
        assert_eq!(detect_format_from_path("b.tif").unwrap(), ImageFormat::Tiff);
        assert!(detect_format_from_path("noext").is_err());
        assert!(detect_format_from_path("x.txt").is_err());
    }

    #[test]
    fn test_content_type_prefers_extension() {
        assert_eq!(content_type_for(Path::new("out.jpeg"), &PNG_MAGIC), "image/jpeg");
    }

    #[test]
    fn test_content_type_sniffs_without_extension() {
        assert_eq!(content_type_for(Path::new("out"), &PNG_MAGIC), "image/png");
        assert_eq!(content_type_for(Path::new("out"), b"hello"), OCTET_STREAM);
    }
}
