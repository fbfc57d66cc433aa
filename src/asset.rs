//! Image assets: raw bytes plus a format, with base64 wire helpers.

use crate::error::{Result, RetouchError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect the format from a MIME type string.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects the image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Decodes a base64 string that may be imperfectly formatted.
///
/// Browser and model payloads frequently arrive with issues strict decoders
/// reject:
/// - Data URI prefix (`data:image/png;base64,...`)
/// - Missing padding (`=` characters)
/// - Embedded whitespace or newlines
///
/// This function normalizes all of these before decoding.
pub fn decode_base64_lenient(input: &str) -> Result<Vec<u8>> {
    use base64::Engine;

    // Strip data URI prefix if present (e.g. "data:image/png;base64,")
    let b64 = match input.find(";base64,") {
        Some(pos) => &input[pos + 8..],
        None => input,
    };

    // Strip whitespace (newlines, spaces, tabs)
    let cleaned: String = b64.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    // Try standard decoding first (fast path)
    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    // Fall back to no-pad decoding (handles missing `=`)
    base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(&cleaned)
        .map_err(|e| RetouchError::Decode(e.to_string()))
}

/// A binary image plus its format. Immutable once constructed.
///
/// Created when the user selects a file or when the remote service returns
/// generated bytes; discarded wholesale on session reset.
#[derive(Debug, Clone)]
#[must_use = "image asset should be displayed, saved or sent"]
pub struct ImageAsset {
    data: Vec<u8>,
    format: ImageFormat,
}

impl ImageAsset {
    /// Creates an asset from raw bytes with a known format.
    pub fn new(data: Vec<u8>, format: ImageFormat) -> Self {
        Self { data, format }
    }

    /// Creates an asset from raw bytes, detecting the format from magic
    /// bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let format = ImageFormat::from_magic_bytes(&data)
            .ok_or_else(|| RetouchError::Decode("unknown image format".into()))?;
        Ok(Self::new(data, format))
    }

    /// Creates an asset from a base64 wire payload plus a MIME type.
    ///
    /// The declared MIME type wins when recognized; otherwise the format is
    /// detected from the decoded bytes.
    pub fn from_base64(data: &str, mime_type: &str) -> Result<Self> {
        let bytes = decode_base64_lenient(data)?;
        match ImageFormat::from_mime(mime_type) {
            Some(format) => Ok(Self::new(bytes, format)),
            None => Self::from_bytes(bytes),
        }
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Image format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// MIME type of the image.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL, suitable for direct display.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.to_base64())
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}
