//! Wire contract between the client and the orchestration endpoint.
//!
//! A single request envelope carries an `action` discriminator plus a
//! per-action payload; responses carry either `data` or `error`.

use crate::asset::ImageAsset;
use crate::error::{Result, RetouchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aspect ratios accepted for text-to-image creation. Closed set; anything
/// else is rejected at parse time, never coerced to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square.
    #[serde(rename = "1:1")]
    Square,
    /// 16:9 landscape (widescreen).
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait (tall).
    #[serde(rename = "9:16")]
    Portrait,
    /// 4:3 standard landscape.
    #[serde(rename = "4:3")]
    Standard,
    /// 3:4 standard portrait.
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    /// All recognized ratios, in display order.
    pub const ALL: [AspectRatio; 5] = [
        Self::Square,
        Self::Landscape,
        Self::Portrait,
        Self::Standard,
        Self::StandardPortrait,
    ];

    /// Returns the aspect ratio as a string (e.g. "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = RetouchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1:1" => Ok(Self::Square),
            "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            "4:3" => Ok(Self::Standard),
            "3:4" => Ok(Self::StandardPortrait),
            other => Err(RetouchError::Validation(format!(
                "unrecognized aspect ratio \"{other}\"; expected one of 1:1, 16:9, 9:16, 4:3, 3:4"
            ))),
        }
    }
}

/// A selectable rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleOption {
    /// Stable identifier sent over the wire.
    pub id: &'static str,
    /// Human-readable label.
    pub label: &'static str,
}

/// The style catalog offered by the UI/CLI. Styles travel as free-form
/// strings on the wire, so the catalog is advisory, not enforced.
pub const STYLE_OPTIONS: [StyleOption; 11] = [
    StyleOption { id: "realista", label: "Realista" },
    StyleOption { id: "artístico", label: "Artístico" },
    StyleOption { id: "minimalista", label: "Minimalista" },
    StyleOption { id: "corporativo", label: "Corporativo" },
    StyleOption { id: "vintage", label: "Vintage" },
    StyleOption { id: "cinematográfico", label: "Cinematográfico" },
    StyleOption { id: "cyberpunk", label: "Cyberpunk" },
    StyleOption { id: "fantasia-epica", label: "Fantasía Épica" },
    StyleOption { id: "acuarela", label: "Acuarela" },
    StyleOption { id: "dibujo-a-lapiz", label: "Dibujo a Lápiz" },
    StyleOption { id: "arte-abstracto", label: "Arte Abstracto" },
];

/// Default style when the user has not picked one.
pub const DEFAULT_STYLE: &str = STYLE_OPTIONS[0].id;

/// Base64 image payload as it travels on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    /// Base64-encoded image bytes.
    pub data: String,
    /// MIME type of the encoded image.
    pub mime_type: String,
}

impl ImagePayload {
    /// Encodes an asset for transport.
    pub fn from_asset(asset: &ImageAsset) -> Self {
        Self {
            data: asset.to_base64(),
            mime_type: asset.mime_type().to_string(),
        }
    }

    /// Decodes the payload back into an asset.
    pub fn into_asset(self) -> Result<ImageAsset> {
        ImageAsset::from_base64(&self.data, &self.mime_type)
    }
}

impl From<&ImageAsset> for ImagePayload {
    fn from(asset: &ImageAsset) -> Self {
        Self::from_asset(asset)
    }
}

/// Request envelope, discriminated by `action`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action")]
pub enum ActionRequest {
    /// Edit an existing image according to a composed instruction.
    #[serde(rename = "generateImage")]
    GenerateImage {
        /// Source image to edit.
        image: ImagePayload,
        /// Composed edit instruction.
        prompt: String,
    },
    /// Create a new image from a text description.
    #[serde(rename = "createImage", rename_all = "camelCase")]
    CreateImage {
        /// Text description of the desired image.
        prompt: String,
        /// Style identifier.
        style: String,
        /// One of the five recognized aspect ratios.
        aspect_ratio: AspectRatio,
    },
    /// Summarize the changes an edit instruction would apply.
    #[serde(rename = "summarize")]
    Summarize {
        /// The user's edit instruction.
        prompt: String,
        /// Style identifier.
        style: String,
    },
}

const KNOWN_ACTIONS: [&str; 3] = ["generateImage", "createImage", "summarize"];

impl ActionRequest {
    /// The action discriminator, for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Self::GenerateImage { .. } => "generateImage",
            Self::CreateImage { .. } => "createImage",
            Self::Summarize { .. } => "summarize",
        }
    }

    /// Parses an envelope from raw JSON, distinguishing an unknown action
    /// from a malformed payload. An unknown action must never reach the
    /// upstream service.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let action = value
            .get("action")
            .and_then(|a| a.as_str())
            .unwrap_or("<missing>")
            .to_string();
        if !KNOWN_ACTIONS.contains(&action.as_str()) {
            return Err(RetouchError::InvalidAction(action));
        }
        serde_json::from_value(value).map_err(RetouchError::from)
    }
}

/// Successful response payload: image bytes or plain text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// An image payload (edit/create results).
    Image(ImagePayload),
    /// Plain text (summaries).
    Text(String),
}

/// Response envelope. Success carries `data`; failure carries `error`
/// alongside a non-2xx status where the transport allows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
    /// Present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
