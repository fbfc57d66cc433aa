//! Error types for the retouch pipeline.

/// Errors that can occur while editing or creating images.
///
/// Every variant is recoverable at the session level: the user can adjust
/// their input and resubmit. Nothing here triggers an automatic retry.
#[derive(Debug, thiserror::Error)]
pub enum RetouchError {
    /// Missing or invalid startup configuration (e.g. API key unset).
    #[error("configuration error: {0}")]
    Config(String),

    /// Required input missing; caught locally before any network call.
    #[error("{0}")]
    Validation(String),

    /// The orchestration endpoint took too long to respond (HTTP 504).
    #[error("The server took too long to respond (gateway timeout). This can happen with complex requests; please try again.")]
    GatewayTimeout,

    /// The uploaded payload exceeded the endpoint's size limit (HTTP 413).
    #[error("The image is too large. Please upload a smaller image.")]
    PayloadTooLarge,

    /// The endpoint reported a failure, or returned a status we could not
    /// extract a message from.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The model declined to produce output for safety reasons.
    #[error("The request was blocked for safety reasons. Please adjust the description or the image.{}", fmt_reason(.0))]
    SafetyBlocked(String),

    /// The model answered with prose instead of image data.
    #[error("The AI responded with a message instead of an image: \"{0}\". Try simplifying your request.")]
    TextResponse(String),

    /// The model response carried no usable image.
    #[error("{0}")]
    NoImage(String),

    /// Unrecognized action in the request envelope. Never reaches upstream.
    #[error("invalid action specified: {0}")]
    InvalidAction(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to decode base64 image data.
    #[error("failed to decode image data: {0}")]
    Decode(String),

    /// I/O error (e.g. reading or saving a file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_reason(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(" ({reason})")
    }
}

impl RetouchError {
    /// True when the error originated from user input rather than the
    /// transport or the upstream service.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidAction(_))
    }

    /// Builds the generic error for a non-2xx status whose body carried no
    /// parseable message.
    pub(crate) fn server_status(status: u16) -> Self {
        Self::Api {
            status,
            message: format!("Server error {status}. The response could not be processed."),
        }
    }
}

/// Result type alias for retouch operations.
pub type Result<T> = std::result::Result<T, RetouchError>;
