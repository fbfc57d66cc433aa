//! HTTP client for the orchestration endpoint.
//!
//! [`ApiClient::send`] is the transport layer: one fixed endpoint, one
//! request envelope, and normalization of transport-level failures into
//! typed errors. The `request_*` methods are the typed action dispatchers
//! on top of it.
//!
//! No retries are performed; the upstream service has variable, sometimes
//! long, latency and every failure is reported to the caller immediately.

use crate::api::{ActionRequest, AspectRatio, ImagePayload, ResponseData, ResponseEnvelope};
use crate::asset::ImageAsset;
use crate::error::{Result, RetouchError};

/// Client for the single orchestration endpoint.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ApiClient {
    /// Creates a client for the given endpoint URL
    /// (e.g. `https://example.app/api/retouch`).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Sends one action envelope and normalizes the response.
    pub async fn send(&self, request: &ActionRequest) -> Result<ResponseData> {
        tracing::debug!(action = request.action(), "sending action request");

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();

        // Gateway errors from the hosting layer may not carry JSON bodies;
        // their messages are fixed regardless of body content.
        if status.as_u16() == 504 {
            return Err(RetouchError::GatewayTimeout);
        }
        if status.as_u16() == 413 {
            return Err(RetouchError::PayloadTooLarge);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error_body(status.as_u16(), &body));
        }

        let envelope: ResponseEnvelope = response.json().await?;
        if let Some(message) = envelope.error {
            return Err(RetouchError::Api {
                status: status.as_u16(),
                message,
            });
        }
        envelope.data.ok_or_else(|| RetouchError::Api {
            status: status.as_u16(),
            message: "The server returned an unexpected response.".into(),
        })
    }

    /// Requests an edit of `image` according to the composed `prompt`.
    /// Returns the edited image.
    pub async fn request_edit(&self, image: &ImageAsset, prompt: &str) -> Result<ImageAsset> {
        let request = ActionRequest::GenerateImage {
            image: ImagePayload::from_asset(image),
            prompt: prompt.to_string(),
        };
        match self.send(&request).await? {
            ResponseData::Image(payload) => payload.into_asset(),
            ResponseData::Text(_) => {
                Err(RetouchError::NoImage("The API did not return a valid image.".into()))
            }
        }
    }

    /// Requests a brand-new image from a text description. The aspect ratio
    /// is a closed enum, so unrecognized values cannot reach the wire.
    pub async fn request_creation(
        &self,
        prompt: &str,
        style: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageAsset> {
        let request = ActionRequest::CreateImage {
            prompt: prompt.to_string(),
            style: style.to_string(),
            aspect_ratio,
        };
        match self.send(&request).await? {
            ResponseData::Image(payload) => payload.into_asset(),
            ResponseData::Text(_) => {
                Err(RetouchError::NoImage("The API did not return a valid image.".into()))
            }
        }
    }

    /// Requests a one-sentence summary of the changes an edit instruction
    /// would apply. Display-only text, returned verbatim.
    pub async fn request_summary(&self, prompt: &str, style: &str) -> Result<String> {
        let request = ActionRequest::Summarize {
            prompt: prompt.to_string(),
            style: style.to_string(),
        };
        match self.send(&request).await? {
            ResponseData::Text(text) => Ok(text),
            ResponseData::Image(_) => Err(RetouchError::Api {
                status: 200,
                message: "The server returned an image where text was expected.".into(),
            }),
        }
    }
}

/// Extracts an error message from a non-2xx body, or synthesizes the
/// generic "server error" message when the body is not parseable.
fn parse_error_body(status: u16, body: &str) -> RetouchError {
    match serde_json::from_str::<ResponseEnvelope>(body) {
        Ok(ResponseEnvelope {
            error: Some(message),
            ..
        }) => RetouchError::Api { status, message },
        _ => RetouchError::server_status(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::ImageFormat;
    use base64::Engine;
    use serde_json::json;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn png_base64() -> String {
        base64::engine::general_purpose::STANDARD.encode(PNG_MAGIC)
    }

    fn sample_asset() -> ImageAsset {
        ImageAsset::new(PNG_MAGIC.to_vec(), ImageFormat::Png)
    }

    #[tokio::test]
    async fn it_maps_504_to_fixed_timeout_message_ignoring_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/retouch")
            .with_status(504)
            .with_body("<html>upstream timeout</html>")
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/api/retouch", server.url()));
        let err = client.request_summary("p", "realista").await.unwrap_err();
        assert!(matches!(err, RetouchError::GatewayTimeout));
    }

    #[tokio::test]
    async fn it_maps_413_to_fixed_payload_message_ignoring_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/retouch")
            .with_status(413)
            .with_body(json!({"error": "should be ignored"}).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/api/retouch", server.url()));
        let err = client.request_edit(&sample_asset(), "p").await.unwrap_err();
        assert!(matches!(err, RetouchError::PayloadTooLarge));
    }

    #[tokio::test]
    async fn it_surfaces_error_from_json_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/retouch")
            .with_status(500)
            .with_body(json!({"error": "upstream exploded"}).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/api/retouch", server.url()));
        let err = client.request_summary("p", "s").await.unwrap_err();
        match err {
            RetouchError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn it_synthesizes_generic_message_for_unparseable_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/retouch")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/api/retouch", server.url()));
        let err = client.request_summary("p", "s").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Server error 502. The response could not be processed."
        );
    }

    #[tokio::test]
    async fn it_surfaces_error_marked_in_a_2xx_envelope() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/retouch")
            .with_status(200)
            .with_body(json!({"error": "quota exceeded"}).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/api/retouch", server.url()));
        let err = client.request_summary("p", "s").await.unwrap_err();
        match err {
            RetouchError::Api { message, .. } => assert_eq!(message, "quota exceeded"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn it_unwraps_an_edited_image() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/retouch")
            .match_body(mockito::Matcher::PartialJson(json!({
                "action": "generateImage",
                "prompt": "make the background white",
            })))
            .with_status(200)
            .with_body(
                json!({"data": {"data": png_base64(), "mimeType": "image/png"}}).to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/api/retouch", server.url()));
        let image = client
            .request_edit(&sample_asset(), "make the background white")
            .await
            .unwrap();
        assert_eq!(image.format(), ImageFormat::Png);
        assert_eq!(image.data(), PNG_MAGIC);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn it_sends_aspect_ratio_on_creation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/retouch")
            .match_body(mockito::Matcher::PartialJson(json!({
                "action": "createImage",
                "prompt": "a cat in space",
                "style": "vintage",
                "aspectRatio": "16:9",
            })))
            .with_status(200)
            .with_body(
                json!({"data": {"data": png_base64(), "mimeType": "image/png"}}).to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/api/retouch", server.url()));
        let image = client
            .request_creation("a cat in space", "vintage", AspectRatio::Landscape)
            .await
            .unwrap();
        assert_eq!(image.mime_type(), "image/png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn it_returns_summary_text_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/retouch")
            .with_status(200)
            .with_body(json!({"data": "Brightened the image and whitened the background."}).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/api/retouch", server.url()));
        let summary = client.request_summary("brighten", "realista").await.unwrap();
        assert_eq!(summary, "Brightened the image and whitened the background.");
    }

    #[tokio::test]
    async fn it_rejects_text_where_an_image_was_expected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/retouch")
            .with_status(200)
            .with_body(json!({"data": "not an image"}).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/api/retouch", server.url()));
        let err = client.request_edit(&sample_asset(), "p").await.unwrap_err();
        assert!(matches!(err, RetouchError::NoImage(_)));
    }
}
