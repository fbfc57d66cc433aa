//! Remote orchestration handler: one endpoint, one action envelope.
//!
//! [`dispatch`] is the pure core — it maps an [`ActionRequest`] to the
//! corresponding upstream capability and normalizes the outcome. The axum
//! router wraps it in HTTP: `200 {"data": …}` on success, `400` for a bad
//! envelope, `5xx {"error": …}` otherwise. The handler keeps no state of
//! its own; all session state lives with the caller.

pub mod config;
pub mod gemini;

pub use config::ServerConfig;
pub use gemini::{GeminiClient, ModelOutcome};

use crate::api::{ActionRequest, ResponseData, ResponseEnvelope};
use crate::error::{Result, RetouchError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

/// Fixed error when an edit response carried no usable image.
const NO_IMAGE_MESSAGE: &str = "Could not generate the image. The API did not return a valid image.";

/// Executes one action against the upstream service.
pub async fn dispatch(upstream: &GeminiClient, request: ActionRequest) -> Result<ResponseData> {
    tracing::info!(action = request.action(), "dispatching action");

    match request {
        ActionRequest::GenerateImage { image, prompt } => {
            match upstream.edit_image(&image, &prompt).await? {
                ModelOutcome::Image(payload) => Ok(ResponseData::Image(payload)),
                ModelOutcome::SafetyBlocked(reason) => Err(RetouchError::SafetyBlocked(reason)),
                ModelOutcome::TextOnly(text) => Err(RetouchError::TextResponse(text)),
                ModelOutcome::Empty => Err(RetouchError::NoImage(NO_IMAGE_MESSAGE.into())),
            }
        }
        ActionRequest::CreateImage {
            prompt,
            style,
            aspect_ratio,
        } => {
            let payload = upstream.create_image(&prompt, &style, aspect_ratio).await?;
            Ok(ResponseData::Image(payload))
        }
        ActionRequest::Summarize { prompt, style } => {
            let text = upstream.summarize(&prompt, &style).await?;
            Ok(ResponseData::Text(text))
        }
    }
}

/// Builds the HTTP router. Non-POST methods on the endpoint are rejected by
/// the router itself (405).
pub fn router(upstream: Arc<GeminiClient>) -> Router {
    Router::new()
        .route("/api/retouch", post(handle_action))
        .with_state(upstream)
}

/// Binds `addr` and serves the orchestration endpoint until the process is
/// stopped.
pub async fn serve(addr: &str, upstream: Arc<GeminiClient>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "orchestration endpoint listening");
    axum::serve(listener, router(upstream))
        .await
        .map_err(RetouchError::Io)?;
    Ok(())
}

async fn handle_action(
    State(upstream): State<Arc<GeminiClient>>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let request = match ActionRequest::from_value(body) {
        Ok(request) => request,
        Err(err) => return error_response(err),
    };

    match dispatch(&upstream, request).await {
        Ok(data) => (
            StatusCode::OK,
            Json(ResponseEnvelope {
                data: Some(data),
                error: None,
            }),
        ),
        Err(err) => error_response(err),
    }
}

fn error_response(err: RetouchError) -> (StatusCode, Json<ResponseEnvelope>) {
    let status = error_status(&err);
    tracing::warn!(status = status.as_u16(), error = %err, "request failed");
    (
        status,
        Json(ResponseEnvelope {
            data: None,
            error: Some(err.to_string()),
        }),
    )
}

/// Maps an error to the HTTP status the envelope travels under. Bad input
/// is the caller's fault (400); everything else surfaces as a server-side
/// failure (5xx) with the message intact.
fn error_status(err: &RetouchError) -> StatusCode {
    match err {
        RetouchError::InvalidAction(_) | RetouchError::Validation(_) | RetouchError::Json(_) => {
            StatusCode::BAD_REQUEST
        }
        RetouchError::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        RetouchError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AspectRatio, ImagePayload};
    use serde_json::json;

    fn upstream_for(server: &mockito::ServerGuard) -> GeminiClient {
        GeminiClient::new(ServerConfig::new("test-key").with_base_url(server.url())).unwrap()
    }

    fn sample_payload() -> ImagePayload {
        ImagePayload {
            data: "aGVsbG8=".into(),
            mime_type: "image/jpeg".into(),
        }
    }

    fn edit_request() -> ActionRequest {
        ActionRequest::GenerateImage {
            image: sample_payload(),
            prompt: "whiten the background".into(),
        }
    }

    #[tokio::test]
    async fn it_returns_image_data_for_a_successful_edit() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.5-flash-image-preview:generateContent",
            )
            .with_status(200)
            .with_body(
                json!({"candidates": [{"content": {"parts": [
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                ]}}]})
                .to_string(),
            )
            .create_async()
            .await;

        let upstream = upstream_for(&server);
        let data = dispatch(&upstream, edit_request()).await.unwrap();
        match data {
            ResponseData::Image(payload) => assert_eq!(payload.mime_type, "image/png"),
            other => panic!("expected Image, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn it_maps_a_safety_refusal_to_a_blocked_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.5-flash-image-preview:generateContent",
            )
            .with_status(200)
            .with_body(json!({"candidates": [{"finishReason": "SAFETY"}]}).to_string())
            .create_async()
            .await;

        let upstream = upstream_for(&server);
        let err = dispatch(&upstream, edit_request()).await.unwrap_err();
        match err {
            RetouchError::SafetyBlocked(reason) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected SafetyBlocked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn it_echoes_prose_when_the_model_answers_with_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.5-flash-image-preview:generateContent",
            )
            .with_status(200)
            .with_body(
                json!({"candidates": [{"content": {"parts": [
                    {"text": "Which background do you mean?"}
                ]}}]})
                .to_string(),
            )
            .create_async()
            .await;

        let upstream = upstream_for(&server);
        let err = dispatch(&upstream, edit_request()).await.unwrap_err();
        match err {
            RetouchError::TextResponse(text) => {
                assert_eq!(text, "Which background do you mean?")
            }
            other => panic!("expected TextResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn it_reports_no_valid_image_for_an_empty_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock(
                "POST",
                "/v1beta/models/gemini-2.5-flash-image-preview:generateContent",
            )
            .with_status(200)
            .with_body(json!({"candidates": []}).to_string())
            .create_async()
            .await;

        let upstream = upstream_for(&server);
        let err = dispatch(&upstream, edit_request()).await.unwrap_err();
        match err {
            RetouchError::NoImage(message) => {
                assert!(message.contains("did not return a valid image"))
            }
            other => panic!("expected NoImage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn it_dispatches_creation_and_summary() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/v1beta/models/imagen-4.0-generate-001:predict")
            .with_status(200)
            .with_body(
                json!({"predictions": [{"bytesBase64Encoded": "aGVsbG8=", "mimeType": "image/png"}]})
                    .to_string(),
            )
            .create_async()
            .await;
        let _summary = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .with_status(200)
            .with_body(
                json!({"candidates": [{"content": {"parts": [{"text": "Whitened it."}]}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let upstream = upstream_for(&server);

        let created = dispatch(
            &upstream,
            ActionRequest::CreateImage {
                prompt: "a cat in space".into(),
                style: "vintage".into(),
                aspect_ratio: AspectRatio::Landscape,
            },
        )
        .await
        .unwrap();
        assert!(matches!(created, ResponseData::Image(_)));

        let summary = dispatch(
            &upstream,
            ActionRequest::Summarize {
                prompt: "whiten".into(),
                style: "realista".into(),
            },
        )
        .await
        .unwrap();
        match summary {
            ResponseData::Text(text) => assert_eq!(text, "Whitened it."),
            other => panic!("expected Text, got {other:?}"),
        }
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_status(&RetouchError::InvalidAction("transcode".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&RetouchError::SafetyBlocked("SAFETY".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_status(&RetouchError::TextResponse("hm".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            error_status(&RetouchError::GatewayTimeout),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            error_status(&RetouchError::PayloadTooLarge),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
