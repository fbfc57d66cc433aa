#![warn(missing_docs)]
//! Retouch - AI photo editing and text-to-image creation.
//!
//! This crate provides the client, the session state machine and the
//! server-side orchestration handler for an AI photo retouching app: upload
//! a photo and describe the edits, or create a new image from text.
//!
//! # Quick Start - Editing
//!
//! ```no_run
//! use retouch::{ApiClient, ImageAsset, Phase, Session};
//!
//! #[tokio::main]
//! async fn main() -> retouch::Result<()> {
//!     let client = ApiClient::new("https://example.app/api/retouch");
//!     let mut session = Session::new(client);
//!     session.attach_image(ImageAsset::from_bytes(std::fs::read("photo.jpg")?)?);
//!     session.set_instruction("make the background white");
//!     session.submit_edit().await?;
//!     if let Phase::Succeeded(result) = session.phase() {
//!         result.image.save("edited.png")?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Serving
//!
//! ```no_run
//! use retouch::server::{GeminiClient, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> retouch::Result<()> {
//!     let upstream = Arc::new(GeminiClient::new(ServerConfig::from_env()?)?);
//!     retouch::server::serve("127.0.0.1:8787", upstream).await
//! }
//! ```

pub mod api;
pub mod asset;
mod client;
mod error;
pub mod session;

#[cfg(feature = "server")]
pub mod server;

pub use api::{ActionRequest, AspectRatio, ImagePayload, ResponseData, StyleOption, STYLE_OPTIONS};
pub use asset::{ImageAsset, ImageFormat};
pub use client::ApiClient;
pub use error::{Result, RetouchError};
pub use session::{Mode, Phase, Session, SessionResult};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::api::{AspectRatio, STYLE_OPTIONS};
    pub use crate::asset::{ImageAsset, ImageFormat};
    pub use crate::client::ApiClient;
    pub use crate::error::{Result, RetouchError};
    pub use crate::session::{Mode, Phase, Session};

    #[cfg(feature = "server")]
    pub use crate::server::{GeminiClient, ServerConfig};
}
