//! Session state: sequences user input, submission, and settlement.
//!
//! One session drives at most one request at a time. Submitting borrows the
//! session mutably for the full duration of the round trip, so a second
//! submission cannot start while one is outstanding; the phase guard keeps
//! the same invariant visible at the API level.

use crate::api::{AspectRatio, DEFAULT_STYLE};
use crate::asset::ImageAsset;
use crate::client::ApiClient;
use crate::error::{Result, RetouchError};

/// Fixed message for an edit submitted without an image or instruction.
pub const EDIT_VALIDATION_MESSAGE: &str =
    "Please upload an image and describe the changes to apply.";

/// Fixed message for a creation submitted without a prompt.
pub const CREATE_VALIDATION_MESSAGE: &str = "Please describe the image you want to create.";

/// What the user is doing with this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Editing an uploaded photo.
    Edit,
    /// Creating a new image from text.
    Create,
}

/// A settled successful result.
#[derive(Debug, Clone)]
pub struct SessionResult {
    /// The generated or edited image.
    pub image: ImageAsset,
    /// One-sentence description of the applied changes (edits only).
    pub summary: Option<String>,
}

/// Where the session currently stands. The result payload lives inside the
/// phase, so a stale result cannot outlive a new submission.
#[derive(Debug)]
pub enum Phase {
    /// Nothing selected yet.
    Idle,
    /// Collecting input for the chosen mode.
    AwaitingInput,
    /// A request is in flight.
    Submitting,
    /// The last submission succeeded.
    Succeeded(SessionResult),
    /// The last submission failed; holds the user-facing message.
    Failed(String),
}

/// UI-side state machine: input collection, one in-flight request, and the
/// last settled result.
#[derive(Debug)]
pub struct Session {
    client: ApiClient,
    phase: Phase,
    mode: Option<Mode>,
    original: Option<ImageAsset>,
    instruction: String,
    style: String,
}

impl Session {
    /// Creates an idle session talking to the given client.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            phase: Phase::Idle,
            mode: None,
            original: None,
            instruction: String::new(),
            style: DEFAULT_STYLE.to_string(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Current mode, if one has been chosen.
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// The uploaded original, if any.
    pub fn original(&self) -> Option<&ImageAsset> {
        self.original.as_ref()
    }

    /// Switches to edit mode, clearing any previous result or error.
    pub fn choose_edit(&mut self) {
        self.mode = Some(Mode::Edit);
        self.phase = Phase::AwaitingInput;
    }

    /// Switches to create-from-text mode, clearing any previous result or
    /// error.
    pub fn choose_create(&mut self) {
        self.mode = Some(Mode::Create);
        self.original = None;
        self.phase = Phase::AwaitingInput;
    }

    /// Stores the uploaded photo and enters edit input collection.
    pub fn attach_image(&mut self, asset: ImageAsset) {
        self.original = Some(asset);
        self.mode = Some(Mode::Edit);
        self.phase = Phase::AwaitingInput;
    }

    /// Sets the free-text edit instruction.
    pub fn set_instruction(&mut self, text: impl Into<String>) {
        self.instruction = text.into();
    }

    /// Sets the style identifier.
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.style = style.into();
    }

    /// Submits the edit request.
    ///
    /// Image generation and the change summary are requested concurrently
    /// and both must succeed; the first failure fails the submission as a
    /// whole. Incomplete input is rejected with a fixed validation message
    /// before anything touches the network, leaving the phase unchanged.
    pub async fn submit_edit(&mut self) -> Result<&Phase> {
        self.guard_not_in_flight()?;
        let instruction = self.instruction.trim().to_string();
        let original = match (&self.original, instruction.is_empty()) {
            (Some(original), false) => original.clone(),
            _ => return Err(RetouchError::Validation(EDIT_VALIDATION_MESSAGE.into())),
        };

        self.phase = Phase::Submitting;
        let prompt = compose_edit_prompt(&instruction, &self.style);

        let outcome = tokio::try_join!(
            self.client.request_edit(&original, &prompt),
            self.client.request_summary(&instruction, &self.style),
        );

        self.phase = match outcome {
            Ok((image, summary)) => Phase::Succeeded(SessionResult {
                image,
                summary: Some(summary),
            }),
            Err(err) => {
                tracing::warn!(error = %err, "edit submission failed");
                Phase::Failed(err.to_string())
            }
        };
        Ok(&self.phase)
    }

    /// Submits a creation request with the given prompt, style and aspect
    /// ratio. An empty prompt is rejected locally with a fixed message.
    pub async fn submit_creation(
        &mut self,
        prompt: &str,
        style: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<&Phase> {
        self.guard_not_in_flight()?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(RetouchError::Validation(CREATE_VALIDATION_MESSAGE.into()));
        }

        self.original = None;
        self.phase = Phase::Submitting;

        self.phase = match self.client.request_creation(prompt, style, aspect_ratio).await {
            Ok(image) => Phase::Succeeded(SessionResult {
                image,
                summary: None,
            }),
            Err(err) => {
                tracing::warn!(error = %err, "creation submission failed");
                Phase::Failed(err.to_string())
            }
        };
        Ok(&self.phase)
    }

    /// Clears all request and result state and returns to idle.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.mode = None;
        self.original = None;
        self.instruction.clear();
        self.style = DEFAULT_STYLE.to_string();
    }

    fn guard_not_in_flight(&self) -> Result<()> {
        if matches!(self.phase, Phase::Submitting) {
            return Err(RetouchError::Validation(
                "A request is already in flight.".into(),
            ));
        }
        Ok(())
    }
}

/// Composes the full edit instruction sent upstream: enhancement preamble,
/// the user's changes, and the chosen style.
pub fn compose_edit_prompt(instruction: &str, style: &str) -> String {
    format!(
        "Main task: enhance the image. If it is black and white or sepia, restore it to full color. \
         Then apply these modifications described by the user: \"{instruction}\". \
         The final style should be: \"{style}\"."
    )
}
