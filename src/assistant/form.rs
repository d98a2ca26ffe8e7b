//! State of the assistant form shown inside the overlay frame
//!
//! The form is sans-IO: [`AssistantForm::submit`] hands back the request to
//! send and [`AssistantForm::complete`] takes the outcome, so the same state
//! machine backs the CLI, the MCP server and tests.

use super::generator::{GenerateError, ReplyGenerator, ReplyRequest};
use super::tone::{Tone, ToneKind};
use crate::channel::ChannelMessage;
use serde::Serialize;

pub const MISSING_CONTENT: &str = "Please enter email content";
pub const MISSING_CUSTOM_TONE: &str = "Please enter a custom tone";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormPhase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssistantForm {
    email_content: String,
    tone_kind: ToneKind,
    custom_tone: String,
    phase: FormPhase,
    error_message: Option<String>,
    generated_response: Option<String>,
}

impl AssistantForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn email_content(&self) -> &str {
        &self.email_content
    }

    pub fn tone_kind(&self) -> ToneKind {
        self.tone_kind
    }

    pub fn custom_tone(&self) -> &str {
        &self.custom_tone
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn generated_response(&self) -> Option<&str> {
        self.generated_response.as_deref()
    }

    /// Apply a message posted by the host page
    ///
    /// Returns whether the form changed.
    pub fn receive(&mut self, message: &ChannelMessage) -> bool {
        match message {
            ChannelMessage::InitialContent { content } => {
                self.email_content = content.clone();
                true
            }
            other => {
                log::debug!("Form ignoring {} message", other.tag());
                false
            }
        }
    }

    pub fn set_email_content(&mut self, content: impl Into<String>) {
        self.email_content = content.into();
    }

    pub fn set_custom_tone(&mut self, text: impl Into<String>) {
        self.custom_tone = text.into();
    }

    pub fn select_tone(&mut self, kind: ToneKind) {
        self.tone_kind = kind;
        self.error_message = None;
        if kind != ToneKind::Custom {
            self.custom_tone.clear();
        }
    }

    /// Validate the form and build the backend request
    ///
    /// On a validation failure the message is recorded and returned, and the
    /// phase stays idle.
    pub fn submit(&mut self) -> Result<ReplyRequest, String> {
        self.error_message = None;
        self.generated_response = None;

        if self.email_content.trim().is_empty() {
            return Err(self.fail(MISSING_CONTENT.to_string()));
        }
        let Some(tone) = Tone::from_parts(self.tone_kind, &self.custom_tone) else {
            return Err(self.fail(MISSING_CUSTOM_TONE.to_string()));
        };

        self.phase = FormPhase::Submitting;
        Ok(ReplyRequest {
            email_content: self.email_content.clone(),
            tone: tone.request_value().to_string(),
        })
    }

    /// Record the outcome of a generation request
    pub fn complete(&mut self, outcome: Result<String, GenerateError>) {
        match outcome {
            Ok(reply) if !reply.is_empty() => {
                self.generated_response = Some(reply);
                self.phase = FormPhase::Succeeded;
            }
            Ok(_) => {
                log::debug!("Backend returned an empty reply");
                self.phase = FormPhase::Idle;
            }
            Err(e) => {
                log::warn!("Reply generation failed: {:?}", e);
                self.fail(e.to_string());
            }
        }
    }

    /// Messages to post to the host to insert the reply and close the overlay
    pub fn insert_into_email(&self) -> Vec<ChannelMessage> {
        match &self.generated_response {
            Some(response) => vec![
                ChannelMessage::InsertResponse {
                    response: response.clone(),
                },
                ChannelMessage::ClosePopup,
            ],
            None => Vec::new(),
        }
    }

    pub fn response_for_clipboard(&self) -> Option<&str> {
        self.generated_response.as_deref()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn fail(&mut self, message: String) -> String {
        self.phase = FormPhase::Idle;
        self.error_message = Some(message.clone());
        message
    }
}

/// Submit the form, ask the generator, and record the outcome
///
/// Returns the reply on success; the form holds the user-facing error otherwise.
pub async fn draft_reply(form: &mut AssistantForm, generator: &dyn ReplyGenerator) -> Option<String> {
    let request = form.submit().ok()?;
    let outcome = generator.generate(&request).await;
    form.complete(outcome);
    form.generated_response().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> AssistantForm {
        let mut form = AssistantForm::new();
        form.receive(&ChannelMessage::InitialContent {
            content: "Are you free Friday?".to_string(),
        });
        form
    }

    #[test]
    fn test_receive_only_takes_initial_content() {
        let mut form = AssistantForm::new();
        assert!(!form.receive(&ChannelMessage::ClosePopup));
        assert!(form.receive(&ChannelMessage::InitialContent { content: "X".to_string() }));
        assert_eq!(form.email_content(), "X");
    }

    #[test]
    fn test_submit_requires_content() {
        let mut form = AssistantForm::new();
        assert_eq!(form.submit(), Err(MISSING_CONTENT.to_string()));
        assert_eq!(form.error_message(), Some(MISSING_CONTENT));
        assert_eq!(form.phase(), FormPhase::Idle);
    }

    #[test]
    fn test_custom_tone_validation() {
        let mut form = filled();
        form.select_tone(ToneKind::Custom);
        assert_eq!(form.submit(), Err(MISSING_CUSTOM_TONE.to_string()));

        form.set_custom_tone("apologetic");
        let request = form.submit().unwrap();
        assert_eq!(request.tone, "apologetic");
        assert_eq!(form.phase(), FormPhase::Submitting);
        assert_eq!(form.error_message(), None);
    }

    #[test]
    fn test_selecting_fixed_tone_clears_custom_text() {
        let mut form = filled();
        form.select_tone(ToneKind::Custom);
        form.set_custom_tone("pirate");
        form.select_tone(ToneKind::Friendly);
        assert_eq!(form.custom_tone(), "");
        assert_eq!(form.submit().unwrap().tone, "friendly");
    }

    #[test]
    fn test_complete_outcomes() {
        let mut form = filled();
        form.submit().unwrap();
        form.complete(Ok(String::new()));
        assert_eq!(form.phase(), FormPhase::Idle);
        assert!(form.insert_into_email().is_empty());

        form.submit().unwrap();
        form.complete(Err(GenerateError::ServerFault));
        assert_eq!(form.error_message(), Some("Server error occurred. Please try again later."));
        assert_eq!(form.generated_response(), None);

        form.submit().unwrap();
        form.complete(Ok("Friday works.".to_string()));
        assert_eq!(form.phase(), FormPhase::Succeeded);
        assert_eq!(form.response_for_clipboard(), Some("Friday works."));
        assert_eq!(
            form.insert_into_email(),
            vec![
                ChannelMessage::InsertResponse { response: "Friday works.".to_string() },
                ChannelMessage::ClosePopup,
            ]
        );
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut form = filled();
        form.select_tone(ToneKind::Casual);
        form.submit().unwrap();
        form.complete(Ok("Sure".to_string()));

        form.clear();
        assert_eq!(form.email_content(), "");
        assert_eq!(form.tone_kind(), ToneKind::Professional);
        assert_eq!(form.phase(), FormPhase::Idle);
        assert_eq!(form.generated_response(), None);
    }
}
