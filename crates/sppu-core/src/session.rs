//! Chat session: append-only history plus the single in-flight request.
//!
//! A send is split in two so front ends can keep rendering while the answer
//! service runs: `begin_send` appends the user turn and moves the session to
//! `Awaiting`, `finish_send` applies the outcome and always returns to `Idle`.
//! `send` chains both around one service call.

use tracing::{debug, error, info, warn};

use crate::error::{AnswerError, SendError};
use crate::provider::AnswerService;
use crate::state::{ChatMessage, ImageAttachment, SingleQnA};

pub const GREETING: &str = "Hello! I'm your SPPU academic assistant. How can I help you prepare for your exams today? You can also upload an image of a question paper.";
/// Shown as the user turn when only an image was sent.
pub const IMAGE_ONLY_PLACEHOLDER: &str = "Please analyze this image.";
/// Sent to the model when only an image was sent.
pub const IMAGE_ONLY_PROMPT: &str =
    "Please answer the questions in this image based on the SPPU syllabus.";
pub const NO_ANSWER_MESSAGE: &str = "I couldn't find a specific answer for that. Could you please rephrase your question or try a different image?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Awaiting,
}

/// Identifies the send a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendTicket {
    epoch: u64,
}

/// Everything the answer service needs for a send started by `begin_send`.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub prompt: String,
    pub image: Option<ImageAttachment>,
    pub ticket: SendTicket,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    state: SessionState,
    error: Option<String>,
    // Bumped by every new session; completions from older epochs are dropped
    epoch: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::model_text(GREETING)],
            state: SessionState::Idle,
            error: None,
            epoch: 0,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Awaiting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reset history to the greeting and clear the error. Loading state is
    /// left alone.
    pub fn start_new_session(&mut self) {
        self.messages = vec![ChatMessage::model_text(GREETING)];
        self.error = None;
        self.epoch += 1;
        info!(target: "session", "Started new chat session");
    }

    pub fn begin_send(
        &mut self,
        message: &str,
        image: Option<ImageAttachment>,
    ) -> Result<PendingSend, SendError> {
        if self.state == SessionState::Awaiting {
            return Err(SendError::Busy);
        }
        if message.is_empty() && image.is_none() {
            return Err(SendError::EmptyMessage);
        }

        let (display_text, prompt) = if message.is_empty() {
            (IMAGE_ONLY_PLACEHOLDER, IMAGE_ONLY_PROMPT)
        } else {
            (message, message)
        };

        self.messages
            .push(ChatMessage::user(display_text, image.clone()));
        self.state = SessionState::Awaiting;
        self.error = None;

        debug!(
            target: "session",
            "Sending prompt ({} chars, image: {})",
            prompt.chars().count(),
            image.is_some()
        );

        Ok(PendingSend {
            prompt: prompt.to_string(),
            image,
            ticket: SendTicket { epoch: self.epoch },
        })
    }

    pub fn finish_send(
        &mut self,
        ticket: SendTicket,
        outcome: Result<Vec<SingleQnA>, AnswerError>,
    ) {
        if self.state != SessionState::Awaiting {
            warn!(target: "session", "Ignoring completion with no send in flight");
            return;
        }
        self.state = SessionState::Idle;

        if ticket.epoch != self.epoch {
            info!(target: "session", "Dropping answer for a previous chat session");
            return;
        }

        match outcome {
            Ok(qnas) if qnas.is_empty() => {
                self.messages.push(ChatMessage::model_text(NO_ANSWER_MESSAGE));
            }
            Ok(qnas) => {
                debug!(target: "session", "Received {} answers", qnas.len());
                self.messages.push(ChatMessage::model_answers(qnas));
            }
            Err(e) => {
                error!(target: "session", "Answer service failed: {}", e);
                self.error = Some(e.user_message());
            }
        }
    }

    /// Send a message and wait for the answer.
    pub async fn send<S: AnswerService>(
        &mut self,
        service: &S,
        message: &str,
        image: Option<ImageAttachment>,
    ) -> Result<(), SendError> {
        let pending = self.begin_send(message, image)?;
        let outcome = service
            .answer(&pending.prompt, pending.image.as_ref())
            .await;
        self.finish_send(pending.ticket, outcome);
        Ok(())
    }
}
