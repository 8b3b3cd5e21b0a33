//! UI-agnostic chat state types
//!
//! This module contains the data structures shared between the chat session,
//! the answer service and any front end (TUI today). None of them depend on a
//! specific UI framework.

use std::fs;
use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One question identified by the model together with its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleQnA {
    pub question: String,
    pub answer: String,
}

impl SingleQnA {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A displayable piece of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatPart {
    Text { text: String },
    #[serde(rename = "multi_qna")]
    MultiQnA { qnas: Vec<SingleQnA> },
}

impl ChatPart {
    pub fn text(text: impl Into<String>) -> Self {
        ChatPart::Text { text: text.into() }
    }

    pub fn multi(qnas: Vec<SingleQnA>) -> Self {
        ChatPart::MultiQnA { qnas }
    }
}

/// An uploaded image, kept base64-encoded as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub data: String,
    pub mime_type: String,
}

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("Could not read image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
}

impl ImageAttachment {
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Encode raw image bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    /// Read an image file, inferring its MIME type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AttachmentError> {
        let path = path.as_ref();
        let mime_type = mime_type_for(path)?;
        let bytes = fs::read(path).map_err(|source| AttachmentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_bytes(&bytes, mime_type))
    }
}

fn mime_type_for(path: &Path) -> Result<&'static str, AttachmentError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        "heic" => Ok("image/heic"),
        "heif" => Ok("image/heif"),
        _ => Err(AttachmentError::UnsupportedType(path.display().to_string())),
    }
}

/// A single turn in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub parts: Vec<ChatPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttachment>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, image: Option<ImageAttachment>) -> Self {
        Self {
            role: ChatRole::User,
            parts: vec![ChatPart::text(text)],
            image,
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            parts: vec![ChatPart::text(text)],
            image: None,
        }
    }

    pub fn model_answers(qnas: Vec<SingleQnA>) -> Self {
        Self {
            role: ChatRole::Model,
            parts: vec![ChatPart::multi(qnas)],
            image: None,
        }
    }

    /// All QnA pairs carried by this message, in display order.
    pub fn qnas(&self) -> impl Iterator<Item = &SingleQnA> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ChatPart::MultiQnA { qnas } => Some(qnas),
                ChatPart::Text { .. } => None,
            })
            .flatten()
    }
}
