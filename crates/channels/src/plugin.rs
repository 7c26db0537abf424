use std::path::Path;

use {async_trait::async_trait, serde::Serialize};

use crate::Result;

// ── Inbound ─────────────────────────────────────────────────────────────────

/// What a chat participant did, stripped of platform details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Explicit session-start trigger (`/start`).
    Start,
    /// Free text.
    Text(String),
    /// An inline choice was pressed; carries the choice's `data`.
    Selection(String),
}

/// A [`ChatEvent`] together with the conversation it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct InboundEvent {
    /// Chat/peer ID replies go to; also the session key.
    pub chat_id: String,
    pub username: Option<String>,
    pub event: ChatEvent,
}

impl InboundEvent {
    pub fn new(chat_id: impl Into<String>, event: ChatEvent) -> Self {
        Self {
            chat_id: chat_id.into(),
            username: None,
            event,
        }
    }
}

/// Sink for inbound events; the conversation layer provides the implementation.
///
/// Channels call this from a single polling loop, so events for all chats
/// arrive in order. Implementations must not block on long work.
#[async_trait]
pub trait ChannelEventSink: Send + Sync {
    async fn dispatch(&self, event: InboundEvent);
}

// ── Outbound ────────────────────────────────────────────────────────────────

/// One inline button: what the user sees and what comes back as a
/// [`ChatEvent::Selection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub label: String,
    pub data: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Handle to a sent message, used to edit it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageRef {
    pub message_id: i32,
}

/// How a local file is presented when sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Audio,
    Video,
}

/// Send messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Send text, with `choices` rendered as a single row of inline buttons.
    async fn send_text(&self, chat_id: &str, text: &str, choices: &[Choice])
    -> Result<MessageRef>;

    /// Replace the text of a previously sent message.
    async fn edit_text(&self, chat_id: &str, message: MessageRef, text: &str) -> Result<()>;

    /// Upload a local file.
    async fn send_media(&self, chat_id: &str, kind: MediaKind, path: &Path) -> Result<()>;
}
