//! Failures a channel adapter reports back to the orchestrator.

use std::{error::Error as StdError, path::PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The chat id is not an address this channel can reach. Nothing was sent.
    #[error("unknown recipient {recipient:?}: {reason}")]
    UnknownRecipient { recipient: String, reason: String },

    /// Sending or editing a text message failed.
    #[error("failed to {operation}: {source}")]
    Message {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// The artifact could not be uploaded to the chat.
    #[error("failed to upload {}: {source}", path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl Error {
    #[must_use]
    pub fn unknown_recipient(recipient: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnknownRecipient {
            recipient: recipient.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn message(operation: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Message {
            operation,
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn upload(path: impl Into<PathBuf>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Upload {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
