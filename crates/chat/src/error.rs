use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The conversion service rejected or failed the job.
    #[error("{message}")]
    Conversion { message: String },

    /// The artifact was produced but could not be delivered to the chat.
    #[error("{message}")]
    TransferFailed { message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Channel(#[from] mediaferry_channels::Error),
}

impl Error {
    #[must_use]
    pub fn conversion(message: impl std::fmt::Display) -> Self {
        Self::Conversion {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn transfer_failed(message: impl std::fmt::Display) -> Self {
        Self::TransferFailed {
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
