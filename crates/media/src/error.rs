use std::{error::Error as StdError, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller input rejected before anything ran.
    #[error("{message}")]
    InvalidRequest { message: String },

    #[error("invalid format: {format:?} (expected mp4, mp3 or image)")]
    InvalidFormat { format: String },

    /// The fetcher could not be launched or exited non-zero.
    #[error("conversion failed: {status}")]
    ExecutionFailed { status: String, diagnostic: String },

    #[error("conversion timed out after {after_secs}s")]
    TimedOut { after_secs: u64 },

    #[error("converted file not found (pattern {pattern})")]
    ArtifactNotFound { pattern: String },

    #[error("converted file is empty or not found: {}", path.display())]
    ArtifactEmpty { path: PathBuf },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether the error was caused by caller input rather than the pipeline.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. } | Self::InvalidFormat { .. })
    }

    /// Captured fetcher output, if the failure carries one.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::ExecutionFailed { diagnostic, .. } => Some(diagnostic),
            _ => None,
        }
    }

    /// Message suitable for API callers and chat users.
    ///
    /// Execution failures append the last non-empty diagnostic line, which is
    /// where the fetcher prints its `ERROR:` summary.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::ExecutionFailed { diagnostic, .. } => {
                match diagnostic.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
                    Some(last) => format!("{self}: {last}"),
                    None => self.to_string(),
                }
            },
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
