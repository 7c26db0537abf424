use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

/// URL prefix of the retrieval endpoint.
pub const RETRIEVAL_PREFIX: &str = "/downloads";

/// A verified, non-empty file produced by a conversion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: SystemTime,
}

impl ArtifactHandle {
    /// Base name the retrieval endpoint is keyed by.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Path a client requests to retrieve this artifact, e.g. `/downloads/audio_x.mp3`.
    pub fn retrieval_path(&self) -> String {
        format!("{RETRIEVAL_PREFIX}/{}", self.file_name())
    }
}

/// Accepts only a bare file name: no separators, no parent references.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).file_name().is_some_and(|n| n == name)
}
