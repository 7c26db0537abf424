//! Deletion of served and abandoned artifacts.

use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use {
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

use crate::{Error, Result};

/// Remove `path` once `delay` has elapsed. A file that is already gone is fine.
pub fn schedule_deletion(path: PathBuf, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        remove_quietly(&path).await;
    })
}

/// Like [`schedule_deletion`], but usable from synchronous contexts such as
/// `Drop`. Returns `None` when no runtime is available.
pub fn try_schedule_deletion(path: PathBuf, delay: Duration) -> Option<JoinHandle<()>> {
    let handle = tokio::runtime::Handle::try_current().ok()?;
    Some(handle.spawn(async move {
        tokio::time::sleep(delay).await;
        remove_quietly(&path).await;
    }))
}

pub async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "artifact deleted"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "artifact already gone");
        },
        Err(e) => warn!(path = %path.display(), error = %e, "failed to delete artifact"),
    }
}

/// Delete regular files in `dir` last modified more than `max_age` ago.
///
/// Returns the number of files removed. A missing directory counts as empty.
pub async fn purge_stale(dir: &Path, max_age: Duration) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(Error::external("failed to read downloads directory", e)),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::external("failed to list downloads directory", e))?
    {
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to purge stale artifact"),
        }
    }

    if removed > 0 {
        info!(dir = %dir.display(), removed, "purged stale artifacts");
    }
    Ok(removed)
}

/// Remove every file in `dir` named `<stem>` or `<stem>.*`.
///
/// Returns the number of files removed.
pub async fn remove_job_files(dir: &Path, stem: &str) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(dir = %dir.display(), error = %e, "cannot list job leftovers");
            }
            return 0;
        },
    };

    let prefix = format!("{stem}.");
    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name != stem && !name.starts_with(&prefix) {
            continue;
        }
        if entry.file_type().await.is_ok_and(|t| t.is_file()) {
            remove_quietly(&entry.path()).await;
            removed += 1;
        }
    }
    if removed > 0 {
        debug!(dir = %dir.display(), stem, removed, "removed job leftovers");
    }
    removed
}

/// Owns the files of a running job until it succeeds.
///
/// Unless [`disarm`](Self::disarm)ed, dropping the guard removes everything
/// the job wrote, including when the job future itself is dropped mid-run.
#[derive(Debug)]
pub struct JobFilesGuard {
    dir: PathBuf,
    stem: String,
    armed: bool,
}

impl JobFilesGuard {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
            armed: true,
        }
    }

    /// Keep the files; the job produced a verified artifact.
    pub fn disarm(mut self) {
        self.armed = false;
    }

    /// Remove the job's files now and wait for it.
    pub async fn discard(mut self) -> usize {
        self.armed = false;
        remove_job_files(&self.dir, &self.stem).await
    }
}

impl Drop for JobFilesGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(stem = %self.stem, "no runtime to remove job leftovers");
            return;
        };
        let dir = std::mem::take(&mut self.dir);
        let stem = std::mem::take(&mut self.stem);
        handle.spawn(async move {
            remove_job_files(&dir, &stem).await;
        });
    }
}
