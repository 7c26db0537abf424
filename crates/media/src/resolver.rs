//! Post-execution resolution of the produced file.
//!
//! The command builder declares an output template; only after the fetcher
//! ran do we know the concrete path. Resolution never trusts the exit code:
//! a missing or empty file is a failure on its own.

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use {
    globset::{GlobBuilder, GlobMatcher},
    tracing::warn,
};

use crate::{Error, Result, artifact::ArtifactHandle, command::EXT_PLACEHOLDER};

/// Leftovers of interrupted downloads; never an artifact.
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp"];

/// Resolve `template` to a concrete, non-empty file.
pub async fn resolve_output(template: &Path) -> Result<ArtifactHandle> {
    let path = if template.to_string_lossy().contains(EXT_PLACEHOLDER) {
        match_placeholder(template).await?
    } else {
        template.to_path_buf()
    };
    verify_non_empty(path).await
}

async fn match_placeholder(template: &Path) -> Result<PathBuf> {
    let dir = match template.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pattern = placeholder_pattern(&name);
    let display_pattern = dir.join(&pattern).display().to_string();
    let matcher = GlobBuilder::new(&pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::external("invalid output pattern", e))?
        .compile_matcher();

    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read downloads directory");
            return Err(Error::ArtifactNotFound {
                pattern: display_pattern,
            });
        },
    };

    let mut candidates: Vec<(SystemTime, String)> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::external("failed to list downloads directory", e))?
    {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !is_candidate(&matcher, &file_name) {
            continue;
        }
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        candidates.push((meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), file_name));
    }

    if candidates.len() > 1 {
        warn!(
            pattern = %display_pattern,
            count = candidates.len(),
            "several candidates matched, picking most recent"
        );
    }

    pick_candidate(candidates)
        .map(|name| dir.join(name))
        .ok_or(Error::ArtifactNotFound {
            pattern: display_pattern,
        })
}

fn is_candidate(matcher: &GlobMatcher, file_name: &str) -> bool {
    matcher.is_match(file_name) && !PARTIAL_SUFFIXES.iter().any(|s| file_name.ends_with(s))
}

/// Most recently modified wins; equal times fall back to the greatest name.
fn pick_candidate(candidates: Vec<(SystemTime, String)>) -> Option<String> {
    candidates.into_iter().max().map(|(_, name)| name)
}

/// Turn `audio_x.%(ext)s` into the glob `audio_x.*`, escaping everything else.
fn placeholder_pattern(file_name: &str) -> String {
    file_name
        .split(EXT_PLACEHOLDER)
        .map(escape_glob)
        .collect::<Vec<_>>()
        .join("*")
}

fn escape_glob(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        match c {
            '*' | '?' | '[' | ']' | '{' | '}' | '\\' => {
                out.push('[');
                out.push(c);
                out.push(']');
            },
            _ => out.push(c),
        }
    }
    out
}

async fn verify_non_empty(path: PathBuf) -> Result<ArtifactHandle> {
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(ArtifactHandle {
            created_at: meta.modified().unwrap_or_else(|_| SystemTime::now()),
            size_bytes: meta.len(),
            path,
        }),
        _ => Err(Error::ArtifactEmpty { path }),
    }
}
