//! Execution of fetcher invocations.

use std::{process::Stdio, time::Duration};

use {
    async_trait::async_trait,
    tokio::process::Command,
    tracing::{debug, info, warn},
};

use crate::{Error, Result, command::FetchCommand};

/// Output captured from a successful fetcher run.
#[derive(Debug, Clone, Default)]
pub struct FetchOutput {
    /// Combined stdout followed by stderr.
    pub diagnostic: String,
}

/// The capability that turns a [`FetchCommand`] into files on disk.
///
/// Implementations report a non-zero exit as [`Error::ExecutionFailed`]. A
/// successful return says nothing about whether a usable file exists; that
/// is the resolver's job.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, command: &FetchCommand) -> Result<FetchOutput>;
}

/// Runs the command as a child process.
#[derive(Debug, Clone)]
pub struct ProcessFetcher {
    /// `None` waits for the child forever.
    pub timeout: Option<Duration>,
    pub max_diagnostic_bytes: usize,
}

impl Default for ProcessFetcher {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30 * 60)),
            max_diagnostic_bytes: 64 * 1024,
        }
    }
}

impl ProcessFetcher {
    pub fn new(timeout: Option<Duration>, max_diagnostic_bytes: usize) -> Self {
        Self {
            timeout,
            max_diagnostic_bytes,
        }
    }
}

#[async_trait]
impl MediaFetcher for ProcessFetcher {
    async fn fetch(&self, command: &FetchCommand) -> Result<FetchOutput> {
        info!(program = %command.program, args = ?command.args, "executing fetcher");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout kills the child.
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| Error::ExecutionFailed {
            status: format!("failed to launch {}: {e}", command.program),
            diagnostic: String::new(),
        })?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(program = %command.program, timeout_secs = limit.as_secs(), "fetcher timed out");
                    return Err(Error::TimedOut {
                        after_secs: limit.as_secs(),
                    });
                },
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| Error::external("failed to wait for fetcher", e))?;

        let mut diagnostic = String::from_utf8_lossy(&output.stdout).into_owned();
        diagnostic.push_str(&String::from_utf8_lossy(&output.stderr));
        let diagnostic = keep_tail(diagnostic, self.max_diagnostic_bytes);

        if !output.status.success() {
            warn!(
                program = %command.program,
                status = %output.status,
                output = %diagnostic,
                "fetcher failed"
            );
            return Err(Error::ExecutionFailed {
                status: output.status.to_string(),
                diagnostic,
            });
        }

        debug!(diagnostic_len = diagnostic.len(), "fetcher finished");
        Ok(FetchOutput { diagnostic })
    }
}

/// Keep the last `max` bytes; the fetcher prints its error summary last.
fn keep_tail(mut text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    let mut cut = text.len() - max;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    let tail = text.split_off(cut);
    format!("[... output truncated]\n{tail}")
}
