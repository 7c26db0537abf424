//! Conversion jobs: build, execute, resolve.

use std::{path::PathBuf, sync::Arc};

use {
    serde::Serialize,
    tracing::{info, warn},
    uuid::Uuid,
};

use crate::{
    Error, Result,
    artifact::ArtifactHandle,
    cleanup::JobFilesGuard,
    command::{CommandBuilder, job_stem},
    fetcher::MediaFetcher,
    resolver::resolve_output,
    spec::JobSpecification,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One execution of a [`JobSpecification`].
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: String,
    pub spec: JobSpecification,
    pub output_template: PathBuf,
    pub artifact: Option<ArtifactHandle>,
    pub status: JobStatus,
    pub diagnostic: Option<String>,
}

impl ConversionJob {
    fn new(spec: JobSpecification, output_template: PathBuf, id: String) -> Self {
        Self {
            id,
            spec,
            output_template,
            artifact: None,
            status: JobStatus::Pending,
            diagnostic: None,
        }
    }

    fn transition(&mut self, next: JobStatus) {
        // Terminal jobs are never updated again.
        if !self.status.is_terminal() {
            self.status = next;
        }
    }
}

/// New random job id: 32 lowercase hex digits.
pub fn new_job_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Wires the command builder, a fetcher and the resolver together.
#[derive(Clone)]
pub struct ConversionPipeline {
    builder: CommandBuilder,
    fetcher: Arc<dyn MediaFetcher>,
}

impl ConversionPipeline {
    pub fn new(builder: CommandBuilder, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self { builder, fetcher }
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    /// Run one job to a terminal state.
    ///
    /// Success means the fetcher exited zero *and* a non-empty file exists.
    /// Anything a failed or abandoned job wrote is removed.
    pub async fn run(&self, spec: JobSpecification) -> Result<ConversionJob> {
        let id = new_job_id();
        let command = self.builder.build(&spec, &id);
        let mut job = ConversionJob::new(spec, command.output_template.clone(), id);

        tokio::fs::create_dir_all(self.builder.downloads_dir())
            .await
            .map_err(|e| Error::external("failed to create downloads directory", e))?;
        let leftovers = JobFilesGuard::new(
            self.builder.downloads_dir(),
            job_stem(job.spec.target_format(), &job.id),
        );

        job.transition(JobStatus::Running);
        info!(
            job_id = %job.id,
            format = %job.spec.target_format(),
            quality = ?job.spec.quality_hint(),
            template = %job.output_template.display(),
            "conversion job started"
        );

        let outcome = match self.fetcher.fetch(&command).await {
            Ok(output) => {
                job.diagnostic = Some(output.diagnostic);
                resolve_output(&job.output_template).await
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(artifact) => {
                info!(
                    job_id = %job.id,
                    path = %artifact.path.display(),
                    size_bytes = artifact.size_bytes,
                    "conversion job succeeded"
                );
                leftovers.disarm();
                job.artifact = Some(artifact);
                job.transition(JobStatus::Succeeded);
                Ok(job)
            },
            Err(e) => {
                if let Some(diagnostic) = e.diagnostic() {
                    job.diagnostic = Some(diagnostic.to_string());
                }
                job.transition(JobStatus::Failed);
                let removed = leftovers.discard().await;
                warn!(job_id = %job.id, error = %e, removed, "conversion job failed");
                Err(e)
            },
        }
    }
}
