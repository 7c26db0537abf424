//! `mediaferry convert`: run one job through the local pipeline.

use std::{sync::Arc, time::Duration};

use {
    anyhow::Result,
    mediaferry_config::MediaferryConfig,
    mediaferry_media::{CommandBuilder, ConversionPipeline, JobSpecification, ProcessFetcher},
};

pub async fn handle_convert(
    config: &MediaferryConfig,
    url: &str,
    format: &str,
    quality: Option<&str>,
) -> Result<()> {
    let spec = JobSpecification::new(url, format, quality)?;

    let timeout = match config.fetcher.timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let pipeline = ConversionPipeline::new(
        CommandBuilder::new(config.fetcher.binary.clone(), &config.downloads.dir),
        Arc::new(ProcessFetcher::new(
            timeout,
            config.fetcher.max_diagnostic_bytes,
        )),
    );

    let job = match pipeline.run(spec).await {
        Ok(job) => job,
        Err(e) => {
            if let Some(diagnostic) = e.diagnostic() {
                eprintln!("{diagnostic}");
            }
            return Err(e.into());
        },
    };

    // The pipeline only returns succeeded jobs, which always carry an artifact.
    let Some(artifact) = job.artifact else {
        anyhow::bail!("job {} finished without an artifact", job.id);
    };
    eprintln!("{} bytes", artifact.size_bytes);
    println!("{}", artifact.path.display());
    Ok(())
}
