use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    mediaferry_config::MediaferryConfig,
    mediaferry_media::{CommandBuilder, ConversionPipeline, MediaFetcher, ProcessFetcher},
};

/// Everything the HTTP handlers share.
pub struct GatewayState {
    pub pipeline: ConversionPipeline,
    pub downloads_dir: PathBuf,
    /// Delay between the end of a retrieval and deletion of the artifact.
    pub grace_period: Duration,
    /// Unclaimed artifacts are deleted this long after the job succeeded.
    pub unclaimed_ttl: Option<Duration>,
    pub version: String,
}

impl GatewayState {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        program: impl Into<String>,
        downloads_dir: impl Into<PathBuf>,
        grace_period: Duration,
        unclaimed_ttl: Option<Duration>,
    ) -> Arc<Self> {
        let downloads_dir = downloads_dir.into();
        Arc::new(Self {
            pipeline: ConversionPipeline::new(
                CommandBuilder::new(program, downloads_dir.clone()),
                fetcher,
            ),
            downloads_dir,
            grace_period,
            unclaimed_ttl,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// State backed by the real fetcher process, as configured.
    pub fn from_config(config: &MediaferryConfig) -> Arc<Self> {
        let timeout = match config.fetcher.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let fetcher = ProcessFetcher::new(timeout, config.fetcher.max_diagnostic_bytes);
        Self::new(
            Arc::new(fetcher),
            config.fetcher.binary.clone(),
            &config.downloads.dir,
            Duration::from_secs(config.downloads.grace_period_secs),
            match config.downloads.unclaimed_ttl_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_disable_deadlines() {
        let mut config = MediaferryConfig::default();
        config.downloads.unclaimed_ttl_secs = 0;
        config.downloads.dir = "/tmp/mf".into();
        let state = GatewayState::from_config(&config);
        assert!(state.unclaimed_ttl.is_none());
        assert_eq!(state.grace_period, Duration::from_secs(10));
        assert_eq!(state.downloads_dir, PathBuf::from("/tmp/mf"));
        assert_eq!(state.pipeline.builder().downloads_dir(), state.downloads_dir);
    }
}
