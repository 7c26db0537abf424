mod convert_commands;
mod doctor_commands;

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    mediaferry_chat::{HttpConversionClient, Orchestrator},
    mediaferry_config::MediaferryConfig,
    mediaferry_gateway::GatewayState,
    mediaferry_telegram::TelegramOutbound,
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

/// How long to wait for the polling loop to wind down on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "mediaferry", about = "Mediaferry: chat-driven media conversion")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/mediaferry/).
    #[arg(long, global = true, env = "MEDIAFERRY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the conversion API and the Telegram bot (default).
    Run,
    /// Start only the conversion API.
    Api,
    /// Start only the Telegram bot, talking to `client.api_base_url`.
    Bot,
    /// Run one conversion locally and print the artifact path.
    Convert {
        #[arg(long)]
        url: String,
        /// mp4, mp3 or image.
        #[arg(long)]
        format: String,
        /// e.g. 720 for video, 192 for audio.
        #[arg(long)]
        quality: Option<String>,
    },
    /// Check the environment and print the effective configuration.
    Doctor,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> MediaferryConfig {
    let mut config = match cli.config {
        Some(ref path) => mediaferry_config::load_from(path),
        None => mediaferry_config::discover_and_load(),
    };
    // CLI args override config values
    if let Some(ref bind) = cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "mediaferry starting");
    let config = load_config(&cli);

    match cli.command {
        None | Some(Commands::Run) => serve(config, true, true).await,
        Some(Commands::Api) => serve(config, true, false).await,
        Some(Commands::Bot) => serve(config, false, true).await,
        Some(Commands::Convert {
            url,
            format,
            quality,
        }) => convert_commands::handle_convert(&config, &url, &format, quality.as_deref()).await,
        Some(Commands::Doctor) => doctor_commands::handle_doctor(&config, cli.config.as_deref()),
    }
}

/// Run the API server and/or the bot until Ctrl-C or a fatal error.
async fn serve(config: MediaferryConfig, api: bool, bot: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let gateway = api.then(|| {
        let state = GatewayState::from_config(&config);
        let bind = config.server.bind.clone();
        let port = config.server.port;
        tokio::spawn(async move { mediaferry_gateway::start_gateway(&bind, port, state).await })
    });

    let polling = if bot {
        Some(start_bot(&config, cancel.clone()).await?)
    } else {
        None
    };

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            info!("shutdown requested");
            Ok(())
        },
        result = wait_gateway(gateway) => result,
        // With the API up, losing the poller is not fatal.
        _ = cancel.cancelled(), if !api => {
            Err(anyhow::anyhow!("telegram polling stopped: another instance is using this token"))
        },
    };

    cancel.cancel();
    if let Some(handle) = polling {
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
            warn!("telegram polling did not stop in time");
        }
    }
    outcome
}

async fn wait_gateway(gateway: Option<JoinHandle<anyhow::Result<()>>>) -> anyhow::Result<()> {
    match gateway {
        Some(handle) => handle.await.context("gateway task failed")?,
        None => std::future::pending().await,
    }
}

async fn start_bot(
    config: &MediaferryConfig,
    cancel: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    if !config.telegram.is_configured() {
        anyhow::bail!(
            "telegram token not configured (set MEDIAFERRY_TELEGRAM_TOKEN or telegram.token)"
        );
    }

    let bot = mediaferry_telegram::build_bot(&config.telegram)?;
    mediaferry_telegram::connect(&bot)
        .await
        .context("failed to connect to telegram")?;

    let timeout = match config.client.timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let client = HttpConversionClient::new(config.api_base_url(), timeout)?;
    info!(api = client.base_url(), "using conversion api");

    let orchestrator = Orchestrator::new(
        Arc::new(client),
        Arc::new(TelegramOutbound::new(bot.clone())),
    );
    Ok(mediaferry_telegram::start_polling(
        bot,
        Arc::new(orchestrator),
        config.telegram.poll_timeout_secs,
        cancel,
    ))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_run_without_subcommand() {
        let cli = Cli::try_parse_from(["mediaferry"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
        assert!(!cli.json_logs);
    }

    #[test]
    fn parses_convert_arguments() {
        let cli = Cli::try_parse_from([
            "mediaferry",
            "convert",
            "--url",
            "https://example.com/v",
            "--format",
            "mp3",
            "--quality",
            "192",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Convert {
                url,
                format,
                quality,
            }) => {
                assert_eq!(url, "https://example.com/v");
                assert_eq!(format, "mp3");
                assert_eq!(quality.as_deref(), Some("192"));
            },
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn cli_overrides_config_address() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediaferry.toml");
        std::fs::write(&path, "[server]\nbind = \"0.0.0.0\"\nport = 9000\n").unwrap();

        let cli = Cli::try_parse_from([
            "mediaferry",
            "api",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "9100",
        ])
        .unwrap();
        let config = load_config(&cli);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
    }
}
