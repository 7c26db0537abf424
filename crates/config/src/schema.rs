/// Config schema types (server, downloads, fetcher, telegram, client).
use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaferryConfig {
    pub server: ServerConfig,
    pub downloads: DownloadsConfig,
    pub fetcher: FetcherConfig,
    pub telegram: TelegramConfig,
    pub client: ClientConfig,
}

impl MediaferryConfig {
    /// Base URL the bot uses to reach the conversion API.
    ///
    /// Falls back to the local server address when `client.api_base_url` is unset.
    pub fn api_base_url(&self) -> String {
        match self.client.api_base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => {
                let host = match self.server.bind.as_str() {
                    "0.0.0.0" | "::" | "" => "127.0.0.1",
                    other => other,
                };
                format!("http://{host}:{}", self.server.port)
            },
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on. Defaults to 8080.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

/// Scratch directory and artifact lifecycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    /// Directory the fetcher writes into and the retrieval endpoint serves from.
    pub dir: String,
    /// Delay between the end of a retrieval and deletion of the artifact.
    pub grace_period_secs: u64,
    /// Artifacts never retrieved are deleted this long after the job succeeded.
    /// `0` disables unclaimed expiry and the startup purge.
    pub unclaimed_ttl_secs: u64,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: "downloads".into(),
            grace_period_secs: 10,
            unclaimed_ttl_secs: 600,
        }
    }
}

/// External media fetcher invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Program name or path of the fetcher.
    pub binary: String,
    /// Deadline for a single invocation. `0` waits forever.
    pub timeout_secs: u64,
    /// Ceiling for the captured stdout+stderr diagnostic.
    pub max_diagnostic_bytes: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".into(),
            timeout_secs: 1800,
            max_diagnostic_bytes: 64 * 1024,
        }
    }
}

/// Telegram bot settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather. Empty disables the bot.
    pub token: Secret<String>,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: 30,
        }
    }
}

/// How the bot reaches the conversion API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Explicit API base URL, e.g. `http://converter.internal:8080`.
    pub api_base_url: Option<String>,
    /// Deadline shared by the submission and retrieval calls. `0` waits forever.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            timeout_secs: 1800,
        }
    }
}
