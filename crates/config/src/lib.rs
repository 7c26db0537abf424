//! Configuration loading and env substitution.
//!
//! Config files: `mediaferry.toml`, `mediaferry.yaml`, or `mediaferry.json`
//! Searched in `./` then `~/.config/mediaferry/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw text.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config,
        load_from,
    },
    schema::{
        ClientConfig, DownloadsConfig, FetcherConfig, MediaferryConfig, ServerConfig,
        TelegramConfig,
    },
};
