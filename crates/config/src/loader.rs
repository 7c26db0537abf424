use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::MediaferryConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "mediaferry.toml",
    "mediaferry.yaml",
    "mediaferry.yml",
    "mediaferry.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<MediaferryConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply env overrides.
///
/// Search order:
/// 1. `./mediaferry.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/mediaferry/mediaferry.{toml,yaml,yml,json}` (user-global)
///
/// Returns defaults if no config file is found or it fails to parse.
pub fn discover_and_load() -> MediaferryConfig {
    let mut config = match find_config_file() {
        Some(path) => load_or_default(&path),
        None => {
            debug!("no config file found, using defaults");
            MediaferryConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Load an explicitly named config file, then apply env overrides.
pub fn load_from(path: &Path) -> MediaferryConfig {
    let mut config = load_or_default(path);
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

fn load_or_default(path: &Path) -> MediaferryConfig {
    debug!(path = %path.display(), "loading config");
    match load_config(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            MediaferryConfig::default()
        },
    }
}

/// Apply `MEDIAFERRY_*` environment overrides on top of file values.
pub fn apply_env_overrides(
    config: &mut MediaferryConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(token) = lookup("MEDIAFERRY_TELEGRAM_TOKEN").filter(|t| !t.trim().is_empty()) {
        config.telegram.token = secrecy::Secret::new(token.trim().to_string());
    }
    if let Some(bind) = lookup("MEDIAFERRY_BIND").filter(|b| !b.trim().is_empty()) {
        config.server.bind = bind.trim().to_string();
    }
    if let Some(port) = lookup("MEDIAFERRY_PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid MEDIAFERRY_PORT"),
        }
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/mediaferry/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "mediaferry").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<MediaferryConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediaferry.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9090\n\n[fetcher]\nbinary = \"/opt/yt-dlp\"\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.fetcher.binary, "/opt/yt-dlp");
        assert_eq!(cfg.server.bind, "127.0.0.1");
    }

    #[test]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediaferry.yaml");
        std::fs::write(&path, "downloads:\n  dir: /tmp/scratch\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.downloads.dir, "/tmp/scratch");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediaferry.ini");
        std::fs::write(&path, "port=1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediaferry.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        let cfg = load_or_default(&path);
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = MediaferryConfig::default();
        apply_env_overrides(&mut cfg, |name| match name {
            "MEDIAFERRY_TELEGRAM_TOKEN" => Some(" 42:XYZ ".into()),
            "MEDIAFERRY_PORT" => Some("7000".into()),
            _ => None,
        });
        assert_eq!(cfg.telegram.token.expose_secret(), "42:XYZ");
        assert_eq!(cfg.server.port, 7000);
        assert_eq!(cfg.server.bind, "127.0.0.1");
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut cfg = MediaferryConfig::default();
        apply_env_overrides(&mut cfg, |name| {
            (name == "MEDIAFERRY_PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(cfg.server.port, 8080);
    }
}
