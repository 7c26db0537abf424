//! `mediaferry doctor`: environment audit and effective configuration.
//!
//! Prints a structured report with `[ok]`, `[warn]`, `[fail]` or `[info]`
//! per item, followed by the effective configuration with secrets redacted.

use std::path::Path;

use {anyhow::Result, mediaferry_config::MediaferryConfig};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Info => CYAN,
        }
    }
}

struct CheckItem {
    status: Status,
    message: String,
}

struct Section {
    title: String,
    items: Vec<CheckItem>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push(CheckItem {
            status,
            message: message.into(),
        });
    }
}

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for item in &section.items {
            let color = item.status.color();
            let label = item.status.label();
            eprintln!("  [{color}{label}{RESET}]  {}", item.message);
            match item.status {
                Status::Fail => errors += 1,
                Status::Warn => warnings += 1,
                _ => {},
            }
        }
        eprintln!();
    }

    (errors, warnings)
}

pub fn handle_doctor(config: &MediaferryConfig, explicit: Option<&Path>) -> Result<()> {
    eprintln!("{BOLD}mediaferry doctor{RESET}");
    eprintln!("{BOLD}================={RESET}\n");

    let sections = vec![
        check_config_file(explicit),
        check_fetcher(config),
        check_downloads(config),
        check_server(config),
        check_telegram(config),
    ];
    let (errors, warnings) = print_report(&sections);

    eprintln!("{BOLD}Effective configuration{RESET}");
    eprintln!("{config:#?}\n");

    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");
    if errors > 0 {
        anyhow::bail!("doctor found {errors} error(s)");
    }
    Ok(())
}

fn check_config_file(explicit: Option<&Path>) -> Section {
    let mut section = Section::new("Config");
    match explicit {
        Some(path) => match mediaferry_config::load_config(path) {
            Ok(_) => section.push(Status::Ok, format!("Loaded {}", path.display())),
            Err(e) => section.push(Status::Fail, format!("{}: {e}", path.display())),
        },
        None => match mediaferry_config::find_config_file() {
            Some(path) => match mediaferry_config::load_config(&path) {
                Ok(_) => section.push(Status::Ok, format!("Loaded {}", path.display())),
                Err(e) => section.push(Status::Fail, format!("{}: {e}", path.display())),
            },
            None => section.push(Status::Info, "No config file found, using defaults"),
        },
    }
    section
}

fn check_fetcher(config: &MediaferryConfig) -> Section {
    let binary = &config.fetcher.binary;
    let mut section = Section::new(format!("Fetcher ({binary})"));
    match which::which(binary) {
        Ok(path) => section.push(Status::Ok, format!("Found at {}", path.display())),
        Err(_) => section.push(
            Status::Fail,
            format!("`{binary}` not found on PATH; conversions will fail"),
        ),
    }
    if config.fetcher.timeout_secs == 0 {
        section.push(Status::Warn, "No fetcher timeout; a stuck job runs forever");
    }
    section
}

fn check_downloads(config: &MediaferryConfig) -> Section {
    let dir = Path::new(&config.downloads.dir);
    let mut section = Section::new(format!("Downloads ({})", dir.display()));
    if dir.is_dir() {
        section.push(Status::Ok, "Directory exists");
    } else if dir.exists() {
        section.push(Status::Fail, "Path exists but is not a directory");
    } else {
        section.push(Status::Info, "Directory will be created on startup");
    }
    if config.downloads.unclaimed_ttl_secs == 0 {
        section.push(
            Status::Warn,
            "Unclaimed artifacts are never removed (unclaimed_ttl_secs = 0)",
        );
    }
    section
}

fn check_server(config: &MediaferryConfig) -> Section {
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let mut section = Section::new("Server");
    match addr.parse::<std::net::SocketAddr>() {
        Ok(_) => section.push(Status::Ok, format!("Listening address {addr}")),
        Err(e) => section.push(Status::Fail, format!("Invalid listening address {addr}: {e}")),
    }
    section.push(Status::Info, format!("Bot talks to {}", config.api_base_url()));
    section
}

fn check_telegram(config: &MediaferryConfig) -> Section {
    let mut section = Section::new("Telegram");
    if config.telegram.is_configured() {
        section.push(Status::Ok, "Bot token configured");
    } else {
        section.push(
            Status::Warn,
            "No bot token; set MEDIAFERRY_TELEGRAM_TOKEN to enable the bot",
        );
    }
    section
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_report_counts_errors_and_warnings() {
        let mut section = Section::new("test");
        section.push(Status::Ok, "fine");
        section.push(Status::Warn, "caution");
        section.push(Status::Fail, "broken");
        section.push(Status::Info, "note");

        let (errors, warnings) = print_report(&[section]);
        assert_eq!(errors, 1);
        assert_eq!(warnings, 1);
    }

    #[test]
    fn missing_fetcher_fails() {
        let mut config = MediaferryConfig::default();
        config.fetcher.binary = "definitely-not-a-real-fetcher-binary".into();
        let section = check_fetcher(&config);
        assert_eq!(section.items[0].status, Status::Fail);
    }

    #[test]
    fn unconfigured_telegram_warns() {
        let section = check_telegram(&MediaferryConfig::default());
        assert_eq!(section.items[0].status, Status::Warn);
    }

    #[test]
    fn downloads_path_that_is_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("downloads");
        std::fs::write(&file, b"x").unwrap();

        let mut config = MediaferryConfig::default();
        config.downloads.dir = file.to_string_lossy().into_owned();
        let section = check_downloads(&config);
        assert_eq!(section.items[0].status, Status::Fail);
    }

    #[test]
    fn explicit_config_with_syntax_error_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediaferry.toml");
        std::fs::write(&path, "[server\nport = 1").unwrap();
        let section = check_config_file(Some(&path));
        assert_eq!(section.items[0].status, Status::Fail);
    }
}
