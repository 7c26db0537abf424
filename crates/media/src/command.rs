//! Maps a job specification to a fetcher invocation.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::spec::{JobSpecification, TargetFormat};

/// Placeholder the fetcher replaces with the real extension after execution.
pub const EXT_PLACEHOLDER: &str = "%(ext)s";

/// Default program name of the external fetcher.
pub const DEFAULT_PROGRAM: &str = "yt-dlp";

/// Bitrate used when an audio job carries no quality hint.
pub const DEFAULT_AUDIO_BITRATE: &str = "128";

/// Flags added to every invocation: single item only, safe file names,
/// resume partial downloads, never overwrite.
const COMMON_FLAGS: &[&str] = &[
    "--no-playlist",
    "--no-abort-on-error",
    "--continue",
    "--no-overwrites",
    "--restrict-filenames",
];

/// A concrete, side-effect free description of one fetcher run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Output path, possibly still containing [`EXT_PLACEHOLDER`].
    pub output_template: PathBuf,
    pub format_selector: String,
}

impl FetchCommand {
    pub fn has_ext_placeholder(&self) -> bool {
        self.output_template
            .to_string_lossy()
            .contains(EXT_PLACEHOLDER)
    }
}

/// Builds [`FetchCommand`]s rooted in a downloads directory.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    downloads_dir: PathBuf,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>, downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            downloads_dir: downloads_dir.into(),
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    pub fn build(&self, spec: &JobSpecification, job_id: &str) -> FetchCommand {
        let format = spec.target_format();
        let stem = job_stem(format, job_id);
        let file_name = match format {
            TargetFormat::Video => format!("{stem}.mp4"),
            TargetFormat::Audio | TargetFormat::Image => format!("{stem}.{EXT_PLACEHOLDER}"),
        };
        let output_template = self.downloads_dir.join(file_name);
        let format_selector = format_selector(format, spec.quality_hint());

        let mut args: Vec<String> = vec!["-f".into(), format_selector.clone()];
        match format {
            TargetFormat::Video => {
                args.extend(["--merge-output-format".into(), "mp4".into()]);
            },
            TargetFormat::Audio => {
                let bitrate = spec.quality_hint().unwrap_or(DEFAULT_AUDIO_BITRATE);
                args.extend([
                    "-x".into(),
                    "--audio-format".into(),
                    "mp3".into(),
                    "--audio-quality".into(),
                    format!("{bitrate}K"),
                ]);
            },
            TargetFormat::Image => {
                args.extend([
                    "--skip-download".into(),
                    "--ignore-no-formats-error".into(),
                    "--write-thumbnail".into(),
                    "--convert-thumbnails".into(),
                    "jpg".into(),
                ]);
            },
        }
        args.extend(COMMON_FLAGS.iter().map(|f| (*f).to_string()));
        args.extend([
            "-o".into(),
            output_template.to_string_lossy().into_owned(),
            "--".into(),
            spec.source_locator().to_string(),
        ]);

        FetchCommand {
            program: self.program.clone(),
            args,
            output_template,
            format_selector,
        }
    }
}

/// File name shared by everything one job writes, e.g. `audio_<id>`.
///
/// The fetcher's intermediates (`.part`, `.f137.mp4`, `.webm` before `-x`)
/// all start with `<stem>.`.
pub fn job_stem(format: TargetFormat, job_id: &str) -> String {
    format!("{}_{job_id}", format.file_prefix())
}

/// Format-selection expression. Every chain ends in an unconstrained `best`.
pub fn format_selector(format: TargetFormat, quality: Option<&str>) -> String {
    match (format, quality) {
        (TargetFormat::Video, Some(q)) => format!(
            "bestvideo[height<={q}][ext=mp4]+bestaudio[ext=m4a]/bestvideo[height<={q}]+bestaudio/best[height<={q}]/best"
        ),
        (TargetFormat::Video, None) => {
            "best[ext=mp4]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best".into()
        },
        // Bitrate is applied at extraction time, not at selection.
        (TargetFormat::Audio, _) => "bestaudio/best".into(),
        (TargetFormat::Image, _) => "best".into(),
    }
}
