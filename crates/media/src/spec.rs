//! Job specification and input validation.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Output kind requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFormat {
    Video,
    Audio,
    Image,
}

impl TargetFormat {
    pub const ALL: [Self; 3] = [Self::Video, Self::Audio, Self::Image];

    /// Name used on the wire and in chat callback data.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Audio => "mp3",
            Self::Image => "image",
        }
    }

    /// Prefix of the artifact file name.
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
        }
    }

    /// Extension of the finished artifact.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Video => "mp4",
            Self::Audio => "mp3",
            Self::Image => "jpg",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for TargetFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" | "video" => Ok(Self::Video),
            "mp3" | "audio" => Ok(Self::Audio),
            "image" => Ok(Self::Image),
            _ => Err(Error::InvalidFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// A validated (locator, format, quality) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSpecification {
    source_locator: String,
    target_format: TargetFormat,
    quality_hint: Option<String>,
}

impl JobSpecification {
    /// Validate raw caller input.
    ///
    /// The format is checked first, so `{url: "", format: "gif"}` reports the
    /// format. The locator is not checked for a URL scheme; the fetcher
    /// reports unusable locators itself.
    pub fn new(
        source_locator: impl AsRef<str>,
        target_format: impl AsRef<str>,
        quality_hint: Option<&str>,
    ) -> Result<Self> {
        let target_format = target_format.as_ref().parse::<TargetFormat>()?;
        Self::with_format(source_locator, target_format, quality_hint)
    }

    /// Validate with an already-typed format.
    pub fn with_format(
        source_locator: impl AsRef<str>,
        target_format: TargetFormat,
        quality_hint: Option<&str>,
    ) -> Result<Self> {
        let source_locator = source_locator.as_ref().trim();
        if source_locator.is_empty() {
            return Err(Error::invalid_request("url must not be empty"));
        }
        let quality_hint = normalize_quality(quality_hint)?;

        Ok(Self {
            source_locator: source_locator.to_string(),
            target_format,
            quality_hint,
        })
    }

    pub fn source_locator(&self) -> &str {
        &self.source_locator
    }

    pub fn target_format(&self) -> TargetFormat {
        self.target_format
    }

    pub fn quality_hint(&self) -> Option<&str> {
        self.quality_hint.as_deref()
    }
}

/// Strip one unit suffix (`720p`, `192k`) and require a positive integer.
fn normalize_quality(raw: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = raw.map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(None);
    };
    let digits = raw
        .strip_suffix(['p', 'P', 'k', 'K'])
        .unwrap_or(raw)
        .trim();
    match digits.parse::<u32>() {
        Ok(n) if n > 0 && digits.bytes().all(|b| b.is_ascii_digit()) => Ok(Some(n.to_string())),
        _ => Err(Error::invalid_request(format!(
            "invalid quality {raw:?}: expected a number such as 720 or 192"
        ))),
    }
}
