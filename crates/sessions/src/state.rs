//! Per-chat conversation state machine.

use {
    mediaferry_channels::ChatEvent,
    mediaferry_media::{JobSpecification, TargetFormat},
    serde::Serialize,
    uuid::Uuid,
};

/// Video height tiers offered in chat.
pub const VIDEO_TIERS: [&str; 3] = ["1080", "720", "320"];

/// Audio bitrate tiers (kbps) offered in chat.
pub const AUDIO_TIERS: [&str; 3] = ["128", "192", "320"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingUrl,
    AwaitingFormat,
    AwaitingQuality,
    Processing,
}

/// Quality tiers for `format`; empty for formats without a quality step.
pub fn quality_tiers(format: TargetFormat) -> &'static [&'static str] {
    match format {
        TargetFormat::Video => &VIDEO_TIERS,
        TargetFormat::Audio => &AUDIO_TIERS,
        TargetFormat::Image => &[],
    }
}

/// Callback data of the format buttons, e.g. `format_mp4`.
pub fn format_choice_data(format: TargetFormat) -> String {
    format!("format_{}", format.wire_name())
}

/// Callback data of a quality button, e.g. `mp3_192`.
pub fn quality_choice_data(format: TargetFormat, tier: &str) -> String {
    format!("{}_{tier}", format.wire_name())
}

/// A parsed inline-button selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Format(TargetFormat),
    Quality(TargetFormat, String),
}

impl Selection {
    /// Parse callback data. Unknown data and off-menu tiers yield `None`.
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(name) = data.strip_prefix("format_") {
            return TargetFormat::ALL
                .into_iter()
                .find(|f| f.wire_name() == name)
                .map(Self::Format);
        }
        let (name, tier) = data.split_once('_')?;
        let format = TargetFormat::ALL
            .into_iter()
            .find(|f| f.wire_name() == name)?;
        quality_tiers(format)
            .contains(&tier)
            .then(|| Self::Quality(format, tier.to_string()))
    }
}

/// What the conversation layer should do after an event was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Ask for a source locator.
    PromptUrl,
    /// Offer the format choices.
    PromptFormat,
    /// Offer the quality tiers of this format.
    PromptQuality(TargetFormat),
    /// Run the job; `generation` identifies the session that owns it.
    Submit {
        spec: JobSpecification,
        generation: Uuid,
    },
    /// The accumulated input cannot form a job; the session is discarded.
    Rejected { reason: String },
    /// The event did not match the current state.
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Changes on every restart, so work started by an earlier incarnation
    /// can tell it no longer owns the session.
    pub generation: Uuid,
    pub state: SessionState,
    pub pending_url: Option<String>,
    pub pending_format: Option<TargetFormat>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            generation: Uuid::new_v4(),
            state: SessionState::Idle,
            pending_url: None,
            pending_format: None,
        }
    }

    /// Apply one event.
    pub fn advance(&mut self, event: &ChatEvent) -> Transition {
        match (self.state, event) {
            (_, ChatEvent::Start) => {
                *self = Self::new();
                self.state = SessionState::AwaitingUrl;
                Transition::PromptUrl
            },
            (SessionState::AwaitingUrl, ChatEvent::Text(text)) => {
                self.pending_url = Some(text.clone());
                self.state = SessionState::AwaitingFormat;
                Transition::PromptFormat
            },
            (SessionState::AwaitingFormat, ChatEvent::Selection(data)) => {
                match Selection::parse(data) {
                    Some(Selection::Format(TargetFormat::Image)) => {
                        self.pending_format = Some(TargetFormat::Image);
                        self.submit(None)
                    },
                    Some(Selection::Format(format)) => {
                        self.pending_format = Some(format);
                        self.state = SessionState::AwaitingQuality;
                        Transition::PromptQuality(format)
                    },
                    _ => Transition::Ignored,
                }
            },
            (SessionState::AwaitingQuality, ChatEvent::Selection(data)) => {
                match Selection::parse(data) {
                    Some(Selection::Quality(format, tier))
                        if Some(format) == self.pending_format =>
                    {
                        self.submit(Some(&tier))
                    },
                    _ => Transition::Ignored,
                }
            },
            _ => Transition::Ignored,
        }
    }

    fn submit(&mut self, quality: Option<&str>) -> Transition {
        let (Some(url), Some(format)) = (self.pending_url.as_deref(), self.pending_format) else {
            return Transition::Ignored;
        };
        match JobSpecification::with_format(url, format, quality) {
            Ok(spec) => {
                self.state = SessionState::Processing;
                Transition::Submit {
                    spec,
                    generation: self.generation,
                }
            },
            Err(e) => {
                self.state = SessionState::Idle;
                Transition::Rejected {
                    reason: e.public_message(),
                }
            },
        }
    }
}
