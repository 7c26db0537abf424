//! User-facing texts and inline keyboards.

use {
    mediaferry_channels::Choice,
    mediaferry_media::TargetFormat,
    mediaferry_sessions::{format_choice_data, quality_choice_data, quality_tiers},
};

pub const START_PROMPT: &str = "Welcome! Send me a YouTube/Instagram/TikTok URL to download:";
pub const FORMAT_PROMPT: &str = "Choose format:";
pub const PLEASE_WAIT: &str = "⏳ Please wait, downloading and converting your file... This may take several minutes for long videos.";
pub const UPLOADING: &str = "📤 File converted successfully! Now uploading to Telegram...";
pub const DONE: &str =
    "✅ Done! Your file has been sent and temporary files have been cleaned up.";

pub fn quality_prompt(format: TargetFormat) -> String {
    format!("Choose {} quality:", format.wire_name().to_ascii_uppercase())
}

pub fn conversion_error(reason: &str) -> String {
    format!("❌ Conversion error: {reason}")
}

pub fn transfer_error(reason: &str) -> String {
    format!("❌ Failed to send file: {reason}")
}

fn format_label(format: TargetFormat) -> &'static str {
    match format {
        TargetFormat::Video => "🎥 MP4 (Video)",
        TargetFormat::Audio => "🎵 MP3 (Audio)",
        TargetFormat::Image => "📷 Image",
    }
}

pub fn format_choices() -> Vec<Choice> {
    TargetFormat::ALL
        .into_iter()
        .map(|f| Choice::new(format_label(f), format_choice_data(f)))
        .collect()
}

pub fn quality_choices(format: TargetFormat) -> Vec<Choice> {
    let unit = match format {
        TargetFormat::Audio => "k",
        TargetFormat::Video | TargetFormat::Image => "p",
    };
    quality_tiers(format)
        .iter()
        .map(|tier| Choice::new(format!("{tier}{unit}"), quality_choice_data(format, tier)))
        .collect()
}
