use std::path::Path;

/// Content type for an artifact, derived from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" | "opus" => "audio/ogg",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(content_type_for(Path::new("video_x.mp4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("audio_x.MP3")), "audio/mpeg");
        assert_eq!(content_type_for(Path::new("image_x.jpg")), "image/jpeg");
    }

    #[test]
    fn unknown_falls_back_to_octet_stream() {
        assert_eq!(
            content_type_for(Path::new("blob")),
            "application/octet-stream"
        );
        assert_eq!(
            content_type_for(Path::new("x.part")),
            "application/octet-stream"
        );
    }
}
