//! YouTube video id extraction.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#]+)")
        .expect("valid regex")
});

static BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("valid regex"));

/// Whether `id` has the shape of a video id (11 of `[a-zA-Z0-9_-]`).
pub fn is_valid_video_id(id: &str) -> bool {
    BARE_ID.is_match(id)
}

/// Pull the video id out of a watch, short or embed URL, or accept a bare id.
pub fn extract_video_id(input: &str) -> Result<String> {
    let input = input.trim();

    if let Some(id) = URL_PATTERN.captures(input).and_then(|caps| caps.get(1)) {
        return Ok(id.as_str().to_string());
    }

    if is_valid_video_id(input) {
        return Ok(input.to_string());
    }

    Err(Error::Validation(format!(
        "invalid YouTube URL or video ID: {}",
        input
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_urls() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/embed/dQw4w9WgXcQ#frag",
            "dQw4w9WgXcQ",
            "  dQw4w9WgXcQ\n",
        ] {
            assert_eq!(extract_video_id(url).unwrap(), "dQw4w9WgXcQ", "{}", url);
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(extract_video_id("https://vimeo.com/12345").is_err());
        assert!(extract_video_id("short").is_err());
        assert!(extract_video_id("").is_err());
        assert!(!is_valid_video_id("dQw4w9WgXcQ!"));
    }
}
