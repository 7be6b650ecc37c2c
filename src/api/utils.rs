//! API utility functions
//!
//! Pure, stateless helpers for request checks and file serving.

use crate::api::error::ApiError;

/// Parses and validates Content-Type header for application/json
///
/// Accepts:
/// - `application/json`
/// - `application/json; charset=utf-8`
///
/// Rejects:
/// - `application/jsonp`
/// - `application/json-patch+json`
/// - `text/json`
/// - Malformed media types
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidPayload(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// True for a single path segment that cannot leave its parent directory
pub fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

/// Content type for a served video file, by extension
pub fn video_mime(filename: &str) -> mime::Mime {
    let ext = filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4") => "video/mp4".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        Some("webm") => "video/webm".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type_valid() {
        assert!(parse_content_type("application/json").is_ok());
        assert!(parse_content_type("application/json; charset=utf-8").is_ok());
        assert!(parse_content_type("application/json; charset=UTF-8").is_ok());
    }

    #[test]
    fn test_parse_content_type_invalid() {
        assert!(parse_content_type("application/jsonp").is_err());
        assert!(parse_content_type("application/json-patch+json").is_err());
        assert!(parse_content_type("text/json").is_err());
        assert!(parse_content_type("text/plain").is_err());
        assert!(parse_content_type("invalid").is_err());
        assert!(parse_content_type("").is_err());
    }

    #[test]
    fn test_plain_segments() {
        assert!(is_plain_segment("cats_hashtag_videos"));
        assert!(is_plain_segment("tiktok_nfl_1.mp4"));
        assert!(!is_plain_segment(".."));
        assert!(!is_plain_segment("."));
        assert!(!is_plain_segment(""));
        assert!(!is_plain_segment("../secret"));
        assert!(!is_plain_segment("a\\b"));
    }

    #[test]
    fn test_video_mime() {
        assert_eq!(video_mime("clip.mp4").essence_str(), "video/mp4");
        assert_eq!(video_mime("clip.MP4").essence_str(), "video/mp4");
        assert_eq!(video_mime("notes.txt"), mime::APPLICATION_OCTET_STREAM);
    }
}
