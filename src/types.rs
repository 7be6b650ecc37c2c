//! Core domain types shared by discovery, download and status reporting

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Marker reported in place of a local path when a download permanently failed.
///
/// The misspelling is part of the wire contract existing clients match on.
pub const INVALID_PATH_SENTINEL: &str = "__invalide__";

/// Where a discovered video ended up on disk
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocalPath {
    /// Not processed by the download stage yet
    #[default]
    Pending,
    /// Saved under the given path (relative to the working directory)
    Saved(PathBuf),
    /// Download failed permanently
    Invalid,
}

impl LocalPath {
    pub fn is_saved(&self) -> bool {
        matches!(self, LocalPath::Saved(_))
    }

    /// URL path clients use to fetch the file, e.g. `/videos/cats_hashtag_videos/a.mp4`
    ///
    /// Only the job folder and file name are kept, under the `/videos` route.
    /// Each segment is percent-encoded, so `#cats_hashtag_videos` is reported
    /// as `%23cats_hashtag_videos`.
    pub fn to_url_path(&self) -> Option<String> {
        match self {
            LocalPath::Saved(path) => {
                let mut tail: Vec<String> = path
                    .components()
                    .rev()
                    .filter_map(|c| match c {
                        std::path::Component::Normal(s) => {
                            Some(urlencoding::encode(&s.to_string_lossy()).into_owned())
                        }
                        _ => None,
                    })
                    .take(2)
                    .collect();
                tail.push("videos".to_string());
                tail.reverse();
                Some(format!("/{}", tail.join("/")))
            }
            LocalPath::Invalid => Some(INVALID_PATH_SENTINEL.to_string()),
            LocalPath::Pending => None,
        }
    }
}

impl Serialize for LocalPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_url_path() {
            Some(path) => serializer.serialize_str(&path),
            None => serializer.serialize_none(),
        }
    }
}

/// Descriptive metadata captured for a reference while its page is open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    /// Canonical URL of the item, built from the author handle and the video id
    pub canonical_reference: String,
    pub author: String,
    pub music_label: String,
    pub like_count: String,
    pub comment_count: String,
    pub share_count: String,
}

/// A discovered video plus its download outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRecord {
    #[serde(rename = "video")]
    pub local_path: LocalPath,
    #[serde(rename = "videotiktok")]
    pub source_reference: String,
    #[serde(rename = "song")]
    pub music_label: String,
    #[serde(rename = "userid")]
    pub author: String,
    pub like_count: String,
    pub comment_count: String,
    pub share_count: String,
}

impl VideoRecord {
    pub fn from_metadata(metadata: VideoMetadata) -> Self {
        Self {
            local_path: LocalPath::Pending,
            source_reference: metadata.canonical_reference,
            music_label: metadata.music_label,
            author: metadata.author,
            like_count: metadata.like_count,
            comment_count: metadata.comment_count,
            share_count: metadata.share_count,
        }
    }

    /// Record for a bare reference, used where no metadata is available
    pub fn bare(source_reference: impl Into<String>) -> Self {
        Self {
            local_path: LocalPath::Pending,
            source_reference: source_reference.into(),
            music_label: String::new(),
            author: String::new(),
            like_count: String::new(),
            comment_count: String::new(),
            share_count: String::new(),
        }
    }
}

/// The kind of search a job performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Hashtag,
    User,
    Trending,
    Topic,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Hashtag => "hashtag",
            SearchKind::User => "userid",
            SearchKind::Trending => "trending",
            SearchKind::Topic => "topic",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSearchKind(pub String);

impl FromStr for SearchKind {
    type Err = UnknownSearchKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hashtag" => Ok(SearchKind::Hashtag),
            "userid" => Ok(SearchKind::User),
            "trending" => Ok(SearchKind::Trending),
            "topic" => Ok(SearchKind::Topic),
            other => Err(UnknownSearchKind(other.to_string())),
        }
    }
}

/// Where discovery starts browsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// A site path such as `tag/cats`, `@someone` or `channel/trending-now`
    Listing(String),
    /// The curated popular-videos page
    PopularVideos,
    /// The popular-hashtags page filtered to one topic option
    HashtagListing { option_index: u32 },
}

impl SourceLocator {
    pub fn hashtag(query: &str) -> Self {
        SourceLocator::Listing(format!("tag/{}", query.replace('#', "").trim()))
    }

    pub fn profile(query: &str) -> Self {
        SourceLocator::Listing(format!("@{}", query.replace('@', "").trim()))
    }

    pub fn trending() -> Self {
        SourceLocator::Listing("channel/trending-now".to_string())
    }

    /// True when the locator yields tags instead of videos
    pub fn yields_tags(&self) -> bool {
        matches!(self, SourceLocator::HashtagListing { .. })
    }
}

/// Directory a job downloads into: `<root>/<query>_<kind>_videos`
pub fn job_folder(root: &Path, search_query: &str, search_type: &str) -> PathBuf {
    // The suffix keeps a bare ".." from escaping the root.
    let safe_query = search_query.replace(['/', '\\'], "_");
    root.join(format!("{}_{}_videos", safe_query, search_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_kind_parsing() {
        assert_eq!("hashtag".parse::<SearchKind>(), Ok(SearchKind::Hashtag));
        assert_eq!("userid".parse::<SearchKind>(), Ok(SearchKind::User));
        assert_eq!("trending".parse::<SearchKind>(), Ok(SearchKind::Trending));
        assert_eq!("topic".parse::<SearchKind>(), Ok(SearchKind::Topic));
        assert!("user".parse::<SearchKind>().is_err());
        assert!("Hashtag".parse::<SearchKind>().is_err());
    }

    #[test]
    fn test_locators_normalize_queries() {
        assert_eq!(
            SourceLocator::hashtag("#cats "),
            SourceLocator::Listing("tag/cats".to_string())
        );
        assert_eq!(
            SourceLocator::profile("@@nasa"),
            SourceLocator::Listing("@nasa".to_string())
        );
        assert_eq!(
            SourceLocator::profile("nasa"),
            SourceLocator::Listing("@nasa".to_string())
        );
        assert!(SourceLocator::HashtagListing { option_index: 2 }.yields_tags());
        assert!(!SourceLocator::trending().yields_tags());
    }

    #[test]
    fn test_job_folder_follows_naming_convention() {
        let root = Path::new("videos");
        assert_eq!(
            job_folder(root, "cats", "hashtag"),
            PathBuf::from("videos/cats_hashtag_videos")
        );
        assert_eq!(
            job_folder(root, "", "trending"),
            PathBuf::from("videos/_trending_videos")
        );
        assert_eq!(
            job_folder(root, "../etc", "userid"),
            PathBuf::from("videos/.._etc_userid_videos")
        );
    }

    #[test]
    fn test_video_record_wire_format() {
        let mut record = VideoRecord::from_metadata(VideoMetadata {
            canonical_reference: "https://www.tiktok.com/@nfl/video/1".to_string(),
            author: "@nfl".to_string(),
            music_label: "original sound - NFL".to_string(),
            like_count: "10.3M".to_string(),
            comment_count: "67.4K".to_string(),
            share_count: "441.8K".to_string(),
        });

        assert_eq!(serde_json::to_value(&record).unwrap()["video"], json!(null));

        record.local_path = LocalPath::Saved(PathBuf::from("videos/0_topic_videos/nfl_1.mp4"));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["video"], json!("/videos/0_topic_videos/nfl_1.mp4"));
        assert_eq!(value["videotiktok"], json!("https://www.tiktok.com/@nfl/video/1"));
        assert_eq!(value["song"], json!("original sound - NFL"));
        assert_eq!(value["userid"], json!("@nfl"));
        assert_eq!(value["like_count"], json!("10.3M"));

        record.local_path = LocalPath::Saved(PathBuf::from("/srv/data/clips/cats_hashtag_videos/a.mp4"));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["video"], json!("/videos/cats_hashtag_videos/a.mp4"));

        record.local_path = LocalPath::Saved(
            job_folder(Path::new("videos"), "#cats ?", "hashtag").join("a b.mp4"),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["video"], json!("/videos/%23cats%20%3F_hashtag_videos/a%20b.mp4"));

        record.local_path = LocalPath::Invalid;
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["video"], json!(INVALID_PATH_SENTINEL));
    }
}
