use crate::humanize::{ByteSize, HumanDuration};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Root of the `<query>_<kind>_videos` folders, also served over HTTP
    #[serde(default = "default_videos_dir")]
    pub videos_dir: PathBuf,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            videos_dir: default_videos_dir(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_videos_dir() -> PathBuf {
    PathBuf::from("videos")
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize(64 * 1024)
}

/// Discovery loop policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Consecutive passes without a new reference before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// New references between politeness pauses
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_pause")]
    pub batch_pause: HumanDuration,
    #[serde(default = "default_batch_pause")]
    pub batch_pause_jitter: HumanDuration,
    #[serde(default = "default_stall_delay")]
    pub stall_delay: HumanDuration,
    #[serde(default = "default_stall_jitter")]
    pub stall_jitter: HumanDuration,
    #[serde(default = "default_max_scroll_per_pass")]
    pub max_scroll_per_pass: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            batch_size: default_batch_size(),
            batch_pause: default_batch_pause(),
            batch_pause_jitter: default_batch_pause(),
            stall_delay: default_stall_delay(),
            stall_jitter: default_stall_jitter(),
            max_scroll_per_pass: default_max_scroll_per_pass(),
        }
    }
}

fn default_max_retries() -> u32 {
    10
}

fn default_batch_size() -> usize {
    50
}

fn default_batch_pause() -> HumanDuration {
    HumanDuration::from_secs(5)
}

fn default_stall_delay() -> HumanDuration {
    HumanDuration::from_secs(2)
}

fn default_stall_jitter() -> HumanDuration {
    HumanDuration::from_secs(3)
}

fn default_max_scroll_per_pass() -> u32 {
    4
}

/// Tunnel resolver service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    #[serde(default = "default_resolver_url")]
    pub base_url: String,
    /// Fixed wait after a rate-limited answer
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay: HumanDuration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: default_resolver_url(),
            rate_limit_delay: default_rate_limit_delay(),
        }
    }
}

fn default_resolver_url() -> String {
    "http://cobalt-api:9000/".to_string()
}

fn default_rate_limit_delay() -> HumanDuration {
    HumanDuration::from_secs(10)
}

/// HTTP client used by the resolver and for tunnel downloads
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_request_timeout() -> HumanDuration {
    HumanDuration::from_secs(300)
}

fn default_user_agent() -> String {
    format!("clipscout/{}", env!("CARGO_PKG_VERSION"))
}

/// WebDriver-backed page extractor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_popular_url")]
    pub popular_url: String,
    #[serde(default = "default_hashtags_url")]
    pub hashtags_url: String,
    #[serde(default = "default_page_timeout")]
    pub page_timeout: HumanDuration,
    /// Settle time after a page becomes ready, before scrolling
    #[serde(default = "default_settle_delay")]
    pub settle_delay: HumanDuration,
    #[serde(default = "default_scroll_pause")]
    pub scroll_pause: HumanDuration,
    #[serde(default = "default_scroll_jitter")]
    pub scroll_jitter: HumanDuration,
    #[serde(default)]
    pub headless: bool,
    /// Optional browser profile directory (`--user-data-dir`)
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            site_url: default_site_url(),
            popular_url: default_popular_url(),
            hashtags_url: default_hashtags_url(),
            page_timeout: default_page_timeout(),
            settle_delay: default_settle_delay(),
            scroll_pause: default_scroll_pause(),
            scroll_jitter: default_scroll_jitter(),
            headless: false,
            user_data_dir: None,
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_site_url() -> String {
    "https://www.tiktok.com".to_string()
}

fn default_popular_url() -> String {
    "https://ads.tiktok.com/business/creativecenter/inspiration/popular/pc/en".to_string()
}

fn default_hashtags_url() -> String {
    "https://ads.tiktok.com/business/creativecenter/inspiration/popular/hashtag/pc/en".to_string()
}

fn default_page_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_settle_delay() -> HumanDuration {
    HumanDuration::from_secs(3)
}

fn default_scroll_pause() -> HumanDuration {
    HumanDuration::from_secs(1)
}

fn default_scroll_jitter() -> HumanDuration {
    HumanDuration::from_secs(2)
}
