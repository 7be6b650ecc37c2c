//! W3C WebDriver implementation of [`PageExtractor`]
//!
//! Talks JSON over HTTP to a chromedriver-compatible endpoint. Only the handful
//! of commands discovery needs are implemented: new session, navigate,
//! refresh, execute script and delete session.

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::scripts;
use super::{ExtractError, ExtractorFactory, PageExtractor, Result};
use crate::config::ExtractorConfig;
use crate::pacing::Pacing;
use crate::types::{SourceLocator, VideoMetadata};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Opens one browser session per job against a WebDriver endpoint
#[derive(Clone)]
pub struct WebDriverFactory {
    client: Client,
    config: ExtractorConfig,
}

impl WebDriverFactory {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.page_timeout.as_duration() * 6)
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ExtractorFactory for WebDriverFactory {
    async fn open_session(&self) -> Result<Box<dyn PageExtractor>> {
        let session = WebDriverSession::start(self.client.clone(), self.config.clone()).await?;
        Ok(Box::new(session))
    }
}

#[derive(Debug, Deserialize)]
struct EmbedCard {
    song: Option<String>,
    userid: Option<String>,
    #[serde(default)]
    stats: Vec<String>,
}

/// A live browser session
pub struct WebDriverSession {
    client: Client,
    config: ExtractorConfig,
    session_id: Option<String>,
    locator: Option<SourceLocator>,
}

impl WebDriverSession {
    /// Create a new browser session
    pub async fn start(client: Client, config: ExtractorConfig) -> Result<Self> {
        let mut args = vec!["--disable-notifications".to_string()];
        if config.headless {
            args.push("--headless=new".to_string());
        }
        if let Some(dir) = &config.user_data_dir {
            args.push(format!("--user-data-dir={}", dir.display()));
        }

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let url = format!("{}/session", config.webdriver_url.trim_end_matches('/'));
        let value = send(&client, Method::POST, &url, Some(capabilities)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ExtractError::Session("response carried no sessionId".into()))?
            .to_string();

        info!(session_id = %session_id, "WebDriver session started");

        Ok(Self {
            client,
            config,
            session_id: Some(session_id),
            locator: None,
        })
    }

    fn endpoint(&self, command: &str) -> Result<String> {
        let session_id = self
            .session_id
            .as_deref()
            .ok_or_else(|| ExtractError::Session("session already closed".into()))?;
        Ok(format!(
            "{}/session/{}{}",
            self.config.webdriver_url.trim_end_matches('/'),
            session_id,
            command
        ))
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let url = self.endpoint("/execute/sync")?;
        send(
            &self.client,
            Method::POST,
            &url,
            Some(json!({ "script": script, "args": args })),
        )
        .await
        .map_err(|err| match err {
            ExtractError::Session(msg) => ExtractError::Script(msg),
            other => other,
        })
    }

    async fn navigate(&self, target: &str) -> Result<()> {
        let url = self.endpoint("/url")?;
        send(&self.client, Method::POST, &url, Some(json!({ "url": target })))
            .await
            .map_err(|err| ExtractError::Navigation {
                url: target.to_string(),
                reason: err.to_string(),
            })?;
        self.wait_ready(target).await
    }

    /// Poll `document.readyState` until the page reports `complete`
    async fn wait_ready(&self, what: &str) -> Result<()> {
        let deadline = Instant::now() + self.config.page_timeout.as_duration();
        loop {
            let state = self.execute(scripts::READY_STATE, vec![]).await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ExtractError::Timeout(format!("{what} to load")));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Re-apply the topic filter of a hashtag listing; a reload resets it
    async fn select_topic(&self) -> Result<()> {
        if let Some(SourceLocator::HashtagListing { option_index }) = &self.locator {
            self.execute(scripts::SELECT_TOPIC, vec![json!(option_index)])
                .await?;
            debug!(option_index, "Topic selected");
        }
        Ok(())
    }

    fn source_url(&self, locator: &SourceLocator) -> String {
        match locator {
            SourceLocator::Listing(path) => {
                format!("{}/{}", self.config.site_url.trim_end_matches('/'), path)
            }
            SourceLocator::PopularVideos => self.config.popular_url.clone(),
            SourceLocator::HashtagListing { .. } => self.config.hashtags_url.clone(),
        }
    }

    async fn scroll(&self, max_scroll: u32, step: std::ops::RangeInclusive<u64>) -> Result<()> {
        let pause = Pacing::new(self.config.scroll_pause, self.config.scroll_jitter);
        let mut height = self.execute(scripts::SCROLL_HEIGHT, vec![]).await?.as_u64().unwrap_or(0);
        let mut position = 0u64;
        let mut count = 0;

        while position < height && count < max_scroll {
            position += rand::thread_rng().gen_range(step.clone());
            self.execute(scripts::SCROLL_TO, vec![json!(position)]).await?;
            debug!(position, "Scrolled");
            tokio::time::sleep(pause.sample()).await;
            height = self.execute(scripts::SCROLL_HEIGHT, vec![]).await?.as_u64().unwrap_or(0);
            count += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl PageExtractor for WebDriverSession {
    async fn open(&mut self, locator: &SourceLocator) -> Result<()> {
        let url = self.source_url(locator);
        info!(url = %url, "Opening discovery source");
        self.navigate(&url).await?;

        self.locator = Some(locator.clone());
        self.select_topic().await
    }

    async fn advance(&mut self, max_scroll: u32) -> Result<()> {
        let locator = self.locator.clone().ok_or(ExtractError::NotOpened)?;
        self.wait_ready("page").await?;
        tokio::time::sleep(self.config.settle_delay.as_duration()).await;

        match locator {
            SourceLocator::Listing(_) => self.scroll(max_scroll, 300..=800).await,
            SourceLocator::PopularVideos => {
                self.scroll(max_scroll, 300..=800).await?;
                self.execute(scripts::VIEW_MORE, vec![]).await.map(|_| ())
            }
            SourceLocator::HashtagListing { .. } => {
                self.scroll(max_scroll, 200..=400).await?;
                self.execute(scripts::VIEW_MORE, vec![]).await.map(|_| ())
            }
        }
    }

    async fn enumerate_visible(&mut self) -> Result<Vec<String>> {
        let script = match self.locator.as_ref().ok_or(ExtractError::NotOpened)? {
            SourceLocator::Listing(_) => scripts::VIDEO_LINKS,
            SourceLocator::PopularVideos => scripts::EMBED_FRAMES,
            SourceLocator::HashtagListing { .. } => scripts::HASHTAG_CARDS,
        };

        let value = self.execute(script, vec![]).await?;
        let items: Vec<String> = serde_json::from_value(value)
            .map_err(|e| ExtractError::Script(format!("unexpected enumeration result: {e}")))?;
        Ok(items)
    }

    async fn recover(&mut self) -> Result<()> {
        let url = self.endpoint("/refresh")?;
        send(&self.client, Method::POST, &url, Some(json!({}))).await?;
        self.wait_ready("reload").await?;
        self.select_topic().await?;
        info!("Page refreshed");
        Ok(())
    }

    async fn describe(&mut self, reference: &str) -> Result<VideoMetadata> {
        let video_id = video_id(reference)
            .ok_or_else(|| ExtractError::MissingMetadata(reference.to_string()))?;
        let site = self.config.site_url.trim_end_matches('/').to_string();

        self.navigate(&format!("{site}/embed/v2/{video_id}")).await?;

        let value = self.execute(scripts::EMBED_CARD, vec![]).await?;
        let card: EmbedCard = serde_json::from_value(value)
            .map_err(|e| ExtractError::Script(format!("unexpected embed card: {e}")))?;

        let (Some(author), Some(music_label)) = (card.userid, card.song) else {
            return Err(ExtractError::MissingMetadata(reference.to_string()));
        };
        let stat = |i: usize| card.stats.get(i).cloned().unwrap_or_else(|| "0".to_string());

        Ok(VideoMetadata {
            canonical_reference: format!("{site}/{author}/video/{video_id}"),
            like_count: stat(0),
            comment_count: stat(1),
            share_count: stat(2),
            author,
            music_label,
        })
    }

    async fn close(&mut self) -> Result<()> {
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };
        let url = format!(
            "{}/session/{}",
            self.config.webdriver_url.trim_end_matches('/'),
            session_id
        );
        send(&self.client, Method::DELETE, &url, None).await?;
        info!(session_id = %session_id, "WebDriver session closed");
        Ok(())
    }
}

/// Last path segment of a reference URL, without query string
fn video_id(reference: &str) -> Option<&str> {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
}

/// Issue one WebDriver command and unwrap its `value`
async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let payload: Value = response.json().await.unwrap_or(Value::Null);
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| value.get("error").and_then(Value::as_str))
            .unwrap_or("unknown error");
        warn!(url, status = status.as_u16(), reason = message, "WebDriver command failed");
        return Err(ExtractError::Session(format!("HTTP {}: {}", status.as_u16(), message)));
    }

    Ok(value)
}
