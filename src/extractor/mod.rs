//! Page extraction capability
//!
//! Discovery never touches a browser directly. It drives a [`PageExtractor`]
//! session: open a source, advance it (scroll / load more), enumerate what is
//! currently visible, reload when progress stalls, and describe individual
//! references. [`ExtractorFactory`] hands each job its own session.
//!
//! [`webdriver`] provides the production implementation on top of the W3C
//! WebDriver protocol; tests use scripted fakes.

mod scripts;
pub mod webdriver;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{SourceLocator, VideoMetadata};

pub use webdriver::{WebDriverFactory, WebDriverSession};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("WebDriver session error: {0}")]
    Session(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Script execution failed: {0}")]
    Script(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Metadata missing for {0}")]
    MissingMetadata(String),

    #[error("No source opened")]
    NotOpened,

    #[error("WebDriver transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// One browsing session over a discovery source
#[async_trait]
pub trait PageExtractor: Send {
    /// Navigate to the source described by `locator`
    async fn open(&mut self, locator: &SourceLocator) -> Result<()>;

    /// Move the source forward, scrolling at most `max_scroll` steps
    async fn advance(&mut self, max_scroll: u32) -> Result<()>;

    /// References (or tags) currently visible, in page order
    async fn enumerate_visible(&mut self) -> Result<Vec<String>>;

    /// Recovery action after a stalled pass
    async fn recover(&mut self) -> Result<()>;

    /// Load one reference and capture its metadata
    async fn describe(&mut self, reference: &str) -> Result<VideoMetadata>;

    /// Dispose of the session. Must be safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Opens a fresh, unshared [`PageExtractor`] session per job
#[async_trait]
pub trait ExtractorFactory: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn PageExtractor>>;
}
