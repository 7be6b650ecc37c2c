//! Discovery: grow a duplicate-free list of references from a live page
//!
//! ```text
//! ┌─────────┐   ┌───────────┐   new refs?   ┌───────────┐
//! │ advance │──▶│ enumerate │──── yes ─────▶│  append   │──▶ target? ──▶ done
//! └─────────┘   └───────────┘               └───────────┘
//!      ▲              │ no                        │ batch full
//!      │        stall += 1 ──▶ stall == max ──▶ partial result
//!      │              │                           ▼
//!      └── recover ◀──┘                      batch pause
//! ```
//!
//! The controller owns all pacing. The extractor only knows how to move and
//! read the page.

mod controller;
mod enrich;

pub use controller::{DiscoveryController, DiscoveryPolicy};
pub use enrich::enrich;

use thiserror::Error;

use crate::extractor::ExtractError;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("{0}")]
    Extractor(#[from] ExtractError),

    #[error("cancelled")]
    Cancelled,

    #[error("Target count must be at least 1, got {0}")]
    InvalidTarget(usize),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Run an extractor call, giving up as soon as `cancel` fires
pub(crate) async fn guarded<T, F>(
    cancel: &tokio_util::sync::CancellationToken,
    call: F,
) -> Result<T>
where
    F: std::future::Future<Output = std::result::Result<T, ExtractError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DiscoveryError::Cancelled),
        result = call => result.map_err(DiscoveryError::from),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted extractor shared by discovery tests

    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use crate::extractor::{ExtractError, PageExtractor, Result};
    use crate::types::{SourceLocator, VideoMetadata};

    #[derive(Debug, Default)]
    pub struct Calls {
        pub advance: usize,
        pub recover: usize,
        pub describe: usize,
        pub close: usize,
    }

    /// Returns one scripted page snapshot per `enumerate_visible` call and
    /// repeats the last one when the script runs out.
    pub struct ScriptedExtractor {
        pub pages: VecDeque<Vec<String>>,
        pub last: Vec<String>,
        pub failing: Vec<String>,
        pub fail_advance_at: Option<usize>,
        pub calls: Arc<Mutex<Calls>>,
        pub metadata: HashMap<String, VideoMetadata>,
    }

    impl ScriptedExtractor {
        pub fn new(pages: Vec<Vec<&str>>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|p| p.into_iter().map(String::from).collect())
                    .collect(),
                last: Vec::new(),
                failing: Vec::new(),
                fail_advance_at: None,
                calls: Arc::new(Mutex::new(Calls::default())),
                metadata: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl PageExtractor for ScriptedExtractor {
        async fn open(&mut self, _locator: &SourceLocator) -> Result<()> {
            Ok(())
        }

        async fn advance(&mut self, _max_scroll: u32) -> Result<()> {
            let mut calls = self.calls.lock().unwrap();
            calls.advance += 1;
            if Some(calls.advance) == self.fail_advance_at {
                return Err(ExtractError::Script("page crashed".into()));
            }
            Ok(())
        }

        async fn enumerate_visible(&mut self) -> Result<Vec<String>> {
            if let Some(page) = self.pages.pop_front() {
                self.last = page;
            }
            Ok(self.last.clone())
        }

        async fn recover(&mut self) -> Result<()> {
            self.calls.lock().unwrap().recover += 1;
            Ok(())
        }

        async fn describe(&mut self, reference: &str) -> Result<VideoMetadata> {
            self.calls.lock().unwrap().describe += 1;
            if self.failing.iter().any(|f| f == reference) {
                return Err(ExtractError::MissingMetadata(reference.to_string()));
            }
            Ok(self
                .metadata
                .get(reference)
                .cloned()
                .unwrap_or_else(|| VideoMetadata {
                    canonical_reference: reference.to_string(),
                    author: "@someone".to_string(),
                    music_label: "original sound".to_string(),
                    like_count: "1".to_string(),
                    comment_count: "2".to_string(),
                    share_count: "3".to_string(),
                }))
        }

        async fn close(&mut self) -> Result<()> {
            self.calls.lock().unwrap().close += 1;
            Ok(())
        }
    }
}
