//! Tunnel resolution: turn a source reference into a direct download URL
//!
//! A resolver answers with a [`Tunnel`], asks the caller to come back later
//! ([`ResolveOutcome::RateLimited`]), or fails for good. Waiting and retrying
//! is the download pipeline's job.

mod cobalt;

pub use cobalt::CobaltResolver;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Resolver rejected {reference}: HTTP {status}: {body}")]
    Rejected {
        reference: String,
        status: u16,
        body: String,
    },

    #[error("Malformed resolver response: {0}")]
    MalformedResponse(String),

    #[error("Resolver request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// A direct, time-limited download location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tunnel {
    pub url: String,
    /// Filename suggested by the resolver. Not trusted as a path.
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Ready(Tunnel),
    RateLimited,
}

#[async_trait]
pub trait TunnelResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<ResolveOutcome>;
}
