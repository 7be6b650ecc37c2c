//! Request and response bodies of the HTTP API
//!
//! A job is submitted with:
//!
//! ```json
//! { "search_type": "hashtag", "search_query": "#cats", "max_videos": 10 }
//! ```
//!
//! `search_type` is one of `hashtag`, `userid`, `trending` or `topic`. For
//! `topic` the query is a topic index: `0` collects popular videos, `n > 0`
//! collects the hashtags of topic option `n - 1`. The response carries the
//! task id to poll on `GET /get-status/?id=<id>`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::observability::MetricsSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub search_type: String,
    #[serde(default)]
    pub search_query: String,
    pub max_videos: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
