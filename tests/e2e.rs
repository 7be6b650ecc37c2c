//! End-to-end job tests
//!
//! Runs a whole job through the HTTP API:
//! 1. Submit a search over the router
//! 2. A scripted extractor plays the listing page
//! 3. The real resolver client talks to a wiremock resolver
//! 4. Tunnels are streamed to disk from the same mock server
//! 5. The final status and the served files are checked

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clipscout::api::build_router;
use clipscout::api::state::AppState;
use clipscout::config::{Config, HumanDuration};
use clipscout::extractor::{self, ExtractError, ExtractorFactory, PageExtractor};
use clipscout::observability::Metrics;
use clipscout::orchestrator::Orchestrator;
use clipscout::registry::TaskRegistry;
use clipscout::resolver::CobaltResolver;
use clipscout::types::{SourceLocator, VideoMetadata};
use clipscout::worker::HttpClient;

const SITE: &str = "https://site.test";

#[derive(Default)]
struct SessionLog {
    opened: Vec<SourceLocator>,
    closed: usize,
}

/// Plays back listing snapshots, one per pass
struct ScriptedPage {
    pages: VecDeque<Vec<String>>,
    last: Vec<String>,
    log: Arc<Mutex<SessionLog>>,
}

#[async_trait]
impl PageExtractor for ScriptedPage {
    async fn open(&mut self, locator: &SourceLocator) -> extractor::Result<()> {
        self.log.lock().unwrap().opened.push(locator.clone());
        Ok(())
    }

    async fn advance(&mut self, _max_scroll: u32) -> extractor::Result<()> {
        Ok(())
    }

    async fn enumerate_visible(&mut self) -> extractor::Result<Vec<String>> {
        if let Some(page) = self.pages.pop_front() {
            self.last = page;
        }
        Ok(self.last.clone())
    }

    async fn recover(&mut self) -> extractor::Result<()> {
        Ok(())
    }

    async fn describe(&mut self, reference: &str) -> extractor::Result<VideoMetadata> {
        let id = reference
            .rsplit('/')
            .next()
            .ok_or_else(|| ExtractError::MissingMetadata(reference.to_string()))?;
        Ok(VideoMetadata {
            canonical_reference: format!("{SITE}/@creator{id}/video/{id}"),
            author: format!("@creator{id}"),
            music_label: format!("original sound - creator{id}"),
            like_count: "1.2K".to_string(),
            comment_count: "34".to_string(),
            share_count: "5".to_string(),
        })
    }

    async fn close(&mut self) -> extractor::Result<()> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

struct ScriptedFactory {
    pages: Vec<Vec<&'static str>>,
    log: Arc<Mutex<SessionLog>>,
}

#[async_trait]
impl ExtractorFactory for ScriptedFactory {
    async fn open_session(&self) -> extractor::Result<Box<dyn PageExtractor>> {
        Ok(Box::new(ScriptedPage {
            pages: self
                .pages
                .iter()
                .map(|p| p.iter().map(|r| r.to_string()).collect())
                .collect(),
            last: Vec::new(),
            log: self.log.clone(),
        }))
    }
}

struct Harness {
    app: Router,
    videos: TempDir,
    log: Arc<Mutex<SessionLog>>,
}

fn harness(server: &MockServer, pages: Vec<Vec<&'static str>>) -> Harness {
    let videos = TempDir::new().unwrap();

    let mut config = Config::default();
    config.server.videos_dir = videos.path().to_path_buf();
    config.resolver.base_url = format!("{}/", server.uri());
    config.resolver.rate_limit_delay = HumanDuration::from_millis(10);
    config.discovery.max_retries = 2;
    config.discovery.stall_delay = HumanDuration::from_millis(0);
    config.discovery.stall_jitter = HumanDuration::from_millis(0);
    config.discovery.batch_pause = HumanDuration::from_millis(0);
    config.discovery.batch_pause_jitter = HumanDuration::from_millis(0);

    let log = Arc::new(Mutex::new(SessionLog::default()));
    let factory = ScriptedFactory {
        pages,
        log: log.clone(),
    };

    let registry = TaskRegistry::new();
    let metrics = Arc::new(Metrics::new());
    let http = HttpClient::new(&config.fetch).unwrap();
    let orchestrator = Orchestrator::new(
        &config,
        registry.clone(),
        metrics.clone(),
        Arc::new(factory),
        Arc::new(CobaltResolver::new(Client::new(), config.resolver.base_url.clone())),
        http,
    );

    Harness {
        app: build_router(AppState::new(config, registry, orchestrator, metrics)),
        videos,
        log,
    }
}

async fn mount_video(server: &MockServer, id: &str, bytes: &'static [u8]) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_json(json!({ "url": format!("{SITE}/@creator{id}/video/{id}") })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "tunnel",
            "url": format!("{}/tunnel/{id}", server.uri()),
            "filename": format!("tiktok_creator{id}_{id}.mp4"),
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/tunnel/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(server)
        .await;
}

async fn submit(app: &Router, body: Value) -> String {
    let request = Request::builder()
        .uri("/scrape-and-download/")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&body).unwrap();
    value["id"].as_str().unwrap().to_string()
}

async fn wait_until_finished(app: &Router, id: &str) -> Value {
    for _ in 0..500 {
        let request = Request::builder()
            .uri(format!("/get-status/?id={id}"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let task: Value = serde_json::from_slice(&body).unwrap();
        if task["status"] == json!("completed") || task["status"] == json!("failed") {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {id} did not finish");
}

#[tokio::test]
async fn test_trending_job_downloads_two_videos() {
    let server = MockServer::start().await;
    mount_video(&server, "1", b"first video").await;
    mount_video(&server, "2", b"second video").await;

    let h = harness(
        &server,
        vec![
            vec![],
            vec![
                "https://site.test/@a/video/1",
                "https://site.test/@a/video/1",
                "https://site.test/@b/video/2",
                "https://site.test/@c/video/3",
            ],
        ],
    );

    let id = submit(
        &h.app,
        json!({ "search_type": "trending", "search_query": "", "max_videos": 2 }),
    )
    .await;
    let task = wait_until_finished(&h.app, &id).await;

    assert_eq!(task["status"], json!("completed"), "{task}");
    let videos = task["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 2);

    assert_eq!(
        videos[0]["video"],
        json!("/videos/_trending_videos/tiktok_creator1_1.mp4")
    );
    assert_eq!(videos[0]["videotiktok"], json!("https://site.test/@creator1/video/1"));
    assert_eq!(videos[0]["userid"], json!("@creator1"));
    assert_eq!(videos[0]["song"], json!("original sound - creator1"));
    assert_eq!(videos[0]["like_count"], json!("1.2K"));
    assert_eq!(
        videos[1]["video"],
        json!("/videos/_trending_videos/tiktok_creator2_2.mp4")
    );

    let saved = h.videos.path().join("_trending_videos");
    assert_eq!(std::fs::read(saved.join("tiktok_creator1_1.mp4")).unwrap(), b"first video");
    assert_eq!(std::fs::read(saved.join("tiktok_creator2_2.mp4")).unwrap(), b"second video");

    let log = h.log.lock().unwrap();
    assert_eq!(log.opened, vec![SourceLocator::trending()]);
    assert_eq!(log.closed, 1);
    drop(log);

    // The reported path is served by the file route.
    let request = Request::builder()
        .uri(videos[1]["video"].as_str().unwrap())
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"second video");
}

#[tokio::test]
async fn test_rate_limited_and_failed_items() {
    let server = MockServer::start().await;

    // First answer for video 1 is a rate limit, then it resolves.
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_json(json!({ "url": "https://site.test/@creator1/video/1" })))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_video(&server, "1", b"first video").await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_json(json!({ "url": "https://site.test/@creator2/video/2" })))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"status":"error","error":{"code":"error.api.content.video.unavailable"}}"#,
        ))
        .mount(&server)
        .await;

    let h = harness(
        &server,
        vec![vec![
            "https://site.test/@a/video/1",
            "https://site.test/@b/video/2",
        ]],
    );

    let id = submit(
        &h.app,
        json!({ "search_type": "hashtag", "search_query": "#cats", "max_videos": 2 }),
    )
    .await;
    let task = wait_until_finished(&h.app, &id).await;

    assert_eq!(task["status"], json!("completed"), "{task}");
    let videos = task["videos"].as_array().unwrap();
    assert_eq!(
        videos[0]["video"],
        json!("/videos/%23cats_hashtag_videos/tiktok_creator1_1.mp4")
    );
    assert_eq!(videos[1]["video"], json!("__invalide__"));

    // Folder names keep the raw query on disk.
    let saved = h.videos.path().join("#cats_hashtag_videos");
    assert!(saved.join("tiktok_creator1_1.mp4").is_file());

    // The reported path works as-is behind both file routes.
    let reported = videos[0]["video"].as_str().unwrap();
    for uri in [reported.to_string(), format!("/stream{reported}")] {
        let request = Request::builder().uri(&uri).body(Body::empty()).unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"first video");
    }
}

#[tokio::test]
async fn test_topic_job_completes_with_hashtags() {
    let server = MockServer::start().await;
    let h = harness(&server, vec![vec!["dance", "food", "dance", "travel"]]);

    let id = submit(
        &h.app,
        json!({ "search_type": "topic", "search_query": "2", "max_videos": 3 }),
    )
    .await;
    let task = wait_until_finished(&h.app, &id).await;

    assert_eq!(task["status"], json!("completed"), "{task}");
    assert_eq!(task["hashtags"], json!(["dance", "food", "travel"]));
    assert!(task.get("videos").is_none());

    let log = h.log.lock().unwrap();
    assert_eq!(log.opened, vec![SourceLocator::HashtagListing { option_index: 1 }]);
    assert_eq!(log.closed, 1);
}

#[tokio::test]
async fn test_stalled_listing_returns_partial_result() {
    let server = MockServer::start().await;
    mount_video(&server, "1", b"only video").await;

    let h = harness(&server, vec![vec!["https://site.test/@a/video/1"]]);

    let id = submit(
        &h.app,
        json!({ "search_type": "userid", "search_query": "@a", "max_videos": 5 }),
    )
    .await;
    let task = wait_until_finished(&h.app, &id).await;

    assert_eq!(task["status"], json!("completed"), "{task}");
    assert_eq!(task["videos"].as_array().unwrap().len(), 1);
}
