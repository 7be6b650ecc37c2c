use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ResolveError, ResolveOutcome, Result, Tunnel, TunnelResolver};

/// Error code the resolver puts in the body when throttling without a 429
const RATE_EXCEEDED_MARKER: &str = r#""code":"error.api.rate_exceeded""#;

#[derive(Debug, Serialize)]
struct ResolveRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    url: Option<String>,
    filename: Option<String>,
}

/// Client for a self-hosted cobalt-style resolver API
#[derive(Debug, Clone)]
pub struct CobaltResolver {
    client: Client,
    base_url: String,
}

impl CobaltResolver {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TunnelResolver for CobaltResolver {
    async fn resolve(&self, reference: &str) -> Result<ResolveOutcome> {
        debug!(reference, "Resolving tunnel");

        let response = self
            .client
            .post(&self.base_url)
            .header(header::ACCEPT, "application/json")
            .json(&ResolveRequest { url: reference })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS || body.contains(RATE_EXCEEDED_MARKER) {
            debug!(reference, status = status.as_u16(), "Resolver rate limited");
            return Ok(ResolveOutcome::RateLimited);
        }

        if status != StatusCode::OK {
            warn!(reference, status = status.as_u16(), body = %body, "Resolver rejected reference");
            return Err(ResolveError::Rejected {
                reference: reference.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ResolveResponse = serde_json::from_str(&body)
            .map_err(|e| ResolveError::MalformedResponse(e.to_string()))?;

        match (parsed.url, parsed.filename) {
            (Some(url), Some(filename)) => Ok(ResolveOutcome::Ready(Tunnel { url, filename })),
            _ => Err(ResolveError::MalformedResponse(format!(
                "missing url or filename for {reference}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(server: &MockServer) -> CobaltResolver {
        CobaltResolver::new(Client::new(), format!("{}/", server.uri()))
    }

    #[tokio::test]
    async fn test_resolves_tunnel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header_matcher("accept", "application/json"))
            .and(body_json(json!({ "url": "https://site.test/@a/video/1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "tunnel",
                "url": "http://tunnel.test/abc",
                "filename": "tiktok_a_1.mp4"
            })))
            .mount(&server)
            .await;

        let outcome = resolver(&server)
            .resolve("https://site.test/@a/video/1")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ResolveOutcome::Ready(Tunnel {
                url: "http://tunnel.test/abc".to_string(),
                filename: "tiktok_a_1.mp4".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let outcome = resolver(&server).resolve("ref").await.unwrap();
        assert_eq!(outcome, ResolveOutcome::RateLimited);
    }

    #[tokio::test]
    async fn test_rate_exceeded_code_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"status":"error","error":{"code":"error.api.rate_exceeded"}}"#),
            )
            .mount(&server)
            .await;

        let outcome = resolver(&server).resolve("ref").await.unwrap();
        assert_eq!(outcome, ResolveOutcome::RateLimited);
    }

    #[tokio::test]
    async fn test_other_errors_are_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"status":"error","error":{"code":"error.api.content.video.unavailable"}}"#,
            ))
            .mount(&server)
            .await;

        let err = resolver(&server).resolve("ref").await.unwrap_err();
        assert!(matches!(err, ResolveError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_missing_filename_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "url": "http://tunnel.test/x" })),
            )
            .mount(&server)
            .await;

        let err = resolver(&server).resolve("ref").await.unwrap_err();
        assert!(matches!(err, ResolveError::MalformedResponse(_)));
    }
}
