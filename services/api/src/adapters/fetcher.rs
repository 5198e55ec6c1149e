//! services/api/src/adapters/fetcher.rs
//!
//! This module contains the adapter that retrieves study content from a link.
//! It implements the `ContentFetcher` port from the `core` crate.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Url};
use snapstudy_core::domain::{ExtractedText, FetchOutcome};
use snapstudy_core::ports::{ContentFetcher, PortError, PortResult};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    PlainText,
    Html,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentFetcher` with a single `reqwest` GET.
#[derive(Clone)]
pub struct HttpContentFetcher {
    client: reqwest::Client,
}

impl HttpContentFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client))
    }
}

fn parse_link(link: &str) -> PortResult<Url> {
    let url = Url::parse(link.trim())
        .map_err(|e| PortError::InputValidation(format!("'{}' is not a valid link: {}", link, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PortError::InputValidation(format!(
            "Only http and https links are supported, got '{}'",
            other
        ))),
    }
}

fn body_kind(content_type: &str) -> Option<BodyKind> {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("text/plain") {
        Some(BodyKind::PlainText)
    } else if content_type.contains("text/html") {
        Some(BodyKind::Html)
    } else {
        None
    }
}

/// Renders an HTML page as readable text for the model.
pub fn html_to_text(html: &str) -> String {
    html2md::parse_html(html, false)
}

//=========================================================================================
// `ContentFetcher` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, link: &str) -> PortResult<FetchOutcome> {
        let url = parse_link(link)?;
        info!("Fetching link content from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Link {} answered with {}", url, status);
            return Err(PortError::UpstreamFetch {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let Some(kind) = body_kind(&content_type) else {
            let reported = if content_type.is_empty() {
                "none".to_string()
            } else {
                content_type
            };
            return Err(PortError::UnsupportedContentType(reported));
        };

        let body = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to read body of {}: {}", url, e)))?;
        let text = match kind {
            BodyKind::PlainText => body,
            BodyKind::Html => html_to_text(&body),
        };

        if text.trim().is_empty() {
            info!("No text content found at {}", url);
            return Ok(FetchOutcome::NoContentFound);
        }
        Ok(FetchOutcome::Content(ExtractedText::from_link(text, link.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::Html, routing::get, Router};
    use std::net::SocketAddr;

    async fn serve_fixtures() -> SocketAddr {
        let app = Router::new()
            .route("/notes.txt", get(|| async { "Photosynthesis happens in chloroplasts." }))
            .route(
                "/article",
                get(|| async {
                    Html("<html><body><h1>Cells</h1><p>Cells are small.</p></body></html>")
                }),
            )
            .route("/empty", get(|| async { "" }))
            .route(
                "/image",
                get(|| async { ([(CONTENT_TYPE, "image/png")], vec![1u8, 2, 3]) }),
            )
            .route("/gone", get(|| async { StatusCode::NOT_FOUND }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn fetcher() -> HttpContentFetcher {
        HttpContentFetcher::with_timeout(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn plain_text_is_returned_verbatim() {
        let addr = serve_fixtures().await;
        let link = format!("http://{}/notes.txt", addr);

        match fetcher().fetch(&link).await.unwrap() {
            FetchOutcome::Content(extracted) => {
                assert_eq!(extracted.text, "Photosynthesis happens in chloroplasts.");
                assert_eq!(extracted.origin.as_deref(), Some(link.as_str()));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn html_is_converted_to_text() {
        let addr = serve_fixtures().await;
        match fetcher().fetch(&format!("http://{}/article", addr)).await.unwrap() {
            FetchOutcome::Content(extracted) => {
                assert!(extracted.text.contains("Cells are small."));
                assert!(!extracted.text.contains("<p>"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_body_is_no_content_not_an_error() {
        let addr = serve_fixtures().await;
        let outcome = fetcher().fetch(&format!("http://{}/empty", addr)).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NoContentFound);
    }

    #[tokio::test]
    async fn upstream_status_is_preserved() {
        let addr = serve_fixtures().await;
        let err = fetcher()
            .fetch(&format!("http://{}/gone", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::UpstreamFetch { status: 404, .. }));
    }

    #[tokio::test]
    async fn non_text_content_types_are_refused() {
        let addr = serve_fixtures().await;
        let err = fetcher()
            .fetch(&format!("http://{}/image", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::UnsupportedContentType(ref t) if t == "image/png"));
    }

    #[tokio::test]
    async fn non_http_links_are_invalid_input() {
        let err = fetcher().fetch("ftp://example.org/notes").await.unwrap_err();
        assert!(matches!(err, PortError::InputValidation(_)));
        let err = fetcher().fetch("not a link").await.unwrap_err();
        assert!(matches!(err, PortError::InputValidation(_)));
    }
}
