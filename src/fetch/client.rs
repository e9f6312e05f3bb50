//! reqwest-backed transport.
//!
//! One shared client with a fixed per-request timeout. Bodies are streamed
//! so progress can be reported while large song files arrive; progress is
//! only reported when the server sends a Content-Length.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::{FetchError, HttpFetch};

/// Bodies larger than this are not pre-allocated from Content-Length.
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

/// HTTP client used for index manifests and song downloads
pub struct HttpClient {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a new client
    ///
    /// The client is configured to:
    /// - Fail any request that takes longer than `timeout`
    /// - Accept gzip-compressed responses
    /// - Send User-Agent header identifying the application
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl HttpFetch for HttpClient {
    async fn fetch(
        &self,
        url: &str,
        progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(target: "jukebox::fetch", url = %url, "Fetching");

        let response = self.http_client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let total = response.content_length().filter(|len| *len > 0);
        let mut body = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOCATION) as usize);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            body.extend_from_slice(&chunk);
            if let Some(total) = total {
                progress((body.len() as f32 / total as f32).min(1.0));
            }
        }

        tracing::debug!(target: "jukebox::fetch", url = %url, size = body.len(), "Fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation() {
        let client = HttpClient::new(Duration::from_secs(30)).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_fetch_body_reports_progress() {
        let server = MockServer::start().await;
        let body = vec![7u8; 4096];
        Mock::given(method("GET"))
            .and(path("/song.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let seen = Mutex::new(Vec::new());
        let fetched = client
            .fetch(&format!("{}/song.mp3", server.uri()), &|p: f32| {
                seen.lock().unwrap().push(p)
            })
            .await
            .unwrap();

        assert_eq!(fetched, body);
        let seen = seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        assert_eq!(seen.last().copied(), Some(1.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        let result = client
            .fetch(&format!("{}/index.json", server.uri()), &|_: f32| {})
            .await;

        assert!(matches!(result, Err(FetchError::Status { code: 503, .. })));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_millis(200)).unwrap();
        let result = client
            .fetch(&format!("{}/slow.json", server.uri()), &|_: f32| {})
            .await;

        assert_eq!(result, Err(FetchError::Timeout));
    }
}
