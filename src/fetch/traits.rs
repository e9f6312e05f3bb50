//! Transport capability used by index sync and downloads.
//!
//! Production code uses [`HttpClient`](super::HttpClient); tests substitute
//! [`mocks::MockFetcher`] so no network is needed.

use async_trait::async_trait;

use super::FetchError;

/// Fetch a URL's body, reporting progress in `[0, 1]` along the way.
///
/// Timeouts are the implementation's responsibility and surface as
/// [`FetchError::Timeout`].
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        progress: &(dyn Fn(f32) + Send + Sync),
    ) -> Result<Vec<u8>, FetchError>;
}

/// Mock fetcher for testing.
///
/// Returns configurable responses per URL for testing different scenarios.
#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Canned response for one URL
    #[derive(Clone)]
    pub enum MockResponse {
        /// Succeed with a body after reporting each progress step
        Body { body: Vec<u8>, steps: Vec<f32> },
        /// Fail with the given error
        Fail(FetchError),
        /// Never complete (until aborted)
        Hang,
        /// Wait for the gate to open, then succeed
        Gated { gate: Arc<Notify>, body: Vec<u8> },
    }

    /// Mock fetcher keyed by URL. Unknown URLs answer HTTP 404.
    #[derive(Default)]
    pub struct MockFetcher {
        responses: Mutex<HashMap<String, MockResponse>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a mock that serves a single body.
        pub fn with_body(url: &str, body: impl Into<Vec<u8>>) -> Self {
            let mock = Self::new();
            mock.set_body(url, body);
            mock
        }

        pub fn set(&self, url: &str, response: MockResponse) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), response);
        }

        pub fn set_body(&self, url: &str, body: impl Into<Vec<u8>>) {
            self.set(
                url,
                MockResponse::Body {
                    body: body.into(),
                    steps: vec![],
                },
            );
        }

        pub fn set_error(&self, url: &str, error: FetchError) {
            self.set(url, MockResponse::Fail(error));
        }

        /// URLs requested so far, in order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpFetch for MockFetcher {
        async fn fetch(
            &self,
            url: &str,
            progress: &(dyn Fn(f32) + Send + Sync),
        ) -> Result<Vec<u8>, FetchError> {
            let response = self.responses.lock().unwrap().get(url).cloned();
            self.calls.lock().unwrap().push(url.to_string());
            match response {
                Some(MockResponse::Body { body, steps }) => {
                    for step in steps {
                        progress(step);
                    }
                    Ok(body)
                }
                Some(MockResponse::Fail(err)) => Err(err),
                Some(MockResponse::Hang) => std::future::pending().await,
                Some(MockResponse::Gated { gate, body }) => {
                    gate.notified().await;
                    Ok(body)
                }
                None => Err(FetchError::Status {
                    code: 404,
                    reason: "Not Found".to_string(),
                }),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[tokio::test]
        async fn test_mock_serves_body_with_progress() {
            let mock = MockFetcher::new();
            mock.set(
                "http://x/a",
                MockResponse::Body {
                    body: b"abc".to_vec(),
                    steps: vec![0.5, 1.0],
                },
            );
            let seen = AtomicUsize::new(0);
            let body = mock
                .fetch("http://x/a", &|_: f32| {
                    seen.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            assert_eq!(body, b"abc");
            assert_eq!(seen.load(Ordering::SeqCst), 2);
            assert_eq!(mock.calls(), vec!["http://x/a".to_string()]);
        }

        #[tokio::test]
        async fn test_mock_unknown_url_is_404() {
            let mock = MockFetcher::new();
            let result = mock.fetch("http://x/missing", &|_: f32| {}).await;
            assert!(matches!(result, Err(FetchError::Status { code: 404, .. })));
        }
    }
}
