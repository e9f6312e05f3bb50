//! Network fetches for index manifests and song files.
//!
//! # Architecture
//!
//! - **Traits** (`traits.rs`) - the [`HttpFetch`] capability the rest of the
//!   crate depends on, plus mocks for tests
//! - **Client** (`client.rs`) - reqwest implementation with timeout and
//!   progress reporting
//! - **Tasks** (`task.rs`) - spawns fetches on the tokio runtime and sends
//!   their progress and terminal result back to the owner over a channel
//!
//! Fetch results never touch manager state directly. The owner drains the
//! channel and applies each message, so all mutation stays on one thread.

pub mod client;
pub mod task;
pub mod traits;

pub use client::HttpClient;
pub use task::{Listener, TaskKey, TaskMessage, TaskSpawner, TaskUpdate};
pub use traits::HttpFetch;

/// Errors from the transport layer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(e.to_string())
        }
    }
}
