//! Cancellable fetch tasks.
//!
//! A task runs on the tokio runtime and produces zero or more
//! [`TaskUpdate::Progress`] messages followed by exactly one
//! [`TaskUpdate::Finished`]. Messages carry the task's key and ticket; the
//! owner keeps one [`Listener`] per key and drops any message whose ticket
//! no longer matches, which is how superseded or stopped tasks go quiet.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Sender;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use super::{FetchError, HttpFetch};

/// What a task is fetching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    /// An index manifest, keyed by its URL
    Index(String),
    /// A hosted song, keyed by variant unique id
    Download(String),
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(url) => write!(f, "index {}", url),
            Self::Download(id) => write!(f, "download {}", id),
        }
    }
}

#[derive(Debug)]
pub enum TaskUpdate {
    Progress(f32),
    Finished(Result<Vec<u8>, FetchError>),
}

/// One message from a running task to the owner.
#[derive(Debug)]
pub struct TaskMessage {
    pub key: TaskKey,
    pub ticket: u64,
    pub update: TaskUpdate,
}

/// The owner's registration for a live task.
///
/// Dropping a listener does not stop the task; its messages are simply no
/// longer accepted. Call [`Listener::cancel`] to abort it.
#[derive(Debug)]
pub struct Listener {
    ticket: u64,
    abort: AbortHandle,
}

impl Listener {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Whether the message came from this registration's task.
    pub fn accepts(&self, message: &TaskMessage) -> bool {
        message.ticket == self.ticket
    }

    pub fn cancel(self) {
        self.abort.abort();
    }
}

/// Spawns fetch tasks that report back over the owner's channel.
#[derive(Clone)]
pub struct TaskSpawner {
    runtime: Handle,
    fetcher: Arc<dyn HttpFetch>,
    outbox: Sender<TaskMessage>,
    next_ticket: Arc<AtomicU64>,
}

impl TaskSpawner {
    pub fn new(runtime: Handle, fetcher: Arc<dyn HttpFetch>, outbox: Sender<TaskMessage>) -> Self {
        Self {
            runtime,
            fetcher,
            outbox,
            next_ticket: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Start fetching `url`. Returns immediately.
    pub fn spawn_fetch(&self, key: TaskKey, url: String) -> Listener {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let fetcher = Arc::clone(&self.fetcher);
        let outbox = self.outbox.clone();

        tracing::debug!(target: "jukebox::fetch", %key, ticket, url = %url, "Spawning fetch task");

        let handle = self.runtime.spawn(async move {
            let progress_key = key.clone();
            let progress_outbox = outbox.clone();
            let report = move |progress: f32| {
                // Owner gone means nobody is listening; nothing to do.
                let _ = progress_outbox.send(TaskMessage {
                    key: progress_key.clone(),
                    ticket,
                    update: TaskUpdate::Progress(progress.clamp(0.0, 1.0)),
                });
            };

            let result = fetcher.fetch(&url, &report).await;
            let _ = outbox.send(TaskMessage {
                key,
                ticket,
                update: TaskUpdate::Finished(result),
            });
        });

        Listener {
            ticket,
            abort: handle.abort_handle(),
        }
    }
}
