//! Observable song events.
//!
//! Collaborators (UI, title hooks) subscribe to a channel and learn about
//! state changes without polling. Every download ends with exactly one
//! [`SongEvent::StateChanged`], so observers that only care about "did it
//! end" need a single event kind.

use crossbeam_channel::{Receiver, Sender, TrySendError, unbounded};

use crate::model::TrackId;

/// Events emitted for host collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum SongEvent {
    /// Something about the track's variants changed (or a download ended).
    StateChanged { track_id: TrackId },
    /// A download made progress; `progress` is in `[0, 1]`.
    DownloadProgress {
        track_id: TrackId,
        unique_id: String,
        progress: f32,
    },
}

impl SongEvent {
    pub fn track_id(&self) -> TrackId {
        match self {
            Self::StateChanged { track_id } | Self::DownloadProgress { track_id, .. } => *track_id,
        }
    }
}

/// Fan-out of [`SongEvent`]s to every live subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<SongEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    ///
    /// Dropping the receiver unsubscribes; dead senders are pruned on the
    /// next post.
    pub fn subscribe(&mut self) -> Receiver<SongEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn post(&mut self, event: SongEvent) {
        tracing::trace!(target: "jukebox::events", ?event, "Posting event");
        self.subscribers
            .retain(|tx| !matches!(tx.try_send(event.clone()), Err(TrySendError::Disconnected(_))));
    }

    pub fn state_changed(&mut self, track_id: TrackId) {
        self.post(SongEvent::StateChanged { track_id });
    }

    pub fn download_progress(&mut self, track_id: TrackId, unique_id: &str, progress: f32) {
        self.post(SongEvent::DownloadProgress {
            track_id,
            unique_id: unique_id.to_string(),
            progress,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
