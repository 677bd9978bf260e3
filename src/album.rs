//! Coalescing of media-group messages into albums.
//!
//! The platform delivers every item of an album as its own message, tagged
//! with a shared media group id and nothing else: no item count, no "last
//! item" marker. The first message seen for a group opens a buffer and spawns
//! the task that will finalize it; siblings only append. The finalize task
//! waits until the group has been quiet for the coalescing window, removes the
//! buffer under the registry lock and hands the snapshot to an [`AlbumSink`].
//!
//! Removal happens before the album is relayed. A sibling arriving after that
//! point finds no buffer and opens a new one, so it is relayed separately
//! rather than lost (as plain media when it ends up alone).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::platform::InboundMessage;

/// Default quiet period before an album is finalized.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(10);

/// Default upper bound on how long a single album may keep collecting.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(1);

/// Messages collected so far for one media group.
#[derive(Debug)]
pub struct AlbumBuffer {
    messages: Vec<InboundMessage>,
    opened_at: Instant,
    last_append: Instant,
}

impl AlbumBuffer {
    fn new(first: InboundMessage) -> Self {
        let now = Instant::now();
        Self {
            messages: vec![first],
            opened_at: now,
            last_append: now,
        }
    }

    fn push(&mut self, msg: InboundMessage) -> usize {
        self.messages.push(msg);
        self.last_append = Instant::now();
        self.messages.len()
    }

    fn deadline(&self, window: Duration, max_wait: Duration) -> Instant {
        (self.last_append + window).min(self.opened_at + max_wait)
    }
}

/// A finalized media group, in arrival order.
#[derive(Debug, Clone)]
pub struct Album {
    group_id: String,
    first: InboundMessage,
    rest: Vec<InboundMessage>,
}

impl Album {
    /// `None` if `messages` is empty.
    pub fn new(group_id: impl Into<String>, messages: Vec<InboundMessage>) -> Option<Self> {
        let mut messages = messages.into_iter();
        let first = messages.next()?;
        Some(Self {
            group_id: group_id.into(),
            first,
            rest: messages.collect(),
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// The message provenance and replies are taken from.
    pub fn first(&self) -> &InboundMessage {
        &self.first
    }

    pub fn messages(&self) -> impl Iterator<Item = &InboundMessage> {
        std::iter::once(&self.first).chain(&self.rest)
    }

    pub fn item_count(&self) -> usize {
        1 + self.rest.len()
    }

    /// The first non-empty caption in the album, wherever it sits.
    pub fn caption(&self) -> Option<&str> {
        self.messages().find_map(|m| m.content.caption())
    }
}

/// Group id to buffer map. Shared between the aggregator and its finalize tasks.
pub type AlbumRegistry = Arc<Mutex<HashMap<String, AlbumBuffer>>>;

pub fn new_registry() -> AlbumRegistry {
    Arc::new(Mutex::new(HashMap::new()))
}

/// Receives finalized albums.
#[async_trait]
pub trait AlbumSink: Send + Sync {
    async fn flush(&self, album: Album) -> Result<()>;
}

/// Result of handing a grouped message to the aggregator.
#[derive(Debug)]
pub enum Offer {
    /// First message of its group; the handle completes once the album is relayed.
    Opened(JoinHandle<()>),
    /// Appended to an open buffer at this 1-based position.
    Joined(usize),
}

pub struct AlbumAggregator {
    registry: AlbumRegistry,
    sink: Arc<dyn AlbumSink>,
    window: Duration,
    max_wait: Duration,
}

impl AlbumAggregator {
    pub fn new(
        registry: AlbumRegistry,
        sink: Arc<dyn AlbumSink>,
        window: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            window,
            max_wait: max_wait.max(window),
        }
    }

    /// Add a message to the album for `group_id`, opening one if none is collecting.
    pub async fn offer(&self, group_id: &str, msg: InboundMessage) -> Offer {
        let mut albums = self.registry.lock().await;

        if let Some(buffer) = albums.get_mut(group_id) {
            return Offer::Joined(buffer.push(msg));
        }

        albums.insert(group_id.to_string(), AlbumBuffer::new(msg));
        drop(albums);

        let task = FinalizeTask {
            registry: self.registry.clone(),
            sink: self.sink.clone(),
            group_id: group_id.to_string(),
            window: self.window,
            max_wait: self.max_wait,
        };
        Offer::Opened(tokio::spawn(task.run()))
    }

    /// Number of groups currently collecting.
    pub async fn pending(&self) -> usize {
        self.registry.lock().await.len()
    }
}

/// The one task allowed to remove a given group's buffer.
struct FinalizeTask {
    registry: AlbumRegistry,
    sink: Arc<dyn AlbumSink>,
    group_id: String,
    window: Duration,
    max_wait: Duration,
}

impl FinalizeTask {
    async fn run(self) {
        let Some(album) = self.claim().await else {
            warn!("Album {}: buffer vanished before finalize", self.group_id);
            return;
        };

        debug!(
            "Album {}: finalized with {} item(s), first received at {}",
            self.group_id,
            album.item_count(),
            album.first().received_at
        );

        if let Err(e) = self.sink.flush(album).await {
            error!(
                "Failed to relay album {} (retryable: {}): {:#}",
                self.group_id,
                e.is_retryable(),
                e
            );
        }
    }

    /// Sleep until the group goes quiet, then take its buffer out of the registry.
    async fn claim(&self) -> Option<Album> {
        loop {
            let wake_at = {
                let mut albums = self.registry.lock().await;
                let deadline = albums.get(&self.group_id)?.deadline(self.window, self.max_wait);
                if Instant::now() >= deadline {
                    let buffer = albums.remove(&self.group_id)?;
                    return Album::new(self.group_id.clone(), buffer.messages);
                }
                deadline
            };
            tokio::time::sleep_until(wake_at).await;
        }
    }
}
