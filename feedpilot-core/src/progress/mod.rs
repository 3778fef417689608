use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::store::LogEntry;

/// Slice of a [`LogEntry`] sent to live observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPreview {
    pub post_author: String,
    pub generated_comment: String,
    #[serde(rename = "posted_to_linkedin")]
    pub posted: bool,
}

impl From<&LogEntry> for LogPreview {
    fn from(entry: &LogEntry) -> Self {
        Self {
            post_author: entry.author.clone(),
            generated_comment: entry.generated_comment.clone(),
            posted: entry.posted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Status { message: String },
    Log { message: String },
    Result { log: LogPreview },
    Summary { message: String },
    Error { message: String },
}

impl ProgressEvent {
    pub fn status(message: impl Into<String>) -> Self {
        ProgressEvent::Status {
            message: message.into(),
        }
    }

    pub fn log(message: impl Into<String>) -> Self {
        ProgressEvent::Log {
            message: message.into(),
        }
    }

    pub fn result(entry: &LogEntry) -> Self {
        ProgressEvent::Result {
            log: LogPreview::from(entry),
        }
    }

    pub fn summary(message: impl Into<String>) -> Self {
        ProgressEvent::Summary {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::Status { .. } => "status",
            ProgressEvent::Log { .. } => "log",
            ProgressEvent::Result { .. } => "result",
            ProgressEvent::Summary { .. } => "summary",
            ProgressEvent::Error { .. } => "error",
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Status { message }
            | ProgressEvent::Log { message }
            | ProgressEvent::Summary { message }
            | ProgressEvent::Error { message } => write!(f, "[{}] {}", self.kind(), message),
            ProgressEvent::Result { log } => write!(
                f,
                "[result] {} | posted={} | {}",
                log.post_author, log.posted, log.generated_comment
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("listener is closed")]
    Closed,
    #[error("listener rejected event: {0}")]
    Rejected(String),
}

pub trait ProgressListener: Send + Sync {
    fn deliver(&self, event: &ProgressEvent) -> Result<(), DeliveryError>;
}

/// Forwards events into an unbounded channel so an async consumer (a
/// websocket task, the CLI printer) drains them at its own pace.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelListener {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressListener for ChannelListener {
    fn deliver(&self, event: &ProgressEvent) -> Result<(), DeliveryError> {
        self.sender
            .send(event.clone())
            .map_err(|_| DeliveryError::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type ListenerSet = Vec<(ListenerId, Arc<dyn ProgressListener>)>;

#[derive(Default)]
pub struct ProgressBroadcaster {
    listeners: RwLock<ListenerSet>,
    next_id: AtomicU64,
}

impl fmt::Debug for ProgressBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBroadcaster")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn ProgressListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        match self.listeners.write() {
            Ok(mut guard) => guard.push((id, listener)),
            Err(poisoned) => poisoned.into_inner().push((id, listener)),
        }
        debug!(listener = %id, "Progress listener attached");
        id
    }

    pub fn subscribe_channel(&self) -> (ListenerId, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.subscribe(Arc::new(ChannelListener::new(sender)));
        (id, receiver)
    }

    /// Detaches a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut guard = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = guard.len();
        guard.retain(|(existing, _)| *existing != id);
        let removed = guard.len() != before;
        if removed {
            debug!(listener = %id, "Progress listener detached");
        }
        removed
    }

    pub fn listener_count(&self) -> usize {
        match self.listeners.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Delivers `event` to a snapshot of the current listeners and returns how
    /// many accepted it. Failing listeners are logged and skipped; closed ones
    /// are detached.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        let snapshot: ListenerSet = match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, listener) in snapshot {
            match listener.deliver(&event) {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Closed) => closed.push(id),
                Err(err) => {
                    warn!(listener = %id, kind = event.kind(), error = %err, "Progress delivery failed")
                }
            }
        }
        for id in closed {
            self.unsubscribe(id);
        }
        delivered
    }
}
