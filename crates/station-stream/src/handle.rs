use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::error::StreamError;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// What a [`StreamHandle`] delivers to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    TextDelta(String),
    Done,
    Failed(StreamError),
}

impl TransportEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportEvent::TextDelta(_))
    }
}

/// Producer side of a stream handle.
///
/// Accepts any number of deltas followed by at most one terminal event;
/// everything sent after the terminal event is dropped.
pub struct EventSink {
    tx: mpsc::Sender<TransportEvent>,
    terminated: bool,
}

impl EventSink {
    /// Returns `false` once the consumer is gone or the stream has terminated.
    pub async fn delta(&mut self, text: impl Into<String>) -> bool {
        self.send(TransportEvent::TextDelta(text.into())).await
    }

    pub async fn done(&mut self) -> bool {
        self.send(TransportEvent::Done).await
    }

    pub async fn fail(&mut self, error: StreamError) -> bool {
        self.send(TransportEvent::Failed(error)).await
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    async fn send(&mut self, event: TransportEvent) -> bool {
        if self.terminated {
            return false;
        }
        if event.is_terminal() {
            self.terminated = true;
        }
        self.tx.send(event).await.is_ok()
    }
}

/// Consumer side of one open chat stream.
///
/// Events come out in the order they were produced. After a terminal event
/// or a call to [`close`](Self::close) nothing more is delivered.
pub struct StreamHandle {
    id: u64,
    rx: mpsc::Receiver<TransportEvent>,
    task: Option<AbortHandle>,
    closed: bool,
    finished: bool,
}

impl StreamHandle {
    /// Create a connected sink/handle pair for a transport implementation.
    pub fn channel(capacity: usize) -> (EventSink, StreamHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        let sink = EventSink {
            tx,
            terminated: false,
        };
        let handle = StreamHandle {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            rx,
            task: None,
            closed: false,
            finished: false,
        };
        (sink, handle)
    }

    /// Tie the producing task to this handle so closing aborts it.
    pub fn attach_task(&mut self, task: AbortHandle) {
        if self.closed {
            task.abort();
        } else {
            self.task = Some(task);
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.closed || self.finished {
            return None;
        }

        let event = self.rx.recv().await?;
        if event.is_terminal() {
            self.finished = true;
        }
        Some(event)
    }

    /// Close the stream. Safe to call repeatedly; returns `true` only the first time.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::debug!(handle_id = self.id, "Stream handle closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id)
            .field("closed", &self.closed)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_in_order_until_terminal() {
        let (mut sink, mut handle) = StreamHandle::channel(8);

        assert!(sink.delta("Hi").await);
        assert!(sink.delta(" there").await);
        assert!(!sink.is_terminated());
        assert!(sink.done().await);
        assert!(sink.is_terminated());
        assert!(!sink.delta("late").await);
        assert!(!sink.fail(StreamError::Protocol("late".to_string())).await);

        assert_eq!(handle.next_event().await, Some(TransportEvent::TextDelta("Hi".to_string())));
        assert_eq!(handle.next_event().await, Some(TransportEvent::TextDelta(" there".to_string())));
        assert_eq!(handle.next_event().await, Some(TransportEvent::Done));
        assert_eq!(handle.next_event().await, None);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_silences_stream() {
        let (mut sink, mut handle) = StreamHandle::channel(8);
        assert!(sink.delta("queued").await);

        assert!(handle.close());
        assert!(!handle.close());
        assert!(!handle.close());
        assert!(handle.is_closed());

        assert_eq!(handle.next_event().await, None);
        assert!(!sink.delta("after close").await);
    }

    #[tokio::test]
    async fn test_close_aborts_attached_task() {
        let (_sink, mut handle) = StreamHandle::channel(1);
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        handle.attach_task(task.abort_handle());

        handle.close();
        let result = task.await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_handle_ids_are_unique() {
        let (_a, first) = StreamHandle::channel(1);
        let (_b, second) = StreamHandle::channel(1);
        assert_ne!(first.id(), second.id());
    }
}
