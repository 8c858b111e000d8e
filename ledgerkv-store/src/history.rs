//! Ordered history of a key
//!
//! [`EventHistory`] is a forward-only sequence over a key's events in
//! ascending `sequence` order. It pulls rows from the backend one at a time
//! and owns whatever the backend needs to do so (a pooled connection with an
//! open cursor, or a handle on the in-memory table). That resource is
//! released as soon as the sequence is exhausted, fails, is closed, or is
//! dropped.

use crate::error::{Result, StoreError};
use crate::types::Event;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Lazy, non-restartable sequence of events for one key
pub struct EventHistory {
    key: String,
    inner: Option<BoxStream<'static, Result<Event>>>,
    last_sequence: Option<i64>,
    yielded: usize,
}

impl EventHistory {
    /// Wrap a backend row stream
    pub fn new<S>(key: impl Into<String>, rows: S) -> Self
    where
        S: Stream<Item = Result<Event>> + Send + 'static,
    {
        Self {
            key: key.into(),
            inner: Some(rows.boxed()),
            last_sequence: None,
            yielded: 0,
        }
    }

    /// History with no events (and no resource to release)
    pub fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            inner: None,
            last_sequence: None,
            yielded: 0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of events handed out so far
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// False once exhausted, failed or closed
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Next event, or `None` when the history is finished.
    pub async fn next_event(&mut self) -> Option<Result<Event>> {
        self.next().await
    }

    /// Release the underlying cursor. Safe to call any number of times,
    /// including after the history ran out on its own.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!(key = %self.key, yielded = self.yielded, "History closed");
        }
    }

    /// Drain the remaining events into memory.
    pub async fn collect_all(mut self) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event?);
        }
        Ok(events)
    }

    fn accept(&mut self, event: Event) -> Result<Event> {
        if let Some(last) = self.last_sequence {
            if event.sequence <= last {
                return Err(StoreError::internal(format!(
                    "history for {} out of order: {} after {}",
                    self.key, event.sequence, last
                )));
            }
        }
        self.last_sequence = Some(event.sequence);
        self.yielded += 1;
        Ok(event)
    }
}

impl Stream for EventHistory {
    type Item = Result<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(rows) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match rows.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.close();
                Poll::Ready(None)
            }
            Poll::Ready(Some(Ok(event))) => {
                let accepted = this.accept(event);
                if accepted.is_err() {
                    this.close();
                }
                Poll::Ready(Some(accepted))
            }
            Poll::Ready(Some(Err(err))) => {
                this.close();
                Poll::Ready(Some(Err(err)))
            }
        }
    }
}

impl std::fmt::Debug for EventHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHistory")
            .field("key", &self.key)
            .field("open", &self.is_open())
            .field("yielded", &self.yielded)
            .finish()
    }
}
