// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Ordered Multi-Producer Event Bridge
//
// Provides a bounded, in-memory event stream built on a tokio mpsc channel.
// Producers may live on the async runtime or on plain threads; a single
// consumer drains the stream (live UI, SSE endpoint, log). Plain threads
// publish through a runtime handle (`handle.block_on(bus.publish(event))`);
// workers on the blocking pool stream through their dispatch's `ChunkSink`.
//
// Publishers wait for buffer space instead of dropping events. Events from
// one producer keep their publish order; events from concurrent producers
// interleave in arrival order.

use crate::domain::events::ScratchpadEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

pub const DEFAULT_CAPACITY: usize = 1024;

/// Event bus for publishing events to the run's single consumer
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    sender: Mutex<Option<mpsc::Sender<ScratchpadEvent>>>,
    receiver: Mutex<Option<mpsc::Receiver<ScratchpadEvent>>>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity.
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            inner: Arc::new(BusInner {
                sender: Mutex::new(Some(sender)),
                receiver: Mutex::new(Some(receiver)),
                capacity,
            }),
        }
    }

    /// Create event bus with default capacity (1024)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    fn sender(&self, event: &ScratchpadEvent) -> Result<mpsc::Sender<ScratchpadEvent>, EventBusError> {
        match self.inner.sender.lock().as_ref() {
            Some(sender) => Ok(sender.clone()),
            None => {
                error!(
                    event_type = event.event_type.as_str(),
                    source = %event.source,
                    "Publish attempted after event bus was closed"
                );
                Err(EventBusError::Closed)
            }
        }
    }

    /// Publish an event from an async context, waiting while the buffer is full.
    pub async fn publish(&self, event: ScratchpadEvent) -> Result<(), EventBusError> {
        let sender = self.sender(&event)?;
        debug!(event_type = event.event_type.as_str(), source = %event.source, "Publishing event");
        sender
            .send(event)
            .await
            .map_err(|_| EventBusError::Disconnected)?;
        metrics::counter!("scratchpad_events_published_total").increment(1);
        Ok(())
    }

    /// Take the receiving end of the bus. There is exactly one consumer per bus.
    pub fn subscribe(&self) -> Result<EventReceiver, EventBusError> {
        self.inner
            .receiver
            .lock()
            .take()
            .map(|receiver| EventReceiver { receiver })
            .ok_or(EventBusError::AlreadySubscribed)
    }

    /// Signal that no further events will be published.
    ///
    /// The consumer drains already-queued events and then sees end-of-stream.
    /// Only valid once every producer has returned.
    pub fn close(&self) {
        if self.inner.sender.lock().take().is_some() {
            debug!("Event bus closed");
        } else {
            warn!("Event bus close requested more than once");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.sender.lock().is_none()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Receiver for all events of one bus, in arrival order
pub struct EventReceiver {
    receiver: mpsc::Receiver<ScratchpadEvent>,
}

impl EventReceiver {
    /// Receive the next event. Returns `None` once the bus is closed and drained.
    pub async fn recv(&mut self) -> Option<ScratchpadEvent> {
        self.receiver.recv().await
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<ScratchpadEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            mpsc::error::TryRecvError::Empty => EventBusError::Empty,
            mpsc::error::TryRecvError::Disconnected => EventBusError::Closed,
        })
    }

    /// Receive from a thread outside the async runtime.
    pub fn blocking_recv(&mut self) -> Option<ScratchpadEvent> {
        self.receiver.blocking_recv()
    }

    /// Drain every remaining event until the bus is closed.
    pub async fn collect_all(mut self) -> Vec<ScratchpadEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }

    pub fn into_stream(self) -> ReceiverStream<ScratchpadEvent> {
        ReceiverStream::new(self.receiver)
    }
}

/// Errors that can occur when publishing or receiving events
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("Event consumer has gone away")]
    Disconnected,

    #[error("Event bus already has a subscriber")]
    AlreadySubscribed,

    #[error("No events available")]
    Empty,
}
