//! In-process event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels so every subscriber sees every
//! message and a slow subscriber never blocks the publisher.
//!
//! # Lanes
//!
//! | Lane | Payload | Traffic |
//! |---|---|---|
//! | [`Lane::Downstream`] | [`Event`] | Requests and health probes from the provider |
//! | [`Lane::Upstream`] | [`Event<ResponseData>`] | Responses posted by the handler |

use std::fmt;

use las_types::{Event, LasError, ResponseData};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// The two directions traffic flows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Provider → adapter.
    Downstream,
    /// Adapter → provider.
    Upstream,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Downstream => f.write_str("downstream"),
            Lane::Upstream => f.write_str("upstream"),
        }
    }
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    capacity: usize,
    downstream: broadcast::Sender<Event>,
    upstream: broadcast::Sender<Event<ResponseData>>,
}

impl EventBus {
    /// Create a new bus. `capacity` applies to each lane independently.
    pub fn new(capacity: usize) -> Self {
        let (downstream, _) = broadcast::channel(capacity);
        let (upstream, _) = broadcast::channel(capacity);
        Self {
            capacity,
            downstream,
            upstream,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` when the next downstream publish would push the oldest
    /// unseen event out of a subscriber's buffer.
    pub fn downstream_full(&self) -> bool {
        self.downstream.len() >= self.capacity
    }

    /// Same as [`EventBus::downstream_full`] for the response lane.
    pub fn upstream_full(&self) -> bool {
        self.upstream.len() >= self.capacity
    }

    /// Publish an inbound event for the handler.
    ///
    /// Returns the number of receivers handed the event, or
    /// [`LasError::Channel`] when nobody is subscribed.
    pub fn publish_downstream(&self, event: Event) -> Result<usize, LasError> {
        self.downstream
            .send(event)
            .map_err(|_| LasError::Channel(format!("no subscribers on {} lane", Lane::Downstream)))
    }

    /// Publish a response for the provider.
    pub fn publish_upstream(&self, event: Event<ResponseData>) -> Result<usize, LasError> {
        self.upstream
            .send(event)
            .map_err(|_| LasError::Channel(format!("no subscribers on {} lane", Lane::Upstream)))
    }

    pub fn subscribe_downstream(&self) -> LaneReceiver<Event> {
        LaneReceiver {
            lane: Lane::Downstream,
            receiver: self.downstream.subscribe(),
        }
    }

    pub fn subscribe_upstream(&self) -> LaneReceiver<Event<ResponseData>> {
        LaneReceiver {
            lane: Lane::Upstream,
            receiver: self.upstream.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to one [`Lane`].
pub struct LaneReceiver<T> {
    lane: Lane,
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> LaneReceiver<T> {
    /// Wait for the next event on this lane.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(RecvError::Lagged(n))` – the subscriber fell behind and `n`
    ///   messages were dropped.
    /// * `Err(RecvError::Closed)` – every publisher is gone.
    pub async fn recv(&mut self) -> Result<T, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Wait for the next event, logging and skipping over lag.
    ///
    /// Returns `None` once the bus is closed.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lane = %self.lane, lagged_by = n, "Lane receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }
}
