//! Response posting.
//!
//! The handler never writes to a transport directly. It hands every finished
//! response to a [`ResponsePoster`], which owns the way back to the provider.

use std::sync::Arc;
use std::time::Duration;

use las_types::{Event, LasError, ResponseData};
use tracing::debug;

use crate::bus::EventBus;

const BACKPRESSURE_POLL: Duration = Duration::from_millis(5);

/// Sends a finished response back to the provider.
pub trait ResponsePoster: Send + Sync {
    /// Post `event`. Called exactly once per handled inbound event.
    fn post_response(&self, event: Event<ResponseData>) -> Result<(), LasError>;
}

/// Posts responses onto the bus's upstream lane.
///
/// Blocks while the lane is full so a slow reader never loses a response.
/// Call it from a blocking context, never on an async worker.
#[derive(Clone, Debug)]
pub struct BusResponsePoster {
    bus: Arc<EventBus>,
}

impl BusResponsePoster {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl ResponsePoster for BusResponsePoster {
    fn post_response(&self, event: Event<ResponseData>) -> Result<(), LasError> {
        let corr_id = event.corr_id;
        while self.bus.upstream_full() {
            std::thread::sleep(BACKPRESSURE_POLL);
        }
        let receivers = self.bus.publish_upstream(event)?;
        debug!(%corr_id, receivers, "Response posted upstream");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use las_types::Status;

    #[tokio::test]
    async fn posted_response_reaches_upstream_subscriber() -> Result<(), Box<dyn std::error::Error>> {
        let bus = Arc::new(EventBus::default());
        let mut upstream = bus.subscribe_upstream();
        let poster = BusResponsePoster::new(bus.clone());

        let inbound: Event = Event::new("GET_ALL_LAS", "org", "las", "test");
        let mut response: Event<ResponseData> = inbound.respond();
        response.status = Status::Error;
        poster.post_response(response)?;

        let received = upstream.recv().await?;
        assert_eq!(received.corr_id, inbound.corr_id);
        assert_eq!(received.status, Status::Error);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn post_waits_for_room_on_full_upstream() -> Result<(), Box<dyn std::error::Error>> {
        let bus = Arc::new(EventBus::new(1));
        let mut upstream = bus.subscribe_upstream();
        let poster = BusResponsePoster::new(bus.clone());

        let first: Event = Event::new("GET_ALL_LAS", "org", "las", "test");
        let second: Event = Event::new("GET_ALL_LAS", "org", "las", "test");
        poster.post_response(first.respond())?;
        assert!(bus.upstream_full());

        let pending = second.respond();
        let blocked = tokio::task::spawn_blocking(move || poster.post_response(pending));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished(), "post must wait while the lane is full");

        assert_eq!(upstream.recv().await?.corr_id, first.corr_id);
        blocked.await??;
        assert_eq!(upstream.recv().await?.corr_id, second.corr_id);
        Ok(())
    }

    #[test]
    fn posting_without_listener_fails() {
        let poster = BusResponsePoster::new(Arc::new(EventBus::default()));
        let inbound: Event = Event::new("HEALTH", "org", "las", "test");
        assert!(poster.post_response(inbound.respond()).is_err());
    }
}
