//! `las-middleware` – event plumbing between the provider and the handler.
//!
//! Moves events in and out of the adapter without caring what they mean.
//!
//! # Modules
//!
//! - [`bus`] – in-process event bus with a downstream (provider → adapter)
//!   and an upstream (adapter → provider) lane, built on Tokio broadcast
//!   channels.
//! - [`poster`] – the [`ResponsePoster`] seam the handler posts responses
//!   through, and [`BusResponsePoster`], which publishes them upstream.

pub mod bus;
pub mod poster;

pub use bus::{EventBus, Lane, LaneReceiver};
pub use poster::{BusResponsePoster, ResponsePoster};
