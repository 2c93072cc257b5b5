//! `las-runtime` – the adapter's decision logic.
//!
//! # Modules
//!
//! - [`mapper`] – pure conversion from the controller's raw
//!   [`LockStatus`][las_types::LockStatus] records to
//!   [`LockResource`][las_types::LockResource]s.
//! - [`event_handler`] – [`EventHandler`][event_handler::EventHandler]:
//!   answers health probes, admits events through an
//!   [`EventVerifier`], dispatches `GET_ALL_LAS` / `UPDATE_LAS` against a
//!   [`LockBackend`][las_hal::LockBackend] and posts exactly one response per
//!   admitted event.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with an optional OTLP span exporter
//!   (`OTEL_EXPORTER_OTLP_ENDPOINT`).
//!
//! # Admission
//!
//! Every non-health event goes through an [`EventVerifier`] first.
//! [`ActionGate`] is re-exported so callers can wire the default gate without
//! depending on `las-kernel` directly.

pub mod event_handler;
pub mod mapper;
pub mod telemetry;

pub use event_handler::{EventHandler, UNHEALTHY_MESSAGE};
pub use mapper::{map_status, to_lock_resource};
pub use telemetry::{TracerProviderGuard, init_tracing};

pub use las_kernel::{ActionGate, EventVerifier};
