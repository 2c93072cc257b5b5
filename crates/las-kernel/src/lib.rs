//! `las-kernel` – admission control
//!
//! Decides whether an inbound event is meant for this adapter before any
//! backend is touched.
//!
//! # Modules
//!
//! - [`action_gate`] – the [`EventVerifier`][action_gate::EventVerifier]
//!   seam and [`ActionGate`][action_gate::ActionGate], which admits events
//!   whose action is supported and whose organisation is served here.

pub mod action_gate;

pub use action_gate::{ActionGate, Admission, EventVerifier};
