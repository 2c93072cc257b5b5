//! `las-hal` – door-lock backend access.
//!
//! The adapter never talks to the lock controller directly; it goes through a
//! [`LockBackend`].
//!
//! # Modules
//!
//! - [`backend`] – the [`LockBackend`] trait and the [`DoorCommand`] verbs.
//! - [`client`] – [`BackendClient`][client::BackendClient]: blocking REST
//!   client for the controller, authenticated with HTTP Basic credentials.
//! - [`sim`] – [`SimBackend`][sim::SimBackend]: in-process backend that
//!   records calls, for tests and for running without a controller.

pub mod backend;
pub mod client;
pub mod sim;

pub use backend::{DoorCommand, LockBackend};
pub use client::{BackendClient, parse_status_body};
pub use sim::SimBackend;
