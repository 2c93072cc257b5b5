//! [`ActionGate`] – single admission point in front of the event handler.
//!
//! Before an inbound [`Event`] is dispatched it must pass
//! [`EventVerifier::verify`]. The gate runs two checks in order:
//!
//! 1. **Organisation check**: when an allow-list of org ids is configured the
//!    event's `orgId` must be on it. Events for other organisations are
//!    [`Admission::Rejected`] and must be dropped silently.
//! 2. **Action check**: the event's action must be one of
//!    [`LasAction::SUPPORTED`]. Other actions are [`Admission::Unsupported`]
//!    and must be answered with a rejection.
//!
//! Only an [`Admission::Accepted`] event may be dispatched.
//!
//! # Example
//!
//! ```
//! use las_kernel::{ActionGate, Admission, EventVerifier};
//! use las_types::Event;
//!
//! let gate = ActionGate::new().with_org_ids(["oslo.kommune.no"]);
//!
//! let ok: Event = Event::new("GET_ALL_LAS", "oslo.kommune.no", "las", "test");
//! assert_eq!(gate.verify(&ok), Admission::Accepted);
//!
//! let foreign: Event = Event::new("GET_ALL_LAS", "bergen.kommune.no", "las", "test");
//! assert!(matches!(gate.verify(&foreign), Admission::Rejected(_)));
//! ```

use std::collections::HashSet;

use las_types::{Event, LasAction, Status};
use tracing::debug;

/// Verdict on an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// For us, but asks for something we do not do. Answered with
    /// `ADAPTER_REJECTED`.
    Unsupported(String),
    /// Not for us. Dropped without a response.
    Rejected(String),
}

impl Admission {
    /// The envelope status corresponding to this verdict.
    pub fn status(&self) -> Status {
        match self {
            Admission::Accepted => Status::AdapterAccepted,
            Admission::Unsupported(_) | Admission::Rejected(_) => Status::AdapterRejected,
        }
    }
}

/// Classifies inbound events. Implementations must not touch the backend.
pub trait EventVerifier: Send + Sync {
    fn verify(&self, event: &Event) -> Admission;
}

/// Default verifier: supported-action and org-id allow-lists.
#[derive(Debug, Clone)]
pub struct ActionGate {
    actions: HashSet<LasAction>,
    org_ids: HashSet<String>,
}

impl Default for ActionGate {
    fn default() -> Self {
        Self {
            actions: LasAction::SUPPORTED.into_iter().collect(),
            org_ids: HashSet::new(),
        }
    }
}

impl ActionGate {
    /// A gate admitting every supported action from any organisation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict admission to the given org ids. An empty list admits all.
    pub fn with_org_ids<I, S>(mut self, org_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.org_ids = org_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn supports(&self, action: &str) -> bool {
        action
            .parse::<LasAction>()
            .is_ok_and(|action| self.actions.contains(&action))
    }
}

impl EventVerifier for ActionGate {
    fn verify(&self, event: &Event) -> Admission {
        if !self.org_ids.is_empty() && !self.org_ids.contains(&event.org_id) {
            debug!(org_id = %event.org_id, "Event for another organisation");
            return Admission::Rejected(format!("org id {} is not served here", event.org_id));
        }
        if !self.supports(&event.action) {
            debug!(action = %event.action, "Unsupported action");
            return Admission::Unsupported(format!("Unsupported action: {}", event.action));
        }
        Admission::Accepted
    }
}
