//! [`EventHandler`] – turns one inbound event into at most one response.
//!
//! ```text
//! received ─┬─ HEALTH ─────────────► status() ─► TEMP_UPSTREAM_QUEUE + Health
//!           └─ verify ─┬─ rejected ────► dropped, nothing posted
//!                      ├─ unsupported ─► ADAPTER_REJECTED
//!                      └─ accepted ────► dispatch ─► ADAPTER_RESPONSE / ADAPTER_REJECTED / ERROR
//! ```
//!
//! Health probes are answered before admission so that a probe never needs
//! to be on the supported-action list.
//!
//! Write outcomes are always explicit: an update whose payload cannot be
//! parsed, whose requested state is unknown, or whose backend call fails is
//! answered with `responseStatus = REJECTED` and a message.

use std::sync::Arc;

use las_hal::{DoorCommand, LockBackend};
use las_kernel::{Admission, EventVerifier};
use las_middleware::ResponsePoster;
use las_types::{
    ADAPTER_COMPONENT, Event, Health, HealthStatus, LasAction, LockResource, ResponseData,
    ResponseStatus, Status,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::mapper::to_lock_resource;

/// Message attached to an unhealthy health-check response.
pub const UNHEALTHY_MESSAGE: &str = "The adapter is unable to communicate with the application.";

/// Message attached when an update event carries no parseable resource.
pub const UNPARSEABLE_PAYLOAD_MESSAGE: &str = "Unable to parse lock resource from event data";

type ActionFn = fn(&EventHandler, &Event, &mut Event<ResponseData>);

/// Static dispatch table: action → handler.
const ACTIONS: [(LasAction, ActionFn); 2] = [
    (LasAction::GetAllLas, EventHandler::on_get_all_las),
    (LasAction::UpdateLas, EventHandler::on_update_las),
];

/// Map a requested lock state (case-insensitive) to the controller verb.
pub fn requested_command(state: &str) -> Option<DoorCommand> {
    match state.to_uppercase().as_str() {
        "OPENED" | "UNLOCKED" | "SESAME" => Some(DoorCommand::Unlock),
        "CLOSED" | "LOCKED" => Some(DoorCommand::Lock),
        _ => None,
    }
}

/// Canonical status echoed back after a successful write.
fn confirmed_status(command: DoorCommand) -> &'static str {
    match command {
        DoorCommand::Unlock => "opened",
        DoorCommand::Lock => "closed",
    }
}

/// Read a [`LockResource`] from one data entry: either the JSON object itself
/// or a JSON string holding it.
fn parse_lock_resource(value: &Value) -> Option<LockResource> {
    match value {
        Value::String(raw) => serde_json::from_str(raw).ok(),
        other => LockResource::deserialize(other).ok(),
    }
}

/// Orchestrates verification, backend calls, mapping and response posting.
///
/// Holds no per-event state; one instance serves the whole process.
pub struct EventHandler {
    backend: Arc<dyn LockBackend>,
    verifier: Arc<dyn EventVerifier>,
    poster: Arc<dyn ResponsePoster>,
}

impl EventHandler {
    pub fn new(
        backend: Arc<dyn LockBackend>,
        verifier: Arc<dyn EventVerifier>,
        poster: Arc<dyn ResponsePoster>,
    ) -> Self {
        Self {
            backend,
            verifier,
            poster,
        }
    }

    /// Handle `event` and post the response, if any.
    ///
    /// Never panics on bad input and never propagates errors: a failed post
    /// is logged and the caller moves on to the next event.
    #[instrument(skip(self, event), fields(corr_id = %event.corr_id, action = %event.action))]
    pub fn handle_event(&self, event: &Event) {
        let Some(response) = self.respond(event) else {
            return;
        };
        if let Err(e) = self.poster.post_response(response) {
            error!(error = %e, "Failed to post response");
        }
    }

    /// Build the response for `event` without posting it.
    ///
    /// Returns `None` when the verifier says the event is not for us.
    pub fn respond(&self, event: &Event) -> Option<Event<ResponseData>> {
        if event.is_health_check() {
            return Some(self.health_check_response(event));
        }

        let mut response = event.respond();
        let verdict = self.verifier.verify(event);
        match &verdict {
            Admission::Accepted => {}
            Admission::Unsupported(reason) => {
                warn!(%reason, "Event rejected by verifier");
                response.status = verdict.status();
                response.message = Some(reason.clone());
                return Some(response);
            }
            Admission::Rejected(reason) => {
                warn!(%reason, "Event not admitted, dropping");
                return None;
            }
        }

        response.status = Status::AdapterResponse;
        match ACTIONS.iter().find(|(action, _)| action.as_str() == event.action) {
            Some((_, handler)) => handler(self, event, &mut response),
            None => {
                warn!("Unsupported action");
                response.status = Status::AdapterRejected;
                response.message = Some(format!("Unsupported action: {}", event.action));
            }
        }
        Some(response)
    }

    fn on_get_all_las(&self, _event: &Event, response: &mut Event<ResponseData>) {
        info!("GetAllLas");
        let snapshot = match self.backend.status() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Backend status failed");
                response.status = Status::Error;
                response.message = Some(e.to_string());
                return;
            }
        };

        let Some(doors) = snapshot.doors() else {
            error!("Invalid result, no doors reported");
            response.status = Status::Error;
            response.message = Some("Backend reported no doors".to_string());
            return;
        };

        info!(doors = doors.len(), "Result");
        for (name, raw) in doors {
            response.add_data(ResponseData::Las(to_lock_resource(name, raw)));
        }
    }

    fn on_update_las(&self, event: &Event, response: &mut Event<ResponseData>) {
        info!(entries = event.data.len(), "UpdateLas");

        let Some(mut las) = event.data.iter().find_map(parse_lock_resource) else {
            warn!("No parseable lock resource in event data");
            reject(response, UNPARSEABLE_PAYLOAD_MESSAGE.to_string());
            return;
        };
        info!(door = %las.system_id, requested = %las.status, "Input");

        let Some(command) = requested_command(&las.status) else {
            let message = format!("Unknown lock state requested: {}", las.status);
            reject(response, message);
            return;
        };

        let done = match command {
            DoorCommand::Unlock => self.backend.unlock(&las.system_id),
            DoorCommand::Lock => self.backend.lock(&las.system_id),
        };

        if done {
            response.response_status = Some(ResponseStatus::Accepted);
            las.status = confirmed_status(command).to_string();
            response.data = vec![ResponseData::Las(las)];
        } else {
            let message = format!("Backend call failed: {command} {}", las.system_id);
            error!(%message, "Door command not applied");
            reject(response, message);
        }
    }

    fn health_check_response(&self, event: &Event) -> Event<ResponseData> {
        let mut response = event.respond();
        response.status = Status::TempUpstreamQueue;

        if self.health_check() {
            response.add_data(ResponseData::Health(Health::new(
                ADAPTER_COMPONENT,
                HealthStatus::ApplicationHealthy,
            )));
        } else {
            response.add_data(ResponseData::Health(Health::new(
                ADAPTER_COMPONENT,
                HealthStatus::ApplicationUnhealthy,
            )));
            response.message = Some(UNHEALTHY_MESSAGE.to_string());
        }
        response
    }

    /// Healthy iff the backend answers with at least one door.
    fn health_check(&self) -> bool {
        info!("Health Check");
        match self.backend.status() {
            Ok(snapshot) => snapshot.doors().is_some(),
            Err(e) => {
                warn!(error = %e, "Backend unreachable during health check");
                false
            }
        }
    }
}

fn reject(response: &mut Event<ResponseData>, message: String) {
    response.response_status = Some(ResponseStatus::Rejected);
    response.message = Some(message);
}
