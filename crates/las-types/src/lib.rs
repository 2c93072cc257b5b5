use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Action name the provider uses for health probes.
pub const HEALTH_ACTION: &str = "HEALTH";

/// Health component name reported by this adapter.
pub const ADAPTER_COMPONENT: &str = "adapter";

/// The lock-control actions this adapter knows how to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LasAction {
    /// List every door known to the backend.
    GetAllLas,
    /// Lock or unlock a single door.
    UpdateLas,
}

impl LasAction {
    /// Every supported action, in registration order.
    pub const SUPPORTED: [LasAction; 2] = [LasAction::GetAllLas, LasAction::UpdateLas];

    pub fn as_str(&self) -> &'static str {
        match self {
            LasAction::GetAllLas => "GET_ALL_LAS",
            LasAction::UpdateLas => "UPDATE_LAS",
        }
    }
}

impl fmt::Display for LasAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LasAction {
    type Err = LasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LasAction::SUPPORTED
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| LasError::UnsupportedAction(s.to_string()))
    }
}

/// Lifecycle status carried on every event envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    New,
    AdapterAccepted,
    AdapterRejected,
    AdapterResponse,
    TempUpstreamQueue,
    Error,
}

/// Outcome of a write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Accepted,
    Rejected,
}

/// Envelope exchanged with the provider.
///
/// Inbound events carry raw JSON in `data`; outbound events carry
/// [`ResponseData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event<T = serde_json::Value> {
    #[serde(default = "Uuid::new_v4")]
    pub corr_id: Uuid,
    pub action: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub client: String,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<ResponseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Event<T> {
    /// Create a fresh `NEW` event with no data.
    pub fn new(
        action: impl Into<String>,
        org_id: impl Into<String>,
        source: impl Into<String>,
        client: impl Into<String>,
    ) -> Self {
        Self {
            corr_id: Uuid::new_v4(),
            action: action.into(),
            org_id: org_id.into(),
            source: source.into(),
            client: client.into(),
            time: Utc::now(),
            status: Status::New,
            response_status: None,
            message: None,
            data: Vec::new(),
        }
    }

    pub fn is_health_check(&self) -> bool {
        self.action == HEALTH_ACTION
    }

    /// Build a response envelope sharing this event's routing headers
    /// (`corrId`, `action`, `orgId`, `source`, `client`, `time`, `status`)
    /// with empty data and no outcome set.
    pub fn respond<U>(&self) -> Event<U> {
        Event {
            corr_id: self.corr_id,
            action: self.action.clone(),
            org_id: self.org_id.clone(),
            source: self.source.clone(),
            client: self.client.clone(),
            time: self.time,
            status: self.status,
            response_status: None,
            message: None,
            data: Vec::new(),
        }
    }

    pub fn add_data(&mut self, item: T) {
        self.data.push(item);
    }
}

/// Raw per-door record reported by the lock controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockStatus {
    /// HTTP-style status code from the controller (200, 503, …).
    pub status: i32,
    /// Unix timestamp in (possibly fractional) seconds.
    #[serde(default)]
    pub last_seen: Option<f64>,
}

/// Door name → raw record, in the order the backend listed them.
pub type DoorMap = IndexMap<String, LockStatus>;

/// One answer from the backend's status endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockSnapshot {
    pub doors: Option<DoorMap>,
}

impl LockSnapshot {
    pub fn new(doors: DoorMap) -> Self {
        Self { doors: Some(doors) }
    }

    /// The door map, or `None` when it is missing or empty.
    pub fn doors(&self) -> Option<&DoorMap> {
        self.doors.as_ref().filter(|doors| !doors.is_empty())
    }
}

/// Domain view of a door exchanged over the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResource {
    pub system_id: String,
    pub status: String,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_seen_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    ApplicationHealthy,
    ApplicationUnhealthy,
}

/// Health indicator attached to a health-check response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub component: String,
    pub status: HealthStatus,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub time: DateTime<Utc>,
}

impl Health {
    pub fn new(component: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            component: component.into(),
            status,
            time: Utc::now(),
        }
    }
}

/// Payloads the adapter posts back upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    Las(LockResource),
    Health(Health),
}

/// Error type shared by every crate in the adapter.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LasError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Channel error: {0}")]
    Channel(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_parses_supported_names() {
        assert_eq!("GET_ALL_LAS".parse::<LasAction>(), Ok(LasAction::GetAllLas));
        assert_eq!("UPDATE_LAS".parse::<LasAction>(), Ok(LasAction::UpdateLas));
        assert_eq!(
            "DELETE_LAS".parse::<LasAction>(),
            Err(LasError::UnsupportedAction("DELETE_LAS".into()))
        );
    }

    #[test]
    fn event_uses_camel_case_wire_names() {
        let mut event: Event = Event::new("GET_ALL_LAS", "oslo.kommune.no", "las", "test");
        event.response_status = Some(ResponseStatus::Accepted);
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("corrId").is_some());
        assert_eq!(value["orgId"], "oslo.kommune.no");
        assert_eq!(value["status"], "NEW");
        assert_eq!(value["responseStatus"], "ACCEPTED");
        assert!(value.get("message").is_none());
    }

    #[test]
    fn minimal_inbound_event_deserializes_with_defaults() {
        let event: Event = serde_json::from_value(json!({ "action": "HEALTH" })).unwrap();
        assert!(event.is_health_check());
        assert_eq!(event.status, Status::New);
        assert!(event.data.is_empty());
    }

    #[test]
    fn respond_copies_headers_and_clears_payload() {
        let mut event: Event = Event::new("UPDATE_LAS", "org", "las", "client");
        event.status = Status::AdapterAccepted;
        event.message = Some("inbound".into());
        event.add_data(json!({ "systemId": "A", "status": "opened" }));

        let response: Event<ResponseData> = event.respond();
        assert_eq!(response.corr_id, event.corr_id);
        assert_eq!(response.action, "UPDATE_LAS");
        assert_eq!(response.status, Status::AdapterAccepted);
        assert!(response.message.is_none());
        assert!(response.data.is_empty());
    }

    #[test]
    fn lock_resource_last_seen_is_millis_on_the_wire() {
        let resource = LockResource {
            system_id: "front".into(),
            status: "ukjent".into(),
            last_seen_at: DateTime::from_timestamp_millis(1_700_000_000_000),
        };
        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value, json!({ "systemId": "front", "status": "ukjent", "lastSeenAt": 1_700_000_000_000i64 }));

        let parsed: LockResource =
            serde_json::from_value(json!({ "systemId": "front", "status": "opened" })).unwrap();
        assert!(parsed.last_seen_at.is_none());
    }

    #[test]
    fn response_data_is_untagged() {
        let health = ResponseData::Health(Health::new(ADAPTER_COMPONENT, HealthStatus::ApplicationHealthy));
        let value = serde_json::to_value(&health).unwrap();
        assert_eq!(value["component"], "adapter");
        assert_eq!(value["status"], "APPLICATION_HEALTHY");

        let back: ResponseData = serde_json::from_value(value).unwrap();
        assert!(matches!(back, ResponseData::Health(_)));
    }

    #[test]
    fn snapshot_treats_empty_door_map_as_missing() {
        assert!(LockSnapshot::default().doors().is_none());
        assert!(LockSnapshot::new(DoorMap::new()).doors().is_none());

        let mut doors = DoorMap::new();
        doors.insert("A".into(), LockStatus { status: 200, last_seen: None });
        assert_eq!(LockSnapshot::new(doors).doors().map(|d| d.len()), Some(1));
    }

    #[test]
    fn las_error_display() {
        let err = LasError::BackendUnavailable("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }
}
