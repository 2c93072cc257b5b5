//! [`BackendClient`] – blocking REST client for the door-lock controller.
//!
//! The controller exposes three endpoints under a fixed base URL:
//!
//! | Method | Path | Result |
//! |---|---|---|
//! | `GET` | `/status` | JSON map of door name → `{status, last_seen}` |
//! | `POST` | `/doors/{id}/unlock` | 2xx on success, body ignored |
//! | `POST` | `/doors/{id}/lock` | 2xx on success, body ignored |
//!
//! Every request carries an HTTP Basic `Authorization` header.

use std::fmt;
use std::time::Duration;

use las_types::{DoorMap, LasError, LockSnapshot};
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use zeroize::Zeroizing;

use crate::backend::{DoorCommand, LockBackend};

/// `{"doors": {...}}` envelope.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WrappedDoors {
    #[serde(default)]
    doors: Option<DoorMap>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusBody {
    Wrapped(WrappedDoors),
    Flat(DoorMap),
}

/// Parse the body of `GET /status`.
///
/// Accepts the `{"doors": {...}}` envelope, a bare door map, or `null`. Door
/// order is preserved.
///
/// # Errors
///
/// Returns [`LasError::BackendUnavailable`] when the body is not valid JSON of
/// either shape.
pub fn parse_status_body(body: &str) -> Result<LockSnapshot, LasError> {
    let parsed: Option<StatusBody> = serde_json::from_str(body)
        .map_err(|e| LasError::BackendUnavailable(format!("malformed status body: {e}")))?;
    let doors = match parsed {
        Some(StatusBody::Wrapped(wrapped)) => wrapped.doors,
        Some(StatusBody::Flat(doors)) => Some(doors),
        None => None,
    };
    Ok(LockSnapshot { doors })
}

/// Synchronous client for the lock controller.
///
/// Construct once at startup and share it; credentials and base URL never
/// change afterwards.
pub struct BackendClient {
    base_url: Url,
    username: String,
    password: Zeroizing<String>,
    http: Client,
}

impl BackendClient {
    /// Create a client for `base_url` (e.g. `"https://las.example.no/api"`).
    ///
    /// `timeout` bounds each request end-to-end.
    ///
    /// # Errors
    ///
    /// Returns [`LasError::BackendUnavailable`] if the URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LasError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LasError::BackendUnavailable(format!("invalid base URL {base_url}: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LasError::BackendUnavailable(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            base_url,
            username: username.into(),
            password: Zeroizing::new(password.into()),
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Attach the Basic credentials to `request`.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.username, Some(self.password.as_str()))
    }

    /// Append `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, LasError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LasError::BackendUnavailable(format!("base URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LockBackend for BackendClient {
    #[instrument(skip(self))]
    fn status(&self) -> Result<LockSnapshot, LasError> {
        let url = self.endpoint(&["status"])?;
        info!(%url, "Status");

        let response = self
            .authorize(self.http.get(url))
            .send()
            .map_err(|e| LasError::BackendUnavailable(format!("status request failed: {e}")))?;

        let code = response.status();
        if !code.is_success() {
            return Err(LasError::BackendUnavailable(format!("status returned HTTP {code}")));
        }

        let body = response
            .text()
            .map_err(|e| LasError::BackendUnavailable(format!("status body unreadable: {e}")))?;
        parse_status_body(&body)
    }

    #[instrument(skip(self))]
    fn execute(&self, command: DoorCommand, door_id: &str) -> bool {
        info!(door = door_id, %command, "Door command");

        let url = match self.endpoint(&["doors", door_id, command.as_str()]) {
            Ok(url) => url,
            Err(e) => {
                warn!(door = door_id, %command, error = %e, "Cannot build door URL");
                return false;
            }
        };

        match self.authorize(self.http.post(url)).send() {
            Ok(response) => {
                let code = response.status();
                let body = response.text().unwrap_or_default();
                info!(door = door_id, %command, status = %code, body = %body, "Response");
                code.is_success()
            }
            Err(e) => {
                warn!(door = door_id, %command, error = %e, "Door command failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    fn client(base_url: &str) -> BackendClient {
        BackendClient::new(base_url, "user", "pass", Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn requests_carry_basic_credentials() -> Result<(), Box<dyn std::error::Error>> {
        let client = client("http://las.local");
        let request = client
            .authorize(client.http.get(client.endpoint(&["status"])?))
            .build()?;
        let header = request.headers().get(AUTHORIZATION).ok_or("missing header")?;
        assert_eq!(header.to_str()?, "Basic dXNlcjpwYXNz");
        Ok(())
    }

    #[test]
    fn endpoint_appends_to_base_path() -> Result<(), Box<dyn std::error::Error>> {
        let client = client("http://las.local/api/");
        let url = client.endpoint(&["doors", "front", "unlock"])?;
        assert_eq!(url.as_str(), "http://las.local/api/doors/front/unlock");
        Ok(())
    }

    #[test]
    fn endpoint_encodes_door_id_as_one_segment() -> Result<(), Box<dyn std::error::Error>> {
        let client = client("http://las.local");
        let url = client.endpoint(&["doors", "a/b", "lock"])?;
        assert_eq!(url.as_str(), "http://las.local/doors/a%2Fb/lock");
        Ok(())
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = BackendClient::new("not a url", "u", "p", Duration::from_secs(1));
        assert!(matches!(result, Err(LasError::BackendUnavailable(_))));
    }

    #[test]
    fn debug_redacts_password() {
        let client = BackendClient::new("http://las.local", "user", "s3cret", Duration::from_secs(1)).unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn unreachable_backend_reports_unavailable_and_false() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let client = BackendClient::new("http://127.0.0.1:9", "u", "p", Duration::from_secs(2)).unwrap();
        assert!(matches!(client.status(), Err(LasError::BackendUnavailable(_))));
        assert!(!client.unlock("front"));
        assert!(!client.lock("front"));
    }

    #[test]
    fn parses_wrapped_body_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let snapshot = parse_status_body(
            r#"{"doors": {"B": {"status": 503, "last_seen": 5}, "A": {"status": 200, "last_seen": null}}}"#,
        )?;
        let doors = snapshot.doors().ok_or("no doors")?;
        let names: Vec<&str> = doors.keys().map(String::as_str).collect();
        assert_eq!(names, ["B", "A"]);
        assert_eq!(doors["B"].last_seen, Some(5.0));
        assert_eq!(doors["A"].last_seen, None);
        Ok(())
    }

    #[test]
    fn parses_flat_body() -> Result<(), Box<dyn std::error::Error>> {
        let snapshot = parse_status_body(r#"{"front": {"status": 200}}"#)?;
        assert_eq!(snapshot.doors().map(|d| d.len()), Some(1));
        Ok(())
    }

    #[test]
    fn null_and_missing_doors_yield_no_map() -> Result<(), Box<dyn std::error::Error>> {
        assert!(parse_status_body("null")?.doors.is_none());
        assert!(parse_status_body(r#"{"doors": null}"#)?.doors.is_none());
        assert!(parse_status_body("{}")?.doors().is_none());
        Ok(())
    }

    #[test]
    fn malformed_body_is_unavailable() {
        assert!(matches!(
            parse_status_body("<html>gateway timeout</html>"),
            Err(LasError::BackendUnavailable(_))
        ));
        assert!(matches!(
            parse_status_body(r#"{"front": {"status": "open"}}"#),
            Err(LasError::BackendUnavailable(_))
        ));
    }
}
