//! Configuration Vault – reads/writes `~/.oslo-las/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted adapter configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the lock controller's REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP Basic username for the controller.
    #[serde(default)]
    pub username: String,

    /// HTTP Basic password (stored as plain text – the file is written with
    /// owner-only permissions).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Organisations served by this adapter. Empty admits every org id.
    #[serde(default)]
    pub org_ids: Vec<String>,

    /// Per-request timeout for controller calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Buffered events per bus lane.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field(
                "password",
                if self.password.is_empty() { &"<not set>" } else { &"<redacted>" },
            )
            .field("org_ids", &self.org_ids)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("bus_capacity", &self.bus_capacity)
            .finish()
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_bus_capacity() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: String::new(),
            password: String::new(),
            org_ids: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl Config {
    /// Reject values the adapter cannot start with.
    pub fn validate(&self) -> Result<(), String> {
        if self.bus_capacity == 0 {
            return Err("bus_capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Return the config path: `$LAS_CONFIG` if set, else
/// `~/.oslo-las/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("LAS_CONFIG") {
        return PathBuf::from(path);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".oslo-las").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path, applying environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    cfg.validate()?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `LAS_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `LAS_BACKEND_URL` | `base_url` |
/// | `LAS_BACKEND_USERNAME` | `username` |
/// | `LAS_BACKEND_PASSWORD` | `password` |
/// | `LAS_ORG_IDS` | `org_ids` (comma separated) |
/// | `LAS_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("LAS_BACKEND_URL") {
        cfg.base_url = v;
    }
    if let Ok(v) = std::env::var("LAS_BACKEND_USERNAME") {
        cfg.username = v;
    }
    if let Ok(v) = std::env::var("LAS_BACKEND_PASSWORD") {
        cfg.password = v;
    }
    if let Ok(v) = std::env::var("LAS_ORG_IDS") {
        cfg.org_ids = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Ok(v) = std::env::var("LAS_REQUEST_TIMEOUT_SECS")
        && let Ok(secs) = v.parse::<u64>()
    {
        cfg.request_timeout_secs = secs;
    }
}

/// Save the config to disk, creating the parent directory if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Restrict the config directory to the owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Write the file with owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serialises every test that reads or writes `LAS_*` variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn config_debug_redacts_password() {
        let cfg = Config {
            password: "door-secret".to_string(),
            ..Config::default()
        };
        let debug_str = format!("{:?}", cfg);
        assert!(!debug_str.contains("door-secret"), "password must not appear in debug output");
        assert!(debug_str.contains("<redacted>"));
    }

    #[test]
    fn config_debug_shows_not_set_for_empty_password() {
        let debug_str = format!("{:?}", Config::default());
        assert!(debug_str.contains("<not set>"));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "config file must have 0o600 permissions");

        let dir_meta = std::fs::metadata(path.parent().unwrap()).expect("dir metadata");
        assert_eq!(dir_meta.permissions().mode() & 0o777, 0o700);
    }

    #[test]
    fn roundtrip_config_file() {
        let _env = env_guard();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config {
            base_url: "https://las.oslo.example/api".to_string(),
            username: "adapter".to_string(),
            password: "secret".to_string(),
            org_ids: vec!["oslo.kommune.no".to_string()],
            ..Config::default()
        };
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.username, "adapter");
        assert_eq!(loaded.org_ids, vec!["oslo.kommune.no".to_string()]);
        assert_eq!(loaded.request_timeout_secs, 30);
        assert_eq!(loaded.bus_capacity, 256);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let _env = env_guard();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "username = \"adapter\"\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.username, "adapter");
        assert!(loaded.password.is_empty());
        assert_eq!(loaded.request_timeout_secs, 30);
    }

    #[test]
    fn config_path_points_to_las_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".oslo-las"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let _env = env_guard();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let _env = env_guard();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = \"soon\"\n").expect("write");
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn zero_bus_capacity_is_rejected() {
        let _env = env_guard();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "bus_capacity = 0\n").expect("write");

        let err = load_from(&path).expect_err("zero capacity must not load");
        assert!(err.contains("bus_capacity"));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn apply_env_overrides_changes_backend_url() {
        let _env = env_guard();
        // SAFETY: ENV_LOCK is held; no other test touches the environment meanwhile.
        unsafe { std::env::set_var("LAS_BACKEND_URL", "http://lock-host:8080") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.base_url, "http://lock-host:8080");
        unsafe { std::env::remove_var("LAS_BACKEND_URL") };
    }

    #[test]
    fn apply_env_overrides_splits_org_ids() {
        let _env = env_guard();
        // SAFETY: ENV_LOCK is held; no other test touches the environment meanwhile.
        unsafe { std::env::set_var("LAS_ORG_IDS", "oslo.kommune.no, , bydel.oslo.no") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.org_ids, vec!["oslo.kommune.no".to_string(), "bydel.oslo.no".to_string()]);
        unsafe { std::env::remove_var("LAS_ORG_IDS") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_timeout() {
        let _env = env_guard();
        // SAFETY: ENV_LOCK is held; no other test touches the environment meanwhile.
        unsafe { std::env::set_var("LAS_REQUEST_TIMEOUT_SECS", "forever") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.request_timeout_secs, 30);
        unsafe { std::env::remove_var("LAS_REQUEST_TIMEOUT_SECS") };
    }
}
