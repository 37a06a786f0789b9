//! Service configuration.
//!
//! One YAML file, every field defaulted, loaded once at startup. The load
//! is corruption-tolerant: a missing file is a fresh default configuration,
//! an unreadable or unparseable file logs a warning and falls back to the
//! defaults rather than refusing to boot a BMC.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

/// Environment variable pointing at the configuration file.
pub const CONFIG_ENV: &str = "REDFISHD_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "/etc/redfishd/config.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Fallback bind address when no sockets are inherited.
    pub bind_address: String,
    pub tls_certificate: PathBuf,
    pub tls_key: PathBuf,
    /// Directory for the persisted session and subscription tables.
    pub persistent_dir: PathBuf,
    pub session_idle_timeout_secs: u64,
    pub max_sessions_per_user: usize,
    /// Retention bound for the task deque.
    pub max_task_count: usize,
    pub task_timeout_secs: u64,
    /// `Retry-After` advertised on task monitors.
    pub task_retry_after_secs: u64,
    pub max_body_bytes: usize,
    pub event_delivery_retries: u32,
    /// Role privilege overrides, role name to privilege names.
    pub roles: HashMap<String, Vec<String>>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            bind_address: "[::]:8443".to_string(),
            tls_certificate: PathBuf::from("/etc/redfishd/server.crt"),
            tls_key: PathBuf::from("/etc/redfishd/server.key"),
            persistent_dir: PathBuf::from("/var/lib/redfishd"),
            session_idle_timeout_secs: 1800,
            max_sessions_per_user: 4,
            max_task_count: 100,
            task_timeout_secs: 300,
            task_retry_after_secs: 30,
            max_body_bytes: 30 * 1024 * 1024,
            event_delivery_retries: 3,
            roles: HashMap::new(),
        }
    }
}

impl ServiceConfig {
    /// Load from `path`, from `$REDFISHD_CONFIG`, or from the default
    /// location, in that order of preference.
    pub fn load(path: Option<&Path>) -> ServiceConfig {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration file, using defaults");
                return ServiceConfig::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read configuration, using defaults");
                return ServiceConfig::default();
            }
        };
        match serde_yaml::from_str(&data) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse configuration, using defaults");
                ServiceConfig::default()
            }
        }
    }

    pub fn session_store_path(&self) -> PathBuf {
        self.persistent_dir.join("sessions.json")
    }

    pub fn subscription_store_path(&self) -> PathBuf {
        self.persistent_dir.join("subscriptions.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_task_count, 100);
        assert_eq!(config.session_idle_timeout_secs, 1800);
        assert!(config.roles.is_empty());
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_task_count: 10\nbind_address: \"127.0.0.1:9443\"").unwrap();
        let config = ServiceConfig::load(Some(file.path()));
        assert_eq!(config.max_task_count, 10);
        assert_eq!(config.bind_address, "127.0.0.1:9443");
        assert_eq!(config.max_sessions_per_user, 4);
    }

    #[test]
    fn unparseable_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ this is not yaml ]").unwrap();
        let config = ServiceConfig::load(Some(file.path()));
        assert_eq!(config.max_task_count, 100);
    }

    #[test]
    fn missing_file_is_defaults() {
        let config = ServiceConfig::load(Some(Path::new("/nonexistent/redfishd.yaml")));
        assert_eq!(config.bind_address, "[::]:8443");
    }
}
