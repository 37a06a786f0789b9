//! Session records and the session table.
//!
//! Sessions are the only authenticated principal. Ids carry ~190 bits of
//! entropy and are handed out exactly once, in the login response; they are
//! never logged and the `Debug` impl redacts them.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An authenticated principal.
pub struct Session {
    pub id: String,
    pub client_id: Option<String>,
    pub username: String,
    pub role: String,
    pub created: DateTime<Utc>,
    pub client_ip: Option<IpAddr>,
    /// Basic-auth sessions live for one request and never enter the table.
    pub ephemeral: bool,
    last_used: RwLock<Instant>,
}

impl Session {
    fn touch(&self) {
        *self.last_used.write().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_used
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .elapsed()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &"<redacted>")
            .field("username", &self.username)
            .field("role", &self.role)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

/// On-disk record; the running `last_used` clock restarts on load.
#[derive(Serialize, Deserialize)]
struct PersistedSession {
    id: String,
    client_id: Option<String>,
    username: String,
    role: String,
    created: DateTime<Utc>,
    client_ip: Option<IpAddr>,
}

/// The session table.
///
/// Mutations persist best-effort to a JSON file; a persistence failure is a
/// warning, never a request failure. Loading discards unparseable records
/// with a warning instead of refusing to start.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    idle_timeout: Duration,
    per_user_limit: usize,
    store_path: Option<PathBuf>,
}

impl SessionRegistry {
    pub fn new(
        idle_timeout: Duration,
        per_user_limit: usize,
        store_path: Option<PathBuf>,
    ) -> SessionRegistry {
        SessionRegistry {
            sessions: DashMap::new(),
            idle_timeout,
            per_user_limit,
            store_path,
        }
    }

    /// Generate an unguessable session id.
    pub fn generate_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }

    /// Create and store a session. When the user is at the per-user limit,
    /// their oldest session is evicted first.
    pub fn create(
        &self,
        username: &str,
        role: &str,
        client_id: Option<String>,
        client_ip: Option<IpAddr>,
    ) -> Arc<Session> {
        let mut owned: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .filter(|e| e.value().username == username)
            .map(|e| e.value().clone())
            .collect();
        if owned.len() >= self.per_user_limit {
            owned.sort_by_key(|s| s.created);
            let keep = self.per_user_limit.max(1) - 1;
            for session in owned.iter().take(owned.len() - keep) {
                debug!(username, "evicting oldest session for user at limit");
                self.sessions.remove(&session.id);
            }
        }

        let session = Arc::new(Session {
            id: Self::generate_id(),
            client_id,
            username: username.to_string(),
            role: role.to_string(),
            created: Utc::now(),
            client_ip,
            ephemeral: false,
            last_used: RwLock::new(Instant::now()),
        });
        self.sessions.insert(session.id.clone(), session.clone());
        self.persist();
        session
    }

    /// A per-request session for Basic authentication; never stored.
    pub fn ephemeral(username: &str, role: &str, client_ip: Option<IpAddr>) -> Arc<Session> {
        Arc::new(Session {
            id: Self::generate_id(),
            client_id: None,
            username: username.to_string(),
            role: role.to_string(),
            created: Utc::now(),
            client_ip,
            ephemeral: true,
            last_used: RwLock::new(Instant::now()),
        })
    }

    /// Resolve an `X-Auth-Token` value. Expired sessions are removed on the
    /// way; live ones get their activity clock touched.
    pub fn auth_token(&self, token: &str) -> Option<Arc<Session>> {
        let session = self.sessions.get(token).map(|e| e.value().clone())?;
        if session.idle_for() > self.idle_timeout {
            self.sessions.remove(token);
            self.persist();
            return None;
        }
        session.touch();
        Some(session)
    }

    /// Look up by id without touching the activity clock.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|e| e.value().clone())
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(id).map(|(_, s)| s);
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn all(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Load persisted sessions. A record that fails to parse is dropped
    /// with a warning; a missing file is a fresh start.
    pub fn load(&self) {
        let Some(path) = &self.store_path else {
            return;
        };
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read session store");
                return;
            }
        };
        let records: Vec<serde_json::Value> = match serde_json::from_slice(&data) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "session store is corrupt, discarding");
                return;
            }
        };
        for record in records {
            match serde_json::from_value::<PersistedSession>(record) {
                Ok(record) => {
                    let session = Arc::new(Session {
                        id: record.id.clone(),
                        client_id: record.client_id,
                        username: record.username,
                        role: record.role,
                        created: record.created,
                        client_ip: record.client_ip,
                        ephemeral: false,
                        last_used: RwLock::new(Instant::now()),
                    });
                    self.sessions.insert(record.id, session);
                }
                Err(e) => warn!(error = %e, "discarding unparseable session record"),
            }
        }
    }

    fn persist(&self) {
        let Some(path) = &self.store_path else {
            return;
        };
        let records: Vec<PersistedSession> = self
            .sessions
            .iter()
            .map(|e| {
                let s = e.value();
                PersistedSession {
                    id: s.id.clone(),
                    client_id: s.client_id.clone(),
                    username: s.username.clone(),
                    role: s.role.clone(),
                    created: s.created,
                    client_ip: s.client_ip,
                }
            })
            .collect();
        let data = match serde_json::to_vec(&records) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "failed to serialize session store");
                return;
            }
        };
        if let Err(e) = std::fs::write(path, data) {
            warn!(path = %path.display(), error = %e, "failed to write session store");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Duration::from_secs(1800), 2, None)
    }

    #[test]
    fn ids_are_long_and_unique() {
        let a = SessionRegistry::generate_id();
        let b = SessionRegistry::generate_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn token_auth_round_trip() {
        let reg = registry();
        let session = reg.create("alice", "Administrator", None, None);
        let found = reg.auth_token(&session.id).expect("live session");
        assert_eq!(found.username, "alice");
        assert!(reg.auth_token("wrong-token").is_none());
    }

    #[test]
    fn idle_sessions_expire() {
        let reg = SessionRegistry::new(Duration::from_secs(0), 2, None);
        let session = reg.create("alice", "Administrator", None, None);
        std::thread::sleep(Duration::from_millis(5));
        assert!(reg.auth_token(&session.id).is_none());
        assert_eq!(reg.len(), 0, "expired session is removed");
    }

    #[test]
    fn per_user_limit_evicts_oldest() {
        let reg = registry();
        let first = reg.create("alice", "Administrator", None, None);
        let _second = reg.create("alice", "Administrator", None, None);
        let _third = reg.create("alice", "Administrator", None, None);
        assert_eq!(reg.len(), 2);
        assert!(reg.get(&first.id).is_none(), "oldest evicted");
    }

    #[test]
    fn debug_never_reveals_id() {
        let reg = registry();
        let session = reg.create("alice", "Administrator", None, None);
        let debug = format!("{session:?}");
        assert!(!debug.contains(&session.id));
    }

    #[test]
    fn corrupt_store_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let good = serde_json::json!({
            "id": "abc123", "client_id": null, "username": "alice",
            "role": "Administrator", "created": Utc::now(), "client_ip": null,
        });
        let bad = serde_json::json!({"nonsense": true});
        std::fs::write(&path, serde_json::to_vec(&vec![good, bad]).unwrap()).unwrap();

        let reg = SessionRegistry::new(Duration::from_secs(1800), 4, Some(path));
        reg.load();
        assert_eq!(reg.len(), 1);
        assert!(reg.get("abc123").is_some());
    }
}
