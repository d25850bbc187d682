//! In-memory session store.
//!
//! Epistemic foundation:
//! - K_i: Sessions are independent; one map entry per browser
//! - B_i: The cookie may name a session that was evicted → fresh state
//! - I^R: Idle timeout is configurable
//!
//! Entries are only borrowed for synchronous work. Callers copy what
//! they need out before any `.await`.

use crate::models::{Config, Settings};
use crate::session::SessionState;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Concurrent map from session id to state.
pub struct SessionStore {
    /// Per-session state
    sessions: DashMap<Uuid, SessionState>,
    /// Settings given to new sessions
    defaults: Settings,
    /// Idle time after which a session is dropped
    idle_timeout: Duration,
}

impl SessionStore {
    /// Create a new store.
    pub fn new(defaults: Settings, idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            defaults,
            idle_timeout,
        }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Settings::defaults(config),
            Duration::minutes(config.server.session_idle_minutes),
        )
    }

    /// Resolve a session id, creating fresh state for unknown or missing ids.
    ///
    /// Returns the id to keep using and whether it is new.
    pub fn resolve(&self, id: Option<Uuid>) -> (Uuid, bool) {
        if let Some(id) = id {
            if self.sessions.contains_key(&id) {
                return (id, false);
            }
        }
        let id = Uuid::new_v4();
        self.sessions.insert(id, SessionState::new(self.defaults));
        debug!(session = %id, "Session created");
        (id, true)
    }

    /// Run `f` against a session's state, creating it if absent.
    pub fn with<R>(&self, id: Uuid, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut entry = self
            .sessions
            .entry(id)
            .or_insert_with(|| SessionState::new(self.defaults));
        entry.touch();
        f(entry.value_mut())
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn remove(&self, id: Uuid) -> Option<SessionState> {
        self.sessions.remove(&id).map(|(_, state)| state)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle longer than the timeout. Returns the number dropped.
    pub fn evict_idle(&self) -> usize {
        let cutoff = Utc::now() - self.idle_timeout;
        let before = self.sessions.len();
        self.sessions.retain(|_, state| state.touched_at() >= cutoff);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            info!(evicted = evicted, remaining = self.sessions.len(), "Evicted idle sessions");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(idle_minutes: i64) -> SessionStore {
        SessionStore::from_config(&Config {
            server: crate::models::ServerConfig {
                session_idle_minutes: idle_minutes,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[test]
    fn test_resolve_creates_and_reuses() {
        let store = store(60);
        let (id, created) = store.resolve(None);
        assert!(created);

        let (again, created) = store.resolve(Some(id));
        assert_eq!(again, id);
        assert!(!created);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_id_gets_fresh_session() {
        let store = store(60);
        let stale = Uuid::new_v4();
        let (id, created) = store.resolve(Some(stale));
        assert!(created);
        assert_ne!(id, stale);
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = store(60);
        let (a, _) = store.resolve(None);
        let (b, _) = store.resolve(None);

        store.with(a, |s| {
            let mut settings = s.settings();
            settings.questions_per_level = 8;
            s.set_settings(settings)
        });

        assert_eq!(store.with(a, |s| s.settings().questions_per_level), 8);
        assert_eq!(store.with(b, |s| s.settings().questions_per_level), 5);
    }

    #[test]
    fn test_new_sessions_use_config_defaults() {
        let store = store(60);
        let (id, _) = store.resolve(None);
        let settings = store.with(id, |s| s.settings());
        assert_eq!(settings.chunk_size, 1200);
        assert_eq!(settings.chunk_overlap, 240);
    }

    #[test]
    fn test_evict_idle() {
        let store = store(0);
        let (id, _) = store.resolve(None);
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert_eq!(store.evict_idle(), 1);
        assert!(!store.contains(id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_evict_keeps_recent() {
        let store = store(60);
        store.resolve(None);
        assert_eq!(store.evict_idle(), 0);
        assert_eq!(store.len(), 1);
    }
}
