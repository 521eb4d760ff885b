//! Explicit analysis sessions.
//!
//! A session is created when a user signs in and owns the sample store for that user's
//! current view. Signing out consumes it. Nothing here lives in a global; the registry is
//! handed to whoever needs it. Sessions abandoned without a sign-out are reclaimed by
//! [`SessionRegistry::sweep_idle`].

use crate::analytics::domain::{MetricCatalog, MetricSample, ValidationError};
use crate::analytics::store::MetricSampleStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} does not exist or was already torn down")]
    UnknownSession(String),
    #[error("a session requires a non-empty user")]
    MissingUser,
}

#[derive(Debug)]
pub struct AnalysisSession {
    id: String,
    user: String,
    started_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    store: MetricSampleStore,
}

impl AnalysisSession {
    pub fn init(
        id: impl Into<String>,
        user: impl Into<String>,
        catalog: MetricCatalog,
    ) -> Result<Self, SessionError> {
        let user = user.into();
        if user.trim().is_empty() {
            return Err(SessionError::MissingUser);
        }

        let now = Utc::now();
        let session = Self {
            id: id.into(),
            user,
            started_at: now,
            last_active: now,
            store: MetricSampleStore::new(catalog),
        };
        info!(session = %session.id, user = %session.user, "analysis session started");
        Ok(session)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// True once `max_idle` has passed since the last use. A clock that moved backwards
    /// never counts as idle.
    pub fn is_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> bool {
        (now - self.last_active)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= max_idle)
    }

    pub fn store(&self) -> &MetricSampleStore {
        &self.store
    }

    pub fn load_samples(&mut self, samples: Vec<MetricSample>) -> Result<usize, ValidationError> {
        let count = samples.len();
        self.store.load(samples)?;
        Ok(count)
    }

    /// Ends the session, discarding its samples. Returns how many were held.
    pub fn teardown(self) -> usize {
        let discarded = self.store.len();
        info!(session = %self.id, user = %self.user, discarded, "analysis session ended");
        discarded
    }
}

/// Live sessions keyed by id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    catalog: MetricCatalog,
    next_id: AtomicU64,
    sessions: Mutex<HashMap<String, AnalysisSession>>,
}

impl SessionRegistry {
    pub fn new(catalog: MetricCatalog) -> Self {
        Self {
            catalog,
            next_id: AtomicU64::new(0),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, AnalysisSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn open(&self, user: &str) -> Result<String, SessionError> {
        let sequence = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("session-{sequence:06}");
        let session = AnalysisSession::init(id.clone(), user, self.catalog.clone())?;
        self.sessions().insert(id.clone(), session);
        Ok(id)
    }

    pub fn close(&self, id: &str) -> Result<usize, SessionError> {
        let session = self
            .sessions()
            .remove(id)
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;
        Ok(session.teardown())
    }

    /// Runs `f` against the session while the registry lock is held, marking it active.
    pub fn with_session<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut AnalysisSession) -> R,
    ) -> Result<R, SessionError> {
        let mut sessions = self.sessions();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;
        session.last_active = Utc::now();
        Ok(f(session))
    }

    /// Tears down every session unused for `max_idle` as of `now`. Returns how many went.
    pub fn sweep_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let expired: Vec<AnalysisSession> = {
            let mut sessions = self.sessions();
            let ids: Vec<String> = sessions
                .values()
                .filter(|session| session.is_idle(max_idle, now))
                .map(|session| session.id.clone())
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        let swept = expired.len();
        for session in expired {
            info!(
                session = %session.id,
                idle_since = %session.last_active,
                "idle session expired"
            );
            session.teardown();
        }
        swept
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(entity: &str, value: f64) -> MetricSample {
        MetricSample {
            entity_id: entity.to_string(),
            entity_label: entity.to_string(),
            department: None,
            metric_name: "performance".to_string(),
            value,
            period_start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            period_end: Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn sessions_are_isolated_and_torn_down() {
        let registry = SessionRegistry::new(MetricCatalog::standard());
        let first = registry.open("ana@example.com").expect("opens");
        let second = registry.open("ben@example.com").expect("opens");
        assert_ne!(first, second);

        registry
            .with_session(&first, |session| session.load_samples(vec![sample("e1", 4.0)]))
            .expect("session exists")
            .expect("valid samples");

        let second_len = registry
            .with_session(&second, |session| session.store().len())
            .expect("session exists");
        assert_eq!(second_len, 0);

        assert_eq!(registry.close(&first), Ok(1));
        assert_eq!(
            registry.close(&first),
            Err(SessionError::UnknownSession(first.clone()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn blank_user_is_rejected() {
        let registry = SessionRegistry::default();
        assert_eq!(registry.open("  "), Err(SessionError::MissingUser));
        assert!(registry.is_empty());
    }

    #[test]
    fn failed_load_keeps_previous_snapshot() {
        let mut session =
            AnalysisSession::init("s-1", "ana", MetricCatalog::standard()).expect("init");
        session.load_samples(vec![sample("e1", 4.0)]).expect("valid");
        assert!(session.load_samples(vec![sample("e2", 9.0)]).is_err());
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.teardown(), 1);
    }

    #[test]
    fn idle_sessions_are_swept_and_active_ones_kept() {
        let registry = SessionRegistry::new(MetricCatalog::standard());
        let stale = registry.open("ana@example.com").expect("opens");
        let fresh = registry.open("ben@example.com").expect("opens");
        let hour = Duration::from_secs(3600);

        registry
            .with_session(&stale, |session| session.load_samples(vec![sample("e1", 4.0)]))
            .expect("session exists")
            .expect("valid samples");
        assert_eq!(registry.sweep_idle(hour, Utc::now()), 0);

        if let Some(session) = registry.sessions().get_mut(&stale) {
            session.last_active -= chrono::Duration::hours(2);
        }
        assert_eq!(registry.sweep_idle(hour, Utc::now()), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.close(&stale),
            Err(SessionError::UnknownSession(stale.clone()))
        );
        assert!(registry.with_session(&fresh, |_| ()).is_ok());
    }

    #[test]
    fn idleness_ignores_a_clock_that_went_backwards() {
        let session =
            AnalysisSession::init("s-1", "ana", MetricCatalog::standard()).expect("init");
        let earlier = session.last_active() - chrono::Duration::minutes(5);
        assert!(!session.is_idle(Duration::ZERO, earlier));
        assert!(session.is_idle(Duration::ZERO, session.last_active()));
        assert!(!session.is_idle(
            Duration::from_secs(60),
            session.last_active() + chrono::Duration::seconds(59)
        ));
    }
}
