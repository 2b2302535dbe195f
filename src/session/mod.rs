//! Planning sessions held in memory for the web layer.
//!
//! The planner assumes a single caller per session, so each session sits
//! behind its own mutex. Placement and auto-assign on one session never
//! interleave; different sessions proceed independently.

mod planning;

pub use planning::*;

use crate::planner::{CameraDefinition, GatewayConfiguration, PlanError};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Session error types.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("session limit of {0} reached")]
    Full(usize),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

pub type SharedSession = Arc<Mutex<PlanningSession>>;

struct SessionEntry {
    session: SharedSession,
    last_seen: DateTime<Utc>,
}

type SessionMap = HashMap<String, SessionEntry>;

/// Registry of live planning sessions.
///
/// Sessions untouched for longer than the idle timeout are dropped, either
/// by the background sweeper or when a new session needs the slot.
pub struct SessionRegistry {
    sessions: Arc<RwLock<SessionMap>>,
    max_sessions: usize,
    idle_timeout: ChronoDuration,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize, idle_timeout: ChronoDuration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_sessions,
            idle_timeout,
        }
    }

    /// Validate and size a camera list, then register it as a new session.
    pub async fn create(
        &self,
        cameras: Vec<CameraDefinition>,
        configuration: Option<GatewayConfiguration>,
    ) -> Result<SharedSession, SessionError> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        if sessions.len() >= self.max_sessions {
            drop_idle(&mut sessions, now - self.idle_timeout);
        }
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::Full(self.max_sessions));
        }

        let id = loop {
            let candidate = format!("{:016x}", rand::random::<u64>());
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = PlanningSession::new(id.clone(), cameras, configuration)?;
        tracing::info!(
            "Session {}: {} cameras, {} streams, {} x {}",
            id,
            session.cameras.len(),
            session.calculations.total_streams,
            session.assignment.configuration().count,
            session.assignment.configuration().gateway_type
        );

        let shared = Arc::new(Mutex::new(session));
        sessions.insert(
            id,
            SessionEntry {
                session: shared.clone(),
                last_seen: now,
            },
        );
        Ok(shared)
    }

    /// Look up a session and mark it as recently used.
    pub async fn get(&self, id: &str) -> Result<SharedSession, SessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        entry.last_seen = Utc::now();
        Ok(entry.session.clone())
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id).is_some();
        if removed {
            tracing::info!("Session {} removed", id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every session idle since before `now - idle_timeout`.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        drop_idle(&mut sessions, now - self.idle_timeout)
    }

    /// Start the background task that evicts idle sessions once a minute.
    pub fn start_sweeper(self: &Arc<Self>) {
        let registry = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let evicted = registry.evict_idle(Utc::now()).await;
                if evicted > 0 {
                    tracing::debug!("Session sweep evicted {} idle session(s)", evicted);
                }
            }
        });
    }

    #[cfg(test)]
    async fn set_last_seen(&self, id: &str, at: DateTime<Utc>) {
        if let Some(entry) = self.sessions.write().await.get_mut(id) {
            entry.last_seen = at;
        }
    }
}

fn drop_idle(sessions: &mut SessionMap, cutoff: DateTime<Utc>) -> usize {
    let before = sessions.len();
    sessions.retain(|id, entry| {
        let keep = entry.last_seen >= cutoff;
        if !keep {
            tracing::info!("Session {} expired, idle since {}", id, entry.last_seen);
        }
        keep
    });
    before - sessions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::GatewayType;

    fn cameras(count: usize) -> Vec<CameraDefinition> {
        (0..count)
            .map(|i| CameraDefinition {
                name: format!("Camera {}", i + 1),
                lens_count: 1,
                streaming_resolution: 4.0,
                frame_rate: 15,
                recording_resolution: 4.0,
                storage_days: 30,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let registry = SessionRegistry::new(4, ChronoDuration::hours(1));
        let shared = registry.create(cameras(3), None).await.unwrap();
        let id = shared.lock().await.id.clone();
        assert_eq!(id.len(), 16);
        assert_eq!(registry.len().await, 1);

        let fetched = registry.get(&id).await.unwrap();
        assert!(Arc::ptr_eq(&shared, &fetched));

        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(matches!(registry.get(&id).await, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_cameras_are_not_registered() {
        let registry = SessionRegistry::new(4, ChronoDuration::hours(1));
        let result = registry.create(Vec::new(), None).await;
        assert!(matches!(result, Err(SessionError::Plan(PlanError::InvalidInput(_)))));

        let underflow = GatewayConfiguration::new(GatewayType::EightChannel, 1);
        let result = registry.create(cameras(9), Some(underflow)).await;
        assert!(matches!(
            result,
            Err(SessionError::Plan(PlanError::ConfigurationUnderflow { minimum: 2, .. }))
        ));
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_session_limit() {
        let registry = SessionRegistry::new(1, ChronoDuration::hours(1));
        registry.create(cameras(1), None).await.unwrap();
        assert!(matches!(
            registry.create(cameras(1), None).await,
            Err(SessionError::Full(1))
        ));
    }

    #[tokio::test]
    async fn test_idle_session_makes_room() {
        let registry = SessionRegistry::new(1, ChronoDuration::minutes(30));
        let stale = registry.create(cameras(1), None).await.unwrap();
        let stale_id = stale.lock().await.id.clone();

        // Still fresh, so the registry stays full
        assert!(matches!(
            registry.create(cameras(1), None).await,
            Err(SessionError::Full(1))
        ));

        registry
            .set_last_seen(&stale_id, Utc::now() - ChronoDuration::minutes(31))
            .await;
        let fresh = registry.create(cameras(2), None).await.unwrap();
        let fresh_id = fresh.lock().await.id.clone();

        assert_eq!(registry.len().await, 1);
        assert!(matches!(registry.get(&stale_id).await, Err(SessionError::NotFound(_))));
        assert!(registry.get(&fresh_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_refreshes_idle_clock() {
        let registry = SessionRegistry::new(4, ChronoDuration::minutes(30));
        let kept = registry.create(cameras(1), None).await.unwrap();
        let kept_id = kept.lock().await.id.clone();
        let dropped = registry.create(cameras(1), None).await.unwrap();
        let dropped_id = dropped.lock().await.id.clone();

        let long_ago = Utc::now() - ChronoDuration::hours(2);
        registry.set_last_seen(&kept_id, long_ago).await;
        registry.set_last_seen(&dropped_id, long_ago).await;
        registry.get(&kept_id).await.unwrap();

        assert_eq!(registry.evict_idle(Utc::now()).await, 1);
        assert!(registry.get(&kept_id).await.is_ok());
        assert!(matches!(registry.get(&dropped_id).await, Err(SessionError::NotFound(_))));

        // Nothing is idle yet
        assert_eq!(registry.evict_idle(Utc::now()).await, 0);
    }

    #[tokio::test]
    async fn test_sweeper_evicts_in_background() {
        let registry = Arc::new(SessionRegistry::new(4, ChronoDuration::minutes(30)));
        let shared = registry.create(cameras(1), None).await.unwrap();
        let id = shared.lock().await.id.clone();
        registry
            .set_last_seen(&id, Utc::now() - ChronoDuration::hours(1))
            .await;

        // The first tick fires immediately
        registry.start_sweeper();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.len().await, 0);
    }

    #[test]
    fn test_concurrent_auto_assign_is_serialized() {
        tokio_test::block_on(async {
            let registry = Arc::new(SessionRegistry::new(4, ChronoDuration::hours(1)));
            let shared = registry.create(cameras(20), None).await.unwrap();

            let mut handles = Vec::new();
            for _ in 0..8 {
                let shared = shared.clone();
                handles.push(tokio::spawn(async move {
                    let mut session = shared.lock().await;
                    session.assignment.auto_assign();
                    session.assignment.assignment().clone()
                }));
            }

            let mut results = Vec::new();
            for handle in handles {
                results.push(handle.await.unwrap());
            }
            assert!(results.windows(2).all(|w| w[0] == w[1]));
            assert!(shared.lock().await.assignment.is_complete());
        });
    }
}
