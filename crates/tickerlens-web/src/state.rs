//! Shared router state: configuration plus the per-visitor session map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tickerlens_core::{AnalysisSession, AppConfig, ConfigError, ReqwestHttpClient};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Builds a fresh [`AnalysisSession`] for a new visitor.
pub type SessionFactory = Arc<dyn Fn() -> AnalysisSession + Send + Sync>;

struct SessionEntry {
    session: Arc<AnalysisSession>,
    last_seen: Instant,
}

/// Session resolved for one request.
pub struct SessionLease {
    pub id: Uuid,
    pub session: Arc<AnalysisSession>,
    /// The visitor had no live session, so a cookie must be issued.
    pub is_new: bool,
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    factory: SessionFactory,
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    session_ttl: Duration,
}

impl AppState {
    /// Sessions talking to the live providers.
    ///
    /// The resolver's symbol list is loaded here, once, and shared by every
    /// session, so a bad `symbols_file` fails at startup.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        let resolver = config.resolver()?;
        let shared = Arc::new(config.clone());
        let factory: SessionFactory = Arc::new(move || {
            AnalysisSession::with_resolver(&shared, resolver.clone(), Arc::new(ReqwestHttpClient::new()))
        });
        Ok(Self::with_factory(config, factory))
    }

    pub fn with_factory(config: AppConfig, factory: SessionFactory) -> Self {
        Self {
            session_ttl: config.session_ttl(),
            config: Arc::new(config),
            factory,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The live session for `id`, or a new one. Idle sessions are evicted first.
    pub async fn session(&self, id: Option<Uuid>) -> SessionLease {
        {
            let mut sessions = self.sessions.write().await;
            let ttl = self.session_ttl;
            let before = sessions.len();
            sessions.retain(|_, entry| entry.last_seen.elapsed() < ttl);
            if sessions.len() < before {
                debug!(evicted = before - sessions.len(), "evicted idle sessions");
            }

            if let Some(id) = id {
                if let Some(entry) = sessions.get_mut(&id) {
                    entry.last_seen = Instant::now();
                    return SessionLease {
                        id,
                        session: Arc::clone(&entry.session),
                        is_new: false,
                    };
                }
            }
        }

        // Built without holding the map lock.
        let id = Uuid::new_v4();
        let session = Arc::new((self.factory)());
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            id,
            SessionEntry {
                session: Arc::clone(&session),
                last_seen: Instant::now(),
            },
        );
        debug!(session = %id, live = sessions.len(), "started session");
        SessionLease {
            id,
            session,
            is_new: true,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
