//! Application state shared across all request handlers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use uuid::Uuid;

use crate::chat::Conversation;
use crate::config::AppConfig;
use crate::remote::{AwsBackends, IngestionControl, KnowledgeBaseRuntime, ObjectStore};

/// Remote collaborators used by the handlers.
pub struct Backends {
    /// Upload target.
    pub object_store: Arc<dyn ObjectStore>,
    /// Ingestion job control.
    pub ingestion: Arc<dyn IngestionControl>,
    /// Retrieve-and-generate runtime.
    pub knowledge_base: Arc<dyn KnowledgeBaseRuntime>,
}

impl From<AwsBackends> for Backends {
    fn from(aws: AwsBackends) -> Self {
        Self {
            object_store: Arc::new(aws.object_store),
            ingestion: Arc::new(aws.ingestion),
            knowledge_base: Arc::new(aws.knowledge_base),
        }
    }
}

/// A conversation plus when it was last touched.
struct SessionEntry {
    conversation: Arc<Mutex<Conversation>>,
    last_used: Instant,
}

impl SessionEntry {
    fn new(max_messages: usize, now: Instant) -> Self {
        Self {
            conversation: Arc::new(Mutex::new(Conversation::new(max_messages))),
            last_used: now,
        }
    }

    fn is_idle(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_used) > idle_timeout
    }
}

/// Shared application state.
pub struct AppState {
    /// Read-only configuration.
    pub config: AppConfig,
    /// Remote collaborators.
    pub backends: Backends,
    sessions: DashMap<Uuid, SessionEntry>,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AppConfig, backends: Backends) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            config,
            backends,
            sessions: DashMap::new(),
            shutdown,
        })
    }

    /// Conversation of `session_id`, created empty on first use.
    ///
    /// Holding the returned lock serialises submissions within the session.
    /// Creating a session first drops idle ones, then the least recently
    /// used while the table is full.
    #[must_use]
    pub fn session(&self, session_id: Uuid) -> Arc<Mutex<Conversation>> {
        let now = Instant::now();
        if !self.sessions.contains_key(&session_id) {
            self.make_room(now);
        }

        let max_messages = self.config.max_messages;
        let mut entry = self
            .sessions
            .entry(session_id)
            .or_insert_with(|| SessionEntry::new(max_messages, now));
        entry.last_used = now;
        Arc::clone(&entry.conversation)
    }

    /// Snapshot of a session's conversation, if it exists and is not idle.
    pub async fn history(&self, session_id: Uuid) -> Option<Conversation> {
        let idle_timeout = self.config.sessions.idle_timeout;
        let session = self
            .sessions
            .get(&session_id)
            .filter(|entry| !entry.is_idle(Instant::now(), idle_timeout))
            .map(|entry| Arc::clone(&entry.conversation))?;
        let conversation = session.lock().await;
        Some(conversation.clone())
    }

    /// Number of conversations currently held.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn make_room(&self, now: Instant) {
        let limits = self.config.sessions;
        self.sessions
            .retain(|_, entry| !entry.is_idle(now, limits.idle_timeout));

        while self.sessions.len() >= limits.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| entry.last_used)
                .map(|entry| *entry.key());
            let Some(oldest) = oldest else { break };
            self.sessions.remove(&oldest);
        }
        tracing::debug!(sessions = self.session_count(), "session table trimmed");
    }

    /// Signal every in-flight ingestion wait to stop.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Future resolving once [`AppState::shutdown`] has been called.
    pub fn cancellation(&self) -> impl Future<Output = ()> + Send + use<> {
        let mut stopped = self.shutdown.subscribe();
        async move {
            let _ = stopped.wait_for(|stopped| *stopped).await;
        }
    }
}
