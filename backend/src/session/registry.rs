// src/session/registry.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use super::handle::LiveSession;
use crate::config::FINISHED_SESSION_TTL_SECS;
use crate::repository::{QuizRepository, RepositoryError};

#[derive(Default)]
struct Sessions {
    by_id: HashMap<String, LiveSession>,
    /// (user id, quiz id) -> session id. At most one session per pair.
    by_owner: HashMap<(String, String), String>,
    /// session id -> first time a sweep saw it finished.
    finished_since: HashMap<String, Instant>,
}

impl Sessions {
    fn remove(&mut self, session_id: &str) -> Option<LiveSession> {
        self.finished_since.remove(session_id);
        let removed = self.by_id.remove(session_id)?;
        let key = (removed.user_id().to_string(), removed.quiz_id().to_string());
        if self.by_owner.get(&key).map(String::as_str) == Some(session_id) {
            self.by_owner.remove(&key);
        }
        Some(removed)
    }

    /// Drops sessions that have been finished for at least `ttl`.
    fn evict_finished(&mut self, now: Instant, ttl: Duration) {
        for (id, live) in &self.by_id {
            if live.countdown_cancelled() {
                self.finished_since.entry(id.clone()).or_insert(now);
            }
        }

        let expired: Vec<String> = self
            .finished_since
            .iter()
            .filter(|(_, since)| now.duration_since(**since) >= ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            self.remove(&id);
            tracing::debug!(session_id = %id, "Evicted finished session");
        }
    }
}

/// Live sessions addressable by id.
///
/// Starting a session for a (user, quiz) pair that already has one abandons
/// the previous session first. Submitted, timed out and errored sessions stay
/// readable for `finished_ttl` after the registry notices they finished.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Mutex<Sessions>>,
    finished_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_finished_ttl(Duration::from_secs(FINISHED_SESSION_TTL_SECS))
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_finished_ttl(finished_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Sessions::default())),
            finished_ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Session registry mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Starts and registers a session. Sessions for unknown quizzes are
    /// returned (so the caller can read the error) but not registered.
    pub async fn start(
        &self,
        quiz_id: &str,
        user_id: &str,
        seconds_per_question: u64,
        repo: Arc<dyn QuizRepository>,
    ) -> Result<LiveSession, RepositoryError> {
        let session_id = format!("session-{}", uuid::Uuid::new_v4());
        let live = LiveSession::start(&session_id, quiz_id, user_id, seconds_per_question, repo)
            .await?;

        if live.status().await.error.is_some() {
            return Ok(live);
        }

        let replaced = {
            let mut sessions = self.lock();
            sessions.evict_finished(Instant::now(), self.finished_ttl);
            let key = (user_id.to_string(), quiz_id.to_string());
            let previous = sessions
                .by_owner
                .insert(key, session_id.clone())
                .and_then(|old_id| sessions.remove(&old_id));
            sessions.by_id.insert(session_id, live.clone());
            previous
        };

        if let Some(previous) = replaced {
            tracing::info!(
                session_id = %previous.id(),
                "Replacing existing session for the same user and quiz"
            );
            previous.abandon().await;
        }

        Ok(live)
    }

    pub fn get(&self, session_id: &str) -> Option<LiveSession> {
        let mut sessions = self.lock();
        sessions.evict_finished(Instant::now(), self.finished_ttl);
        sessions.by_id.get(session_id).cloned()
    }

    /// Removes and abandons a session. Returns false if it was unknown.
    pub async fn abandon(&self, session_id: &str) -> bool {
        let removed = self.lock().remove(session_id);

        match removed {
            Some(live) => {
                live.abandon().await;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abandons every registered session. Used on shutdown.
    pub async fn abandon_all(&self) {
        let drained: Vec<LiveSession> = {
            let mut sessions = self.lock();
            sessions.by_owner.clear();
            sessions.finished_since.clear();
            sessions.by_id.drain().map(|(_, live)| live).collect()
        };
        for live in drained {
            live.abandon().await;
        }
    }
}
