// src/session/countdown.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::Mutex, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

use super::machine::{AttemptSession, FinalizeTrigger};
use crate::repository::QuizRepository;

pub const TICK: Duration = Duration::from_secs(1);

/// Spawns the one-second countdown for `session`.
///
/// The task stops as soon as `cancel` fires or the session leaves
/// `InProgress`. When the countdown reaches zero it finalizes the session
/// with whatever selections exist at that instant.
pub fn spawn_countdown(
    session: Arc<Mutex<AttemptSession>>,
    repo: Arc<dyn QuizRepository>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let mut guard = session.lock().await;
            // Abandonment may have raced with this tick.
            if cancel.is_cancelled() || !guard.is_in_progress() {
                break;
            }

            if guard.tick() {
                tracing::info!(session_id = %guard.id(), "Time is up, submitting automatically");
                if let Err(e) = guard.finalize(repo.as_ref(), FinalizeTrigger::Timeout).await {
                    tracing::error!(
                        session_id = %guard.id(),
                        "Automatic submission rejected: {}",
                        e
                    );
                }
                cancel.cancel();
                break;
            }
        }

        tracing::debug!("Countdown stopped");
    })
}
