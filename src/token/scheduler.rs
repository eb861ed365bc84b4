//! Deferred token deletion.
//!
//! Every token with an expiration gets a one-shot deferred action that
//! removes it from the store when its lifetime elapses. Actions are keyed
//! by a deterministic hash of the token id, so revocation can cancel a
//! pending action without any shared state beyond the id itself. The
//! deferred delete and an explicit revoke may race; both funnel into the
//! same idempotent recursive delete.

use crate::token::store::TokenStore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is shut down")]
    Closed,
}

/// Deterministic action id for a token: the hex SHA-256 of its id.
///
/// Any process knowing the token id can recompute it to cancel the
/// pending action.
#[must_use]
pub fn task_id(token_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token_id.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct ExpirationScheduler {
    store: Arc<dyn TokenStore>,
    pending: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    closed: Arc<AtomicBool>,
}

impl ExpirationScheduler {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            pending: Arc::new(Mutex::new(HashMap::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Arm the deferred deletion of a token.
    ///
    /// # Errors
    /// Fails when the scheduler is shut down; the caller must not leave
    /// the token persisted in that case.
    pub fn schedule(&self, token_id: &str, ttl_seconds: f64) -> Result<(), SchedulerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SchedulerError::Closed);
        }

        let action_id = task_id(token_id);
        let store = self.store.clone();
        let pending = self.pending.clone();
        let id = token_id.to_string();
        let action = action_id.clone();

        let handle = tokio::spawn(async move {
            sleep(Duration::from_secs_f64(ttl_seconds)).await;

            match store.remove(&id).await {
                Ok(()) => debug!("expired token {} removed", id),
                Err(err) => warn!("failed to remove expired token {id}: {err}"),
            }

            if let Ok(mut map) = pending.lock() {
                map.remove(&action);
            }
        });

        let mut map = self
            .pending
            .lock()
            .map_err(|_| SchedulerError::Closed)?;
        // Re-arming the same token replaces the previous action.
        if let Some(previous) = map.insert(action_id, handle) {
            previous.abort();
        }

        Ok(())
    }

    /// Deregister the pending action for a token.
    ///
    /// A no-op when the action already fired or never existed.
    pub fn cancel(&self, token_id: &str) {
        let action_id = task_id(token_id);

        if let Ok(mut map) = self.pending.lock() {
            if let Some(handle) = map.remove(&action_id) {
                handle.abort();
                debug!("cancelled expiration of token {}", token_id);
            }
        }
    }

    /// Stop accepting new actions and drop the pending ones.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);

        if let Ok(mut map) = self.pending.lock() {
            for (_, handle) in map.drain() {
                handle.abort();
            }
        }
    }
}

/// Periodic sweep deleting tokens whose deadline passed while no deferred
/// action was armed, e.g. across a daemon restart.
pub fn spawn_expired_sweep(store: Arc<dyn TokenStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);

        loop {
            ticker.tick().await;

            let tokens = match store.list().await {
                Ok(tokens) => tokens,
                Err(err) => {
                    warn!("expired token sweep skipped: {err}");
                    continue;
                }
            };

            for token in tokens.iter().filter(|token| token.is_expired()) {
                match store.remove(&token.token).await {
                    Ok(()) => debug!("swept expired token {}", token.token),
                    Err(err) => warn!("failed to sweep token {}: {err}", token.token),
                }
            }
        }
    })
}
