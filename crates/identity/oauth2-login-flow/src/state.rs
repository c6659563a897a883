//! Pending `state` values for CSRF protection of the callback.

use crate::error::{LoginError, LoginResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A `state` value issued on `/login` and awaiting its callback
#[derive(Debug, Clone)]
pub struct PendingState {
    pub state: String,
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingState {
    pub fn new(redirect_uri: String, ttl_seconds: u64) -> Self {
        let created_at = Utc::now();
        // Capped so the addition below cannot overflow
        let ttl = ttl_seconds.min(u64::from(u32::MAX)) as i64;
        let expires_at = created_at + Duration::seconds(ttl);

        Self {
            state: Uuid::new_v4().to_string(),
            redirect_uri,
            created_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Storage for pending states
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Store a new state
    async fn store(&self, state: PendingState) -> LoginResult<()>;

    /// Retrieve and remove a state; each value is accepted at most once
    async fn take(&self, state: &str) -> LoginResult<PendingState>;

    /// Drop expired states, returning how many were removed
    async fn cleanup_expired(&self) -> LoginResult<usize>;
}

/// Process-local state store
#[derive(Default)]
pub struct InMemoryStateStore {
    states: Arc<RwLock<HashMap<String, PendingState>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn store(&self, state: PendingState) -> LoginResult<()> {
        let mut states = self.states.write().await;
        states.insert(state.state.clone(), state);
        Ok(())
    }

    async fn take(&self, state: &str) -> LoginResult<PendingState> {
        let mut states = self.states.write().await;

        let pending = states.remove(state).ok_or(LoginError::InvalidState)?;

        if pending.is_expired() {
            return Err(LoginError::InvalidState);
        }

        Ok(pending)
    }

    async fn cleanup_expired(&self) -> LoginResult<usize> {
        let mut states = self.states.write().await;
        let before = states.len();
        let now = Utc::now();

        states.retain(|_, state| state.expires_at >= now);

        Ok(before - states.len())
    }
}
