//! Quota Tracker: local optimistic view of free usage and subscription.
//!
//! The backend owns the truth about subscriptions, but a round trip must
//! never block composing a message. The tracker trusts its own decrements
//! between refreshes and reconciles only when asked to (startup, after a
//! payment). A failed refresh means "no new information", never an error.

use std::sync::Arc;

use isonnik_types::auth::AuthToken;
use isonnik_types::error::RepositoryError;
use isonnik_types::quota::QuotaState;
use tracing::{debug, info, warn};

use crate::backend::ChatBackend;
use crate::render::SessionSink;
use crate::storage::snapshot::SnapshotStore;
use crate::storage::{KvStore, keys};

pub struct QuotaTracker<S> {
    snapshots: SnapshotStore<S, QuotaState>,
    limit: u32,
}

impl<S> Clone for QuotaTracker<S> {
    fn clone(&self) -> Self {
        Self {
            snapshots: self.snapshots.clone(),
            limit: self.limit,
        }
    }
}

impl<S: KvStore> QuotaTracker<S> {
    /// `limit` is the number of free messages a fresh device starts with.
    pub fn new(store: Arc<S>, limit: u32) -> Self {
        Self {
            snapshots: SnapshotStore::new(store, keys::QUOTA, QuotaState::with_free_messages(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Current quota, defaulting when absent or corrupt.
    pub async fn get_state(&self) -> Result<QuotaState, RepositoryError> {
        self.snapshots.load().await
    }

    pub async fn set_state(&self, state: &QuotaState) -> Result<(), RepositoryError> {
        self.snapshots.save(&state.normalized()).await
    }

    /// Forget the quota entirely (logout).
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        self.snapshots.clear().await
    }

    pub async fn indicator(&self) -> Result<String, RepositoryError> {
        Ok(self.get_state().await?.indicator(self.limit))
    }

    /// Push the current quota to the sink.
    pub async fn render_indicator(
        &self,
        sink: &dyn SessionSink,
    ) -> Result<QuotaState, RepositoryError> {
        let state = self.get_state().await?;
        sink.on_quota_changed(&state, &state.indicator(self.limit));
        Ok(state)
    }

    /// Account for one answered user message and persist.
    pub async fn record_reply(&self) -> Result<QuotaState, RepositoryError> {
        self.update(QuotaState::record_reply).await
    }

    /// The backend refused a message for lack of quota: force `free_left` to 0.
    pub async fn exhaust(&self) -> Result<QuotaState, RepositoryError> {
        self.update(QuotaState::exhaust).await
    }

    /// Best-effort reconciliation with the backend's subscription status.
    ///
    /// Returns the new state when the backend gave a definite answer and it
    /// was persisted and rendered. Every failure (no token, network, auth,
    /// malformed body, storage) leaves local state untouched and yields `None`.
    pub async fn refresh_from_backend<B: ChatBackend>(
        &self,
        backend: &B,
        token: Option<&AuthToken>,
        sink: &dyn SessionSink,
    ) -> Option<QuotaState> {
        let Some(token) = token else {
            debug!("No credential, skipping quota refresh");
            return None;
        };

        let status = match backend.subscription_status(token).await {
            Ok(status) => status,
            Err(e) => {
                debug!(error = %e, "Quota refresh failed, keeping local state");
                return None;
            }
        };

        let Some(active) = status.has_active_subscription else {
            debug!("Subscription status carried no answer, keeping local state");
            return None;
        };

        match self.update(|q| q.apply_subscription(active)).await {
            Ok(state) => {
                info!(subscribed = active, "Quota refreshed from backend");
                sink.on_quota_changed(&state, &state.indicator(self.limit));
                Some(state)
            }
            Err(e) => {
                warn!(error = %e, "Could not persist refreshed quota");
                None
            }
        }
    }

    async fn update(
        &self,
        mutate: impl FnOnce(&mut QuotaState),
    ) -> Result<QuotaState, RepositoryError> {
        let mut state = self.get_state().await?;
        mutate(&mut state);
        self.snapshots.save(&state).await?;
        Ok(state)
    }
}
