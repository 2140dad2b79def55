use crate::models::{
    FavoriteEdge, InsertOutcome, NewNotification, Notification, PulseCount, Visit,
};
use crate::services::{AppwriteError, PostgresError};
use async_trait::async_trait;
use thiserror::Error;

/// Errors a remote data store can report
///
/// "Row not found" and uniqueness conflicts are not errors here: lookups
/// return `Option` and inserts return [`InsertOutcome`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Appwrite: {0}")]
    Appwrite(#[from] AppwriteError),

    #[error("PostgreSQL: {0}")]
    Postgres(#[from] PostgresError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True for failures caused by the store being unreachable or overloaded
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Appwrite(e) => e.is_transient(),
            StoreError::Postgres(e) => e.is_transient(),
            StoreError::Unavailable(_) => true,
        }
    }
}

/// Remote data store contract
///
/// Every call is a suspension point; no call spans a transaction with
/// another one.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn find_favorite(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<FavoriteEdge>, StoreError>;

    async fn insert_favorite(&self, edge: &FavoriteEdge) -> Result<InsertOutcome, StoreError>;

    /// Returns whether an edge was removed
    async fn delete_favorite(&self, actor_id: &str, target_id: &str) -> Result<bool, StoreError>;

    /// Newest first
    async fn list_favorites(
        &self,
        actor_id: &str,
        limit: usize,
    ) -> Result<Vec<FavoriteEdge>, StoreError>;

    async fn get_pulse_count(&self, user_id: &str) -> Result<Option<PulseCount>, StoreError>;

    /// Atomically increments the counter, creating it at 1 when absent
    async fn increment_pulse_count(&self, user_id: &str) -> Result<PulseCount, StoreError>;

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, StoreError>;

    /// Newest first
    async fn list_notifications(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn count_unread_notifications(&self, user_id: &str) -> Result<u32, StoreError>;

    /// Returns the number of notifications flipped to read
    async fn mark_notifications_read(&self, user_id: &str) -> Result<u64, StoreError>;

    async fn insert_block(
        &self,
        blocker_id: &str,
        blocked_id: &str,
    ) -> Result<InsertOutcome, StoreError>;

    async fn delete_block(&self, blocker_id: &str, blocked_id: &str) -> Result<bool, StoreError>;

    /// Ids of the users `blocker_id` has blocked
    async fn list_blocked(&self, blocker_id: &str) -> Result<Vec<String>, StoreError>;

    /// Creates the visit or refreshes its timestamp
    async fn upsert_visit(&self, visitor_id: &str, profile_id: &str) -> Result<Visit, StoreError>;

    /// Most recent visitors first
    async fn list_visitors(&self, profile_id: &str, limit: usize)
        -> Result<Vec<Visit>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
