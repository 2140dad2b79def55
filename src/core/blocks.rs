use crate::core::error::CoordinatorError;
use crate::models::{InsertOutcome, Session};
use crate::services::{CacheKey, CacheManager, DataStore, StoreError};
use std::sync::Arc;

/// Block relationships, with each user's blocked ids cached until TTL expiry
///
/// The store stays the source of truth. A user's own block/unblock
/// invalidates their cached list immediately; the other side of a pair may
/// observe the change only once its cached entry expires.
#[derive(Clone)]
pub struct BlockList {
    store: Arc<dyn DataStore>,
    cache: Arc<CacheManager>,
}

impl BlockList {
    pub fn new(store: Arc<dyn DataStore>, cache: Arc<CacheManager>) -> Self {
        Self { store, cache }
    }

    /// Users `user_id` has blocked
    pub async fn blocked_ids(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let key = CacheKey::blocked(user_id);
        if let Some(ids) = self.cache.lookup::<Vec<String>>(&key).await {
            return Ok(ids);
        }

        let ids = self.store.list_blocked(user_id).await?;
        self.cache.store(&key, &ids).await;
        Ok(ids)
    }

    /// True when either user has blocked the other
    pub async fn is_blocked_pair(&self, a: &str, b: &str) -> Result<bool, StoreError> {
        if self.blocked_ids(a).await?.iter().any(|id| id == b) {
            return Ok(true);
        }
        Ok(self.blocked_ids(b).await?.iter().any(|id| id == a))
    }

    /// Block `target_id`; blocking twice is not an error
    ///
    /// Also drops the blocker's favorite of the target, if any.
    pub async fn block(
        &self,
        session: &Session,
        target_id: &str,
    ) -> Result<InsertOutcome, CoordinatorError> {
        if session.user_id == target_id {
            return Err(CoordinatorError::SelfBlock);
        }

        let outcome = self.store.insert_block(&session.user_id, target_id).await?;
        self.cache.invalidate(&CacheKey::blocked(&session.user_id)).await;

        if self.store.delete_favorite(&session.user_id, target_id).await? {
            tracing::debug!("Dropped favorite {} -> {} on block", session.user_id, target_id);
        }

        tracing::info!("User {} blocked {} ({:?})", session.user_id, target_id, outcome);
        Ok(outcome)
    }

    /// Remove a block; returns whether one existed
    pub async fn unblock(&self, session: &Session, target_id: &str) -> Result<bool, CoordinatorError> {
        let removed = self.store.delete_block(&session.user_id, target_id).await?;
        self.cache.invalidate(&CacheKey::blocked(&session.user_id)).await;

        tracing::info!("User {} unblocked {} (existed: {})", session.user_id, target_id, removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    fn block_list() -> (Arc<MemoryStore>, BlockList) {
        let store = Arc::new(MemoryStore::new());
        let list = BlockList::new(store.clone(), Arc::new(CacheManager::in_memory(100, 60)));
        (store, list)
    }

    #[tokio::test]
    async fn test_block_is_symmetric_for_pair_check() {
        let (_, list) = block_list();
        list.block(&Session::new("u1"), "u2").await.unwrap();

        assert!(list.is_blocked_pair("u1", "u2").await.unwrap());
        assert!(list.is_blocked_pair("u2", "u1").await.unwrap());
        assert!(!list.is_blocked_pair("u1", "u3").await.unwrap());
    }

    #[tokio::test]
    async fn test_block_twice_is_idempotent() {
        let (_, list) = block_list();
        let session = Session::new("u1");
        assert_eq!(list.block(&session, "u2").await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(list.block(&session, "u2").await.unwrap(), InsertOutcome::AlreadyExists);
        assert_eq!(list.blocked_ids("u1").await.unwrap(), vec!["u2".to_string()]);
    }

    #[tokio::test]
    async fn test_unblock_invalidates_own_cache() {
        let (_, list) = block_list();
        let session = Session::new("u1");
        list.block(&session, "u2").await.unwrap();
        assert_eq!(list.blocked_ids("u1").await.unwrap().len(), 1);

        assert!(list.unblock(&session, "u2").await.unwrap());
        assert!(list.blocked_ids("u1").await.unwrap().is_empty());
        assert!(!list.unblock(&session, "u2").await.unwrap());
    }

    #[tokio::test]
    async fn test_self_block_rejected() {
        let (_, list) = block_list();
        let err = list.block(&Session::new("u1"), "u1").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::SelfBlock));
    }

    #[tokio::test]
    async fn test_block_drops_existing_favorite() {
        let (store, list) = block_list();
        store
            .insert_favorite(&crate::models::FavoriteEdge::new("u1", "u2"))
            .await
            .unwrap();

        list.block(&Session::new("u1"), "u2").await.unwrap();
        assert!(store.find_favorite("u1", "u2").await.unwrap().is_none());
    }
}
