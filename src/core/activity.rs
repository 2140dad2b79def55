use crate::core::badge::Badge;
use crate::core::blocks::BlockList;
use crate::core::error::CoordinatorError;
use crate::models::{Notification, Session, Visit};
use crate::services::DataStore;
use std::sync::Arc;

/// Notifications and profile visits of one authenticated user
pub struct ActivityService {
    session: Session,
    store: Arc<dyn DataStore>,
    blocks: BlockList,
}

impl ActivityService {
    pub fn new(session: Session, store: Arc<dyn DataStore>, blocks: BlockList) -> Self {
        Self {
            session,
            store,
            blocks,
        }
    }

    pub async fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>, CoordinatorError> {
        Ok(self
            .store
            .list_notifications(&self.session.user_id, limit)
            .await?)
    }

    pub async fn unread_count(&self) -> Result<u32, CoordinatorError> {
        Ok(self
            .store
            .count_unread_notifications(&self.session.user_id)
            .await?)
    }

    /// Unread-notification badge ("99+" cap), `None` when nothing is unread
    pub async fn unread_badge(&self) -> Result<Option<Badge>, CoordinatorError> {
        Ok(Badge::unread(self.unread_count().await?))
    }

    pub async fn mark_all_read(&self) -> Result<u64, CoordinatorError> {
        let updated = self
            .store
            .mark_notifications_read(&self.session.user_id)
            .await?;
        tracing::debug!("Marked {} notifications read for {}", updated, self.session.user_id);
        Ok(updated)
    }

    /// Record that the caller viewed `profile_id`
    ///
    /// Self-visits and visits across a block are dropped and return `None`.
    pub async fn record_visit(&self, profile_id: &str) -> Result<Option<Visit>, CoordinatorError> {
        let visitor_id = self.session.user_id.as_str();
        if visitor_id == profile_id {
            return Ok(None);
        }

        if self.blocks.is_blocked_pair(visitor_id, profile_id).await? {
            tracing::debug!("Skipping visit {} -> {}: blocked", visitor_id, profile_id);
            return Ok(None);
        }

        Ok(Some(self.store.upsert_visit(visitor_id, profile_id).await?))
    }

    /// Visitors of the caller's profile, most recent first, minus blocked users
    ///
    /// Each visitor has one visit row per profile, so over-fetching by the
    /// number of blocked users is enough to still fill a page of `limit`.
    pub async fn list_visitors(&self, limit: usize) -> Result<Vec<Visit>, CoordinatorError> {
        let blocked = self.blocks.blocked_ids(&self.session.user_id).await?;
        let visits = self
            .store
            .list_visitors(&self.session.user_id, limit.saturating_add(blocked.len()))
            .await?;

        Ok(visits
            .into_iter()
            .filter(|v| !blocked.contains(&v.visitor_id))
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewNotification, NotificationType};
    use crate::services::{CacheManager, MemoryStore};

    fn service(store: Arc<MemoryStore>, user: &str) -> ActivityService {
        let blocks = BlockList::new(store.clone(), Arc::new(CacheManager::in_memory(100, 60)));
        ActivityService::new(Session::new(user), store, blocks)
    }

    #[tokio::test]
    async fn test_self_visit_ignored() {
        let store = Arc::new(MemoryStore::new());
        let activity = service(store, "u1");
        assert!(activity.record_visit("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_visits_listed_for_profile_owner() {
        let store = Arc::new(MemoryStore::new());
        service(store.clone(), "u2").record_visit("u1").await.unwrap();
        service(store.clone(), "u3").record_visit("u1").await.unwrap();
        // Revisit refreshes instead of duplicating
        service(store.clone(), "u2").record_visit("u1").await.unwrap();

        let visitors = service(store, "u1").list_visitors(10).await.unwrap();
        assert_eq!(visitors.len(), 2);
    }

    #[tokio::test]
    async fn test_blocked_visitors_do_not_shorten_the_page() {
        let store = Arc::new(MemoryStore::new());
        for visitor in ["u2", "u3", "u4", "u5"] {
            service(store.clone(), visitor).record_visit("u1").await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let owner = service(store.clone(), "u1");
        // The two most recent visitors are blocked
        store.insert_block("u1", "u5").await.unwrap();
        store.insert_block("u1", "u4").await.unwrap();

        let visitors = owner.list_visitors(2).await.unwrap();
        let ids: Vec<_> = visitors.iter().map(|v| v.visitor_id.as_str()).collect();
        assert_eq!(ids, vec!["u3", "u2"]);
    }

    #[tokio::test]
    async fn test_unread_badge_caps_at_99() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..150 {
            store
                .insert_notification(&NewNotification {
                    user_id: "u1".to_string(),
                    notification_type: NotificationType::System,
                    title: "t".to_string(),
                    message: "m".to_string(),
                })
                .await
                .unwrap();
        }

        let activity = service(store, "u1");
        assert_eq!(activity.unread_badge().await.unwrap().unwrap().text, "99+");
        assert_eq!(activity.mark_all_read().await.unwrap(), 150);
        assert!(activity.unread_badge().await.unwrap().is_none());
    }
}
