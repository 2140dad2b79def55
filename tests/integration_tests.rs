// Integration tests for Lume Pulse

use async_trait::async_trait;
use lume_pulse::core::{
    Badge, CollectingSink, CoordinatorContext, CoordinatorError, FavoriteState, MatchTemplate,
    UiEvent,
};
use lume_pulse::models::{
    FavoriteEdge, InsertOutcome, NewNotification, Notification, NotificationType, PulseCount,
    Session, Visit,
};
use lume_pulse::services::{CacheManager, DataStore, MemoryStore, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn create_context(store: Arc<MemoryStore>) -> CoordinatorContext {
    CoordinatorContext::new(store, Arc::new(CacheManager::in_memory(1000, 60)))
}

fn user(id: &str, name: &str) -> Session {
    Session::new(id).with_name(name)
}

#[tokio::test]
async fn test_integration_double_toggle_restores_state() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());
    let sink = Arc::new(CollectingSink::new());
    let coordinator = ctx.coordinator(user("u1", "Alex"), sink.clone());

    let first = coordinator.toggle_favorite("u2").await.unwrap();
    assert_eq!(first.state, FavoriteState::Favorited);
    assert!(first.created_edge);
    assert_eq!(store.favorite_count().await, 1);

    let second = coordinator.toggle_favorite("u2").await.unwrap();
    assert_eq!(second.state, FavoriteState::NotFavorited);
    assert!(!second.created_edge);
    assert!(second.mutual_match.is_none());
    assert_eq!(store.favorite_count().await, 0);

    assert_eq!(sink.last_toggle("u2"), Some(false));
    assert!(!coordinator.is_favorite("u2").await.unwrap());
}

#[tokio::test]
async fn test_integration_single_insert_and_single_mutual_check() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());
    let coordinator = ctx.coordinator(user("u1", "Alex"), Arc::new(CollectingSink::new()));

    coordinator.toggle_favorite("u2").await.unwrap();

    let calls = store.calls();
    // existence check + reciprocal check
    assert_eq!(calls.favorite_lookups, 2);
    assert_eq!(calls.favorite_inserts, 1);
    assert_eq!(calls.favorite_deletes, 0);
    assert_eq!(calls.pulse_increments, 0);
}

#[tokio::test]
async fn test_integration_unfavorite_skips_mutual_check() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());
    let coordinator = ctx.coordinator(user("u1", "Alex"), Arc::new(CollectingSink::new()));

    coordinator.toggle_favorite("u2").await.unwrap();
    let before = store.calls().favorite_lookups;

    coordinator.toggle_favorite("u2").await.unwrap();
    assert_eq!(store.calls().favorite_lookups, before + 1);
    assert_eq!(store.calls().favorite_deletes, 1);
}

#[tokio::test]
async fn test_integration_mutual_match_credits_closing_side_only() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());

    let u1_sink = Arc::new(CollectingSink::new());
    let u1 = ctx.coordinator(user("u1", "Alex"), u1_sink.clone());
    let outcome = u1.toggle_favorite("u2").await.unwrap();
    assert!(outcome.mutual_match.is_none());

    let u2_sink = Arc::new(CollectingSink::new());
    let u2 = ctx.coordinator(user("u2", "Sam"), u2_sink.clone());
    let outcome = u2.toggle_favorite("u1").await.unwrap();

    let matched = outcome.mutual_match.expect("mutual match");
    assert_eq!(matched.pulse_count, 1);

    // Only the user who closed the match is credited
    assert_eq!(u2.load_pulse_count().await.unwrap(), 1);
    assert_eq!(u1.load_pulse_count().await.unwrap(), 0);

    let notifications = store.notifications_for("u1").await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].id, matched.notification_id);
    assert_eq!(notifications[0].notification_type, NotificationType::Match);
    assert_eq!(notifications[0].title, "It's a match!");
    assert_eq!(notifications[0].message, "Sam liked you back. Say hello!");
    assert!(store.notifications_for("u2").await.is_empty());

    let events = u2_sink.events();
    assert_eq!(
        events[0],
        UiEvent::Toggled {
            target_user_id: "u1".to_string(),
            favorited: true
        }
    );
    assert_eq!(
        events[1],
        UiEvent::PulseCountChanged {
            count: 1,
            badge: Badge::pulse(1)
        }
    );
}

#[tokio::test]
async fn test_integration_match_template_from_context() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone()).with_match_template(MatchTemplate {
        title: "New match".to_string(),
        message: "You and {name} like each other".to_string(),
    });

    ctx.coordinator(user("u1", "Alex"), Arc::new(CollectingSink::new()))
        .toggle_favorite("u2")
        .await
        .unwrap();
    ctx.coordinator(Session::new("u2"), Arc::new(CollectingSink::new()))
        .toggle_favorite("u1")
        .await
        .unwrap();

    let notifications = store.notifications_for("u1").await;
    assert_eq!(notifications[0].title, "New match");
    // No display name in the session: the user id stands in
    assert_eq!(notifications[0].message, "You and u2 like each other");
}

#[tokio::test]
async fn test_integration_unlike_keeps_pulse_count() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());

    let u1 = ctx.coordinator(user("u1", "Alex"), Arc::new(CollectingSink::new()));
    let u2 = ctx.coordinator(user("u2", "Sam"), Arc::new(CollectingSink::new()));

    u1.toggle_favorite("u2").await.unwrap();
    u2.toggle_favorite("u1").await.unwrap();
    u2.toggle_favorite("u1").await.unwrap();

    assert!(!u2.is_favorite("u1").await.unwrap());
    assert_eq!(u2.load_pulse_count().await.unwrap(), 1);

    // Liking again closes the match again
    let again = u2.toggle_favorite("u1").await.unwrap();
    assert_eq!(again.mutual_match.map(|m| m.pulse_count), Some(2));
}

#[tokio::test]
async fn test_integration_pulse_badge_rendering() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());

    let sink = Arc::new(CollectingSink::new());
    let coordinator = ctx.coordinator(user("u3", "Kim"), sink.clone());
    assert_eq!(coordinator.load_pulse_count().await.unwrap(), 0);
    assert!(sink.board().pulse().is_none());

    for _ in 0..5 {
        store.increment_pulse_count("u3").await.unwrap();
    }
    assert_eq!(coordinator.load_pulse_count().await.unwrap(), 5);
    let badge = sink.board().pulse().cloned().unwrap();
    assert_eq!(badge.text, "5");
    assert_eq!(badge.anchor, "#pulse-anchor");

    // Redrawing with the same count keeps a single identical badge
    coordinator.load_pulse_count().await.unwrap();
    assert_eq!(sink.board().pulse(), Some(&badge));
}

#[tokio::test]
async fn test_integration_pulse_badge_is_not_capped_unlike_unread() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());

    for _ in 0..150 {
        store.increment_pulse_count("u1").await.unwrap();
        store
            .insert_notification(&NewNotification {
                user_id: "u1".to_string(),
                notification_type: NotificationType::System,
                title: "Hi".to_string(),
                message: "hello".to_string(),
            })
            .await
            .unwrap();
    }

    let sink = Arc::new(CollectingSink::new());
    ctx.coordinator(Session::new("u1"), sink.clone())
        .load_pulse_count()
        .await
        .unwrap();
    assert_eq!(sink.board().pulse().unwrap().text, "150");

    let unread = ctx.activity(Session::new("u1")).unread_badge().await.unwrap();
    assert_eq!(unread.unwrap().text, "99+");
}

#[tokio::test]
async fn test_integration_concurrent_toggles_from_two_instances() {
    let store = Arc::new(MemoryStore::interleaved());
    // Separate contexts stand in for two tabs or two service instances
    let first = create_context(store.clone());
    let second = create_context(store.clone());

    for ctx in [&first, &second] {
        ctx.blocks().blocked_ids("u1").await.unwrap();
        ctx.blocks().blocked_ids("u2").await.unwrap();
    }
    let baseline = store.calls();

    let a = first.coordinator(user("u1", "Alex"), Arc::new(CollectingSink::new()));
    let b = second.coordinator(user("u1", "Alex"), Arc::new(CollectingSink::new()));

    let (ra, rb) = tokio::join!(a.toggle_favorite("u2"), b.toggle_favorite("u2"));
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(ra.state, FavoriteState::Favorited);
    assert_eq!(rb.state, FavoriteState::Favorited);
    assert_eq!(store.favorite_count().await, 1);

    // Exactly one of them wrote the edge, and only that one ran the mutual check
    assert!(ra.created_edge ^ rb.created_edge);
    let calls = store.calls();
    assert_eq!(calls.favorite_inserts - baseline.favorite_inserts, 2);
    assert_eq!(calls.favorite_lookups - baseline.favorite_lookups, 3);
}

#[tokio::test]
async fn test_integration_toggle_in_flight_is_refused() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());
    let sink = Arc::new(CollectingSink::new());
    let coordinator = ctx.coordinator(user("u1", "Alex"), sink.clone());

    let pending = ctx.toggles.begin("u1", "u2").unwrap();
    let err = coordinator.toggle_favorite("u2").await.unwrap_err();
    assert!(matches!(err, CoordinatorError::ToggleInFlight(_)));
    assert_eq!(store.calls().favorite_inserts, 0);
    drop(pending);

    let outcome = coordinator.toggle_favorite("u2").await.unwrap();
    assert_eq!(outcome.state, FavoriteState::Favorited);
}

#[tokio::test]
async fn test_integration_blocked_pair_cannot_favorite() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());

    let u1 = user("u1", "Alex");
    ctx.coordinator(u1.clone(), Arc::new(CollectingSink::new()))
        .toggle_favorite("u2")
        .await
        .unwrap();

    // Blocking drops the blocker's favorite
    let outcome = ctx.blocks().block(&u1, "u2").await.unwrap();
    assert!(outcome.created());
    assert_eq!(store.favorite_count().await, 0);

    // Neither side can favorite across the block
    let err = ctx
        .coordinator(u1.clone(), Arc::new(CollectingSink::new()))
        .toggle_favorite("u2")
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Blocked(_)));

    let err = ctx
        .coordinator(user("u2", "Sam"), Arc::new(CollectingSink::new()))
        .toggle_favorite("u1")
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Blocked(_)));

    assert!(ctx.blocks().unblock(&u1, "u2").await.unwrap());
    ctx.coordinator(u1, Arc::new(CollectingSink::new()))
        .toggle_favorite("u2")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_integration_store_outage_reports_restored_state() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());
    let sink = Arc::new(CollectingSink::new());
    let coordinator = ctx.coordinator(user("u1", "Alex"), sink.clone());

    coordinator.toggle_favorite("u2").await.unwrap();
    store.set_unavailable(true);

    let err = coordinator.toggle_favorite("u2").await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(sink.last_toggle("u2"), Some(true));
    assert_eq!(ctx.toggles.pending_count(), 0);

    store.set_unavailable(false);
    let outcome = coordinator.toggle_favorite("u2").await.unwrap();
    assert_eq!(outcome.state, FavoriteState::NotFavorited);
}

#[tokio::test]
async fn test_integration_visits_and_notifications() {
    let store = Arc::new(MemoryStore::new());
    let ctx = create_context(store.clone());

    let visitor = ctx.activity(Session::new("u2"));
    assert!(visitor.record_visit("u1").await.unwrap().is_some());
    assert!(visitor.record_visit("u1").await.unwrap().is_some());
    assert!(visitor.record_visit("u2").await.unwrap().is_none());

    let owner = ctx.activity(Session::new("u1"));
    let visitors = owner.list_visitors(10).await.unwrap();
    assert_eq!(visitors.len(), 1);
    assert_eq!(visitors[0].visitor_id, "u2");

    ctx.coordinator(Session::new("u1"), Arc::new(CollectingSink::new()))
        .toggle_favorite("u2")
        .await
        .unwrap();
    ctx.coordinator(Session::new("u2"), Arc::new(CollectingSink::new()))
        .toggle_favorite("u1")
        .await
        .unwrap();

    assert_eq!(owner.unread_count().await.unwrap(), 1);
    assert_eq!(owner.unread_badge().await.unwrap().unwrap().text, "1");
    assert_eq!(owner.mark_all_read().await.unwrap(), 1);
    assert!(owner.unread_badge().await.unwrap().is_none());
}

/// Store whose first favorite lookup stalls after reading, so the answer it
/// returns is older than whatever completes in the meantime
struct SlowFirstLookup {
    inner: MemoryStore,
    stalled: AtomicBool,
}

#[async_trait]
impl DataStore for SlowFirstLookup {
    async fn find_favorite(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<FavoriteEdge>, StoreError> {
        let found = self.inner.find_favorite(actor_id, target_id).await?;
        if !self.stalled.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok(found)
    }

    async fn insert_favorite(&self, edge: &FavoriteEdge) -> Result<InsertOutcome, StoreError> {
        self.inner.insert_favorite(edge).await
    }

    async fn delete_favorite(&self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        self.inner.delete_favorite(actor_id, target_id).await
    }

    async fn list_favorites(
        &self,
        actor_id: &str,
        limit: usize,
    ) -> Result<Vec<FavoriteEdge>, StoreError> {
        self.inner.list_favorites(actor_id, limit).await
    }

    async fn get_pulse_count(&self, user_id: &str) -> Result<Option<PulseCount>, StoreError> {
        self.inner.get_pulse_count(user_id).await
    }

    async fn increment_pulse_count(&self, user_id: &str) -> Result<PulseCount, StoreError> {
        self.inner.increment_pulse_count(user_id).await
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, StoreError> {
        self.inner.insert_notification(notification).await
    }

    async fn list_notifications(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        self.inner.list_notifications(user_id, limit).await
    }

    async fn count_unread_notifications(&self, user_id: &str) -> Result<u32, StoreError> {
        self.inner.count_unread_notifications(user_id).await
    }

    async fn mark_notifications_read(&self, user_id: &str) -> Result<u64, StoreError> {
        self.inner.mark_notifications_read(user_id).await
    }

    async fn insert_block(
        &self,
        blocker_id: &str,
        blocked_id: &str,
    ) -> Result<InsertOutcome, StoreError> {
        self.inner.insert_block(blocker_id, blocked_id).await
    }

    async fn delete_block(&self, blocker_id: &str, blocked_id: &str) -> Result<bool, StoreError> {
        self.inner.delete_block(blocker_id, blocked_id).await
    }

    async fn list_blocked(&self, blocker_id: &str) -> Result<Vec<String>, StoreError> {
        self.inner.list_blocked(blocker_id).await
    }

    async fn upsert_visit(&self, visitor_id: &str, profile_id: &str) -> Result<Visit, StoreError> {
        self.inner.upsert_visit(visitor_id, profile_id).await
    }

    async fn list_visitors(&self, profile_id: &str, limit: usize) -> Result<Vec<Visit>, StoreError> {
        self.inner.list_visitors(profile_id, limit).await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        self.inner.health_check().await
    }
}

#[tokio::test]
async fn test_integration_read_overlapping_toggle_does_not_pin_old_state() {
    let store = Arc::new(SlowFirstLookup {
        inner: MemoryStore::new(),
        stalled: AtomicBool::new(false),
    });
    let ctx = CoordinatorContext::new(store.clone(), Arc::new(CacheManager::in_memory(1000, 60)));
    let reader = ctx.coordinator(user("u1", "Alex"), Arc::new(CollectingSink::new()));
    let writer = ctx.coordinator(user("u1", "Alex"), Arc::new(CollectingSink::new()));

    let (read, toggled) = tokio::join!(reader.is_favorite("u2"), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        writer.toggle_favorite("u2").await
    });

    // The overlapping read saw the state from before the toggle
    assert!(!read.unwrap());
    assert_eq!(toggled.unwrap().state, FavoriteState::Favorited);

    // Once both are done every read reflects the persisted edge
    assert!(store.inner.find_favorite("u1", "u2").await.unwrap().is_some());
    assert!(reader.is_favorite("u2").await.unwrap());
    assert!(writer.is_favorite("u2").await.unwrap());
}
