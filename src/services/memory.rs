use crate::models::{
    FavoriteEdge, InsertOutcome, NewNotification, Notification, PulseCount, Visit,
};
use crate::services::store::{DataStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    favorites: HashMap<(String, String), FavoriteEdge>,
    pulse_counts: HashMap<String, PulseCount>,
    notifications: Vec<Notification>,
    blocks: HashMap<(String, String), chrono::DateTime<Utc>>,
    visits: HashMap<(String, String), Visit>,
}

/// Counters of the favorite-edge calls a store has served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub favorite_lookups: u64,
    pub favorite_inserts: u64,
    pub favorite_deletes: u64,
    pub pulse_increments: u64,
}

/// In-process data store
///
/// Used for local development (`store.backend = "memory"`) and tests. With
/// `interleaved()` every call yields to the scheduler before touching state,
/// which lets concurrent toggles interleave the way remote calls do.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    interleave: bool,
    unavailable: AtomicBool,
    writes_unavailable: AtomicBool,
    favorite_lookups: AtomicU64,
    favorite_inserts: AtomicU64,
    favorite_deletes: AtomicU64,
    pulse_increments: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interleaved() -> Self {
        Self {
            interleave: true,
            ..Self::default()
        }
    }

    /// Make every subsequent call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every subsequent write fail while reads keep working
    pub fn set_writes_unavailable(&self, unavailable: bool) {
        self.writes_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            favorite_lookups: self.favorite_lookups.load(Ordering::SeqCst),
            favorite_inserts: self.favorite_inserts.load(Ordering::SeqCst),
            favorite_deletes: self.favorite_deletes.load(Ordering::SeqCst),
            pulse_increments: self.pulse_increments.load(Ordering::SeqCst),
        }
    }

    pub async fn favorite_count(&self) -> usize {
        self.state.lock().await.favorites.len()
    }

    pub async fn notifications_for(&self, user_id: &str) -> Vec<Notification> {
        self.state
            .lock()
            .await
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn enter(&self) -> Result<(), StoreError> {
        if self.interleave {
            tokio::task::yield_now().await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    async fn enter_write(&self) -> Result<(), StoreError> {
        self.enter().await?;
        if self.writes_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is read-only".into()));
        }
        Ok(())
    }
}

fn key(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn find_favorite(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<FavoriteEdge>, StoreError> {
        self.favorite_lookups.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        Ok(self.state.lock().await.favorites.get(&key(actor_id, target_id)).cloned())
    }

    async fn insert_favorite(&self, edge: &FavoriteEdge) -> Result<InsertOutcome, StoreError> {
        self.favorite_inserts.fetch_add(1, Ordering::SeqCst);
        self.enter_write().await?;
        let mut state = self.state.lock().await;
        let k = key(&edge.actor_id, &edge.target_id);
        if state.favorites.contains_key(&k) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        state.favorites.insert(k, edge.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn delete_favorite(&self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        self.favorite_deletes.fetch_add(1, Ordering::SeqCst);
        self.enter_write().await?;
        Ok(self
            .state
            .lock()
            .await
            .favorites
            .remove(&key(actor_id, target_id))
            .is_some())
    }

    async fn list_favorites(
        &self,
        actor_id: &str,
        limit: usize,
    ) -> Result<Vec<FavoriteEdge>, StoreError> {
        self.enter().await?;
        let state = self.state.lock().await;
        let mut edges: Vec<FavoriteEdge> = state
            .favorites
            .values()
            .filter(|e| e.actor_id == actor_id)
            .cloned()
            .collect();
        edges.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        edges.truncate(limit);
        Ok(edges)
    }

    async fn get_pulse_count(&self, user_id: &str) -> Result<Option<PulseCount>, StoreError> {
        self.enter().await?;
        Ok(self.state.lock().await.pulse_counts.get(user_id).cloned())
    }

    async fn increment_pulse_count(&self, user_id: &str) -> Result<PulseCount, StoreError> {
        self.pulse_increments.fetch_add(1, Ordering::SeqCst);
        self.enter_write().await?;
        let mut state = self.state.lock().await;
        let pulse = state
            .pulse_counts
            .entry(user_id.to_string())
            .or_insert_with(|| PulseCount {
                user_id: user_id.to_string(),
                count: 0,
                last_updated: Utc::now(),
            });
        pulse.count = pulse.count.saturating_add(1);
        pulse.last_updated = Utc::now();
        Ok(pulse.clone())
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, StoreError> {
        self.enter_write().await?;
        let stored = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: notification.user_id.clone(),
            notification_type: notification.notification_type,
            title: notification.title.clone(),
            message: notification.message.clone(),
            is_read: false,
            created_at: Utc::now(),
        };
        self.state.lock().await.notifications.push(stored.clone());
        Ok(stored)
    }

    async fn list_notifications(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        self.enter().await?;
        let state = self.state.lock().await;
        Ok(state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_unread_notifications(&self, user_id: &str) -> Result<u32, StoreError> {
        self.enter().await?;
        let state = self.state.lock().await;
        let unread = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count();
        Ok(u32::try_from(unread).unwrap_or(u32::MAX))
    }

    async fn mark_notifications_read(&self, user_id: &str) -> Result<u64, StoreError> {
        self.enter_write().await?;
        let mut state = self.state.lock().await;
        let mut updated = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn insert_block(
        &self,
        blocker_id: &str,
        blocked_id: &str,
    ) -> Result<InsertOutcome, StoreError> {
        self.enter_write().await?;
        let mut state = self.state.lock().await;
        let k = key(blocker_id, blocked_id);
        if state.blocks.contains_key(&k) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        state.blocks.insert(k, Utc::now());
        Ok(InsertOutcome::Inserted)
    }

    async fn delete_block(&self, blocker_id: &str, blocked_id: &str) -> Result<bool, StoreError> {
        self.enter_write().await?;
        Ok(self
            .state
            .lock()
            .await
            .blocks
            .remove(&key(blocker_id, blocked_id))
            .is_some())
    }

    async fn list_blocked(&self, blocker_id: &str) -> Result<Vec<String>, StoreError> {
        self.enter().await?;
        let state = self.state.lock().await;
        Ok(state
            .blocks
            .keys()
            .filter(|(blocker, _)| blocker == blocker_id)
            .map(|(_, blocked)| blocked.clone())
            .collect())
    }

    async fn upsert_visit(&self, visitor_id: &str, profile_id: &str) -> Result<Visit, StoreError> {
        self.enter_write().await?;
        let visit = Visit {
            visitor_id: visitor_id.to_string(),
            profile_id: profile_id.to_string(),
            visited_at: Utc::now(),
        };
        self.state
            .lock()
            .await
            .visits
            .insert(key(visitor_id, profile_id), visit.clone());
        Ok(visit)
    }

    async fn list_visitors(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> Result<Vec<Visit>, StoreError> {
        self.enter().await?;
        let state = self.state.lock().await;
        let mut visits: Vec<Visit> = state
            .visits
            .values()
            .filter(|v| v.profile_id == profile_id)
            .cloned()
            .collect();
        visits.sort_by(|a, b| b.visited_at.cmp(&a.visited_at));
        visits.truncate(limit);
        Ok(visits)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }
}
