use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Confirmed favorite state of one (actor, target) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteState {
    NotFavorited,
    Favorited,
}

impl FavoriteState {
    pub fn from_exists(exists: bool) -> Self {
        if exists {
            FavoriteState::Favorited
        } else {
            FavoriteState::NotFavorited
        }
    }

    pub fn is_favorited(&self) -> bool {
        matches!(self, FavoriteState::Favorited)
    }

    pub fn flipped(&self) -> Self {
        match self {
            FavoriteState::Favorited => FavoriteState::NotFavorited,
            FavoriteState::NotFavorited => FavoriteState::Favorited,
        }
    }
}

/// Toggle state machine
///
/// `Confirmed` states reflect what the store holds. `Pending` covers the
/// window between the existence check and the write; `prior` is `None` until
/// the check has returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Confirmed(FavoriteState),
    Pending { prior: Option<FavoriteState> },
}

impl ToggleState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ToggleState::Pending { .. })
    }
}

type PairKey = (String, String);

/// Toggles currently in flight in this process
///
/// Holds one `Pending` entry per (actor, target) pair being toggled. Entries
/// disappear once the toggle commits or rolls back.
#[derive(Debug, Default)]
pub struct ToggleRegistry {
    pending: Mutex<HashMap<PairKey, ToggleState>>,
}

/// Returned by [`ToggleRegistry::begin`] when the pair already has a toggle in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyPending;

impl ToggleRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PairKey, ToggleState>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enter the pending state for a pair
    pub fn begin(
        self: &Arc<Self>,
        actor_id: &str,
        target_id: &str,
    ) -> Result<PendingToggle, AlreadyPending> {
        let key = (actor_id.to_string(), target_id.to_string());
        let mut entries = self.entries();
        if entries.contains_key(&key) {
            return Err(AlreadyPending);
        }
        entries.insert(key.clone(), ToggleState::Pending { prior: None });

        Ok(PendingToggle {
            registry: Arc::clone(self),
            key,
            prior: None,
            settled: false,
        })
    }

    /// Current in-flight state of a pair, `None` when nothing is pending
    pub fn state(&self, actor_id: &str, target_id: &str) -> Option<ToggleState> {
        self.entries()
            .get(&(actor_id.to_string(), target_id.to_string()))
            .copied()
    }

    pub fn pending_count(&self) -> usize {
        self.entries().len()
    }

    fn settle(&self, key: &PairKey) {
        self.entries().remove(key);
    }
}

/// A toggle holding the pending slot for its pair
///
/// Dropping it without `commit` behaves like `rollback`.
#[derive(Debug)]
pub struct PendingToggle {
    registry: Arc<ToggleRegistry>,
    key: PairKey,
    prior: Option<FavoriteState>,
    settled: bool,
}

impl PendingToggle {
    /// Record the confirmed state read by the existence check
    pub fn observe_prior(&mut self, prior: FavoriteState) {
        self.prior = Some(prior);
        if let Some(entry) = self.registry.entries().get_mut(&self.key) {
            *entry = ToggleState::Pending { prior: Some(prior) };
        }
    }

    /// PENDING -> new confirmed state
    pub fn commit(mut self, next: FavoriteState) -> ToggleState {
        self.settled = true;
        self.registry.settle(&self.key);
        ToggleState::Confirmed(next)
    }

    /// PENDING -> prior confirmed state (if it was ever observed)
    pub fn rollback(mut self) -> Option<FavoriteState> {
        self.settled = true;
        self.registry.settle(&self.key);
        self.prior
    }
}

impl Drop for PendingToggle {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.settle(&self.key);
        }
    }
}
