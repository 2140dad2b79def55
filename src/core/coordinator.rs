use crate::core::activity::ActivityService;
use crate::core::blocks::BlockList;
use crate::core::error::CoordinatorError;
use crate::core::sink::PresentationSink;
use crate::core::state::{FavoriteState, ToggleRegistry};
use crate::models::{FavoriteEdge, NewNotification, NotificationType, PulseCount, Session};
use crate::services::{CacheManager, DataStore};
use std::sync::Arc;

/// Title and message of the notification sent when a match closes
///
/// `{name}` in the message is replaced by the display name of the user who
/// completed the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTemplate {
    pub title: String,
    pub message: String,
}

impl MatchTemplate {
    pub fn render(&self, name: &str) -> String {
        self.message.replace("{name}", name)
    }
}

impl Default for MatchTemplate {
    fn default() -> Self {
        Self {
            title: "It's a match!".to_string(),
            message: "{name} liked you back. Say hello!".to_string(),
        }
    }
}

/// Shared dependencies the per-request services are built from
#[derive(Clone)]
pub struct CoordinatorContext {
    pub store: Arc<dyn DataStore>,
    pub cache: Arc<CacheManager>,
    pub toggles: Arc<ToggleRegistry>,
    pub match_template: MatchTemplate,
}

impl CoordinatorContext {
    pub fn new(store: Arc<dyn DataStore>, cache: Arc<CacheManager>) -> Self {
        Self {
            store,
            cache,
            toggles: ToggleRegistry::new(),
            match_template: MatchTemplate::default(),
        }
    }

    pub fn with_match_template(mut self, template: MatchTemplate) -> Self {
        self.match_template = template;
        self
    }

    pub fn blocks(&self) -> BlockList {
        BlockList::new(Arc::clone(&self.store), Arc::clone(&self.cache))
    }

    pub fn activity(&self, session: Session) -> ActivityService {
        ActivityService::new(session, Arc::clone(&self.store), self.blocks())
    }

    /// Coordinator acting on behalf of `session`, repainting through `sink`
    pub fn coordinator(
        &self,
        session: Session,
        sink: Arc<dyn PresentationSink>,
    ) -> FavoriteCoordinator {
        FavoriteCoordinator {
            session,
            store: Arc::clone(&self.store),
            toggles: Arc::clone(&self.toggles),
            blocks: self.blocks(),
            sink,
            match_template: self.match_template.clone(),
        }
    }
}

/// A mutual match closed by the acting user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutualMatch {
    /// Actor's pulse count after the increment
    pub pulse_count: u32,
    /// Notification sent to the other user
    pub notification_id: String,
}

/// Result of a completed toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub target_id: String,
    pub state: FavoriteState,
    /// True only when this call wrote the edge (not a concurrent duplicate)
    pub created_edge: bool,
    pub mutual_match: Option<MutualMatch>,
}

/// Favorite/match coordinator for one authenticated user
///
/// Protocol per toggle, strictly sequential:
/// 1. reject self-favorites and blocked pairs
/// 2. enter PENDING for the pair (a second concurrent toggle is refused)
/// 3. check whether actor -> target exists
/// 4. delete or insert the edge (one write at most)
/// 5. commit, repaint the card
/// 6. when this call created the edge, look for the reciprocal edge and on a
///    match bump the actor's pulse count and notify the target
///
/// A failure in steps 3-4 rolls the pair back to its prior confirmed state.
pub struct FavoriteCoordinator {
    session: Session,
    store: Arc<dyn DataStore>,
    toggles: Arc<ToggleRegistry>,
    blocks: BlockList,
    sink: Arc<dyn PresentationSink>,
    match_template: MatchTemplate,
}

type ToggleFailure = (Option<FavoriteState>, CoordinatorError);

impl FavoriteCoordinator {
    /// Flip the favorite state of `target_id`
    pub async fn toggle_favorite(&self, target_id: &str) -> Result<ToggleOutcome, CoordinatorError> {
        match self.run_toggle(target_id).await {
            Ok(outcome) => Ok(outcome),
            Err((restored, error)) => {
                tracing::error!(
                    "Toggle {} -> {} failed: {}",
                    self.session.user_id,
                    target_id,
                    error
                );
                self.sink.on_toggle_failed(target_id, restored, &error);
                Err(error)
            }
        }
    }

    async fn run_toggle(&self, target_id: &str) -> Result<ToggleOutcome, ToggleFailure> {
        let actor_id = self.session.user_id.as_str();

        if actor_id == target_id {
            return Err((None, CoordinatorError::SelfFavorite));
        }

        let blocked = self
            .blocks
            .is_blocked_pair(actor_id, target_id)
            .await
            .map_err(|e| -> ToggleFailure { (None, e.into()) })?;
        if blocked {
            return Err((None, CoordinatorError::Blocked(target_id.to_string())));
        }

        let mut pending = self
            .toggles
            .begin(actor_id, target_id)
            .map_err(|_| -> ToggleFailure {
                (None, CoordinatorError::ToggleInFlight(target_id.to_string()))
            })?;

        let existing = match self.store.find_favorite(actor_id, target_id).await {
            Ok(existing) => existing,
            Err(e) => return Err((pending.rollback(), e.into())),
        };

        let prior = FavoriteState::from_exists(existing.is_some());
        pending.observe_prior(prior);

        let created_edge = match prior {
            FavoriteState::Favorited => match self.store.delete_favorite(actor_id, target_id).await {
                Ok(removed) => {
                    if !removed {
                        tracing::debug!("Favorite {} -> {} was already gone", actor_id, target_id);
                    }
                    false
                }
                Err(e) => return Err((pending.rollback(), e.into())),
            },
            FavoriteState::NotFavorited => {
                let edge = FavoriteEdge::new(actor_id, target_id);
                match self.store.insert_favorite(&edge).await {
                    Ok(outcome) => {
                        if !outcome.created() {
                            tracing::debug!(
                                "Favorite {} -> {} inserted concurrently, treating as success",
                                actor_id,
                                target_id
                            );
                        }
                        outcome.created()
                    }
                    Err(e) => return Err((pending.rollback(), e.into())),
                }
            }
        };

        let next = prior.flipped();
        pending.commit(next);
        self.sink.on_toggled(target_id, next.is_favorited());

        tracing::info!("User {} toggled {} -> {:?}", actor_id, target_id, next);

        let mutual_match = if created_edge {
            match self.check_mutual_like(target_id).await {
                Ok(found) => found,
                Err(error) => {
                    // The like itself is persisted; only the match bookkeeping failed
                    tracing::warn!(
                        "Mutual-match check {} <-> {} failed: {}",
                        actor_id,
                        target_id,
                        error
                    );
                    self.sink.on_toggle_failed(target_id, Some(next), &error);
                    None
                }
            }
        } else {
            None
        };

        Ok(ToggleOutcome {
            target_id: target_id.to_string(),
            state: next,
            created_edge,
            mutual_match,
        })
    }

    /// Detect whether `target_id` already likes the actor and record the match
    ///
    /// Only the actor's pulse count changes: the side closing the match is the
    /// one credited.
    pub async fn check_mutual_like(
        &self,
        target_id: &str,
    ) -> Result<Option<MutualMatch>, CoordinatorError> {
        let actor_id = self.session.user_id.as_str();

        if self.store.find_favorite(target_id, actor_id).await?.is_none() {
            tracing::debug!("No reciprocal favorite {} -> {}", target_id, actor_id);
            return Ok(None);
        }

        let pulse = self.increment_pulse_count().await?;
        self.sink.on_pulse_count_changed(pulse.count);

        let notification = self
            .store
            .insert_notification(&NewNotification {
                user_id: target_id.to_string(),
                notification_type: NotificationType::Match,
                title: self.match_template.title.clone(),
                message: self.match_template.render(self.session.display_name()),
            })
            .await?;

        tracing::info!(
            "Mutual match {} <-> {} (pulse count now {})",
            actor_id,
            target_id,
            pulse.count
        );

        Ok(Some(MutualMatch {
            pulse_count: pulse.count,
            notification_id: notification.id,
        }))
    }

    /// Atomically add one to the actor's pulse count
    pub async fn increment_pulse_count(&self) -> Result<PulseCount, CoordinatorError> {
        Ok(self
            .store
            .increment_pulse_count(&self.session.user_id)
            .await?)
    }

    /// Fetch the actor's pulse count (0 when never matched) and redraw the badge
    pub async fn load_pulse_count(&self) -> Result<u32, CoordinatorError> {
        let count = self
            .store
            .get_pulse_count(&self.session.user_id)
            .await?
            .map(|p| p.count)
            .unwrap_or(0);

        self.sink.on_pulse_count_changed(count);
        Ok(count)
    }

    /// Whether the actor currently favorites `target_id`
    ///
    /// Always a fresh existence query. Caching it would let a read that
    /// started before a toggle outlive the toggle and pin the old state.
    pub async fn is_favorite(&self, target_id: &str) -> Result<bool, CoordinatorError> {
        Ok(self
            .store
            .find_favorite(&self.session.user_id, target_id)
            .await?
            .is_some())
    }

    /// The actor's favorites, newest first
    pub async fn list_favorites(&self, limit: usize) -> Result<Vec<FavoriteEdge>, CoordinatorError> {
        Ok(self
            .store
            .list_favorites(&self.session.user_id, limit)
            .await?)
    }
}
