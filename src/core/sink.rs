use crate::core::badge::{Badge, BadgeBoard};
use crate::core::error::CoordinatorError;
use crate::core::state::FavoriteState;
use serde::Serialize;
use std::sync::Mutex;

/// Hooks the presentation layer implements to repaint after state changes
pub trait PresentationSink: Send + Sync {
    /// Repaint the favorite button on the card of `target_id`
    fn on_toggled(&self, target_id: &str, now_favorited: bool);

    /// Repaint the global pulse badge
    fn on_pulse_count_changed(&self, count: u32);

    /// A toggle failed; `restored` is the confirmed state the card falls back to
    fn on_toggle_failed(
        &self,
        _target_id: &str,
        _restored: Option<FavoriteState>,
        _error: &CoordinatorError,
    ) {
    }
}

/// UI update produced by the coordinator, shipped back to the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum UiEvent {
    Toggled {
        #[serde(rename = "targetUserId")]
        target_user_id: String,
        favorited: bool,
    },
    PulseCountChanged {
        count: u32,
        badge: Option<Badge>,
    },
    ToggleFailed {
        #[serde(rename = "targetUserId")]
        target_user_id: String,
        #[serde(rename = "restoredFavorited")]
        restored_favorited: Option<bool>,
        message: String,
        retryable: bool,
    },
}

/// Sink that records every hook call and keeps the badge board current
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<UiEvent>>,
    board: Mutex<BadgeBoard>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: UiEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn board(&self) -> BadgeBoard {
        self.board
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Favorite state last painted for a target, if any
    pub fn last_toggle(&self, target_id: &str) -> Option<bool> {
        self.events().iter().rev().find_map(|event| match event {
            UiEvent::Toggled { target_user_id, favorited } if target_user_id == target_id => {
                Some(*favorited)
            }
            UiEvent::ToggleFailed { target_user_id, restored_favorited, .. }
                if target_user_id == target_id =>
            {
                *restored_favorited
            }
            _ => None,
        })
    }
}

impl PresentationSink for CollectingSink {
    fn on_toggled(&self, target_id: &str, now_favorited: bool) {
        self.push(UiEvent::Toggled {
            target_user_id: target_id.to_string(),
            favorited: now_favorited,
        });
    }

    fn on_pulse_count_changed(&self, count: u32) {
        let badge = self
            .board
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .redraw_pulse(count)
            .cloned();
        self.push(UiEvent::PulseCountChanged { count, badge });
    }

    fn on_toggle_failed(
        &self,
        target_id: &str,
        restored: Option<FavoriteState>,
        error: &CoordinatorError,
    ) {
        self.push(UiEvent::ToggleFailed {
            target_user_id: target_id.to_string(),
            restored_favorited: restored.map(|s| s.is_favorited()),
            message: error.to_string(),
            retryable: error.is_retryable(),
        });
    }
}

/// Sink for callers that only need the returned outcome
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl PresentationSink for NoopSink {
    fn on_toggled(&self, _target_id: &str, _now_favorited: bool) {}
    fn on_pulse_count_changed(&self, _count: u32) {}
}
