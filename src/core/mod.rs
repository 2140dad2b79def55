// Core exports
pub mod activity;
pub mod badge;
pub mod blocks;
pub mod coordinator;
pub mod error;
pub mod sink;
pub mod state;

pub use activity::ActivityService;
pub use badge::{Badge, BadgeBoard, BadgeKind, UNREAD_BADGE_CAP};
pub use blocks::BlockList;
pub use coordinator::{CoordinatorContext, FavoriteCoordinator, MatchTemplate, MutualMatch, ToggleOutcome};
pub use error::CoordinatorError;
pub use sink::{CollectingSink, NoopSink, PresentationSink, UiEvent};
pub use state::{FavoriteState, PendingToggle, ToggleRegistry, ToggleState};
