//! Lume Pulse - favorites, mutual matches and the pulse badge for the Lume dating app
//!
//! The [`core::FavoriteCoordinator`] owns the toggle-favorite protocol:
//! existence check, single write, mutual-match detection and the atomic
//! pulse counter. Persistence sits behind [`services::DataStore`], with
//! Appwrite, PostgreSQL and in-memory backends.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    Badge, CollectingSink, CoordinatorContext, CoordinatorError, FavoriteCoordinator,
    FavoriteState, PresentationSink, ToggleOutcome, UiEvent,
};
pub use models::{FavoriteEdge, Notification, PulseCount, Session};
pub use services::{CacheManager, DataStore, MemoryStore, StoreError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let badge = Badge::pulse(5).unwrap();
        assert_eq!(badge.text, "5");
        assert_eq!(Session::new("u1").display_name(), "u1");
    }
}
