use crate::services::StoreError;
use thiserror::Error;

/// Errors surfaced by the coordinator and the social services
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Cannot favorite yourself")]
    SelfFavorite,

    #[error("Cannot block yourself")]
    SelfBlock,

    #[error("Interaction with user {0} is blocked")]
    Blocked(String),

    #[error("A toggle for user {0} is already in flight")]
    ToggleInFlight(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CoordinatorError {
    /// Whether repeating the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CoordinatorError::ToggleInFlight(_) => true,
            CoordinatorError::Store(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Short machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            CoordinatorError::SelfFavorite => "self_favorite",
            CoordinatorError::SelfBlock => "self_block",
            CoordinatorError::Blocked(_) => "blocked",
            CoordinatorError::ToggleInFlight(_) => "toggle_in_flight",
            CoordinatorError::Store(_) => "store_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CoordinatorError::ToggleInFlight("u2".into()).is_retryable());
        assert!(!CoordinatorError::SelfFavorite.is_retryable());
        assert!(!CoordinatorError::Blocked("u2".into()).is_retryable());
        assert!(CoordinatorError::Store(StoreError::Unavailable("down".into())).is_retryable());
    }
}
