use crate::core::{Badge, UiEvent};
use crate::models::domain::{FavoriteEdge, Notification, Visit};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    #[serde(default)]
    pub retryable: bool,
}

/// Failed toggle: the error plus the UI events emitted before it surfaced
///
/// The `toggleFailed` event carries the state the card falls back to.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleErrorResponse {
    #[serde(flatten)]
    pub error: ErrorResponse,
    pub events: Vec<UiEvent>,
}

/// Response for the toggle endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub target_user_id: String,
    pub favorited: bool,
    pub mutual_match: bool,
    pub pulse_count: Option<u32>,
    /// UI updates to apply, in order
    pub events: Vec<UiEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStatusResponse {
    pub target_user_id: String,
    pub favorited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesResponse {
    pub favorites: Vec<FavoriteEdge>,
    pub count: usize,
}

/// Pulse count with the badge to draw next to the pulse anchor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseResponse {
    pub count: u32,
    pub badge: Option<Badge>,
    pub html: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: u32,
    pub badge: Option<Badge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlocksResponse {
    pub blocked_user_ids: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorsResponse {
    pub visitors: Vec<Visit>,
    pub count: usize,
}
