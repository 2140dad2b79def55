use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated caller, passed explicitly to everything acting on their behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Name shown to other users; falls back to the user id
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.user_id)
    }
}

/// Directed "like" from one user to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEdge {
    #[serde(rename = "actorId")]
    pub actor_id: String,
    #[serde(rename = "targetId")]
    pub target_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FavoriteEdge {
    pub fn new(actor_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            target_id: target_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Per-user counter of mutual matches the user completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseCount {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub count: u32,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Match,
    Favorite,
    Visit,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Match => "match",
            NotificationType::Favorite => "favorite",
            NotificationType::Visit => "visit",
            NotificationType::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "match" => Some(NotificationType::Match),
            "favorite" => Some(NotificationType::Favorite),
            "visit" => Some(NotificationType::Visit),
            "system" => Some(NotificationType::System),
            _ => None,
        }
    }
}

/// Notification addressed to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification about to be inserted; the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
}

/// Most recent visit of one user to another user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub visitor_id: String,
    pub profile_id: String,
    pub visited_at: DateTime<Utc>,
}

/// Result of an insert against a uniqueness-constrained table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The row already existed; a concurrent writer got there first.
    AlreadyExists,
}

impl InsertOutcome {
    pub fn created(&self) -> bool {
        matches!(self, InsertOutcome::Inserted)
    }
}
