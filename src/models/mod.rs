// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    FavoriteEdge, InsertOutcome, NewNotification, Notification, NotificationType,
    PulseCount, Session, Visit,
};
pub use requests::{ListQuery, RecordVisitRequest, TargetRequest};
pub use responses::{
    BlocksResponse, ErrorResponse, FavoriteStatusResponse, FavoritesResponse, HealthResponse,
    NotificationsResponse, PulseResponse, ToggleErrorResponse, ToggleResponse, VisitorsResponse,
};
