use crate::models::{
    FavoriteEdge, InsertOutcome, NewNotification, Notification, NotificationType, PulseCount,
    Visit,
};
use crate::services::store::{DataStore, StoreError};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl PostgresError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PostgresError::SqlxError(
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            )
        )
    }
}

/// PostgreSQL-backed data store
///
/// Uniqueness lives in primary keys; inserts use `ON CONFLICT DO NOTHING` and
/// report `AlreadyExists` when no row was written. The pulse counter is a
/// single upsert statement so concurrent matches never lose an update.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    fn outcome(rows_affected: u64) -> InsertOutcome {
        if rows_affected > 0 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyExists
        }
    }
}

fn count_from_row(row: &PgRow, column: &str) -> u32 {
    let count: i32 = row.get(column);
    u32::try_from(count).unwrap_or(0)
}

fn pulse_from_row(row: &PgRow) -> PulseCount {
    PulseCount {
        user_id: row.get("user_id"),
        count: count_from_row(row, "count"),
        last_updated: row.get("last_updated"),
    }
}

fn notification_from_row(row: &PgRow) -> Result<Notification, PostgresError> {
    let kind: String = row.get("type");
    let notification_type = NotificationType::parse(&kind)
        .ok_or_else(|| PostgresError::InvalidData(format!("Unknown notification type: {}", kind)))?;
    let id: uuid::Uuid = row.get("id");

    Ok(Notification {
        id: id.to_string(),
        user_id: row.get("user_id"),
        notification_type,
        title: row.get("title"),
        message: row.get("message"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    })
}

fn visit_from_row(row: &PgRow) -> Visit {
    Visit {
        visitor_id: row.get("visitor_id"),
        profile_id: row.get("profile_id"),
        visited_at: row.get("visited_at"),
    }
}

fn edge_from_row(row: &PgRow) -> FavoriteEdge {
    FavoriteEdge {
        actor_id: row.get("actor_id"),
        target_id: row.get("target_id"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl DataStore for PostgresClient {
    async fn find_favorite(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<FavoriteEdge>, StoreError> {
        let query = r#"
            SELECT actor_id, target_id, created_at
            FROM favorite_edges
            WHERE actor_id = $1 AND target_id = $2
        "#;

        let row = sqlx::query(query)
            .bind(actor_id)
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(row.as_ref().map(edge_from_row))
    }

    async fn insert_favorite(&self, edge: &FavoriteEdge) -> Result<InsertOutcome, StoreError> {
        let query = r#"
            INSERT INTO favorite_edges (actor_id, target_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (actor_id, target_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(&edge.actor_id)
            .bind(&edge.target_id)
            .bind(edge.created_at)
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        tracing::debug!(
            "Insert favorite {} -> {}: {} row(s)",
            edge.actor_id,
            edge.target_id,
            result.rows_affected()
        );

        Ok(Self::outcome(result.rows_affected()))
    }

    async fn delete_favorite(&self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let query = r#"
            DELETE FROM favorite_edges
            WHERE actor_id = $1 AND target_id = $2
        "#;

        let result = sqlx::query(query)
            .bind(actor_id)
            .bind(target_id)
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_favorites(
        &self,
        actor_id: &str,
        limit: usize,
    ) -> Result<Vec<FavoriteEdge>, StoreError> {
        let query = r#"
            SELECT actor_id, target_id, created_at
            FROM favorite_edges
            WHERE actor_id = $1
            ORDER BY created_at DESC
            LIMIT $2
        "#;

        let rows = sqlx::query(query)
            .bind(actor_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(rows.iter().map(edge_from_row).collect())
    }

    async fn get_pulse_count(&self, user_id: &str) -> Result<Option<PulseCount>, StoreError> {
        let query = r#"
            SELECT user_id, count, last_updated
            FROM pulse_counts
            WHERE user_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(row.as_ref().map(pulse_from_row))
    }

    async fn increment_pulse_count(&self, user_id: &str) -> Result<PulseCount, StoreError> {
        let query = r#"
            INSERT INTO pulse_counts (user_id, count, last_updated)
            VALUES ($1, 1, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                count = pulse_counts.count + 1,
                last_updated = EXCLUDED.last_updated
            RETURNING user_id, count, last_updated
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(pulse_from_row(&row))
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, StoreError> {
        let query = r#"
            INSERT INTO notifications (id, user_id, type, title, message, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, NOW())
            RETURNING id, user_id, type, title, message, is_read, created_at
        "#;

        let row = sqlx::query(query)
            .bind(uuid::Uuid::new_v4())
            .bind(&notification.user_id)
            .bind(notification.notification_type.as_str())
            .bind(&notification.title)
            .bind(&notification.message)
            .fetch_one(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(notification_from_row(&row)?)
    }

    async fn list_notifications(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        let query = r#"
            SELECT id, user_id, type, title, message, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(rows
            .iter()
            .map(notification_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn count_unread_notifications(&self, user_id: &str) -> Result<u32, StoreError> {
        let query = r#"
            SELECT COUNT(*)::INTEGER AS unread
            FROM notifications
            WHERE user_id = $1 AND NOT is_read
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(count_from_row(&row, "unread"))
    }

    async fn mark_notifications_read(&self, user_id: &str) -> Result<u64, StoreError> {
        let query = r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE user_id = $1 AND NOT is_read
        "#;

        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(result.rows_affected())
    }

    async fn insert_block(
        &self,
        blocker_id: &str,
        blocked_id: &str,
    ) -> Result<InsertOutcome, StoreError> {
        let query = r#"
            INSERT INTO blocks (blocker_id, blocked_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (blocker_id, blocked_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(Self::outcome(result.rows_affected()))
    }

    async fn delete_block(&self, blocker_id: &str, blocked_id: &str) -> Result<bool, StoreError> {
        let query = r#"
            DELETE FROM blocks
            WHERE blocker_id = $1 AND blocked_id = $2
        "#;

        let result = sqlx::query(query)
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_blocked(&self, blocker_id: &str) -> Result<Vec<String>, StoreError> {
        let query = r#"
            SELECT blocked_id
            FROM blocks
            WHERE blocker_id = $1
        "#;

        let rows = sqlx::query(query)
            .bind(blocker_id)
            .fetch_all(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(rows.iter().map(|row| row.get("blocked_id")).collect())
    }

    async fn upsert_visit(&self, visitor_id: &str, profile_id: &str) -> Result<Visit, StoreError> {
        let query = r#"
            INSERT INTO visits (visitor_id, profile_id, visited_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (visitor_id, profile_id)
            DO UPDATE SET visited_at = EXCLUDED.visited_at
            RETURNING visitor_id, profile_id, visited_at
        "#;

        let row = sqlx::query(query)
            .bind(visitor_id)
            .bind(profile_id)
            .fetch_one(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(visit_from_row(&row))
    }

    async fn list_visitors(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> Result<Vec<Visit>, StoreError> {
        let query = r#"
            SELECT visitor_id, profile_id, visited_at
            FROM visits
            WHERE profile_id = $1
            ORDER BY visited_at DESC
            LIMIT $2
        "#;

        let rows = sqlx::query(query)
            .bind(profile_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(PostgresError::from)?;

        Ok(rows.iter().map(visit_from_row).collect())
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(|e| PostgresError::from(e).into())
    }
}
