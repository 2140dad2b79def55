use crate::models::{
    FavoriteEdge, InsertOutcome, NewNotification, Notification, PulseCount, Visit,
};
use crate::services::store::{DataStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl AppwriteError {
    pub fn is_transient(&self) -> bool {
        match self {
            AppwriteError::RequestError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AppwriteError::ApiError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub favorites: String,
    pub pulse_counts: String,
    pub notifications: String,
    pub blocks: String,
    pub visits: String,
}

/// Appwrite API client
///
/// Talks to the Appwrite databases REST API with a server API key. Relies on
/// these collection setups:
/// - `favorites`: unique index on (actorId, targetId)
/// - `pulse_counts`: document id is the user id, integer `count` attribute
/// - `blocks`: unique index on (blockerId, blockedId)
/// - `visits`: unique index on (visitorId, profileId)
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        timeout: Duration,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    fn document_url(&self, collection: &str, document_id: &str) -> String {
        format!(
            "{}/{}",
            self.documents_url(collection),
            urlencoding::encode(document_id)
        )
    }

    fn query_url(&self, collection: &str, queries: &[String]) -> String {
        let mut url = self.documents_url(collection);
        for (i, query) in queries.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str("queries%5B%5D=");
            url.push_str(&urlencoding::encode(query));
        }
        url
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
    }

    /// Send a request and map Appwrite status codes onto [`AppwriteError`]
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Value, AppwriteError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(body);

        match status {
            StatusCode::NOT_FOUND => Err(AppwriteError::NotFound(context.to_string())),
            StatusCode::CONFLICT => Err(AppwriteError::Conflict(context.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppwriteError::Unauthorized),
            _ => {
                tracing::error!("Appwrite {} failed: {} - {}", context, status, message);
                Err(AppwriteError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn list_documents(
        &self,
        collection: &str,
        queries: &[String],
    ) -> Result<(Vec<Value>, u64), AppwriteError> {
        let url = self.query_url(collection, queries);
        tracing::debug!("Listing documents: {}", url);

        let json = self.send(self.request(Method::GET, &url), collection).await?;

        let total = json.get("total").and_then(|t| t.as_u64()).unwrap_or(0);
        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .cloned()
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        Ok((documents, total))
    }

    async fn first_document(
        &self,
        collection: &str,
        mut queries: Vec<String>,
    ) -> Result<Option<Value>, AppwriteError> {
        queries.push(query::limit(1));
        let (documents, _) = self.list_documents(collection, &queries).await?;
        Ok(documents.into_iter().next())
    }

    async fn create_document(
        &self,
        collection: &str,
        document_id: Option<&str>,
        data: Value,
    ) -> Result<Value, AppwriteError> {
        let document_id = document_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        let payload = json!({
            "documentId": document_id,
            "data": data,
        });

        self.send(
            self.request(Method::POST, &self.documents_url(collection))
                .json(&payload),
            collection,
        )
        .await
    }

    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, AppwriteError> {
        self.send(
            self.request(Method::PATCH, &self.document_url(collection, document_id))
                .json(&json!({ "data": data })),
            collection,
        )
        .await
    }

    async fn delete_document(&self, collection: &str, document_id: &str) -> Result<(), AppwriteError> {
        self.send(
            self.request(Method::DELETE, &self.document_url(collection, document_id)),
            collection,
        )
        .await
        .map(|_| ())
    }

    /// Insert, mapping a unique-index conflict to `AlreadyExists`
    async fn insert_unique(
        &self,
        collection: &str,
        data: Value,
    ) -> Result<InsertOutcome, AppwriteError> {
        match self.create_document(collection, None, data).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(AppwriteError::Conflict(_)) => {
                tracing::debug!("Duplicate insert into {} treated as success", collection);
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the first document matching the queries, if any
    async fn delete_matching(
        &self,
        collection: &str,
        queries: Vec<String>,
    ) -> Result<bool, AppwriteError> {
        let Some(doc) = self.first_document(collection, queries).await? else {
            return Ok(false);
        };
        let id = document_id(&doc)?;

        match self.delete_document(collection, &id).await {
            Ok(()) => Ok(true),
            // Deleted concurrently between lookup and delete
            Err(AppwriteError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn increment_counter(&self, user_id: &str) -> Result<Value, AppwriteError> {
        let url = format!(
            "{}/count/increment",
            self.document_url(&self.collections.pulse_counts, user_id)
        );
        self.send(
            self.request(Method::PATCH, &url).json(&json!({ "value": 1 })),
            &self.collections.pulse_counts,
        )
        .await
    }

    /// Atomic increment-or-create of a user's pulse counter
    ///
    /// The counter document id is the user id, so creation races resolve to a
    /// conflict and fall through to the server-side increment.
    pub async fn increment_pulse(&self, user_id: &str) -> Result<PulseCount, AppwriteError> {
        match self.increment_counter(user_id).await {
            Ok(doc) => return parse_pulse(&doc),
            Err(AppwriteError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let data = json!({
            "userId": user_id,
            "count": 1,
            "lastUpdated": Utc::now(),
        });
        match self
            .create_document(&self.collections.pulse_counts, Some(user_id), data)
            .await
        {
            Ok(doc) => parse_pulse(&doc),
            Err(AppwriteError::Conflict(_)) => parse_pulse(&self.increment_counter(user_id).await?),
            Err(e) => Err(e),
        }
    }

    pub async fn get_pulse(&self, user_id: &str) -> Result<Option<PulseCount>, AppwriteError> {
        let url = self.document_url(&self.collections.pulse_counts, user_id);
        match self
            .send(self.request(Method::GET, &url), &self.collections.pulse_counts)
            .await
        {
            Ok(doc) => parse_pulse(&doc).map(Some),
            Err(AppwriteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn health(&self) -> Result<bool, AppwriteError> {
        let url = format!("{}/health", self.base_url.trim_end_matches('/'));
        self.send(self.request(Method::GET, &url), "health")
            .await
            .map(|_| true)
    }
}

/// Appwrite query builders (JSON query syntax)
mod query {
    use serde_json::{json, Value};

    pub fn equal(attribute: &str, value: impl Into<Value>) -> String {
        json!({ "method": "equal", "attribute": attribute, "values": [value.into()] }).to_string()
    }

    pub fn order_desc(attribute: &str) -> String {
        json!({ "method": "orderDesc", "attribute": attribute }).to_string()
    }

    pub fn limit(n: usize) -> String {
        json!({ "method": "limit", "values": [n] }).to_string()
    }
}

fn document_data(doc: &Value) -> &Value {
    doc.get("data").unwrap_or(doc)
}

fn document_id(doc: &Value) -> Result<String, AppwriteError> {
    doc.get("$id")
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| AppwriteError::InvalidResponse("Document without $id".into()))
}

fn parse_document<T: DeserializeOwned>(doc: &Value, what: &str) -> Result<T, AppwriteError> {
    serde_json::from_value(document_data(doc).clone())
        .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
}

fn parse_timestamp(doc: &Value, field: &str) -> Option<DateTime<Utc>> {
    doc.get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_pulse(doc: &Value) -> Result<PulseCount, AppwriteError> {
    let data = document_data(doc);
    let user_id = data
        .get("userId")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| document_id(doc).ok())
        .ok_or_else(|| AppwriteError::InvalidResponse("Pulse count without userId".into()))?;
    let count = data
        .get("count")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| AppwriteError::InvalidResponse("Pulse count without count".into()))?;
    let last_updated = parse_timestamp(doc, "$updatedAt")
        .or_else(|| parse_timestamp(data, "lastUpdated"))
        .unwrap_or_else(Utc::now);

    Ok(PulseCount {
        user_id,
        count: u32::try_from(count).unwrap_or(u32::MAX),
        last_updated,
    })
}

fn parse_notification(doc: &Value) -> Result<Notification, AppwriteError> {
    let mut data = document_data(doc).clone();
    let id = document_id(doc)?;
    if let Some(obj) = data.as_object_mut() {
        obj.insert("id".to_string(), Value::String(id));
    }
    serde_json::from_value(data)
        .map_err(|e| AppwriteError::InvalidResponse(format!("Failed to parse notification: {}", e)))
}

#[async_trait]
impl DataStore for AppwriteClient {
    async fn find_favorite(
        &self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<FavoriteEdge>, StoreError> {
        let doc = self
            .first_document(
                &self.collections.favorites,
                vec![query::equal("actorId", actor_id), query::equal("targetId", target_id)],
            )
            .await?;

        Ok(doc
            .map(|d| parse_document(&d, "favorite"))
            .transpose()?)
    }

    async fn insert_favorite(&self, edge: &FavoriteEdge) -> Result<InsertOutcome, StoreError> {
        let data = serde_json::to_value(edge)
            .map_err(|e| AppwriteError::InvalidResponse(e.to_string()))?;
        Ok(self.insert_unique(&self.collections.favorites, data).await?)
    }

    async fn delete_favorite(&self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .delete_matching(
                &self.collections.favorites,
                vec![query::equal("actorId", actor_id), query::equal("targetId", target_id)],
            )
            .await?)
    }

    async fn list_favorites(
        &self,
        actor_id: &str,
        limit: usize,
    ) -> Result<Vec<FavoriteEdge>, StoreError> {
        let (documents, _) = self
            .list_documents(
                &self.collections.favorites,
                &[
                    query::equal("actorId", actor_id),
                    query::order_desc("createdAt"),
                    query::limit(limit),
                ],
            )
            .await?;

        Ok(documents
            .iter()
            .map(|d| parse_document(d, "favorite"))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn get_pulse_count(&self, user_id: &str) -> Result<Option<PulseCount>, StoreError> {
        Ok(self.get_pulse(user_id).await?)
    }

    async fn increment_pulse_count(&self, user_id: &str) -> Result<PulseCount, StoreError> {
        Ok(self.increment_pulse(user_id).await?)
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, StoreError> {
        let data = json!({
            "userId": notification.user_id,
            "type": notification.notification_type.as_str(),
            "title": notification.title,
            "message": notification.message,
            "isRead": false,
            "createdAt": Utc::now(),
        });
        let doc = self
            .create_document(&self.collections.notifications, None, data)
            .await?;
        Ok(parse_notification(&doc)?)
    }

    async fn list_notifications(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        let (documents, _) = self
            .list_documents(
                &self.collections.notifications,
                &[
                    query::equal("userId", user_id),
                    query::order_desc("createdAt"),
                    query::limit(limit),
                ],
            )
            .await?;

        Ok(documents
            .iter()
            .map(parse_notification)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn count_unread_notifications(&self, user_id: &str) -> Result<u32, StoreError> {
        let (_, total) = self
            .list_documents(
                &self.collections.notifications,
                &[
                    query::equal("userId", user_id),
                    query::equal("isRead", false),
                    query::limit(1),
                ],
            )
            .await?;
        Ok(u32::try_from(total).unwrap_or(u32::MAX))
    }

    async fn mark_notifications_read(&self, user_id: &str) -> Result<u64, StoreError> {
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            let (documents, _) = self
                .list_documents(
                    &self.collections.notifications,
                    &[
                        query::equal("userId", user_id),
                        query::equal("isRead", false),
                        query::limit(100),
                    ],
                )
                .await?;

            if documents.is_empty() {
                break;
            }

            let mut fresh = Vec::with_capacity(documents.len());
            for doc in &documents {
                let id = document_id(doc)?;
                if !seen.contains(&id) && !fresh.contains(&id) {
                    fresh.push(id);
                }
            }

            // Documents already patched still listed as unread: the index lags
            // behind the writes, so another pass would never drain it
            if fresh.is_empty() {
                tracing::warn!(
                    "Unread listing for {} stopped shrinking after {} updates",
                    user_id,
                    seen.len()
                );
                break;
            }

            for id in fresh {
                self.update_document(&self.collections.notifications, &id, json!({ "isRead": true }))
                    .await?;
                seen.insert(id);
            }
        }

        let updated = seen.len() as u64;
        tracing::debug!("Marked {} notifications read for {}", updated, user_id);
        Ok(updated)
    }

    async fn insert_block(
        &self,
        blocker_id: &str,
        blocked_id: &str,
    ) -> Result<InsertOutcome, StoreError> {
        let data = json!({
            "blockerId": blocker_id,
            "blockedId": blocked_id,
            "createdAt": Utc::now(),
        });
        Ok(self.insert_unique(&self.collections.blocks, data).await?)
    }

    async fn delete_block(&self, blocker_id: &str, blocked_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .delete_matching(
                &self.collections.blocks,
                vec![query::equal("blockerId", blocker_id), query::equal("blockedId", blocked_id)],
            )
            .await?)
    }

    async fn list_blocked(&self, blocker_id: &str) -> Result<Vec<String>, StoreError> {
        let (documents, _) = self
            .list_documents(
                &self.collections.blocks,
                &[query::equal("blockerId", blocker_id), query::limit(5000)],
            )
            .await?;

        Ok(documents
            .iter()
            .filter_map(|d| {
                document_data(d)
                    .get("blockedId")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .collect())
    }

    async fn upsert_visit(&self, visitor_id: &str, profile_id: &str) -> Result<Visit, StoreError> {
        let now = Utc::now();
        let queries = || {
            vec![query::equal("visitorId", visitor_id), query::equal("profileId", profile_id)]
        };

        let existing = self.first_document(&self.collections.visits, queries()).await?;
        let doc = match existing {
            Some(doc) => {
                let id = document_id(&doc)?;
                self.update_document(&self.collections.visits, &id, json!({ "visitedAt": now }))
                    .await?
            }
            None => {
                let data = json!({
                    "visitorId": visitor_id,
                    "profileId": profile_id,
                    "visitedAt": now,
                });
                match self.create_document(&self.collections.visits, None, data).await {
                    Ok(doc) => doc,
                    // Created concurrently; refresh the winner's timestamp instead
                    Err(AppwriteError::Conflict(_)) => {
                        let doc = self
                            .first_document(&self.collections.visits, queries())
                            .await?
                            .ok_or_else(|| AppwriteError::NotFound("visit".into()))?;
                        let id = document_id(&doc)?;
                        self.update_document(&self.collections.visits, &id, json!({ "visitedAt": now }))
                            .await?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        Ok(parse_document(&doc, "visit")?)
    }

    async fn list_visitors(
        &self,
        profile_id: &str,
        limit: usize,
    ) -> Result<Vec<Visit>, StoreError> {
        let (documents, _) = self
            .list_documents(
                &self.collections.visits,
                &[
                    query::equal("profileId", profile_id),
                    query::order_desc("visitedAt"),
                    query::limit(limit),
                ],
            )
            .await?;

        Ok(documents
            .iter()
            .map(|d| parse_document(d, "visit"))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(self.health().await?)
    }
}
