// Service exports
pub mod appwrite;
pub mod auth;
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod store;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError};
pub use auth::{AuthError, Claims, TokenVerifier};
pub use cache::{CacheError, CacheKey, CacheManager};
pub use memory::{MemoryStore, StoreCalls};
pub use postgres::{PostgresClient, PostgresError};
pub use store::{DataStore, StoreError};
