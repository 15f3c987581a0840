pub mod firestore;
pub mod memory;
mod token;
mod value;

use async_trait::async_trait;

pub use firestore::{FirestoreSettings, FirestoreStore};
pub use memory::MemoryStore;

/// A document's fields as plain JSON.
pub type Fields = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document store rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Document store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Document store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected document store response: {0}")]
    Decode(String),

    #[error("Failed to sign token request: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

impl StoreError {
    /// Authentication-class failures are worth one token refresh.
    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::Unauthorized(_))
    }
}

/// A document database holding flat collections of JSON documents.
///
/// One instance is created at startup and shared by every request, so
/// implementations must be safe for concurrent use.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Inexpensive read-only request proving the store is reachable and the
    /// credentials are accepted.
    async fn probe(&self) -> Result<(), StoreError>;

    /// Create a document with a store-generated id. Never overwrites.
    async fn write(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Every document in `collection`.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;
}
