//! Object-storage seam for credential documents and vehicle photos.
//!
//! Concrete backends live behind [`DocumentStore`] so workflows never touch a
//! storage SDK directly. Paths follow the platform convention
//! `{owner_id}/credentials/{credential_id}/{timestamp}.{ext}` and display
//! access goes through short-lived signed URLs.

use chrono::{DateTime, Duration, Utc};
use mime::Mime;
use uuid::Uuid;

/// Build the canonical storage path for a credential document.
pub fn credential_document_path(
    owner_id: &str,
    credential_id: &str,
    filename: &str,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{owner_id}/credentials/{credential_id}/{}.{}",
        at.timestamp_millis(),
        file_extension(filename)
    )
}

/// Lowercased extension of `filename`, falling back to `bin` when absent.
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string())
}

/// Metadata returned once a document has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredDocument {
    pub path: String,
    pub content_type: String,
    pub size_bytes: usize,
}

/// Time-boxed display URL for a stored document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SignedUrl {
    /// Issue a fresh signed URL for `path`. Backends that delegate signing to
    /// a cloud provider replace this; the reference stores use it as-is.
    pub fn issue(path: &str, ttl: Duration, now: DateTime<Utc>) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = now + ttl;
        Self {
            url: format!(
                "/files/{path}?token={token}&expires={}",
                expires_at.timestamp()
            ),
            token,
            expires_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("document not found at {path}")]
    NotFound { path: String },
    #[error("storage operation failed: {0}")]
    Backend(String),
}

/// Storage abstraction so workflows and tests can run without object storage.
pub trait DocumentStore: Send + Sync {
    fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: Mime,
    ) -> Result<StoredDocument, DocumentStoreError>;
    fn signed_url(&self, path: &str, ttl: Duration) -> Result<SignedUrl, DocumentStoreError>;
    fn delete(&self, path: &str) -> Result<(), DocumentStoreError>;
}
