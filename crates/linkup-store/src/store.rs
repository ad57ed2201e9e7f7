//! The document store seam.
//!
//! Repositories talk to a `dyn DocumentStore`, so the same code runs against
//! Firestore in production and against [`MemoryStore`](crate::MemoryStore)
//! in tests and local development.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::types::{Document, Fields, StructuredQuery};

/// Whether `id` can name a single document: non-empty, at most 1500 bytes,
/// no `/`, not `.` or `..`, and not a reserved `__name__` form.
pub fn is_valid_doc_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 1500
        && !id.contains('/')
        && id != "."
        && id != ".."
        && !(id.starts_with("__") && id.ends_with("__"))
}

/// Reject ids that would address a different resource than intended.
pub fn check_doc_id(id: &str) -> StoreResult<()> {
    if is_valid_doc_id(id) {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

/// Shared handle to a store backend.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Single-document operations plus structured queries.
///
/// Collections are slash-separated paths (`posts`, `chats/{id}/messages`).
/// Every write is atomic for one document only.
///
/// Document ids are checked with [`is_valid_doc_id`]. An invalid id names no
/// document: reads return nothing, deletes succeed, and writes fail with
/// `InvalidId`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logs and readiness output.
    fn backend(&self) -> &'static str;

    /// Get a document; `Ok(None)` when it does not exist.
    async fn get_document(&self, collection: &str, doc_id: &str) -> StoreResult<Option<Document>>;

    /// Get several documents of one collection. Missing ids are skipped and
    /// the result order is unspecified.
    async fn batch_get_documents(
        &self,
        collection: &str,
        doc_ids: &[String],
    ) -> StoreResult<Vec<Document>>;

    /// Create-only write. Fails with `AlreadyExists` when the id is taken.
    async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: Fields,
    ) -> StoreResult<Document>;

    /// Update an existing document. With a mask only the listed fields are
    /// replaced; without one the whole field set is replaced. Fails with
    /// `NotFound` when the document does not exist.
    async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: Fields,
        update_mask: Option<Vec<String>>,
    ) -> StoreResult<Document>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete_document(&self, collection: &str, doc_id: &str) -> StoreResult<()>;

    /// Run a structured query. `parent_path` is empty for top-level
    /// collections or the parent document path for subcollections.
    async fn run_query(&self, parent_path: &str, query: StructuredQuery)
        -> StoreResult<Vec<Document>>;

    /// Verify the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Release resources held by the backend.
    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_rules() {
        assert!(is_valid_doc_id("ada@example.com"));
        assert!(is_valid_doc_id("job1_ada"));
        assert!(!is_valid_doc_id(""));
        assert!(!is_valid_doc_id("a/b@example.com"));
        assert!(!is_valid_doc_id(".."));
        assert!(!is_valid_doc_id("__id__"));
        assert!(matches!(check_doc_id("x/y"), Err(StoreError::InvalidId(_))));
    }
}
