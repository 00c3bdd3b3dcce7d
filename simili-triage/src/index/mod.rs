//! Similarity index collaborator.
//!
//! Only deletion is needed here: a transferred issue must not keep showing
//! up as a duplicate candidate in its old organization's collection.

mod error;
mod qdrant;

pub use error::IndexError;
pub use qdrant::QdrantIndex;

use async_trait::async_trait;

/// Vector index keyed by collection and per-issue key.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Deletes one entry. Deleting a missing entry succeeds.
    async fn delete(&self, collection: &str, key: &str) -> Result<(), IndexError>;
}

/// Index used when no `[vector-index]` is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledIndex;

#[async_trait]
impl SimilarityIndex for DisabledIndex {
    async fn delete(&self, _collection: &str, _key: &str) -> Result<(), IndexError> {
        Ok(())
    }
}

/// Per-organization collection name: `{prefix}_{org}` with the org lower-cased
/// and anything but ASCII letters and digits replaced by `_`.
#[must_use]
pub fn collection_name(prefix: &str, org: &str) -> String {
    let org: String = org
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{prefix}_{org}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_name_is_sanitized() {
        assert_eq!(collection_name("simili", "Acme"), "simili_acme");
        assert_eq!(collection_name("simili", "my-org.io"), "simili_my_org_io");
    }

    #[tokio::test]
    async fn disabled_index_accepts_deletes() {
        assert!(DisabledIndex.delete("simili_acme", "key").await.is_ok());
    }
}
