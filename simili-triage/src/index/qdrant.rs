//! Qdrant REST implementation of [`SimilarityIndex`].

use crate::index::{IndexError, SimilarityIndex};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Qdrant collection client.
#[derive(Debug, Clone)]
pub struct QdrantIndex {
    http_client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl QdrantIndex {
    /// Creates a client for the Qdrant instance at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidUrl`] for an unusable URL and
    /// [`IndexError::Http`] if the HTTP client cannot be built.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, IndexError> {
        let base_url = Url::parse(url.trim_end_matches('/')).map_err(|_| IndexError::InvalidUrl {
            url: url.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(IndexError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    fn delete_url(&self, collection: &str) -> Result<Url, IndexError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| IndexError::InvalidUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(["collections", collection, "points", "delete"]);
        url.set_query(Some("wait=true"));
        Ok(url)
    }
}

#[async_trait]
impl SimilarityIndex for QdrantIndex {
    async fn delete(&self, collection: &str, key: &str) -> Result<(), IndexError> {
        let url = self.delete_url(collection)?;
        let mut request = self
            .http_client
            .post(url)
            .json(&json!({ "points": [key] }));
        if let Some(api_key) = &self.api_key {
            request = request.header("api-key", api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(collection, key, "Deleted index entry");
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND {
            debug!(collection, "Collection does not exist, nothing to delete");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(IndexError::Status {
            collection: collection.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
