//! Search access layer: free-text queries against the site document index.

pub mod azure;

pub use azure::AzureSearchClient;

use async_trait::async_trait;
use serde::Serialize;

/// One ranked document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub score: f64,
    pub title: String,
    pub content: String,
    pub url: String,
}

/// A relevance-ranked document index.
///
/// Failures are absorbed: any error or an empty query yields an empty list.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    /// Up to `top_n` results for `query`; `fields` narrows the searched fields
    /// (empty = every searchable field).
    async fn search_documents(&self, query: &str, fields: &[String], top_n: usize) -> Vec<SearchResult>;
}
