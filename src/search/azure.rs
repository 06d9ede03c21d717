use crate::config::{SearchServiceConfig, SearchTuning};
use crate::error::{RecipebotError, Result};
use crate::search::{DocumentSearch, SearchResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const SELECT_FIELDS: &str = "title,url,content";

/// Response structure from the documents search API
#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "@search.score", default)]
    score: Option<f64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        SearchResult {
            score: hit.score.unwrap_or(0.0),
            title: non_empty(hit.title).unwrap_or_else(|| "No Title".to_string()),
            content: non_empty(hit.content).unwrap_or_else(|| "No content available".to_string()),
            url: non_empty(hit.url).unwrap_or_else(|| "#".to_string()),
        }
    }
}

/// Azure Cognitive Search client (REST, semantic ranking)
pub struct AzureSearchClient {
    client: Client,
    endpoint: String,
    api_key: String,
    index: String,
    tuning: SearchTuning,
}

impl AzureSearchClient {
    pub fn new(config: &SearchServiceConfig, tuning: SearchTuning, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecipebotError::Config(format!("Failed to build HTTP client: {}", e)))?;

        log::info!("Azure Search client initialized for index: {}", config.index);

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            index: config.index.clone(),
            tuning,
        })
    }

    fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, self.index, self.tuning.api_version
        )
    }

    fn request_body(&self, query: &str, fields: &[String], top_n: usize) -> Value {
        let mut body = json!({
            "search": query,
            "queryType": "semantic",
            "semanticConfiguration": self.tuning.semantic_configuration,
            "queryLanguage": self.tuning.query_language,
            "top": top_n,
            "select": SELECT_FIELDS,
        });
        if !fields.is_empty() {
            body["searchFields"] = Value::String(fields.join(","));
        }
        body
    }

    async fn try_search(&self, query: &str, fields: &[String], top_n: usize) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .post(self.search_url())
            .header("api-key", &self.api_key)
            .json(&self.request_body(query, fields, top_n))
            .send()
            .await
            .map_err(|e| RecipebotError::Search(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RecipebotError::Search(format!("Search API error {}: {}", status, body)));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RecipebotError::Search(format!("Failed to parse response: {}", e)))?;

        Ok(parsed
            .value
            .into_iter()
            .take(top_n)
            .map(SearchResult::from)
            .collect())
    }
}

#[async_trait]
impl DocumentSearch for AzureSearchClient {
    async fn search_documents(&self, query: &str, fields: &[String], top_n: usize) -> Vec<SearchResult> {
        if query.trim().is_empty() {
            log::debug!("Azure Search: No query text provided. Returning empty results.");
            return Vec::new();
        }

        log::debug!("Azure Search: Searching for \"{}\" in index \"{}\"", query, self.index);
        match self.try_search(query, fields, top_n).await {
            Ok(results) => {
                log::info!("Azure Search: Found {} results for \"{}\"", results.len(), query);
                results
            }
            Err(e) => {
                log::error!("Azure Search: Error performing search for \"{}\": {}", query, e);
                Vec::new()
            }
        }
    }
}
