//! Context assembly: graph facts for each extracted entity plus website
//! search results, framed and bounded into one block of text.

pub mod block;
mod fragments;

use std::sync::Arc;

use futures_util::future::join_all;

use crate::config::ContextConfig;
use crate::extraction::ExtractedEntities;
use crate::graph::{labels, EntityKind, GraphStore};
use crate::search::DocumentSearch;

/// Builds the retrieved-information block for one chat message.
pub struct ContextBuilder {
    graph: Arc<dyn GraphStore>,
    search: Option<Arc<dyn DocumentSearch>>,
    settings: ContextConfig,
}

impl ContextBuilder {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        search: Option<Arc<dyn DocumentSearch>>,
        settings: ContextConfig,
    ) -> Self {
        Self {
            graph,
            search,
            settings,
        }
    }

    /// Assemble the context for `message`. Never fails: a lookup that
    /// errors is logged and contributes nothing. Returns `""` when nothing
    /// relevant was found.
    pub async fn assemble(&self, message: &str, entities: &ExtractedEntities) -> String {
        let (graph_text, website) = tokio::join!(
            self.graph_text(message, entities),
            self.website_text(message)
        );

        let combined = format!("{}{}", block::graph_block(&graph_text), website);
        let context = block::normalize(block::truncate(combined, self.settings.max_chars));

        if context.is_empty() {
            log::debug!("Combined Context: [EMPTY]");
        } else {
            log::debug!("Combined Context built:\n{}", context);
        }
        context
    }

    async fn graph_text(&self, message: &str, entities: &ExtractedEntities) -> String {
        if entities.is_empty() {
            log::debug!("No entities extracted from message");
        }
        let lookups = EntityKind::ALL.iter().flat_map(|&kind| {
            entities
                .names(kind)
                .iter()
                .map(move |name| self.lookup(kind, name))
        });
        let mut text: String = join_all(lookups).await.concat();

        if text.is_empty() && message.to_lowercase().contains("recipes") {
            text = self.suggestions().await;
        }
        text
    }

    async fn lookup(&self, kind: EntityKind, name: &str) -> String {
        match fragments::describe(self.graph.as_ref(), kind, name).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("{} lookup for '{}' failed: {}", kind.display_name(), name, e);
                String::new()
            }
        }
    }

    /// Generic listing for "what recipes do you have" style questions.
    async fn suggestions(&self) -> String {
        let recipes = match self.graph.find_vertices(labels::RECIPE, None).await {
            Ok(recipes) => recipes,
            Err(e) => {
                log::warn!("General recipes query failed: {}", e);
                return String::new();
            }
        };
        let names: Vec<&str> = recipes
            .iter()
            .take(self.settings.suggestion_limit)
            .filter_map(|r| r.name())
            .collect();
        if names.is_empty() {
            return String::new();
        }
        format!(
            "\nHere are some recipes: {}... For more, please be specific.\n",
            names.join(", ")
        )
    }

    async fn website_text(&self, message: &str) -> String {
        let Some(search) = &self.search else {
            log::debug!("Search not configured, skipping website context");
            return String::new();
        };
        let results = search
            .search_documents(message, &[], self.settings.search_top_n)
            .await;
        if results.is_empty() {
            log::debug!("Search returned no results");
        }
        block::website_block(&results, self.settings.search_content_chars)
    }
}
