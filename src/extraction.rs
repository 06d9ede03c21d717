//! LLM-backed entity extraction from a raw chat message.

use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::error::{RecipebotError, Result};
use crate::graph::EntityKind;
use crate::llm::{ChatCompletion, ChatMessage, CompletionOptions};

/// Literal names the model found in a message, grouped by category.
///
/// Every key is optional in the model's reply; `null`, a bare string or
/// an array of strings are all accepted. Entries are trimmed and blanks
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractedEntities {
    #[serde(deserialize_with = "lenient_list")]
    pub recipe: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub product: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub ingredient: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub category: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub cuisine: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub dietary_tag: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub allergen: Vec<String>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.recipe.is_empty()
            && self.product.is_empty()
            && self.ingredient.is_empty()
            && self.category.is_empty()
            && self.cuisine.is_empty()
            && self.dietary_tag.is_empty()
            && self.allergen.is_empty()
    }

    /// Names extracted for a category that is looked up in the graph.
    pub fn names(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::Recipe => &self.recipe,
            EntityKind::Product => &self.product,
            EntityKind::Ingredient => &self.ingredient,
            EntityKind::Category => &self.category,
            EntityKind::DietaryTag => &self.dietary_tag,
        }
    }

    /// Parse a model reply, tolerating a fenced code block around the JSON.
    pub fn parse(reply: &str) -> Result<Self> {
        let body = strip_code_fence(reply);
        serde_json::from_str(body).map_err(|e| RecipebotError::Parse(format!("Entity reply is not valid JSON: {}", e)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<Option<String>>),
}

fn lenient_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<OneOrMany> = Option::deserialize(deserializer)?;
    let items = match raw {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v.into_iter().flatten().collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn extraction_prompt(message: &str) -> String {
    format!(
        "Extract any recipe names, product names, ingredient names, category names, cuisine types, \
         dietary tags, or allergen names from the following query: \"{}\". Respond as a JSON object \
         with keys 'recipe', 'product', 'ingredient', 'category', 'cuisine', 'dietary_tag', 'allergen'. \
         Example: {{\"recipe\":[\"Classic Crispy Squares\"], \"product\":[], \"ingredient\":[], \
         \"category\":[], \"cuisine\":[], \"dietary_tag\":[], \"allergen\":[]}}. \
         If nothing found for a key, use an empty array.",
        message
    )
}

/// Asks the completion model which graph entities a message names.
pub struct EntityExtractor {
    llm: Arc<dyn ChatCompletion>,
    options: CompletionOptions,
}

impl EntityExtractor {
    pub fn new(llm: Arc<dyn ChatCompletion>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            llm,
            options: CompletionOptions {
                temperature,
                max_tokens,
                json_response: true,
            },
        }
    }

    /// Extract entities; any call or parse failure yields the empty set.
    pub async fn extract(&self, message: &str) -> ExtractedEntities {
        match self.try_extract(message).await {
            Ok(entities) => {
                log::info!("Extracted entities: {:?}", entities);
                entities
            }
            Err(e) => {
                log::error!("Error extracting entities with LLM: {}", e);
                ExtractedEntities::default()
            }
        }
    }

    async fn try_extract(&self, message: &str) -> Result<ExtractedEntities> {
        let messages = [ChatMessage::user(extraction_prompt(message))];
        let reply = self.llm.complete(&messages, &self.options).await?;
        log::debug!("Raw LLM extraction response: {}", reply);
        ExtractedEntities::parse(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlm;

    #[test]
    fn test_parse_full_reply() {
        let e = ExtractedEntities::parse(
            r#"{"recipe":["Banana Bread"], "product":[], "ingredient":["Flour"], "category":[],
                "cuisine":[], "dietary_tag":["Vegetarian"], "allergen":[]}"#,
        )
        .unwrap();
        assert_eq!(e.recipe, vec!["Banana Bread"]);
        assert_eq!(e.names(EntityKind::Ingredient), ["Flour".to_string()]);
        assert_eq!(e.names(EntityKind::DietaryTag), ["Vegetarian".to_string()]);
        assert!(!e.is_empty());
    }

    #[test]
    fn test_parse_lenient_shapes() {
        let e = ExtractedEntities::parse(r#"{"recipe": "  Nanaimo Bars ", "product": null, "ingredient": ["", " Eggs", null]}"#)
            .unwrap();
        assert_eq!(e.recipe, vec!["Nanaimo Bars"]);
        assert!(e.product.is_empty());
        assert_eq!(e.ingredient, vec!["Eggs"]);
        assert!(e.allergen.is_empty());
    }

    #[test]
    fn test_parse_fenced_reply() {
        let e = ExtractedEntities::parse("```json\n{\"product\": [\"NESTLÉ TOLL HOUSE Chocolate Chips\"]}\n```").unwrap();
        assert_eq!(e.product.len(), 1);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(ExtractedEntities::parse("I could not find anything").is_err());
        assert!(ExtractedEntities::default().is_empty());
    }

    #[test]
    fn test_prompt_embeds_message() {
        let prompt = extraction_prompt("How do I make Banana Bread?");
        assert!(prompt.contains("\"How do I make Banana Bread?\""));
        assert!(prompt.contains("'dietary_tag'"));
        assert!(prompt.contains(r#"{"recipe":["Classic Crispy Squares"]"#));
    }

    #[tokio::test]
    async fn test_extract_requests_json_mode() {
        let llm = Arc::new(FakeLlm::new());
        llm.reply(Ok(r#"{"recipe":["Banana Bread"]}"#.to_string()));
        let extractor = EntityExtractor::new(llm.clone(), 0.1, 400);

        let entities = extractor.extract("Tell me about Banana Bread").await;
        assert_eq!(entities.recipe, vec!["Banana Bread"]);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        let (messages, options) = &requests[0];
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("Tell me about Banana Bread"));
        assert!(options.json_response);
        assert_eq!(options.max_tokens, 400);
    }

    #[tokio::test]
    async fn test_extract_failure_is_empty() {
        let llm = Arc::new(FakeLlm::new());
        llm.reply(Err(RecipebotError::Completion {
            status: Some(500),
            message: "boom".to_string(),
        }));
        llm.reply(Ok("not json".to_string()));
        let extractor = EntityExtractor::new(llm, 0.1, 400);

        assert!(extractor.extract("anything").await.is_empty());
        assert!(extractor.extract("anything").await.is_empty());
    }
}
