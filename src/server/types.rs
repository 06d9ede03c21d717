use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::graph::PropertyMap;
use crate::gremlin::protocol::scalar_to_string;

/// Body of `POST /chat`: a single `message`, or a `messages` history
/// whose last user entry is answered.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatRequest {
    pub fn user_message(&self) -> Option<&str> {
        let text = match self.message.as_deref() {
            Some(message) => message,
            None => self
                .messages
                .iter()
                .rev()
                .find(|m| m.role == "user")
                .map(|m| m.content.as_str())?,
        };
        let text = text.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Accepts strings, numbers and booleans; blanks become `None`.
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(scalar_to_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn put(properties: &mut PropertyMap, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        properties.insert(key.to_string(), value.clone());
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NewProduct {
    #[serde(default, deserialize_with = "scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub pk: Option<String>,
}

impl NewProduct {
    pub fn is_valid(&self) -> bool {
        self.name.is_some() && self.category.is_some() && self.pk.is_some()
    }

    /// Vertex properties, with `pk` stored under the graph's partition key.
    pub fn into_properties(self, partition_key: &str) -> PropertyMap {
        let mut p = PropertyMap::new();
        put(&mut p, "name", &self.name);
        put(&mut p, "category", &self.category);
        put(&mut p, "brand", &self.brand);
        put(&mut p, "sku", &self.sku);
        put(&mut p, "image_url", &self.image_url);
        put(&mut p, "url", &self.url);
        put(&mut p, partition_key, &self.pk);
        p
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NewRecipe {
    #[serde(default, deserialize_with = "scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub description: Option<String>,
    #[serde(default, rename = "prepTime", deserialize_with = "scalar")]
    pub prep_time: Option<String>,
    #[serde(default, rename = "cookTime", deserialize_with = "scalar")]
    pub cook_time: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub servings: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub pk: Option<String>,
}

impl NewRecipe {
    pub fn is_valid(&self) -> bool {
        self.name.is_some() && self.pk.is_some()
    }

    pub fn into_properties(self, partition_key: &str) -> PropertyMap {
        let mut p = PropertyMap::new();
        put(&mut p, "name", &self.name);
        put(&mut p, "description", &self.description);
        put(&mut p, "prepTime", &self.prep_time);
        put(&mut p, "cookTime", &self.cook_time);
        put(&mut p, "servings", &self.servings);
        put(&mut p, "difficulty", &self.difficulty);
        put(&mut p, "image_url", &self.image_url);
        put(&mut p, "url", &self.url);
        put(&mut p, partition_key, &self.pk);
        p
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NewUsesProduct {
    #[serde(default, rename = "recipeId", deserialize_with = "scalar")]
    pub recipe_id: Option<String>,
    #[serde(default, rename = "productId", deserialize_with = "scalar")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "scalar")]
    pub unit: Option<String>,
}

impl NewUsesProduct {
    pub fn edge_properties(&self) -> PropertyMap {
        let mut p = PropertyMap::new();
        put(&mut p, "quantity", &self.quantity);
        put(&mut p, "unit", &self.unit);
        p
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectedQuery {
    pub edge: Option<String>,
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "out".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_single_message() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": " Tell me about Banana Bread "}"#).unwrap();
        assert_eq!(req.user_message(), Some("Tell me about Banana Bread"));
    }

    #[test]
    fn test_chat_request_history_uses_last_user_entry() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "Hello!"},
                {"role": "user", "content": "Any vegetarian recipes?"},
                {"role": "assistant", "content": "..."}
            ]}"#,
        )
        .unwrap();
        assert_eq!(req.user_message(), Some("Any vegetarian recipes?"));
    }

    #[test]
    fn test_chat_request_message_wins() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message": "first", "messages": [{"role": "user", "content": "second"}]}"#,
        )
        .unwrap();
        assert_eq!(req.user_message(), Some("first"));
    }

    #[test]
    fn test_chat_request_missing_message() {
        assert_eq!(ChatRequest::default().user_message(), None);
        let req: ChatRequest = serde_json::from_str(r#"{"message": "   "}"#).unwrap();
        assert_eq!(req.user_message(), None);
    }

    #[test]
    fn test_recipe_properties_lenient_scalars() {
        let recipe: NewRecipe = serde_json::from_str(
            r#"{"name": "Banana Bread", "servings": 10, "prepTime": "15 mins", "description": "", "pk": "Banana Bread"}"#,
        )
        .unwrap();
        assert!(recipe.is_valid());
        let props = recipe.into_properties("pk");
        assert_eq!(props.get("servings").map(String::as_str), Some("10"));
        assert_eq!(props.get("prepTime").map(String::as_str), Some("15 mins"));
        assert!(!props.contains_key("description"));
    }

    #[test]
    fn test_product_requires_category_and_pk() {
        let product: NewProduct = serde_json::from_str(r#"{"name": "KIT KAT", "pk": "KIT KAT"}"#).unwrap();
        assert!(!product.is_valid());
        let product: NewProduct =
            serde_json::from_str(r#"{"name": "KIT KAT", "category": "Chocolate", "pk": "KIT KAT"}"#).unwrap();
        let props = product.into_properties("partition");
        assert_eq!(props.get("partition").map(String::as_str), Some("KIT KAT"));
        assert!(!props.contains_key("pk"));
    }
}
