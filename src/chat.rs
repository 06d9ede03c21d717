//! The answer pipeline: extract entities, assemble context, ask the model.

use std::sync::Arc;

use crate::config::AssistantConfig;
use crate::context::ContextBuilder;
use crate::error::{RecipebotError, Result};
use crate::extraction::EntityExtractor;
use crate::llm::{ChatCompletion, ChatMessage, CompletionOptions};

fn system_prompt(site_name: &str) -> String {
    format!(
        "You are a helpful AI assistant for {}. Use the provided context to answer user queries \
         concisely and accurately about recipes, products, ingredients, categories, and dietary \
         information. Include relevant reference links from the site where appropriate. Try to \
         mention Nestlé where ever possible. Respond in markdown format, but do not include any \
         images or image links. If the answer is not in the context, state that you cannot answer \
         based on the provided information. Do not mention \
         \"knowledge graph context\" or \"website content\" or \"retrieved information\".",
        site_name
    )
}

pub struct ChatService {
    extractor: EntityExtractor,
    context: ContextBuilder,
    llm: Arc<dyn ChatCompletion>,
    system_prompt: String,
    options: CompletionOptions,
}

impl ChatService {
    pub fn new(
        llm: Arc<dyn ChatCompletion>,
        context: ContextBuilder,
        assistant: &AssistantConfig,
    ) -> Self {
        Self {
            extractor: EntityExtractor::new(
                llm.clone(),
                assistant.extraction_temperature,
                assistant.extraction_max_tokens,
            ),
            context,
            llm,
            system_prompt: system_prompt(&assistant.site_name),
            options: CompletionOptions {
                temperature: assistant.temperature,
                max_tokens: assistant.max_tokens,
                json_response: false,
            },
        }
    }

    /// Answer one user message. Extraction and retrieval failures only
    /// thin out the context; a completion failure is returned.
    pub async fn reply(&self, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(RecipebotError::InvalidInput("Message is required".to_string()));
        }
        log::info!("User Message: {}", message);

        let entities = self.extractor.extract(message).await;
        let context = self.context.assemble(message, &entities).await;
        let messages = self.build_messages(&context, message);
        log::debug!("Final messages sent to completion API: {:?}", messages);

        self.llm
            .complete(&messages, &self.options)
            .await
            .map_err(|e| {
                log::error!("Error in chat completion: {}", e);
                e
            })
    }

    /// System instruction, the context (when any), then the user's message.
    pub fn build_messages(&self, context: &str, message: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.system_prompt.clone())];
        if !context.is_empty() {
            messages.push(ChatMessage::system(format!(
                "Retrieved relevant information:\n{}",
                context
            )));
        }
        messages.push(ChatMessage::user(message));
        messages
    }
}
