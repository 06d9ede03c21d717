use crate::config::OpenAiConfig;
use crate::error::{RecipebotError, Result};
use crate::llm::{ChatCompletion, ChatMessage, CompletionOptions};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request structure for the chat completions API
#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Response structure from the chat completions API
#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error envelope returned with non-2xx statuses
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Azure OpenAI chat-completions client
///
/// One request per call, no retries; the whole request runs under the
/// configured timeout.
pub struct AzureOpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
    timeout: Duration,
}

impl AzureOpenAiClient {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint, key, deployment name and API version
    /// * `timeout` - Deadline for each completion request
    pub fn new(config: &OpenAiConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecipebotError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            deployment: config.deployment.clone(),
            api_version: config.api_version.clone(),
            timeout,
        })
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

#[async_trait]
impl ChatCompletion for AzureOpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], options: &CompletionOptions) -> Result<String> {
        let request = CompletionRequest {
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_response.then_some(ResponseFormat { kind: "json_object" }),
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(RecipebotError::Completion {
                status: Some(status.as_u16()),
                message: error_message(status.as_u16(), &body),
            });
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        log::debug!("Completion API call took {:?}", start.elapsed());

        first_choice_text(result)
    }
}

impl AzureOpenAiClient {
    fn map_transport_error(&self, error: reqwest::Error) -> RecipebotError {
        if error.is_timeout() {
            RecipebotError::timeout("Completion request", self.timeout)
        } else if error.is_decode() {
            RecipebotError::Completion {
                status: None,
                message: format!("Failed to parse response: {}", error),
            }
        } else {
            RecipebotError::Completion {
                status: None,
                message: format!("Network error: {}", error),
            }
        }
    }
}

fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.code {
            Some(code) => format!("{} ({}): {}", status, code, envelope.error.message),
            None => format!("{}: {}", status, envelope.error.message),
        },
        Err(_) => format!("{}: {}", status, body),
    }
}

fn first_choice_text(response: CompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| RecipebotError::Completion {
            status: None,
            message: "Empty response from completion API".to_string(),
        })
}
