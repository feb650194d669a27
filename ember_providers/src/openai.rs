use async_trait::async_trait;
use ember_core::{ChatMessage, Completion, CompletionGateway, ToolCall, Usage};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::retry::{RetryPolicy, retry_with_backoff};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// Completion gateway speaking the OpenAI chat-completions protocol,
/// including function tool calling.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    retry: RetryPolicy,
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        info!("Creating OpenAiProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.default_model = model;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn try_send(&self, request: &serde_json::Value) -> anyhow::Result<Completion> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        parse_completion(&response)
    }
}

/// Extract content, tool calls and usage from a chat-completions response.
fn parse_completion(response: &serde_json::Value) -> anyhow::Result<Completion> {
    let message = &response["choices"][0]["message"];
    if message.is_null() {
        anyhow::bail!("Invalid response format: missing message");
    }

    let tool_calls: Vec<ToolCall> = match message.get("tool_calls") {
        Some(calls) if calls.is_array() => serde_json::from_value(calls.clone())?,
        _ => Vec::new(),
    };

    // Content is null when the model answers with tool calls only.
    let content = message["content"].as_str().unwrap_or_default().to_string();
    if content.is_empty() && tool_calls.is_empty() {
        anyhow::bail!("Invalid response format: neither content nor tool calls");
    }

    let usage = response["usage"].as_object().map(|u| Usage {
        prompt_tokens: u32::try_from(u["prompt_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        completion_tokens: u32::try_from(u["completion_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        total_tokens: u32::try_from(u["total_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
    });

    Ok(Completion {
        content,
        tool_calls,
        usage,
    })
}

#[async_trait]
impl CompletionGateway for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
        model: &str,
    ) -> anyhow::Result<Completion> {
        let mut request = json!({
            "model": model,
            "messages": messages,
        });
        if !tools.is_empty() {
            request["tools"] = serde_json::Value::Array(tools.to_vec());
        }

        debug!(
            "Sending completion request: model={model}, messages={}, tools={}",
            messages.len(),
            tools.len()
        );

        let completion = retry_with_backoff(&self.retry, || self.try_send(&request)).await?;

        debug!(
            "Completion received: content_len={}, tool_calls={}",
            completion.content.len(),
            completion.tool_calls.len()
        );
        Ok(completion)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn parses_plain_text_response() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "37.50"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        });

        let completion = parse_completion(&response).unwrap();
        assert_eq!(completion.content, "37.50");
        assert!(completion.tool_calls.is_empty());
        assert_eq!(completion.usage.unwrap().total_tokens, 13);
    }

    #[test]
    fn parses_tool_call_response_with_null_content() {
        let response = json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_abc",
                    "type": "function",
                    "function": {"name": "save_memory", "arguments": "{\"memory\":\"User likes jazz\"}"}
                }]
            }}]
        });

        let completion = parse_completion(&response).unwrap();
        assert!(completion.content.is_empty());
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].id, "call_abc");
        assert_eq!(completion.tool_calls[0].function.name, "save_memory");
        assert!(completion.tool_calls[0].function.arguments.contains("jazz"));
        assert!(completion.usage.is_none());
    }

    #[test]
    fn rejects_response_without_message() {
        let response = json!({"choices": []});
        assert!(parse_completion(&response).is_err());
    }

    #[test]
    fn rejects_empty_response() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        });
        assert!(parse_completion(&response).is_err());
    }
}
