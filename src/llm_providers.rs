use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{error, info};

use crate::config::LLMConfig;

/// Common message structure for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

/// A chat-completions backend the quiz generator can talk to.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one prompt (with an optional system message) and return the reply text.
    async fn complete(&self, system_message: Option<&str>, prompt: &str) -> Result<String>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat completions provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<LLMMessage>,
    max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    error: Option<OpenAIError>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChoice {
    message: LLMMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIError {
    message: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            max_tokens,
        }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new(
            config.api_key.clone(),
            config.base_url.clone(),
            Some(config.model.clone()),
            config.max_tokens,
        )
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn complete(&self, system_message: Option<&str>, prompt: &str) -> Result<String> {
        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            messages.push(LLMMessage {
                role: "system".to_string(),
                content: sys_msg.to_string(),
            });
        }

        messages.push(LLMMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request_body = OpenAIRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
        };

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(anyhow::anyhow!("OpenAI API request failed: {}", error_text));
        }

        let openai_response: OpenAIResponse = response.json().await?;

        if let Some(api_error) = openai_response.error {
            return Err(anyhow::anyhow!("OpenAI API returned an error: {}", api_error.message));
        }

        let response_content = openai_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("No content returned from API"))?;

        info!(
            provider = self.provider_name(),
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?").expect("code fence pattern is valid")
});

/// Turns LLM replies into typed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseParser;

impl JsonResponseParser {
    /// Remove every markdown code fence marker and surrounding whitespace.
    pub fn strip_code_fences(content: &str) -> String {
        CODE_FENCE.replace_all(content, "").trim().to_string()
    }

    /// Best-effort JSON extraction: fence-stripped text, or else the outermost `{...}`.
    pub fn extract_json_from_response(content: &str) -> String {
        let stripped = Self::strip_code_fences(content);
        if stripped.starts_with('{') || stripped.starts_with('[') {
            return stripped;
        }

        match (stripped.find('{'), stripped.rfind('}')) {
            (Some(start), Some(end)) if end > start => stripped[start..=end].to_string(),
            _ => stripped,
        }
    }

    pub fn parse_json_response<T>(&self, content: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let json_content = Self::extract_json_from_response(content);
        serde_json::from_str::<T>(&json_content)
            .map_err(|e| anyhow::anyhow!("Failed to parse JSON response: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_code_fences() {
        let reply = "```json\n{\"questions\": []}\n```";
        assert_eq!(JsonResponseParser::strip_code_fences(reply), "{\"questions\": []}");

        let plain = "```\n[1, 2]\n```";
        assert_eq!(JsonResponseParser::strip_code_fences(plain), "[1, 2]");
    }

    #[test]
    fn test_extract_json_with_surrounding_prose() {
        let reply = "Here is your quiz:\n{\"questions\": [{\"a\": 1}]}\nGood luck!";
        assert_eq!(
            JsonResponseParser::extract_json_from_response(reply),
            "{\"questions\": [{\"a\": 1}]}"
        );
    }

    #[test]
    fn test_parse_json_response_errors_on_garbage() {
        let parser = JsonResponseParser;
        assert!(parser.parse_json_response::<Value>("no json here").is_err());

        let value: Value = parser.parse_json_response("```json {\"ok\": true} ```").unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_provider_defaults() {
        let provider = OpenAIProvider::new("sk-test".to_string(), None, None, 1500);
        assert_eq!(provider.provider_name(), "OpenAI");
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }
}
