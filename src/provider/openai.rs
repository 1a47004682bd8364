use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::wire::CallResult;

/// OpenAI chat-completions adapter. Sends the built prompt as a single user
/// message with no extra scaffolding.
pub struct OpenAIProvider {
    api_key: String,
    client: Client,
    timeout_secs: u64,
}

impl OpenAIProvider {
    pub fn new(api_key: String, timeout_secs: u64) -> Self {
        Self { api_key, client: Client::new(), timeout_secs }
    }
}

#[async_trait]
impl super::Provider for OpenAIProvider {
    async fn send(&self, prompt: &str, model: &str, debug: bool) -> Result<CallResult> {
        let body = json!({
            "model": model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.0,
            "top_p": 1.0
        });

        if debug {
            eprintln!("debug[openai]: HTTP POST /v1/chat/completions model={model}");
        }

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if debug {
            eprintln!("debug[openai]: raw status: {}", status);
            eprintln!("debug[openai]: raw response:\n{}", &text);
        }

        if !status.is_success() {
            return Err(anyhow!("OpenAI API error ({}): {}", status, text));
        }

        #[derive(Deserialize)]
        struct ChatMessage {
            content: String,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChatMessage,
        }
        #[derive(Deserialize, Default)]
        struct Usage {
            #[serde(default)]
            prompt_tokens: u64,
            #[serde(default)]
            completion_tokens: u64,
        }
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
            #[serde(default)]
            usage: Option<Usage>,
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse OpenAI response: {e}\nRaw: {text}"))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI returned no choices"))?;

        let usage = parsed.usage.unwrap_or_default();
        Ok(CallResult {
            text: content,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        })
    }
}
