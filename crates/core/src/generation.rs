use crate::traits::Generator;
use crate::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Chat-completions client for OpenAI and compatible servers.
pub struct OpenAiGenerator {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(api_key: Option<String>, model: impl Into<String>, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request_body(&self, prompt: &str, max_tokens: u32) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": max_tokens,
        })
    }
}

fn completion_text(body: &Value) -> Result<String, GenerationError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GenerationError::Parse("missing choices[0].message.content".to_string()))
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let body = self.request_body(prompt, max_tokens);

        let mut request = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        completion_text(&response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "210 bar"}}]
        });
        assert_eq!(completion_text(&body).unwrap(), "210 bar");
    }

    #[test]
    fn missing_choice_is_a_parse_error() {
        assert!(matches!(
            completion_text(&json!({"choices": []})),
            Err(GenerationError::Parse(_))
        ));
    }

    #[test]
    fn request_carries_temperature_and_token_limit() {
        let generator = OpenAiGenerator::new(None, "local-model", "http://localhost:8080/")
            .with_temperature(0.5);

        let body = generator.request_body("What pressure?", 120);

        assert_eq!(body["model"], "local-model");
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_tokens"], 120);
        assert_eq!(body["messages"][0]["content"], "What pressure?");
        assert_eq!(generator.base_url, "http://localhost:8080");
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let generator = OpenAiGenerator::new(Some("  ".to_string()), "m", "http://localhost:8080/");
        assert!(generator.api_key.is_none());
        assert_eq!(generator.base_url, "http://localhost:8080");
    }
}
