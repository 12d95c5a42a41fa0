//! Ollama Backend
//!
//! Talks to a local Ollama server over its REST API:
//! - `/api/generate` - single completions (always non-streaming here; the
//!   oracle only ever wants one word or one JSON document back)
//! - `/api/tags` - installed models, also used as the health probe

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;

use super::traits::{LlmBackend, LlmRequest, LlmResponse};
use crate::config::BackendSettings;

/// Ollama backend client
#[derive(Clone, Debug)]
pub struct OllamaBackend {
    host: String,
    port: u16,
    http_client: reqwest::Client,
}

impl OllamaBackend {
    /// Create a client for the server at `host:port`
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            host: host.into(),
            port,
            http_client,
        })
    }

    /// Create from the `[backend]` settings
    pub fn from_settings(settings: &BackendSettings) -> anyhow::Result<Self> {
        Self::new(
            settings.host.clone(),
            settings.port,
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url())
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url())
    }

    /// JSON body for `/api/generate`
    fn generate_body(request: &LlmRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "prompt": request.full_prompt(),
            "stream": false,
        });

        if request.json_output {
            body["format"] = serde_json::json!("json");
        }

        let mut options = serde_json::Map::new();
        if let Some(temperature) = request.temperature {
            options.insert("temperature".to_string(), serde_json::json!(temperature));
        }
        if request.max_tokens > 0 {
            options.insert(
                "num_predict".to_string(),
                serde_json::json!(request.max_tokens),
            );
        }
        if !options.is_empty() {
            body["options"] = serde_json::Value::Object(options);
        }

        body
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.tags_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|response| response.status().is_success())
    }

    async fn send(&self, request: &LlmRequest) -> anyhow::Result<LlmResponse> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(self.generate_url())
            .json(&Self::generate_body(request))
            .send()
            .await
            .with_context(|| format!("Ollama at {} is unreachable", self.base_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama returned {status}: {body}");
        }

        let data: serde_json::Value = response.json().await?;

        let content = data
            .get("response")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        let tokens_used = data
            .get("eval_count")
            .and_then(serde_json::Value::as_u64)
            .and_then(|count| u32::try_from(count).ok());

        tracing::debug!(
            model = %request.model,
            tokens = ?tokens_used,
            elapsed_ms = start.elapsed().as_millis(),
            "Ollama generation complete"
        );

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            tokens_used,
            duration_ms: u64::try_from(start.elapsed().as_millis()).ok(),
        })
    }

    async fn list_models(&self) -> anyhow::Result<Vec<String>> {
        let response = self
            .http_client
            .get(self.tags_url())
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama returned {status}: {body}");
        }

        let data: serde_json::Value = response.json().await?;

        let models = data
            .get("models")
            .and_then(serde_json::Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m.get("name")?.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_urls() {
        let backend = OllamaBackend::new("localhost", 11434, Duration::from_secs(30)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:11434");
        assert_eq!(backend.generate_url(), "http://localhost:11434/api/generate");
        assert_eq!(backend.tags_url(), "http://localhost:11434/api/tags");
    }

    #[test]
    fn test_generate_body_minimal() {
        let body = OllamaBackend::generate_body(&LlmRequest::new("Hello", "llama3.2"));
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["prompt"], "Hello");
        assert_eq!(body["stream"], false);
        assert!(body.get("format").is_none());
        assert!(body.get("options").is_none());
    }

    #[test]
    fn test_generate_body_with_options() {
        let request = LlmRequest::new("Persona please", "llama3.2")
            .with_json_output()
            .with_temperature(0.9)
            .with_max_tokens(200);
        let body = OllamaBackend::generate_body(&request);

        assert_eq!(body["format"], "json");
        assert_eq!(body["options"]["num_predict"], 200);
        assert!(body["options"]["temperature"].is_number());
    }

    #[test]
    fn test_from_settings() {
        let settings = BackendSettings {
            host: "example.com".to_string(),
            port: 8080,
            ..BackendSettings::default()
        };
        let backend = OllamaBackend::from_settings(&settings).unwrap();
        assert_eq!(backend.base_url(), "http://example.com:8080");
    }
}
