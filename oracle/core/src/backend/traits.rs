//! Language Model Backend Traits
//!
//! The spirit services talk to a language model through [`LlmBackend`], so
//! the provider can be swapped (or mocked in tests) without touching the
//! answer or persona logic.

use async_trait::async_trait;

/// A single non-streaming generation request
#[derive(Clone, Debug, PartialEq)]
pub struct LlmRequest {
    /// The prompt to complete
    pub prompt: String,
    /// Model identifier (backend-specific)
    pub model: String,
    /// Sampling temperature; `None` leaves the backend default
    pub temperature: Option<f32>,
    /// Maximum tokens in the response (0 = backend default)
    pub max_tokens: u32,
    /// Behavioral instruction placed before everything else
    pub system: Option<String>,
    /// Earlier conversation, placed between the instruction and the prompt
    pub context: Option<String>,
    /// Ask the backend to constrain output to a JSON document
    pub json_output: bool,
}

impl LlmRequest {
    /// Create a request with a prompt and model
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature: None,
            max_tokens: 0,
            system: None,
            context: None,
            json_output: false,
        }
    }

    /// Set temperature (clamped to 0.0-2.0)
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    /// Set the behavioral instruction
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set conversation context (ignored when empty)
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = (!context.is_empty()).then_some(context);
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request JSON output
    #[must_use]
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    /// The full prompt text: instruction, context, then the prompt itself
    #[must_use]
    pub fn full_prompt(&self) -> String {
        let mut full = String::new();

        if let Some(ref system) = self.system {
            full.push_str(system);
            full.push_str("\n\n");
        }

        if let Some(ref context) = self.context {
            full.push_str(context);
            full.push('\n');
        }

        full.push_str(&self.prompt);
        full
    }
}

/// A completed generation
#[derive(Clone, Debug)]
pub struct LlmResponse {
    /// Generated text
    pub content: String,
    /// Model that produced it
    pub model: String,
    /// Tokens generated, if reported
    pub tokens_used: Option<u32>,
    /// Wall-clock generation time in milliseconds
    pub duration_ms: Option<u64>,
}

/// Language model backend
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Backend name for logs (e.g. "Ollama")
    fn name(&self) -> &str;

    /// Whether the backend is reachable
    async fn health_check(&self) -> bool;

    /// Send a request and wait for the complete response
    async fn send(&self, request: &LlmRequest) -> anyhow::Result<LlmResponse>;

    /// Names of the models the backend can serve
    async fn list_models(&self) -> anyhow::Result<Vec<String>>;

    /// Whether a specific model is available
    async fn has_model(&self, model: &str) -> anyhow::Result<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m == model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_request_builder() {
        let request = LlmRequest::new("Who are you?", "llama3.2")
            .with_temperature(3.0)
            .with_system("You are a spirit")
            .with_max_tokens(16)
            .with_json_output();

        assert_eq!(request.prompt, "Who are you?");
        assert_eq!(request.model, "llama3.2");
        assert_eq!(request.temperature, Some(2.0));
        assert_eq!(request.system.as_deref(), Some("You are a spirit"));
        assert_eq!(request.max_tokens, 16);
        assert!(request.json_output);
    }

    #[test]
    fn test_empty_context_is_dropped() {
        let request = LlmRequest::new("Hello", "m").with_context("");
        assert!(request.context.is_none());
    }

    #[test]
    fn test_full_prompt() {
        assert_eq!(LlmRequest::new("Hello", "m").full_prompt(), "Hello");

        let request = LlmRequest::new("Hello", "m").with_system("Be terse");
        assert_eq!(request.full_prompt(), "Be terse\n\nHello");

        let request = LlmRequest::new("Hello", "m")
            .with_system("Be terse")
            .with_context("Asker: Hi\nSpirit: YES\n");
        assert_eq!(
            request.full_prompt(),
            "Be terse\n\nAsker: Hi\nSpirit: YES\n\nHello"
        );
    }
}
