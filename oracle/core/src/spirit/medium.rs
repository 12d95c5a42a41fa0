//! Spirit medium: the answer service
//!
//! Sends the question to the language model primed with the active persona's
//! instruction and the recent conversation, then sanitizes the reply.

use std::sync::Arc;

use async_trait::async_trait;

use super::sanitize::sanitize_answer;
use super::{Answer, AnswerService};
use crate::backend::{LlmBackend, LlmRequest};
use crate::conversation::ConversationHistory;
use crate::error::OracleError;

/// Turns of history sent as context by default
pub const DEFAULT_CONTEXT_TURNS: usize = 12;

/// Answers questions through an [`LlmBackend`]
pub struct SpiritMedium<B: LlmBackend> {
    backend: Arc<B>,
    model: String,
    context_turns: usize,
    temperature: Option<f32>,
    max_tokens: u32,
}

impl<B: LlmBackend> SpiritMedium<B> {
    /// Create a medium using `model` on `backend`
    pub fn new(backend: Arc<B>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            context_turns: DEFAULT_CONTEXT_TURNS,
            temperature: None,
            max_tokens: 0,
        }
    }

    /// How many recent turns to send as context (0 sends none)
    #[must_use]
    pub fn with_context_turns(mut self, turns: usize) -> Self {
        self.context_turns = turns;
        self
    }

    /// Sample with a specific temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the reply length
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(
        &self,
        question: &str,
        instruction: &str,
        history: &ConversationHistory,
    ) -> LlmRequest {
        let mut request = LlmRequest::new(question, &self.model)
            .with_system(instruction)
            .with_max_tokens(self.max_tokens);

        if self.context_turns > 0 {
            request = request.with_context(history.build_context(self.context_turns));
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        request
    }
}

#[async_trait]
impl<B: LlmBackend + 'static> AnswerService for SpiritMedium<B> {
    async fn ask(
        &self,
        question: &str,
        instruction: &str,
        mut history: ConversationHistory,
    ) -> Result<Answer, OracleError> {
        let request = self.build_request(question, instruction, &history);

        let response = self.backend.send(&request).await.map_err(|e| {
            tracing::warn!(backend = self.backend.name(), error = %e, "Spirit did not answer");
            OracleError::service("answer", format!("{e:#}"))
        })?;

        let text = sanitize_answer(&response.content);
        tracing::debug!(raw = %response.content, answer = %text, "Spirit answered");

        history.push_question(question);
        history.push_answer(text.clone());

        Ok(Answer { text, history })
    }
}
