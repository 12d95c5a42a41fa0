//! Spirit Services
//!
//! The two remote collaborators of the oracle, behind traits so the
//! controller never knows which model (or mock) is answering:
//!
//! - [`AnswerService`]: question + persona instruction + history → a
//!   sanitized answer and the updated history ([`SpiritMedium`])
//! - [`PersonaService`]: invents new spirits ([`PersonaForge`])

mod medium;
mod persona;
mod sanitize;

pub use medium::{SpiritMedium, DEFAULT_CONTEXT_TURNS};
pub use persona::{Persona, PersonaForge, PersonaProfile};
pub use sanitize::{sanitize_answer, SILENCE};

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::conversation::ConversationHistory;
use crate::error::OracleError;

/// A resolved answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    /// Sanitized answer text
    pub text: String,
    /// History with this exchange appended
    pub history: ConversationHistory,
}

/// Produces answers to questions
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Ask the spirit primed with `instruction`
    ///
    /// The returned text is already sanitized to `YES`, `NO`, `GOOD BYE` or a
    /// single uppercase alphanumeric token.
    async fn ask(
        &self,
        question: &str,
        instruction: &str,
        history: ConversationHistory,
    ) -> Result<Answer, OracleError>;
}

/// Produces spirit personas
#[async_trait]
pub trait PersonaService: Send + Sync {
    /// Invent one persona
    async fn generate_persona(&self) -> Result<Persona, OracleError>;

    /// Invent `count` personas concurrently
    ///
    /// `on_progress` receives the completed percentage after each persona
    /// lands. Fails if any single generation fails.
    async fn generate_batch(
        &self,
        count: usize,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<Vec<Persona>, OracleError> {
        let mut pending: FuturesUnordered<_> =
            (0..count).map(|_| self.generate_persona()).collect();
        let mut personas = Vec::with_capacity(count);

        while let Some(result) = pending.next().await {
            personas.push(result?);
            let percent = personas.len() * 100 / count.max(1);
            on_progress(u8::try_from(percent).unwrap_or(100));
        }

        Ok(personas)
    }
}
