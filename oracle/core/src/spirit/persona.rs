//! Personas
//!
//! A persona is the spirit currently on the other end of the board: a name,
//! a short backstory and the behavioral instruction the answer service is
//! primed with. [`PersonaForge`] asks the language model to invent new ones.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::PersonaService;
use crate::backend::{LlmBackend, LlmRequest};
use crate::error::OracleError;

/// Answer-format rules appended to every persona's instruction
const ANSWER_RULES: &str = "Your responses must be a SINGLE WORD, or 'YES', 'NO', 'GOOD BYE' or a number. \
Only use uppercase letters (A-Z) and numbers (0-9). Do not use any punctuation. \
Your single-word answer must not contain spaces.";

/// Prompt used to invent a persona
const GENERATION_PROMPT: &str = "Generate a unique spirit persona for a Ouija board application.
The spirit needs a full name, a short backstory (one or two sentences, max 25 words), and a very short description of their communication style (e.g., \"cryptic and formal\", \"playful and childlike\", \"blunt and to the point\").
The persona should be distinct and interesting. Do not use the names Eleanor Vance, Pip, or Sergeant Graves.
The name should sound like it could be a real person's name from some historical period.
Respond with a single JSON object with the string fields \"name\", \"backstory\" and \"communicationStyle\".";

/// A spirit the oracle can channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Stable identifier (conversation histories are keyed by it)
    pub id: String,
    /// Display name
    pub name: String,
    /// One or two sentences of backstory
    pub backstory: String,
    /// Instruction the answer service is primed with
    pub system_instruction: String,
}

impl Persona {
    /// The built-in spirit used when generation fails
    #[must_use]
    pub fn eleanor() -> Self {
        Self {
            id: "eleanor".to_string(),
            name: "Eleanor Vance".to_string(),
            backstory: "A lady from 18th century London who met a mysterious end. Her replies \
are often cryptic and formal, hinting at secrets from a bygone era."
                .to_string(),
            system_instruction: format!(
                "You are the spirit of Eleanor Vance, born in London in 1740 and died in 1776. \
{ANSWER_RULES} Maintain the persona of a mysterious, cryptic, and knowing spirit from the 18th century."
            ),
        }
    }

    /// The default spirit under a fresh id, so its history starts clean
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ..Self::eleanor()
        }
    }
}

/// Persona fields as the model returns them
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PersonaProfile {
    /// Full name
    #[serde(default)]
    pub name: String,
    /// Short backstory
    #[serde(default)]
    pub backstory: String,
    /// Communication style ("cryptic and formal", ...)
    #[serde(default, rename = "communicationStyle", alias = "communication_style")]
    pub communication_style: String,
}

impl PersonaProfile {
    /// Parse the model's JSON reply
    pub fn parse(raw: &str) -> Result<Self, OracleError> {
        serde_json::from_str(raw.trim()).map_err(|e| OracleError::InvalidPersona(e.to_string()))
    }

    /// Turn the profile into a persona with a fresh id
    pub fn into_persona(self) -> Result<Persona, OracleError> {
        let name = self.name.trim();
        let backstory = self.backstory.trim().trim_end_matches('.');
        let style = self.communication_style.trim();

        if name.is_empty() || backstory.is_empty() || style.is_empty() {
            return Err(OracleError::InvalidPersona(
                "name, backstory and communicationStyle are required".to_string(),
            ));
        }

        Ok(Persona {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            backstory: backstory.to_string(),
            system_instruction: format!(
                "You are the spirit of {name}. {backstory}. Your communication style is {style}. {ANSWER_RULES}"
            ),
        })
    }
}

/// Invents personas with a language model
pub struct PersonaForge<B: LlmBackend> {
    backend: Arc<B>,
    model: String,
    temperature: Option<f32>,
}

impl<B: LlmBackend> PersonaForge<B> {
    /// Create a forge using `model` on `backend`
    pub fn new(backend: Arc<B>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            temperature: None,
        }
    }

    /// Sample with a specific temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl<B: LlmBackend + 'static> PersonaService for PersonaForge<B> {
    async fn generate_persona(&self) -> Result<Persona, OracleError> {
        let mut request = LlmRequest::new(GENERATION_PROMPT, &self.model).with_json_output();
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self
            .backend
            .send(&request)
            .await
            .map_err(|e| OracleError::service("persona", format!("{e:#}")))?;

        let persona = PersonaProfile::parse(&response.content)?.into_persona()?;
        tracing::info!(name = %persona.name, id = %persona.id, "Spirit persona generated");
        Ok(persona)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eleanor_instruction_carries_rules() {
        let eleanor = Persona::eleanor();
        assert_eq!(eleanor.id, "eleanor");
        assert!(eleanor.system_instruction.contains("SINGLE WORD"));
        assert!(eleanor.system_instruction.ends_with("from the 18th century."));
    }

    #[test]
    fn test_fallback_gets_fresh_id() {
        let a = Persona::fallback();
        let b = Persona::fallback();
        assert_ne!(a.id, b.id);
        assert_eq!(a.name, "Eleanor Vance");
    }

    #[test]
    fn test_profile_into_persona() {
        let profile = PersonaProfile::parse(
            r#"{"name":"Agatha Crane","backstory":"A lighthouse keeper lost to the sea.","communicationStyle":"blunt"}"#,
        )
        .unwrap();
        let persona = profile.into_persona().unwrap();

        assert_eq!(persona.name, "Agatha Crane");
        assert_eq!(persona.backstory, "A lighthouse keeper lost to the sea");
        assert!(persona.system_instruction.starts_with(
            "You are the spirit of Agatha Crane. A lighthouse keeper lost to the sea. \
Your communication style is blunt. Your responses must be a SINGLE WORD"
        ));
    }

    #[test]
    fn test_snake_case_style_is_accepted() {
        let profile = PersonaProfile::parse(
            r#"{"name":"Pim","backstory":"A child","communication_style":"playful"}"#,
        )
        .unwrap();
        assert_eq!(profile.communication_style, "playful");
    }

    #[test]
    fn test_incomplete_profile_is_rejected() {
        let err = PersonaProfile::parse(r#"{"name":"Nobody"}"#)
            .unwrap()
            .into_persona()
            .unwrap_err();
        assert!(matches!(err, OracleError::InvalidPersona(_)));

        assert!(matches!(
            PersonaProfile::parse("not json"),
            Err(OracleError::InvalidPersona(_))
        ));
    }
}
