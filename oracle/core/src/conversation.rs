//! Conversation History
//!
//! The running exchange between the asker and one spirit. Each persona keeps
//! its own history in the store; the answer service receives it as context
//! and returns it with the new exchange appended.
//!
//! # Design Philosophy
//!
//! Histories are capped by turn count. Oldest turns are dropped first, so a
//! long séance keeps its recent thread without growing the prompt forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of turns kept per persona
pub const DEFAULT_MAX_TURNS: usize = 40;

/// Who spoke
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The person asking
    Asker,
    /// The spirit answering
    Spirit,
}

/// One line of the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who spoke
    pub role: Speaker,
    /// What was said
    pub text: String,
    /// When it was said
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    /// A turn stamped with the current time
    pub fn now(role: Speaker, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Ordered turns, oldest first
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
    /// Maximum turns kept (0 = unlimited)
    #[serde(default)]
    max_turns: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_TURNS)
    }
}

impl ConversationHistory {
    /// An empty history keeping at most `max_turns` turns (0 = unlimited)
    #[must_use]
    pub fn with_limit(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
        }
    }

    /// Change the cap, pruning immediately if needed
    pub fn set_limit(&mut self, max_turns: usize) {
        self.max_turns = max_turns;
        self.prune_if_needed();
    }

    /// Record a question
    pub fn push_question(&mut self, text: impl Into<String>) {
        self.push(ConversationTurn::now(Speaker::Asker, text));
    }

    /// Record an answer
    pub fn push_answer(&mut self, text: impl Into<String>) {
        self.push(ConversationTurn::now(Speaker::Spirit, text));
    }

    /// Append a turn
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        self.prune_if_needed();
    }

    /// All turns, oldest first
    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The last `count` turns
    #[must_use]
    pub fn recent(&self, count: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(count);
        &self.turns[start..]
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when nothing has been said
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Render the last `max_turns` turns as prompt context
    #[must_use]
    pub fn build_context(&self, max_turns: usize) -> String {
        let mut context = String::new();
        for turn in self.recent(max_turns) {
            let who = match turn.role {
                Speaker::Asker => "Asker",
                Speaker::Spirit => "Spirit",
            };
            context.push_str(who);
            context.push_str(": ");
            context.push_str(&turn.text);
            context.push('\n');
        }
        context
    }

    fn prune_if_needed(&mut self) {
        if self.max_turns == 0 || self.turns.len() <= self.max_turns {
            return;
        }
        let excess = self.turns.len() - self.max_turns;
        self.turns.drain(..excess);
        tracing::debug!(
            removed = excess,
            remaining = self.turns.len(),
            "Pruned conversation turns"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_context() {
        let mut history = ConversationHistory::default();
        history.push_question("Are you there?");
        history.push_answer("YES");

        assert_eq!(history.len(), 2);
        assert_eq!(
            history.build_context(10),
            "Asker: Are you there?\nSpirit: YES\n"
        );
    }

    #[test]
    fn test_context_uses_recent_turns() {
        let mut history = ConversationHistory::with_limit(0);
        history.push_question("First");
        history.push_question("Second");
        history.push_question("Third");

        let context = history.build_context(2);
        assert!(!context.contains("First"));
        assert!(context.contains("Second"));
        assert!(context.contains("Third"));
    }

    #[test]
    fn test_prunes_oldest_turns() {
        let mut history = ConversationHistory::with_limit(3);
        for i in 1..=5 {
            history.push_question(format!("Question {i}"));
        }

        let texts: Vec<_> = history.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Question 3", "Question 4", "Question 5"]);
    }

    #[test]
    fn test_lowering_limit_prunes() {
        let mut history = ConversationHistory::with_limit(0);
        for i in 0..10 {
            history.push_answer(i.to_string());
        }
        history.set_limit(4);
        assert_eq!(history.len(), 4);
        assert_eq!(history.turns()[0].text, "6");
    }

    #[test]
    fn test_serde_round_trip_keeps_roles() {
        let mut history = ConversationHistory::default();
        history.push_question("Who?");
        history.push_answer("ELEANOR");

        let json = serde_json::to_string(&history).unwrap();
        assert!(json.contains("\"spirit\""));
        let back: ConversationHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }
}
