//! Oracle Messages
//!
//! Messages sent from the [`Oracle`](crate::Oracle) to a front-end. A
//! surface is a pure renderer: it draws the board, the answer text, the
//! overlays and the error line exactly as these messages describe.

use serde::{Deserialize, Serialize};

use crate::animation::BoardEvent;
use crate::spirit::Persona;

/// Messages from the oracle to a surface
#[derive(Clone, Debug, PartialEq)]
pub enum OracleMessage {
    // ============================================
    // Session State
    // ============================================
    /// Application state changed
    State(OracleState),

    /// A persona is now on the other end of the board
    PersonaActive(Persona),

    /// Show (or clear, with `None`) the error line
    Error(Option<String>),

    /// The surface should empty its question box
    ClearQuestion,

    // ============================================
    // Board
    // ============================================
    /// Planchette, answer text or highlight changed
    Board(BoardEvent),

    /// The "67" flash over the board
    Flash(bool),

    // ============================================
    // Overlays
    // ============================================
    /// A scare overlay started
    ScareStarted(ScareKind),

    /// The scare overlay ended
    ScareEnded(ScareKind),

    /// The persona picker opened
    PickerOpened,

    /// Persona candidates are being summoned (percent complete)
    PickerProgress(u8),

    /// Persona candidates to choose from
    PickerOptions(Vec<Persona>),

    /// The persona picker closed
    PickerClosed,

    // ============================================
    // Audio
    // ============================================
    /// Mute state changed
    Muted(bool),
}

/// Application state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleState {
    /// Waiting for a question
    #[default]
    Idle,
    /// Waiting on the answer service
    Thinking,
    /// The planchette is spelling the answer
    Spelling,
    /// The answer service failed; a reset or a new question recovers
    Error,
}

impl OracleState {
    /// Whether a new question would be ignored
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Thinking | Self::Spelling)
    }

    /// Human-readable description
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Thinking => "thinking",
            Self::Spelling => "spelling",
            Self::Error => "error",
        }
    }
}

/// Which scare is playing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScareKind {
    /// Short surprise rolled on submission; the question is asked afterwards
    Random,
    /// Long scare asked for by name; ends in a reset
    Triggered,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_states() {
        assert!(!OracleState::Idle.is_busy());
        assert!(OracleState::Thinking.is_busy());
        assert!(OracleState::Spelling.is_busy());
        assert!(!OracleState::Error.is_busy());
        assert_eq!(OracleState::default().description(), "idle");
    }
}
