//! Surface Events
//!
//! Events sent from a front-end to the [`Oracle`](crate::Oracle). Surfaces
//! report what the user did; the oracle decides what it means (reserved
//! phrases, scares, the persona picker).

use serde::{Deserialize, Serialize};

/// Events from a surface to the oracle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    // ============================================
    // Question Input
    // ============================================
    /// User submitted the question box
    Submit(String),

    /// Question box contents changed (drives the cryptic flash)
    QuestionEdited(String),

    /// User pressed the reset control
    Reset,

    // ============================================
    // Persona Picker
    // ============================================
    /// User chose one of the offered personas (index into the options)
    SelectPersona(usize),

    /// User dismissed the picker
    ClosePicker,

    // ============================================
    // Audio
    // ============================================
    /// User toggled mute
    ToggleMute,

    /// First user gesture; audio may now start
    AudioUnlocked,
}

impl SurfaceEvent {
    /// Short name for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit(_) => "submit",
            Self::QuestionEdited(_) => "question_edited",
            Self::Reset => "reset",
            Self::SelectPersona(_) => "select_persona",
            Self::ClosePicker => "close_picker",
            Self::ToggleMute => "toggle_mute",
            Self::AudioUnlocked => "audio_unlocked",
        }
    }
}
