//! Answer Animation
//!
//! Turns a finalized answer into a [`Plan`] of pointer moves, letter reveals,
//! emphasis and pauses, and plays plans back on a virtual timeline.
//!
//! # Architecture
//!
//! ```text
//! answer ──→ PlanBuilder::build (pure) ──→ Plan (immutable)
//!                                             │
//!                                             ▼
//!            LayoutProvider ──snapshot──→ Sequencer ──→ BoardEvent / SoundCue
//!                                             ▲
//!                                     TimerQueue (virtual clock)
//! ```
//!
//! The builder decides *what* happens; the [`Sequencer`] decides *when*,
//! reading the latest layout snapshot at the instant each step executes.

mod scheduler;
mod sequencer;
mod timing;

pub use scheduler::{Clock, ManualClock, TimerQueue};
pub use sequencer::{BoardEvent, BoardView, RunToken, Sequencer, SequencerState};
pub use timing::{
    EasingFunction, FixedJitter, Glide, Jitter, JitterRange, Pacing, ThreadJitter,
    EMPHASIS_MS, INTER_LETTER_DELAY_MS, MOVE_DURATION_MS, RETURN_TO_REST_MS, SETTLE_MS,
};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::{symbols, SymbolKey, SymbolMap};

/// Header pause between the opening moves
const HEADER_PAUSE_MS: u64 = 200;
/// Pause before and after the spelled letters
const SPELL_PAUSE_MS: u64 = 500;
/// Pause while a direct answer is emphasized
const EMPHASIS_PAUSE_MS: u64 = 1500;

/// One unit of a plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationStep {
    /// Glide the planchette to a symbol
    Move(SymbolKey),
    /// Glide to a character and append it (space appends a blank in place)
    RevealLetter(SymbolKey),
    /// Show the symbol's text wholesale and highlight its glyph
    Emphasize(SymbolKey),
    /// Wait for a jittered base duration
    Pause(Duration),
}

impl AnimationStep {
    /// The symbol this step targets, if any
    #[must_use]
    pub fn key(&self) -> Option<&SymbolKey> {
        match self {
            Self::Move(key) | Self::RevealLetter(key) | Self::Emphasize(key) => Some(key),
            Self::Pause(_) => None,
        }
    }

    fn pause_ms(ms: u64) -> Self {
        Self::Pause(Duration::from_millis(ms))
    }
}

impl fmt::Display for AnimationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(key) => write!(f, "Move({key})"),
            Self::RevealLetter(key) => write!(f, "RevealLetter({key})"),
            Self::Emphasize(key) => write!(f, "Emphasize({key})"),
            Self::Pause(d) => write!(f, "Pause({})", d.as_millis()),
        }
    }
}

/// How an answer is rendered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerKind {
    /// A single symbol lookup plus emphasis
    Direct,
    /// Revealed one character at a time
    Spelled,
}

/// An immutable, ordered list of steps for one answer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    answer: String,
    kind: AnswerKind,
    steps: Arc<[AnimationStep]>,
}

impl Plan {
    /// The answer this plan renders
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Direct or spelled
    #[must_use]
    pub fn kind(&self) -> AnswerKind {
        self.kind
    }

    /// All steps in order
    #[must_use]
    pub fn steps(&self) -> &[AnimationStep] {
        &self.steps
    }

    /// Step at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AnimationStep> {
        self.steps.get(index)
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for a plan with no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of `RevealLetter` steps
    #[must_use]
    pub fn reveal_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, AnimationStep::RevealLetter(_)))
            .count()
    }

    /// Key of the final step, if it targets one
    #[must_use]
    pub fn last_key(&self) -> Option<&SymbolKey> {
        self.steps.last().and_then(AnimationStep::key)
    }
}

/// Builds plans from answers
///
/// Holds the numeral set of the board the plan will play on. The set is
/// fixed for the builder's lifetime, so every answer is classified against
/// the same digits regardless of later layout changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanBuilder {
    numerals: Vec<String>,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new("1234567890".chars().map(String::from))
    }
}

impl PlanBuilder {
    /// Create a builder for a board with the given numeral glyphs
    pub fn new(numerals: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            numerals: numerals.into_iter().map(Into::into).collect(),
        }
    }

    /// The numeral set answers are classified against
    #[must_use]
    pub fn numerals(&self) -> &[String] {
        &self.numerals
    }

    /// Classify an answer
    #[must_use]
    pub fn classify(&self, answer: &str) -> AnswerKind {
        let single_letter = {
            let mut chars = answer.chars();
            matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_uppercase())
        };

        let direct = answer == symbols::YES
            || answer == symbols::NO
            || answer == symbols::GOOD_BYE
            || self.numerals.iter().any(|n| n == answer)
            || single_letter;

        if direct {
            AnswerKind::Direct
        } else {
            AnswerKind::Spelled
        }
    }

    /// Build the plan for `answer`
    ///
    /// Never fails. Characters of a spelled answer that don't resolve in
    /// `symbols` are dropped; the space always resolves.
    #[must_use]
    pub fn build(&self, answer: &str, symbols: &SymbolMap) -> Plan {
        let kind = self.classify(answer);
        let mut steps = Vec::new();

        match kind {
            AnswerKind::Direct => {
                let key = SymbolKey::from(answer);
                steps.push(AnimationStep::Move(symbols::SUN.into()));
                steps.push(AnimationStep::pause_ms(HEADER_PAUSE_MS));
                steps.push(AnimationStep::Move(key.clone()));
                steps.push(AnimationStep::Emphasize(key));
                steps.push(AnimationStep::pause_ms(EMPHASIS_PAUSE_MS));

                if answer != symbols::GOOD_BYE {
                    steps.push(AnimationStep::Move(symbols::MOON.into()));
                    steps.push(AnimationStep::pause_ms(HEADER_PAUSE_MS));
                    steps.push(AnimationStep::Move(symbols::GOOD_BYE.into()));
                }
            }
            AnswerKind::Spelled => {
                steps.push(AnimationStep::Move(symbols::SUN.into()));
                steps.push(AnimationStep::pause_ms(HEADER_PAUSE_MS));
                steps.push(AnimationStep::Move(symbols::MOON.into()));
                steps.push(AnimationStep::pause_ms(SPELL_PAUSE_MS));

                for c in answer.to_uppercase().chars() {
                    let key = SymbolKey::from_char(c);
                    if symbols.contains(&key) {
                        steps.push(AnimationStep::RevealLetter(key));
                    }
                }

                steps.push(AnimationStep::pause_ms(SPELL_PAUSE_MS));
                steps.push(AnimationStep::Move(symbols::STAR_BL.into()));
                steps.push(AnimationStep::pause_ms(HEADER_PAUSE_MS));
                steps.push(AnimationStep::Move(symbols::GOOD_BYE.into()));
            }
        }

        tracing::debug!(answer, ?kind, steps = steps.len(), "Plan built");

        Plan {
            answer: answer.to_string(),
            kind,
            steps: steps.into(),
        }
    }
}
