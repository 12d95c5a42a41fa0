//! Oracle Core - The Mystifying Oracle Without a Screen
//!
//! This crate holds everything behind a talking board that answers
//! questions: turning a spirit's answer into planchette movement, pacing it
//! on a virtual clock, and the session logic around it. It can drive a
//! terminal front-end, a graphical board, or run headless in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Surfaces                              │
//! │        console  ·  graphical board  ·  test harness           │
//! │                           │                                   │
//! │              SurfaceEvent (up) / OracleMessage (down)         │
//! └───────────────────────────┼───────────────────────────────────┘
//!                             │
//! ┌───────────────────────────┼───────────────────────────────────┐
//! │                        ORACLE CORE                            │
//! │  ┌────────────────────────┴───────────────────────────────┐   │
//! │  │                        Oracle                          │   │
//! │  │  ┌────────────┐ ┌────────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │  │ PlanBuilder│ │ Sequencer  │ │ Spirits │ │ Store  │  │   │
//! │  │  │   (pure)   │ │(TimerQueue)│ │  (LLM)  │ │ (JSON) │  │   │
//! │  │  └────────────┘ └────────────┘ └─────────┘ └────────┘  │   │
//! │  └────────────────────────────────────────────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Oracle`]: session controller (states, reserved phrases, scares, picker)
//! - [`PlanBuilder`] / [`Plan`]: answer text to animation steps
//! - [`Sequencer`]: plays a plan against the current [`SymbolMap`]
//! - [`OracleMessage`] / [`SurfaceEvent`]: the surface protocol
//!
//! # Module Overview
//!
//! - [`animation`]: plan building, pacing, virtual-clock playback
//! - [`backend`]: language model backend abstraction (Ollama)
//! - [`board`]: symbol keys, coordinates and board layout
//! - [`config`]: TOML/env/CLI configuration
//! - [`conversation`]: per-persona conversation history
//! - [`error`]: error types
//! - [`events`]: events from surfaces to the oracle
//! - [`messages`]: messages from the oracle to surfaces
//! - [`oracle`]: the session controller
//! - [`sound`]: sound cues and players
//! - [`spirit`]: answer and persona services, answer sanitizing
//! - [`store`]: local persona/conversation cache

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod backend;
pub mod board;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod messages;
pub mod oracle;
pub mod sound;
pub mod spirit;
pub mod store;

// Re-exports for convenience
pub use animation::{
    AnimationStep, AnswerKind, BoardEvent, BoardView, Clock, FixedJitter, Jitter, ManualClock,
    Pacing, Plan, PlanBuilder, RunToken, Sequencer, SequencerState, ThreadJitter,
};
pub use backend::{LlmBackend, LlmRequest, LlmResponse, OllamaBackend};
pub use board::{
    BoardGeometry, BoardLayout, Coordinate, LayoutHandle, LayoutProvider, SymbolKey, SymbolMap,
};
pub use conversation::{ConversationHistory, ConversationTurn, Speaker};
pub use error::{OracleError, StoreError};
pub use events::SurfaceEvent;
pub use messages::{OracleMessage, OracleState, ScareKind};
pub use oracle::{Oracle, OracleServices};
pub use sound::{LogSoundPlayer, SilentPlayer, SoundCue, SoundPlayer};
pub use spirit::{
    sanitize_answer, Answer, AnswerService, Persona, PersonaForge, PersonaService, SpiritMedium,
};
pub use store::{JsonFileStore, MemoryStore, OracleStore};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, OracleConfig,
};
