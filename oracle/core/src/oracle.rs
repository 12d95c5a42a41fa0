//! Oracle - The Session Controller
//!
//! The [`Oracle`] owns everything around a sequencer run:
//! - the application state (idle, thinking, spelling, error)
//! - the active persona and its conversation history
//! - reserved phrases, scares and the persona picker
//! - the cryptic "67" flash and the ambient audio
//!
//! It is UI-agnostic. Surfaces send [`SurfaceEvent`]s in and render the
//! [`OracleMessage`]s that come out of the channel.
//!
//! # Time
//!
//! The oracle runs on the same virtual clock as its [`Sequencer`]. A driver
//! calls [`Oracle::advance_to`] with the elapsed time before handling each
//! event and whenever [`Oracle::next_deadline`] comes due; tests drive the
//! clock by hand.
//!
//! Service calls are awaited inline and may take seconds. After each one the
//! oracle reads the driver's [`Clock`], so whatever it schedules next counts
//! from when the reply arrived.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::animation::{
    BoardEvent, BoardView, Clock, Jitter, Pacing, PlanBuilder, Sequencer, TimerQueue,
};
use crate::board::LayoutProvider;
use crate::config::OracleSettings;
use crate::conversation::ConversationHistory;
use crate::events::SurfaceEvent;
use crate::messages::{OracleMessage, OracleState, ScareKind};
use crate::sound::{SoundCue, SoundPlayer};
use crate::spirit::{AnswerService, Persona, PersonaService};
use crate::store::OracleStore;

/// Shown when the answer service fails
pub const SILENT_SPIRITS: &str = "The spirits are silent. Please try again later.";
/// Shown when persona candidates cannot be summoned
pub const SPIRITS_NOT_GATHERING: &str = "The spirits are not gathering now.";
/// Answer-area text while the old spirit leaves
pub const SPIRIT_DEPARTS: &str = "A spirit departs...";
/// Answer-area text once the new spirit is in place
pub const SPIRIT_ARRIVED: &str = "A new spirit has arrived.";
/// Placeholder shown between the answer arriving and the run starting
pub const PLACEHOLDER: &str = "67";

const PLACEHOLDER_DELAY: Duration = Duration::from_millis(350);
const RANDOM_SCARE: Duration = Duration::from_millis(1000);
const TRIGGERED_SCARE: Duration = Duration::from_millis(10_000);
const ARRIVAL_NOTICE: Duration = Duration::from_millis(2000);
const FLASH_ON: Duration = Duration::from_millis(350);
const FLASH_COOLDOWN: Duration = Duration::from_millis(850);

/// Input that bypasses the answer service
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReservedPhrase {
    /// Anything mentioning "jumpscare"
    Scare,
    /// "67 mangos"
    OpenPicker,
    /// "goodbye"
    SwapPersona,
}

impl ReservedPhrase {
    fn detect(question: &str) -> Option<Self> {
        let question = question.trim().to_lowercase();
        if question.contains("jumpscare") {
            Some(Self::Scare)
        } else if question == "67 mangos" {
            Some(Self::OpenPicker)
        } else if question == "goodbye" {
            Some(Self::SwapPersona)
        } else {
            None
        }
    }
}

/// Controller-owned timers
#[derive(Debug)]
enum OracleTimer {
    /// Placeholder elapsed; build and play the answer
    BeginSpelling(String),
    EndScare(ScareKind),
    FlashOff,
    FlashCooldownOver,
    /// Clear the "new spirit" notice
    ClearArrival,
}

impl OracleTimer {
    /// Whether the timer outlives a reset
    fn survives_reset(&self) -> bool {
        matches!(
            self,
            Self::EndScare(_) | Self::FlashOff | Self::FlashCooldownOver
        )
    }
}

#[derive(Debug, Default)]
struct Picker {
    open: bool,
    options: Vec<Persona>,
}

#[derive(Debug, Default)]
struct Flash {
    lit: bool,
    cooling: bool,
    previous: String,
}

fn digit_count(text: &str, digit: char) -> usize {
    text.chars().filter(|&c| c == digit).count()
}

/// Collaborators the oracle drives
pub struct OracleServices<A, P, S> {
    /// Answers questions
    pub answers: Arc<A>,
    /// Invents personas
    pub personas: Arc<P>,
    /// Caches personas and conversations
    pub store: Arc<S>,
    /// Plays cues
    pub sound: Arc<dyn SoundPlayer>,
    /// Current board coordinates
    pub layout: Arc<dyn LayoutProvider>,
    /// Pacing and roll randomness
    pub jitter: Arc<dyn Jitter>,
    /// The driver's clock, read after slow service calls
    pub clock: Arc<dyn Clock>,
}

/// The session controller
pub struct Oracle<A, P, S> {
    answers: Arc<A>,
    personas: Arc<P>,
    store: Arc<S>,
    sound: Arc<dyn SoundPlayer>,
    layout: Arc<dyn LayoutProvider>,
    jitter: Arc<dyn Jitter>,
    clock: Arc<dyn Clock>,
    sequencer: Sequencer,
    builder: PlanBuilder,
    timers: TimerQueue<OracleTimer>,
    settings: OracleSettings,
    tx: mpsc::Sender<OracleMessage>,
    state: OracleState,
    persona: Option<Persona>,
    /// Answer-area text as the surface shows it
    text: String,
    error: Option<String>,
    scare: Option<ScareKind>,
    /// Question held back by a random scare
    deferred: Option<String>,
    picker: Picker,
    flash: Flash,
    audio_unlocked: bool,
}

impl<A, P, S> Oracle<A, P, S>
where
    A: AnswerService,
    P: PersonaService,
    S: OracleStore,
{
    /// Create an oracle; call [`Oracle::start`] before sending events
    pub fn new(
        services: OracleServices<A, P, S>,
        settings: OracleSettings,
        pacing: Pacing,
        tx: mpsc::Sender<OracleMessage>,
    ) -> Self {
        let sequencer = Sequencer::new(
            Arc::clone(&services.layout),
            Arc::clone(&services.sound),
            Arc::clone(&services.jitter),
            pacing,
        );

        Self {
            answers: services.answers,
            personas: services.personas,
            store: services.store,
            sound: services.sound,
            layout: services.layout,
            jitter: services.jitter,
            clock: services.clock,
            sequencer,
            builder: PlanBuilder::default(),
            timers: TimerQueue::new(),
            settings,
            tx,
            state: OracleState::Idle,
            persona: None,
            text: String::new(),
            error: None,
            scare: None,
            deferred: None,
            picker: Picker::default(),
            flash: Flash::default(),
            audio_unlocked: false,
        }
    }

    /// Use a specific plan builder (e.g. a board with another numeral row)
    #[must_use]
    pub fn with_plan_builder(mut self, builder: PlanBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Current application state
    pub fn state(&self) -> OracleState {
        self.state
    }

    /// The persona answering questions
    pub fn persona(&self) -> Option<&Persona> {
        self.persona.as_ref()
    }

    /// Answer-area text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Error line, if one is showing
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Scare overlay in progress
    pub fn scare(&self) -> Option<ScareKind> {
        self.scare
    }

    /// Whether the persona picker is open
    pub fn is_picker_open(&self) -> bool {
        self.picker.open
    }

    /// Personas currently offered by the picker
    pub fn picker_options(&self) -> &[Persona] {
        &self.picker.options
    }

    /// Whether the "67" flash is lit
    pub fn is_flashing(&self) -> bool {
        self.flash.lit
    }

    /// Board snapshot from the sequencer
    pub fn board(&self) -> &BoardView {
        self.sequencer.view()
    }

    /// The sequencer
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Virtual time of the last advance
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Earliest pending timer across the oracle and its sequencer
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.timers.next_deadline(), self.sequencer.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restore or summon the first persona and put the planchette at rest
    pub async fn start(&mut self) {
        let known = self.stored_personas().await;
        let active_id = match self.store.active_persona_id().await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read the active persona");
                None
            }
        };

        let restored =
            active_id.and_then(|id| known.into_iter().find(|persona| persona.id == id));

        let persona = match restored {
            Some(persona) => {
                tracing::info!(name = %persona.name, "Restored spirit persona");
                persona
            }
            None => self.summon_persona().await,
        };

        self.activate(persona).await;
        let events = self.sequencer.place_at_rest();
        self.forward(events).await;
        self.send(OracleMessage::State(self.state)).await;
    }

    /// Handle an event from the surface
    ///
    /// Call [`Oracle::advance_to`] with the current time first so anything
    /// this schedules is relative to now.
    pub async fn handle_event(&mut self, event: SurfaceEvent) {
        tracing::debug!(
            event = event.name(),
            state = self.state.description(),
            "Surface event"
        );

        match event {
            SurfaceEvent::Submit(question) => self.submit(&question).await,
            SurfaceEvent::QuestionEdited(text) => self.question_edited(text).await,
            SurfaceEvent::Reset => {
                self.sound.play(SoundCue::UiClick);
                self.reset().await;
            }
            SurfaceEvent::SelectPersona(index) => self.select_persona(index).await,
            SurfaceEvent::ClosePicker => {
                self.sound.play(SoundCue::UiClick);
                self.close_picker().await;
            }
            SurfaceEvent::ToggleMute => self.toggle_mute().await,
            SurfaceEvent::AudioUnlocked => self.unlock_audio(),
        }
    }

    /// Fire every oracle and sequencer timer due at or before `now`
    ///
    /// Timers fire in deadline order across both queues; on a tie the
    /// sequencer's timers go first.
    pub async fn advance_to(&mut self, now: Duration) {
        loop {
            let ours = self.timers.next_deadline().filter(|due| *due <= now);
            let theirs = self.sequencer.next_deadline().filter(|due| *due <= now);

            match (ours, theirs) {
                (None, None) => break,
                (Some(due), None) => self.fire_due(due).await,
                (Some(due), Some(next)) if due <= next => self.fire_due(due).await,
                (_, Some(due)) => {
                    let events = self.sequencer.advance_to(due);
                    self.forward(events).await;
                }
            }
        }

        let events = self.sequencer.advance_to(now);
        self.forward(events).await;
        self.timers.advance_clock(now);
    }

    /// Bring the sequencer up to `due`, then fire our timer due then
    async fn fire_due(&mut self, due: Duration) {
        let events = self.sequencer.advance_to(due);
        self.forward(events).await;
        if let Some(timer) = self.timers.pop_due(due) {
            self.fire(timer).await;
        }
    }

    /// Move our clock to the driver's time after awaiting a service
    ///
    /// Nothing fires here; timers that came due meanwhile fire on the next
    /// [`Oracle::advance_to`].
    fn catch_up(&mut self) {
        self.timers.advance_clock(self.clock.now());
    }

    async fn fire(&mut self, timer: OracleTimer) {
        match timer {
            OracleTimer::BeginSpelling(answer) => self.begin_spelling(&answer).await,
            OracleTimer::EndScare(kind) => self.end_scare(kind).await,
            OracleTimer::FlashOff => {
                self.flash.lit = false;
                self.send(OracleMessage::Flash(false)).await;
            }
            OracleTimer::FlashCooldownOver => self.flash.cooling = false,
            OracleTimer::ClearArrival => {
                if self.error.is_none() && self.text == SPIRIT_ARRIVED {
                    self.set_text("").await;
                }
            }
        }
    }

    // =========================================================================
    // Questions
    // =========================================================================

    async fn submit(&mut self, question: &str) {
        let question = question.trim();
        if question.is_empty() || self.state.is_busy() || self.scare.is_some() {
            return;
        }
        if self.persona.is_none() {
            tracing::debug!("No persona yet, ignoring question");
            return;
        }

        self.sound.play(SoundCue::UiClick);

        if let Some(phrase) = ReservedPhrase::detect(question) {
            tracing::info!(?phrase, "Reserved phrase");
            self.send(OracleMessage::ClearQuestion).await;
            match phrase {
                ReservedPhrase::Scare => self.start_scare(ScareKind::Triggered).await,
                ReservedPhrase::OpenPicker => self.open_picker().await,
                ReservedPhrase::SwapPersona => self.swap_persona().await,
            }
            return;
        }

        if self.jitter.chance(self.settings.scare_chance) {
            self.deferred = Some(question.to_string());
            self.start_scare(ScareKind::Random).await;
            return;
        }

        self.ask(question).await;
    }

    async fn ask(&mut self, question: &str) {
        let Some(persona) = self.persona.clone() else {
            return;
        };

        self.set_state(OracleState::Thinking).await;
        self.set_error(None).await;
        self.set_text("").await;

        let history = self.load_history(&persona.id).await;
        let reply = self
            .answers
            .ask(question, &persona.system_instruction, history)
            .await;
        self.catch_up();

        match reply {
            Ok(answer) => {
                self.save_history(&persona.id, &answer.history).await;
                self.set_state(OracleState::Spelling).await;
                self.sound.play(SoundCue::CrypticFlash);
                self.set_text(PLACEHOLDER).await;
                self.timers
                    .schedule(PLACEHOLDER_DELAY, OracleTimer::BeginSpelling(answer.text));
            }
            Err(e) => {
                tracing::warn!(error = %e, "The spirits did not answer");
                self.set_error(Some(SILENT_SPIRITS.to_string())).await;
                self.set_state(OracleState::Error).await;
            }
        }
    }

    async fn begin_spelling(&mut self, answer: &str) {
        if self.state != OracleState::Spelling {
            return;
        }
        self.set_text("").await;

        let plan = self.builder.build(answer, &self.layout.snapshot());
        let events = self.sequencer.start(plan);
        self.forward(events).await;
    }

    /// Cancel everything in flight and forget the current conversation
    async fn reset(&mut self) {
        self.set_error(None).await;
        self.deferred = None;
        self.timers.retain(OracleTimer::survives_reset);

        let events = self.sequencer.reset();
        self.forward(events).await;
        self.set_text("").await;

        if let Some(id) = self.persona.as_ref().map(|p| p.id.clone()) {
            if let Err(e) = self.store.clear_conversation(&id).await {
                tracing::warn!(error = %e, "Could not clear the conversation");
            }
        }

        self.set_state(OracleState::Idle).await;
    }

    // =========================================================================
    // Scares
    // =========================================================================

    async fn start_scare(&mut self, kind: ScareKind) {
        self.scare = Some(kind);
        let duration = match kind {
            ScareKind::Random => {
                self.sound.play(SoundCue::JumpscareShort);
                RANDOM_SCARE
            }
            ScareKind::Triggered => {
                self.sound.play(SoundCue::Jumpscare);
                self.sound.play(SoundCue::StartHeartbeat);
                TRIGGERED_SCARE
            }
        };

        tracing::info!(?kind, "Scare started");
        self.send(OracleMessage::ScareStarted(kind)).await;
        self.timers.schedule(duration, OracleTimer::EndScare(kind));
    }

    async fn end_scare(&mut self, kind: ScareKind) {
        self.scare = None;
        self.send(OracleMessage::ScareEnded(kind)).await;

        match kind {
            ScareKind::Random => {
                if let Some(question) = self.deferred.take() {
                    self.ask(&question).await;
                }
            }
            ScareKind::Triggered => {
                self.sound.play(SoundCue::StopHeartbeat);
                self.sound.play(SoundCue::UiClick);
                self.reset().await;
            }
        }
    }

    // =========================================================================
    // Personas
    // =========================================================================

    async fn swap_persona(&mut self) {
        self.sound.play(SoundCue::Emphasis);
        self.reset().await;
        self.set_text(SPIRIT_DEPARTS).await;

        let persona = self.summon_persona().await;
        self.catch_up();
        self.activate(persona).await;

        self.set_text(SPIRIT_ARRIVED).await;
        self.timers.schedule(ARRIVAL_NOTICE, OracleTimer::ClearArrival);
    }

    async fn open_picker(&mut self) {
        self.sound.play(SoundCue::Emphasis);
        self.picker.open = true;
        self.send(OracleMessage::PickerOpened).await;

        if !self.picker.options.is_empty() {
            self.send(OracleMessage::PickerOptions(self.picker.options.clone()))
                .await;
            return;
        }

        let tx = self.tx.clone();
        let progress = move |percent: u8| {
            if let Err(e) = tx.try_send(OracleMessage::PickerProgress(percent)) {
                tracing::warn!("Failed to send picker progress: {}", e);
            }
        };

        let batch = self
            .personas
            .generate_batch(self.settings.picker_size, &progress)
            .await;
        self.catch_up();

        match batch {
            Ok(options) => {
                self.picker.options.clone_from(&options);
                self.send(OracleMessage::PickerOptions(options)).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to summon persona candidates");
                self.close_picker().await;
                self.set_error(Some(SPIRITS_NOT_GATHERING.to_string()))
                    .await;
            }
        }
    }

    async fn select_persona(&mut self, index: usize) {
        if !self.picker.open {
            return;
        }
        let Some(persona) = self.picker.options.get(index).cloned() else {
            tracing::debug!(index, "No persona at that position");
            return;
        };

        self.activate(persona).await;
        self.close_picker().await;
        self.sound.play(SoundCue::UiClick);
        self.reset().await;
    }

    async fn close_picker(&mut self) {
        if !self.picker.open {
            return;
        }
        self.picker.open = false;
        self.picker.options.clear();
        self.send(OracleMessage::PickerClosed).await;
    }

    /// A freshly generated persona, or the built-in spirit on failure
    async fn summon_persona(&self) -> Persona {
        match self.personas.generate_persona().await {
            Ok(persona) => persona,
            Err(e) => {
                tracing::warn!(error = %e, "Persona generation failed, using the default spirit");
                Persona::fallback()
            }
        }
    }

    /// Make `persona` the active spirit and remember it
    async fn activate(&mut self, persona: Persona) {
        let mut known = self.stored_personas().await;
        if !known.iter().any(|p| p.id == persona.id) {
            known.push(persona.clone());
            if let Err(e) = self.store.save_personas(&known).await {
                tracing::warn!(error = %e, "Could not save personas");
            }
        }
        if let Err(e) = self.store.set_active_persona_id(&persona.id).await {
            tracing::warn!(error = %e, "Could not save the active persona");
        }

        tracing::info!(name = %persona.name, id = %persona.id, "Spirit persona active");
        self.persona = Some(persona.clone());
        self.send(OracleMessage::PersonaActive(persona)).await;
    }

    async fn stored_personas(&self) -> Vec<Persona> {
        match self.store.personas().await {
            Ok(personas) => personas,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored personas");
                Vec::new()
            }
        }
    }

    async fn load_history(&self, persona_id: &str) -> ConversationHistory {
        let mut history = match self.store.conversation(persona_id).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read the conversation");
                ConversationHistory::default()
            }
        };
        history.set_limit(self.settings.max_history_turns);
        history
    }

    async fn save_history(&self, persona_id: &str, history: &ConversationHistory) {
        if let Err(e) = self.store.save_conversation(persona_id, history).await {
            tracing::warn!(error = %e, "Could not save the conversation");
        }
    }

    // =========================================================================
    // Flash and Audio
    // =========================================================================

    async fn question_edited(&mut self, text: String) {
        let previous = std::mem::replace(&mut self.flash.previous, text);
        if self.flash.cooling {
            return;
        }

        let current = &self.flash.previous;
        let grew = digit_count(current, '6') > digit_count(&previous, '6')
            || digit_count(current, '7') > digit_count(&previous, '7');
        if !grew {
            return;
        }

        self.flash.lit = true;
        self.flash.cooling = true;
        self.sound.play(SoundCue::CrypticFlash);
        self.send(OracleMessage::Flash(true)).await;
        self.timers.schedule(FLASH_ON, OracleTimer::FlashOff);
        self.timers
            .schedule(FLASH_COOLDOWN, OracleTimer::FlashCooldownOver);
    }

    async fn toggle_mute(&mut self) {
        let muted = !self.sound.is_muted();
        self.sound.set_muted(muted);

        if self.audio_unlocked {
            self.sound.play(if muted {
                SoundCue::StopAmbient
            } else {
                SoundCue::StartAmbient
            });
        }
        self.send(OracleMessage::Muted(muted)).await;
    }

    fn unlock_audio(&mut self) {
        if self.audio_unlocked {
            return;
        }
        self.audio_unlocked = true;
        if !self.sound.is_muted() {
            self.sound.play(SoundCue::StartAmbient);
        }
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Relay sequencer output, tracking text and run completion
    async fn forward(&mut self, events: Vec<BoardEvent>) {
        for event in events {
            let finished = matches!(event, BoardEvent::RunFinished(_));
            if let BoardEvent::TextChanged(ref text) = event {
                self.text.clone_from(text);
            }
            self.send(OracleMessage::Board(event)).await;

            if finished && self.state == OracleState::Spelling {
                self.set_state(OracleState::Idle).await;
            }
        }
    }

    async fn set_state(&mut self, state: OracleState) {
        if self.state != state {
            tracing::debug!(
                from = self.state.description(),
                to = state.description(),
                "Oracle state"
            );
            self.state = state;
            self.send(OracleMessage::State(state)).await;
        }
    }

    async fn set_text(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_string();
            self.send(OracleMessage::Board(BoardEvent::TextChanged(
                self.text.clone(),
            )))
            .await;
        }
    }

    async fn set_error(&mut self, error: Option<String>) {
        if self.error != error {
            self.error.clone_from(&error);
            self.send(OracleMessage::Error(error)).await;
        }
    }

    async fn send(&self, msg: OracleMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_phrases() {
        assert_eq!(
            ReservedPhrase::detect("  67 Mangos "),
            Some(ReservedPhrase::OpenPicker)
        );
        assert_eq!(
            ReservedPhrase::detect("GOODBYE"),
            Some(ReservedPhrase::SwapPersona)
        );
        assert_eq!(
            ReservedPhrase::detect("give me a JumpScare please"),
            Some(ReservedPhrase::Scare)
        );
        assert_eq!(ReservedPhrase::detect("goodbye forever"), None);
        assert_eq!(ReservedPhrase::detect("67 mangos please"), None);
    }

    #[test]
    fn test_reset_keeps_flash_and_scare_timers() {
        assert!(OracleTimer::EndScare(ScareKind::Random).survives_reset());
        assert!(OracleTimer::FlashCooldownOver.survives_reset());
        assert!(!OracleTimer::BeginSpelling("YES".into()).survives_reset());
        assert!(!OracleTimer::ClearArrival.survives_reset());
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count("6 7 67", '6'), 2);
        assert_eq!(digit_count("hello", '7'), 0);
    }
}
