//! Sequencer - Plan Playback
//!
//! Executes a [`Plan`] one step at a time on a virtual timeline. Each step
//! computes its own delay and schedules the next step; nothing runs
//! concurrently. Observable output is a [`BoardView`] plus the
//! [`BoardEvent`]s each call produced, and sound cues sent straight to the
//! [`SoundPlayer`].
//!
//! Every timer carries the [`RunToken`] it was scheduled under. Starting a
//! run or resetting bumps the token and purges the queue, and a timer whose
//! token is stale is dropped when popped, so no effect of a superseded run can
//! land on the board.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::scheduler::TimerQueue;
use super::timing::{Glide, Jitter, JitterRange, Pacing};
use super::{AnimationStep, Plan};
use crate::board::{Coordinate, LayoutProvider, SymbolKey};
use crate::sound::{SoundCue, SoundPlayer};

/// Generation counter distinguishing runs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunToken(u64);

impl RunToken {
    /// The raw generation number
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Playback state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SequencerState {
    /// Nothing playing
    #[default]
    Idle,
    /// A plan is playing; `cursor` is the next step to execute
    Running {
        /// The plan being played
        plan: Plan,
        /// Index of the next step
        cursor: usize,
    },
    /// A run was cut short and the pointer is on its way back to rest
    Cancelled,
}

/// What a surface should currently show
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoardView {
    /// Revealed answer text
    pub text: String,
    /// Planchette position
    pub pointer: Coordinate,
    /// Glyph currently highlighted
    pub highlight: Option<SymbolKey>,
    /// Whether a run is in progress
    pub busy: bool,
}

/// A change to the board produced by the sequencer
#[derive(Clone, Debug, PartialEq)]
pub enum BoardEvent {
    /// Planchette starts gliding
    PointerMoved(Glide),
    /// Displayed text replaced
    TextChanged(String),
    /// Highlight a glyph for a duration
    Highlight {
        /// Glyph to highlight
        key: SymbolKey,
        /// How long it stays lit
        duration: Duration,
    },
    /// Highlight removed
    HighlightCleared(SymbolKey),
    /// The run settled
    RunFinished(RunToken),
}

#[derive(Debug)]
enum TimerKind {
    /// Execute the step under the cursor
    Step,
    /// Append a letter once the pointer has landed on it
    CommitLetter(SymbolKey),
    ClearHighlight(SymbolKey),
    /// End of plan plus the settle delay
    Settle,
    ReturnToRest,
}

#[derive(Debug)]
struct SequencerTimer {
    token: RunToken,
    kind: TimerKind,
}

/// Plays plans against the current layout
pub struct Sequencer {
    layout: Arc<dyn LayoutProvider>,
    sound: Arc<dyn SoundPlayer>,
    jitter: Arc<dyn Jitter>,
    pacing: Pacing,
    timers: TimerQueue<SequencerTimer>,
    state: SequencerState,
    token: RunToken,
    view: BoardView,
}

impl Sequencer {
    /// Create an idle sequencer with the pointer at rest
    pub fn new(
        layout: Arc<dyn LayoutProvider>,
        sound: Arc<dyn SoundPlayer>,
        jitter: Arc<dyn Jitter>,
        pacing: Pacing,
    ) -> Self {
        let pointer = layout.snapshot().rest();
        Self {
            layout,
            sound,
            jitter,
            pacing,
            timers: TimerQueue::new(),
            state: SequencerState::Idle,
            token: RunToken::default(),
            view: BoardView {
                pointer,
                ..BoardView::default()
            },
        }
    }

    /// Current playback state
    #[must_use]
    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    /// Current board view
    #[must_use]
    pub fn view(&self) -> &BoardView {
        &self.view
    }

    /// Token of the current (or most recent) run
    #[must_use]
    pub fn token(&self) -> RunToken {
        self.token
    }

    /// Whether a plan is playing
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, SequencerState::Running { .. })
    }

    /// Timing constants in use
    #[must_use]
    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Virtual time of the next pending timer
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Number of pending timers
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Start playing `plan`, superseding any run in flight
    ///
    /// The first step executes immediately.
    pub fn start(&mut self, plan: Plan) -> Vec<BoardEvent> {
        let mut events = Vec::new();
        self.supersede(&mut events);

        tracing::info!(
            token = self.token.get(),
            answer = plan.answer(),
            steps = plan.len(),
            "Sequencer run started"
        );

        self.state = SequencerState::Running { plan, cursor: 0 };
        self.view.busy = true;
        self.run_step(&mut events);
        events
    }

    /// Cancel whatever is playing and send the pointer home
    ///
    /// Idempotent: a return-to-rest is scheduled only when the pointer is
    /// away from rest, and only one is ever pending.
    pub fn reset(&mut self) -> Vec<BoardEvent> {
        let mut events = Vec::new();
        let was_active = !matches!(self.state, SequencerState::Idle);
        self.supersede(&mut events);
        self.view.busy = false;

        if self.at_rest() {
            self.state = SequencerState::Idle;
        } else {
            self.state = if was_active {
                SequencerState::Cancelled
            } else {
                SequencerState::Idle
            };
            self.schedule(self.pacing.return_to_rest, TimerKind::ReturnToRest);
        }

        if was_active {
            tracing::debug!(token = self.token.get(), "Sequencer reset");
        }
        events
    }

    /// Put the pointer at rest immediately (e.g. after the board is first
    /// measured)
    pub fn place_at_rest(&mut self) -> Vec<BoardEvent> {
        let mut events = Vec::new();
        let rest = self.layout.snapshot().rest();
        self.move_pointer(rest, Duration::ZERO, &mut events);
        events
    }

    /// Fire every timer due at or before `now`
    pub fn advance_to(&mut self, now: Duration) -> Vec<BoardEvent> {
        let mut events = Vec::new();

        while let Some(timer) = self.timers.pop_due(now) {
            if timer.token != self.token {
                tracing::trace!(
                    stale = timer.token.get(),
                    current = self.token.get(),
                    "Discarding stale sequencer timer"
                );
                continue;
            }

            match timer.kind {
                TimerKind::Step => self.run_step(&mut events),
                TimerKind::CommitLetter(key) => {
                    self.view.text.push_str(key.as_str());
                    self.sound.play(SoundCue::Select);
                    events.push(BoardEvent::TextChanged(self.view.text.clone()));
                }
                TimerKind::ClearHighlight(key) => {
                    if self.view.highlight.as_ref() == Some(&key) {
                        self.view.highlight = None;
                    }
                    events.push(BoardEvent::HighlightCleared(key));
                }
                TimerKind::Settle => self.settle(&mut events),
                TimerKind::ReturnToRest => {
                    let rest = self.layout.snapshot().rest();
                    self.move_pointer(rest, self.pacing.move_duration, &mut events);
                    if self.state == SequencerState::Cancelled {
                        self.state = SequencerState::Idle;
                    }
                }
            }
        }

        self.timers.advance_clock(now);
        events
    }

    /// Bump the token, purge timers, clear text and highlight
    fn supersede(&mut self, events: &mut Vec<BoardEvent>) {
        self.token = self.token.next();
        self.timers.clear();

        if let Some(key) = self.view.highlight.take() {
            events.push(BoardEvent::HighlightCleared(key));
        }
        if !self.view.text.is_empty() {
            self.view.text.clear();
            events.push(BoardEvent::TextChanged(String::new()));
        }
    }

    /// Execute the step under the cursor and schedule the next
    fn run_step(&mut self, events: &mut Vec<BoardEvent>) {
        let step = match &mut self.state {
            SequencerState::Running { plan, cursor } => {
                let step = plan.get(*cursor).cloned();
                if step.is_some() {
                    *cursor += 1;
                }
                step
            }
            _ => return,
        };

        let Some(step) = step else {
            self.schedule(self.pacing.settle, TimerKind::Settle);
            return;
        };

        let delay = match step {
            AnimationStep::Move(key) => {
                self.glide_to(&key, events);
                self.pacing.move_duration
            }
            AnimationStep::RevealLetter(key) if key.is_space() => {
                self.view.text.push(' ');
                events.push(BoardEvent::TextChanged(self.view.text.clone()));
                self.pacing.letter_gap(self.jitter.as_ref())
            }
            AnimationStep::RevealLetter(key) => {
                if self.glide_to(&key, events) {
                    self.schedule(self.pacing.move_duration, TimerKind::CommitLetter(key));
                }
                self.pacing.move_duration + self.pacing.letter_gap(self.jitter.as_ref())
            }
            AnimationStep::Emphasize(key) => {
                self.view.text = key.as_str().to_string();
                events.push(BoardEvent::TextChanged(self.view.text.clone()));

                if self.layout.snapshot().contains(&key) {
                    self.sound.play(SoundCue::Emphasis);
                    self.view.highlight = Some(key.clone());
                    events.push(BoardEvent::Highlight {
                        key: key.clone(),
                        duration: self.pacing.emphasis,
                    });
                    self.schedule(self.pacing.emphasis, TimerKind::ClearHighlight(key));
                } else {
                    tracing::debug!(key = %key, "No glyph to emphasize");
                }
                self.pacing.emphasis
            }
            AnimationStep::Pause(base) => self.jitter.scale(base, JitterRange::PAUSE),
        };

        self.schedule(delay, TimerKind::Step);
    }

    /// Glide to `key` if it resolves in the current layout
    fn glide_to(&mut self, key: &SymbolKey, events: &mut Vec<BoardEvent>) -> bool {
        match self.layout.snapshot().get(key) {
            Some(target) => {
                self.sound.play(SoundCue::Move);
                self.move_pointer(target, self.pacing.move_duration, events);
                true
            }
            None => {
                tracing::debug!(key = %key, "Skipping move to unmeasured symbol");
                false
            }
        }
    }

    fn move_pointer(&mut self, to: Coordinate, duration: Duration, events: &mut Vec<BoardEvent>) {
        let glide = Glide::new(self.view.pointer, to, duration);
        self.view.pointer = to;
        events.push(BoardEvent::PointerMoved(glide));
    }

    fn settle(&mut self, events: &mut Vec<BoardEvent>) {
        self.state = SequencerState::Idle;
        self.view.busy = false;
        events.push(BoardEvent::RunFinished(self.token));
        tracing::info!(token = self.token.get(), "Sequencer run finished");

        if !self.at_rest() {
            self.schedule(self.pacing.return_to_rest, TimerKind::ReturnToRest);
        }
    }

    fn at_rest(&self) -> bool {
        self.view.pointer == self.layout.snapshot().rest()
    }

    fn schedule(&mut self, delay: Duration, kind: TimerKind) {
        self.timers.schedule(
            delay,
            SequencerTimer {
                token: self.token,
                kind,
            },
        );
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("state", &self.state)
            .field("token", &self.token)
            .field("view", &self.view)
            .field("pending", &self.timers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{FixedJitter, PlanBuilder};
    use crate::board::{LayoutHandle, SymbolMap};
    use crate::sound::SilentPlayer;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn sequencer_with(map: SymbolMap) -> Sequencer {
        Sequencer::new(
            Arc::new(LayoutHandle::new(map)),
            Arc::new(SilentPlayer::default()),
            Arc::new(FixedJitter(1.0)),
            Pacing::default(),
        )
    }

    fn small_map() -> SymbolMap {
        let mut map = SymbolMap::with_rest(Coordinate::new(0.0, 0.0));
        for (i, key) in ["SUN", "MOON", "STAR-BL", "GOOD BYE", "H", "I", "YES"]
            .into_iter()
            .enumerate()
        {
            map.insert(key, Coordinate::new(10.0 * (i + 1) as f32, 5.0));
        }
        map
    }

    #[test]
    fn test_new_sequencer_is_idle_at_rest() {
        let seq = sequencer_with(small_map());
        assert_eq!(seq.state(), &SequencerState::Idle);
        assert_eq!(seq.view().pointer, Coordinate::new(0.0, 0.0));
        assert_eq!(seq.next_deadline(), None);
    }

    #[test]
    fn test_first_step_runs_on_start() {
        let map = small_map();
        let plan = PlanBuilder::default().build("HI", &map);
        let mut seq = sequencer_with(map);

        let events = seq.start(plan);
        assert!(matches!(events.as_slice(), [BoardEvent::PointerMoved(_)]));
        assert!(seq.is_running());
        assert_eq!(seq.next_deadline(), Some(ms(800)));
    }

    #[test]
    fn test_letter_commits_after_move_duration() {
        let map = small_map();
        let plan = PlanBuilder::default().build("HI", &map);
        let mut seq = sequencer_with(map);
        seq.start(plan);

        // SUN 800, Pause 200, MOON 800, Pause 500 => H step at 2300
        seq.advance_to(ms(2300));
        assert_eq!(seq.view().text, "");
        seq.advance_to(ms(3099));
        assert_eq!(seq.view().text, "");
        seq.advance_to(ms(3100));
        assert_eq!(seq.view().text, "H");
    }

    #[test]
    fn test_stale_timer_is_discarded() {
        let map = small_map();
        let plan = PlanBuilder::default().build("HI", &map);
        let mut seq = sequencer_with(map);
        seq.start(plan);
        seq.advance_to(ms(2300));

        // Re-insert a timer from the superseded generation by hand
        let stale = seq.token();
        seq.reset();
        seq.timers.schedule(
            ms(10),
            SequencerTimer {
                token: stale,
                kind: TimerKind::CommitLetter(SymbolKey::from("H")),
            },
        );
        seq.advance_to(ms(5000));
        assert_eq!(seq.view().text, "");
    }

    #[test]
    fn test_emphasize_without_glyph_still_replaces_text() {
        let mut map = small_map();
        map.remove(&SymbolKey::from("YES"));
        let plan = PlanBuilder::default().build("YES", &map);
        let mut seq = sequencer_with(map);
        seq.start(plan);

        // SUN 800, Pause 200, Move(YES) 800 => Emphasize at 1800
        let events = seq.advance_to(ms(1800));
        assert_eq!(seq.view().text, "YES");
        assert!(seq.view().highlight.is_none());
        assert!(!events
            .iter()
            .any(|e| matches!(e, BoardEvent::Highlight { .. })));
    }

    #[test]
    fn test_empty_plan_settles() {
        let plan = PlanBuilder::default().build("", &SymbolMap::default());
        let mut seq = sequencer_with(SymbolMap::default());
        seq.start(plan);

        let events = seq.advance_to(ms(60_000));
        assert!(events
            .iter()
            .any(|e| matches!(e, BoardEvent::RunFinished(_))));
        assert_eq!(seq.state(), &SequencerState::Idle);
        assert_eq!(seq.next_deadline(), None);
    }
}
