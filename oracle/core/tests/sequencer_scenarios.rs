//! Plan and playback scenarios
//!
//! End-to-end checks of the answer animation: plans built from answers on a
//! measured board, then played on the virtual clock.
//! Tests cover:
//! - Direct and spelled plan shapes
//! - Characters missing from the board
//! - Reset idempotence and cancellation safety
//! - Runs superseding each other

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use oracle_core::animation::{
    AnimationStep, AnswerKind, BoardEvent, FixedJitter, Pacing, PlanBuilder, Sequencer,
    SequencerState,
};
use oracle_core::board::{symbols, BoardGeometry, BoardLayout, LayoutHandle, SymbolKey, SymbolMap};
use oracle_core::sound::SilentPlayer;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn mv(key: &str) -> AnimationStep {
    AnimationStep::Move(SymbolKey::from(key))
}

fn reveal(key: &str) -> AnimationStep {
    AnimationStep::RevealLetter(SymbolKey::from(key))
}

fn pause(millis: u64) -> AnimationStep {
    AnimationStep::Pause(ms(millis))
}

fn board() -> SymbolMap {
    BoardGeometry::new(800.0, 600.0).measure(&BoardLayout::default())
}

fn sequencer(map: SymbolMap) -> Sequencer {
    Sequencer::new(
        Arc::new(LayoutHandle::new(map)),
        Arc::new(SilentPlayer::default()),
        Arc::new(FixedJitter::default()),
        Pacing::default(),
    )
}

/// Advance in 50ms ticks, collecting every text the board showed
fn texts_until(seq: &mut Sequencer, from: u64, until: u64) -> Vec<String> {
    let mut texts = Vec::new();
    let mut now = from;
    while now <= until {
        for event in seq.advance_to(ms(now)) {
            if let BoardEvent::TextChanged(text) = event {
                texts.push(text);
            }
        }
        now += 50;
    }
    texts
}

// =============================================================================
// Plan Shapes
// =============================================================================

#[test]
fn test_yes_plan() {
    let plan = PlanBuilder::default().build("YES", &board());

    assert_eq!(plan.kind(), AnswerKind::Direct);
    assert_eq!(
        plan.steps(),
        &[
            mv(symbols::SUN),
            pause(200),
            mv("YES"),
            AnimationStep::Emphasize(SymbolKey::from("YES")),
            pause(1500),
            mv(symbols::MOON),
            pause(200),
            mv(symbols::GOOD_BYE),
        ]
    );
}

#[test]
fn test_good_bye_plan_has_no_trailing_farewell() {
    let plan = PlanBuilder::default().build("GOOD BYE", &board());

    assert_eq!(plan.kind(), AnswerKind::Direct);
    assert_eq!(
        &plan.steps()[plan.len() - 2..],
        &[
            AnimationStep::Emphasize(SymbolKey::from(symbols::GOOD_BYE)),
            pause(1500),
        ]
    );
    assert_eq!(plan.len(), 5);
}

#[test]
fn test_every_direct_answer_ends_at_good_bye_without_spelling() {
    let map = board();
    let builder = PlanBuilder::default();
    let answers = ["YES", "NO"]
        .into_iter()
        .map(String::from)
        .chain(('A'..='Z').chain('0'..='9').map(String::from));

    for answer in answers {
        let plan = builder.build(&answer, &map);
        assert_eq!(plan.kind(), AnswerKind::Direct, "{answer}");
        assert_eq!(plan.reveal_count(), 0, "{answer}");
        assert_eq!(
            plan.last_key().map(SymbolKey::as_str),
            Some(symbols::GOOD_BYE),
            "{answer}"
        );
    }
}

#[test]
fn test_cat_plan() {
    let plan = PlanBuilder::default().build("CAT", &board());

    assert_eq!(plan.kind(), AnswerKind::Spelled);
    assert_eq!(
        plan.steps(),
        &[
            mv(symbols::SUN),
            pause(200),
            mv(symbols::MOON),
            pause(500),
            reveal("C"),
            reveal("A"),
            reveal("T"),
            pause(500),
            mv(symbols::STAR_BL),
            pause(200),
            mv(symbols::GOOD_BYE),
        ]
    );
}

#[test]
fn test_missing_glyph_is_dropped_from_plan() {
    let mut map = board();
    map.remove(&SymbolKey::from("Z"));

    let plan = PlanBuilder::default().build("ZOO", &map);
    let reveals: Vec<_> = plan
        .steps()
        .iter()
        .filter(|step| matches!(step, AnimationStep::RevealLetter(_)))
        .cloned()
        .collect();

    assert_eq!(reveals, vec![reveal("O"), reveal("O")]);
}

#[test]
fn test_reveal_count_includes_space() {
    let plan = PlanBuilder::default().build("CRYPT 13", &board());

    assert_eq!(plan.reveal_count(), 8);
    assert!(plan.steps().contains(&reveal(symbols::SPACE)));
}

#[test]
fn test_header_only_for_unusable_answer() {
    let plan = PlanBuilder::default().build("?!", &board());

    assert_eq!(plan.kind(), AnswerKind::Spelled);
    assert_eq!(plan.reveal_count(), 0);
    assert_eq!(plan.len(), 8);
}

// =============================================================================
// Playback
// =============================================================================

#[test]
fn test_cat_text_progression() {
    let map = board();
    let plan = PlanBuilder::default().build("CAT", &map);
    let mut seq = sequencer(map);

    seq.start(plan);
    let texts = texts_until(&mut seq, 0, 12_000);

    assert_eq!(texts, vec!["C", "CA", "CAT"]);
    assert_eq!(seq.view().text, "CAT");
    assert!(!seq.view().busy);
    assert_eq!(seq.state(), &SequencerState::Idle);
}

#[test]
fn test_run_finishes_and_pointer_returns_home() {
    let map = board();
    let rest = map.rest();
    let plan = PlanBuilder::default().build("NO", &map);
    let mut seq = sequencer(map);

    let mut finished = false;
    for event in seq.start(plan) {
        finished |= matches!(event, BoardEvent::RunFinished(_));
    }
    for now in (0..=15_000).step_by(100) {
        for event in seq.advance_to(ms(now)) {
            finished |= matches!(event, BoardEvent::RunFinished(_));
        }
    }

    assert!(finished);
    assert_eq!(seq.view().pointer, rest);
    assert_eq!(seq.pending_timers(), 0);
}

#[test]
fn test_reset_twice_is_idempotent() {
    let map = board();
    let rest = map.rest();
    let mut seq = sequencer(map);

    seq.reset();
    seq.reset();
    seq.advance_to(ms(1000));

    assert_eq!(seq.view().text, "");
    assert_eq!(seq.view().pointer, rest);
    assert_eq!(seq.pending_timers(), 0);
    assert_eq!(seq.state(), &SequencerState::Idle);

    let token = seq.token();
    seq.reset();
    assert_eq!(seq.pending_timers(), 0);
    assert!(seq.token() > token);
}

#[test]
fn test_reset_mid_run_returns_home_once() {
    let map = board();
    let rest = map.rest();
    let plan = PlanBuilder::default().build("CAT", &map);
    let mut seq = sequencer(map);

    seq.start(plan);
    seq.advance_to(ms(4000));
    assert_eq!(seq.view().text, "C");

    seq.reset();
    seq.reset();
    assert_eq!(seq.view().text, "");
    assert_eq!(seq.pending_timers(), 1);

    let texts = texts_until(&mut seq, 4000, 12_000);
    assert!(texts.is_empty());
    assert_eq!(seq.view().pointer, rest);
    assert_eq!(seq.state(), &SequencerState::Idle);
    assert_eq!(seq.pending_timers(), 0);
}

#[test]
fn test_second_run_supersedes_first() {
    let map = board();
    let builder = PlanBuilder::default();
    let first = builder.build("CAT", &map);
    let second = builder.build("DOG", &map);
    let mut seq = sequencer(map);

    seq.start(first);
    seq.advance_to(ms(4000));
    assert_eq!(seq.view().text, "C");

    // Mid-flight: the glide to A has started and its append is pending
    seq.start(second);
    let texts = texts_until(&mut seq, 4000, 20_000);

    assert_eq!(texts, vec!["D", "DO", "DOG"]);
    assert_eq!(seq.view().text, "DOG");
}

#[test]
fn test_reset_during_append_delay_drops_letter() {
    let map = board();
    let plan = PlanBuilder::default().build("HI", &map);
    let mut seq = sequencer(map);

    // H's glide starts at 2300ms and would commit at 3100ms
    seq.start(plan);
    seq.advance_to(ms(2300));
    assert_eq!(seq.view().text, "");

    seq.advance_to(ms(2350));
    seq.reset();

    let texts = texts_until(&mut seq, 2350, 10_000);
    assert!(texts.is_empty(), "late append landed: {texts:?}");
    assert_eq!(seq.view().text, "");
}

#[test]
fn test_republished_layout_is_read_per_step() {
    let map = board();
    let handle = LayoutHandle::new(map.clone());
    let mut seq = Sequencer::new(
        Arc::new(handle.clone()),
        Arc::new(SilentPlayer::default()),
        Arc::new(FixedJitter::default()),
        Pacing::default(),
    );

    // The plan keeps "C", but the board loses it before the step runs
    let plan = PlanBuilder::default().build("CAT", &map);
    let mut shrunk = map;
    shrunk.remove(&SymbolKey::from("C"));

    seq.start(plan);
    handle.publish(shrunk);
    let texts = texts_until(&mut seq, 0, 12_000);

    assert_eq!(texts, vec!["A", "AT"]);
}
