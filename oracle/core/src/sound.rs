//! Sound Cues
//!
//! The core never synthesizes audio. It names a [`SoundCue`] and hands it to
//! whatever [`SoundPlayer`] the surface installed; playback is
//! fire-and-forget and must never block the caller.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Named sound effects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Planchette glides to a glyph
    #[serde(rename = "move")]
    Move,
    /// A letter lands in the answer text
    #[serde(rename = "select")]
    Select,
    /// A direct answer is emphasized
    #[serde(rename = "emphasis")]
    Emphasis,
    /// Button press
    #[serde(rename = "uiclick")]
    UiClick,
    /// Begin the looping ambient drone
    #[serde(rename = "startAmbient")]
    StartAmbient,
    /// Stop the ambient drone
    #[serde(rename = "stopAmbient")]
    StopAmbient,
    /// The "67" alert
    #[serde(rename = "crypticFlash")]
    CrypticFlash,
    /// Long scare
    #[serde(rename = "jumpscare")]
    Jumpscare,
    /// Short scare
    #[serde(rename = "jumpscare_short")]
    JumpscareShort,
    /// Begin the looping heartbeat
    #[serde(rename = "startHeartbeat")]
    StartHeartbeat,
    /// Stop the heartbeat
    #[serde(rename = "stopHeartbeat")]
    StopHeartbeat,
}

impl SoundCue {
    /// Cue name as surfaces know it
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Select => "select",
            Self::Emphasis => "emphasis",
            Self::UiClick => "uiclick",
            Self::StartAmbient => "startAmbient",
            Self::StopAmbient => "stopAmbient",
            Self::CrypticFlash => "crypticFlash",
            Self::Jumpscare => "jumpscare",
            Self::JumpscareShort => "jumpscare_short",
            Self::StartHeartbeat => "startHeartbeat",
            Self::StopHeartbeat => "stopHeartbeat",
        }
    }
}

impl fmt::Display for SoundCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plays named cues
pub trait SoundPlayer: Send + Sync {
    /// Play a cue (returns immediately)
    fn play(&self, cue: SoundCue);

    /// Mute or unmute all output
    fn set_muted(&self, muted: bool);

    /// Current mute state
    fn is_muted(&self) -> bool;
}

/// A player that makes no sound
#[derive(Debug, Default)]
pub struct SilentPlayer {
    muted: AtomicBool,
}

impl SoundPlayer for SilentPlayer {
    fn play(&self, _cue: SoundCue) {}

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }
}

/// Loops a [`LogSoundPlayer`] tracks
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ActiveLoops {
    /// Ambient drone running
    pub ambient: bool,
    /// Heartbeat running
    pub heartbeat: bool,
}

/// Writes cues to the tracing log
///
/// Tracks the two looping cues the way a synthesizer would: starting a loop
/// that is already running is ignored, as is stopping one that isn't.
#[derive(Debug, Default)]
pub struct LogSoundPlayer {
    muted: AtomicBool,
    loops: Mutex<ActiveLoops>,
}

impl LogSoundPlayer {
    /// Create an unmuted player
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Which loops are running
    #[must_use]
    pub fn loops(&self) -> ActiveLoops {
        *self.loops.lock()
    }
}

impl SoundPlayer for LogSoundPlayer {
    fn play(&self, cue: SoundCue) {
        let audible = {
            let mut loops = self.loops.lock();
            match cue {
                SoundCue::StartAmbient => !std::mem::replace(&mut loops.ambient, true),
                SoundCue::StopAmbient => std::mem::replace(&mut loops.ambient, false),
                SoundCue::StartHeartbeat => !std::mem::replace(&mut loops.heartbeat, true),
                SoundCue::StopHeartbeat => std::mem::replace(&mut loops.heartbeat, false),
                _ => true,
            }
        };

        if audible && !self.is_muted() {
            tracing::debug!(cue = %cue, "Sound cue");
        }
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
        tracing::info!(muted, "Sound output muted state changed");
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_names_match_serde() {
        for cue in [
            SoundCue::Move,
            SoundCue::JumpscareShort,
            SoundCue::StartHeartbeat,
            SoundCue::CrypticFlash,
        ] {
            let json = serde_json::to_string(&cue).unwrap();
            assert_eq!(json, format!("\"{}\"", cue.as_str()));
        }
    }

    #[test]
    fn test_log_player_tracks_loops() {
        let player = LogSoundPlayer::new();
        player.play(SoundCue::StartAmbient);
        player.play(SoundCue::StartAmbient);
        assert!(player.loops().ambient);

        player.play(SoundCue::StartHeartbeat);
        player.play(SoundCue::StopHeartbeat);
        assert_eq!(
            player.loops(),
            ActiveLoops {
                ambient: true,
                heartbeat: false
            }
        );
    }

    #[test]
    fn test_mute_state() {
        let player = SilentPlayer::default();
        assert!(!player.is_muted());
        player.set_muted(true);
        assert!(player.is_muted());
    }
}
