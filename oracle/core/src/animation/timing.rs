//! Pacing and Jitter
//!
//! Timing constants for a sequencer run, the injectable randomness used to
//! make repeated runs feel organic, and the glide interpolation surfaces use
//! to animate the planchette between two coordinates.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::Coordinate;

/// Pointer transition time; also the minimum delay of every move step
pub const MOVE_DURATION_MS: u64 = 800;

/// Base delay between spelled letters
pub const INTER_LETTER_DELAY_MS: u64 = 1200;

/// How long an emphasized glyph stays highlighted
pub const EMPHASIS_MS: u64 = 1500;

/// Quiet period after the last step before the run settles
pub const SETTLE_MS: u64 = 2000;

/// Delay before the planchette drifts back to rest after a reset or settle
pub const RETURN_TO_REST_MS: u64 = 500;

/// Timing constants for a sequencer run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pacing {
    /// Pointer transition time
    pub move_duration: Duration,
    /// Base inter-letter delay (half of it, jittered, follows each letter)
    pub inter_letter: Duration,
    /// Emphasis highlight duration (also the emphasize step delay)
    pub emphasis: Duration,
    /// Settle delay after the last step
    pub settle: Duration,
    /// Delay before returning to rest
    pub return_to_rest: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            move_duration: Duration::from_millis(MOVE_DURATION_MS),
            inter_letter: Duration::from_millis(INTER_LETTER_DELAY_MS),
            emphasis: Duration::from_millis(EMPHASIS_MS),
            settle: Duration::from_millis(SETTLE_MS),
            return_to_rest: Duration::from_millis(RETURN_TO_REST_MS),
        }
    }
}

impl Pacing {
    /// Pause after a spelled character (before any move time)
    #[must_use]
    pub fn letter_gap(&self, jitter: &dyn Jitter) -> Duration {
        jitter.scale(self.inter_letter / 2, JitterRange::LETTER)
    }
}

/// Multiplicative range a base delay is scaled by
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JitterRange {
    /// Lower bound of the factor
    pub low: f64,
    /// Upper bound of the factor
    pub high: f64,
}

impl JitterRange {
    /// Inter-letter pacing factor
    pub const LETTER: Self = Self {
        low: 0.5,
        high: 1.0,
    };

    /// Pause step factor
    pub const PAUSE: Self = Self {
        low: 0.7,
        high: 1.3,
    };
}

/// Source of randomness for pacing and rolls
pub trait Jitter: Send + Sync {
    /// A value in `low..high`
    fn sample(&self, low: f64, high: f64) -> f64;

    /// Scale `base` by a factor drawn from `range`
    fn scale(&self, base: Duration, range: JitterRange) -> Duration {
        base.mul_f64(self.sample(range.low, range.high).max(0.0))
    }

    /// True with the given probability
    fn chance(&self, probability: f64) -> bool {
        self.sample(0.0, 1.0) < probability
    }
}

/// Thread-local RNG jitter
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadJitter;

impl Jitter for ThreadJitter {
    fn sample(&self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        rand::thread_rng().gen_range(low..high)
    }
}

/// Deterministic jitter: every sample returns the same value
///
/// `FixedJitter(1.0)` leaves delays untouched and never wins a roll below
/// certainty.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedJitter(pub f64);

impl Default for FixedJitter {
    fn default() -> Self {
        Self(1.0)
    }
}

impl Jitter for FixedJitter {
    fn sample(&self, _low: f64, _high: f64) -> f64 {
        self.0
    }
}

/// Easing curves for pointer glides
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EasingFunction {
    /// Constant speed
    Linear,
    /// Slow start, fast end
    EaseIn,
    /// Fast start, slow end
    EaseOut,
    /// Slow start and end
    #[default]
    EaseInOut,
}

impl EasingFunction {
    /// Apply the curve to a progress value (0.0 to 1.0)
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t).powi(2),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// A planchette transition between two coordinates
///
/// Surfaces sample it while rendering; its duration is the pacing's move
/// duration, so the glide lands before the next step starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glide {
    /// Where the pointer was
    pub from: Coordinate,
    /// Where the pointer is heading
    pub to: Coordinate,
    /// Transition time
    pub duration: Duration,
    /// Easing curve
    pub easing: EasingFunction,
}

impl Glide {
    /// Create a glide with the default easing
    #[must_use]
    pub fn new(from: Coordinate, to: Coordinate, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            easing: EasingFunction::default(),
        }
    }

    /// Position after `elapsed`
    #[must_use]
    pub fn position_at(&self, elapsed: Duration) -> Coordinate {
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.to;
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from.lerp(self.to, self.easing.apply(t))
    }

    /// Whether the glide has landed
    #[must_use]
    pub fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}
