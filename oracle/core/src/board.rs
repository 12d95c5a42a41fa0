//! Board Layout
//!
//! Symbol keys, board-local coordinates and the symbol map the sequencer
//! reads pointer targets from.
//!
//! # Design Philosophy
//!
//! The board is measured by whoever renders it. The core only needs a
//! mapping from [`SymbolKey`] to [`Coordinate`], republished whenever the
//! board is re-measured (resize, mode switch). [`LayoutHandle`] holds the
//! latest snapshot behind a lock so a republish never blocks a run: the
//! sequencer grabs an `Arc` of the current map at the instant a step runs.
//!
//! [`BoardGeometry`] is a reference measurement for a board of a given pixel
//! size: YES/NO across the top, two alphabet arcs, the digit row and
//! GOOD BYE at the bottom, with the four corner icons.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Named control symbols on the board
pub mod symbols {
    /// Top-left sun icon
    pub const SUN: &str = "SUN";
    /// Top-right moon icon
    pub const MOON: &str = "MOON";
    /// Bottom-left star icon
    pub const STAR_BL: &str = "STAR-BL";
    /// Bottom-right star icon
    pub const STAR_BR: &str = "STAR-BR";
    /// YES corner word
    pub const YES: &str = "YES";
    /// NO corner word
    pub const NO: &str = "NO";
    /// GOOD BYE footer word
    pub const GOOD_BYE: &str = "GOOD BYE";
    /// Space, which always resolves to the resting position
    pub const SPACE: &str = " ";
}

/// Planchette footprint in pixels; coordinates are the planchette's top-left
/// corner centred over the glyph.
const PLANCHETTE_WIDTH: f32 = 100.0;
const PLANCHETTE_HEIGHT: f32 = 90.0;

/// Identifies a locatable target on the board
///
/// Either a single character (`A`-`Z`, `0`-`9`, space) or a named control
/// symbol from [`symbols`]. Keys are case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolKey(String);

impl SymbolKey {
    /// Create a key from any string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for a single character
    #[must_use]
    pub fn from_char(c: char) -> Self {
        Self(c.to_string())
    }

    /// The space key
    #[must_use]
    pub fn space() -> Self {
        Self(symbols::SPACE.to_string())
    }

    /// Whether this is the space key
    #[must_use]
    pub fn is_space(&self) -> bool {
        self.0 == symbols::SPACE
    }

    /// The literal text of the key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SymbolKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A render-ready position in board-local pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Distance from the board's top edge
    pub top: f32,
    /// Distance from the board's left edge
    pub left: f32,
}

impl Coordinate {
    /// Create a coordinate
    #[must_use]
    pub const fn new(top: f32, left: f32) -> Self {
        Self { top, left }
    }

    /// Linear interpolation towards `to` (`t` clamped to 0.0..=1.0)
    #[must_use]
    pub fn lerp(self, to: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            top: self.top + (to.top - self.top) * t,
            left: self.left + (to.left - self.left) * t,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "top: {:.0}px, left: {:.0}px", self.top, self.left)
    }
}

/// Resolved table of on-board coordinates keyed by symbol
///
/// The resting coordinate is stored separately and answers lookups of the
/// space key, so it resolves even when no glyph has been measured yet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolMap {
    entries: HashMap<SymbolKey, Coordinate>,
    rest: Coordinate,
}

impl SymbolMap {
    /// An empty map with only a resting coordinate
    #[must_use]
    pub fn with_rest(rest: Coordinate) -> Self {
        Self {
            entries: HashMap::new(),
            rest,
        }
    }

    /// Record a glyph position
    pub fn insert(&mut self, key: impl Into<SymbolKey>, at: Coordinate) {
        let key = key.into();
        if key.is_space() {
            self.rest = at;
        } else {
            self.entries.insert(key, at);
        }
    }

    /// Remove a glyph (the resting position cannot be removed)
    pub fn remove(&mut self, key: &SymbolKey) -> Option<Coordinate> {
        self.entries.remove(key)
    }

    /// Resolve a key; the space key resolves to the resting coordinate
    #[must_use]
    pub fn get(&self, key: &SymbolKey) -> Option<Coordinate> {
        if key.is_space() {
            Some(self.rest)
        } else {
            self.entries.get(key).copied()
        }
    }

    /// Whether a key resolves
    #[must_use]
    pub fn contains(&self, key: &SymbolKey) -> bool {
        key.is_space() || self.entries.contains_key(key)
    }

    /// The resting coordinate
    #[must_use]
    pub fn rest(&self) -> Coordinate {
        self.rest
    }

    /// Number of measured glyphs (excluding rest)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no glyph has been measured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source of the current symbol map
///
/// Implementations must be cheap to call: the sequencer reads a snapshot on
/// every `Move` and `RevealLetter` step.
pub trait LayoutProvider: Send + Sync {
    /// Latest published map
    fn snapshot(&self) -> Arc<SymbolMap>;
}

/// Shared, republishable layout snapshot
#[derive(Clone, Debug, Default)]
pub struct LayoutHandle {
    current: Arc<RwLock<Arc<SymbolMap>>>,
}

impl LayoutHandle {
    /// Create a handle with an initial map
    #[must_use]
    pub fn new(map: SymbolMap) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(map))),
        }
    }

    /// Replace the current map (e.g. after a resize)
    pub fn publish(&self, map: SymbolMap) {
        *self.current.write() = Arc::new(map);
        tracing::debug!("Board layout republished");
    }
}

impl LayoutProvider for LayoutHandle {
    fn snapshot(&self) -> Arc<SymbolMap> {
        Arc::clone(&self.current.read())
    }
}

/// The glyph inventory of the board
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardLayout {
    /// Words across the top
    pub top: Vec<String>,
    /// Inner alphabet arc
    pub inner_arc: Vec<String>,
    /// Outer alphabet arc
    pub outer_arc: Vec<String>,
    /// Digit row
    pub numerals: Vec<String>,
    /// Footer word
    pub bottom: Vec<String>,
}

impl Default for BoardLayout {
    fn default() -> Self {
        let letters = |range: std::ops::RangeInclusive<char>| -> Vec<String> {
            range.map(|c| c.to_string()).collect()
        };
        Self {
            top: vec![symbols::YES.to_string(), symbols::NO.to_string()],
            inner_arc: letters('A'..='M'),
            outer_arc: letters('N'..='Z'),
            numerals: "1234567890".chars().map(|c| c.to_string()).collect(),
            bottom: vec![symbols::GOOD_BYE.to_string()],
        }
    }
}

/// Reference measurement of a board rendered at a given pixel size
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardGeometry {
    /// Board width in pixels
    pub width: f32,
    /// Board height in pixels
    pub height: f32,
}

impl BoardGeometry {
    /// Create a geometry for a board of the given size
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Where the planchette rests when idle
    #[must_use]
    pub fn rest(&self) -> Coordinate {
        Coordinate::new(
            self.height * 0.45,
            self.width / 2.0 - PLANCHETTE_WIDTH / 2.0,
        )
    }

    /// Measure every glyph of `layout` on this board
    ///
    /// A board with zero area yields only the resting position.
    #[must_use]
    pub fn measure(&self, layout: &BoardLayout) -> SymbolMap {
        let mut map = SymbolMap::with_rest(self.rest());
        if self.width <= 0.0 || self.height <= 0.0 {
            return map;
        }

        let centre = (self.height / 2.0, self.width / 2.0);

        // Corner icons
        map.insert(symbols::SUN, self.glyph(self.height * 0.08, self.width * 0.07));
        map.insert(symbols::MOON, self.glyph(self.height * 0.10, self.width * 0.93));
        map.insert(symbols::STAR_BL, self.glyph(self.height * 0.90, self.width * 0.08));
        map.insert(symbols::STAR_BR, self.glyph(self.height * 0.90, self.width * 0.92));

        // YES / NO spread across the top
        let spread = self.width * 0.2;
        for (i, word) in layout.top.iter().enumerate() {
            let left = if i == 0 { spread } else { self.width - spread };
            map.insert(word.as_str(), self.glyph(self.height * 0.08, left));
        }

        self.place_arc(&mut map, &layout.inner_arc, centre, self.height * 0.30, 140.0, -70.0);
        self.place_arc(&mut map, &layout.outer_arc, centre, self.height * 0.43, 150.0, -75.0);

        // Digit row, evenly spaced across the middle 60% of the board
        let count = layout.numerals.len();
        if count > 0 {
            let span = self.width * 0.6;
            let step = if count > 1 { span / (count - 1) as f32 } else { 0.0 };
            let start = (self.width - span) / 2.0;
            for (i, digit) in layout.numerals.iter().enumerate() {
                map.insert(
                    digit.as_str(),
                    self.glyph(self.height * 0.78, start + step * i as f32),
                );
            }
        }

        for word in &layout.bottom {
            map.insert(word.as_str(), self.glyph(self.height * 0.92, self.width / 2.0));
        }

        map
    }

    /// Lay glyphs along an arc; angles in degrees, 0 = straight up
    fn place_arc(
        &self,
        map: &mut SymbolMap,
        glyphs: &[String],
        centre: (f32, f32),
        radius: f32,
        arc: f32,
        start_angle: f32,
    ) {
        let step = if glyphs.len() > 1 {
            arc / (glyphs.len() - 1) as f32
        } else {
            0.0
        };
        for (i, glyph) in glyphs.iter().enumerate() {
            let angle = (start_angle + step * i as f32).to_radians();
            let top = centre.0 - radius * angle.cos();
            let left = centre.1 + radius * angle.sin();
            map.insert(glyph.as_str(), self.glyph(top, left));
        }
    }

    /// Planchette position centred over a glyph centre
    fn glyph(&self, centre_top: f32, centre_left: f32) -> Coordinate {
        Coordinate::new(
            centre_top - PLANCHETTE_HEIGHT / 2.0,
            centre_left - PLANCHETTE_WIDTH / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_resolves_to_rest_on_empty_map() {
        let rest = Coordinate::new(10.0, 20.0);
        let map = SymbolMap::with_rest(rest);

        assert!(map.is_empty());
        assert_eq!(map.get(&SymbolKey::space()), Some(rest));
        assert!(map.contains(&SymbolKey::space()));
        assert_eq!(map.get(&SymbolKey::from("A")), None);
    }

    #[test]
    fn test_inserting_space_moves_rest() {
        let mut map = SymbolMap::default();
        map.insert(" ", Coordinate::new(5.0, 6.0));
        assert_eq!(map.rest(), Coordinate::new(5.0, 6.0));
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut map = SymbolMap::default();
        map.insert("A", Coordinate::new(1.0, 1.0));
        assert!(map.contains(&SymbolKey::from("A")));
        assert!(!map.contains(&SymbolKey::from("a")));
    }

    #[test]
    fn test_geometry_measures_every_glyph() {
        let layout = BoardLayout::default();
        let map = BoardGeometry::new(900.0, 600.0).measure(&layout);

        for c in ('A'..='Z').chain('0'..='9') {
            assert!(map.contains(&SymbolKey::from_char(c)), "missing {c}");
        }
        for key in [
            symbols::SUN,
            symbols::MOON,
            symbols::STAR_BL,
            symbols::STAR_BR,
            symbols::YES,
            symbols::NO,
            symbols::GOOD_BYE,
        ] {
            assert!(map.contains(&SymbolKey::from(key)), "missing {key}");
        }
        assert_eq!(map.rest(), Coordinate::new(270.0, 400.0));
    }

    #[test]
    fn test_zero_area_board_has_only_rest() {
        let map = BoardGeometry::new(0.0, 0.0).measure(&BoardLayout::default());
        assert!(map.is_empty());
        assert!(map.contains(&SymbolKey::space()));
    }

    #[test]
    fn test_layout_handle_republish() {
        let handle = LayoutHandle::new(SymbolMap::default());
        let before = handle.snapshot();

        let mut next = SymbolMap::default();
        next.insert("Z", Coordinate::new(3.0, 4.0));
        handle.publish(next);

        // Old snapshots stay valid; new reads see the republished map
        assert!(!before.contains(&SymbolKey::from("Z")));
        assert!(handle.snapshot().contains(&SymbolKey::from("Z")));
    }

    #[test]
    fn test_coordinate_lerp() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(100.0, 50.0);
        assert_eq!(a.lerp(b, 0.5), Coordinate::new(50.0, 25.0));
        assert_eq!(a.lerp(b, 2.0), b);
    }
}
