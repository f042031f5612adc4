// Interval values, clamp ranges, and the composite key used for contexts
// and motif n-grams.
//
// Every raw interval coming from the corpus is clamped into a fixed range
// before it is counted, which bounds the vocabulary each table can hold.
// Melodic intervals (one voice, consecutive notes) are clamped to two
// octaves; harmonic intervals (two voices sounding together) to three,
// since simultaneous-voice distances routinely exceed melodic leaps.
//
// `IntervalKey` is the structured key for a tuple of clamped intervals. It
// is used for Markov contexts (length 0-3) and motif n-grams (length
// `MotifConfig::min_length..=max_length`). Equality, hashing and ordering
// are element-wise, so there is no string formatting in the counting path.
// The comma-joined string form (`"2,-1,3"`) only appears when a key is
// written to or read from JSON, where map keys must be strings. This is the
// format `elven_canopy_music::markov` expects when loading the artifacts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A clamped interval in semitones. Both clamp ranges fit comfortably in i8.
pub type Interval = i8;

/// Inclusive clamp range for one kind of interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalRange {
    pub min: Interval,
    pub max: Interval,
}

/// Melodic intervals: two octaves either way.
pub const MELODIC_RANGE: IntervalRange = IntervalRange { min: -24, max: 24 };

/// Harmonic intervals: three octaves either way.
pub const HARMONIC_RANGE: IntervalRange = IntervalRange { min: -36, max: 36 };

impl IntervalRange {
    /// Clamp a raw semitone value into this range.
    pub fn clamp(self, raw: i32) -> Interval {
        // The range bounds are i8, so the clamped value always fits.
        raw.clamp(self.min as i32, self.max as i32) as Interval
    }

    /// Clamp a whole sequence.
    pub fn clamp_all(self, raw: &[i32]) -> Vec<Interval> {
        raw.iter().map(|&iv| self.clamp(iv)).collect()
    }

    pub fn contains(self, interval: Interval) -> bool {
        (self.min..=self.max).contains(&interval)
    }
}

// ---------------------------------------------------------------------------
// IntervalKey
// ---------------------------------------------------------------------------

/// Ordered tuple of clamped intervals. Up to ten elements are stored inline,
/// which covers every Markov context and every default-length motif.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalKey(SmallVec<[Interval; 10]>);

impl IntervalKey {
    pub fn new(intervals: &[Interval]) -> Self {
        Self(SmallVec::from_slice(intervals))
    }

    /// The empty context (order 0).
    pub fn empty() -> Self {
        Self(SmallVec::new())
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Interval> {
        self.0.to_vec()
    }
}

impl fmt::Display for IntervalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, iv) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{iv}")?;
        }
        Ok(())
    }
}

/// Error returned when a key string is not a comma-separated list of i8.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid interval key {0:?}")]
pub struct ParseKeyError(pub String);

impl FromStr for IntervalKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::empty());
        }
        s.split(',')
            .map(|part| part.trim().parse::<Interval>())
            .collect::<Result<SmallVec<_>, _>>()
            .map(Self)
            .map_err(|_| ParseKeyError(s.to_string()))
    }
}

// Custom serde: serialize as the comma-joined string so IntervalKey can be
// used as a JSON map key (serde_json requires string keys).
impl Serialize for IntervalKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for IntervalKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
