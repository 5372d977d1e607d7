//! Emotional state: five bounded mood scalars, their baselines, and a short
//! newest-first history of the emotion events that moved them.

use serde::{Deserialize, Serialize};

use crate::constants::HISTORY_LIMIT;

/// One of the five mood axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Valence,
    Arousal,
    Connection,
    Curiosity,
    Energy,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Valence,
        Dimension::Arousal,
        Dimension::Connection,
        Dimension::Curiosity,
        Dimension::Energy,
    ];

    /// Inclusive range every value on this axis is clamped to.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Dimension::Valence => (-1.0, 1.0),
            _ => (0.0, 1.0),
        }
    }

    pub fn clamp(self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        let (lo, hi) = self.bounds();
        value.clamp(lo, hi)
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Valence => "valence",
            Dimension::Arousal => "arousal",
            Dimension::Connection => "connection",
            Dimension::Curiosity => "curiosity",
            Dimension::Energy => "energy",
        }
    }
}

/// A point in mood space. Used both for the live mood and for its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoodVector {
    pub valence: f64,
    pub arousal: f64,
    pub connection: f64,
    pub curiosity: f64,
    pub energy: f64,
}

impl MoodVector {
    pub fn new(valence: f64, arousal: f64, connection: f64, curiosity: f64, energy: f64) -> Self {
        Self {
            valence,
            arousal,
            connection,
            curiosity,
            energy,
        }
    }

    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Valence => self.valence,
            Dimension::Arousal => self.arousal,
            Dimension::Connection => self.connection,
            Dimension::Curiosity => self.curiosity,
            Dimension::Energy => self.energy,
        }
    }

    pub fn set(&mut self, dim: Dimension, value: f64) {
        let slot = match dim {
            Dimension::Valence => &mut self.valence,
            Dimension::Arousal => &mut self.arousal,
            Dimension::Connection => &mut self.connection,
            Dimension::Curiosity => &mut self.curiosity,
            Dimension::Energy => &mut self.energy,
        };
        *slot = value;
    }

    /// Copy with every axis pulled into its declared range.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for dim in Dimension::ALL {
            out.set(dim, dim.clamp(self.get(dim)));
        }
        out
    }

    pub fn is_within_bounds(&self) -> bool {
        Dimension::ALL.iter().all(|&dim| {
            let (lo, hi) = dim.bounds();
            let v = self.get(dim);
            v >= lo && v <= hi
        })
    }
}

/// A single recorded emotion event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    pub label: String,
    pub intensity: f64,
    pub trigger: String,
    /// Unix millis.
    pub timestamp: i64,
}

/// Per-user emotional state.
///
/// Serializes flat, with `baseline*` prefixed fields, matching the record
/// shape the rest of the application stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StateRecord", into = "StateRecord")]
pub struct EmotionalState {
    pub mood: MoodVector,
    pub baseline: MoodVector,
    /// Newest first, at most `HISTORY_LIMIT` entries.
    pub recent_emotions: Vec<EmotionRecord>,
    /// Unix millis of the last mutation.
    pub last_updated: i64,
}

impl EmotionalState {
    /// Initial state for a freshly created user.
    pub fn seed(now: i64) -> Self {
        Self {
            mood: MoodVector::new(0.2, 0.3, 0.1, 0.6, 0.5),
            baseline: MoodVector::new(0.1, 0.3, 0.3, 0.5, 0.5),
            recent_emotions: vec![EmotionRecord {
                label: "curiosity".to_string(),
                intensity: 0.7,
                trigger: "meeting a new person".to_string(),
                timestamp: now,
            }],
            last_updated: now,
        }
    }

    /// Restore the invariants on state that came from outside the engine
    /// (imports, hand-edited rows).
    pub fn normalized(mut self) -> Self {
        self.mood = self.mood.clamped();
        self.baseline = self.baseline.clamped();
        self.recent_emotions.truncate(HISTORY_LIMIT);
        for record in &mut self.recent_emotions {
            record.intensity = clamp_unit(record.intensity);
        }
        self
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateRecord {
    valence: f64,
    arousal: f64,
    connection: f64,
    curiosity: f64,
    energy: f64,
    baseline_valence: f64,
    baseline_arousal: f64,
    baseline_connection: f64,
    baseline_curiosity: f64,
    baseline_energy: f64,
    #[serde(default)]
    recent_emotions: Vec<EmotionRecord>,
    #[serde(default)]
    last_updated: i64,
}

impl From<StateRecord> for EmotionalState {
    fn from(r: StateRecord) -> Self {
        Self {
            mood: MoodVector::new(r.valence, r.arousal, r.connection, r.curiosity, r.energy),
            baseline: MoodVector::new(
                r.baseline_valence,
                r.baseline_arousal,
                r.baseline_connection,
                r.baseline_curiosity,
                r.baseline_energy,
            ),
            recent_emotions: r.recent_emotions,
            last_updated: r.last_updated,
        }
    }
}

impl From<EmotionalState> for StateRecord {
    fn from(s: EmotionalState) -> Self {
        Self {
            valence: s.mood.valence,
            arousal: s.mood.arousal,
            connection: s.mood.connection,
            curiosity: s.mood.curiosity,
            energy: s.mood.energy,
            baseline_valence: s.baseline.valence,
            baseline_arousal: s.baseline.arousal,
            baseline_connection: s.baseline.connection,
            baseline_curiosity: s.baseline.curiosity,
            baseline_energy: s.baseline.energy,
            recent_emotions: s.recent_emotions,
            last_updated: s.last_updated,
        }
    }
}
