//! Emotion label → effect vector lookup.
//!
//! The table is an immutable value handed to the engine. The built-in set
//! covers the labels the companion persona emits; deployments can layer
//! their own entries on top with [`EffectTable::with_overrides`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::Dimension;

/// Signed per-axis deltas applied at full intensity. Axes left out of a
/// configured entry default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectVector {
    pub valence: f64,
    pub arousal: f64,
    pub connection: f64,
    pub curiosity: f64,
    pub energy: f64,
}

impl EffectVector {
    pub const ZERO: EffectVector = EffectVector {
        valence: 0.0,
        arousal: 0.0,
        connection: 0.0,
        curiosity: 0.0,
        energy: 0.0,
    };

    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Valence => self.valence,
            Dimension::Arousal => self.arousal,
            Dimension::Connection => self.connection,
            Dimension::Curiosity => self.curiosity,
            Dimension::Energy => self.energy,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

const fn fx(valence: f64, arousal: f64, connection: f64, curiosity: f64, energy: f64) -> EffectVector {
    EffectVector {
        valence,
        arousal,
        connection,
        curiosity,
        energy,
    }
}

//                                          valence arousal connect curious energy
const BUILTIN: &[(&str, EffectVector)] = &[
    ("joy", fx(0.15, 0.10, 0.0, 0.0, 0.05)),
    ("happiness", fx(0.12, 0.05, 0.0, 0.0, 0.05)),
    ("excitement", fx(0.10, 0.20, 0.0, 0.05, 0.10)),
    ("gratitude", fx(0.12, 0.0, 0.10, 0.0, 0.0)),
    ("love", fx(0.15, 0.05, 0.15, 0.0, 0.0)),
    ("affection", fx(0.10, 0.0, 0.12, 0.0, 0.0)),
    ("pride", fx(0.10, 0.05, 0.0, 0.0, 0.05)),
    ("amusement", fx(0.10, 0.05, 0.05, 0.05, 0.0)),
    ("contentment", fx(0.08, -0.05, 0.0, 0.0, 0.0)),
    ("calm", fx(0.05, -0.15, 0.0, 0.0, 0.0)),
    ("relief", fx(0.10, -0.10, 0.0, 0.0, 0.0)),
    ("hope", fx(0.08, 0.0, 0.0, 0.05, 0.05)),
    ("curiosity", fx(0.0, 0.05, 0.0, 0.15, 0.0)),
    ("interest", fx(0.03, 0.0, 0.0, 0.10, 0.0)),
    ("fascination", fx(0.05, 0.10, 0.0, 0.20, 0.0)),
    ("surprise", fx(0.0, 0.15, 0.0, 0.10, 0.0)),
    ("confusion", fx(-0.05, 0.05, 0.0, 0.05, 0.0)),
    ("boredom", fx(-0.05, -0.10, 0.0, -0.15, -0.05)),
    ("sadness", fx(-0.15, -0.05, 0.0, 0.0, -0.10)),
    ("loneliness", fx(-0.10, 0.0, -0.15, 0.0, -0.05)),
    ("disappointment", fx(-0.12, 0.0, 0.0, 0.0, -0.05)),
    ("frustration", fx(-0.10, 0.10, 0.0, 0.0, -0.05)),
    ("anger", fx(-0.15, 0.20, -0.05, 0.0, 0.0)),
    ("fear", fx(-0.15, 0.15, 0.0, 0.0, 0.0)),
    ("anxiety", fx(-0.10, 0.15, 0.0, 0.0, -0.05)),
    ("worry", fx(-0.08, 0.10, 0.0, 0.0, 0.0)),
    ("embarrassment", fx(-0.08, 0.10, -0.05, 0.0, 0.0)),
    ("guilt", fx(-0.10, 0.0, -0.05, 0.0, 0.0)),
    ("connection", fx(0.05, 0.0, 0.15, 0.0, 0.0)),
    ("empathy", fx(0.03, 0.0, 0.10, 0.0, 0.0)),
    ("fatigue", fx(0.0, -0.10, 0.0, -0.05, -0.15)),
    ("energized", fx(0.05, 0.10, 0.0, 0.0, 0.15)),
    ("playfulness", fx(0.10, 0.10, 0.05, 0.05, 0.05)),
];

#[derive(Debug, Clone, PartialEq)]
pub struct EffectTable {
    entries: HashMap<String, EffectVector>,
}

impl EffectTable {
    /// Table with no entries: every label is a zero-effect event.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|(label, effect)| (label.to_string(), *effect))
                .collect(),
        }
    }

    /// New table with `overrides` layered on top. Keys are matched
    /// case-insensitively, so `Joy` replaces the built-in `joy`.
    pub fn with_overrides<I, K>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, EffectVector)>,
        K: AsRef<str>,
    {
        let mut entries = self.entries.clone();
        for (label, effect) in overrides {
            entries.insert(normalize_label(label.as_ref()), effect);
        }
        Self { entries }
    }

    /// Case-insensitive lookup. Unknown labels map to the zero vector.
    pub fn lookup(&self, label: &str) -> EffectVector {
        self.entries
            .get(&normalize_label(label))
            .copied()
            .unwrap_or(EffectVector::ZERO)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Known labels, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }
}

impl Default for EffectTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_size() {
        let table = EffectTable::builtin();
        assert!(table.len() >= 30, "expected ~30 labels, got {}", table.len());
    }

    #[test]
    fn test_joy_effect() {
        let joy = EffectTable::builtin().lookup("joy");
        assert_eq!(joy.valence, 0.15);
        assert_eq!(joy.arousal, 0.10);
        assert_eq!(joy.connection, 0.0);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = EffectTable::builtin();
        assert_eq!(table.lookup("JOY"), table.lookup("joy"));
        assert_eq!(table.lookup("  Sadness "), table.lookup("sadness"));
    }

    #[test]
    fn test_unknown_label_is_zero() {
        let table = EffectTable::builtin();
        assert!(table.lookup("schadenfreude").is_zero());
        assert!(!table.contains("schadenfreude"));
    }

    #[test]
    fn test_deltas_are_small() {
        let table = EffectTable::builtin();
        for label in table.labels() {
            let effect = table.lookup(label);
            for dim in Dimension::ALL {
                let d = effect.get(dim);
                assert!((-0.2..=0.2).contains(&d), "{label}.{} = {d}", dim.name());
            }
        }
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let base = EffectTable::builtin();
        let custom = base.with_overrides([
            (
                "Joy",
                EffectVector {
                    valence: 0.05,
                    ..EffectVector::ZERO
                },
            ),
            (
                "wonder",
                EffectVector {
                    curiosity: 0.2,
                    ..EffectVector::ZERO
                },
            ),
        ]);

        assert_eq!(custom.lookup("joy").valence, 0.05);
        assert_eq!(custom.lookup("joy").arousal, 0.0);
        assert_eq!(custom.lookup("wonder").curiosity, 0.2);
        assert_eq!(custom.len(), base.len() + 1);
        // the original table is untouched
        assert_eq!(base.lookup("joy").valence, 0.15);
    }

    #[test]
    fn test_partial_effect_deserializes_with_zero_defaults() {
        let effect: EffectVector = serde_json::from_str(r#"{"energy": -0.1}"#).unwrap();
        assert_eq!(effect.energy, -0.1);
        assert_eq!(effect.valence, 0.0);
    }
}
