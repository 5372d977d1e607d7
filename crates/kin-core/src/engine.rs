//! Event-driven mood updates and baseline decay.
//!
//! The engine owns nothing but its effect table. Persistence, scheduling and
//! the existence check for a user's state are the caller's job.

use crate::constants::{DECAY_RATE, HISTORY_LIMIT};
use crate::effects::EffectTable;
use crate::state::{Dimension, EmotionRecord, EmotionalState, MoodVector, clamp_unit};

#[derive(Debug, Clone, Default)]
pub struct EmotionEngine {
    effects: EffectTable,
}

impl EmotionEngine {
    pub fn new(effects: EffectTable) -> Self {
        Self { effects }
    }

    pub fn effects(&self) -> &EffectTable {
        &self.effects
    }

    /// Nudge the mood by the effect of `label`, scaled by `intensity`, and
    /// record the event at the head of the history.
    ///
    /// `intensity` is clamped to [0, 1] (NaN counts as 0) and the clamped
    /// value is what gets recorded. Unknown labels leave the scalars alone
    /// but are still recorded. Returns the new mood.
    pub fn apply_emotion(
        &self,
        state: &mut EmotionalState,
        label: &str,
        intensity: f64,
        trigger: &str,
        now: i64,
    ) -> MoodVector {
        let intensity = clamp_unit(intensity);
        let effect = self.effects.lookup(label);

        for dim in Dimension::ALL {
            let next = state.mood.get(dim) + effect.get(dim) * intensity;
            state.mood.set(dim, dim.clamp(next));
        }

        state.recent_emotions.insert(
            0,
            EmotionRecord {
                label: label.to_string(),
                intensity,
                trigger: trigger.to_string(),
                timestamp: now,
            },
        );
        state.recent_emotions.truncate(HISTORY_LIMIT);
        state.last_updated = now;

        state.mood
    }

    /// Close `DECAY_RATE` of the gap between each scalar and its baseline.
    /// History is untouched.
    pub fn decay(&self, state: &mut EmotionalState, now: i64) -> MoodVector {
        decay(state, now)
    }
}

/// Free-standing decay; it needs no effect table.
pub fn decay(state: &mut EmotionalState, now: i64) -> MoodVector {
    for dim in Dimension::ALL {
        let old = state.mood.get(dim);
        let target = state.baseline.get(dim);
        state.mood.set(dim, dim.clamp(old + (target - old) * DECAY_RATE));
    }
    state.last_updated = now;
    state.mood
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn engine() -> EmotionEngine {
        EmotionEngine::default()
    }

    #[test]
    fn test_joy_on_seed_state() {
        let mut state = EmotionalState::seed(0);
        let mood = engine().apply_emotion(&mut state, "joy", 1.0, "good news", 10);

        assert_abs_diff_eq!(mood.valence, 0.35, epsilon = 1e-9);
        assert_abs_diff_eq!(mood.arousal, 0.4, epsilon = 1e-9);
        assert_abs_diff_eq!(mood.connection, 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(mood.curiosity, 0.6, epsilon = 1e-9);
        assert_eq!(state.recent_emotions.len(), 2);
        assert_eq!(state.recent_emotions[0].label, "joy");
        assert_eq!(state.recent_emotions[0].trigger, "good news");
        assert_eq!(state.recent_emotions[1].label, "curiosity");
        assert_eq!(state.last_updated, 10);
    }

    #[test]
    fn test_intensity_scales_effect() {
        let mut state = EmotionalState::seed(0);
        engine().apply_emotion(&mut state, "joy", 0.5, "", 1);
        assert_abs_diff_eq!(state.mood.valence, 0.275, epsilon = 1e-9);
    }

    #[test]
    fn test_case_insensitive_label() {
        let mut a = EmotionalState::seed(0);
        let mut b = EmotionalState::seed(0);
        engine().apply_emotion(&mut a, "JOY", 1.0, "", 1);
        engine().apply_emotion(&mut b, "joy", 1.0, "", 1);
        assert_eq!(a.mood, b.mood);
        // label is stored verbatim
        assert_eq!(a.recent_emotions[0].label, "JOY");
    }

    #[test]
    fn test_unknown_label_records_history_only() {
        let mut state = EmotionalState::seed(0);
        let before = state.mood;
        let mood = engine().apply_emotion(&mut state, "ennui-ish", 1.0, "rainy day", 5);
        assert_eq!(mood, before);
        assert_eq!(state.recent_emotions.len(), 2);
        assert_eq!(state.recent_emotions[0].label, "ennui-ish");
        assert_eq!(state.last_updated, 5);
    }

    #[test]
    fn test_clamps_at_upper_bound() {
        let mut state = EmotionalState::seed(0);
        for i in 0..20 {
            engine().apply_emotion(&mut state, "excitement", 1.0, "", i);
        }
        assert_eq!(state.mood.arousal, 1.0);
        assert!(state.mood.is_within_bounds());
    }

    #[test]
    fn test_clamps_valence_at_lower_bound() {
        let mut state = EmotionalState::seed(0);
        for i in 0..20 {
            engine().apply_emotion(&mut state, "sadness", 1.0, "", i);
        }
        assert_eq!(state.mood.valence, -1.0);
        assert_eq!(state.mood.energy, 0.0);
    }

    #[test]
    fn test_out_of_range_intensity_is_clamped() {
        let mut big = EmotionalState::seed(0);
        let mut one = EmotionalState::seed(0);
        engine().apply_emotion(&mut big, "joy", 7.0, "", 1);
        engine().apply_emotion(&mut one, "joy", 1.0, "", 1);
        assert_eq!(big.mood, one.mood);
        assert_eq!(big.recent_emotions[0].intensity, 1.0);

        let mut neg = EmotionalState::seed(0);
        let before = neg.mood;
        engine().apply_emotion(&mut neg, "joy", -1.0, "", 1);
        assert_eq!(neg.mood, before);
        assert_eq!(neg.recent_emotions[0].intensity, 0.0);

        let mut nan = EmotionalState::seed(0);
        engine().apply_emotion(&mut nan, "joy", f64::NAN, "", 1);
        assert_eq!(nan.mood, before);
    }

    #[test]
    fn test_history_capped_newest_first() {
        let mut state = EmotionalState::seed(0);
        for i in 0..25 {
            engine().apply_emotion(&mut state, &format!("e{i}"), 0.5, "", i);
        }
        assert_eq!(state.recent_emotions.len(), HISTORY_LIMIT);
        let labels: Vec<_> = state
            .recent_emotions
            .iter()
            .map(|r| r.label.as_str())
            .collect();
        assert_eq!(
            labels,
            ["e24", "e23", "e22", "e21", "e20", "e19", "e18", "e17", "e16", "e15"]
        );
    }

    #[test]
    fn test_history_order_is_insertion_not_timestamp() {
        let mut state = EmotionalState::seed(0);
        engine().apply_emotion(&mut state, "late", 0.5, "", 500);
        engine().apply_emotion(&mut state, "early", 0.5, "", 100);
        assert_eq!(state.recent_emotions[0].label, "early");
        assert_eq!(state.recent_emotions[1].label, "late");
    }

    #[test]
    fn test_decay_closes_ten_percent() {
        let mut state = EmotionalState::seed(0);
        let mood = decay(&mut state, 99);
        // valence 0.2 → baseline 0.1
        assert_abs_diff_eq!(mood.valence, 0.19, epsilon = 1e-9);
        // connection 0.1 → baseline 0.3
        assert_abs_diff_eq!(mood.connection, 0.12, epsilon = 1e-9);
        // curiosity 0.6 → baseline 0.5
        assert_abs_diff_eq!(mood.curiosity, 0.59, epsilon = 1e-9);
        // arousal and energy already at baseline
        assert_abs_diff_eq!(mood.arousal, 0.3, epsilon = 1e-9);
        assert_abs_diff_eq!(mood.energy, 0.5, epsilon = 1e-9);
        assert_eq!(state.last_updated, 99);
        assert_eq!(state.recent_emotions.len(), 1);
    }

    #[test]
    fn test_decay_at_baseline_is_fixed_point() {
        let mut state = EmotionalState::seed(0);
        state.mood = state.baseline;
        let before = state.mood;
        for i in 0..5 {
            decay(&mut state, i);
        }
        assert_eq!(state.mood, before);
    }

    #[test]
    fn test_decay_converges() {
        let mut state = EmotionalState::seed(0);
        for i in 0..200 {
            engine().decay(&mut state, i);
        }
        for dim in Dimension::ALL {
            assert_abs_diff_eq!(state.mood.get(dim), state.baseline.get(dim), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_custom_table_injected() {
        let table = EffectTable::empty();
        let engine = EmotionEngine::new(table);
        let mut state = EmotionalState::seed(0);
        let before = state.mood;
        engine.apply_emotion(&mut state, "joy", 1.0, "", 1);
        assert_eq!(state.mood, before);
    }
}
