//! Qualitative mood description.
//!
//! Each of four axes is cut into three bands with strict inequalities:
//! a value sitting exactly on a band edge belongs to the middle band.

use std::fmt::Write as _;

use serde::Serialize;

use crate::constants::{HIGH_BAND, LOW_BAND, VALENCE_BAND};
use crate::state::EmotionalState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValenceBand {
    Positive,
    Neutral,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArousalBand {
    Energetic,
    Balanced,
    Calm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionBand {
    DeeplyConnected,
    Comfortable,
    GettingToKnowYou,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CuriosityBand {
    Fascinated,
    Interested,
    Settled,
}

impl ValenceBand {
    pub fn classify(v: f64) -> Self {
        if v > VALENCE_BAND {
            Self::Positive
        } else if v < -VALENCE_BAND {
            Self::Down
        } else {
            Self::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Down => "down",
        }
    }
}

impl ArousalBand {
    pub fn classify(v: f64) -> Self {
        if v > HIGH_BAND {
            Self::Energetic
        } else if v < LOW_BAND {
            Self::Calm
        } else {
            Self::Balanced
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Energetic => "energetic",
            Self::Balanced => "balanced",
            Self::Calm => "calm",
        }
    }
}

impl ConnectionBand {
    pub fn classify(v: f64) -> Self {
        if v > HIGH_BAND {
            Self::DeeplyConnected
        } else if v < LOW_BAND {
            Self::GettingToKnowYou
        } else {
            Self::Comfortable
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DeeplyConnected => "deeply connected",
            Self::Comfortable => "comfortable",
            Self::GettingToKnowYou => "getting to know you",
        }
    }
}

impl CuriosityBand {
    pub fn classify(v: f64) -> Self {
        if v > HIGH_BAND {
            Self::Fascinated
        } else if v < LOW_BAND {
            Self::Settled
        } else {
            Self::Interested
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fascinated => "fascinated",
            Self::Interested => "interested",
            Self::Settled => "settled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodDescription {
    pub valence: ValenceBand,
    pub arousal: ArousalBand,
    pub connection: ConnectionBand,
    pub curiosity: CuriosityBand,
    pub summary: String,
}

pub fn describe_mood(state: &EmotionalState) -> MoodDescription {
    let valence = ValenceBand::classify(state.mood.valence);
    let arousal = ArousalBand::classify(state.mood.arousal);
    let connection = ConnectionBand::classify(state.mood.connection);
    let curiosity = CuriosityBand::classify(state.mood.curiosity);

    let summary = format!(
        "Feeling {} and {}, {}, and {} in the conversation.",
        valence.label(),
        arousal.label(),
        connection_phrase(connection),
        curiosity.label(),
    );

    MoodDescription {
        valence,
        arousal,
        connection,
        curiosity,
        summary,
    }
}

fn connection_phrase(band: ConnectionBand) -> &'static str {
    match band {
        ConnectionBand::DeeplyConnected => "deeply connected to you",
        ConnectionBand::Comfortable => "comfortable with you",
        ConnectionBand::GettingToKnowYou => "still getting to know you",
    }
}

/// Block of text for the companion's system prompt: the summary, the raw
/// scalars, and up to `max_recent` of the latest emotion events.
pub fn prompt_context(state: &EmotionalState, max_recent: usize) -> String {
    let description = describe_mood(state);
    let m = &state.mood;

    let mut out = String::new();
    let _ = writeln!(out, "CURRENT MOOD: {}", description.summary);
    let _ = writeln!(
        out,
        "valence={:.2} arousal={:.2} connection={:.2} curiosity={:.2} energy={:.2}",
        m.valence, m.arousal, m.connection, m.curiosity, m.energy
    );

    let recent: Vec<_> = state.recent_emotions.iter().take(max_recent).collect();
    if !recent.is_empty() {
        let _ = writeln!(out, "RECENT FEELINGS:");
        for record in recent {
            if record.trigger.is_empty() {
                let _ = writeln!(out, "- {} ({:.1})", record.label, record.intensity);
            } else {
                let _ = writeln!(
                    out,
                    "- {} ({:.1}) after {}",
                    record.label, record.intensity, record.trigger
                );
            }
        }
    }

    out
}
