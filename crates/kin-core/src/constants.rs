/// Fraction of the gap to baseline closed by one decay tick.
pub const DECAY_RATE: f64 = 0.1;

/// Maximum number of entries kept in `recent_emotions`.
pub const HISTORY_LIMIT: usize = 10;

/// Confidence assigned to a parsed task when the capability omits one.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Valence above this reads as "positive", below its negation as "down".
pub const VALENCE_BAND: f64 = 0.3;

/// Upper band edge shared by arousal, connection and curiosity.
pub const HIGH_BAND: f64 = 0.6;

/// Lower band edge shared by arousal, connection and curiosity.
pub const LOW_BAND: f64 = 0.3;
