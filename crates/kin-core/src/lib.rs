//! Companion mood engine and task utterance normalization.
//!
//! Two independent pieces live here:
//!
//! - an emotional state model: five bounded mood scalars nudged by emotion
//!   events and pulled back toward a baseline by decay, and
//! - a task parser boundary: prompt construction for an external text
//!   completion capability plus strict normalization of whatever it returns.
//!
//! Zero I/O: persistence and transport belong to the callers.

pub mod completion;
pub mod constants;
pub mod effects;
pub mod engine;
pub mod mood;
pub mod parse;
pub mod prompt;
pub mod state;
pub mod task;
pub mod time;

pub use completion::{CompletionError, TextCompletion};
pub use constants::{DECAY_RATE, DEFAULT_CONFIDENCE, HISTORY_LIMIT};
pub use effects::{EffectTable, EffectVector};
pub use engine::{EmotionEngine, decay};
pub use mood::{MoodDescription, describe_mood, prompt_context};
pub use parse::{ParseError, normalize_response, parse_utterance, strip_code_fence};
pub use prompt::build_parse_prompt;
pub use state::{Dimension, EmotionRecord, EmotionalState, MoodVector};
pub use task::{ParsedTask, Priority, Recurrence, RecurrencePattern, TaskContext, TaskType};
pub use time::{DateContext, local_now, now_millis, reference_now};
