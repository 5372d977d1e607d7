//! Utterance → `ParsedTask`.
//!
//! The language understanding is delegated to a [`TextCompletion`]; this
//! module builds the prompt, decodes the reply, and normalizes every field
//! so nothing the capability invents leaks through unchecked.

use std::fmt;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Map, Value};

use crate::completion::TextCompletion;
use crate::constants::DEFAULT_CONFIDENCE;
use crate::prompt::build_parse_prompt;
use crate::task::{ParsedTask, Priority, Recurrence, RecurrencePattern, TaskContext, TaskType, WireEnum};
use crate::time::DateContext;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").unwrap());
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Empty or whitespace-only input. The capability is never called.
    InvalidInput,
    /// The capability call itself failed or timed out.
    UpstreamUnavailable(String),
    /// The capability answered, but not with a decodable JSON object.
    ParseFailure { raw: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidInput => write!(f, "invalid input: text is empty"),
            ParseError::UpstreamUnavailable(msg) => write!(f, "upstream unavailable: {msg}"),
            ParseError::ParseFailure { raw } => {
                write!(f, "could not decode capability response: {raw}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one utterance. Exactly one capability call is made for non-empty
/// input; nothing is retried.
pub async fn parse_utterance(
    capability: &dyn TextCompletion,
    input: &str,
    now: NaiveDateTime,
) -> Result<ParsedTask, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::InvalidInput);
    }

    let prompt = build_parse_prompt(&DateContext::build(now), input);
    let raw = capability
        .complete(&prompt)
        .await
        .map_err(|e| ParseError::UpstreamUnavailable(e.to_string()))?;

    normalize_response(&raw, input)
}

/// Remove one optional surrounding ```` ``` ```` / ```` ```json ```` fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match CODE_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => trimmed,
    }
}

/// Decode a raw capability reply and normalize it into a `ParsedTask`.
pub fn normalize_response(raw: &str, input: &str) -> Result<ParsedTask, ParseError> {
    let failure = || ParseError::ParseFailure {
        raw: raw.to_string(),
    };

    let value: Value = serde_json::from_str(strip_code_fence(raw)).map_err(|_| failure())?;
    let obj = value.as_object().ok_or_else(failure)?;
    Ok(normalize_object(obj, input))
}

fn normalize_object(obj: &Map<String, Value>, input: &str) -> ParsedTask {
    let is_recurring = obj.get("isRecurring").is_some_and(truthy);
    let recurrence = if is_recurring {
        obj.get("recurrence").and_then(normalize_recurrence)
    } else {
        None
    };

    ParsedTask {
        kind: wire_field::<TaskType>(obj, "type").unwrap_or_default(),
        title: non_empty_str(obj, "title").unwrap_or_else(|| input.to_string()),
        due_date: non_empty_str(obj, "dueDate").filter(|d| {
            // chrono alone accepts signs and short fields
            let ok = ISO_DATE.is_match(d) && NaiveDate::parse_from_str(d, "%Y-%m-%d").is_ok();
            if !ok {
                tracing::debug!(due_date = %d, "discarding malformed dueDate");
            }
            ok
        }),
        due_time: non_empty_str(obj, "dueTime").filter(|t| {
            let ok = CLOCK_TIME.is_match(t);
            if !ok {
                tracing::debug!(due_time = %t, "discarding malformed dueTime");
            }
            ok
        }),
        priority: wire_field::<Priority>(obj, "priority"),
        context: wire_field::<TaskContext>(obj, "context"),
        project: non_empty_str(obj, "project"),
        estimated_minutes: obj
            .get("estimatedMinutes")
            .and_then(Value::as_f64)
            .filter(|m| m.is_finite() && *m >= 0.0),
        is_recurring,
        recurrence,
        confidence: obj
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE),
        original_input: input.to_string(),
    }
}

fn wire_field<T: WireEnum>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    let raw = obj.get(key)?.as_str()?;
    let parsed = T::from_wire(raw);
    if parsed.is_none() {
        tracing::debug!(field = key, value = raw, "discarding unknown enum value");
    }
    parsed
}

fn non_empty_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn normalize_recurrence(value: &Value) -> Option<Recurrence> {
    let obj = value.as_object()?;
    let pattern = obj
        .get("pattern")
        .and_then(Value::as_str)
        .and_then(RecurrencePattern::from_wire)?;

    let days_of_week = obj.get("daysOfWeek").and_then(Value::as_array).map(|days| {
        days.iter()
            .filter_map(Value::as_u64)
            .filter(|d| *d <= 6)
            .map(|d| d as u8)
            .collect::<Vec<_>>()
    });
    let days_of_week = days_of_week.filter(|d| !d.is_empty());

    let day_of_month = obj
        .get("dayOfMonth")
        .and_then(Value::as_u64)
        .filter(|d| (1..=31).contains(d))
        .map(|d| d as u8);

    Some(Recurrence {
        pattern,
        days_of_week,
        day_of_month,
    })
}

/// JSON truthiness: `false`, `null`, `0`, and `""` are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
