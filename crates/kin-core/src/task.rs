use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Task,
    Note,
    Reminder,
    Idea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskContext {
    Home,
    Work,
    Errands,
    Phone,
    Computer,
    Anywhere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekdays,
    Weekly,
    Biweekly,
    Monthly,
}

/// Exact, case-sensitive match against the wire names. The capability is
/// untrusted, so `"URGENT"` or `"High"` are not accepted.
pub trait WireEnum: Sized + Copy + 'static {
    const VARIANTS: &'static [(&'static str, Self)];

    fn from_wire(s: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, v)| *v)
    }

    fn as_wire(self) -> &'static str
    where
        Self: PartialEq,
    {
        Self::VARIANTS
            .iter()
            .find(|(_, v)| *v == self)
            .map(|(name, _)| *name)
            .unwrap_or("")
    }
}

impl WireEnum for TaskType {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("task", Self::Task),
        ("note", Self::Note),
        ("reminder", Self::Reminder),
        ("idea", Self::Idea),
    ];
}

impl WireEnum for Priority {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("high", Self::High),
        ("medium", Self::Medium),
        ("low", Self::Low),
    ];
}

impl WireEnum for TaskContext {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("home", Self::Home),
        ("work", Self::Work),
        ("errands", Self::Errands),
        ("phone", Self::Phone),
        ("computer", Self::Computer),
        ("anywhere", Self::Anywhere),
    ];
}

impl WireEnum for RecurrencePattern {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("daily", Self::Daily),
        ("weekdays", Self::Weekdays),
        ("weekly", Self::Weekly),
        ("biweekly", Self::Biweekly),
        ("monthly", Self::Monthly),
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub pattern: RecurrencePattern,
    /// 0 = Sunday … 6 = Saturday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    /// 1–31.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
}

/// A task, note, reminder or idea extracted from one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTask {
    #[serde(rename = "type")]
    pub kind: TaskType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<TaskContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<f64>,
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    pub confidence: f64,
    /// The caller's text, verbatim.
    pub original_input: String,
}

impl ParsedTask {
    /// Whether a caller should ask the user to confirm before acting.
    /// Purely advisory; nothing in the parser enforces it.
    pub fn needs_confirmation(&self, threshold: f64) -> bool {
        self.confidence < threshold
    }
}
