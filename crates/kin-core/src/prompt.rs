use crate::time::DateContext;

/// Build the single instruction payload sent to the capability: date
/// grounding, interpretation rules, output schema, then the literal input.
pub fn build_parse_prompt(ctx: &DateContext, input: &str) -> String {
    format!(
        r##"You are a task parser for a personal assistant. Extract structured data from the user's input.

Today is {day_of_week}, {month} {day_num}, {year} ({today}). The current time is {time}.

Rules:
- "tomorrow" means the calendar day after {today}.
- "next week" means {today} plus 7 days.
- A bare weekday name ("monday", "on friday") means the next occurrence of that weekday, or today if today is that weekday.
- "@home", "@work", "@errands", "@phone", "@computer", "@anywhere" set "context".
- "#name" or "for project name" sets "project".
- "high priority", "urgent", "asap" set "priority" to "high". "low priority" sets "low".
- "every day" or "daily" is recurrence pattern "daily"; "every weekday" is "weekdays";
  "every <weekday>" is "weekly" with that day in "daysOfWeek" (0 = Sunday ... 6 = Saturday);
  "every other week" is "biweekly"; "every month on the Nth" is "monthly" with "dayOfMonth" N.
- Duration hints set "estimatedMinutes": "quick" = 15, "30 min" = 30, "1 hour" = 60.
- Only set "dueTime" when a time is stated. Never invent one.
- "type" is "reminder" for "remind me ...", "note" for things to remember, "idea" for ideas, otherwise "task".
- The title is the action itself, without the date, time, context, project or priority words.

Respond with ONLY a JSON object, no prose, using these fields:
{{
  "type": "task" | "note" | "reminder" | "idea",
  "title": string,
  "dueDate": "YYYY-MM-DD" | null,
  "dueTime": "HH:MM" | null,
  "priority": "high" | "medium" | "low" | null,
  "context": "home" | "work" | "errands" | "phone" | "computer" | "anywhere" | null,
  "project": string | null,
  "estimatedMinutes": number | null,
  "isRecurring": boolean,
  "recurrence": {{ "pattern": "daily" | "weekdays" | "weekly" | "biweekly" | "monthly", "daysOfWeek": [number], "dayOfMonth": number }} | null,
  "confidence": number between 0 and 1
}}

Input: "{input}""##,
        day_of_week = ctx.day_of_week,
        month = ctx.month,
        day_num = ctx.day_num,
        year = ctx.year,
        today = ctx.today,
        time = ctx.time,
        input = input,
    )
}
