use std::sync::Arc;

use kin_core::{
    EmotionEngine, EmotionalState, ParseError, TextCompletion, describe_mood, now_millis,
    parse_utterance, prompt_context, reference_now,
};
use kin_store::{Store, StoreError};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;

pub const DEFAULT_USER: &str = "default";
const DEFAULT_RECENT: usize = 3;

#[derive(Clone)]
pub struct KinServer {
    state: Arc<Mutex<ServerState>>,
    completion: Arc<dyn TextCompletion>,
    confirm_below: f64,
    tool_router: ToolRouter<Self>,
}

struct ServerState {
    store: Store,
    engine: EmotionEngine,
}

impl KinServer {
    pub fn new(
        store: Store,
        engine: EmotionEngine,
        completion: Arc<dyn TextCompletion>,
        confirm_below: f64,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState { store, engine })),
            completion,
            confirm_below,
            tool_router: Self::tool_router(),
        }
    }

    /// Explicitly flush WAL on the store. Runs on shutdown even when the
    /// runtime is tearing down before `Store::drop`.
    pub async fn checkpoint_wal(&self) {
        let state = self.state.lock().await;
        if let Err(e) = state.store.checkpoint_truncate() {
            tracing::warn!("WAL checkpoint failed: {e}");
        }
        tracing::info!("WAL checkpoint complete");
    }

    fn mood_json(state: &EmotionalState, recent: usize) -> serde_json::Value {
        serde_json::json!({
            "mood": state.mood,
            "description": describe_mood(state),
            "context": prompt_context(state, recent),
        })
    }
}

fn user_or_default(user: Option<String>) -> Result<String, McpError> {
    match user {
        None => Ok(DEFAULT_USER.to_string()),
        Some(u) if u.trim().is_empty() => {
            Err(McpError::invalid_params("user must not be empty", None))
        }
        Some(u) => Ok(u.trim().to_string()),
    }
}

fn store_error(e: StoreError) -> McpError {
    match e {
        StoreError::NotFound(user) => {
            McpError::invalid_params(format!("no emotional state for user '{user}'"), None)
        }
        other => McpError::internal_error(other.to_string(), None),
    }
}

fn json_result(value: &serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )])
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct FeelRequest {
    /// Emotion label, e.g. "joy", "curiosity", "frustration"
    label: String,
    /// Strength of the emotion in [0, 1]; out-of-range values are clamped
    intensity: f64,
    /// Short description of what caused the emotion
    trigger: Option<String>,
    /// User whose companion state to update (defaults to "default")
    user: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DecayRequest {
    /// User to decay; omit to decay every stored user
    user: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UserRequest {
    /// User whose companion state to read (defaults to "default")
    user: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct MoodRequest {
    /// User whose companion state to read (defaults to "default")
    user: Option<String>,
    /// How many recent emotions to include in the prompt context (default 3)
    recent: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ParseTaskRequest {
    /// The user's free-form utterance
    text: String,
    /// Pin "today" to this YYYY-MM-DD date instead of the local date
    today: Option<String>,
}

#[tool_router]
impl KinServer {
    #[tool(
        description = "Record an emotion the companion feels. Nudges the mood scalars by the label's effect scaled by intensity and records the event in recent history. Creates the user's state on first use. Returns the new mood and its description."
    )]
    async fn kin_feel(
        &self,
        Parameters(req): Parameters<FeelRequest>,
    ) -> Result<CallToolResult, McpError> {
        let user = user_or_default(req.user)?;
        if req.label.trim().is_empty() {
            return Err(McpError::invalid_params("label must not be empty", None));
        }

        let state = self.state.lock().await;
        let now = now_millis();
        state.store.create_state(&user, now).map_err(store_error)?;
        let trigger = req.trigger.unwrap_or_default();
        let engine = &state.engine;
        let updated = state
            .store
            .update_state(&user, |s| {
                engine.apply_emotion(s, &req.label, req.intensity, &trigger, now);
                s.clone()
            })
            .map_err(store_error)?;

        tracing::debug!(user = %user, label = %req.label, "applied emotion");
        Ok(json_result(&Self::mood_json(&updated, DEFAULT_RECENT)))
    }

    #[tool(
        description = "Pull the companion's mood one step back toward its baseline. Call periodically, e.g. between conversations. Without a user, decays every stored user."
    )]
    async fn kin_decay(
        &self,
        Parameters(req): Parameters<DecayRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let now = now_millis();

        let json = match req.user {
            None => {
                let touched = state
                    .store
                    .decay_all(&state.engine, now)
                    .map_err(store_error)?;
                serde_json::json!({ "decayed": touched })
            }
            Some(user) => {
                let user = user_or_default(Some(user))?;
                let engine = &state.engine;
                let mood = state
                    .store
                    .update_state(&user, |s| engine.decay(s, now))
                    .map_err(store_error)?;
                serde_json::json!({ "decayed": 1, "mood": mood })
            }
        };
        Ok(json_result(&json))
    }

    #[tool(
        description = "Describe the companion's current mood. Returns the raw scalars, banded description, and a ready-to-use prompt context block for the persona's system prompt."
    )]
    async fn kin_mood(
        &self,
        Parameters(req): Parameters<MoodRequest>,
    ) -> Result<CallToolResult, McpError> {
        let user = user_or_default(req.user)?;
        let state = self.state.lock().await;
        let current = state.store.require_state(&user).map_err(store_error)?;
        Ok(json_result(&Self::mood_json(
            &current,
            req.recent.unwrap_or(DEFAULT_RECENT),
        )))
    }

    #[tool(description = "Return the full stored emotional state for a user as JSON.")]
    async fn kin_state(
        &self,
        Parameters(req): Parameters<UserRequest>,
    ) -> Result<CallToolResult, McpError> {
        let user = user_or_default(req.user)?;
        let state = self.state.lock().await;
        let current = state.store.require_state(&user).map_err(store_error)?;
        let json = serde_json::to_value(&current)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(json_result(&json))
    }

    #[tool(
        description = "Turn a free-form utterance (\"remind me to call mom tomorrow at 5 @phone\") into a structured task with type, title, due date/time, priority, context, project, estimate and recurrence. needsConfirmation is true when the parse is uncertain and the user should be asked to confirm."
    )]
    async fn kin_parse_task(
        &self,
        Parameters(req): Parameters<ParseTaskRequest>,
    ) -> Result<CallToolResult, McpError> {
        let now = reference_now(req.today.as_deref())
            .map_err(|e| McpError::invalid_params(format!("today: {e}"), None))?;

        let task = parse_utterance(self.completion.as_ref(), &req.text, now)
            .await
            .map_err(|e| match e {
                ParseError::InvalidInput => McpError::invalid_params(e.to_string(), None),
                other => McpError::internal_error(other.to_string(), None),
            })?;

        let needs_confirmation = task.needs_confirmation(self.confirm_below);
        let mut json = serde_json::to_value(&task)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        json["needsConfirmation"] = serde_json::Value::Bool(needs_confirmation);
        Ok(json_result(&json))
    }
}

#[tool_handler]
impl ServerHandler for KinServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "You are a companion with a persistent emotional state and a task parser.\n\n\
                 MOOD:\n\
                 - Call kin_mood at the start of a conversation and use the returned context \
                   block to color your tone. Never recite the numbers to the user.\n\
                 - When something in the conversation genuinely moves you, call kin_feel with a \
                   label (joy, gratitude, curiosity, frustration, ...), an intensity in [0, 1] and \
                   a short trigger.\n\
                 - Call kin_decay between conversations so feelings settle back toward baseline.\n\n\
                 TASKS:\n\
                 - When the user asks you to remember, remind or plan something, call \
                   kin_parse_task with their exact words. If needsConfirmation is true, read the \
                   result back and ask before acting on it."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
