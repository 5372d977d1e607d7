use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{env, fs};

use kin_core::{EffectTable, EffectVector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = "config.toml";

/// Default base directory for all kin storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".kin")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Contents of `config.toml`. Every section is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub parser: ParserConfig,
    /// `[effects.<label>]` tables layered over the built-in effect table.
    pub effects: BTreeMap<String, EffectVector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
            temperature: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Parses with confidence below this are flagged for confirmation.
    pub confirm_below: f64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { confirm_below: 0.6 }
    }
}

impl Config {
    /// Read `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                tracing::debug!("loaded config from {}", path.display());
                Self::from_toml_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(StoreError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Load `config.toml` from `base_dir` and apply process environment
    /// overrides.
    pub fn load_from_dir(base_dir: &Path) -> Result<Self> {
        let mut config = Self::load(&base_dir.join(CONFIG_FILE))?;
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// `KIN_LLM_ENDPOINT` and `KIN_LLM_MODEL` replace the file values when
    /// set and non-empty.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = get("KIN_LLM_ENDPOINT").filter(|v| !v.trim().is_empty()) {
            self.llm.endpoint = endpoint;
        }
        if let Some(model) = get("KIN_LLM_MODEL").filter(|v| !v.trim().is_empty()) {
            self.llm.model = model;
        }
    }

    /// Built-in effects with the configured entries on top.
    pub fn effect_table(&self) -> EffectTable {
        EffectTable::builtin().with_overrides(self.effects.iter().map(|(k, v)| (k, *v)))
    }

    fn validate(&self) -> Result<()> {
        if self.llm.endpoint.trim().is_empty() {
            return Err(StoreError::Config("llm.endpoint must not be empty".into()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(StoreError::Config("llm.timeout_secs must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.parser.confirm_below) {
            return Err(StoreError::Config(
                "parser.confirm_below must be within [0, 1]".into(),
            ));
        }
        for (label, effect) in &self.effects {
            let finite = [
                effect.valence,
                effect.arousal,
                effect.connection,
                effect.curiosity,
                effect.energy,
            ]
            .iter()
            .all(|v| v.is_finite());
            if !finite {
                return Err(StoreError::Config(format!(
                    "effects.{label} has a non-finite value"
                )));
            }
        }
        Ok(())
    }
}
