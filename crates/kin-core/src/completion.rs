//! Seam for the external text-interpretation capability.

use std::fmt;

use async_trait::async_trait;

/// The capability call itself failed: transport error, timeout, non-2xx,
/// or a response envelope with no text in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionError(pub String);

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CompletionError {}

/// One prompt in, one free-text completion out. No guarantee the text is
/// valid JSON; that is checked downstream.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
