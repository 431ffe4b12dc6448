use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Query classification — spec.md §4.4 step 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskClass {
    Greeting,
    Simple,
    Planning,
    Coding,
    Social,
    Research,
    Complex,
}

impl std::fmt::Display for TaskClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskClass::Greeting => "greeting",
            TaskClass::Simple => "simple",
            TaskClass::Planning => "planning",
            TaskClass::Coding => "coding",
            TaskClass::Social => "social",
            TaskClass::Research => "research",
            TaskClass::Complex => "complex",
        };
        write!(f, "{s}")
    }
}

/// Request to an LLM provider — spec.md §6's `call(prompt, system?, options)`.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
    pub max_tokens: u32,
}

/// `{text, tokens?, modelInfo}` — spec.md §6.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub tokens: Option<u32>,
    pub model_info: String,
}

/// Common interface for all AI providers — spec.md §6's `Provider` adapter
/// contract. Deliberately narrower than a full chat-completions API: no
/// streaming, tool-calling, or extended-thinking — those are out of scope
/// ("only the adapter contract is specified").
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, task_class: TaskClass) -> bool;

    async fn call(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("transient error: {0}")]
    Transient(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}
