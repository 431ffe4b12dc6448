pub mod anthropic;
pub mod cache;
pub mod classifier;
pub mod ollama;
pub mod provider;
pub mod router;
pub mod runtime;

pub use cache::{CacheStats, LruTtlCache};
pub use classifier::classify;
pub use provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError, TaskClass};
pub use router::{ProviderRouter, ProviderSlot};
pub use runtime::AgentRuntime;
