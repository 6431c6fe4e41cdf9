//! Language-model relay for the dashboard chat panel.

pub mod provider;
pub mod relay;
pub mod sanitize;

pub use provider::{ChatProvider, CompletionRequest, OpenAiProvider};
pub use relay::{ChatRelay, ChatRequest};
pub use sanitize::{sanitize_chart_context, MAX_CONTEXT_CANDLES};
