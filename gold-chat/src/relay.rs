use crate::{
    provider::{ChatProvider, CompletionRequest},
    sanitize::sanitize_chart_context,
};
use gold_core::{ChatConfig, ChatMessage, ChatReply, MonitorError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const SYSTEM_PROMPT: &str = "You are an analytical assistant who explains gold market moves, \
reads candlestick patterns, and answers trading questions clearly and cautiously. \
If you lack data, state that instead of guessing. \
Never give financial advice without clear disclaimers.";

pub const MISSING_MESSAGES: &str = "Request body must include a messages array.";

/// Body of `POST /api/chat`. Every field is kept loose so that shape problems
/// surface as our own errors rather than extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Value>,
    #[serde(default)]
    pub price_snapshot: Option<Value>,
    #[serde(default)]
    pub chart_context: Option<Value>,
}

/// Outbound message list: system prompt, optional snapshot, optional chart
/// context, then the caller's conversation in order.
pub fn build_conversation(request: &ChatRequest) -> Result<Vec<ChatMessage>> {
    let conversation: Vec<ChatMessage> = match &request.messages {
        Some(messages @ Value::Array(_)) => serde_json::from_value(messages.clone())
            .map_err(|_| MonitorError::BadRequest(MISSING_MESSAGES.to_string()))?,
        _ => return Err(MonitorError::BadRequest(MISSING_MESSAGES.to_string())),
    };

    let mut messages = Vec::with_capacity(conversation.len() + 3);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));

    if let Some(snapshot) = request.price_snapshot.as_ref().filter(|s| !is_blank(s)) {
        messages.push(ChatMessage::system(format!(
            "Latest market snapshot: {}",
            serde_json::to_string(snapshot)?
        )));
    }

    if let Some(context) = request.chart_context.as_ref().and_then(sanitize_chart_context) {
        messages.push(ChatMessage::system(format!(
            "Latest displayed candlesticks (ISO time, newest last): {}",
            serde_json::to_string(&context)?
        )));
    }

    messages.extend(conversation);
    Ok(messages)
}

/// `null`, `false`, zero and the empty string carry no snapshot.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Take the first choice's message and the usage block out of a
/// completion response without altering either.
pub fn extract_reply(mut payload: Value) -> Result<ChatReply> {
    let reply = payload
        .pointer_mut("/choices/0/message")
        .map(Value::take)
        .filter(|message| !message.is_null())
        .ok_or_else(|| MonitorError::UpstreamShape("LLM payload missing choices".to_string()))?;

    let usage = payload.get_mut("usage").map(Value::take).unwrap_or(Value::Null);

    Ok(ChatReply { reply, usage })
}

#[derive(Debug, Clone)]
pub struct ChatRelay {
    provider: Arc<dyn ChatProvider>,
    model: String,
    temperature: f64,
}

impl ChatRelay {
    pub fn new(provider: Arc<dyn ChatProvider>, config: &ChatConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    pub async fn relay(&self, request: &ChatRequest) -> Result<ChatReply> {
        let messages = build_conversation(request)?;

        let completion = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
        };

        let payload = self.provider.complete(&completion).await?;
        let reply = extract_reply(payload)?;

        info!(provider = self.provider.name(), model = %self.model, "chat reply relayed");
        Ok(reply)
    }
}
