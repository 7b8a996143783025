//! Core types for the model gateway.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

// =============================================================================
// ATTRIBUTION
// =============================================================================

/// Attribution for usage tracking and debugging.
///
/// Every request through the gateway carries attribution so usage records can
/// be tied back to the benchmark run and the code path that issued them.
#[derive(Debug, Clone, Default)]
pub struct Attribution {
    /// Benchmark run this request is part of (if known).
    pub run_id: Option<Uuid>,
    /// Which code path made this call, e.g. "scorer::elicited".
    pub caller: &'static str,
}

impl Attribution {
    pub fn new(caller: &'static str) -> Self {
        Self {
            caller,
            ..Default::default()
        }
    }

    pub fn with_run(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }
}

// =============================================================================
// CHAT TYPES
// =============================================================================

/// Chat message role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Model specification for a local or remote provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRef {
    /// Ollama model tag, e.g. "llama3.2" or "bge-m3".
    Ollama(String),
}

impl ModelRef {
    pub fn ollama(model_id: impl Into<String>) -> Self {
        ModelRef::Ollama(model_id.into())
    }

    pub fn model_id(&self) -> &str {
        match self {
            ModelRef::Ollama(id) => id,
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            ModelRef::Ollama(_) => "ollama",
        }
    }
}

/// Request for chat completion.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model to use.
    pub model: ModelRef,
    /// Messages in the conversation.
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Attribution for usage tracking.
    pub attribution: Attribution,
}

impl ChatRequest {
    pub fn new(model: ModelRef, messages: Vec<Message>, attribution: Attribution) -> Self {
        Self {
            model,
            messages,
            temperature: 0.0,
            max_tokens: None,
            attribution,
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Unknown(String),
}

impl From<Option<String>> for FinishReason {
    fn from(s: Option<String>) -> Self {
        match s.as_deref() {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some(other) => FinishReason::Unknown(other.to_string()),
            None => FinishReason::Unknown("none".to_string()),
        }
    }
}

/// Response from chat completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated content.
    pub content: String,
    /// Prompt tokens evaluated.
    pub input_tokens: u32,
    /// Output tokens generated.
    pub output_tokens: u32,
    /// Time taken for the request.
    pub latency: Duration,
    /// Why the model stopped.
    pub finish_reason: FinishReason,
}

// =============================================================================
// EMBEDDING TYPES
// =============================================================================

/// Request to embed texts.
#[derive(Debug, Clone)]
pub struct EmbedRequest {
    /// Model to use for embedding.
    pub model: ModelRef,
    /// Texts to embed. Each text produces one embedding vector.
    pub texts: Vec<String>,
    /// Attribution for usage tracking.
    pub attribution: Attribution,
}

impl EmbedRequest {
    pub fn new(model: ModelRef, texts: Vec<String>, attribution: Attribution) -> Self {
        Self {
            model,
            texts,
            attribution,
        }
    }
}

/// Response from embedding request.
#[derive(Debug, Clone)]
pub struct EmbedResponse {
    /// Embedding vectors, one per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Prompt tokens evaluated, if reported.
    pub input_tokens: u32,
    /// Time taken for the request.
    pub latency: Duration,
}

impl EmbedResponse {
    pub(crate) fn empty() -> Self {
        Self {
            embeddings: Vec::new(),
            input_tokens: 0,
            latency: Duration::from_millis(0),
        }
    }
}
