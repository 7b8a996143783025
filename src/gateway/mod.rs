//! Model gateway for chat completions and embeddings.

pub mod error;
pub mod ollama;
pub mod types;
pub mod usage;

use std::sync::Arc;

use usage::{ProviderCallRecord, UsageSink as UsageSinkTrait};

pub use error::{ErrorContext, ProviderError};
pub use ollama::OllamaAdapter;
pub use types::*;
pub use usage::{NoopUsageSink, TracingUsageSink, UsageSink};

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[async_trait::async_trait]
pub trait EmbedGateway: Send + Sync {
    async fn embed(&self, req: EmbedRequest) -> Result<EmbedResponse, ProviderError>;
}

/// Adapter wrapper that records every call to a [`UsageSink`].
///
/// Calls are attempted exactly once; callers decide what a failure means.
pub struct ProviderGateway<U: UsageSinkTrait> {
    adapter: OllamaAdapter,
    usage_sink: Arc<U>,
}

#[async_trait::async_trait]
impl<U: UsageSinkTrait> ChatGateway for ProviderGateway<U> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        ProviderGateway::chat(self, req).await
    }
}

#[async_trait::async_trait]
impl<U: UsageSinkTrait> EmbedGateway for ProviderGateway<U> {
    async fn embed(&self, req: EmbedRequest) -> Result<EmbedResponse, ProviderError> {
        ProviderGateway::embed(self, req).await
    }
}

impl<U: UsageSinkTrait> ProviderGateway<U> {
    pub fn new(adapter: OllamaAdapter, usage_sink: Arc<U>) -> Self {
        Self {
            adapter,
            usage_sink,
        }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let result = self.adapter.chat(&req).await;
        let record = ProviderCallRecord::new(
            req.model.provider(),
            "chat",
            req.model.model_id(),
            req.attribution.caller,
        )
        .run(req.attribution.run_id);

        let record = match &result {
            Ok(resp) => record
                .tokens(resp.input_tokens, resp.output_tokens)
                .latency(resp.latency.as_millis() as u64),
            Err(err) => record.error(err.code()),
        };
        self.usage_sink.record(record).await;
        result
    }

    pub async fn embed(&self, req: EmbedRequest) -> Result<EmbedResponse, ProviderError> {
        let result = self.adapter.embed(&req).await;
        let record = ProviderCallRecord::new(
            req.model.provider(),
            "embed",
            req.model.model_id(),
            req.attribution.caller,
        )
        .run(req.attribution.run_id)
        .batch(req.texts.len());

        let record = match &result {
            Ok(resp) => record
                .tokens(resp.input_tokens, 0)
                .latency(resp.latency.as_millis() as u64),
            Err(err) => record.error(err.code()),
        };
        self.usage_sink.record(record).await;
        result
    }
}
