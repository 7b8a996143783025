//! Elicited scorer: ask a chat model for a similarity rating.
//!
//! The model answers with a number in [0, 1]. The first whitespace-separated
//! token that parses as a finite float is taken as the answer, scaled to the
//! target range and clamped. Anything else (transport failure, timeout,
//! no number in the reply) yields the fallback score instead of an error, and
//! is counted in [`ElicitationStats`] so a run that silently degraded to the
//! fallback is visible in its summary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::gateway::{Attribution, ChatGateway, ChatRequest, ModelRef, ProviderError};
use crate::prompts::{PromptTemplate, DEFAULT_TEMPLATE};

use super::{ScoreRange, ScorerError, ScorerKind, SimilarityScorer};

pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_TEMPERATURE: f32 = 0.4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct ElicitedScorerConfig {
    pub model: ModelRef,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Per-pair wall-clock limit, covering the whole request.
    pub timeout: Duration,
    /// Score used when no rating can be obtained. Defaults to the range midpoint.
    pub fallback: Option<f64>,
    pub range: ScoreRange,
}

impl Default for ElicitedScorerConfig {
    fn default() -> Self {
        Self {
            model: ModelRef::ollama(DEFAULT_MODEL),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            timeout: DEFAULT_TIMEOUT,
            fallback: None,
            range: ScoreRange::default(),
        }
    }
}

impl ElicitedScorerConfig {
    pub fn model(mut self, model: ModelRef) -> Self {
        self.model = model;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn fallback(mut self, value: f64) -> Self {
        self.fallback = Some(value);
        self
    }

    pub fn range(mut self, range: ScoreRange) -> Self {
        self.range = range;
        self
    }

    pub fn fallback_value(&self) -> f64 {
        self.range.clamp(self.fallback.unwrap_or_else(|| self.range.midpoint()))
    }
}

// =============================================================================
// Counters
// =============================================================================

/// Live outcome counters, shared across concurrent `score` calls.
#[derive(Debug, Default)]
pub struct ElicitationStats {
    parsed: AtomicUsize,
    unparsable: AtomicUsize,
    transport_failures: AtomicUsize,
    timeouts: AtomicUsize,
}

impl ElicitationStats {
    pub fn snapshot(&self) -> ElicitationSnapshot {
        let parsed = self.parsed.load(Ordering::Relaxed);
        let unparsable = self.unparsable.load(Ordering::Relaxed);
        let transport_failures = self.transport_failures.load(Ordering::Relaxed);
        let timeouts = self.timeouts.load(Ordering::Relaxed);
        let fallbacks = unparsable + transport_failures + timeouts;
        let calls = parsed + fallbacks;
        ElicitationSnapshot {
            calls,
            parsed,
            unparsable,
            transport_failures,
            timeouts,
            fallbacks,
            fallback_ratio: if calls == 0 {
                0.0
            } else {
                fallbacks as f64 / calls as f64
            },
        }
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`ElicitationStats`], written into run summaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElicitationSnapshot {
    pub calls: usize,
    pub parsed: usize,
    pub unparsable: usize,
    pub transport_failures: usize,
    pub timeouts: usize,
    pub fallbacks: usize,
    pub fallback_ratio: f64,
}

// =============================================================================
// Parsing
// =============================================================================

/// First whitespace-separated token that parses as a finite float.
///
/// Tokens are parsed as-is: "0.8" matches but "0.8," does not.
pub fn parse_first_float(text: &str) -> Option<f64> {
    text.split_whitespace()
        .filter_map(|token| token.parse::<f64>().ok())
        .find(|v| v.is_finite())
}

enum Failure {
    Transport(ProviderError),
    Timeout(Duration),
    Unparsable(String),
}

// =============================================================================
// Scorer
// =============================================================================

pub struct ElicitedScorer {
    gateway: Arc<dyn ChatGateway>,
    config: ElicitedScorerConfig,
    template: PromptTemplate,
    attribution: Attribution,
    stats: ElicitationStats,
}

impl ElicitedScorer {
    pub fn new(gateway: Arc<dyn ChatGateway>, config: ElicitedScorerConfig) -> Self {
        Self {
            gateway,
            config,
            template: DEFAULT_TEMPLATE,
            attribution: Attribution::new("scorer::elicited"),
            stats: ElicitationStats::default(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_run(mut self, run_id: Uuid) -> Self {
        self.attribution = self.attribution.with_run(run_id);
        self
    }

    pub fn config(&self) -> &ElicitedScorerConfig {
        &self.config
    }

    pub fn stats(&self) -> ElicitationSnapshot {
        self.stats.snapshot()
    }

    /// One model call, returning the unit-interval rating.
    async fn elicit(&self, sentence1: &str, sentence2: &str) -> Result<f64, Failure> {
        let prompt = self.template.render(sentence1, sentence2);
        let mut req = ChatRequest::new(
            self.config.model.clone(),
            prompt.to_messages(),
            self.attribution.clone(),
        )
        .temperature(self.config.temperature);
        if let Some(max) = self.config.max_tokens {
            req = req.max_tokens(max);
        }

        let resp = tokio::time::timeout(self.config.timeout, self.gateway.chat(req))
            .await
            .map_err(|_| Failure::Timeout(self.config.timeout))?
            .map_err(Failure::Transport)?;

        parse_first_float(&resp.content).ok_or(Failure::Unparsable(resp.content))
    }
}

#[async_trait]
impl SimilarityScorer for ElicitedScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Elicited
    }

    /// Never fails: every failure is replaced by the fallback score.
    async fn score(&self, sentence1: &str, sentence2: &str) -> Result<f64, ScorerError> {
        let range = self.config.range;
        match self.elicit(sentence1, sentence2).await {
            Ok(unit) => {
                ElicitationStats::bump(&self.stats.parsed);
                Ok(range.clamp(range.from_unit(unit)))
            }
            Err(failure) => {
                let fallback = self.config.fallback_value();
                match failure {
                    Failure::Transport(err) => {
                        ElicitationStats::bump(&self.stats.transport_failures);
                        warn!(
                            error = %err,
                            code = err.code(),
                            transient = err.is_transient(),
                            fallback,
                            "rating request failed"
                        );
                    }
                    Failure::Timeout(limit) => {
                        ElicitationStats::bump(&self.stats.timeouts);
                        warn!(timeout_ms = limit.as_millis() as u64, fallback, "rating request timed out");
                    }
                    Failure::Unparsable(reply) => {
                        ElicitationStats::bump(&self.stats.unparsable);
                        warn!(reply = %reply, fallback, "no number in model reply");
                    }
                }
                Ok(fallback)
            }
        }
    }

    fn diagnostics(&self) -> Option<ElicitationSnapshot> {
        Some(self.stats.snapshot())
    }
}
