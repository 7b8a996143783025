//! Similarity scorers.
//!
//! A scorer turns a sentence pair into a raw, uncalibrated similarity signal.
//! The pipeline only relies on [`SimilarityScorer`]; the four strategies
//! differ in what the signal means:
//!
//! | scorer     | raw score                                   |
//! |------------|---------------------------------------------|
//! | random     | uniform in the target range, input ignored  |
//! | lexical    | TF-IDF cosine, in [0, 1]                    |
//! | embedding  | embedding cosine, usually in [0, 1]         |
//! | elicited   | model answer in [0, 1] scaled to the range  |

pub mod elicited;
pub mod embedding;
pub mod lexical;
pub mod random;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dataset::SentencePair;
use crate::gateway::ProviderError;

pub use elicited::{ElicitationSnapshot, ElicitationStats, ElicitedScorer, ElicitedScorerConfig};
pub use embedding::{Embedder, EmbeddingScorer, RemoteEmbedder};
pub use lexical::{LexicalOverlapScorer, SparseVector, TfIdfVectorizer};
pub use random::RandomScorer;

/// Which scoring strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Random,
    Lexical,
    Embedding,
    Elicited,
}

impl ScorerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScorerKind::Random => "random",
            ScorerKind::Lexical => "lexical",
            ScorerKind::Embedding => "embedding",
            ScorerKind::Elicited => "elicited",
        }
    }

    /// Short tag used in artifact file names.
    pub fn artifact_tag(&self) -> &'static str {
        match self {
            ScorerKind::Random => "guess",
            ScorerKind::Lexical => "syntactic",
            ScorerKind::Embedding => "semantic",
            ScorerKind::Elicited => "llm",
        }
    }

    pub fn plot_title(&self) -> &'static str {
        match self {
            ScorerKind::Random => "Random Uniform Predictor (Test Set)",
            ScorerKind::Lexical => "Purely Syntactic Predictor (Test Set)",
            ScorerKind::Embedding => "Semantic Predictor (Sentence Embeddings)",
            ScorerKind::Elicited => "LLM-based Predictor (ollama)",
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed interval of the target similarity scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub low: f64,
    pub high: f64,
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: 5.0,
        }
    }
}

impl ScoreRange {
    pub fn new(low: f64, high: f64) -> Result<Self, ScorerError> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(ScorerError::InvalidConfig(format!(
                "score range must satisfy low < high, got [{low}, {high}]"
            )));
        }
        Ok(Self { low, high })
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    pub fn midpoint(&self) -> f64 {
        self.low + self.width() / 2.0
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.low..=self.high).contains(&value)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.low, self.high)
    }

    /// Map a unit-interval value linearly onto this range (no clamping).
    pub fn from_unit(&self, unit: f64) -> f64 {
        self.low + unit * self.width()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("{0} scorer used before fit")]
    NotFitted(ScorerKind),
    #[error("cannot fit {0} scorer on an empty corpus")]
    EmptyCorpus(ScorerKind),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("invalid scorer configuration: {0}")]
    InvalidConfig(String),
}

/// Pluggable similarity strategy.
#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    fn kind(&self) -> ScorerKind;

    /// Prepare the scorer on the training corpus. Stateless scorers ignore it.
    async fn fit(&mut self, _corpus: &[&str]) -> Result<(), ScorerError> {
        Ok(())
    }

    async fn score(&self, sentence1: &str, sentence2: &str) -> Result<f64, ScorerError>;

    /// Score every pair, returning one raw score per input pair in order.
    async fn score_batch(&self, pairs: &[SentencePair]) -> Result<Vec<f64>, ScorerError> {
        let mut scores = Vec::with_capacity(pairs.len());
        for pair in pairs {
            scores.push(self.score(&pair.sentence1, &pair.sentence2).await?);
        }
        Ok(scores)
    }

    /// Counters for scorers that can silently substitute fallback values.
    fn diagnostics(&self) -> Option<ElicitationSnapshot> {
        None
    }
}

/// Cosine similarity between dense vectors. Zero-magnitude input yields 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        dot / denom
    }
}
