//! Dense-embedding scorer.
//!
//! Sentences are encoded in batches through an [`Embedder`] and each pair is
//! scored by the cosine of its two vectors. The cosine is reported as-is:
//! embedding spaces do not guarantee non-negative similarity, so no clamping
//! happens here.

use std::sync::Arc;

use async_trait::async_trait;

use crate::dataset::SentencePair;
use crate::gateway::{Attribution, EmbedGateway, EmbedRequest, ModelRef, ProviderError};

use super::{cosine_similarity, ScorerError, ScorerKind, SimilarityScorer};

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Sentence encoder.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    /// Make sure the model is available. Called once before any scoring.
    async fn load(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Encode sentences, one vector per input in input order.
    async fn encode(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

/// [`Embedder`] backed by an embedding gateway.
pub struct RemoteEmbedder {
    gateway: Arc<dyn EmbedGateway>,
    model: ModelRef,
    attribution: Attribution,
}

impl RemoteEmbedder {
    pub fn new(gateway: Arc<dyn EmbedGateway>, model: ModelRef) -> Self {
        Self {
            gateway,
            model,
            attribution: Attribution::new("scorer::embedding"),
        }
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn model_name(&self) -> &str {
        self.model.model_id()
    }

    async fn load(&self) -> Result<(), ProviderError> {
        // Ollama loads a model lazily on first use; a one-sentence warm-up
        // surfaces a missing model before the run starts scoring.
        self.encode(&["warm-up".to_string()]).await.map(|_| ())
    }

    async fn encode(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let req = EmbedRequest::new(
            self.model.clone(),
            sentences.to_vec(),
            self.attribution.clone(),
        );
        Ok(self.gateway.embed(req).await?.embeddings)
    }
}

pub struct EmbeddingScorer {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    loaded: bool,
}

impl EmbeddingScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
            loaded: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, ScorerError> {
        if batch_size == 0 {
            return Err(ScorerError::InvalidConfig(
                "embedding batch size must be >= 1".to_string(),
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn encode_all(&self, sentences: Vec<String>) -> Result<Vec<Vec<f32>>, ScorerError> {
        let mut vectors = Vec::with_capacity(sentences.len());
        for chunk in sentences.chunks(self.batch_size) {
            let encoded = self.embedder.encode(chunk).await?;
            if encoded.len() != chunk.len() {
                return Err(ScorerError::Embedding(format!(
                    "{} returned {} vectors for {} sentences",
                    self.embedder.model_name(),
                    encoded.len(),
                    chunk.len()
                )));
            }
            vectors.extend(encoded);
        }
        Ok(vectors)
    }
}

fn pair_cosine(a: &[f32], b: &[f32]) -> Result<f64, ScorerError> {
    if a.len() != b.len() {
        return Err(ScorerError::Embedding(format!(
            "embedding dimensions differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(cosine_similarity(a, b))
}

#[async_trait]
impl SimilarityScorer for EmbeddingScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Embedding
    }

    /// Loads the model; the corpus is irrelevant for a pretrained encoder.
    async fn fit(&mut self, _corpus: &[&str]) -> Result<(), ScorerError> {
        if !self.loaded {
            self.embedder.load().await?;
            tracing::info!(model = self.embedder.model_name(), "embedding model ready");
            self.loaded = true;
        }
        Ok(())
    }

    async fn score(&self, sentence1: &str, sentence2: &str) -> Result<f64, ScorerError> {
        let vectors = self
            .encode_all(vec![sentence1.to_string(), sentence2.to_string()])
            .await?;
        pair_cosine(&vectors[0], &vectors[1])
    }

    async fn score_batch(&self, pairs: &[SentencePair]) -> Result<Vec<f64>, ScorerError> {
        let n = pairs.len();
        let sentences: Vec<String> = pairs
            .iter()
            .map(|p| p.sentence1.clone())
            .chain(pairs.iter().map(|p| p.sentence2.clone()))
            .collect();

        let vectors = self.encode_all(sentences).await?;
        let (first, second) = vectors.split_at(n);
        first
            .iter()
            .zip(second)
            .map(|(a, b)| pair_cosine(a, b))
            .collect()
    }
}
