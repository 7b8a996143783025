//! Null-baseline scorer: uniform noise over the target range.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ScoreRange, ScorerError, ScorerKind, SimilarityScorer};

pub struct RandomScorer {
    range: ScoreRange,
    rng: Mutex<StdRng>,
}

impl RandomScorer {
    /// Seeded scorer; the same seed yields the same score sequence.
    pub fn seeded(range: ScoreRange, seed: u64) -> Self {
        Self {
            range,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy(range: ScoreRange) -> Self {
        Self {
            range,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn range(&self) -> ScoreRange {
        self.range
    }

    fn draw(&self) -> f64 {
        // A poisoned lock only means another caller panicked mid-draw; the
        // generator state itself is still valid.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(self.range.low..=self.range.high)
    }
}

#[async_trait]
impl SimilarityScorer for RandomScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Random
    }

    async fn score(&self, _sentence1: &str, _sentence2: &str) -> Result<f64, ScorerError> {
        Ok(self.draw())
    }
}
