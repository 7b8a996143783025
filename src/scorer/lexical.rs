//! Lexical-overlap scorer: TF-IDF vectors compared by cosine.
//!
//! The vectorizer uses the conventional defaults for short-text TF-IDF:
//! - lowercased input, tokens of two or more word characters
//! - smoothed IDF: `ln((1 + n) / (1 + df)) + 1`
//! - raw term counts times IDF, then L2 normalisation
//!
//! Because vectors are unit length, cosine similarity is their dot product.

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{ScorerError, ScorerKind, SimilarityScorer};

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("Invalid token regex"));

pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Sparse term-index → weight vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    weights: HashMap<usize, f64>,
}

impl SparseVector {
    pub fn get(&self, index: usize) -> f64 {
        self.weights.get(&index).copied().unwrap_or(0.0)
    }

    pub fn nnz(&self) -> usize {
        self.weights.len()
    }

    pub fn is_zero(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.weights.values().map(|w| w * w).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (small, large) = if self.nnz() <= other.nnz() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .weights
            .iter()
            .map(|(idx, w)| w * large.get(*idx))
            .sum()
    }

    pub fn cosine(&self, other: &SparseVector) -> f64 {
        let denom = self.norm() * other.norm();
        if denom < f64::EPSILON {
            0.0
        } else {
            self.dot(other) / denom
        }
    }
}

#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfIdfVectorizer {
    /// Build the vocabulary and IDF table from a corpus of documents.
    pub fn fit<S: AsRef<str>>(corpus: &[S]) -> Self {
        let n_docs = corpus.len();
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();

        for doc in corpus {
            let mut seen: Vec<usize> = Vec::new();
            for token in tokenize(doc.as_ref()) {
                let next = vocabulary.len();
                let idx = *vocabulary.entry(token).or_insert(next);
                if idx == doc_freq.len() {
                    doc_freq.push(0);
                }
                if !seen.contains(&idx) {
                    seen.push(idx);
                    doc_freq[idx] += 1;
                }
            }
        }

        let idf = doc_freq
            .iter()
            .map(|&df| ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        Self { vocabulary, idf }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&idx| self.idf[idx])
    }

    /// L2-normalised TF-IDF vector. Unknown terms are dropped.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut weights: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *weights.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        for (idx, w) in weights.iter_mut() {
            *w *= self.idf[*idx];
        }

        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in weights.values_mut() {
                *w /= norm;
            }
        }
        SparseVector { weights }
    }
}

/// Scores pairs by cosine of their TF-IDF vectors under a vocabulary fitted
/// on the training sentences.
#[derive(Debug, Clone, Default)]
pub struct LexicalOverlapScorer {
    vectorizer: Option<TfIdfVectorizer>,
}

impl LexicalOverlapScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vectorizer(&self) -> Option<&TfIdfVectorizer> {
        self.vectorizer.as_ref()
    }

    fn fitted(&self) -> Result<&TfIdfVectorizer, ScorerError> {
        self.vectorizer
            .as_ref()
            .ok_or(ScorerError::NotFitted(ScorerKind::Lexical))
    }
}

#[async_trait]
impl SimilarityScorer for LexicalOverlapScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Lexical
    }

    async fn fit(&mut self, corpus: &[&str]) -> Result<(), ScorerError> {
        if corpus.is_empty() {
            return Err(ScorerError::EmptyCorpus(ScorerKind::Lexical));
        }
        let vectorizer = TfIdfVectorizer::fit(corpus);
        tracing::info!(
            documents = corpus.len(),
            vocabulary = vectorizer.vocabulary_size(),
            "fitted tf-idf vocabulary"
        );
        self.vectorizer = Some(vectorizer);
        Ok(())
    }

    async fn score(&self, sentence1: &str, sentence2: &str) -> Result<f64, ScorerError> {
        let vectorizer = self.fitted()?;
        let v1 = vectorizer.transform(sentence1);
        let v2 = vectorizer.transform(sentence2);
        Ok(v1.cosine(&v2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_drops_single_characters_and_lowercases() {
        assert_eq!(tokenize("A Cat sat, on THE mat!"), vec!["cat", "sat", "on", "the", "mat"]);
    }

    #[test]
    fn smoothed_idf_matches_closed_form() {
        let corpus = ["the cat", "the dog", "a bird"];
        let v = TfIdfVectorizer::fit(&corpus);
        // n = 3, df(the) = 2 → ln(4/3) + 1
        let expected = (4.0f64 / 3.0).ln() + 1.0;
        assert!((v.idf("the").unwrap() - expected).abs() < 1e-12);
        // df(cat) = 1 → ln(4/2) + 1
        assert!((v.idf("cat").unwrap() - (2.0f64.ln() + 1.0)).abs() < 1e-12);
        assert!(v.idf("a").is_none());
    }

    #[test]
    fn transform_is_unit_length_and_ignores_unknown_terms() {
        let v = TfIdfVectorizer::fit(&["red apples", "green pears"]);
        let vec = v.transform("red red bananas");
        assert_eq!(vec.nnz(), 1);
        assert!((vec.norm() - 1.0).abs() < 1e-12);

        let oov = v.transform("zebra quokka");
        assert!(oov.is_zero());
        assert_eq!(oov.cosine(&vec), 0.0);
    }

    #[tokio::test]
    async fn identical_sentences_score_one() {
        let mut scorer = LexicalOverlapScorer::new();
        scorer
            .fit(&["A man is playing a guitar.", "A woman slices an onion."])
            .await
            .unwrap();
        let s = scorer
            .score("A man is playing a guitar.", "A man is playing a guitar.")
            .await
            .unwrap();
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn scoring_before_fit_is_an_error() {
        let scorer = LexicalOverlapScorer::new();
        let err = scorer.score("a", "b").await.unwrap_err();
        assert!(matches!(err, ScorerError::NotFitted(ScorerKind::Lexical)));
    }

    #[tokio::test]
    async fn empty_corpus_cannot_be_fitted() {
        let mut scorer = LexicalOverlapScorer::new();
        assert!(matches!(
            scorer.fit(&[]).await.unwrap_err(),
            ScorerError::EmptyCorpus(_)
        ));
    }
}
