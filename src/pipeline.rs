//! Benchmark pipeline: fit → score train → calibrate → score test → evaluate.
//!
//! One pipeline serves every scorer; the strategy is a `dyn SimilarityScorer`.
//! Stages run sequentially so a seeded random scorer draws the same numbers
//! for the same input on every run. Calibration is fitted on the training
//! split only and applied unchanged to the test split.
//!
//! Usage:
//! ```bash
//! sts run --scorer lexical --train data/sts-train.csv --test data/sts-test.csv
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::artifacts::{ArtifactError, ArtifactWriter};
use crate::calibration::{CalibrationError, LinearCalibration};
use crate::config::{BenchConfig, ConfigError};
use crate::dataset::{load_sts_file, DatasetError, LoadedSplit};
use crate::evaluation::{evaluate, Correlation, EvaluationError};
use crate::gateway::{
    Attribution, ModelRef, OllamaAdapter, ProviderError, ProviderGateway, TracingUsageSink,
};
use crate::scorer::{
    ElicitationSnapshot, ElicitedScorer, EmbeddingScorer, LexicalOverlapScorer, RandomScorer,
    RemoteEmbedder, ScorerError, ScorerKind, SimilarityScorer,
};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("scorer unavailable: {0}")]
    Scorer(#[from] ScorerError),
    #[error("calibration failed: {0}")]
    Calibration(#[from] CalibrationError),
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("provider setup failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Row accounting for one split.
#[derive(Debug, Clone, Serialize)]
pub struct SplitSummary {
    pub rows_read: usize,
    pub records: usize,
    pub skipped: usize,
}

impl From<&LoadedSplit> for SplitSummary {
    fn from(loaded: &LoadedSplit) -> Self {
        Self {
            rows_read: loaded.report.rows_read,
            records: loaded.split.len(),
            skipped: loaded.report.skipped_count(),
        }
    }
}

/// Everything a finished run reports, written as `{tag}_summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub scorer: ScorerKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub train: SplitSummary,
    pub test: SplitSummary,
    pub calibration: LinearCalibration,
    pub pearson: Correlation,
    pub spearman: Correlation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elicitation: Option<ElicitationSnapshot>,
}

// =============================================================================
// Running
// =============================================================================

/// Run one scorer end to end and write every artifact.
///
/// Skipped rows, elicitation fallbacks, a degenerate calibration and an
/// undefined correlation are all reported in the summary, not as errors.
pub async fn run_benchmark(
    scorer: &mut dyn SimilarityScorer,
    train: &LoadedSplit,
    test: &LoadedSplit,
    artifacts: &ArtifactWriter,
    run_id: Uuid,
) -> Result<RunSummary, PipelineError> {
    let started_at = Utc::now();
    let kind = scorer.kind();
    info!(%run_id, scorer = %kind, train = train.split.len(), test = test.split.len(), "starting run");

    let corpus = train.split.corpus();
    scorer.fit(&corpus).await?;

    // --- Train ---
    info!(pairs = train.split.len(), "scoring train split");
    let raw_train = scorer.score_batch(train.split.records()).await?;
    artifacts.write_scores("train", &raw_train)?;
    artifacts.write_sentence_scores("train", &train.split, &raw_train)?;

    let calibration = LinearCalibration::fit(&raw_train, &train.split.ground_truth())?;
    info!(
        slope = calibration.slope,
        intercept = calibration.intercept,
        degenerate = calibration.degenerate,
        rmse = calibration.training_rmse,
        "fitted calibration"
    );

    // --- Test ---
    info!(pairs = test.split.len(), "scoring test split");
    let raw_test = scorer.score_batch(test.split.records()).await?;
    artifacts.write_scores("test", &raw_test)?;
    artifacts.write_sentence_scores("test", &test.split, &raw_test)?;

    let predictions = calibration.apply(&raw_test);
    let evaluation = evaluate(&predictions, &test.split.ground_truth())?;
    info!("Pearson Correlation (Test) = {}", evaluation.pearson);

    artifacts.write_plot(kind.plot_title(), &evaluation.sorted_pairs, &evaluation.pearson)?;

    let summary = RunSummary {
        run_id,
        scorer: kind,
        started_at,
        finished_at: Utc::now(),
        train: SplitSummary::from(train),
        test: SplitSummary::from(test),
        calibration,
        pearson: evaluation.pearson,
        spearman: evaluation.spearman,
        elicitation: scorer.diagnostics(),
    };
    let path = artifacts.write_summary(&summary)?;
    info!(path = %path.display(), "wrote run summary");
    Ok(summary)
}

/// Load both splits named in `config`, build the scorer and run it.
pub async fn run_from_config(kind: ScorerKind, config: &BenchConfig) -> Result<RunSummary, PipelineError> {
    let delimiter = config.delimiter()?;
    let train = load_sts_file(&config.data.train, delimiter)?;
    let test = load_sts_file(&config.data.test, delimiter)?;

    let run_id = Uuid::new_v4();
    let artifacts = ArtifactWriter::new(&config.output.dir, kind.artifact_tag())?;
    let mut scorer = build_scorer(kind, config, run_id)?;
    run_benchmark(scorer.as_mut(), &train, &test, &artifacts, run_id).await
}

/// Raw score for a single pair. Corpus-fitted scorers fit on the pair itself.
pub async fn score_pair(
    kind: ScorerKind,
    config: &BenchConfig,
    sentence1: &str,
    sentence2: &str,
) -> Result<f64, PipelineError> {
    let mut scorer = build_scorer(kind, config, Uuid::new_v4())?;
    scorer.fit(&[sentence1, sentence2]).await?;
    Ok(scorer.score(sentence1, sentence2).await?)
}

// =============================================================================
// Construction
// =============================================================================

fn gateway(config: &BenchConfig) -> Result<Arc<ProviderGateway<TracingUsageSink>>, PipelineError> {
    let adapter = OllamaAdapter::with_config(
        config.ollama.base_url.as_str(),
        Duration::from_secs(config.ollama.timeout_secs),
    )?;
    debug!(base_url = adapter.base_url(), "using Ollama server");
    Ok(Arc::new(ProviderGateway::new(adapter, Arc::new(TracingUsageSink))))
}

/// Build the scorer for `kind` from configuration.
///
/// Model-backed scorers get an Ollama gateway that logs every call.
pub fn build_scorer(
    kind: ScorerKind,
    config: &BenchConfig,
    run_id: Uuid,
) -> Result<Box<dyn SimilarityScorer>, PipelineError> {
    config.validate()?;
    let range = config.score_range()?;

    let scorer: Box<dyn SimilarityScorer> = match kind {
        ScorerKind::Random => match config.random.seed {
            Some(seed) => Box::new(RandomScorer::seeded(range, seed)),
            None => Box::new(RandomScorer::from_entropy(range)),
        },
        ScorerKind::Lexical => Box::new(LexicalOverlapScorer::new()),
        ScorerKind::Embedding => {
            let embedder = RemoteEmbedder::new(gateway(config)?, ModelRef::ollama(&config.embedding.model))
                .with_attribution(Attribution::new("scorer::embedding").with_run(run_id));
            Box::new(
                EmbeddingScorer::new(Arc::new(embedder)).with_batch_size(config.embedding.batch_size)?,
            )
        }
        ScorerKind::Elicited => Box::new(
            ElicitedScorer::new(gateway(config)?, config.elicited_scorer_config()?).with_run(run_id),
        ),
    };
    Ok(scorer)
}
