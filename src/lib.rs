#![forbid(unsafe_code)]

//! # sts-harness
//!
//! Benchmark harness for sentence-pair semantic similarity on STS data.
//!
//! Each scorer produces a raw similarity signal for a sentence pair. A linear
//! calibration fitted on the training split maps that signal onto the 0–5
//! ground-truth scale, and the calibrated test predictions are judged by
//! Pearson correlation with the human scores. Four scorers ship with the
//! crate: a uniform random baseline, TF-IDF lexical overlap, dense-embedding
//! cosine, and ratings elicited from a chat model.
//!
//! Model-backed scorers talk to a local Ollama server through [`gateway`].

pub mod artifacts;
pub mod calibration;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod gateway;
pub mod pipeline;
pub mod plot;
pub mod prompts;
pub mod scorer;

pub use artifacts::{ArtifactError, ArtifactWriter};
pub use calibration::{CalibrationError, LinearCalibration};
pub use config::{BenchConfig, ConfigError};
pub use dataset::{load_sts_file, parse_sts, DatasetError, LoadReport, LoadedSplit, SentencePair, StsSplit};
pub use evaluation::{evaluate, Correlation, EvaluationError, EvaluationResult, ScatterPoint};
pub use gateway::{Attribution, ChatGateway, EmbedGateway, ProviderGateway, UsageSink};
pub use pipeline::{build_scorer, run_benchmark, run_from_config, PipelineError, RunSummary};
pub use scorer::{ScoreRange, ScorerError, ScorerKind, SimilarityScorer};
