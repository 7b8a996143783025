//! Run artifacts written for external inspection.
//!
//! Layout under the output directory, for a scorer tag such as `semantic`:
//!
//! ```text
//! train_scores_semantic.txt      one raw score per line
//! train_sentences_semantic.txt   sentence1 \t sentence2 \t raw score
//! test_scores_semantic.txt
//! test_sentences_semantic.txt
//! semantic_predictor.svg         calibrated test predictions vs ground truth
//! semantic_summary.json          run summary
//! ```
//!
//! Nothing in the crate reads these files back.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::dataset::StsSplit;
use crate::evaluation::{Correlation, ScatterPoint};
use crate::plot::render_scatter_svg;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{records} records but {scores} scores")]
    LengthMismatch { records: usize, scores: usize },
    #[error("serialization failed: {0}")]
    Serde(String),
}

/// Writes every artifact of one run into a directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    tag: String,
}

impl ArtifactWriter {
    /// Create the output directory (and parents) if missing.
    pub fn new(dir: impl Into<PathBuf>, tag: impl Into<String>) -> Result<Self, ArtifactError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ArtifactError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            tag: tag.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn scores_path(&self, split_name: &str) -> PathBuf {
        self.dir.join(format!("{split_name}_scores_{}.txt", self.tag))
    }

    pub fn sentences_path(&self, split_name: &str) -> PathBuf {
        self.dir.join(format!("{split_name}_sentences_{}.txt", self.tag))
    }

    pub fn plot_path(&self) -> PathBuf {
        self.dir.join(format!("{}_predictor.svg", self.tag))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(format!("{}_summary.json", self.tag))
    }

    /// One score per line.
    pub fn write_scores(&self, split_name: &str, scores: &[f64]) -> Result<PathBuf, ArtifactError> {
        let path = self.scores_path(split_name);
        write_with(&path, |w| {
            for score in scores {
                writeln!(w, "{score}")?;
            }
            Ok(())
        })?;
        Ok(path)
    }

    /// `sentence1<TAB>sentence2<TAB>score` per record.
    pub fn write_sentence_scores(
        &self,
        split_name: &str,
        split: &StsSplit,
        scores: &[f64],
    ) -> Result<PathBuf, ArtifactError> {
        if split.len() != scores.len() {
            return Err(ArtifactError::LengthMismatch {
                records: split.len(),
                scores: scores.len(),
            });
        }
        let path = self.sentences_path(split_name);
        write_with(&path, |w| {
            for (record, score) in split.records().iter().zip(scores) {
                writeln!(w, "{}\t{}\t{score}", record.sentence1, record.sentence2)?;
            }
            Ok(())
        })?;
        Ok(path)
    }

    pub fn write_plot(
        &self,
        title: &str,
        points: &[ScatterPoint],
        pearson: &Correlation,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.plot_path();
        let svg = render_scatter_svg(title, points, pearson);
        write_with(&path, |w| w.write_all(svg.as_bytes()))?;
        Ok(path)
    }

    pub fn write_summary<T: Serialize>(&self, summary: &T) -> Result<PathBuf, ArtifactError> {
        let path = self.summary_path();
        let json =
            serde_json::to_string_pretty(summary).map_err(|e| ArtifactError::Serde(e.to_string()))?;
        write_with(&path, |w| writeln!(w, "{json}"))?;
        Ok(path)
    }
}

fn write_with<F>(path: &Path, body: F) -> Result<(), ArtifactError>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let io_err = |source: std::io::Error| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    body(&mut writer).map_err(io_err)?;
    writer.flush().map_err(io_err)
}
