//! STS dataset loading.
//!
//! Rows follow the fixed STS benchmark layout:
//!
//! ```text
//! genre  file  year  id  score  sentence1  sentence2  [ignored...]
//!   0     1     2    3     4        5          6
//! ```
//!
//! Rows with fewer than seven fields or an unparsable score are skipped and
//! reported, never fatal. This is what lets header lines and stray malformed
//! lines through without aborting a run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

pub const DEFAULT_DELIMITER: char = '\t';

const SCORE_FIELD: usize = 4;
const SENTENCE1_FIELD: usize = 5;
const SENTENCE2_FIELD: usize = 6;
const MIN_FIELDS: usize = 7;

/// One annotated sentence pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentencePair {
    pub sentence1: String,
    pub sentence2: String,
    pub ground_truth: f64,
}

impl SentencePair {
    pub fn new(sentence1: impl Into<String>, sentence2: impl Into<String>, ground_truth: f64) -> Self {
        Self {
            sentence1: sentence1.into(),
            sentence2: sentence2.into(),
            ground_truth,
        }
    }
}

/// Why a row was left out of the split.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    TooFewFields { found: usize },
    InvalidScore { value: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooFewFields { found } => {
                write!(f, "expected at least {MIN_FIELDS} fields, found {found}")
            }
            SkipReason::InvalidScore { value } => write!(f, "invalid score {value:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    /// 1-based line number in the source file.
    pub line: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub skipped: Vec<SkippedRow>,
}

impl LoadReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// An ordered, immutable split of sentence pairs.
///
/// Stored row-wise, so the sentence and score columns can never drift out of
/// alignment.
#[derive(Debug, Clone, Default)]
pub struct StsSplit {
    records: Vec<SentencePair>,
}

impl StsSplit {
    pub fn new(records: Vec<SentencePair>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[SentencePair] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn sentences1(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.sentence1.as_str())
    }

    pub fn sentences2(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.sentence2.as_str())
    }

    pub fn ground_truth(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.ground_truth).collect()
    }

    /// Every sentence in the split: all first members, then all second members.
    pub fn corpus(&self) -> Vec<&str> {
        self.sentences1().chain(self.sentences2()).collect()
    }
}

impl FromIterator<SentencePair> for StsSplit {
    fn from_iter<I: IntoIterator<Item = SentencePair>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug)]
pub struct LoadedSplit {
    pub split: StsSplit,
    pub report: LoadReport,
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load an STS file from disk.
pub fn load_sts_file(path: impl AsRef<Path>, delimiter: char) -> Result<LoadedSplit, DatasetError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let loaded = parse_sts(&text, delimiter);
    if loaded.report.skipped_count() > 0 {
        warn!(
            path = %path.display(),
            kept = loaded.split.len(),
            skipped = loaded.report.skipped_count(),
            "skipped malformed rows"
        );
    }
    Ok(loaded)
}

/// Parse STS rows from already-loaded text.
pub fn parse_sts(text: &str, delimiter: char) -> LoadedSplit {
    let mut records = Vec::new();
    let mut report = LoadReport::default();

    for (idx, line) in text.lines().enumerate() {
        report.rows_read += 1;
        match parse_row(line, delimiter) {
            Ok(pair) => records.push(pair),
            Err(reason) => {
                debug!(line = idx + 1, %reason, "skipping row");
                report.skipped.push(SkippedRow {
                    line: idx + 1,
                    reason,
                });
            }
        }
    }

    LoadedSplit {
        split: StsSplit::new(records),
        report,
    }
}

fn parse_row(line: &str, delimiter: char) -> Result<SentencePair, SkipReason> {
    let fields: Vec<&str> = line.split(delimiter).collect();
    // An empty line splits into one empty field; count it as zero.
    let found = if line.is_empty() { 0 } else { fields.len() };
    if found < MIN_FIELDS {
        return Err(SkipReason::TooFewFields { found });
    }

    let raw_score = fields[SCORE_FIELD];
    let ground_truth = raw_score
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SkipReason::InvalidScore {
            value: raw_score.to_string(),
        })?;

    Ok(SentencePair {
        sentence1: fields[SENTENCE1_FIELD].to_string(),
        sentence2: fields[SENTENCE2_FIELD].to_string(),
        ground_truth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_row_and_ignores_trailing_fields() {
        let text = "main-captions\tMSRvid\t2012test\t0001\t5.000\tA plane is taking off.\tAn air plane is taking off.\textra\tmore";
        let loaded = parse_sts(text, '\t');
        assert_eq!(loaded.split.len(), 1);
        let rec = &loaded.split.records()[0];
        assert_eq!(rec.ground_truth, 5.0);
        assert_eq!(rec.sentence1, "A plane is taking off.");
        assert_eq!(rec.sentence2, "An air plane is taking off.");
        assert!(loaded.report.skipped.is_empty());
    }

    #[test]
    fn empty_line_counts_as_zero_fields() {
        let loaded = parse_sts("\n", '\t');
        assert_eq!(
            loaded.report.skipped[0].reason,
            SkipReason::TooFewFields { found: 0 }
        );
    }

    #[test]
    fn nan_score_is_rejected() {
        let loaded = parse_sts("a\tb\tc\td\tNaN\tx\ty", '\t');
        assert!(loaded.split.is_empty());
        assert!(matches!(
            loaded.report.skipped[0].reason,
            SkipReason::InvalidScore { .. }
        ));
    }

    #[test]
    fn corpus_lists_first_members_then_second_members() {
        let split: StsSplit = vec![
            SentencePair::new("a1", "b1", 1.0),
            SentencePair::new("a2", "b2", 2.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(split.corpus(), vec!["a1", "a2", "b1", "b2"]);
    }
}
