//! Benchmark configuration.
//!
//! Resolution order, later wins: built-in defaults, an optional TOML file,
//! environment (`OLLAMA_HOST`, `STS_OUTPUT_DIR`), then CLI flags applied by
//! the binary. Every field has a default so an empty file is valid.
//!
//! ```toml
//! [data]
//! train = "./data/sts-train.csv"
//! test = "./data/sts-test.csv"
//!
//! [elicitation]
//! model = "llama3.2"
//! temperature = 0.4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gateway::ModelRef;
use crate::scorer::{ElicitedScorerConfig, ScoreRange};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    #[serde(default = "default_train_path")]
    pub train: PathBuf,
    #[serde(default = "default_test_path")]
    pub test: PathBuf,
    /// Single-character field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_train_path() -> PathBuf {
    PathBuf::from("./data/sts-train.csv")
}

fn default_test_path() -> PathBuf {
    PathBuf::from("./data/sts-test.csv")
}

fn default_delimiter() -> String {
    "\t".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train: default_train_path(),
            test: default_test_path(),
            delimiter: default_delimiter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./results")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RangeConfig {
    #[serde(default)]
    pub low: f64,
    #[serde(default = "default_high")]
    pub high: f64,
}

fn default_high() -> f64 {
    5.0
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: default_high(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RandomConfig {
    /// Unset draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_model() -> String {
    "bge-m3".to_string()
}

fn default_batch_size() -> usize {
    crate::scorer::embedding::DEFAULT_BATCH_SIZE
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ElicitationConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_elicitation_timeout")]
    pub timeout_secs: u64,
    /// Defaults to the midpoint of the range.
    #[serde(default)]
    pub fallback: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_chat_model() -> String {
    crate::scorer::elicited::DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    crate::scorer::elicited::DEFAULT_TEMPERATURE
}

fn default_elicitation_timeout() -> u64 {
    crate::scorer::elicited::DEFAULT_TIMEOUT.as_secs()
}

impl Default for ElicitationConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            temperature: default_temperature(),
            timeout_secs: default_elicitation_timeout(),
            fallback: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
}

fn default_ollama_url() -> String {
    crate::gateway::ollama::DEFAULT_BASE_URL.to_string()
}

fn default_ollama_timeout() -> u64 {
    crate::gateway::ollama::DEFAULT_TIMEOUT.as_secs()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            timeout_secs: default_ollama_timeout(),
        }
    }
}

// =============================================================================
// Top level
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub range: RangeConfig,
    #[serde(default)]
    pub random: RandomConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub elicitation: ElicitationConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

impl BenchConfig {
    /// Defaults, overlaid with `path` when given. Environment is not applied.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("OLLAMA_HOST").filter(|h| !h.trim().is_empty()) {
            self.ollama.base_url = host;
        }
        if let Some(dir) = lookup("STS_OUTPUT_DIR").filter(|d| !d.trim().is_empty()) {
            self.output.dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.delimiter()?;
        let range = self.score_range()?;
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "embedding.batch_size must be >= 1".to_string(),
            ));
        }
        let t = self.elicitation.temperature;
        if !(0.0..=2.0).contains(&t) {
            return Err(ConfigError::Invalid(format!(
                "elicitation.temperature must be in [0, 2], got {t}"
            )));
        }
        if let Some(fallback) = self.elicitation.fallback {
            if !range.contains(fallback) {
                return Err(ConfigError::Invalid(format!(
                    "elicitation.fallback {fallback} outside [{}, {}]",
                    range.low, range.high
                )));
            }
        }
        if self.elicitation.timeout_secs == 0 || self.ollama.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be >= 1 second".to_string()));
        }
        Ok(())
    }

    pub fn delimiter(&self) -> Result<char, ConfigError> {
        parse_delimiter(&self.data.delimiter)
    }

    pub fn score_range(&self) -> Result<ScoreRange, ConfigError> {
        ScoreRange::new(self.range.low, self.range.high)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn elicited_scorer_config(&self) -> Result<ElicitedScorerConfig, ConfigError> {
        let mut config = ElicitedScorerConfig::default()
            .model(ModelRef::ollama(&self.elicitation.model))
            .temperature(self.elicitation.temperature)
            .timeout(Duration::from_secs(self.elicitation.timeout_secs))
            .range(self.score_range()?);
        if let Some(fallback) = self.elicitation.fallback {
            config = config.fallback(fallback);
        }
        if let Some(max) = self.elicitation.max_tokens {
            config = config.max_tokens(max);
        }
        Ok(config)
    }
}

/// Accepts one character, or the escapes `\t` and `tab`.
pub fn parse_delimiter(raw: &str) -> Result<char, ConfigError> {
    match raw {
        "\\t" | "tab" => return Ok('\t'),
        _ => {}
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::Invalid(format!(
            "delimiter must be a single character, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: BenchConfig = toml::from_str("").unwrap();
        assert_eq!(config.data.delimiter, "\t");
        assert_eq!(config.embedding.batch_size, 32);
        assert_eq!(config.elicitation.model, "llama3.2");
        assert!((config.elicitation.temperature - 0.4).abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: BenchConfig = toml::from_str(
            r#"
            [range]
            high = 1.0

            [random]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.range.low, 0.0);
        assert_eq!(config.range.high, 1.0);
        assert_eq!(config.random.seed, Some(7));
        assert_eq!(config.output.dir, PathBuf::from("./results"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<BenchConfig>("[data]\ntrian = \"x\"").is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> =
            [("OLLAMA_HOST", "gpu-box:11434"), ("STS_OUTPUT_DIR", "/tmp/out")].into();
        let mut config = BenchConfig::default();
        config.apply_env_from(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.ollama.base_url, "gpu-box:11434");
        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = BenchConfig::default();
        config.data.delimiter = ",,".to_string();
        assert!(config.validate().is_err());

        let mut config = BenchConfig::default();
        config.range.low = 5.0;
        assert!(config.validate().is_err());

        let mut config = BenchConfig::default();
        config.elicitation.fallback = Some(6.0);
        assert!(config.validate().is_err());

        let mut config = BenchConfig::default();
        config.elicitation.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn delimiter_escapes() {
        assert_eq!(parse_delimiter("\\t").unwrap(), '\t');
        assert_eq!(parse_delimiter(",").unwrap(), ',');
        assert!(parse_delimiter("").is_err());
    }
}
