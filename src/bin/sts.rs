#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sts_harness::config::{parse_delimiter, BenchConfig};
use sts_harness::dataset::load_sts_file;
use sts_harness::pipeline::{self, RunSummary};
use sts_harness::scorer::ScorerKind;

#[derive(Parser)]
#[command(name = "sts", version, about = "Sentence similarity benchmark harness")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by commands that build a scorer.
#[derive(Args)]
struct ScorerArgs {
    #[arg(long, value_enum)]
    scorer: ScorerKind,
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Model name for the embedding or elicited scorer
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    ollama_url: Option<String>,
    /// Seed for the random scorer
    #[arg(long)]
    seed: Option<u64>,
}

impl ScorerArgs {
    fn resolve(&self) -> Result<BenchConfig, Box<dyn std::error::Error>> {
        let mut config = BenchConfig::load(self.config.as_deref())?;
        config.apply_env();
        if let Some(model) = &self.model {
            match self.scorer {
                ScorerKind::Embedding => config.embedding.model = model.clone(),
                ScorerKind::Elicited => config.elicitation.model = model.clone(),
                ScorerKind::Random | ScorerKind::Lexical => {
                    eprintln!("[sts] --model ignored for the {} scorer", self.scorer);
                }
            }
        }
        if let Some(url) = &self.ollama_url {
            config.ollama.base_url = url.clone();
        }
        if let Some(seed) = self.seed {
            config.random.seed = Some(seed);
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full benchmark for one scorer
    Run {
        #[command(flatten)]
        scorer: ScorerArgs,
        #[arg(long)]
        train: Option<PathBuf>,
        #[arg(long)]
        test: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Field delimiter (single character, or "\t")
        #[arg(long)]
        delimiter: Option<String>,
    },
    /// Load a data file and report kept and skipped rows
    Validate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "\\t")]
        delimiter: String,
    },
    /// Print the raw score of one sentence pair
    Score {
        #[command(flatten)]
        scorer: ScorerArgs,
        #[arg(long)]
        sentence1: String,
        #[arg(long)]
        sentence2: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scorer,
            train,
            test,
            out_dir,
            delimiter,
        } => {
            let mut config = scorer.resolve()?;
            if let Some(train) = train {
                config.data.train = train;
            }
            if let Some(test) = test {
                config.data.test = test;
            }
            if let Some(dir) = out_dir {
                config.output.dir = dir;
            }
            if let Some(delimiter) = delimiter {
                config.data.delimiter = delimiter;
            }
            config.validate()?;

            let summary = pipeline::run_from_config(scorer.scorer, &config).await?;
            print_summary(&summary, &config);
        }
        Commands::Validate { input, delimiter } => {
            let delimiter = parse_delimiter(&delimiter)?;
            let loaded = load_sts_file(&input, delimiter)?;
            println!(
                "{}: {} rows read, {} kept, {} skipped",
                input.display(),
                loaded.report.rows_read,
                loaded.split.len(),
                loaded.report.skipped_count()
            );
            for skipped in &loaded.report.skipped {
                println!("  line {}: {}", skipped.line, skipped.reason);
            }
        }
        Commands::Score {
            scorer,
            sentence1,
            sentence2,
        } => {
            let config = scorer.resolve()?;
            let score = pipeline::score_pair(scorer.scorer, &config, &sentence1, &sentence2).await?;
            println!("{score}");
        }
    }

    Ok(())
}

const DEFAULT_LOG_FILTER: &str = "sts_harness=info";

/// `RUST_LOG` when set and valid, otherwise info for this crate only.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn print_summary(summary: &RunSummary, config: &BenchConfig) {
    println!("scorer: {} (run {})", summary.scorer, summary.run_id);
    println!(
        "train: {} records ({} skipped), test: {} records ({} skipped)",
        summary.train.records, summary.train.skipped, summary.test.records, summary.test.skipped
    );
    let cal = &summary.calibration;
    println!(
        "calibration: y = {:.4} * x + {:.4}{}",
        cal.slope,
        cal.intercept,
        if cal.degenerate { " (degenerate)" } else { "" }
    );
    println!("Pearson Correlation (Test) = {}", summary.pearson);
    println!("Spearman Correlation (Test) = {}", summary.spearman);
    if let Some(stats) = &summary.elicitation {
        println!(
            "elicitation: {} of {} replies parsed, fallback ratio {:.2}",
            stats.parsed, stats.calls, stats.fallback_ratio
        );
    }
    println!("artifacts: {}", config.output.dir.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_the_default_level() {
        assert_eq!(log_filter(Some("sts_harness=debug")).to_string(), "sts_harness=debug");
    }

    #[test]
    fn missing_or_blank_rust_log_uses_default() {
        assert_eq!(log_filter(None).to_string(), DEFAULT_LOG_FILTER);
        assert_eq!(log_filter(Some("  ")).to_string(), DEFAULT_LOG_FILTER);
    }
}
