use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

fn write_split(path: &Path, rows: &[(f64, &str, &str)]) {
    let text: String = rows
        .iter()
        .map(|(score, s1, s2)| format!("main-captions\tMSRvid\t2012\t0001\t{score}\t{s1}\t{s2}\n"))
        .collect();
    std::fs::write(path, text).unwrap();
}

fn rows() -> Vec<(f64, &'static str, &'static str)> {
    vec![
        (5.0, "A man is playing a guitar.", "A man plays the guitar."),
        (0.4, "A woman is slicing an onion.", "A dog runs in the park."),
        (3.2, "Kids are playing outside.", "Children play in the yard."),
        (1.0, "The stock market fell.", "A cat sleeps on the sofa."),
    ]
}

#[test]
fn run_random_scorer_writes_artifacts() {
    let dir = tempdir().unwrap();
    let train = dir.path().join("train.csv");
    let test = dir.path().join("test.csv");
    let out = dir.path().join("results");
    write_split(&train, &rows());
    write_split(&test, &rows());

    let output = Command::new(env!("CARGO_BIN_EXE_sts"))
        .args(["run", "--scorer", "random", "--seed", "5"])
        .arg("--train")
        .arg(&train)
        .arg("--test")
        .arg(&test)
        .arg("--out-dir")
        .arg(&out)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Pearson Correlation (Test) = "));
    assert!(out.join("test_scores_guess.txt").exists());
    assert!(out.join("guess_predictor.svg").exists());

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("guess_summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary["scorer"], "random");
    assert_eq!(summary["train"]["records"], 4);
}

#[test]
fn run_lexical_scorer_from_config_file() {
    let dir = tempdir().unwrap();
    let train = dir.path().join("train.csv");
    let test = dir.path().join("test.csv");
    write_split(&train, &rows());
    write_split(&test, &rows());

    let config_path = dir.path().join("bench.toml");
    let out = dir.path().join("out");
    std::fs::write(
        &config_path,
        format!(
            "[data]\ntrain = {:?}\ntest = {:?}\n\n[output]\ndir = {:?}\n",
            train.display().to_string(),
            test.display().to_string(),
            out.display().to_string()
        ),
    )
    .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sts"))
        .args(["run", "--scorer", "lexical", "--config"])
        .arg(&config_path)
        .env_remove("STS_OUTPUT_DIR")
        .status()
        .unwrap();
    assert!(status.success());
    assert!(out.join("syntactic_summary.json").exists());
}

#[test]
fn validate_reports_skipped_rows() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("data.csv");
    std::fs::write(
        &input,
        "header\tonly\ng\tf\ty\ti\t2.0\ta\tb\ng\tf\ty\ti\tbad\ta\tb\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sts"))
        .arg("validate")
        .arg("--input")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 rows read, 1 kept, 2 skipped"), "{stdout}");
    assert!(stdout.contains("line 1: expected at least 7 fields, found 2"));
    assert!(stdout.contains("line 3: invalid score \"bad\""));
}

#[test]
fn rust_log_enables_crate_debug_events() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("data.csv");
    std::fs::write(&input, "too\tfew\ng\tf\ty\ti\t2.0\ta\tb\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sts"))
        .arg("validate")
        .arg("--input")
        .arg(&input)
        .env("RUST_LOG", "sts_harness=debug")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("skipping row"), "stderr: {stderr}");

    let output = Command::new(env!("CARGO_BIN_EXE_sts"))
        .arg("validate")
        .arg("--input")
        .arg(&input)
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(!String::from_utf8_lossy(&output.stderr).contains("skipping row"));
}

#[test]
fn score_single_pair_lexically() {
    let output = Command::new(env!("CARGO_BIN_EXE_sts"))
        .args([
            "score",
            "--scorer",
            "lexical",
            "--sentence1",
            "the quick brown fox",
            "--sentence2",
            "the quick brown fox",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let score: f64 = String::from_utf8_lossy(&output.stdout).trim().parse().unwrap();
    assert!((score - 1.0).abs() < 1e-9);
}

#[test]
fn missing_input_file_fails() {
    let dir = tempdir().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_sts"))
        .arg("validate")
        .arg("--input")
        .arg(dir.path().join("missing.csv"))
        .status()
        .unwrap();
    assert!(!status.success());
}
