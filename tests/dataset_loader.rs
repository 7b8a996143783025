use std::io::Write;

use sts_harness::dataset::{load_sts_file, DatasetError, SkipReason};
use tempfile::NamedTempFile;

fn write_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_aligned_columns_and_counts_skips() {
    let file = write_file(concat!(
        "main-captions\tMSRvid\t2012test\t0000\t5.000\tA girl is styling her hair.\tA girl is brushing her hair.\n",
        "short\trow\n",
        "main-captions\tMSRvid\t2012test\t0002\tn/a\tA man plays.\tA man sings.\n",
        "main-news\theadlines\t2013\t0003\t 1.5 \tStocks fall.\tMarkets drop.\tsource-a\tsource-b\n",
        "\n",
        "main-forums\tdeft\t2014\t0004\t0.0\t\t\n",
    ));

    let loaded = load_sts_file(file.path(), '\t').unwrap();
    let split = &loaded.split;

    assert_eq!(loaded.report.rows_read, 6);
    assert_eq!(split.len(), 3);
    assert_eq!(split.sentences1().count(), split.len());
    assert_eq!(split.sentences2().count(), split.len());
    assert_eq!(split.ground_truth(), vec![5.0, 1.5, 0.0]);

    // Empty sentences are kept, trailing fields ignored.
    assert_eq!(split.records()[2].sentence1, "");
    assert_eq!(split.records()[1].sentence2, "Markets drop.");

    let skipped: Vec<(usize, &SkipReason)> = loaded
        .report
        .skipped
        .iter()
        .map(|s| (s.line, &s.reason))
        .collect();
    assert_eq!(
        skipped,
        vec![
            (2, &SkipReason::TooFewFields { found: 2 }),
            (
                3,
                &SkipReason::InvalidScore {
                    value: "n/a".to_string()
                }
            ),
            (5, &SkipReason::TooFewFields { found: 0 }),
        ]
    );
}

#[test]
fn custom_delimiter() {
    let file = write_file("g|f|y|i|2.5|one|two\n");
    let loaded = load_sts_file(file.path(), '|').unwrap();
    assert_eq!(loaded.split.len(), 1);
    assert_eq!(loaded.split.records()[0].ground_truth, 2.5);

    // Same file under the default tab delimiter has a single field per row.
    let loaded = load_sts_file(file.path(), '\t').unwrap();
    assert!(loaded.split.is_empty());
}

#[test]
fn missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_sts_file(dir.path().join("nope.csv"), '\t').unwrap_err();
    match err {
        DatasetError::Io { path, .. } => assert!(path.ends_with("nope.csv")),
    }
}

#[test]
fn crlf_line_endings_are_tolerated() {
    let file = write_file("g\tf\ty\ti\t3.0\tone\ttwo\r\n");
    let loaded = load_sts_file(file.path(), '\t').unwrap();
    assert_eq!(loaded.split.len(), 1);
    assert_eq!(loaded.split.records()[0].sentence2, "two");
}
