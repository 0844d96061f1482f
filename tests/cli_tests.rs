mod common;
use common::*;
use std::fs::File;
use std::io::Write;
use tempfile::TempDir;

#[test]
fn test_default_output() {
    let (stdout, stderr, exit_code) =
        run_chunkagg_with_file(&["-c", "2", "-t", "2"], &names_csv(&["A", "B", "A"]));

    assert_eq!(exit_code, 0, "stderr: {}", stderr);
    assert_eq!(stdout, "Top 2 by name:\n1. A: 2 messages\n2. B: 1 messages\n");
    assert_eq!(extract_found_entries(&stderr), Some(2));
    assert!(stderr.contains(" seconds"));
}

#[test]
fn test_ties_are_ordered_by_key() {
    let (stdout, _stderr, exit_code) =
        run_chunkagg_with_file(&["-c", "1", "-j", "3"], &names_csv(&["c", "b", "a", "b", "c", "a"]));

    assert_eq!(exit_code, 0);
    assert_eq!(
        stdout,
        "Top 3 by name:\n1. a: 2 messages\n2. b: 2 messages\n3. c: 2 messages\n"
    );
}

#[test]
fn test_json_output() {
    let (stdout, _stderr, exit_code) =
        run_chunkagg_with_file(&["-F", "json"], &names_csv(&["A", "B", "A"]));

    assert_eq!(exit_code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(
        parsed,
        serde_json::json!([
            {"rank": 1, "key": "A", "count": 2},
            {"rank": 2, "key": "B", "count": 1}
        ])
    );
}

#[test]
fn test_csv_output() {
    let (stdout, _stderr, exit_code) =
        run_chunkagg_with_file(&["-F", "csv", "-t", "1"], &names_csv(&["A", "B", "A"]));

    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "rank,key,count\n1,A,2\n");
}

#[test]
fn test_reads_stdin() {
    let (stdout, _stderr, exit_code) =
        run_chunkagg_with_input(&["-g", "sender", "-"], "sender,subject\nann,hi\nbob,yo\nann,re\n");

    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "Top 2 by sender:\n1. ann: 2 messages\n2. bob: 1 messages\n");
}

#[test]
fn test_tab_delimiter() {
    let (stdout, _stderr, exit_code) =
        run_chunkagg_with_input(&["-d", "tab", "-"], "id\tname\n1\tx\n2\tx\n");

    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "Top 1 by name:\n1. x: 2 messages\n");
}

#[test]
fn test_empty_input_after_header() {
    let (stdout, stderr, exit_code) = run_chunkagg_with_file(&[], "id,name\n");

    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "Top 0 by name:\n");
    assert_eq!(extract_found_entries(&stderr), Some(0));
}

#[test]
fn test_stats_flag() {
    let (_stdout, stderr, exit_code) =
        run_chunkagg_with_file(&["--stats", "-c", "2"], &names_csv(&["A", "B", "A"]));

    assert_eq!(exit_code, 0);
    assert!(stderr.contains("Records processed: 3 total in 2 chunks"), "stderr: {}", stderr);
    assert!(stderr.contains("Phases: dispatch"));
}

#[test]
fn test_gzip_input() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("names.csv.gz");
    let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    encoder
        .write_all(names_csv(&["A", "B", "A"]).as_bytes())
        .unwrap();
    encoder.finish().unwrap();

    let (stdout, _stderr, exit_code) = run_chunkagg(&[path.to_str().unwrap()]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "Top 2 by name:\n1. A: 2 messages\n2. B: 1 messages\n");
}

#[test]
fn test_zstd_input() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("names.csv.zst");
    let compressed = zstd::encode_all(names_csv(&["Z", "Z"]).as_bytes(), 0).unwrap();
    std::fs::write(&path, compressed).unwrap();

    let (stdout, _stderr, exit_code) = run_chunkagg(&[path.to_str().unwrap()]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "Top 1 by name:\n1. Z: 2 messages\n");
}

#[test]
fn test_unknown_group_field_is_usage_error() {
    let (stdout, stderr, exit_code) =
        run_chunkagg_with_file(&["-g", "email"], &names_csv(&["A"]));

    assert_eq!(exit_code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("configuration error"), "stderr: {}", stderr);
    assert!(stderr.contains("available: id, name"));
}

#[test]
fn test_zero_chunk_size_is_usage_error() {
    let (_stdout, stderr, exit_code) = run_chunkagg_with_file(&["-c", "0"], &names_csv(&["A"]));
    assert_eq!(exit_code, 2);
    assert!(stderr.contains("chunk size"));
}

#[test]
fn test_zero_threads_is_usage_error() {
    let (_stdout, _stderr, exit_code) = run_chunkagg_with_file(&["-j", "0"], &names_csv(&["A"]));
    assert_eq!(exit_code, 2);
}

#[test]
fn test_invalid_timeout_is_rejected() {
    let (_stdout, _stderr, exit_code) =
        run_chunkagg_with_file(&["--timeout", "soon"], &names_csv(&["A"]));
    assert_eq!(exit_code, 2);
}

#[test]
fn test_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.csv");

    let (stdout, stderr, exit_code) = run_chunkagg(&[missing.to_str().unwrap()]);
    assert_eq!(exit_code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("failed to read"), "stderr: {}", stderr);
}

#[test]
fn test_malformed_record_fails_without_output() {
    let mut input = names_csv(&["A"; 10]);
    input.push_str("11,A,surplus\n");

    let (stdout, stderr, exit_code) = run_chunkagg_with_file(&["-c", "4"], &input);
    assert_eq!(exit_code, 1);
    assert!(stdout.is_empty(), "no partial ranking may be printed");
    assert!(stderr.contains("chunk 2 at record 11"), "stderr: {}", stderr);
}

#[test]
fn test_config_file_sets_defaults() {
    let rc = write_temp_csv("top = 1\ngroup_by = sender\n");
    let data = write_temp_csv("sender\nann\nbob\nann\n");

    let (stdout, _stderr, exit_code) = run_chunkagg(&[
        "--config-file",
        rc.path().to_str().unwrap(),
        data.path().to_str().unwrap(),
    ]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "Top 1 by sender:\n1. ann: 2 messages\n");
}

#[test]
fn test_flags_override_config_file() {
    let rc = write_temp_csv("top = 1\n");
    let data = write_temp_csv(&names_csv(&["A", "B", "A"]));

    let (stdout, _stderr, exit_code) = run_chunkagg(&[
        "--config-file",
        rc.path().to_str().unwrap(),
        "-t",
        "5",
        data.path().to_str().unwrap(),
    ]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "Top 2 by name:\n1. A: 2 messages\n2. B: 1 messages\n");
}

#[test]
fn test_malformed_config_file_is_usage_error() {
    let rc = write_temp_csv("chunk_size = many\n");
    let data = write_temp_csv(&names_csv(&["A"]));

    let (_stdout, stderr, exit_code) = run_chunkagg(&[
        "--config-file",
        rc.path().to_str().unwrap(),
        data.path().to_str().unwrap(),
    ]);
    assert_eq!(exit_code, 2);
    assert!(stderr.contains("chunk_size"));
}

#[test]
fn test_user_config_is_ignored_on_request() {
    // The helpers point HOME at an empty directory, so only --config-file can supply settings
    let data = write_temp_csv(&names_csv(&["A", "B"]));
    let (stdout, _stderr, exit_code) =
        run_chunkagg(&["--ignore-config", "-t", "1", data.path().to_str().unwrap()]);
    assert_eq!(exit_code, 0);
    assert_eq!(stdout, "Top 1 by name:\n1. A: 1 messages\n");
}
