// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::{NamedTempFile, TempDir};

/// Command for the built binary, isolated from any config file on this machine
fn chunkagg_command(args: &[&str], home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chunkagg"));
    cmd.args(args)
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("CHUNKAGG_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Run chunkagg with given arguments and input via stdin
pub fn run_chunkagg_with_input(args: &[&str], input: &str) -> (String, String, i32) {
    let home = TempDir::new().expect("Failed to create temp dir");
    let mut child = chunkagg_command(args, home.path())
        .stdin(Stdio::piped())
        .spawn()
        .expect("Failed to start chunkagg");

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .expect("Failed to write to stdin");
    }

    let output = child.wait_with_output().expect("Failed to read output");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Run chunkagg over a temporary file holding `file_content`
pub fn run_chunkagg_with_file(args: &[&str], file_content: &str) -> (String, String, i32) {
    let temp_file = write_temp_csv(file_content);
    let mut full_args = args.to_vec();
    full_args.push(temp_file.path().to_str().unwrap());
    run_chunkagg(&full_args)
}

/// Run chunkagg with arguments only
pub fn run_chunkagg(args: &[&str]) -> (String, String, i32) {
    let home = TempDir::new().expect("Failed to create temp dir");
    let output = chunkagg_command(args, home.path())
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute chunkagg");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

pub fn write_temp_csv(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    temp_file.flush().expect("Failed to flush temp file");
    temp_file
}

/// Build an `id,name` table from names in order
pub fn names_csv(names: &[&str]) -> String {
    let mut out = String::from("id,name\n");
    for (i, name) in names.iter().enumerate() {
        out.push_str(&format!("{},{}\n", i + 1, name));
    }
    out
}

/// Extract "N" from the "Found N entries" line on stderr
pub fn extract_found_entries(stderr: &str) -> Option<usize> {
    stderr
        .lines()
        .find_map(|line| line.strip_prefix("Found "))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
}
