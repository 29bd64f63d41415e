//! End-to-end tests for the `commitfmt` binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const ID: &str = "9bedf67800b2923982bdf60c89c57ce6ce2d9a1c";

const COMMIT: &str = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
author A U Thor <author@example.com> 1112911993 -0700\n\
committer C O Mitter <committer@example.com> 1112912053 -0700\n\
\n\
Add the frobnicator\n\
\n\
It frobs.\n";

const SECOND: &str = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
parent 9bedf67800b2923982bdf60c89c57ce6ce2d9a1c\n\
author A U Thor <author@example.com> 1112912000 -0700\n\
committer A U Thor <author@example.com> 1112912000 -0700\n\
\n\
Fix the frobnicator\n";

fn commitfmt() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_commitfmt"));
    cmd.env_remove("COMMITFMT_CONFIG").env_remove("COMMITFMT_LOG");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn run_stdin(args: &[&str], input: &str) -> Output {
    let mut child = commitfmt()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_medium_from_stdin() {
    let out = stdout(&run_stdin(&["--id", ID], COMMIT));
    assert_eq!(
        out,
        format!(
            "commit {}\n\
Author: A U Thor <author@example.com>\n\
Date:   Thu Apr 7 15:13:13 2005 -0700\n\
\n\
\x20   Add the frobnicator\n\
\n\
\x20   It frobs.\n",
            ID
        )
    );
}

#[test]
fn test_missing_id_prints_zeros() {
    let out = stdout(&run_stdin(&["--format=%H"], COMMIT));
    assert_eq!(out, "0000000000000000000000000000000000000000\n");
}

#[test]
fn test_oneline_files() {
    let dir = TempDir::new().unwrap();
    let first = write(dir.path(), "first", COMMIT);
    let second = write(dir.path(), "second", SECOND);
    let output = commitfmt()
        .args(["--oneline", "--id", ID, "--id", "5d3c2ae0c4e6d1c1fd1c1f3c3a0a2c2d81f6a1f1"])
        .args([&first, &second])
        .output()
        .unwrap();
    assert_eq!(
        stdout(&output),
        "9bedf67 Add the frobnicator\n5d3c2ae Fix the frobnicator\n"
    );
}

#[test]
fn test_format_separates_and_tformat_terminates() {
    let dir = TempDir::new().unwrap();
    let first = write(dir.path(), "first", COMMIT);
    let second = write(dir.path(), "second", SECOND);

    let output = commitfmt()
        .args(["--format=format:%s", &first, &second])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "Add the frobnicator\nFix the frobnicator");

    let output = commitfmt()
        .args(["--pretty=tformat:%s", &first, &second])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "Add the frobnicator\nFix the frobnicator\n");
}

#[test]
fn test_email_has_mbox_line() {
    let out = stdout(&run_stdin(&["--format=email", "--id", ID], COMMIT));
    assert!(out.starts_with(&format!(
        "From {} Mon Sep 17 00:00:00 2001\nFrom: A U Thor <author@example.com>\n",
        ID
    )));
    assert!(out.contains("\nSubject: [PATCH] Add the frobnicator\n"));
}

#[test]
fn test_date_and_abbrev_flags() {
    let out = stdout(&run_stdin(
        &["--format=%h %ad", "--date=short", "--abbrev=10", "--id", ID],
        COMMIT,
    ));
    assert_eq!(out, "9bedf67800 2005-04-07\n");
}

#[test]
fn test_color_always() {
    let out = stdout(&run_stdin(&["--format=short", "--color=always", "--id", ID], COMMIT));
    assert!(out.starts_with(&format!("\x1b[33mcommit {}\x1b[m\n", ID)));

    let out = stdout(&run_stdin(&["--format=%Cred%s", "--color=never"], COMMIT));
    assert_eq!(out, "Add the frobnicator\n");
}

#[test]
fn test_decorations() {
    let out = stdout(&run_stdin(
        &["--oneline", "--decorate", "HEAD -> main", "--id", ID],
        COMMIT,
    ));
    assert_eq!(out, "9bedf67 (HEAD -> main) Add the frobnicator\n");
}

#[test]
fn test_config_file_aliases() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "commitfmt.yaml",
        "format: lg\ndate: iso\naliases:\n  lg: \"%an %ad\"\n",
    );
    let output = run_with_env(&config, &[]);
    assert_eq!(stdout(&output), "A U Thor 2005-04-07 15:13:13 -0700\n");

    // Flags override configuration.
    let output = run_with_env(&config, &["--date=unix"]);
    assert_eq!(stdout(&output), "A U Thor 1112911993\n");
}

fn run_with_env(config: &str, args: &[&str]) -> Output {
    let mut child = commitfmt()
        .env("COMMITFMT_CONFIG", config)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(COMMIT.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_unknown_format_fails() {
    let output = run_stdin(&["--format=fancy"], COMMIT);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown commit format 'fancy'"), "{}", stderr);
}

#[test]
fn test_template_error_prints_nothing() {
    let output = run_stdin(&["--format=%s %Q"], COMMIT);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown directive '%Q'"));
}

#[test]
fn test_bad_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "bad.yaml", "colour: always\n");
    let output = commitfmt()
        .args(["--config", &config, "--oneline"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("loading configuration"));
}
