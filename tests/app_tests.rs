//! Tests driving the application entry point the way `main` does.

use clap::Parser;
use dupwalk::cli::Cli;
use dupwalk::error::ExitCode;
use std::fs;
use tempfile::TempDir;

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("dupwalk").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_run_app_writes_session_logs() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    fs::create_dir_all(data.join("x")).unwrap();
    fs::create_dir_all(data.join("y")).unwrap();
    fs::write(data.join("x").join("a"), b"same").unwrap();
    fs::write(data.join("y").join("a"), b"same").unwrap();
    let session = dir.path().join("nested").join("session");

    let code = dupwalk::run_app(cli(&[
        data.to_str().unwrap(),
        "--temp-datadir",
        session.to_str().unwrap(),
        "--output",
        "json",
        "-q",
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(session.join("file_walk.txt").exists());
    assert_eq!(fs::read_to_string(session.join("sizes.txt")).unwrap(), "4\n4\n");
    assert_eq!(
        fs::read_to_string(session.join("hashes.txt")).unwrap().lines().count(),
        2
    );
}

#[test]
fn test_run_app_without_roots_or_walk_log_fails() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session");

    let err = dupwalk::run_app(cli(&["--temp-datadir", session.to_str().unwrap(), "-q"]))
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.starts_with("file walk failed"), "{message}");
    assert!(message.contains("file_walk.txt"));
}

#[test]
fn test_run_app_reports_corrupt_walk_log() {
    let dir = TempDir::new().unwrap();
    let session = dir.path().join("session");
    fs::create_dir_all(&session).unwrap();
    fs::write(session.join("file_walk.txt"), "orphan\n/abs\n").unwrap();

    let err = dupwalk::run_app(cli(&["--temp-datadir", session.to_str().unwrap(), "-q"]))
        .unwrap_err();

    assert!(format!("{err:#}").contains("line 1"));
}
