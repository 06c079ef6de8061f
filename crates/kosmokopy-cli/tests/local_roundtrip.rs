use std::fs;
use std::process::{Command, Stdio};
use tempfile::tempdir;

fn kosmokopy_bin() -> &'static str {
    env!("CARGO_BIN_EXE_kosmokopy")
}

fn run(args: &[&str]) -> (std::process::ExitStatus, String, String) {
    let output = Command::new(kosmokopy_bin())
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("spawn kosmokopy");
    (
        output.status,
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
fn copies_a_tree_and_reports_finished() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"hello").unwrap();

    let (status, stdout, _stderr) = run(&[
        "--cli",
        "--src",
        src.path().to_str().unwrap(),
        "--dst",
        dst.path().to_str().unwrap(),
    ]);

    assert!(status.success());
    let report: serde_json::Value = serde_json::from_str(stdout.trim()).expect("one json line");
    assert_eq!(report["status"], "finished");
    assert_eq!(report["copied"], 1);
    assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), b"hello");
}

#[test]
fn missing_cli_flag_is_a_usage_error() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();

    let (status, _stdout, stderr) = run(&[
        "--src",
        src.path().to_str().unwrap(),
        "--dst",
        dst.path().to_str().unwrap(),
    ]);

    assert!(!status.success());
    assert!(stderr.contains("--cli"));
}

#[test]
fn missing_src_is_reported_as_a_json_error_report() {
    let dst = tempdir().unwrap();

    let (status, stdout, _stderr) = run(&["--cli", "--dst", dst.path().to_str().unwrap()]);

    assert!(!status.success());
    let report: serde_json::Value = serde_json::from_str(stdout.trim()).expect("one json line");
    assert_eq!(report["status"], "error");
    assert!(report["message"].as_str().unwrap().contains("--src"));
}

#[test]
fn conflict_skip_leaves_existing_file_untouched() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"new").unwrap();
    fs::write(dst.path().join("a.txt"), b"old").unwrap();

    let (status, stdout, _) = run(&[
        "--cli",
        "--src",
        src.path().to_str().unwrap(),
        "--dst",
        dst.path().to_str().unwrap(),
    ]);

    assert!(status.success());
    let report: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(report["copied"], 0);
    assert_eq!(report["skipped"].as_array().unwrap().len(), 1);
    assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), b"old");
}
