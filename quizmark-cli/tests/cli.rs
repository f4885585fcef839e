use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("quizmark-parser")
        .join("tests")
        .join("fixtures")
        .join(name)
}

const SINGLE: &str = "# Q001 Powerhouse
^type multiple_choice_single
^identifier Q001
^points 1
^labels #Remember #Easy

@field: question_text
Which organelle produces ATP?
@end_field

@field: options
A. Nucleus
B. Mitochondrion
C. Ribosome
@end_field

@field: answer
B
@end_field

@field: feedback
@@field: general_feedback
Mitochondria make ATP.
@@end_field
@@field: correct_feedback
Mitochondria make ATP.
@@end_field
@@field: incorrect_feedback
Mitochondria make ATP.
@@end_field
@@field: unanswered_feedback
Mitochondria make ATP.
@@end_field
@end_field
";

#[test]
fn validate_accepts_the_complete_fixture() {
    let mut cmd = cargo_bin_cmd!("quizmark");
    cmd.arg("validate").arg(fixture_path("complete.md"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("16 question(s), 0 error(s)"));
}

#[test]
fn validate_reports_missing_points() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quiz.md");
    fs::write(&path, SINGLE.replace("^points 1\n", "")).unwrap();

    let mut cmd = cargo_bin_cmd!("quizmark");
    cmd.arg("validate").arg(&path);
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("missing-points").and(predicate::str::contains("Q001")));
}

#[test]
fn validate_json_is_machine_readable() {
    let mut cmd = cargo_bin_cmd!("quizmark");
    cmd.arg("validate").arg(fixture_path("complete.md")).arg("--json");
    let output = cmd.assert().success().get_output().stdout.clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["valid"], serde_json::Value::Bool(true));
    assert_eq!(report["totals"]["questions"], 16);
}

#[test]
fn missing_file_is_a_usage_error() {
    let mut cmd = cargo_bin_cmd!("quizmark");
    cmd.arg("validate").arg("does-not-exist.md");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn convert_writes_the_package() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("bio.zip");

    let mut cmd = cargo_bin_cmd!("quizmark");
    cmd.arg("convert").arg(fixture_path("complete.md")).arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("wrote").and(predicate::str::contains("16 item(s)")));
    assert!(output.exists());
}

#[test]
fn convert_refuses_an_invalid_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quiz.md");
    fs::write(&path, SINGLE.replace("^points 1\n", "")).unwrap();

    let mut cmd = cargo_bin_cmd!("quizmark");
    cmd.arg("convert").arg(&path);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("nothing written"));
    assert!(!dir.path().join("quiz.zip").exists());
}

#[test]
fn fix_rewrites_legacy_metadata_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quiz.md");
    fs::write(
        &path,
        SINGLE.replace("^type multiple_choice_single", "^type: multiple_choice_single"),
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("quizmark");
    cmd.arg("fix").arg(&path).arg("--write");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("valid"));

    let fixed = fs::read_to_string(&path).unwrap();
    assert!(fixed.contains("^type multiple_choice_single"));
    assert!(!fixed.contains("^type:"));
}
