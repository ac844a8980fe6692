use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn check_cmd() -> Command {
    Command::cargo_bin("check-s3-bucket-visibility").unwrap()
}

#[test]
fn help_lists_options() {
    check_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--bucket-names"))
        .stdout(predicate::str::contains("--critical-on-missing"))
        .stdout(predicate::str::contains("--aws-region"));
}

#[test]
fn no_buckets_is_unknown() {
    check_cmd()
        .assert()
        .code(3)
        .stdout(predicate::str::starts_with("CheckS3BucketVisibility UNKNOWN:"))
        .stdout(predicate::str::contains("--bucket-names"));
}

#[test]
fn blank_bucket_list_is_unknown() {
    check_cmd()
        .args(["--bucket-names", " , "])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("bucket list is empty"));
}

#[test]
fn unreadable_config_is_unknown() {
    check_cmd()
        .args(["--file", "does-not-exist.yml"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("read config does-not-exist.yml"));
}

#[test]
fn bad_arguments_are_unknown_not_critical() {
    check_cmd()
        .arg("--no-such-flag")
        .assert()
        .code(3)
        .stdout(predicate::str::contains("UNKNOWN: invalid arguments"));
}
