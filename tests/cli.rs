use assert_cmd::Command;
use predicates::prelude::*;

fn xcron() -> Command {
    Command::cargo_bin("xcron").unwrap()
}

const FROM: &str = "2022-12-31T23:59:59Z";

// ============================================================
// Basic expressions
// ============================================================

#[test]
fn test_basic_expression() {
    xcron()
        .args(["--from", FROM, "0 30 9 * * ? *"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2023-01-01T09:30:00"));
}

#[test]
fn test_five_field_expression() {
    xcron()
        .args(["--from", FROM, "*/15 * * * *"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2023-01-01T00:00:00"));
}

#[test]
fn test_leap_day() {
    xcron()
        .args(["--from", FROM, "0 0 0 29 2 ? *"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-02-29T00:00:00"));
}

#[test]
fn test_macro_expression() {
    xcron()
        .args(["--from", FROM, "@monthly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2023-01-01T00:00:00"));
}

#[test]
fn test_nth_weekday_expression() {
    xcron()
        .args(["--from", FROM, "0 0 12 ? * FRI#3 *"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2023-01-20T12:00:00"));
}

#[test]
fn test_zoned_from() {
    xcron()
        .args(["--from", "2023-06-01T08:00:00+02:00[+02:00]", "0 30 9 * * ? *"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2023-06-01T09:30:00+02:00"));
}

// ============================================================
// Flags
// ============================================================

#[test]
fn test_n_flag() {
    xcron()
        .args(["-n", "3", "--from", FROM, "0 0 0 1 * ? *"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2023-01-01T00:00:00"))
        .stdout(predicate::str::contains("2023-02-01T00:00:00"))
        .stdout(predicate::str::contains("2023-03-01T00:00:00"));
}

#[test]
fn test_check_valid() {
    xcron()
        .args(["--check", "0 0 0 L * ? *"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn test_check_invalid() {
    xcron().args(["--check", "0 0 25 * * *"]).assert().failure();
}

#[test]
fn test_parse_json() {
    xcron()
        .args(["--parse", "0 0 0 15W * ? 2022"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"expression\""))
        .stdout(predicate::str::contains("\"day-of-month\""))
        .stdout(predicate::str::contains("\"W\""));
}

#[test]
fn test_canonical() {
    xcron()
        .args(["--canonical", "0 0 9-17 * * MON-FRI"])
        .assert()
        .success()
        .stdout("0 0 9-17 * * 1-5 *\n");
}

#[test]
fn test_canonical_reboot() {
    xcron()
        .args(["--canonical", "@reboot"])
        .assert()
        .success()
        .stdout("@reboot\n");
}

#[test]
fn test_single_field() {
    xcron()
        .args(["--field", "day-of-week", "MON-FRI,5L"])
        .assert()
        .success()
        .stdout("[{\"tag\":\"L\",\"values\":[5]},[1,2,3,4,5]]\n");
}

#[test]
fn test_unknown_field_name() {
    xcron()
        .args(["--field", "weeks", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported field kind given: 'weeks'"));
}

// ============================================================
// Output formats
// ============================================================

#[test]
fn test_json_output() {
    xcron()
        .args(["-n", "3", "--json", "--from", FROM, "@daily"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["));
}

#[test]
fn test_no_upcoming_occurrences() {
    xcron()
        .args(["--from", FROM, "1 1 1 1 1 ? 2020-2022"])
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("no-matches"));
}

#[test]
fn test_reboot_reports_once() {
    xcron()
        .args(["--from", FROM, "@reboot"])
        .assert()
        .success()
        .stderr(predicate::str::contains("once-exec"));
}

#[test]
fn test_watch_reboot() {
    xcron()
        .args(["--watch", "@reboot"])
        .assert()
        .success()
        .stdout("once-exec\n");
}

#[test]
fn test_watch_exhausted_schedule() {
    xcron()
        .args(["--watch", "0 0 0 1 1 ? 1970"])
        .assert()
        .success()
        .stdout("no-matches\n");
}

#[cfg(unix)]
#[test]
fn test_run_once() {
    let marker = std::env::temp_dir().join(format!("xcron-cli-run-{}", std::process::id()));
    let _ = std::fs::remove_file(&marker);

    xcron()
        .args(["--run", &format!("touch {}", marker.display()), "@reboot"])
        .assert()
        .success();

    assert!(marker.exists());
    let _ = std::fs::remove_file(&marker);
}

// ============================================================
// Error cases
// ============================================================

#[test]
fn test_no_expression() {
    xcron().assert().failure().code(2);
}

#[test]
fn test_invalid_field_count() {
    xcron()
        .arg("* * *")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid expression given '* * *'"))
        .stderr(predicate::str::contains("expected 5, 6 or 7 fields, got 3"));
}

#[test]
fn test_invalid_value_is_underlined() {
    xcron()
        .arg("0 0 25 * * *")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "invalid value in field 'hours' given: '25'",
        ))
        .stderr(predicate::str::contains("^^"));
}

#[test]
fn test_unsupported_macro() {
    xcron()
        .arg("@fortnightly")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported macro given '@fortnightly'"));
}

#[test]
fn test_impossible_schedule() {
    xcron()
        .arg("1 1 1 ? 1 ? *")
        .assert()
        .failure()
        .stderr(predicate::str::contains("will never run"));
}

#[test]
fn test_zero_occurrences_is_usage_error() {
    xcron()
        .args(["-n", "0", "--from", FROM, "@daily"])
        .assert()
        .failure()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("-n must be at least 1"));
}

#[test]
fn test_invalid_from() {
    xcron()
        .args(["--from", "yesterday", "@daily"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_empty_run_command() {
    xcron()
        .args(["--run", " ", "@daily"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid command given"));
}
