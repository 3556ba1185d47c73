use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_astctl"))
}

/// Command with HOME and XDG dirs pointed at a temp dir so tests never touch
/// real user state
fn sandboxed(temp: &TempDir) -> Command {
    let mut cmd = cmd();
    cmd.env("HOME", temp.path())
        .env("XDG_DATA_HOME", temp.path().join("data"))
        .env("XDG_CONFIG_HOME", temp.path().join("config"))
        .env("XDG_CACHE_HOME", temp.path().join("cache"));
    cmd
}

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "astctl maps subcommands to REST operations",
        ));
}

#[test]
fn test_cli_version() {
    let expected = format!("astctl {}", env!("CARGO_PKG_VERSION"));
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
}

#[test]
fn test_fod_help() {
    cmd()
        .arg("fod")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sessions, releases"));
}

#[test]
fn test_fod_session_help() {
    cmd()
        .args(["fod", "session", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("login"));
}

#[test]
fn test_fod_mast_scan_setup_help() {
    cmd()
        .args(["fod", "mast-scan", "setup", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--assessment-type"))
        .stdout(predicate::str::contains("--entitlement-id"))
        .stdout(predicate::str::contains("--skip-if-exists"));
}

#[test]
fn test_ssc_help() {
    cmd()
        .arg("ssc")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("attribute definitions"));
}

#[test]
fn test_ssc_attribute_definition_list_help() {
    cmd()
        .args(["ssc", "attribute-definition", "list", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--category"))
        .stdout(predicate::str::contains("--guid"));
}

#[test]
fn test_sc_sast_help() {
    cmd()
        .arg("sc-sast")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sessions"));
}

#[test]
fn test_tool_help() {
    cmd()
        .arg("tool")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Install"));
}

#[test]
fn test_tool_install_help() {
    cmd()
        .args(["tool", "install", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--with-jre"))
        .stdout(predicate::str::contains("--on-digest-mismatch"));
}

#[test]
fn test_config_help() {
    cmd()
        .arg("config")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration"));
}

#[test]
fn test_json_output_format_accepted() {
    cmd()
        .args(["--format", "json", "--help"])
        .assert()
        .success();
}

#[test]
fn test_ci_flag_accepted() {
    cmd().args(["--ci", "--help"]).assert().success();
}

#[test]
fn test_config_path_subcommand() {
    let temp = TempDir::new().unwrap();
    sandboxed(&temp)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Search order"));
}

#[test]
fn test_config_var_round_trip() {
    let temp = TempDir::new().unwrap();

    sandboxed(&temp)
        .args(["config", "var", "set", "release-id", "4711"])
        .assert()
        .success();

    sandboxed(&temp)
        .args(["config", "var", "get", "release-id"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4711"));

    sandboxed(&temp)
        .args(["config", "var", "delete", "release-id"])
        .assert()
        .success();
}

#[test]
fn test_session_list_without_sessions() {
    let temp = TempDir::new().unwrap();
    sandboxed(&temp)
        .args(["ssc", "session", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions stored"));
}

#[test]
fn test_malformed_release_reference_fails() {
    let temp = TempDir::new().unwrap();
    sandboxed(&temp)
        .args([
            "fod",
            "assessment-type",
            "list",
            "--release",
            "a:b:c:d",
            "--scan-type",
            "mobile",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Release must be specified as"));
}

#[test]
fn test_missing_session_names_login_command() {
    let temp = TempDir::new().unwrap();
    sandboxed(&temp)
        .args(["fod", "release", "list", "--session", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No fod session found"));
}

#[test]
fn test_tool_uninstall_unknown_fails() {
    let temp = TempDir::new().unwrap();
    sandboxed(&temp)
        .args(["tool", "uninstall", "sc-client", "--version", "9.9.9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not installed"));
}
