use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("reviewbot").unwrap()
}

const VALID_CONFIG: &str = r#"
commands_endpoint = "https://example.com/commands"
doc = "See the review process description."

[[config_items]]
repos = ["myorg"]
cla_label = "cla/yes"

[config_items.ci]
no_ci = true
"#;

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("review trigger bot"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("reviewbot"));
}

#[test]
fn check_valid_config() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();

    cmd()
        .args(["--config", path.to_str().unwrap(), "--check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration ok"));
}

#[test]
fn check_missing_config_fails() {
    cmd()
        .args(["--config", "/nonexistent/config.toml", "--check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn check_invalid_config_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
commands_endpoint = "https://example.com/commands"
doc = "doc"

[[config_items]]
repos = ["myorg"]
cla_label = "cla/yes"
[config_items.ci]
no_ci = true
[config_items.owner]
branch_with_owners = ["master"]
branch_without_owners = "^release-.*"
"#,
    )
    .unwrap();

    cmd()
        .args(["--config", path.to_str().unwrap(), "--check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mutually exclusive"));
}
