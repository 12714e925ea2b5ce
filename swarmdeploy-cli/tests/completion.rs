//! Tests for shell completion generation (`swarmdeploy completion bash|zsh|fish`).
//! Expected subcommands are derived from `swarmdeploy --help` so adding or
//! removing commands does not require updating this file.

use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;

/// Minimum number of visible subcommands in `swarmdeploy --help`.
const MIN_VISIBLE_SUBCOMMANDS: usize = 17;

fn swarmdeploy_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("swarmdeploy"))
}

/// Visible subcommand names parsed from the "Commands:" section of `--help`.
fn visible_subcommand_names() -> Vec<String> {
    let assert = swarmdeploy_cmd().arg("--help").assert().success();
    let stdout = std::str::from_utf8(&assert.get_output().stdout).unwrap();
    let mut names = Vec::new();
    let mut in_commands = false;
    for line in stdout.lines() {
        if line.trim() == "Commands:" {
            in_commands = true;
            continue;
        }
        if in_commands {
            if line.trim().is_empty() || line.starts_with("Options:") {
                break;
            }
            if let Some(first) = line.split_whitespace().next()
                && first != "help"
            {
                names.push(first.to_string());
            }
        }
    }
    assert!(
        names.contains(&"setup".to_string()),
        "parsed subcommands should include 'setup'; --help format may have changed"
    );
    assert!(
        names.len() >= MIN_VISIBLE_SUBCOMMANDS,
        "parsed {} subcommands from --help, expected at least {}",
        names.len(),
        MIN_VISIBLE_SUBCOMMANDS
    );
    names
}

#[rstest]
#[case("bash")]
#[case("zsh")]
#[case("fish")]
fn completion_contains_subcommands(#[case] shell: &str) {
    let expected = visible_subcommand_names();
    let assert = swarmdeploy_cmd()
        .args(["completion", shell])
        .assert()
        .success();
    let stdout = std::str::from_utf8(&assert.get_output().stdout).unwrap();
    assert!(!stdout.trim().is_empty());
    for sub in &expected {
        assert!(
            stdout.contains(sub),
            "{} completion script must contain subcommand '{}'",
            shell,
            sub
        );
    }
}

#[test]
fn completion_invalid_shell_fails() {
    swarmdeploy_cmd()
        .args(["completion", "invalid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn completion_not_shown_in_help() {
    let assert = swarmdeploy_cmd().arg("--help").assert().success();
    let stdout = std::str::from_utf8(&assert.get_output().stdout).unwrap();
    assert!(!stdout.contains("completion"));
}
