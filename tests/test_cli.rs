//! Integration tests for the `toolrun` binary
//!
//! Each test runs in a fresh temp directory containing `.git`, so config
//! discovery never escapes into the surrounding filesystem.

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    dir
}

fn toolrun(cwd: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("toolrun"));
    cmd.current_dir(cwd)
        .env_remove("TOOLRUN_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn write_config(root: &Path, content: &str) {
    let dir = root.join(".toolrun");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), content).unwrap();
}

#[test]
fn delta_dry_run_prints_command_line() {
    let ws = workspace();
    let movie = ws.path().join("movie");
    let expected = format!(
        "delta run min_cell_area=0 -c 2D --progress --input {dir}/img-t{{t}}.tif --output {dir}/results",
        dir = movie.display()
    );

    toolrun(ws.path())
        .args(["delta", "--dry-run"])
        .arg(&movie)
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
}

#[test]
fn delta_dry_run_uses_min_cell_area_flag() {
    let ws = workspace();
    toolrun(ws.path())
        .args(["delta", "movie", "-C", "20", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("delta run min_cell_area=20 -c 2D"));
}

#[test]
fn delta_dry_run_reads_config_file() {
    let ws = workspace();
    write_config(
        ws.path(),
        r#"
[tool]
conda_env = "delta_env"

[arguments]
MIN_CELL_AREA = 7
"#,
    );

    toolrun(ws.path())
        .args(["delta", "movie", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "conda run --no-capture-output -n delta_env delta run min_cell_area=7 ",
        ));
}

#[test]
fn delta_save_persists_arguments() {
    let ws = workspace();
    toolrun(ws.path())
        .args(["delta", "movie", "-C", "12", "--dry-run", "--save"])
        .assert()
        .success();

    let saved = fs::read_to_string(ws.path().join(".toolrun").join("config.toml")).unwrap();
    assert!(saved.contains("[arguments]"));
    assert!(saved.contains("MIN_CELL_AREA = 12"));

    toolrun(ws.path())
        .args(["delta", "movie", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("min_cell_area=12"));
}

#[test]
fn delta_missing_directory_is_cli_error() {
    let ws = workspace();
    toolrun(ws.path())
        .args(["delta", "does-not-exist"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Input directory not found"));
}

#[test]
fn delta_missing_executable_is_launch_failure() {
    let ws = workspace();
    let movie = ws.path().join("movie");
    fs::create_dir(&movie).unwrap();
    fs::write(movie.join("img-t0.tif"), b"frame").unwrap();

    toolrun(ws.path())
        .args(["delta", "movie", "--delta-command", "/nonexistent/bin/delta-4f1c run"])
        .assert()
        .code(127)
        .stderr(predicate::str::contains("Problem running delta-4f1c"));
}

#[test]
fn config_shows_sources() {
    let ws = workspace();
    write_config(ws.path(), "[runner]\npoll_interval_ms = 50\n");

    toolrun(ws.path())
        .args(["config", "--timeout", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("poll_interval_ms = 50  [config file ("))
        .stdout(predicate::str::contains("timeout_secs = 30  [CLI]"))
        .stdout(predicate::str::contains("kill_grace_ms = 5000  [defaults]"));
}

#[test]
fn invalid_config_is_cli_error() {
    let ws = workspace();
    write_config(ws.path(), "[runner]\ntimeout_secs = 0\n");

    toolrun(ws.path())
        .arg("config")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("timeout_secs"));
}

#[test]
fn exec_requires_command() {
    let ws = workspace();
    toolrun(ws.path())
        .args(["exec", "--units", "3"])
        .assert()
        .code(2);
}

#[test]
fn exec_dry_run_prints_tokens() {
    let ws = workspace();
    toolrun(ws.path())
        .args(["exec", "--dry-run", "--", "python", "train.py", "--epochs", "3"])
        .assert()
        .success()
        .stdout("python train.py --epochs 3\n");
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn exec_reports_progress_and_output() {
        let ws = workspace();
        toolrun(ws.path())
            .args(["exec", "--units", "3", "--log", "run.log", "--", "sh", "-c"])
            .arg("for i in 1 2 3; do echo \"image $i/3\"; done; echo hello")
            .assert()
            .success()
            .stderr(predicate::str::contains("100%"))
            .stderr(predicate::str::contains(" - hello"));

        let log = fs::read_to_string(ws.path().join("run.log")).unwrap();
        assert!(log.contains("image 3/3"));
    }

    #[test]
    fn exec_default_log_location() {
        let ws = workspace();
        toolrun(ws.path())
            .args(["exec", "--", "sh", "-c", "echo written"])
            .assert()
            .success();

        let log = fs::read_to_string(ws.path().join("toolrun.log")).unwrap();
        assert_eq!(log, "written\n");
    }

    #[test]
    fn exec_failure_is_tool_failure() {
        let ws = workspace();
        toolrun(ws.path())
            .args(["exec", "--", "sh", "-c", "echo broken; exit 4"])
            .assert()
            .code(70)
            .stderr(predicate::str::contains("broken"));
    }

    #[test]
    fn exec_failure_accepted_without_exit_check() {
        let ws = workspace();
        toolrun(ws.path())
            .args(["--no-check-exit-code", "exec", "--", "sh", "-c", "exit 4"])
            .assert()
            .success();
    }

    #[test]
    fn exec_missing_program_is_launch_failure() {
        let ws = workspace();
        toolrun(ws.path())
            .args(["exec", "--", "/nonexistent/bin/tool-4f1c"])
            .assert()
            .code(127);
    }

    #[test]
    fn exec_non_executable_is_permission_denied() {
        let ws = workspace();
        let script = ws.path().join("tool.sh");
        fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();

        toolrun(ws.path())
            .args(["exec", "--"])
            .arg(&script)
            .assert()
            .code(126)
            .stderr(predicate::str::contains("file permission to run"));
    }

    #[test]
    fn exec_timeout() {
        let ws = workspace();
        toolrun(ws.path())
            .args(["--timeout", "1", "exec", "--", "sleep", "30"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("did not finish within 1 seconds"));
    }
}
