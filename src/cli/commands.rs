//! Command implementations

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::args::{DeltaArgs, ExecArgs};
use super::console::ConsoleSink;
use crate::delta::{DeltaCli, DeltaRun};
use crate::error::ToolrunError;
use toolrun_args::Invocation;
use toolrun_config::{CONFIG_DIR, CONFIG_FILE, Config};
use toolrun_runner::{RunOutcome, RunnerOptions, ToolRunner};

/// Log file used by `exec` when `--log` is not given.
pub const EXEC_LOG_FILE_NAME: &str = "toolrun.log";

pub(crate) fn runner_options(config: &Config, label: Option<&str>) -> RunnerOptions {
    RunnerOptions {
        poll_interval: config.runner.poll_interval(),
        timeout: config.runner.timeout(),
        kill_grace: config.runner.kill_grace(),
        check_exit_code: config.runner.check_exit_code(),
        label: label.map(str::to_string),
    }
}

/// Token that fires on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping tool");
            trigger.cancel();
        }
    });
    token
}

fn current_dir() -> Result<PathBuf, ToolrunError> {
    std::env::current_dir().map_err(|e| ToolrunError::io("Failed to get current directory", e))
}

/// Argument values restored from config, then overridden by flags.
pub(crate) fn delta_cli(config: &Config, args: &DeltaArgs) -> Result<DeltaCli, ToolrunError> {
    let mut cli = DeltaCli::from_config(&config.tool);
    let restored = cli.invocation_mut().apply_settings(&config.arguments)?;
    debug!(restored, "Restored DeLTA settings");

    if let Some(area) = args.min_cell_area {
        let handle = cli.min_cell_area();
        cli.invocation_mut().set(handle, area)?;
    }
    Ok(cli)
}

pub async fn delta(config: &Config, args: DeltaArgs) -> Result<(), ToolrunError> {
    let mut cli = delta_cli(config, &args)?;

    if args.save {
        let path = match &config.config_path {
            Some(path) => path.clone(),
            None => current_dir()?.join(CONFIG_DIR).join(CONFIG_FILE),
        };
        Config::save_arguments(&path, &cli.invocation().settings())
            .map_err(|e| ToolrunError::config_load(&e))?;
        eprintln!("Saved settings to {}", path.display());
    }

    if args.dry_run {
        cli.set_paths(&args.dir)?;
        let tokens = cli.invocation().build()?;
        println!("{}", tokens.join(" "));
        return Ok(());
    }

    let run = DeltaRun {
        input_dir: args.dir,
        frames: args.frames,
        stage: args.stage,
        keep_workdir: config.runner.keep_workdir(),
        log_file_name: config.runner.log_file_name().to_string(),
    };
    let mut runner = ToolRunner::new(runner_options(config, Some("DeLTA")));
    let sink = Arc::new(ConsoleSink::new());

    let report = run
        .execute(&mut cli, &mut runner, sink.clone(), cancel_on_ctrl_c())
        .await;
    sink.finish();
    let report = report?;

    if let Some(kept) = &report.kept_workdir {
        eprintln!("Working directory kept at {}", kept.display());
    }
    finish(report.outcome)?;
    eprintln!("Results in {}", report.results_dir.display());
    Ok(())
}

pub async fn exec(config: &Config, args: ExecArgs) -> Result<(), ToolrunError> {
    let invocation = Invocation::from_tokens(args.command);

    if args.dry_run {
        println!("{}", invocation.build()?.join(" "));
        return Ok(());
    }

    let cwd = match args.cwd {
        Some(cwd) => cwd,
        None => current_dir()?,
    };
    let log_file = args.log.unwrap_or_else(|| cwd.join(EXEC_LOG_FILE_NAME));

    let mut runner = ToolRunner::new(runner_options(config, None));
    let sink = Arc::new(ConsoleSink::new());
    let outcome = runner
        .run_with_cancel(
            &invocation,
            &cwd,
            &log_file,
            args.units,
            sink.clone(),
            cancel_on_ctrl_c(),
        )
        .await;
    sink.finish();

    finish(outcome)
}

fn finish(outcome: RunOutcome) -> Result<(), ToolrunError> {
    match outcome.error {
        Some(err) => Err(err.into()),
        None => {
            let exit = outcome
                .exit_code
                .map_or_else(|| "no exit code".to_string(), |code| format!("exit code {code}"));
            eprintln!(
                "Finished in {:.1}s ({exit}, {} progress lines)",
                outcome.elapsed.as_secs_f64(),
                outcome.units_done
            );
            Ok(())
        }
    }
}

pub fn show_config(config: &Config) {
    match &config.config_path {
        Some(path) => println!("# config file: {}", path.display()),
        None => println!("# config file: none"),
    }
    for (key, (value, source)) in config.effective_config() {
        println!("{key} = {value}  [{source}]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::KEY_MIN_CELL_AREA;
    use std::path::Path;
    use std::time::Duration;

    fn delta_args(min_cell_area: Option<i64>) -> DeltaArgs {
        DeltaArgs {
            dir: PathBuf::from("/data"),
            min_cell_area,
            frames: None,
            delta_command: None,
            conda_env: None,
            stage: false,
            keep_workdir: false,
            dry_run: true,
            save: false,
        }
    }

    #[test]
    fn test_runner_options_follow_config() {
        let config = Config::builder()
            .poll_interval(Duration::from_millis(50))
            .timeout(Duration::from_secs(30))
            .check_exit_code(false)
            .build()
            .unwrap();

        let options = runner_options(&config, Some("DeLTA"));
        assert_eq!(options.poll_interval, Duration::from_millis(50));
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert!(!options.check_exit_code);
        assert_eq!(options.label.as_deref(), Some("DeLTA"));
    }

    #[test]
    fn test_flag_overrides_persisted_value() {
        let config = Config::builder()
            .argument(KEY_MIN_CELL_AREA, serde_json::json!(15))
            .build()
            .unwrap();

        let cli = delta_cli(&config, &delta_args(None)).unwrap();
        assert_eq!(cli.invocation().get(cli.min_cell_area()), Some(15));

        let cli = delta_cli(&config, &delta_args(Some(40))).unwrap();
        assert_eq!(cli.invocation().get(cli.min_cell_area()), Some(40));
    }

    #[test]
    fn test_bad_persisted_value_is_rejected() {
        let config = Config::builder()
            .argument(KEY_MIN_CELL_AREA, serde_json::json!("large"))
            .build()
            .unwrap();

        let err = delta_cli(&config, &delta_args(None)).unwrap_err();
        assert!(matches!(err, ToolrunError::Argument(_)));
    }

    #[test]
    fn test_conda_env_from_config() {
        let config = Config::builder().conda_env("delta_env").build().unwrap();
        let mut cli = delta_cli(&config, &delta_args(None)).unwrap();
        cli.set_paths(Path::new("/data")).unwrap();

        let tokens = cli.invocation().build().unwrap();
        assert_eq!(&tokens[..5], &["conda", "run", "--no-capture-output", "-n", "delta_env"]);
        assert_eq!(&tokens[5..7], &["delta", "run"]);
    }
}
