//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, loads configuration, creates the tokio runtime
//! and dispatches to the command handlers. It prints every error itself;
//! `main` only turns the returned [`ExitCode`] into the process status.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;
use super::console::print_error;
use crate::error::{ToolrunError, UserFriendlyError};
use crate::exit_codes::ExitCode;
use crate::logging::init_tracing;
use toolrun_config::{CliArgs, Config, ConfigError};

/// Main CLI execution function.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let cli_args = build_cli_args(&cli);
    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report(&config_error(&err))),
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = match cli.command {
        Commands::Delta(args) => rt.block_on(commands::delta(&config, args)),
        Commands::Exec(args) => rt.block_on(commands::exec(&config, args)),
        Commands::Config => {
            commands::show_config(&config);
            Ok(())
        }
    };

    result.map_err(|err| report(&err))
}

/// Map parsed flags onto the configuration override layer.
pub(crate) fn build_cli_args(cli: &Cli) -> CliArgs {
    let mut cli_args = CliArgs {
        config_path: cli.config.clone(),
        poll_interval_ms: cli.poll_interval_ms,
        timeout_secs: cli.timeout,
        kill_grace_ms: cli.kill_grace_ms,
        check_exit_code: cli.no_check_exit_code.then_some(false),
        ..CliArgs::default()
    };

    if let Commands::Delta(args) = &cli.command {
        cli_args.keep_workdir = args.keep_workdir.then_some(true);
        cli_args.command = args.delta_command.clone();
        cli_args.conda_env = args.conda_env.clone();
    }

    cli_args
}

/// Keep typed validation errors when they surface through the loader.
fn config_error(err: &anyhow::Error) -> ToolrunError {
    match err.downcast_ref::<ConfigError>() {
        Some(config_err) => ToolrunError::Config(config_err.clone()),
        None => ToolrunError::config_load(err),
    }
}

fn report(err: &ToolrunError) -> ExitCode {
    print_error(&err.user_message(), &err.suggestions());
    err.to_exit_code()
}
