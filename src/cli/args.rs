//! CLI argument definitions (clap)

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// toolrun - run external tools with log-tailing progress
#[derive(Parser, Debug)]
#[command(name = "toolrun")]
#[command(about = "Build command lines for external tools and run them with progress monitoring")]
#[command(long_about = r#"
toolrun builds validated command lines for external executables, runs them with
stdout and stderr captured to a log file, and follows that log to report
progress ("image <n>/<m>" lines) and relay diagnostics.

EXAMPLES:
  # Segment the frames in ./movie with DeLTA
  toolrun delta ./movie --min-cell-area 20

  # Show the command that would run, without running it
  toolrun delta ./movie --dry-run

  # Run DeLTA from a conda environment, in a temporary copy of the frames
  toolrun delta ./movie --conda-env delta_env --stage

  # Run any command and track 5 units of progress from its log
  toolrun exec --units 5 -- sh process.sh

  # Show the effective configuration
  toolrun config

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .toolrun/config.toml
  Use --config or TOOLRUN_CONFIG to specify an explicit config file path
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Delay between log polls in milliseconds
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Terminate the tool after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Milliseconds between SIGTERM and SIGKILL when terminating
    #[arg(long, global = true)]
    pub kill_grace_ms: Option<u64>,

    /// Treat any normal exit as success, whatever the exit code
    #[arg(long, global = true)]
    pub no_check_exit_code: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run DeLTA 2 on a directory of img-t<N>.tif frames
    Delta(DeltaArgs),

    /// Run an arbitrary command, tailing its log for progress
    Exec(ExecArgs),

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Args, Debug)]
pub struct DeltaArgs {
    /// Directory holding the img-t<N>.tif frames
    pub dir: PathBuf,

    /// Minimum area of detected cells in pixels
    #[arg(short = 'C', long)]
    pub min_cell_area: Option<i64>,

    /// Expected number of frames (counted from the directory by default)
    #[arg(long)]
    pub frames: Option<u64>,

    /// Base command used to start DeLTA
    #[arg(long)]
    pub delta_command: Option<String>,

    /// Conda environment DeLTA is installed in
    #[arg(long)]
    pub conda_env: Option<String>,

    /// Run in a temporary copy of the frames; results are copied back
    #[arg(long)]
    pub stage: bool,

    /// Keep the temporary directory of a staged run
    #[arg(long, requires = "stage")]
    pub keep_workdir: bool,

    /// Print the command line and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Save argument values to the config file before running
    #[arg(long)]
    pub save: bool,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Number of progress lines expected (0 disables progress)
    #[arg(long, default_value_t = 0)]
    pub units: u64,

    /// Log file receiving stdout and stderr [default: <cwd>/toolrun.log]
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Working directory for the command [default: current directory]
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Print the command line and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Command and its arguments, after `--`
    #[arg(required = true, last = true)]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_delta() {
        let cli = Cli::try_parse_from([
            "toolrun",
            "delta",
            "/data/movie",
            "-C",
            "20",
            "--stage",
            "--keep-workdir",
            "--timeout",
            "60",
        ])
        .unwrap();

        assert_eq!(cli.timeout, Some(60));
        match cli.command {
            Commands::Delta(args) => {
                assert_eq!(args.dir, PathBuf::from("/data/movie"));
                assert_eq!(args.min_cell_area, Some(20));
                assert!(args.stage);
                assert!(args.keep_workdir);
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_keep_workdir_requires_stage() {
        assert!(Cli::try_parse_from(["toolrun", "delta", "/data", "--keep-workdir"]).is_err());
    }

    #[test]
    fn test_parse_exec_after_separator() {
        let cli = Cli::try_parse_from([
            "toolrun", "exec", "--units", "5", "--", "sh", "-c", "echo image 1/5",
        ])
        .unwrap();

        match cli.command {
            Commands::Exec(args) => {
                assert_eq!(args.units, 5);
                assert_eq!(args.command, vec!["sh", "-c", "echo image 1/5"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_exec_requires_command() {
        assert!(Cli::try_parse_from(["toolrun", "exec", "--units", "5"]).is_err());
    }
}
