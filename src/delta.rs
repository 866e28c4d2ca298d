//! DeLTA 2 preset
//!
//! [`DeltaCli`] declares the `delta run` command line. [`DeltaRun`] drives one
//! segmentation run over a directory of `img-t<N>.tif` frames, optionally
//! staged in a scoped temporary directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use toolrun_args::{ArgHandle, ArgumentError, ArgumentSpec, Invocation};
use toolrun_config::ToolConfig;
use toolrun_runner::{ProgressSink, RunOutcome, ToolRunner, WorkDir};

use crate::error::ToolrunError;

pub const DELTA_COMMAND: &str = "delta run";
pub const DEFAULT_MIN_CELL_AREA: i64 = 0;
pub const KEY_MIN_CELL_AREA: &str = "MIN_CELL_AREA";
/// Frame file pattern handed to `--input`; DeLTA substitutes `{t}`.
pub const INPUT_PATTERN: &str = "img-t{t}.tif";
pub const OUTPUT_FOLDER_NAME: &str = "results";
pub const TEMP_DIR_PREFIX: &str = "toolrun-delta-imgs_";

/// Argument declarations for `delta run`.
#[derive(Debug)]
pub struct DeltaCli {
    invocation: Invocation,
    min_cell_area: ArgHandle<i64>,
    config_file: ArgHandle<String>,
    input: ArgHandle<String>,
    output: ArgHandle<String>,
}

impl Default for DeltaCli {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaCli {
    #[must_use]
    pub fn new() -> Self {
        Self::with_command(DELTA_COMMAND, Vec::<String>::new())
    }

    /// Use the command and launcher from the `[tool]` config section.
    #[must_use]
    pub fn from_config(tool: &ToolConfig) -> Self {
        Self::with_command(tool.command(), tool.launcher())
    }

    #[must_use]
    pub fn with_command<I, S>(command: &str, launcher: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut invocation = Invocation::new(command).with_launcher(launcher);

        let min_cell_area = invocation.add(
            ArgumentSpec::int("Min cell area")
                .token("-C")
                .default_value(DEFAULT_MIN_CELL_AREA)
                .help("Minimum area of detected cells in pixels.")
                .key(KEY_MIN_CELL_AREA)
                .translator(|area: &i64| vec![format!("min_cell_area={area}")]),
        );

        // Not required, so the default is always passed.
        let config_file = invocation.add(
            ArgumentSpec::string("Configuration file")
                .token("-c")
                .default_value("2D")
                .help("Configuration file.")
                .visible(false),
        );

        invocation.add(
            ArgumentSpec::flag("Display progress bars")
                .token("--progress")
                .default_value(true)
                .required(true)
                .help("Display progress bars.")
                .visible(false),
        );

        let input = invocation.add(
            ArgumentSpec::string("Input file")
                .token("--input")
                .required(true)
                .help("Input file.")
                .visible(false),
        );

        let output = invocation.add(
            ArgumentSpec::string("Output folder")
                .token("--output")
                .required(true)
                .help("Output folder.")
                .visible(false),
        );

        Self {
            invocation,
            min_cell_area,
            config_file,
            input,
            output,
        }
    }

    #[must_use]
    pub const fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn invocation_mut(&mut self) -> &mut Invocation {
        &mut self.invocation
    }

    #[must_use]
    pub const fn min_cell_area(&self) -> ArgHandle<i64> {
        self.min_cell_area
    }

    #[must_use]
    pub const fn config_file(&self) -> ArgHandle<String> {
        self.config_file
    }

    #[must_use]
    pub const fn input(&self) -> ArgHandle<String> {
        self.input
    }

    #[must_use]
    pub const fn output(&self) -> ArgHandle<String> {
        self.output
    }

    /// Point `--input` and `--output` at `dir`.
    pub fn set_paths(&mut self, dir: &Path) -> Result<(), ArgumentError> {
        self.invocation
            .set(self.input, input_pattern(dir).to_string_lossy().into_owned())?;
        self.invocation
            .set(self.output, output_dir(dir).to_string_lossy().into_owned())
    }
}

#[must_use]
pub fn input_pattern(dir: &Path) -> PathBuf {
    dir.join(INPUT_PATTERN)
}

#[must_use]
pub fn output_dir(dir: &Path) -> PathBuf {
    dir.join(OUTPUT_FOLDER_NAME)
}

/// True for names like `img-t0.tif` or `img-t012.tif`.
fn is_frame_name(name: &str) -> bool {
    name.strip_prefix("img-t")
        .and_then(|rest| rest.strip_suffix(".tif"))
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

fn frame_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() && is_frame_name(&entry.file_name().to_string_lossy()) {
            frames.push(entry.path());
        }
    }
    frames.sort();
    Ok(frames)
}

/// Number of `img-t<N>.tif` frames directly inside `dir`.
pub fn count_frames(dir: &Path) -> io::Result<u64> {
    Ok(frame_files(dir)?.len() as u64)
}

/// Copy the frames of `source` into `dest`, returning how many were copied.
pub fn stage_frames(source: &Path, dest: &Path) -> io::Result<u64> {
    let frames = frame_files(source)?;
    for frame in &frames {
        if let Some(name) = frame.file_name() {
            fs::copy(frame, dest.join(name))?;
        }
    }
    debug!(count = frames.len(), dest = %dest.display(), "Staged frames");
    Ok(frames.len() as u64)
}

fn copy_dir_all(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// One DeLTA run over a frame directory.
#[derive(Debug, Clone)]
pub struct DeltaRun {
    pub input_dir: PathBuf,
    /// Expected frame count; counted from `input_dir` when `None`.
    pub frames: Option<u64>,
    /// Run in a scoped temporary copy of the frames.
    pub stage: bool,
    /// Keep the temporary directory after a staged run.
    pub keep_workdir: bool,
    pub log_file_name: String,
}

/// What a finished [`DeltaRun`] left behind.
#[derive(Debug)]
pub struct DeltaReport {
    pub outcome: RunOutcome,
    pub frames: u64,
    /// Where results and the log can be found after the run.
    pub results_dir: PathBuf,
    pub log_file: PathBuf,
    /// Temporary directory that was kept instead of removed.
    pub kept_workdir: Option<PathBuf>,
}

impl DeltaRun {
    #[must_use]
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            frames: None,
            stage: false,
            keep_workdir: false,
            log_file_name: toolrun_config::DEFAULT_LOG_FILE_NAME.to_string(),
        }
    }

    /// Prepare the working directory, run the tool and collect its output.
    ///
    /// A failed run is reported through [`DeltaReport::outcome`]; `Err` is
    /// only returned when the run could not be set up or its output could
    /// not be copied back. In the latter case the temporary directory is
    /// kept and named by [`ToolrunError::Collect`].
    pub async fn execute(
        &self,
        cli: &mut DeltaCli,
        runner: &mut ToolRunner,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<DeltaReport, ToolrunError> {
        if !self.input_dir.is_dir() {
            return Err(ToolrunError::MissingInput(self.input_dir.clone()));
        }

        let workdir = if self.stage {
            let workdir = WorkDir::temp(TEMP_DIR_PREFIX)
                .map_err(|e| ToolrunError::io("Could not create temp folder", e))?;
            sink.set_status("Staging frames");
            stage_frames(&self.input_dir, workdir.path()).map_err(|e| {
                ToolrunError::io(
                    format!("Problem saving image frames to {}", workdir.path().display()),
                    e,
                )
            })?;
            workdir
        } else {
            WorkDir::borrowed(&self.input_dir)
        };

        let frames = match self.frames {
            Some(frames) => frames,
            None => count_frames(workdir.path())
                .map_err(|e| ToolrunError::io("Could not list frames", e))?,
        };
        if frames == 0 {
            warn!(dir = %self.input_dir.display(), "No img-t<N>.tif frames found");
        }

        cli.set_paths(workdir.path())?;
        let run_output = output_dir(workdir.path());
        fs::create_dir_all(&run_output).map_err(|e| {
            ToolrunError::io(format!("Could not create {}", run_output.display()), e)
        })?;

        let log_file = workdir.path().join(&self.log_file_name);
        info!(frames, workdir = %workdir.path().display(), staged = workdir.is_temporary(), "Starting DeLTA run");
        let outcome = runner
            .run_with_cancel(
                cli.invocation(),
                workdir.path(),
                &log_file,
                frames,
                sink,
                cancel,
            )
            .await;

        let mut report = DeltaReport {
            outcome,
            frames,
            results_dir: run_output,
            log_file,
            kept_workdir: None,
        };

        if workdir.is_temporary() {
            if let Err(e) = self.collect(&mut report) {
                let kept = workdir.keep();
                warn!(
                    workdir = %kept.display(),
                    error = %e,
                    "Could not collect run output, keeping temp folder"
                );
                return Err(ToolrunError::Collect {
                    workdir: kept,
                    outcome: Box::new(report.outcome),
                    source: Box::new(e),
                });
            }
            if self.keep_workdir {
                report.kept_workdir = Some(workdir.keep());
            }
        }

        Ok(report)
    }

    /// Copy results and log out of the temporary directory before it is removed.
    fn collect(&self, report: &mut DeltaReport) -> Result<(), ToolrunError> {
        let results_dir = output_dir(&self.input_dir);
        if report.results_dir.is_dir() {
            copy_dir_all(&report.results_dir, &results_dir).map_err(|e| {
                ToolrunError::io(format!("Could not copy results to {}", results_dir.display()), e)
            })?;
        }
        report.results_dir = results_dir;

        let log_file = self.input_dir.join(&self.log_file_name);
        if report.log_file.is_file() {
            fs::copy(&report.log_file, &log_file).map_err(|e| {
                ToolrunError::io(format!("Could not copy log to {}", log_file.display()), e)
            })?;
        }
        report.log_file = log_file;
        Ok(())
    }
}
