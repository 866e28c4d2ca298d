//! DeLTA workflow against a stand-in `delta` script.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use toolrun::ToolrunError;
use toolrun::delta::{DeltaCli, DeltaRun};
use toolrun::runner::{
    CancellationToken, DisplayHint, ProgressSink, RunError, RunnerOptions, ToolRunner,
};

/// Reports one `image` line per frame, writes a result file into `--output`
/// and echoes its arguments.
const FAKE_DELTA: &str = r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output" ]; then out="$arg"; fi
  prev="$arg"
done
n=$(ls img-t*.tif | wc -l | tr -d ' ')
i=1
while [ "$i" -le "$n" ]; do
  echo "image $i/$n"
  i=$((i + 1))
done
mkdir -p "$out"
echo "cell,area" > "$out/cells.csv"
echo "args: $*"
"#;

#[derive(Default)]
struct Recorder {
    progress: Mutex<Vec<f64>>,
    output: Mutex<Vec<String>>,
}

impl ProgressSink for Recorder {
    fn set_progress(&self, fraction: f64) {
        self.progress.lock().unwrap().push(fraction);
    }

    fn log(&self, line: &str, hint: DisplayHint) {
        if hint == DisplayHint::ToolOutput {
            self.output.lock().unwrap().push(line.to_string());
        }
    }
}

struct Fixture {
    root: TempDir,
    frames: PathBuf,
    cli: DeltaCli,
}

fn fixture(frame_count: usize) -> Fixture {
    let root = TempDir::new().unwrap();
    let script = root.path().join("fake_delta.sh");
    fs::write(&script, FAKE_DELTA).unwrap();

    let frames = root.path().join("movie");
    fs::create_dir(&frames).unwrap();
    for t in 0..frame_count {
        fs::write(frames.join(format!("img-t{t}.tif")), b"frame").unwrap();
    }

    let cli = DeltaCli::with_command(&format!("sh {}", script.display()), Vec::<String>::new());
    Fixture {
        root,
        frames,
        cli,
    }
}

fn runner() -> ToolRunner {
    ToolRunner::new(RunnerOptions {
        poll_interval: Duration::from_millis(20),
        ..RunnerOptions::default()
    })
}

fn args_line(sink: &Recorder) -> String {
    sink.output
        .lock()
        .unwrap()
        .iter()
        .find(|l| l.starts_with("args: "))
        .cloned()
        .unwrap()
}

fn assert_removed(path: &Path) {
    assert!(!path.exists(), "{} should have been removed", path.display());
}

#[tokio::test]
async fn run_in_place() {
    let mut fx = fixture(4);
    let sink = Arc::new(Recorder::default());

    let report = DeltaRun::new(&fx.frames)
        .execute(&mut fx.cli, &mut runner(), sink.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert!(report.outcome.success, "{:?}", report.outcome.error_message());
    assert_eq!(report.frames, 4);
    assert_eq!(report.outcome.units_done, 4);
    assert_eq!(sink.progress.lock().unwrap().last(), Some(&1.0));
    assert_eq!(report.results_dir, fx.frames.join("results"));
    assert!(fx.frames.join("results").join("cells.csv").is_file());
    assert!(fx.frames.join("delta2.log").is_file());

    let args = args_line(&sink);
    assert!(args.starts_with("args: min_cell_area=0 -c 2D --progress --input "));
    assert!(args.contains(&format!("{}/img-t{{t}}.tif", fx.frames.display())));
}

#[tokio::test]
async fn staged_run_copies_results_back_and_cleans_up() {
    let mut fx = fixture(3);
    let area = fx.cli.min_cell_area();
    fx.cli.invocation_mut().set(area, 25).unwrap();
    let sink = Arc::new(Recorder::default());

    let run = DeltaRun {
        stage: true,
        ..DeltaRun::new(&fx.frames)
    };
    let report = run
        .execute(&mut fx.cli, &mut runner(), sink.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert!(report.outcome.success, "{:?}", report.outcome.error_message());
    assert_eq!(report.frames, 3);
    assert!(report.kept_workdir.is_none());

    let args = args_line(&sink);
    assert!(args.starts_with("args: min_cell_area=25 "));
    assert!(args.contains("toolrun-delta-imgs_"));

    assert!(fx.frames.join("results").join("cells.csv").is_file());
    let log = fs::read_to_string(fx.frames.join("delta2.log")).unwrap();
    assert!(log.contains("image 3/3"));
    assert_eq!(report.log_file, fx.frames.join("delta2.log"));

    let temp_log = report.outcome.log_file.clone().unwrap();
    assert_removed(temp_log.parent().unwrap());
}

#[tokio::test]
async fn staged_run_can_keep_workdir() {
    let mut fx = fixture(2);
    let run = DeltaRun {
        stage: true,
        keep_workdir: true,
        ..DeltaRun::new(&fx.frames)
    };

    let report = run
        .execute(
            &mut fx.cli,
            &mut runner(),
            Arc::new(Recorder::default()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(report.outcome.success);
    let kept = report.kept_workdir.clone().unwrap();
    assert!(kept.join("results").join("cells.csv").is_file());
    assert!(kept.join("img-t1.tif").is_file());
    assert!(fx.frames.join("results").join("cells.csv").is_file());
    fs::remove_dir_all(kept).unwrap();
}

#[tokio::test]
async fn failed_tool_still_removes_temp_dir() {
    let fx = fixture(1);
    let failing = fx.root.path().join("failing.sh");
    fs::write(&failing, "#!/bin/sh\necho crashed\nexit 2\n").unwrap();
    let mut cli = DeltaCli::with_command(&format!("sh {}", failing.display()), Vec::<String>::new());
    let run = DeltaRun {
        stage: true,
        ..DeltaRun::new(&fx.frames)
    };

    let report = run
        .execute(
            &mut cli,
            &mut runner(),
            Arc::new(Recorder::default()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!report.outcome.success);
    match report.outcome.error.as_ref().unwrap() {
        RunError::Execution { exit_code, log, .. } => {
            assert_eq!(*exit_code, Some(2));
            assert!(log.contains("crashed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let temp_log = report.outcome.log_file.clone().unwrap();
    assert_removed(temp_log.parent().unwrap());
    assert!(fx.frames.join("delta2.log").is_file());
}

#[tokio::test]
async fn failed_collect_keeps_temp_dir_and_outcome() {
    let mut fx = fixture(2);
    fs::write(fx.frames.join("results"), b"not a directory").unwrap();
    let run = DeltaRun {
        stage: true,
        ..DeltaRun::new(&fx.frames)
    };

    let err = run
        .execute(
            &mut fx.cli,
            &mut runner(),
            Arc::new(Recorder::default()),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        ToolrunError::Collect {
            workdir, outcome, ..
        } => {
            assert!(outcome.success, "{:?}", outcome.error_message());
            assert_eq!(outcome.units_done, 2);
            assert!(workdir.join("results").join("cells.csv").is_file());
            assert!(workdir.join("delta2.log").is_file());
            fs::remove_dir_all(workdir).unwrap();
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
