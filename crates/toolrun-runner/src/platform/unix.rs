use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

pub(super) fn configure_process_group(cmd: &mut Command) {
    // SAFETY: setpgid is async-signal-safe and only touches the forked child.
    unsafe {
        cmd.pre_exec(|| {
            libc::setpgid(0, 0);
            Ok(())
        });
    }
}

/// SIGTERM the child's process group, then SIGKILL whatever is left after `grace`.
pub(super) async fn terminate_process_group(child: &mut Child, grace: Duration) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        // Already reaped.
        return;
    };
    #[allow(clippy::cast_possible_wrap)]
    let pgid = Pid::from_raw(pid as i32);

    debug!(pid, "Sending SIGTERM to process group");
    if let Err(e) = killpg(pgid, Signal::SIGTERM) {
        debug!(pid, error = %e, "SIGTERM failed");
    }

    if tokio::time::timeout(grace, child.wait()).await.is_ok() {
        return;
    }

    warn!(pid, grace_ms = grace.as_millis(), "Process ignored SIGTERM, sending SIGKILL");
    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
        debug!(pid, error = %e, "SIGKILL failed");
    }
    let _ = child.wait().await;
}
