//! Platform-specific process group setup and termination

use std::time::Duration;
use tokio::process::{Child, Command};

#[cfg(unix)]
mod unix;

/// Put the child in its own process group so it can be signalled as a whole.
pub(crate) fn configure_process_group(cmd: &mut Command) {
    #[cfg(unix)]
    unix::configure_process_group(cmd);

    #[cfg(not(unix))]
    let _ = cmd;
}

/// Terminate a running child and reap it.
pub(crate) async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    unix::terminate_process_group(child, grace).await;

    #[cfg(not(unix))]
    {
        let _ = grace;
        if let Err(e) = child.start_kill() {
            tracing::warn!(error = %e, "Failed to kill child process");
        }
        let _ = child.wait().await;
    }
}
