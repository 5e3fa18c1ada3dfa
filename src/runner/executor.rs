//! Bounded task runner: one task, one process, one hard deadline.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::adapters::{Invocation, SolverAdapter};
use super::metrics;
use super::result::ExecutionOutcome;
use crate::tasks::Task;

/// Runs single tasks against a solver.
#[derive(Clone)]
pub struct TaskRunner {
    adapter: Arc<dyn SolverAdapter>,
    timeout: Duration,
    grace: Duration,
}

impl TaskRunner {
    /// Creates a runner. The process is killed after `timeout + grace`.
    pub fn new(adapter: Arc<dyn SolverAdapter>, timeout: Duration, grace: Duration) -> Self {
        Self {
            adapter,
            timeout,
            grace,
        }
    }

    /// Hard deadline for a single run.
    pub fn deadline(&self) -> Duration {
        self.timeout + self.grace
    }

    /// The adapter used to launch runs.
    pub fn adapter(&self) -> &dyn SolverAdapter {
        self.adapter.as_ref()
    }

    /// Runs one task. Never fails: every problem becomes an outcome status.
    pub async fn run(&self, task: &Task) -> ExecutionOutcome {
        let Some(instance_path) = task.instance_path.as_deref() else {
            info!(level = %task.instance_id, "Level not found, skipping");
            return ExecutionOutcome::skipped();
        };

        let invocation = Invocation {
            instance_path,
            strategy: task.strategy,
            timeout: self.timeout,
        };

        let mut cmd = match self.adapter.command(&invocation) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!(level = %task.instance_id, error = %e, "Could not build solver command");
                return ExecutionOutcome::internal_exception(e.to_string(), None);
            }
        };

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The server forks the client JVM; both share this group.
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(level = %task.instance_id, error = %e, "Failed to spawn solver");
                return ExecutionOutcome::internal_exception(
                    format!("Failed to spawn {}: {}", self.adapter.describe(), e),
                    None,
                );
            }
        };
        let pid = child.id();

        debug!(
            level = %task.instance_id,
            strategy = %task.strategy,
            pid = ?pid,
            deadline_secs = self.deadline().as_secs_f64(),
            "Solver started"
        );

        let stdout = OutputReader::spawn(child.stdout.take());
        let stderr = OutputReader::spawn(child.stderr.take());

        let waited = tokio::time::timeout(self.deadline(), child.wait()).await;
        let wall_time = start.elapsed();

        // Descendants outliving the solver would hold the pipes open.
        kill_process_group(pid);

        match waited {
            Ok(Ok(status)) => {
                let stdout = stdout.finish().await;
                let stderr = stderr.finish().await;
                let combined = format!("{stdout}\n{stderr}");

                let outcome = ExecutionOutcome::from_exit(status.code(), metrics::extract(&combined), wall_time);
                info!(
                    level = %task.instance_id,
                    status = %outcome.status,
                    exit_code = ?outcome.exit_code,
                    wall_secs = wall_time.as_secs_f64(),
                    "Run finished"
                );
                outcome
            }
            Ok(Err(e)) => {
                warn!(level = %task.instance_id, error = %e, "Failed waiting for solver");
                stdout.abort();
                stderr.abort();
                ExecutionOutcome::internal_exception(format!("Process error: {e}"), Some(wall_time))
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    debug!(level = %task.instance_id, error = %e, "Solver already gone");
                }
                stdout.abort();
                stderr.abort();
                warn!(
                    level = %task.instance_id,
                    deadline_secs = self.deadline().as_secs_f64(),
                    "Run exceeded deadline, killed"
                );
                ExecutionOutcome::timeout(self.deadline())
            }
        }
    }
}

/// How long buffered output may take to drain once the solver has exited.
const OUTPUT_DRAIN: Duration = Duration::from_secs(2);

/// Collects one pipe in the background while the solver runs.
struct OutputReader {
    buffer: Arc<Mutex<Vec<u8>>>,
    handle: JoinHandle<()>,
}

impl OutputReader {
    fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let handle = tokio::spawn(async move {
            let Some(mut pipe) = pipe else { return };
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink.lock().unwrap_or_else(|e| e.into_inner()).extend_from_slice(&chunk[..n]),
                }
            }
        });
        Self { buffer, handle }
    }

    /// Waits a bounded time for end of stream and returns what was read.
    async fn finish(self) -> String {
        let abort = self.handle.abort_handle();
        if tokio::time::timeout(OUTPUT_DRAIN, self.handle).await.is_err() {
            debug!("Solver output still open after exit, truncating");
            abort.abort();
        }
        let bytes = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        let text = String::from_utf8_lossy(&bytes).into_owned();
        text
    }

    fn abort(&self) {
        self.handle.abort();
    }
}

/// Kills every process in the solver's group. A group that is already
/// empty is not an error.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid, error = %e, "Failed to kill solver process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
