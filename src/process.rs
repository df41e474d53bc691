//! External process management.
//!
//! [`ProcessHandle`] owns one spawned build/run/publish step: it captures
//! combined stdout/stderr into a single append-only buffer and offers two
//! wait modes, wait-for-exit and wait-for-output-match with an idle
//! timeout. The underlying process is killed when the handle drops.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Combined stdout/stderr of a child. The text only ever grows; the wait
/// loops watch its length to detect forward progress.
#[derive(Default)]
struct OutputBuf {
    text: Mutex<String>,
}

impl OutputBuf {
    fn append(&self, chunk: &str) {
        let mut text = self.text.lock().unwrap_or_else(|e| e.into_inner());
        text.push_str(chunk);
    }

    fn snapshot(&self) -> String {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Outcome of a process that ran to completion.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    pub output: String,
}

/// Handle to one spawned external process.
pub struct ProcessHandle {
    child: Child,
    step: String,
    output: Arc<OutputBuf>,
    readers: Vec<JoinHandle<()>>,
}

impl ProcessHandle {
    /// Spawn `program args..` in `cwd`. Returns as soon as the process has
    /// started; output capture runs on background tasks.
    pub fn start(program: &str, args: &[&str], cwd: &Path) -> E2eResult<Self> {
        let step = format!("{} {}", program, args.join(" "));
        debug!(cwd = %cwd.display(), "spawning `{step}`");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Setup(format!("failed to spawn `{step}`: {e}")))?;

        let output = Arc::new(OutputBuf::default());
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, Arc::clone(&output)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, Arc::clone(&output)));
        }

        Ok(ProcessHandle { child, step, output, readers })
    }

    /// The command line this handle was spawned with.
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Snapshot of the output accumulated so far.
    pub fn output(&self) -> String {
        self.output.snapshot()
    }

    /// Suspend until the process exits; yields its exit code and the full
    /// captured output.
    pub async fn wait_for_exit(mut self) -> E2eResult<ProcessOutcome> {
        let status = self.child.wait().await?;
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }
        let output = self.output.snapshot();
        let exit_code = status.code().unwrap_or(-1);
        debug!("`{}` exited with code {exit_code}", self.step);
        Ok(ProcessOutcome { exit_code, output })
    }

    /// Poll the accumulated output until `predicate` matches it.
    ///
    /// Returns `false` once no new output has arrived for `idle_timeout`.
    /// This is a liveness guard, not a wall-clock deadline: a chatty build
    /// can run well past the idle window, while a hung process that stops
    /// producing output abandons the wait quickly.
    pub async fn wait_for_output(
        &mut self,
        predicate: impl Fn(&str) -> bool,
        idle_timeout: Duration,
    ) -> bool {
        let mut seen_len = 0usize;
        let mut last_growth = Instant::now();
        loop {
            let snapshot = self.output.snapshot();
            if predicate(&snapshot) {
                return true;
            }
            if snapshot.len() > seen_len {
                seen_len = snapshot.len();
                last_growth = Instant::now();
            } else if last_growth.elapsed() >= idle_timeout {
                warn!("`{}` idle for {idle_timeout:?} without matching output", self.step);
                return false;
            }
            if let Ok(Some(_)) = self.child.try_wait() {
                // Exited: let the readers flush, then check one last time.
                tokio::time::sleep(Duration::from_millis(50)).await;
                return predicate(&self.output.snapshot());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Shut the process down, SIGTERM first and SIGKILL if it lingers.
    pub async fn terminate(mut self) {
        if matches!(self.child.try_wait(), Ok(Some(_))) {
            return;
        }
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                    let grace =
                        tokio::time::timeout(Duration::from_millis(500), self.child.wait());
                    if grace.await.is_ok() {
                        debug!("`{}` stopped after SIGTERM", self.step);
                        return;
                    }
                }
            }
        }
        if let Err(e) = self.child.kill().await {
            warn!("failed to kill `{}`: {e}", self.step);
        }
        // kill() already reaps on success; drop covers the rest.
    }
}

fn spawn_reader<R>(mut reader: R, buf: Arc<OutputBuf>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.append(&String::from_utf8_lossy(&chunk[..n])),
            }
        }
    })
}
