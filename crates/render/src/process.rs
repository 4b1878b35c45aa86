//! Subprocess plumbing shared by the command-line backends.
//!
//! Children are spawned with `kill_on_drop`. On unix each child also leads
//! its own process group, and dropping the handle kills that whole group,
//! so helpers started by an automation script die with it when an attempt
//! deadline fires.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::backend::RenderError;

/// Exit status plus captured stderr of a finished child.
#[derive(Debug)]
pub struct CommandOutcome {
    pub status: ExitStatus,
    pub stderr: String,
}

impl CommandOutcome {
    /// Turn a non-zero exit into [`RenderError::Failed`].
    pub fn into_result(self, label: &str) -> Result<(), RenderError> {
        if self.status.success() {
            Ok(())
        } else {
            Err(RenderError::failed(format!(
                "{label} failed (status {}): {}",
                self.status,
                last_lines(&self.stderr, 20)
            )))
        }
    }
}

/// A running backend command.
///
/// Dropping it kills the child and, on unix, every process left in the
/// child's process group.
#[derive(Debug)]
pub struct BackendProcess {
    child: Child,
    #[cfg(unix)]
    _group: Option<ProcessGroup>,
}

impl BackendProcess {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

#[cfg(unix)]
#[derive(Debug)]
struct ProcessGroup(libc::pid_t);

#[cfg(unix)]
impl Drop for ProcessGroup {
    fn drop(&mut self) {
        // ESRCH just means the group is already empty.
        let rc = unsafe { libc::killpg(self.0, libc::SIGKILL) };
        if rc == 0 {
            tracing::debug!(pgid = self.0, "Killed process group");
        }
    }
}

/// Spawn `cmd` with piped output and kill-on-drop.
pub fn spawn_logged(cmd: &mut Command, label: &str) -> Result<BackendProcess, RenderError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd
        .spawn()
        .map_err(|e| RenderError::failed(format!("Failed to start {label}: {e}")))?;
    tracing::info!(pid = child.id(), program = label, "Process started");

    #[cfg(unix)]
    let group = child
        .id()
        .and_then(|pid| libc::pid_t::try_from(pid).ok())
        .map(ProcessGroup);
    Ok(BackendProcess {
        child,
        #[cfg(unix)]
        _group: group,
    })
}

/// Feed stdout to `on_line` line by line, then wait for exit.
///
/// stderr is drained concurrently so a chatty child never blocks on a full
/// pipe.
pub async fn wait_with_lines<F>(
    mut process: BackendProcess,
    label: &str,
    mut on_line: F,
) -> Result<CommandOutcome, RenderError>
where
    F: FnMut(&str) + Send,
{
    let child = &mut process.child;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RenderError::failed(format!("Failed to capture {label} stdout")))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| RenderError::failed(format!("Failed to capture {label} stderr")))?;

    let stderr_task = tokio::spawn(async move {
        let mut output = String::new();
        match stderr.read_to_string(&mut output).await {
            Ok(_) => output,
            Err(err) => format!("<failed to read stderr: {err}>"),
        }
    });

    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    on_line(trimmed);
                }
            }
            Ok(None) => break,
            Err(e) => {
                return Err(RenderError::failed(format!(
                    "Failed reading {label} output: {e}"
                )))
            }
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| RenderError::failed(format!("Failed to wait on {label}: {e}")))?;
    let stderr = stderr_task
        .await
        .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

    Ok(CommandOutcome { status, stderr })
}

/// Whether `binary` resolves to an executable, either as a path or
/// through `PATH`.
pub fn command_exists(binary: &str) -> bool {
    !binary.trim().is_empty() && which::which(binary).is_ok()
}

/// Remove an output file left behind by an earlier run, so that only a file
/// written by the coming attempt can count as its result.
pub fn clear_stale_output(path: &Path) -> Result<(), RenderError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RenderError::failed(format!(
            "Failed to remove stale output {}: {e}",
            path.display()
        ))),
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}


/// Process-table checks used by the cancellation tests.
#[cfg(all(test, target_os = "linux"))]
pub(crate) mod test_support {
    pub(crate) fn is_running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            // Field 3 is the state; a zombie has already been killed.
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
                .is_some_and(|state| state != "Z" && state != "X"),
            Err(_) => false,
        }
    }

    pub(crate) async fn wait_until_gone(pid: u32) -> bool {
        for _ in 0..40 {
            if !is_running(pid) {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        false
    }
}
