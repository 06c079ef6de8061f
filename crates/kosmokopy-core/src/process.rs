//! Process manager (component C12): spawn/wait/kill abstraction over
//! child processes, shared by the remote channel (C3) and the
//! transfer back-ends (C6). Every `ssh`, `scp`, and `rsync` invocation
//! in this crate goes through here so cancellation is handled in one
//! place.

use crate::cancel::CancelToken;
use crate::error::KosmoError;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::Duration;

/// Grace period between SIGTERM and SIGKILL when a cancellation
/// arrives while a child is running.
const KILL_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Output of a completed child process.
pub struct Output {
    pub status_success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Spawn `argv[0]` with the remaining elements as arguments, feeding
/// `stdin_data` to the child if present, and wait for it to exit or
/// for `cancel` to fire.
///
/// On cancellation the child receives `SIGTERM`; if it has not exited
/// within [`KILL_GRACE_PERIOD`] it is `SIGKILL`ed. Either way the
/// function returns `Err(KosmoError::Cancelled)` rather than
/// fabricating a successful `Output` — callers treat this distinctly
/// from an actual per-file failure.
pub async fn run(
    argv: &[String],
    stdin_data: Option<&[u8]>,
    cancel: &CancelToken,
) -> Result<Output, KosmoError> {
    let command_str = argv.join(" ");
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| KosmoError::RemoteCommand {
            command: String::new(),
            reason: "empty argv".to_string(),
        })?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| KosmoError::RemoteCommand {
        command: command_str.clone(),
        reason: format!("failed to spawn: {e}"),
    })?;

    if let Some(data) = stdin_data {
        if let Some(mut stdin) = child.stdin.take() {
            let data = data.to_vec();
            let _ = stdin.write_all(&data).await;
            drop(stdin);
        }
    }

    wait_with_cancel(&mut child, cancel, &command_str).await
}

/// Like [`run`], but streams `stdin_data` through without buffering
/// the whole child's stdout — used by the remote-remote relay path.
/// Returns stdout captured in memory regardless (files in this engine
/// are transferred in bounded chunks at the call sites, never as one
/// giant in-memory blob for large files; this helper is used for
/// short queries and for piping command output into another command).
pub async fn run_piping_stdout_to(
    argv: &[String],
    stdin_data: &[u8],
    cancel: &CancelToken,
) -> Result<Output, KosmoError> {
    run(argv, Some(stdin_data), cancel).await
}

async fn wait_with_cancel(
    child: &mut Child,
    cancel: &CancelToken,
    command_str: &str,
) -> Result<Output, KosmoError> {
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    let read_stdout = async {
        if let Some(s) = stdout.as_mut() {
            let _ = s.read_to_end(&mut stdout_buf).await;
        }
    };
    let read_stderr = async {
        if let Some(s) = stderr.as_mut() {
            let _ = s.read_to_end(&mut stderr_buf).await;
        }
    };

    tokio::select! {
        status = child.wait() => {
            read_stdout.await;
            read_stderr.await;
            let status = status.map_err(|e| KosmoError::RemoteCommand {
                command: command_str.to_string(),
                reason: format!("failed to wait: {e}"),
            })?;
            Ok(Output {
                status_success: status.success(),
                stdout: stdout_buf,
                stderr: stderr_buf,
            })
        }
        _ = cancel.cancelled() => {
            terminate(child).await;
            Err(KosmoError::Cancelled)
        }
    }
}

#[cfg(unix)]
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
    let graceful = tokio::time::timeout(KILL_GRACE_PERIOD, child.wait()).await;
    if graceful.is_err() {
        let _ = child.kill().await;
    }
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child) {
    let graceful = tokio::time::timeout(KILL_GRACE_PERIOD, child.wait()).await;
    if graceful.is_err() {
        let _ = child.kill().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_a_simple_command() {
        let cancel = CancelToken::new();
        let out = run(
            &["echo".to_string(), "hello".to_string()],
            None,
            &cancel,
        )
        .await
        .unwrap();
        assert!(out.status_success);
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_in_output() {
        let cancel = CancelToken::new();
        let out = run(
            &["false".to_string()],
            None,
            &cancel,
        )
        .await
        .unwrap();
        assert!(!out.status_success);
    }

    #[tokio::test]
    async fn cancellation_yields_cancelled_not_a_transfer_error() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = run(&["sleep".to_string(), "5".to_string()], None, &cancel).await;
        assert!(matches!(result, Err(KosmoError::Cancelled)));
    }

    #[tokio::test]
    async fn feeds_stdin_to_child() {
        let cancel = CancelToken::new();
        let out = run(
            &["cat".to_string()],
            Some(b"piped data"),
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(out.stdout, b"piped data");
    }
}
