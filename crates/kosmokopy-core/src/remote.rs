//! Remote channel (component C3): a multiplexed SSH control-master
//! connection per host, and the argv-building helpers the rest of the
//! engine uses to run `ssh`/`scp`/`rsync` against it.

use crate::cancel::CancelToken;
use crate::error::KosmoError;
use crate::process;
use std::path::PathBuf;

/// One lazily-opened control-master socket for a single remote host.
/// `ControlPersist=60` keeps the multiplexed connection warm for a
/// short window after the last command exits, so an entire tree
/// transfer amortises one SSH handshake.
pub struct RemoteChannel {
    host: String,
    control_path: PathBuf,
}

impl RemoteChannel {
    /// Open (or adopt an already-warm) control-master socket for
    /// `host`. The socket path is deterministic from (host, pid, uid)
    /// so repeated invocations against the same host within the same
    /// process reuse it.
    pub async fn open(host: &str, cancel: &CancelToken) -> Result<Self, KosmoError> {
        let control_path = control_socket_path(host);
        let channel = RemoteChannel {
            host: host.to_string(),
            control_path,
        };

        // Prime the control master with a no-op command; failure here
        // means the host is unreachable and the run aborts fatally. A
        // cancellation is passed through as-is rather than reported as
        // a connection failure.
        let argv = channel.ssh_argv(&["true".to_string()]);
        let out = process::run(&argv, None, cancel).await.map_err(|e| match e {
            KosmoError::Cancelled => KosmoError::Cancelled,
            _ => KosmoError::Connect {
                host: host.to_string(),
                reason: "ssh control-master could not be established".to_string(),
            },
        })?;
        if !out.status_success {
            let reason = String::from_utf8_lossy(&out.stderr).trim().to_string();
            log::warn!("ssh control-master to {host} failed: {reason}");
            return Err(KosmoError::Connect { host: host.to_string(), reason });
        }
        Ok(channel)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The `-o ControlMaster=... -o ControlPath=... -o ControlPersist=60`
    /// triplet every remote invocation carries.
    pub fn control_master_args(&self) -> Vec<String> {
        vec![
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", self.control_path.display()),
            "-o".to_string(),
            "ControlPersist=60".to_string(),
        ]
    }

    fn ssh_argv(&self, remote_command: &[String]) -> Vec<String> {
        let mut argv = vec!["ssh".to_string()];
        argv.extend(self.control_master_args());
        argv.push(self.host.clone());
        argv.extend(remote_command.iter().cloned());
        argv
    }

    /// Run a shell command on the remote host, returning its exit
    /// status and output.
    pub async fn exec(
        &self,
        shell_command: &str,
        cancel: &CancelToken,
    ) -> Result<process::Output, KosmoError> {
        let argv = self.ssh_argv(&[shell_command.to_string()]);
        process::run(&argv, None, cancel).await
    }

    /// Run a query that must produce non-empty stdout on success
    /// (e.g. a hash). A zero exit with empty stdout is treated as a
    /// failure, never a silent empty answer.
    pub async fn exec_query(
        &self,
        shell_command: &str,
        cancel: &CancelToken,
    ) -> Result<String, KosmoError> {
        let out = self.exec(shell_command, cancel).await?;
        if !out.status_success {
            return Err(KosmoError::RemoteCommand {
                command: shell_command.to_string(),
                reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(KosmoError::RemoteCommand {
                command: shell_command.to_string(),
                reason: "empty stdout on a query that must not be empty".to_string(),
            });
        }
        Ok(stdout)
    }

    /// `test -e <path>` on the remote host.
    pub async fn exists(&self, path: &str, cancel: &CancelToken) -> Result<bool, KosmoError> {
        let cmd = format!("test -e {}", shell_quote(path));
        let out = self.exec(&cmd, cancel).await?;
        Ok(out.status_success)
    }

    /// `mkdir -p <path>` on the remote host.
    pub async fn mkdir_p(&self, path: &str, cancel: &CancelToken) -> Result<(), KosmoError> {
        let cmd = format!("mkdir -p {}", shell_quote(path));
        let out = self.exec(&cmd, cancel).await?;
        if !out.status_success {
            return Err(KosmoError::RemoteCommand {
                command: cmd,
                reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// `sha256sum <path>`, falling back to `shasum -a 256 <path>` if
    /// the first is not installed. Both forms print `<hex> <name>`;
    /// only the hex digest (first whitespace-separated token) is kept.
    pub async fn sha256(&self, path: &str, cancel: &CancelToken) -> Result<String, KosmoError> {
        let primary = format!("sha256sum {}", shell_quote(path));
        match self.exec_query(&primary, cancel).await {
            Ok(line) => Ok(first_token(&line)),
            Err(_) => {
                let fallback = format!("shasum -a 256 {}", shell_quote(path));
                let line = self.exec_query(&fallback, cancel).await?;
                Ok(first_token(&line))
            }
        }
    }

    /// `find <dir> -type f`, one absolute path per line.
    pub async fn find_files(
        &self,
        dir: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, KosmoError> {
        let cmd = format!("find {} -type f", shell_quote(dir));
        let out = self.exec(&cmd, cancel).await?;
        if !out.status_success {
            return Err(KosmoError::Enumerate {
                root: dir.to_string(),
                reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(lines(&out.stdout))
    }

    /// `find <dir> -type d`, one absolute path per line, excluding
    /// `dir` itself. Used to recover exact (not best-effort)
    /// directory-exclusion counts on remote enumeration.
    pub async fn find_dirs(
        &self,
        dir: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, KosmoError> {
        let cmd = format!("find {} -mindepth 1 -type d", shell_quote(dir));
        let out = self.exec(&cmd, cancel).await?;
        if !out.status_success {
            return Err(KosmoError::Enumerate {
                root: dir.to_string(),
                reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(lines(&out.stdout))
    }
}

fn lines(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

fn first_token(line: &str) -> String {
    line.split_whitespace().next().unwrap_or("").to_string()
}

/// Single-quote a remote shell argument, escaping embedded `'` as
/// `'\''` — the standard POSIX-shell technique.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

fn control_socket_path(host: &str) -> PathBuf {
    let pid = std::process::id();
    let uid = unsafe_uid();
    std::env::temp_dir().join(format!("kosmokopy_ssh_{host}_{pid}_{uid}"))
}

#[cfg(unix)]
fn unsafe_uid() -> u32 {
    unsafe { libc::getuid() }
}

#[cfg(not(unix))]
fn unsafe_uid() -> u32 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_single_quotes() {
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn quotes_plain_path() {
        assert_eq!(shell_quote("/tmp/a b"), "'/tmp/a b'");
    }

    #[test]
    fn first_token_splits_hash_line() {
        assert_eq!(first_token("abcd1234  filename.txt"), "abcd1234");
    }

    #[test]
    fn control_socket_path_is_deterministic_per_process() {
        let a = control_socket_path("host1");
        let b = control_socket_path("host1");
        assert_eq!(a, b);
        let c = control_socket_path("host2");
        assert_ne!(a, c);
    }
}
