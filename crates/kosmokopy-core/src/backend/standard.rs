//! The standard back-end: plain buffered copies for local-local pairs,
//! `scp` for local-remote pairs, and an SSH-to-SSH `cat` relay for
//! remote-remote pairs so no intermediate file ever touches the host
//! running this engine.

use super::channel_for;
use crate::cancel::CancelToken;
use crate::endpoint::Endpoint;
use crate::error::KosmoError;
use crate::process;
use crate::remote::{shell_quote, RemoteChannel};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const PARTIAL_SUFFIX: &str = ".kosmokopy-partial";

pub struct StandardBackend;

#[async_trait::async_trait]
impl super::TransferBackend for StandardBackend {
    async fn transfer_one(
        &self,
        source: &Endpoint,
        destination: &Endpoint,
        channels: &HashMap<String, RemoteChannel>,
        cancel: &CancelToken,
    ) -> Result<(), KosmoError> {
        match (source, destination) {
            (Endpoint::Local(src), Endpoint::Local(dst)) => copy_local_local(src, dst).await,
            (Endpoint::Local(src), Endpoint::Remote { host, path }) => {
                let channel = channel_for(host, channels)?;
                copy_local_to_remote(src, channel, path, cancel).await
            }
            (Endpoint::Remote { host, path }, Endpoint::Local(dst)) => {
                let channel = channel_for(host, channels)?;
                copy_remote_to_local(channel, path, dst, cancel).await
            }
            (
                Endpoint::Remote {
                    host: src_host,
                    path: src_path,
                },
                Endpoint::Remote {
                    host: dst_host,
                    path: dst_path,
                },
            ) => {
                let src_channel = channel_for(src_host, channels)?;
                let dst_channel = channel_for(dst_host, channels)?;
                relay_remote_to_remote(src_channel, src_path, dst_channel, dst_path, cancel).await
            }
        }
    }
}

/// Copy via a sibling temp file, fsync, then atomic rename — never
/// leaving a half-written file at the final name.
async fn copy_local_local(src: &Path, dst: &Path) -> Result<(), KosmoError> {
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| KosmoError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    let temp_path = temp_path_for(dst);
    let guard = TempFileGuard::new(temp_path.clone());

    {
        let mut reader = tokio::fs::File::open(src)
            .await
            .map_err(|e| KosmoError::Io {
                path: src.to_path_buf(),
                source: e,
            })?;
        let mut writer =
            tokio::fs::File::create(&temp_path)
                .await
                .map_err(|e| KosmoError::Io {
                    path: temp_path.clone(),
                    source: e,
                })?;
        tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| KosmoError::Io {
                path: temp_path.clone(),
                source: e,
            })?;
        writer.sync_all().await.map_err(|e| KosmoError::Io {
            path: temp_path.clone(),
            source: e,
        })?;
    }

    guard.commit(dst)?;
    Ok(())
}

async fn copy_local_to_remote(
    src: &Path,
    channel: &RemoteChannel,
    dst_path: &str,
    cancel: &CancelToken,
) -> Result<(), KosmoError> {
    if let Some(parent) = parent_of(dst_path) {
        channel.mkdir_p(&parent, cancel).await?;
    }
    let mut argv = vec!["scp".to_string(), "-q".to_string()];
    argv.extend(channel.control_master_args());
    argv.push(src.to_string_lossy().into_owned());
    argv.push(format!("{}:{}", channel.host(), shell_quote_scp(dst_path)));
    let out = process::run(&argv, None, cancel).await?;
    if !out.status_success {
        return Err(KosmoError::Transfer {
            path: dst_path.to_string(),
            reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    Ok(())
}

async fn copy_remote_to_local(
    channel: &RemoteChannel,
    src_path: &str,
    dst: &Path,
    cancel: &CancelToken,
) -> Result<(), KosmoError> {
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| KosmoError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }
    let temp_path = temp_path_for(dst);
    let guard = TempFileGuard::new(temp_path.clone());

    let mut argv = vec!["scp".to_string(), "-q".to_string()];
    argv.extend(channel.control_master_args());
    argv.push(format!("{}:{}", channel.host(), shell_quote_scp(src_path)));
    argv.push(temp_path.to_string_lossy().into_owned());
    let out = process::run(&argv, None, cancel).await?;
    if !out.status_success {
        return Err(KosmoError::Transfer {
            path: src_path.to_string(),
            reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }

    guard.commit(dst)?;
    Ok(())
}

/// Stream bytes directly from one remote host to the other through an
/// SSH pipe: `ssh src 'cat path'` feeds its stdout as stdin to
/// `ssh dst 'cat > path'`, with nothing ever written to local disk.
async fn relay_remote_to_remote(
    src_channel: &RemoteChannel,
    src_path: &str,
    dst_channel: &RemoteChannel,
    dst_path: &str,
    cancel: &CancelToken,
) -> Result<(), KosmoError> {
    if let Some(parent) = parent_of(dst_path) {
        dst_channel.mkdir_p(&parent, cancel).await?;
    }

    let read_cmd = format!("cat {}", shell_quote(src_path));
    let read_out = src_channel.exec(&read_cmd, cancel).await?;
    if !read_out.status_success {
        return Err(KosmoError::Transfer {
            path: src_path.to_string(),
            reason: String::from_utf8_lossy(&read_out.stderr).trim().to_string(),
        });
    }

    let write_cmd = format!("cat > {}", shell_quote(dst_path));
    let mut write_argv = vec!["ssh".to_string()];
    write_argv.extend(dst_channel.control_master_args());
    write_argv.push(dst_channel.host().to_string());
    write_argv.push(write_cmd);

    let write_out = process::run(&write_argv, Some(&read_out.stdout), cancel).await?;
    if !write_out.status_success {
        return Err(KosmoError::Transfer {
            path: dst_path.to_string(),
            reason: String::from_utf8_lossy(&write_out.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn parent_of(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit_once('/').map(|(parent, _)| {
        if parent.is_empty() {
            "/".to_string()
        } else {
            parent.to_string()
        }
    })
}

/// `scp` treats the remote path argument as shell-parsed, so it needs
/// the same single-quoting as other remote commands.
fn shell_quote_scp(path: &str) -> String {
    shell_quote(path)
}

struct TempFileGuard {
    temp_path: PathBuf,
    committed: bool,
}

impl TempFileGuard {
    fn new(temp_path: PathBuf) -> Self {
        Self {
            temp_path,
            committed: false,
        }
    }

    fn commit(mut self, final_path: &Path) -> Result<(), KosmoError> {
        std::fs::rename(&self.temp_path, final_path).map_err(|e| KosmoError::Io {
            path: final_path.to_path_buf(),
            source: e,
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

fn temp_path_for(dst: &Path) -> PathBuf {
    let mut temp = dst.as_os_str().to_owned();
    temp.push(PARTIAL_SUFFIX);
    PathBuf::from(temp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn copies_file_contents_atomically() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("nested/dst.txt");
        fs::write(&src, b"payload").unwrap();

        copy_local_local(&src, &dst).await.unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"payload");
        assert!(!temp_path_for(&dst).exists());
    }

    #[tokio::test]
    async fn leaves_no_partial_file_on_missing_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("missing.txt");
        let dst = dir.path().join("dst.txt");

        let result = copy_local_local(&src, &dst).await;
        assert!(result.is_err());
        assert!(!dst.exists());
        assert!(!temp_path_for(&dst).exists());
    }

    #[test]
    fn parent_of_handles_root_level_files() {
        assert_eq!(parent_of("/file.txt"), Some("/".to_string()));
        assert_eq!(parent_of("/a/b/file.txt"), Some("/a/b".to_string()));
        assert_eq!(parent_of("file.txt"), None);
    }
}
