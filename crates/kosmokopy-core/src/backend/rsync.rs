//! The rsync back-end: one `rsync --checksum` invocation per file,
//! tunnelled over the same control-master connection used for every
//! other remote command. This is a thin wrapper around the `rsync`
//! binary, not a tree copier — the coordinator still drives one file
//! at a time so conflict resolution and cancellation behave exactly
//! as they do for the standard back-end.

use super::channel_for;
use crate::cancel::CancelToken;
use crate::endpoint::Endpoint;
use crate::error::KosmoError;
use crate::process;
use crate::remote::RemoteChannel;
use std::collections::HashMap;
use std::path::Path;

pub struct RsyncBackend;

#[async_trait::async_trait]
impl super::TransferBackend for RsyncBackend {
    async fn transfer_one(
        &self,
        source: &Endpoint,
        destination: &Endpoint,
        channels: &HashMap<String, RemoteChannel>,
        cancel: &CancelToken,
    ) -> Result<(), KosmoError> {
        let remote_channel = match (source, destination) {
            (Endpoint::Remote { host, .. }, _) => Some(channel_for(host, channels)?),
            (_, Endpoint::Remote { host, .. }) => Some(channel_for(host, channels)?),
            _ => None,
        };

        if let Some(parent) = destination_parent(destination) {
            ensure_parent_exists(&parent, remote_channel, cancel).await?;
        }

        let argv = build_argv(source, destination, remote_channel);
        let out = process::run(&argv, None, cancel).await?;
        if !out.status_success {
            return Err(KosmoError::Transfer {
                path: destination.display(),
                reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

fn build_argv(
    source: &Endpoint,
    destination: &Endpoint,
    channel: Option<&RemoteChannel>,
) -> Vec<String> {
    let mut argv = vec!["rsync".to_string(), "--checksum".to_string()];

    if let Some(channel) = channel {
        let ssh_args = channel.control_master_args().join(" ");
        argv.push("-e".to_string());
        argv.push(format!("ssh {ssh_args}"));
    }

    argv.push(rsync_arg(source));
    argv.push(rsync_arg(destination));
    argv
}

fn rsync_arg(endpoint: &Endpoint) -> String {
    match endpoint {
        Endpoint::Local(path) => path.to_string_lossy().into_owned(),
        Endpoint::Remote { host, path } => format!("{host}:{path}"),
    }
}

fn destination_parent(destination: &Endpoint) -> Option<Endpoint> {
    match destination {
        Endpoint::Local(path) => path.parent().map(|p| Endpoint::Local(p.to_path_buf())),
        Endpoint::Remote { host, path } => {
            let trimmed = path.trim_end_matches('/');
            trimmed.rsplit_once('/').map(|(parent, _)| Endpoint::Remote {
                host: host.clone(),
                path: parent.to_string(),
            })
        }
    }
}

async fn ensure_parent_exists(
    parent: &Endpoint,
    channel: Option<&RemoteChannel>,
    cancel: &CancelToken,
) -> Result<(), KosmoError> {
    match parent {
        Endpoint::Local(path) => create_local_dir(path),
        Endpoint::Remote { path, .. } => {
            let channel = channel.ok_or_else(|| KosmoError::Transfer {
                path: path.clone(),
                reason: "no open channel for remote parent directory".to_string(),
            })?;
            channel.mkdir_p(path, cancel).await
        }
    }
}

fn create_local_dir(path: &Path) -> Result<(), KosmoError> {
    std::fs::create_dir_all(path).map_err(|e| KosmoError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn builds_local_to_local_argv_without_ssh_flag() {
        let argv = build_argv(
            &Endpoint::Local(PathBuf::from("/a/src.txt")),
            &Endpoint::Local(PathBuf::from("/b/dst.txt")),
            None,
        );
        assert_eq!(
            argv,
            vec![
                "rsync".to_string(),
                "--checksum".to_string(),
                "/a/src.txt".to_string(),
                "/b/dst.txt".to_string(),
            ]
        );
    }

    #[test]
    fn destination_parent_for_remote_path() {
        let dst = Endpoint::Remote {
            host: "box".to_string(),
            path: "/data/sub/file.txt".to_string(),
        };
        assert_eq!(
            destination_parent(&dst),
            Some(Endpoint::Remote {
                host: "box".to_string(),
                path: "/data/sub".to_string(),
            })
        );
    }
}
