//! Integrity verification (component C7): SHA-256 digests for local
//! files, with the same digest computed remotely through the channel
//! so the coordinator can compare the two without ever pulling file
//! contents back over the wire.

use crate::cancel::CancelToken;
use crate::error::KosmoError;
use crate::remote::RemoteChannel;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 64 * 1024;

/// Stream `path` through SHA-256 without loading it into memory at
/// once. Used both to verify a freshly written local destination and,
/// for local-local copies, to verify the source did not change under
/// us mid-copy.
pub async fn sha256_local(path: &Path) -> Result<String, KosmoError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| KosmoError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| KosmoError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex(&hasher.finalize()))
}

/// Compute the SHA-256 digest of a remote file through an already-open
/// channel.
pub async fn sha256_remote(
    channel: &RemoteChannel,
    path: &str,
    cancel: &CancelToken,
) -> Result<String, KosmoError> {
    channel.sha256(path, cancel).await
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn hashes_known_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut f = tokio::fs::File::create(&path).await.unwrap();
        f.write_all(b"hello world").await.unwrap();
        drop(f);

        let digest = sha256_local(&path).await.unwrap();
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dacefbe65e1f89bb9a8a1f8c8f1e45a5a5e2b"
        );
    }

    #[tokio::test]
    async fn empty_file_hashes_to_the_empty_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        tokio::fs::File::create(&path).await.unwrap();

        let digest = sha256_local(&path).await.unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let result = sha256_local(&path).await;
        assert!(matches!(result, Err(KosmoError::Io { .. })));
    }
}
