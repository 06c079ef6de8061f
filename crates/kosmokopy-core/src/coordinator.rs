//! The coordinator (component C8): the single-threaded pipeline that
//! ties enumeration, conflict resolution, a transfer back-end, and
//! integrity verification together into one run and produces the
//! final [`TransferReport`].
//!
//! v1 ships a sequential-only scheduler: one file is in flight at a
//! time. A parallel-file mode was considered and deliberately left
//! out; see the design notes for why.

use crate::backend::{RsyncBackend, StandardBackend, TransferBackend};
use crate::cancel::CancelToken;
use crate::checksum;
use crate::conflict::{self, Outcome};
use crate::endpoint::{self, Endpoint};
use crate::enumerate::{self, FileEntry};
use crate::error::KosmoError;
use crate::remote::RemoteChannel;
use crate::report::{Status, TransferReport};
#[cfg(test)]
use crate::request::ConflictMode;
use crate::request::{Method, Source, TransferRequest};
use std::collections::HashMap;

pub struct Coordinator {
    cancel: CancelToken,
}

impl Coordinator {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    /// Run one transfer request to completion (or cancellation, or a
    /// fatal error) and produce its report.
    pub async fn run(&self, request: &TransferRequest) -> TransferReport {
        match self.run_inner(request).await {
            Ok(report) => report,
            Err(KosmoError::Cancelled) => {
                let mut report = TransferReport::new();
                report.status = Status::Cancelled;
                report
            }
            Err(fatal) => TransferReport::fatal(fatal.report_line()),
        }
    }

    async fn run_inner(&self, request: &TransferRequest) -> Result<TransferReport, KosmoError> {
        let mut channels: HashMap<String, RemoteChannel> = HashMap::new();
        for host in hosts_in(request) {
            if !channels.contains_key(&host) {
                let channel = RemoteChannel::open(&host, &self.cancel).await?;
                channels.insert(host, channel);
            }
        }

        let source_channel = source_host(request)
            .and_then(|h| channels.get(&h));
        let (entries, exclusion_counts, walk_errors) = enumerate::enumerate(
            &request.source,
            request.effective_mode(),
            &request.exclude,
            source_channel,
            &self.cancel,
        )
        .await?;

        let backend: Box<dyn TransferBackend + Send + Sync> = match request.method {
            Method::Standard => Box::new(StandardBackend),
            Method::Rsync => Box::new(RsyncBackend),
        };

        let mut report = TransferReport::new();
        report.excluded_files = exclusion_counts.files;
        report.excluded_dirs = exclusion_counts.dirs;
        for walk_error in walk_errors {
            log::warn!("{walk_error}");
            report.errors.push(walk_error);
        }

        let destination_root = effective_destination_root(request);

        for entry in &entries {
            if self.cancel.is_cancelled() {
                report.status = Status::Cancelled;
                break;
            }

            match self
                .transfer_entry(entry, request, &destination_root, backend.as_ref(), &channels)
                .await
            {
                Ok(TransferOutcome::Copied) => report.copied += 1,
                Ok(TransferOutcome::Skipped) => report.skipped.push(entry.relative_display()),
                Err(KosmoError::Cancelled) => {
                    log::debug!("cancelled mid-transfer of {}", entry.relative_display());
                    report.status = Status::Cancelled;
                    break;
                }
                Err(e) => {
                    log::warn!("{}: {}", entry.relative_display(), e);
                    report.errors.push(e.report_line());
                }
            }

            if self.cancel.is_cancelled() {
                report.status = Status::Cancelled;
                break;
            }
        }

        Ok(report)
    }

    async fn transfer_entry(
        &self,
        entry: &FileEntry,
        request: &TransferRequest,
        destination_root: &Endpoint,
        backend: &dyn TransferBackend,
        channels: &HashMap<String, RemoteChannel>,
    ) -> Result<TransferOutcome, KosmoError> {
        let rewritten_relative =
            endpoint::rewrite_relative_path(&entry.relative, request.strip_spaces);
        let candidate = destination_root.join(&rewritten_relative);

        let dest_channel = candidate.host().and_then(|h| channels.get(h));
        let outcome = conflict::resolve(&candidate, request.conflict, dest_channel, &self.cancel)
            .await?;
        log::debug!(
            "conflict resolved for {}: {:?}",
            candidate.display(),
            outcome
        );

        let source_endpoint = entry_source_endpoint(entry, &request.source);

        let destination = match outcome {
            Outcome::Skip => {
                // The identical-file move contract: a skipped conflict
                // still lets a move complete if the untouched
                // destination is already byte-for-byte the same file.
                if request.move_files
                    && self
                        .digest_of(&source_endpoint, channels)
                        .await
                        .ok()
                        .zip(self.digest_of(&candidate, channels).await.ok())
                        .is_some_and(|(a, b)| a == b)
                {
                    self.delete_source(&source_endpoint, channels).await?;
                }
                return Ok(TransferOutcome::Skipped);
            }
            Outcome::Copy { destination, .. } => destination,
        };

        log::debug!(
            "transferring {} -> {}",
            source_endpoint.display(),
            destination.display()
        );
        backend
            .transfer_one(&source_endpoint, &destination, channels, &self.cancel)
            .await?;

        // Move mode re-hashes source and destination before deleting the
        // source, since that deletion is irreversible. Copy mode trusts the
        // back-end's own transfer integrity and skips the extra round trip.
        if request.move_files {
            self.verify(&source_endpoint, &destination, channels).await?;
            self.delete_source(&source_endpoint, channels).await?;
        }

        Ok(TransferOutcome::Copied)
    }

    async fn verify(
        &self,
        source: &Endpoint,
        destination: &Endpoint,
        channels: &HashMap<String, RemoteChannel>,
    ) -> Result<(), KosmoError> {
        let source_digest = self.digest_of(source, channels).await?;
        let dest_digest = self.digest_of(destination, channels).await?;
        if source_digest != dest_digest {
            return Err(KosmoError::Verify {
                path: destination.display(),
                reason: "checksum mismatch after transfer".to_string(),
            });
        }
        Ok(())
    }

    async fn digest_of(
        &self,
        endpoint: &Endpoint,
        channels: &HashMap<String, RemoteChannel>,
    ) -> Result<String, KosmoError> {
        match endpoint {
            Endpoint::Local(path) => checksum::sha256_local(path).await,
            Endpoint::Remote { host, path } => {
                let channel = channels.get(host).ok_or_else(|| KosmoError::Verify {
                    path: path.clone(),
                    reason: "no open channel for host".to_string(),
                })?;
                checksum::sha256_remote(channel, path, &self.cancel).await
            }
        }
    }

    /// Delete the source immediately after a verified copy, per file —
    /// never batched at the end — so a cancellation mid-run leaves
    /// `remaining_in_src + copied == total` intact.
    async fn delete_source(
        &self,
        source: &Endpoint,
        channels: &HashMap<String, RemoteChannel>,
    ) -> Result<(), KosmoError> {
        match source {
            Endpoint::Local(path) => {
                tokio::fs::remove_file(path)
                    .await
                    .map_err(|e| KosmoError::Io {
                        path: path.clone(),
                        source: e,
                    })
            }
            Endpoint::Remote { host, path } => {
                let channel = channels.get(host).ok_or_else(|| KosmoError::Transfer {
                    path: path.clone(),
                    reason: "no open channel for host".to_string(),
                })?;
                let cmd = format!("rm -f {}", crate::remote::shell_quote(path));
                let out = channel.exec(&cmd, &self.cancel).await?;
                if !out.status_success {
                    return Err(KosmoError::Transfer {
                        path: path.clone(),
                        reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
                    });
                }
                Ok(())
            }
        }
    }
}

enum TransferOutcome {
    Copied,
    Skipped,
}

impl FileEntry {
    fn relative_display(&self) -> String {
        self.relative.to_string_lossy().into_owned()
    }
}

fn entry_source_endpoint(entry: &FileEntry, source: &Source) -> Endpoint {
    match source {
        Source::Files(_) => Endpoint::Local(std::path::PathBuf::from(&entry.source_path)),
        Source::Endpoint(Endpoint::Local(_)) => {
            Endpoint::Local(std::path::PathBuf::from(&entry.source_path))
        }
        Source::Endpoint(Endpoint::Remote { host, .. }) => Endpoint::Remote {
            host: host.clone(),
            path: entry.source_path.clone(),
        },
    }
}

/// The destination root relative paths are joined onto. In
/// structure-preserving mode with an endpoint source, this is the
/// requested destination plus the source root's own basename, so that
/// copying `/a/MyRoot` into `/b` lands at `/b/MyRoot/...` rather than
/// flattening the root away.
fn effective_destination_root(request: &TransferRequest) -> Endpoint {
    match (&request.source, request.effective_mode()) {
        (Source::Endpoint(source_root), crate::request::Mode::FoldersAndFiles) => {
            let rewritten_basename =
                endpoint::rewrite_name(&source_root.basename(), request.strip_spaces);
            request
                .destination
                .join(std::path::Path::new(&rewritten_basename))
        }
        _ => request.destination.clone(),
    }
}

fn hosts_in(request: &TransferRequest) -> Vec<String> {
    let mut hosts = Vec::new();
    if let Source::Endpoint(Endpoint::Remote { host, .. }) = &request.source {
        hosts.push(host.clone());
    }
    if let Endpoint::Remote { host, .. } = &request.destination {
        if !hosts.contains(host) {
            hosts.push(host.clone());
        }
    }
    hosts
}

fn source_host(request: &TransferRequest) -> Option<String> {
    match &request.source {
        Source::Endpoint(Endpoint::Remote { host, .. }) => Some(host.clone()),
        _ => None,
    }
}
