//! Error taxonomy for the transfer engine.
//!
//! Errors are split into two tiers: *fatal* kinds abort the whole run
//! before any file is touched (or mid-enumeration, if the root itself
//! cannot be listed), and *per-file* kinds are accumulated by the
//! coordinator while the run continues. The distinction is encoded in
//! the variant, not inferred by callers.

use std::path::PathBuf;

/// A typed error raised anywhere in the engine.
#[derive(Debug, thiserror::Error)]
pub enum KosmoError {
    /// A `host:path` style endpoint string could not be parsed. Fatal.
    #[error("invalid endpoint {raw:?}: {reason}")]
    EndpointParse { raw: String, reason: String },

    /// The SSH control-master connection for a host could not be
    /// established. Fatal.
    #[error("could not connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    /// Enumerating the source tree failed. Fatal when it affects the
    /// root; sub-tree failures are folded into `Transfer` per file.
    #[error("enumeration of {root} failed: {reason}")]
    Enumerate { root: String, reason: String },

    /// The conflict resolver could not settle on a destination name
    /// (rename probe exhausted) or found a type mismatch. Per-file.
    #[error("{path}: {reason}")]
    Conflict { path: String, reason: String },

    /// A back-end reported a non-zero exit or I/O failure. Per-file.
    #[error("{path}: transfer failed: {reason}")]
    Transfer { path: String, reason: String },

    /// A post-move integrity check did not match. Per-file; the
    /// source is guaranteed to still exist when this is returned.
    #[error("{path}: integrity verification failed: {reason}")]
    Verify { path: String, reason: String },

    /// A remote command exited non-zero, or exited zero with an
    /// empty answer to a query that must not be empty.
    #[error("remote command `{command}` failed: {reason}")]
    RemoteCommand { command: String, reason: String },

    /// Local filesystem I/O failure not otherwise categorized.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run's cancellation flag fired while this operation was in
    /// flight. Neither fatal nor a per-file failure: the coordinator
    /// stops the loop and reports the current file as not-copied,
    /// without adding anything to `TransferReport.errors`.
    #[error("cancelled")]
    Cancelled,
}

impl KosmoError {
    /// Fatal errors abort the whole run with `status: "error"`; all
    /// other kinds are accumulated per-file and the run continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KosmoError::EndpointParse { .. } | KosmoError::Connect { .. }
        )
    }

    /// True for the cancellation signal, which is a distinct terminal
    /// status rather than an error of either tier.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KosmoError::Cancelled)
    }

    /// Render as the short, human-readable string the JSON report
    /// puts in its `errors` array (always path-prefixed when a path
    /// is known).
    pub fn report_line(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, KosmoError>;
