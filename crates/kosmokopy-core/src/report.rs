//! The single JSON line a run prints to stdout.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Finished,
    Cancelled,
    Error,
}

/// The outcome of a full run, serialized as exactly one line of JSON
/// on stdout. `message` is only present when `status` is `"error"`.
#[derive(Debug, Serialize)]
pub struct TransferReport {
    pub status: Status,
    pub copied: u64,
    pub skipped: Vec<String>,
    pub errors: Vec<String>,
    pub excluded_files: u64,
    pub excluded_dirs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TransferReport {
    pub fn new() -> Self {
        Self {
            status: Status::Finished,
            copied: 0,
            skipped: Vec::new(),
            errors: Vec::new(),
            excluded_files: 0,
            excluded_dirs: 0,
            message: None,
        }
    }

    pub fn fatal(message: String) -> Self {
        Self {
            status: Status::Error,
            message: Some(message),
            ..Self::new()
        }
    }

    /// The exit code contract: zero iff the run finished (possibly
    /// cancelled) with no per-file errors.
    pub fn exit_code(&self) -> i32 {
        if self.status == Status::Error || !self.errors.is_empty() {
            1
        } else {
            0
        }
    }
}

impl Default for TransferReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_finish_exits_zero() {
        let r = TransferReport::new();
        assert_eq!(r.exit_code(), 0);
    }

    #[test]
    fn cancelled_with_no_errors_exits_zero() {
        let mut r = TransferReport::new();
        r.status = Status::Cancelled;
        assert_eq!(r.exit_code(), 0);
    }

    #[test]
    fn any_file_error_exits_one() {
        let mut r = TransferReport::new();
        r.errors.push("boom".to_string());
        assert_eq!(r.exit_code(), 1);
    }

    #[test]
    fn fatal_error_exits_one_and_serializes_message() {
        let r = TransferReport::fatal("could not connect".to_string());
        assert_eq!(r.exit_code(), 1);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"status\":\"error\""));
        assert!(json.contains("could not connect"));
    }

    #[test]
    fn message_omitted_on_success() {
        let r = TransferReport::new();
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("message"));
    }
}
