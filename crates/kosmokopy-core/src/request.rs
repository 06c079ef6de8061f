//! Request types (component C1): the fully-parsed shape of a single
//! transfer invocation, independent of how it was collected (CLI flags
//! today, conceivably a config file later).

use crate::endpoint::Endpoint;
use std::path::PathBuf;

/// What to do when the destination name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictMode {
    Skip,
    Overwrite,
    Rename,
}

/// Whether directory structure is preserved under the destination
/// root, or every file is flattened into it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    FoldersAndFiles,
    FilesOnly,
}

/// Which back-end moves the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Standard,
    Rsync,
}

/// What is being copied: a single endpoint root to walk, or an
/// explicit list of file paths (always implies [`Mode::FilesOnly`]).
#[derive(Debug, Clone)]
pub enum Source {
    Endpoint(Endpoint),
    Files(Vec<PathBuf>),
}

/// A fully-resolved transfer request.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: Source,
    pub destination: Endpoint,
    pub move_files: bool,
    pub conflict: ConflictMode,
    pub strip_spaces: bool,
    pub mode: Mode,
    pub method: Method,
    pub exclude: Vec<String>,
}

impl TransferRequest {
    /// An explicit file list always behaves as [`Mode::FilesOnly`],
    /// regardless of what was requested, since there is no tree to
    /// preserve structure from.
    pub fn effective_mode(&self) -> Mode {
        match &self.source {
            Source::Files(_) => Mode::FilesOnly,
            Source::Endpoint(_) => self.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_file_list_forces_files_only_mode() {
        let req = TransferRequest {
            source: Source::Files(vec![PathBuf::from("/a/b.txt")]),
            destination: Endpoint::Local(PathBuf::from("/dst")),
            move_files: false,
            conflict: ConflictMode::Skip,
            strip_spaces: false,
            mode: Mode::FoldersAndFiles,
            method: Method::Standard,
            exclude: vec![],
        };
        assert_eq!(req.effective_mode(), Mode::FilesOnly);
    }

    #[test]
    fn endpoint_source_respects_requested_mode() {
        let req = TransferRequest {
            source: Source::Endpoint(Endpoint::Local(PathBuf::from("/src"))),
            destination: Endpoint::Local(PathBuf::from("/dst")),
            move_files: false,
            conflict: ConflictMode::Skip,
            strip_spaces: false,
            mode: Mode::FoldersAndFiles,
            method: Method::Standard,
            exclude: vec![],
        };
        assert_eq!(req.effective_mode(), Mode::FoldersAndFiles);
    }
}
