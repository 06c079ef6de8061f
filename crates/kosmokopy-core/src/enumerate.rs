//! Source enumeration (component C4): turning a [`Source`] into the
//! ordered list of file entries the coordinator will transfer, while
//! counting (not silently dropping) anything exclusion patterns prune
//! along the way.

use crate::cancel::CancelToken;
use crate::endpoint::Endpoint;
use crate::error::KosmoError;
use crate::exclude::{self, ExclusionPattern};
use crate::remote::RemoteChannel;
use crate::request::{Mode, Source};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One file to transfer, with its path relative to the source root so
/// the coordinator can re-join it under the destination root.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path relative to the source root (or, for an explicit file
    /// list, just the file's own basename).
    pub relative: PathBuf,
    /// Absolute/full source path, local or remote-string form.
    pub source_path: String,
}

/// Tally of entries excluded during a walk, kept separate from the
/// file list so the coordinator can report exact counts even though
/// excluded entries never become [`FileEntry`] values.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExclusionCounts {
    pub files: u64,
    pub dirs: u64,
}

/// Enumerate `source` under `mode`, applying `exclude_patterns`.
///
/// Local roots are walked with [`walkdir`] in deterministic
/// depth-first, name-sorted order. Remote roots are walked through two
/// `find` passes over `channel` (directories first, to get an exact
/// exclusion count, then files) since there is no local equivalent of
/// `filter_entry` once the listing has already happened over SSH.
///
/// Returns, alongside the entries and exclusion counts, a list of
/// human-readable per-entry walk failures (e.g. an unreadable
/// subdirectory) that the caller folds into the report's `errors`
/// rather than aborting the whole run over. A failure to list the
/// root itself is fatal and surfaces as `Err`, not in this list.
pub async fn enumerate(
    source: &Source,
    mode: Mode,
    exclude_patterns: &[String],
    channel: Option<&RemoteChannel>,
    cancel: &CancelToken,
) -> Result<(Vec<FileEntry>, ExclusionCounts, Vec<String>), KosmoError> {
    let compiled = exclude::compile(exclude_patterns);

    match source {
        Source::Files(paths) => Ok((
            enumerate_explicit_files(paths),
            ExclusionCounts::default(),
            Vec::new(),
        )),
        Source::Endpoint(Endpoint::Local(root)) => enumerate_local(root, mode, &compiled),
        Source::Endpoint(Endpoint::Remote { path, .. }) => {
            let channel = channel.ok_or_else(|| KosmoError::Enumerate {
                root: path.clone(),
                reason: "no open channel for remote source".to_string(),
            })?;
            let (entries, counts) = enumerate_remote(channel, path, mode, &compiled, cancel).await?;
            Ok((entries, counts, Vec::new()))
        }
    }
}

fn enumerate_explicit_files(paths: &[PathBuf]) -> Vec<FileEntry> {
    paths
        .iter()
        .map(|p| FileEntry {
            relative: p
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| p.clone()),
            source_path: p.to_string_lossy().into_owned(),
        })
        .collect()
}

fn enumerate_local(
    root: &Path,
    mode: Mode,
    patterns: &[ExclusionPattern],
) -> Result<(Vec<FileEntry>, ExclusionCounts, Vec<String>), KosmoError> {
    let mut entries = Vec::new();
    let mut counts = ExclusionCounts::default();
    let mut walk_errors = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.path() == root {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_dir() {
                !exclude::excludes_dir(patterns, &name)
            } else {
                true
            }
        });

    for item in walker {
        let item = match item {
            Ok(i) => i,
            Err(e) => {
                // depth 0 means the root itself could not be listed
                // (missing, unreadable) — that aborts the whole run.
                // Anything deeper is one unreadable subtree, which the
                // report surfaces as a per-file error and continues.
                if e.depth() == 0 {
                    return Err(KosmoError::Enumerate {
                        root: root.display().to_string(),
                        reason: e.to_string(),
                    });
                }
                let path = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                walk_errors.push(format!("{path}: {e}"));
                continue;
            }
        };
        if item.path() == root {
            continue;
        }
        let name = item.file_name().to_string_lossy().into_owned();
        if item.file_type().is_dir() {
            if exclude::excludes_dir(patterns, &name) {
                counts.dirs += 1;
            }
            continue;
        }
        if !item.file_type().is_file() {
            continue;
        }
        if exclude::excludes_file(patterns, &name) {
            counts.files += 1;
            continue;
        }
        let relative = item
            .path()
            .strip_prefix(root)
            .unwrap_or(item.path())
            .to_path_buf();
        let relative = match mode {
            Mode::FoldersAndFiles => relative,
            Mode::FilesOnly => PathBuf::from(name),
        };
        entries.push(FileEntry {
            relative,
            source_path: item.path().to_string_lossy().into_owned(),
        });
    }

    Ok((entries, counts, walk_errors))
}

async fn enumerate_remote(
    channel: &RemoteChannel,
    root: &str,
    mode: Mode,
    patterns: &[ExclusionPattern],
    cancel: &CancelToken,
) -> Result<(Vec<FileEntry>, ExclusionCounts), KosmoError> {
    let mut counts = ExclusionCounts::default();
    let root = root.trim_end_matches('/').to_string();

    let all_dirs = channel.find_dirs(&root, cancel).await?;
    let excluded_dir_prefixes: Vec<String> = all_dirs
        .iter()
        .filter(|d| {
            let name = basename(d);
            exclude::excludes_dir(patterns, &name)
        })
        .cloned()
        .collect();
    counts.dirs = excluded_dir_prefixes.len() as u64;

    let all_files = channel.find_files(&root, cancel).await?;
    let mut entries = Vec::new();
    for file in all_files {
        if excluded_dir_prefixes
            .iter()
            .any(|d| file.starts_with(&format!("{d}/")))
        {
            continue;
        }
        let name = basename(&file);
        if exclude::excludes_file(patterns, &name) {
            counts.files += 1;
            continue;
        }
        let relative = file
            .strip_prefix(&format!("{root}/"))
            .unwrap_or(&file)
            .to_string();
        let relative = match mode {
            Mode::FoldersAndFiles => PathBuf::from(relative),
            Mode::FilesOnly => PathBuf::from(name),
        };
        entries.push(FileEntry {
            relative,
            source_path: file,
        });
    }

    Ok((entries, counts))
}

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn walks_nested_tree_in_sorted_order() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a.txt"), b"1").unwrap();
        fs::write(dir.path().join("b/c.txt"), b"2").unwrap();

        let (entries, counts, errors) =
            enumerate_local(dir.path(), Mode::FoldersAndFiles, &[]).unwrap();
        let rels: Vec<_> = entries.iter().map(|e| e.relative.clone()).collect();
        assert_eq!(rels, vec![PathBuf::from("a.txt"), PathBuf::from("b/c.txt")]);
        assert_eq!(counts.files, 0);
        assert_eq!(counts.dirs, 0);
        assert!(errors.is_empty());
    }

    #[test]
    fn files_only_mode_flattens_relative_paths() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/c.txt"), b"2").unwrap();

        let (entries, _, _) = enumerate_local(dir.path(), Mode::FilesOnly, &[]).unwrap();
        assert_eq!(entries[0].relative, PathBuf::from("c.txt"));
    }

    #[test]
    fn excluded_directory_prunes_its_contents_and_is_counted_once() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("cache/nested")).unwrap();
        fs::write(dir.path().join("cache/nested/x.txt"), b"1").unwrap();
        fs::write(dir.path().join("keep.txt"), b"2").unwrap();

        let patterns = exclude::compile(&["/cache".to_string()]);
        let (entries, counts, _) =
            enumerate_local(dir.path(), Mode::FoldersAndFiles, &patterns).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative, PathBuf::from("keep.txt"));
        assert_eq!(counts.dirs, 1);
    }

    #[test]
    fn excluded_file_is_counted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("skip.log"), b"1").unwrap();
        fs::write(dir.path().join("keep.txt"), b"2").unwrap();

        let patterns = exclude::compile(&["skip.log".to_string()]);
        let (entries, counts, _) =
            enumerate_local(dir.path(), Mode::FoldersAndFiles, &patterns).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(counts.files, 1);
    }

    #[test]
    fn nonexistent_root_is_a_fatal_enumerate_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let result = enumerate_local(&missing, Mode::FoldersAndFiles, &[]);
        assert!(matches!(result, Err(KosmoError::Enumerate { .. })));
    }

    #[test]
    fn explicit_file_list_uses_basenames() {
        let entries = enumerate_explicit_files(&[
            PathBuf::from("/a/one.txt"),
            PathBuf::from("/b/two.txt"),
        ]);
        assert_eq!(entries[0].relative, PathBuf::from("one.txt"));
        assert_eq!(entries[1].relative, PathBuf::from("two.txt"));
    }
}
