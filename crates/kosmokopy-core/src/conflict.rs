//! Conflict resolution (component C5): deciding the final destination
//! name for one file and whether it should be copied at all.

use crate::cancel::CancelToken;
use crate::endpoint::Endpoint;
use crate::error::KosmoError;
use crate::remote::RemoteChannel;
use crate::request::ConflictMode;
use std::path::Path;

/// What the coordinator should do with one file, after conflict
/// resolution has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Copy to `destination`, which may differ from the originally
    /// requested name if a rename was needed. `replace` is true when
    /// an existing file at `destination` will be overwritten.
    Copy { destination: Endpoint, replace: bool },
    /// The destination already has this name and the mode says leave
    /// it alone.
    Skip,
}

const MAX_RENAME_ATTEMPTS: u32 = 10_000;

/// Resolve the conflict, if any, for placing a file at `candidate`.
///
/// - If nothing exists at `candidate`, copy there unconditionally.
/// - [`ConflictMode::Skip`]: an existing entry means [`Outcome::Skip`].
/// - [`ConflictMode::Overwrite`]: an existing entry is replaced.
/// - [`ConflictMode::Rename`]: probe `stem (1).ext`, `stem (2).ext`, ...
///   until a free name is found.
pub async fn resolve(
    candidate: &Endpoint,
    mode: ConflictMode,
    channel: Option<&RemoteChannel>,
    cancel: &CancelToken,
) -> Result<Outcome, KosmoError> {
    if !exists(candidate, channel, cancel).await? {
        return Ok(Outcome::Copy {
            destination: candidate.clone(),
            replace: false,
        });
    }

    match mode {
        ConflictMode::Skip => Ok(Outcome::Skip),
        ConflictMode::Overwrite => Ok(Outcome::Copy {
            destination: candidate.clone(),
            replace: true,
        }),
        ConflictMode::Rename => {
            let renamed = rename_sequence(candidate, channel, cancel).await?;
            Ok(Outcome::Copy {
                destination: renamed,
                replace: false,
            })
        }
    }
}

/// Probe `stem (1).ext`, `stem (2).ext`, ... against the same parent
/// as `candidate` until an unused name is found. The parenthesized
/// form is used for both local and remote destinations.
async fn rename_sequence(
    candidate: &Endpoint,
    channel: Option<&RemoteChannel>,
    cancel: &CancelToken,
) -> Result<Endpoint, KosmoError> {
    let name = candidate_name(candidate);
    let (stem, ext) = split_stem_ext(&name);

    for n in 1..=MAX_RENAME_ATTEMPTS {
        let trial_name = match &ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let trial = sibling(candidate, &trial_name);
        if !exists(&trial, channel, cancel).await? {
            return Ok(trial);
        }
    }

    Err(KosmoError::Conflict {
        path: candidate.display(),
        reason: "rename probe exhausted without finding a free name".to_string(),
    })
}

fn candidate_name(endpoint: &Endpoint) -> String {
    endpoint.basename()
}

fn sibling(endpoint: &Endpoint, new_name: &str) -> Endpoint {
    match endpoint {
        Endpoint::Local(path) => {
            let parent = path.parent().unwrap_or_else(|| Path::new(""));
            Endpoint::Local(parent.join(new_name))
        }
        Endpoint::Remote { host, path } => {
            let parent = path.trim_end_matches('/').rsplit_once('/').map(|(p, _)| p).unwrap_or("");
            Endpoint::Remote {
                host: host.clone(),
                path: format!("{parent}/{new_name}"),
            }
        }
    }
}

fn split_stem_ext(name: &str) -> (String, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), Some(ext.to_string())),
        _ => (name.to_string(), None),
    }
}

async fn exists(
    endpoint: &Endpoint,
    channel: Option<&RemoteChannel>,
    cancel: &CancelToken,
) -> Result<bool, KosmoError> {
    match endpoint {
        Endpoint::Local(path) => Ok(path.exists()),
        Endpoint::Remote { path, .. } => {
            let channel = channel.ok_or_else(|| KosmoError::Conflict {
                path: path.clone(),
                reason: "no open channel for remote destination".to_string(),
            })?;
            channel.exists(path, cancel).await
        }
    }
}
