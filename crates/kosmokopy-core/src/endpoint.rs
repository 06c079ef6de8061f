//! Endpoint parsing and path rewriting (component C1).
//!
//! An [`Endpoint`] is either a path on the local host or a `host:path`
//! pair reachable through SSH. Paths are kept as `PathBuf`/`String`
//! without assuming UTF-8 round-trips through the remote shell, since
//! they are only ever compared for matching, never decoded.

use crate::error::KosmoError;
use std::path::{Path, PathBuf};

/// A transfer endpoint: a local filesystem root, or a path on a named
/// SSH host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Local(PathBuf),
    Remote { host: String, path: String },
}

impl Endpoint {
    /// Parse a CLI-supplied endpoint string.
    ///
    /// A string is `Remote` iff it has a `:` before any path
    /// separator and the token before the colon looks like an SSH
    /// host (`user@host` or `host`, non-empty, no `/`). A bare
    /// single-letter prefix (`C:`) is never treated as a host, so
    /// Windows drive-letter paths parse as `Local`.
    pub fn parse(raw: &str) -> Result<Self, KosmoError> {
        if raw.is_empty() {
            return Err(KosmoError::EndpointParse {
                raw: raw.to_string(),
                reason: "empty endpoint".to_string(),
            });
        }

        if let Some(colon) = raw.find(':') {
            let before = &raw[..colon];
            let after = &raw[colon + 1..];
            let before_is_sep = before.contains('/') || before.contains('\\');
            let single_letter_drive = before.len() == 1
                && before.chars().next().is_some_and(|c| c.is_ascii_alphabetic());

            if !before.is_empty() && !before_is_sep && !single_letter_drive {
                if after.is_empty() {
                    return Err(KosmoError::EndpointParse {
                        raw: raw.to_string(),
                        reason: "remote endpoint has no path after ':'".to_string(),
                    });
                }
                return Ok(Endpoint::Remote {
                    host: before.to_string(),
                    path: after.to_string(),
                });
            }
        }

        Ok(Endpoint::Local(PathBuf::from(raw)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Endpoint::Remote { .. })
    }

    /// Join a relative path onto this endpoint's root.
    pub fn join(&self, rel: &Path) -> Endpoint {
        match self {
            Endpoint::Local(root) => Endpoint::Local(root.join(rel)),
            Endpoint::Remote { host, path } => {
                let mut joined = path.trim_end_matches('/').to_string();
                joined.push('/');
                joined.push_str(&rel.to_string_lossy());
                Endpoint::Remote {
                    host: host.clone(),
                    path: joined,
                }
            }
        }
    }

    /// The basename of the endpoint's root path, used to preserve the
    /// source root's name in structure-preserving mode.
    pub fn basename(&self) -> String {
        match self {
            Endpoint::Local(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Endpoint::Remote { path, .. } => path
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Human-readable form for diagnostics and error messages.
    pub fn display(&self) -> String {
        match self {
            Endpoint::Local(p) => p.display().to_string(),
            Endpoint::Remote { host, path } => format!("{host}:{path}"),
        }
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            Endpoint::Remote { host, .. } => Some(host),
            Endpoint::Local(_) => None,
        }
    }
}

/// Remove every ASCII space (`0x20`) from a single path segment (file
/// or directory name). Applied independently per segment so that both
/// the leaf name and any intermediate directories created along the
/// way are rewritten the same way. Idempotent: running it twice gives
/// the same result as running it once.
pub fn rewrite_name(name: &str, strip_spaces: bool) -> String {
    if !strip_spaces {
        return name.to_string();
    }
    name.chars().filter(|&c| c != ' ').collect()
}

/// Apply [`rewrite_name`] to every component of a relative path.
pub fn rewrite_relative_path(rel: &Path, strip_spaces: bool) -> PathBuf {
    if !strip_spaces {
        return rel.to_path_buf();
    }
    let mut out = PathBuf::new();
    for component in rel.components() {
        let s = component.as_os_str().to_string_lossy();
        out.push(rewrite_name(&s, true));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_local_unix_path() {
        assert_eq!(
            Endpoint::parse("/home/user/data").unwrap(),
            Endpoint::Local(PathBuf::from("/home/user/data"))
        );
    }

    #[test]
    fn parses_remote_host_path() {
        assert_eq!(
            Endpoint::parse("myserver:/tmp/x").unwrap(),
            Endpoint::Remote {
                host: "myserver".into(),
                path: "/tmp/x".into(),
            }
        );
    }

    #[test]
    fn parses_user_at_host() {
        assert_eq!(
            Endpoint::parse("alice@box:/data").unwrap(),
            Endpoint::Remote {
                host: "alice@box".into(),
                path: "/data".into(),
            }
        );
    }

    #[test]
    fn windows_drive_letter_is_local() {
        assert_eq!(
            Endpoint::parse("C:\\Users\\me").unwrap(),
            Endpoint::Local(PathBuf::from("C:\\Users\\me"))
        );
    }

    #[test]
    fn empty_remote_path_is_error() {
        assert!(Endpoint::parse("host:").is_err());
    }

    #[test]
    fn basename_preserved_for_local_and_remote() {
        assert_eq!(
            Endpoint::parse("/a/MyRoot").unwrap().basename(),
            "MyRoot"
        );
        assert_eq!(
            Endpoint::parse("host:/a/MyRoot/").unwrap().basename(),
            "MyRoot"
        );
    }

    #[test]
    fn strip_spaces_is_idempotent() {
        let once = rewrite_name("my file (1).txt", true);
        let twice = rewrite_name(&once, true);
        assert_eq!(once, twice);
        assert_eq!(once, "myfile(1).txt");
    }

    #[test]
    fn strip_spaces_noop_when_disabled() {
        assert_eq!(rewrite_name("my file.txt", false), "my file.txt");
    }
}
