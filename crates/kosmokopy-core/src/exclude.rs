//! Exclusion pattern compilation and matching (component C2).
//!
//! Four pattern kinds are recognized from their leading sigil and
//! compiled once up front; matching in the enumerator's hot loop is
//! then a basename lookup against the compiled matcher, never a
//! re-parse of the original string.

use globset::{GlobBuilder, GlobMatcher};

/// One compiled exclusion rule.
pub enum ExclusionPattern {
    /// `/name` — a literal directory name.
    ExactDir(String),
    /// `name` — a literal file name.
    ExactFile(String),
    /// `~/glob` — a case-insensitive glob matched against directory
    /// basenames.
    GlobDir(String, GlobMatcher),
    /// `~glob` — a case-insensitive glob matched against file
    /// basenames.
    GlobFile(String, GlobMatcher),
}

/// Compile a list of raw `--exclude` pattern strings.
///
/// Classification, in order:
/// - leading `/` followed by non-wildcard text -> [`ExclusionPattern::ExactDir`]
/// - leading `~/` -> [`ExclusionPattern::GlobDir`]
/// - leading `~` -> [`ExclusionPattern::GlobFile`]
/// - otherwise -> [`ExclusionPattern::ExactFile`]
///
/// A pattern that fails to compile as a glob is silently dropped —
/// excluding nothing is safer than aborting a transfer over a typo'd
/// filter.
pub fn compile(patterns: &[String]) -> Vec<ExclusionPattern> {
    patterns
        .iter()
        .filter_map(|raw| compile_one(raw))
        .collect()
}

fn compile_one(raw: &str) -> Option<ExclusionPattern> {
    if let Some(glob) = raw.strip_prefix("~/") {
        return build_matcher(glob).map(|m| ExclusionPattern::GlobDir(raw.to_string(), m));
    }
    if let Some(glob) = raw.strip_prefix('~') {
        return build_matcher(glob).map(|m| ExclusionPattern::GlobFile(raw.to_string(), m));
    }
    if let Some(name) = raw.strip_prefix('/') {
        return Some(ExclusionPattern::ExactDir(name.to_string()));
    }
    Some(ExclusionPattern::ExactFile(raw.to_string()))
}

fn build_matcher(glob: &str) -> Option<GlobMatcher> {
    GlobBuilder::new(glob)
        .case_insensitive(true)
        .backslash_escape(false)
        .build()
        .ok()
        .map(|g| g.compile_matcher())
}

/// True if `dir_name` (a basename, not a path) is excluded by any
/// directory-kind pattern.
pub fn excludes_dir(patterns: &[ExclusionPattern], dir_name: &str) -> bool {
    patterns.iter().any(|p| match p {
        ExclusionPattern::ExactDir(name) => name.eq_ignore_ascii_case(dir_name),
        ExclusionPattern::GlobDir(_, m) => m.is_match(dir_name),
        _ => false,
    })
}

/// True if `file_name` (a basename, not a path) is excluded by any
/// file-kind pattern.
pub fn excludes_file(patterns: &[ExclusionPattern], file_name: &str) -> bool {
    patterns.iter().any(|p| match p {
        ExclusionPattern::ExactFile(name) => name.eq_ignore_ascii_case(file_name),
        ExclusionPattern::GlobFile(_, m) => m.is_match(file_name),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_all_four_kinds() {
        let compiled = compile(&[
            "/cache".to_string(),
            "skip.log".to_string(),
            "~/build*".to_string(),
            "~*.tmp".to_string(),
        ]);
        assert!(matches!(compiled[0], ExclusionPattern::ExactDir(_)));
        assert!(matches!(compiled[1], ExclusionPattern::ExactFile(_)));
        assert!(matches!(compiled[2], ExclusionPattern::GlobDir(_, _)));
        assert!(matches!(compiled[3], ExclusionPattern::GlobFile(_, _)));
    }

    #[test]
    fn exact_dir_matches_basename_only() {
        let compiled = compile(&["/cache".to_string()]);
        assert!(excludes_dir(&compiled, "cache"));
        assert!(!excludes_dir(&compiled, "other"));
    }

    #[test]
    fn glob_dir_question_mark() {
        let compiled = compile(&["~/cach?".to_string()]);
        assert!(excludes_dir(&compiled, "cache"));
        assert!(!excludes_dir(&compiled, "cachee"));
    }

    #[test]
    fn glob_file_case_insensitive_extension() {
        let compiled = compile(&["~*.jpg".to_string()]);
        assert!(excludes_file(&compiled, "PHOTO.JPG"));
        assert!(excludes_file(&compiled, "snapshot.jpg"));
        assert!(!excludes_file(&compiled, "keep.txt"));
    }

    #[test]
    fn glob_file_prefix_wildcard() {
        let compiled = compile(&["~data.*".to_string()]);
        assert!(excludes_file(&compiled, "data.tmp"));
        assert!(!excludes_file(&compiled, "keep.txt"));
    }

    #[test]
    fn exact_file_exact_match() {
        let compiled = compile(&["skip_me.log".to_string()]);
        assert!(excludes_file(&compiled, "skip_me.log"));
        assert!(!excludes_file(&compiled, "skip_me.logx"));
    }

    #[test]
    fn nonexistent_pattern_matches_nothing() {
        let compiled = compile(&["/nonexistent".to_string()]);
        assert!(!excludes_dir(&compiled, "cache"));
        assert!(!excludes_file(&compiled, "cache"));
    }
}
