//! Locating result files by wildcard pattern.
//!
//! Sampler outputs carry a hyperparameter description in their name that the
//! pipeline does not reconstruct, so lookups match a shell-style pattern
//! (`glob::Pattern`) against the entries of one directory. More than one
//! match for a slot is an [`Error::AmbiguousMatch`]; resolving it is left to
//! the operator.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::{Error, Result};

/// `true` when `pattern` contains a wildcard.
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern)
        .map_err(|e| Error::Configuration(format!("invalid file pattern {pattern:?}: {e}")))
}

/// Every file in `dir` whose name matches `pattern`, sorted by path.
///
/// A missing directory yields no matches.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = compile(pattern)?;
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if pattern.matches(&entry.file_name().to_string_lossy()) {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

/// The single file in `dir` matching `pattern`, `None` when there is none.
///
/// A pattern without wildcards is a plain existence check.
pub fn locate_unique(dir: &Path, pattern: &str) -> Result<Option<PathBuf>> {
    if !has_wildcard(pattern) {
        let path = dir.join(pattern);
        return Ok(path.is_file().then_some(path));
    }
    let mut candidates = matching_files(dir, pattern)?;
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.pop()),
        _ => Err(Error::AmbiguousMatch { slot: pattern.to_string(), candidates }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let mut p = std::env::temp_dir();
        p.push(format!("bps_core_harvest_{}_{}_{}", std::process::id(), nanos, name));
        std::fs::create_dir_all(&p).unwrap();
        p
    }

    #[test]
    fn test_matching_files_patterns() {
        let dir = tmp_dir("patterns");
        for name in ["run-0.1-a=0.5.json", "run-0.1-.json", "run-0.2-a.json", "seed-3.tsv", "seed-13.tsv"] {
            std::fs::write(dir.join(name), "").unwrap();
        }
        std::fs::create_dir(dir.join("run-0.1-dir.json")).unwrap();

        assert_eq!(
            matching_files(&dir, "run-0.1-*.json").unwrap(),
            vec![dir.join("run-0.1-.json"), dir.join("run-0.1-a=0.5.json")]
        );
        assert_eq!(matching_files(&dir, "seed-?.tsv").unwrap(), vec![dir.join("seed-3.tsv")]);
        assert_eq!(matching_files(&dir, "seed-[12]*.tsv").unwrap(), vec![dir.join("seed-13.tsv")]);
        assert_eq!(matching_files(&dir, "*").unwrap().len(), 5);
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let dir = tmp_dir("bad_pattern");
        assert!(matches!(matching_files(&dir, "run-[.json"), Err(Error::Configuration(_))));
        assert!(matches!(locate_unique(&dir, "run-[.json"), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_locate_unique() {
        let dir = tmp_dir("locate");
        std::fs::write(dir.join("res-1-a.json"), "{}").unwrap();
        std::fs::write(dir.join("res-2-a.json"), "{}").unwrap();
        std::fs::write(dir.join("res-2-b.json"), "{}").unwrap();

        assert_eq!(locate_unique(&dir, "res-1-*.json").unwrap(), Some(dir.join("res-1-a.json")));
        assert_eq!(locate_unique(&dir, "res-3-*.json").unwrap(), None);
        assert_eq!(locate_unique(&dir, "res-1-a.json").unwrap(), Some(dir.join("res-1-a.json")));

        match locate_unique(&dir, "res-2-*.json") {
            Err(Error::AmbiguousMatch { slot, candidates }) => {
                assert_eq!(slot, "res-2-*.json");
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected AmbiguousMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_directory_has_no_matches() {
        let dir = tmp_dir("gone").join("missing");
        assert!(matching_files(&dir, "*").unwrap().is_empty());
        assert_eq!(locate_unique(&dir, "x*").unwrap(), None);
    }
}
