//! Atomic file replacement
//!
//! Content is written to a uniquely named sibling temp file, flushed, and
//! persisted over the target. Readers see either the old file or the new
//! one, never a partial write.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::Builder;

use crate::Result;

/// Suffix carried by in-flight temp files. Never matches a record extension.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Atomically replace `path` with `content`.
///
/// Creates missing parent directories. The temp file is removed on every
/// failure path and the target is left untouched.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the parent directory cannot be created or
/// the temp file cannot be written or persisted.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("record");
    let mut tmp = Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("a/b/c/value.json");

        atomic_write(&target, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
    }

    #[test]
    fn test_overwrites_and_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("meta.yaml");

        atomic_write(&target, b"first").unwrap();
        atomic_write(&target, b"second").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        assert_eq!(entries(tmp.path()), vec!["meta.yaml".to_string()]);
    }

    #[test]
    fn test_failed_persist_cleans_up_temp_file() {
        let tmp = TempDir::new().unwrap();
        // Renaming a file onto a non-empty directory fails on every platform.
        let target = tmp.path().join("occupied");
        fs::create_dir_all(target.join("child")).unwrap();

        assert!(matches!(
            atomic_write(&target, b"data"),
            Err(crate::Error::Io(_))
        ));
        assert_eq!(entries(tmp.path()), vec!["occupied".to_string()]);
    }
}
