//! Archive load/save
//!
//! A missing file is not an error (the caller starts empty); a file that
//! exists but is not valid HAR is fatal. Saves rewrite the whole archive
//! through a temp file so a concurrent reader never observes a truncated
//! document.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{CassetteError, Result};

use super::model::HttpArchive;
use super::ARCHIVE_EXTENSION;

/// Load an archive from `path`
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns [`CassetteError::MalformedArchive`] when the file exists but
/// cannot be decoded, or an I/O error for any other read failure.
pub fn load(path: &Path) -> Result<Option<HttpArchive>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No archive at {}, starting empty", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let archive: HttpArchive =
        serde_json::from_slice(&bytes).map_err(|source| CassetteError::MalformedArchive {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        "Loaded archive {} ({} entries)",
        path.display(),
        archive.log.entries.len()
    );

    Ok(Some(archive))
}

/// Save an archive to `path`, returning the canonical path written
///
/// Creates parent directories, appends the `.har` extension when the caller
/// omitted it, and replaces any existing file atomically via a temp file and
/// rename.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written or renamed.
pub fn save(archive: &HttpArchive, path: &Path) -> Result<PathBuf> {
    let path = canonical_path(path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let bytes = serde_json::to_vec_pretty(archive)
        .map_err(|source| CassetteError::MalformedArchive {
            path: path.clone(),
            source,
        })?;

    let tmp = path.with_extension(format!("{ARCHIVE_EXTENSION}.tmp"));
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, &path)?;

    info!(
        "Saved archive {} ({} entries)",
        path.display(),
        archive.log.entries.len()
    );

    Ok(path)
}

/// Append the archive extension unless the path already carries it
pub fn canonical_path(path: &Path) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some(ARCHIVE_EXTENSION) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(ARCHIVE_EXTENSION);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::har::{Creator, Entry, Request};
    use tempfile::TempDir;

    fn sample_archive() -> HttpArchive {
        let mut archive = HttpArchive::default();
        archive.log.creator = Creator::new("cassette", "test");
        archive.log.entries.push(Entry {
            request: Request {
                method: "GET".to_string(),
                url: "https://example.com/a".to_string(),
                ..Request::default()
            },
            response: Some(crate::har::Response::default()),
            ..Entry::default()
        });
        archive
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let result = load(&dir.path().join("absent.har")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.har");
        fs::write(&path, "this is not json").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, CassetteError::MalformedArchive { .. }));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.har");
        let archive = sample_archive();

        save(&archive, &path).unwrap();
        let loaded = load(&path).unwrap().unwrap();

        assert_eq!(loaded, archive);
    }

    #[test]
    fn test_save_empty_archive_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.har");

        save(&HttpArchive::default(), &path).unwrap();
        let loaded = load(&path).unwrap().unwrap();

        assert!(loaded.log.entries.is_empty());
    }

    #[test]
    fn test_save_appends_extension() {
        let dir = TempDir::new().unwrap();
        let written = save(&sample_archive(), &dir.path().join("session")).unwrap();

        assert_eq!(written, dir.path().join("session.har"));
        assert!(written.exists());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/session.har");

        save(&sample_archive(), &nested).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_save_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.har");

        save(&sample_archive(), &path).unwrap();
        save(&HttpArchive::default(), &path).unwrap();

        let loaded = load(&path).unwrap().unwrap();
        assert!(loaded.log.entries.is_empty());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        save(&sample_archive(), &dir.path().join("session.har")).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_canonical_path_keeps_existing_extension() {
        assert_eq!(
            canonical_path(Path::new("/tmp/x.har")),
            PathBuf::from("/tmp/x.har")
        );
        assert_eq!(
            canonical_path(Path::new("/tmp/x")),
            PathBuf::from("/tmp/x.har")
        );
    }
}
