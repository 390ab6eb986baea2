//! Component B: extracts a downloaded ZIP archive, if it is one, and returns
//! the payload file that matches an allowed extension.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::ExtractError;

const ALLOWED_EXTENSIONS: [&str; 2] = ["csv", "json"];

/// Result of extracting `path`: the file to hand to the transform stage, and
/// every filesystem path created along the way that must be removed once
/// that file has been processed.
pub struct Extracted {
    pub payload: PathBuf,
    pub cleanup: Vec<PathBuf>,
}

/// If `path` is a ZIP archive, extracts it into a sibling directory and
/// returns the first entry with an allowed extension. If `path` is not a
/// ZIP archive, it is returned unchanged with an empty cleanup set — the
/// downloaded file itself is someone else's responsibility to remove.
pub fn unzip_if_needed(path: &Path) -> Result<Extracted, ExtractError> {
    let file = File::open(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut archive = match ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(zip::result::ZipError::InvalidArchive(_)) => {
            debug!(path = %path.display(), "not a zip archive, passing through");
            return Ok(Extracted {
                payload: path.to_path_buf(),
                cleanup: Vec::new(),
            });
        }
        Err(source) => {
            return Err(ExtractError::Zip {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let extract_dir = path.with_extension("extracted");
    std::fs::create_dir_all(&extract_dir).map_err(|source| ExtractError::Io {
        path: extract_dir.clone(),
        source,
    })?;

    let mut cleanup = vec![extract_dir.clone()];
    let mut payload = None;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| ExtractError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        let Some(enclosed) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            continue;
        };
        let out_path = extract_dir.join(&enclosed);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|source| ExtractError::Io {
                path: out_path.clone(),
                source,
            })?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ExtractError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut out_file = File::create(&out_path).map_err(|source| ExtractError::Io {
            path: out_path.clone(),
            source,
        })?;
        std::io::copy(&mut entry, &mut out_file).map_err(|source| ExtractError::Io {
            path: out_path.clone(),
            source,
        })?;

        let matches_allowed = out_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);

        if matches_allowed && payload.is_none() {
            payload = Some(out_path);
        }
    }

    match payload {
        Some(payload) => {
            info!(path = %path.display(), payload = %payload.display(), "extracted");
            Ok(Extracted { payload, cleanup })
        }
        None => {
            // extract_dir and its contents are still slated for cleanup by the caller.
            cleanup.clear();
            Err(ExtractError::NoPayload {
                path: path.to_path_buf(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn make_zip(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
        let zip_path = dir.join("bundle.zip");
        let file = File::create(&zip_path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap();
        zip_path
    }

    #[test]
    fn extracts_first_allowed_entry() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = make_zip(
            dir.path(),
            &[("readme.txt", b"ignore me"), ("standard-charges.csv", b"a,b\n1,2\n")],
        );
        let extracted = unzip_if_needed(&zip_path).unwrap();
        assert!(extracted.payload.ends_with("standard-charges.csv"));
        assert_eq!(std::fs::read_to_string(&extracted.payload).unwrap(), "a,b\n1,2\n");
    }

    #[test]
    fn errors_when_no_allowed_entry_present() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = make_zip(dir.path(), &[("readme.txt", b"ignore me")]);
        let result = unzip_if_needed(&zip_path);
        assert!(matches!(result, Err(ExtractError::NoPayload { .. })));
    }

    #[test]
    fn passes_through_non_zip_files_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standard-charges.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        let extracted = unzip_if_needed(&path).unwrap();
        assert_eq!(extracted.payload, path);
        assert!(extracted.cleanup.is_empty());
    }
}
