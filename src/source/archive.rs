// src/source/archive.rs

//! Archive extraction
//!
//! Extraction is dispatched by archive suffix to the system archive
//! tools through the [`Archiver`] trait so tests can swap in a fake.
//! Pre-compiled packages go through [`safe_extract`], which lists the
//! archive and rejects any entry that would land outside the extraction
//! root before a single file is placed.

use crate::error::{Error, Result};
use crate::shell::run_tool;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(600);

/// Archive tool capability
pub trait Archiver {
    /// Entry paths as stored in the archive, without extracting.
    fn list(&self, archive: &Path) -> Result<Vec<String>>;

    /// Extract the whole archive into `dest`.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Supported archive formats, dispatched by file-name suffix
enum Format {
    TarGz,
    TarXz,
    TarBz2,
    Zip,
}

impl Format {
    fn detect(archive: &Path) -> Result<Self> {
        let name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".tar.xz") {
            Ok(Self::TarXz)
        } else if name.ends_with(".tar.bz2") {
            Ok(Self::TarBz2)
        } else if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(Error::UnsupportedArchive(name.to_string()))
        }
    }
}

/// Production implementation shelling out to `tar` and `unzip`
#[derive(Debug, Default)]
pub struct SystemArchiver;

impl Archiver for SystemArchiver {
    fn list(&self, archive: &Path) -> Result<Vec<String>> {
        let path = archive.to_string_lossy();
        let out = match Format::detect(archive)? {
            Format::TarGz => run_tool("tar", &["-tzf", &path], None, &[], Some(ARCHIVE_TIMEOUT))?,
            Format::TarXz => run_tool("tar", &["-tJf", &path], None, &[], Some(ARCHIVE_TIMEOUT))?,
            Format::TarBz2 => run_tool("tar", &["-tjf", &path], None, &[], Some(ARCHIVE_TIMEOUT))?,
            Format::Zip => run_tool("unzip", &["-Z1", &path], None, &[], Some(ARCHIVE_TIMEOUT))?,
        };
        Ok(out
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest)?;
        let path = archive.to_string_lossy();
        let dest = dest.to_string_lossy();
        match Format::detect(archive)? {
            Format::TarGz => {
                run_tool("tar", &["-xzf", &path, "-C", &dest], None, &[], Some(ARCHIVE_TIMEOUT))?
            }
            Format::TarXz => {
                run_tool("tar", &["-xJf", &path, "-C", &dest], None, &[], Some(ARCHIVE_TIMEOUT))?
            }
            Format::TarBz2 => {
                run_tool("tar", &["-xjf", &path, "-C", &dest], None, &[], Some(ARCHIVE_TIMEOUT))?
            }
            Format::Zip => {
                run_tool("unzip", &["-q", &path, "-d", &dest], None, &[], Some(ARCHIVE_TIMEOUT))?
            }
        };
        Ok(())
    }
}

/// Reject an archive entry path that would resolve outside the
/// extraction root: absolute paths and anything containing a parent
/// component.
pub fn validate_entry(entry: &str) -> Result<()> {
    let path = Path::new(entry);
    if path.is_absolute() {
        return Err(Error::UnsafePath(entry.to_string()));
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(Error::UnsafePath(entry.to_string()));
        }
    }
    Ok(())
}

/// Extract for pre-compiled packages: every entry is validated against
/// the extraction root before anything is written.
pub fn safe_extract(archiver: &dyn Archiver, archive: &Path, extract_root: &Path) -> Result<()> {
    for entry in archiver.list(archive)? {
        validate_entry(&entry)?;
    }
    archiver.extract(archive, extract_root)
}

/// The common single-top-level-directory convention: if extraction
/// produced exactly one directory, that is the build directory;
/// otherwise the extraction root itself is.
pub fn post_extract_dir(extract_root: &Path) -> Result<PathBuf> {
    let entries: Vec<_> = fs::read_dir(extract_root)?
        .collect::<std::io::Result<Vec<_>>>()?;

    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        let dir = entries[0].path();
        debug!("using single top-level dir {}", dir.display());
        return Ok(dir);
    }
    Ok(extract_root.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_entry_accepts_normal_paths() {
        validate_entry("usr/bin/foo").unwrap();
        validate_entry("./usr/bin/foo").unwrap();
        validate_entry("deeply/nested/file.txt").unwrap();
    }

    #[test]
    fn test_validate_entry_rejects_traversal() {
        assert!(matches!(validate_entry(".."), Err(Error::UnsafePath(_))));
        assert!(matches!(
            validate_entry("../../evil"),
            Err(Error::UnsafePath(_))
        ));
        assert!(matches!(
            validate_entry("usr/../../evil"),
            Err(Error::UnsafePath(_))
        ));
        assert!(matches!(
            validate_entry("/etc/passwd"),
            Err(Error::UnsafePath(_))
        ));
    }

    #[test]
    fn test_unknown_suffix_rejected() {
        let err = SystemArchiver
            .extract(Path::new("/tmp/pkg.rar"), Path::new("/tmp/out"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedArchive(_)));

        let err = SystemArchiver.list(Path::new("/tmp/pkg.7z")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedArchive(_)));
    }

    #[test]
    fn test_tar_gz_round_trip() {
        let temp = TempDir::new().unwrap();
        let content_dir = temp.path().join("content");
        fs::create_dir_all(content_dir.join("pkg")).unwrap();
        fs::write(content_dir.join("pkg/hello.txt"), "hello").unwrap();

        let archive = temp.path().join("pkg.tar.gz");
        run_tool(
            "tar",
            &[
                "-czf",
                archive.to_str().unwrap(),
                "-C",
                content_dir.to_str().unwrap(),
                "pkg",
            ],
            None,
            &[],
            None,
        )
        .unwrap();

        let entries = SystemArchiver.list(&archive).unwrap();
        assert!(entries.iter().any(|e| e.contains("hello.txt")));

        let out = temp.path().join("out");
        SystemArchiver.extract(&archive, &out).unwrap();
        assert_eq!(
            fs::read_to_string(out.join("pkg/hello.txt")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_post_extract_dir_single_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("only")).unwrap();
        assert_eq!(
            post_extract_dir(temp.path()).unwrap(),
            temp.path().join("only")
        );
    }

    #[test]
    fn test_post_extract_dir_multiple_entries() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("one")).unwrap();
        fs::write(temp.path().join("two.txt"), "x").unwrap();
        assert_eq!(post_extract_dir(temp.path()).unwrap(), temp.path());
    }

    #[test]
    fn test_post_extract_dir_single_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("lonely.txt"), "x").unwrap();
        assert_eq!(post_extract_dir(temp.path()).unwrap(), temp.path());
    }

    #[test]
    fn test_safe_extract_aborts_before_extraction() {
        use std::cell::Cell;

        struct Fake {
            extracted: Cell<bool>,
        }
        impl Archiver for Fake {
            fn list(&self, _archive: &Path) -> Result<Vec<String>> {
                Ok(vec!["ok.txt".to_string(), "../../evil".to_string()])
            }
            fn extract(&self, _archive: &Path, _dest: &Path) -> Result<()> {
                self.extracted.set(true);
                Ok(())
            }
        }

        let fake = Fake {
            extracted: Cell::new(false),
        };
        let err = safe_extract(&fake, Path::new("/tmp/a.tar.gz"), Path::new("/tmp/out"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsafePath(_)));
        assert!(!fake.extracted.get());
    }
}
