//! Source tree enumeration.
//!
//! `walk_files` yields matching regular files lazily; `count_files` performs the identical walk
//! up front so progress totals line up with the number of jobs that will actually run.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{CopyError, Result};

/// One discoverable source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub size: u64,
}

/// Which files a walk yields.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// Plain suffix the file name must end with, no dot implied. `None` matches every file.
    pub extension: Option<String>,
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl FileFilter {
    pub fn new(extension: Option<&str>, recursive: bool) -> Self {
        Self {
            extension: extension.filter(|ext| !ext.is_empty()).map(str::to_string),
            recursive,
        }
    }

    /// Check if a file name passes the extension filter
    pub fn matches(&self, path: &Path) -> bool {
        let Some(suffix) = self.extension.as_deref() else {
            return true;
        };
        path.file_name()
            .map(|name| name.to_string_lossy().ends_with(suffix))
            .unwrap_or(false)
    }

    fn walker(&self, root: &Path) -> WalkDir {
        let walker = WalkDir::new(root).follow_links(false).min_depth(1);
        if self.recursive {
            walker
        } else {
            walker.max_depth(1)
        }
    }
}

fn ensure_dir(root: &Path) -> Result<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(CopyError::invalid_source(root))
    }
}

/// Lazy, finite, single-use sequence of matching files under a root.
///
/// Directories are traversed (when recursive) but never yielded. Entries that cannot be read
/// are logged and skipped.
pub struct FileWalk {
    inner: walkdir::IntoIter,
    filter: FileFilter,
}

impl Iterator for FileWalk {
    type Item = FileDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.filter.matches(entry.path()) {
                continue;
            }
            match entry.metadata() {
                Ok(metadata) => {
                    return Some(FileDescriptor {
                        path: entry.into_path(),
                        size: metadata.len(),
                    })
                }
                Err(e) => warn!("Skipping {}: {e}", entry.path().display()),
            }
        }
    }
}

/// Start a walk over `root`. Fails immediately if `root` is not a directory.
pub fn walk_files(root: &Path, filter: &FileFilter) -> Result<FileWalk> {
    ensure_dir(root)?;
    debug!(root = %root.display(), recursive = filter.recursive, "walking source tree");
    Ok(FileWalk {
        inner: filter.walker(root).into_iter(),
        filter: filter.clone(),
    })
}

/// Total number of matching files and their combined size.
pub fn count_files(root: &Path, filter: &FileFilter) -> Result<(u64, u64)> {
    count_files_until(root, filter, || false)
}

/// Like [`count_files`], but gives up as soon as `stop` returns true and reports what was
/// counted so far.
pub fn count_files_until(
    root: &Path,
    filter: &FileFilter,
    stop: impl Fn() -> bool,
) -> Result<(u64, u64)> {
    let totals = walk_files(root, filter)?
        .take_while(|_| !stop())
        .fold((0u64, 0u64), |(files, bytes), entry| {
            (files + 1, bytes + entry.size)
        });
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"aaaa").unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"bb").unwrap();
        fs::write(dir.path().join("sub/c.log"), b"c").unwrap();
        fs::write(dir.path().join("sub/deeper/d.txt"), b"dddddd").unwrap();
        dir
    }

    fn names(root: &Path, filter: &FileFilter) -> Vec<String> {
        let mut names: Vec<String> = walk_files(root, filter)
            .unwrap()
            .map(|f| {
                f.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn flat_walk_ignores_subdirectories() {
        let dir = tree();
        assert_eq!(names(dir.path(), &FileFilter::default()), vec!["a.txt"]);
    }

    #[test]
    fn recursive_walk_with_extension() {
        let dir = tree();
        let filter = FileFilter::new(Some("txt"), true);
        assert_eq!(
            names(dir.path(), &filter),
            vec!["a.txt", "sub/b.txt", "sub/deeper/d.txt"]
        );
    }

    #[test]
    fn count_matches_walk() {
        let dir = tree();
        for filter in [
            FileFilter::default(),
            FileFilter::new(None, true),
            FileFilter::new(Some(".log"), true),
            FileFilter::new(Some("txt"), false),
        ] {
            let walked: Vec<_> = walk_files(dir.path(), &filter).unwrap().collect();
            let (files, bytes) = count_files(dir.path(), &filter).unwrap();
            assert_eq!(files, walked.len() as u64);
            assert_eq!(bytes, walked.iter().map(|f| f.size).sum::<u64>());
        }
        assert_eq!(
            count_files(dir.path(), &FileFilter::new(Some("txt"), true)).unwrap(),
            (3, 12)
        );
    }

    #[test]
    fn counting_stops_when_asked() {
        let dir = tree();
        let filter = FileFilter::new(None, true);
        assert_eq!(count_files_until(dir.path(), &filter, || true).unwrap(), (0, 0));

        let seen = std::cell::Cell::new(0);
        let (files, _) = count_files_until(dir.path(), &filter, || {
            seen.set(seen.get() + 1);
            seen.get() > 2
        })
        .unwrap();
        assert_eq!(files, 2);
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(walk_files(dir.path(), &FileFilter::new(None, true)).unwrap().count(), 0);
        assert_eq!(count_files(dir.path(), &FileFilter::default()).unwrap(), (0, 0));
    }

    #[test]
    fn bad_root_fails_before_walking() {
        let dir = tree();
        let missing = dir.path().join("missing");
        assert!(matches!(
            walk_files(&missing, &FileFilter::default()),
            Err(CopyError::InvalidRoot { .. })
        ));
        assert!(matches!(
            count_files(&dir.path().join("a.txt"), &FileFilter::default()),
            Err(CopyError::InvalidRoot { .. })
        ));
    }

    #[test]
    fn extension_is_a_plain_suffix() {
        let dir = tree();
        fs::write(dir.path().join("notes_txt"), b"n").unwrap();

        let bare = FileFilter::new(Some("txt"), false);
        assert_eq!(names(dir.path(), &bare), vec!["a.txt", "notes_txt"]);

        let dotted = FileFilter::new(Some(".txt"), false);
        assert_eq!(names(dir.path(), &dotted), vec!["a.txt"]);

        assert!(FileFilter::new(Some(""), false).extension.is_none());
        assert!(FileFilter::new(Some("_final.csv"), false).matches(Path::new("q3_final.csv")));
    }
}
