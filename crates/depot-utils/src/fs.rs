use std::{
    fs::{self, ReadDir},
    path::{Path, PathBuf},
};

use crate::error::{FileSystemError, FileSystemResult};

/// Creates a directory and its parents if they don't exist.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).map_err(|err| FileSystemError::Directory {
            path: path.to_path_buf(),
            action: "create",
            source: err,
        })?;
    } else if !path.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Removes a file or a whole directory tree. Missing paths are not an error.
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(FileSystemError::File {
                path: path.to_path_buf(),
                action: "remove",
                source: err,
            })
        }
    }
}

/// Lazily walks every regular file below a root directory.
///
/// Directories are visited depth-first and read one at a time, so walking a tree with
/// millions of entries never holds more than one directory listing per level in memory.
/// A missing root yields nothing.
pub struct FileWalker {
    stack: Vec<ReadDir>,
}

impl FileWalker {
    pub fn new<P: AsRef<Path>>(root: P) -> FileSystemResult<Self> {
        let root = root.as_ref();
        let mut stack = Vec::new();

        match fs::read_dir(root) {
            Ok(entries) => stack.push(entries),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(FileSystemError::Directory {
                    path: root.to_path_buf(),
                    action: "read",
                    source: err,
                })
            }
        }

        Ok(Self {
            stack,
        })
    }
}

impl Iterator for FileWalker {
    type Item = FileSystemResult<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entries = self.stack.last_mut()?;
            let Some(entry) = entries.next() else {
                self.stack.pop();
                continue;
            };

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    return Some(Err(FileSystemError::File {
                        path: PathBuf::new(),
                        action: "read entry of",
                        source: err,
                    }))
                }
            };

            let path = entry.path();
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => {
                    match fs::read_dir(&path) {
                        Ok(children) => self.stack.push(children),
                        Err(err) => {
                            return Some(Err(FileSystemError::Directory {
                                path,
                                action: "read",
                                source: err,
                            }))
                        }
                    }
                }
                Ok(kind) if kind.is_file() => return Some(Ok(path)),
                Ok(_) => {}
                Err(err) => {
                    return Some(Err(FileSystemError::File {
                        path,
                        action: "stat",
                        source: err,
                    }))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_ensure_dir_exists() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("content/2026/10/19");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir_exists(&nested).unwrap();
    }

    #[test]
    fn test_ensure_dir_exists_file_collision() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("blob.bytes");
        fs::write(&file_path, "x").unwrap();
        assert!(matches!(
            ensure_dir_exists(&file_path),
            Err(FileSystemError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_safe_remove() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("blob.bytes");
        fs::write(&file_path, "x").unwrap();
        safe_remove(&file_path).unwrap();
        assert!(!file_path.exists());

        safe_remove(&file_path).unwrap();

        let sub = dir.path().join("content");
        fs::create_dir_all(sub.join("a/b")).unwrap();
        safe_remove(&sub).unwrap();
        assert!(!sub.exists());
    }

    #[test]
    fn test_file_walker_visits_nested_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::create_dir_all(dir.path().join("c")).unwrap();
        fs::write(dir.path().join("root.txt"), "").unwrap();
        fs::write(dir.path().join("a/one.txt"), "").unwrap();
        fs::write(dir.path().join("a/b/two.txt"), "").unwrap();

        let found: BTreeSet<_> = FileWalker::new(dir.path())
            .unwrap()
            .map(|p| p.unwrap())
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(
            found,
            BTreeSet::from(["one.txt".into(), "root.txt".into(), "two.txt".into()])
        );
    }

    #[test]
    fn test_file_walker_missing_root() {
        let dir = tempdir().unwrap();
        let walker = FileWalker::new(dir.path().join("missing")).unwrap();
        assert_eq!(walker.count(), 0);
    }
}
