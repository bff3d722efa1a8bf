//! Working directory owned by the assistant session.
//!
//! Commands run here instead of in the process-wide current directory.
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use opencli_core::OpenCliError;
use tracing::info;

/// Cheap to clone; clones share the same directory.
#[derive(Debug, Clone)]
pub struct DirectoryContext {
    current: Arc<RwLock<PathBuf>>,
}

impl DirectoryContext {
    pub fn new(start: impl AsRef<Path>) -> Self {
        Self {
            current: Arc::new(RwLock::new(start.as_ref().to_path_buf())),
        }
    }

    /// Start from the directory the process was launched in.
    pub fn from_process() -> Result<Self, OpenCliError> {
        let cwd = std::env::current_dir().map_err(|source| OpenCliError::Directory {
            path: ".".to_string(),
            source,
        })?;
        Ok(Self::new(cwd))
    }

    pub fn current(&self) -> PathBuf {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Return the current directory, switching to `new_directory` first when
    /// one is given. Relative paths resolve against the current directory.
    /// The path is taken as given; only an empty string means "no change".
    pub fn get_or_set(&self, new_directory: Option<&str>) -> Result<String, OpenCliError> {
        let requested = match new_directory {
            Some(dir) if !dir.is_empty() => dir,
            _ => return Ok(self.current().display().to_string()),
        };

        let candidate = {
            let path = Path::new(requested);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.current().join(path)
            }
        };

        let resolved = candidate
            .canonicalize()
            .map_err(|source| OpenCliError::Directory {
                path: requested.to_string(),
                source,
            })?;

        if !resolved.is_dir() {
            return Err(OpenCliError::Directory {
                path: requested.to_string(),
                source: io::Error::other("not a directory"),
            });
        }

        info!(dir = %resolved.display(), "Changed working directory");
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = resolved.clone();

        Ok(resolved.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("opencli-dir-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.canonicalize().unwrap()
    }

    #[test]
    fn test_get_is_stable_without_set() {
        let ctx = DirectoryContext::new(unique_dir());
        let first = ctx.get_or_set(None).unwrap();
        let second = ctx.get_or_set(Some("")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_set_then_get_returns_new_directory() {
        let start = unique_dir();
        let target = unique_dir();
        let ctx = DirectoryContext::new(&start);

        let set = ctx.get_or_set(Some(target.to_str().unwrap())).unwrap();
        assert_eq!(set, target.display().to_string());
        assert_eq!(ctx.get_or_set(None).unwrap(), set);
    }

    #[test]
    fn test_relative_path_resolves_against_current() {
        let start = unique_dir();
        std::fs::create_dir(start.join("child")).unwrap();
        let ctx = DirectoryContext::new(&start);

        let set = ctx.get_or_set(Some("child")).unwrap();
        assert_eq!(PathBuf::from(set), start.join("child"));
        let back = ctx.get_or_set(Some("..")).unwrap();
        assert_eq!(PathBuf::from(back), start);
    }

    #[test]
    fn test_missing_directory_is_error_and_keeps_current() {
        let start = unique_dir();
        let ctx = DirectoryContext::new(&start);

        let err = ctx.get_or_set(Some("does-not-exist")).unwrap_err();
        assert!(matches!(err, OpenCliError::Directory { .. }));
        assert_eq!(ctx.current(), start);
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let start = unique_dir();
        std::fs::write(start.join("file.txt"), "x").unwrap();
        let ctx = DirectoryContext::new(&start);

        assert!(ctx.get_or_set(Some("file.txt")).is_err());
        assert_eq!(ctx.current(), start);
    }

    #[test]
    fn test_path_is_not_trimmed() {
        let start = unique_dir();
        std::fs::create_dir(start.join(" padded ")).unwrap();
        let ctx = DirectoryContext::new(&start);

        assert!(ctx.get_or_set(Some("  ")).is_err());
        assert_eq!(ctx.current(), start);

        let set = ctx.get_or_set(Some(" padded ")).unwrap();
        assert_eq!(PathBuf::from(set), start.join(" padded "));
    }

    #[test]
    fn test_clones_share_state() {
        let ctx = DirectoryContext::new(unique_dir());
        let other = ctx.clone();
        let target = unique_dir();
        ctx.get_or_set(Some(target.to_str().unwrap())).unwrap();
        assert_eq!(other.current(), target);
    }
}
