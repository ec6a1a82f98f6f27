//! engine::site
//!
//! Reading a built documentation site from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::OperationError;
use crate::core::paths;
use crate::core::types::FileMode;
use crate::git::TreeFile;

/// One file of a built site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Tree path relative to the site root
    pub path: String,
    pub data: Vec<u8>,
    pub executable: bool,
}

impl SourceFile {
    pub fn mode(&self) -> FileMode {
        FileMode::for_file(self.executable)
    }

    pub fn into_tree_file(self) -> TreeFile {
        TreeFile {
            mode: self.mode(),
            path: self.path,
            data: self.data,
        }
    }
}

/// Something that yields the files to deploy.
pub trait SiteSource {
    fn files(&self) -> Result<Vec<SourceFile>, OperationError>;
}

impl SiteSource for Vec<SourceFile> {
    fn files(&self) -> Result<Vec<SourceFile>, OperationError> {
        Ok(self.clone())
    }
}

/// A site directory on disk.
///
/// Walks recursively, skipping `.git`. Symlinked files are read through;
/// symlinked directories are not entered.
#[derive(Debug, Clone)]
pub struct SiteDir {
    root: PathBuf,
}

impl SiteDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(&self, dir: &Path, out: &mut Vec<SourceFile>) -> Result<(), OperationError> {
        for entry in fs::read_dir(dir).map_err(io_error(dir))? {
            let entry = entry.map_err(io_error(dir))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(io_error(&path))?;

            if file_type.is_dir() {
                if entry.file_name() != ".git" {
                    self.walk(&path, out)?;
                }
                continue;
            }

            // Follow symlinks, but only to files.
            let metadata = match fs::metadata(&path) {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) if file_type.is_symlink() => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping broken symlink");
                    continue;
                }
                Err(e) => return Err(io_error(&path)(e)),
            };

            let relative = path.strip_prefix(&self.root).unwrap_or(&path);
            out.push(SourceFile {
                path: paths::from_fs(relative)?,
                data: fs::read(&path).map_err(io_error(&path))?,
                executable: is_executable(&metadata),
            });
        }
        Ok(())
    }
}

impl SiteSource for SiteDir {
    fn files(&self) -> Result<Vec<SourceFile>, OperationError> {
        let mut files = Vec::new();
        self.walk(&self.root, &mut files)?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(root = %self.root.display(), count = files.len(), "collected site files");
        Ok(files)
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> OperationError {
    let path = path.to_path_buf();
    move |source| OperationError::Io { path, source }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}
