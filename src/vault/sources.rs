//! The collaborators the index reads the outside world through.
//!
//! The index never touches the file system directly: file enumeration, file
//! contents and modification times come from these traits so a host (an editor,
//! the CLI, a test) can supply its own view of the workspace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use super::helpers::relative_path;
use crate::error::{IndexError, Result};

/// Lists the workspace files matching an include glob and none of the excludes.
#[async_trait]
pub trait FileFinder: Send + Sync {
    async fn find_files(&self, include: &str, exclude: &[String]) -> Result<Vec<PathBuf>>;

    /// The subset of `paths` a walk with these excludes would list, ignoring extensions.
    fn admitted(&self, paths: &[PathBuf], exclude: &[String]) -> Result<Vec<PathBuf>>;
}

/// Current text of a file.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn read(&self, path: &Path) -> Result<String>;
}

/// Modification time of a file in milliseconds since the epoch.
#[async_trait]
pub trait MTimeSource: Send + Sync {
    async fn mtime(&self, path: &Path) -> Result<u64>;
}

/// Walks the workspace root, skipping hidden files and directories.
#[derive(Debug, Clone)]
pub struct WalkdirFinder {
    root: PathBuf,
}

impl WalkdirFinder {
    pub fn new(root: impl Into<PathBuf>) -> WalkdirFinder {
        WalkdirFinder { root: root.into() }
    }
}

#[async_trait]
impl FileFinder for WalkdirFinder {
    async fn find_files(&self, include: &str, exclude: &[String]) -> Result<Vec<PathBuf>> {
        let include = include_matcher(include)?;
        let exclude = exclude_matcher(exclude)?;
        let root = self.root.clone();

        tokio::task::spawn_blocking(move || walk(&root, &include, &exclude))
            .await
            .map_err(|err| IndexError::Io(std::io::Error::other(err)))
    }

    fn admitted(&self, paths: &[PathBuf], exclude: &[String]) -> Result<Vec<PathBuf>> {
        let exclude = exclude_matcher(exclude)?;

        Ok(paths
            .iter()
            .filter(|path| is_walkable(&relative_path(&self.root, path), &exclude))
            .cloned()
            .collect())
    }
}

fn walk(root: &Path, include: &GlobSet, exclude: &GlobSet) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .map(|s| s.starts_with('.'))
                    .unwrap_or(false)
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let relative = relative_path(root, entry.path());
            include.is_match(&relative) && is_walkable(&relative, exclude)
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// No hidden component (which also rules out paths outside the root) and no exclude match.
fn is_walkable(relative: &str, exclude: &GlobSet) -> bool {
    !relative.split('/').any(|part| part.starts_with('.')) && !exclude.is_match(relative)
}

fn glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| IndexError::Glob {
            pattern: pattern.to_string(),
            source,
        })
}

fn include_matcher(include: &str) -> Result<GlobSet> {
    build_set(vec![glob(include)?], include)
}

/// Each exclude pattern also excludes everything below a directory it matches.
fn exclude_matcher(exclude: &[String]) -> Result<GlobSet> {
    let globs = exclude
        .iter()
        .flat_map(|pattern| [pattern.clone(), format!("{}/**", pattern.trim_end_matches('/'))])
        .map(|pattern| glob(&pattern))
        .collect::<Result<Vec<_>>>()?;

    build_set(globs, &exclude.join(","))
}

fn build_set(globs: Vec<Glob>, pattern: &str) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        builder.add(glob);
    }

    builder.build().map_err(|source| IndexError::Glob {
        pattern: pattern.to_string(),
        source,
    })
}

/// Serves open editor buffers first and falls back to the disk.
#[derive(Debug, Default)]
pub struct BufferedContent {
    buffers: RwLock<HashMap<PathBuf, String>>,
}

impl BufferedContent {
    pub fn new() -> BufferedContent {
        BufferedContent::default()
    }

    pub fn open_buffer(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        if let Ok(mut buffers) = self.buffers.write() {
            buffers.insert(path.into(), text.into());
        }
    }

    pub fn close_buffer(&self, path: &Path) {
        if let Ok(mut buffers) = self.buffers.write() {
            buffers.remove(path);
        }
    }

    fn buffer(&self, path: &Path) -> Option<String> {
        self.buffers.read().ok()?.get(path).cloned()
    }
}

#[async_trait]
impl ContentSource for BufferedContent {
    async fn read(&self, path: &Path) -> Result<String> {
        match self.buffer(path) {
            Some(text) => Ok(text),
            None => Ok(tokio::fs::read_to_string(path).await?),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsMTime;

#[async_trait]
impl MTimeSource for FsMTime {
    async fn mtime(&self, path: &Path) -> Result<u64> {
        let modified = tokio::fs::metadata(path).await?.modified()?;
        let millis = modified
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_millis() as u64)
            .unwrap_or(0);

        Ok(millis)
    }
}
