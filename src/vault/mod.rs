mod dangling;
mod helpers;
mod resolver;
mod sources;


pub use dangling::{extract_dangling_refs, find_dangling_refs_by_path};
pub use helpers::{
    fs_path_to_ref, get_ref_with_ext, is_long_ref, is_unc_path, normalize_slashes, relative_path,
    trim_leading_slash, trim_slashes, trim_trailing_slash,
};
pub use resolver::find_uri_by_ref;
pub use sources::{BufferedContent, ContentSource, FileFinder, FsMTime, MTimeSource, WalkdirFinder};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;

use crate::config::Settings;
use crate::error::{IndexError, Result};
use crate::ext::{extract_ext, is_unknown_ext, ExtCategory, IMAGE_EXTS, OTHER_EXTS};
use crate::sort::compare_shallow_first;

/// A file known to the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Root-relative path with `/` separators
    pub relative: String,
    pub basename: String,
    pub category: ExtCategory,
}

impl FileRecord {
    pub fn new(root: &Path, path: PathBuf) -> FileRecord {
        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        FileRecord {
            relative: relative_path(root, &path),
            category: ExtCategory::of(&basename),
            basename,
            path,
        }
    }

    pub fn stem(&self) -> &str {
        let ext = extract_ext(&self.basename);
        match ext.is_empty() {
            true => &self.basename,
            false => &self.basename[..self.basename.len() - ext.len() - 1],
        }
    }

    fn starts_with_any(&self, prefixes: &[String]) -> bool {
        let path = self.path.to_string_lossy();
        prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Snapshot of everything the index knows about the workspace.
///
/// The file lists are kept sorted shallow-first, and `all` is always the
/// union of the three category lists. `dangling_refs` is always the
/// deduplicated union of the values of `dangling_refs_by_path`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkspaceCache {
    markdown: Vec<FileRecord>,
    image: Vec<FileRecord>,
    other: Vec<FileRecord>,
    all: Vec<FileRecord>,
    dangling_refs_by_path: BTreeMap<PathBuf, Vec<String>>,
    dangling_refs: Vec<String>,
}

impl WorkspaceCache {
    pub fn markdown(&self) -> &[FileRecord] {
        &self.markdown
    }

    pub fn image(&self) -> &[FileRecord] {
        &self.image
    }

    pub fn other(&self) -> &[FileRecord] {
        &self.other
    }

    pub fn all(&self) -> &[FileRecord] {
        &self.all
    }

    pub fn dangling_refs_by_path(&self) -> &BTreeMap<PathBuf, Vec<String>> {
        &self.dangling_refs_by_path
    }

    pub fn dangling_refs(&self) -> &[String] {
        &self.dangling_refs
    }

    /// Resolves `reference` against every indexed file.
    pub fn resolve(&self, reference: &str) -> Option<&FileRecord> {
        find_uri_by_ref(&self.all, reference)
    }

    fn set_files(&mut self, markdown: Vec<FileRecord>, image: Vec<FileRecord>, other: Vec<FileRecord>) {
        let all = markdown
            .iter()
            .chain(image.iter())
            .chain(other.iter())
            .cloned()
            .collect();

        self.markdown = sorted_records(markdown);
        self.image = sorted_records(image);
        self.other = sorted_records(other);
        self.all = sorted_records(all);
    }

    fn set_dangling(&mut self, dangling_refs_by_path: BTreeMap<PathBuf, Vec<String>>) {
        let aggregated = dangling_refs_by_path
            .values()
            .flatten()
            .unique()
            .sorted_by(|a, b| compare_shallow_first(a, b))
            .cloned()
            .collect();

        self.dangling_refs_by_path = dangling_refs_by_path;
        self.dangling_refs = aggregated;
    }
}

fn sorted_records(records: Vec<FileRecord>) -> Vec<FileRecord> {
    records
        .into_iter()
        .unique_by(|record| record.path.clone())
        .sorted_by(|a, b| compare_shallow_first(&a.path.to_string_lossy(), &b.path.to_string_lossy()))
        .collect()
}

fn prefixes(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect()
}

/// Owner of the workspace cache and of the collaborators that feed it.
///
/// Every mutation takes `&mut self`, so operations on one index are
/// serialized by construction. Each operation computes its new state in full
/// before assigning it, and a failed operation leaves the previous state in place.
pub struct FileIndex {
    root: PathBuf,
    settings: Settings,
    finder: Arc<dyn FileFinder>,
    content: Arc<dyn ContentSource>,
    cache: WorkspaceCache,
}

impl FileIndex {
    pub fn new(
        root: impl Into<PathBuf>,
        settings: Settings,
        finder: Arc<dyn FileFinder>,
        content: Arc<dyn ContentSource>,
    ) -> FileIndex {
        FileIndex {
            root: root.into(),
            settings,
            finder,
            content,
            cache: WorkspaceCache::default(),
        }
    }

    /// An empty index over `root` that walks the disk and reads files directly.
    pub fn open(root: impl Into<PathBuf>, settings: Settings) -> Result<FileIndex> {
        let root = root.into();
        if !root.is_dir() {
            return Err(IndexError::RootNotDirectory(root));
        }

        let finder = Arc::new(WalkdirFinder::new(&root));
        Ok(FileIndex::new(root, settings, finder, Arc::new(BufferedContent::new())))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &WorkspaceCache {
        &self.cache
    }

    pub fn content(&self) -> &dyn ContentSource {
        self.content.as_ref()
    }

    /// Rescans the file lists from the finder, then recomputes every dangling ref.
    pub async fn rebuild_all(&mut self) -> Result<()> {
        let exclude = self.settings.exclude_patterns(None);

        let markdown = self.find_records("**/*.md", &exclude).await?;
        let image = self
            .find_records(&format!("**/*.{{{}}}", IMAGE_EXTS.join(",")), &exclude)
            .await?;
        let other = self
            .find_records(&format!("**/*.{{{}}}", OTHER_EXTS.join(",")), &exclude)
            .await?;

        let mut next = self.cache.clone();
        next.set_files(markdown, image, other);
        let by_path =
            find_dangling_refs_by_path(&paths_of(&next.markdown), &next.all, self.content.as_ref())
                .await?;
        next.set_dangling(by_path);
        self.cache = next;

        tracing::info!(
            "Indexed {} files under {}, {} dangling refs",
            self.cache.all.len(),
            self.root.display(),
            self.cache.dangling_refs.len()
        );

        Ok(())
    }

    /// Recomputes the dangling refs of every indexed markdown file.
    pub async fn rebuild_dangling(&mut self) -> Result<()> {
        let by_path = find_dangling_refs_by_path(
            &paths_of(&self.cache.markdown),
            &self.cache.all,
            self.content.as_ref(),
        )
        .await?;
        self.cache.set_dangling(by_path);

        tracing::info!(
            "Found {} dangling refs in {} files",
            self.cache.dangling_refs.len(),
            self.cache.dangling_refs_by_path.len()
        );

        Ok(())
    }

    /// Rescans `paths` and replaces their dangling entries, leaving other files alone.
    pub async fn add_dangling(&mut self, paths: &[PathBuf]) -> Result<()> {
        let scanned =
            find_dangling_refs_by_path(paths, &self.cache.all, self.content.as_ref()).await?;

        let mut merged = self.cache.dangling_refs_by_path.clone();
        for path in paths {
            merged.remove(path);
        }
        merged.extend(scanned);
        self.cache.set_dangling(merged);

        tracing::debug!("Rescanned dangling refs for {} paths", paths.len());

        Ok(())
    }

    /// Drops the dangling entries of every file under any of `paths`.
    ///
    /// Matching is by string prefix, so a directory path removes all files below it.
    pub fn remove_dangling(&mut self, paths: &[PathBuf]) {
        let prefixes = prefixes(paths);

        let remaining = self
            .cache
            .dangling_refs_by_path
            .iter()
            .filter(|(path, _)| {
                let path = path.to_string_lossy();
                !prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
            })
            .map(|(path, refs)| (path.clone(), refs.clone()))
            .collect();
        self.cache.set_dangling(remaining);

        tracing::debug!("Removed dangling refs under {} paths", paths.len());
    }

    /// Indexes newly created files and updates the dangling refs they affect.
    ///
    /// Refs elsewhere that now resolve to one of the new files stop being
    /// dangling, and new markdown files are scanned for their own refs.
    pub async fn add_files(&mut self, paths: &[PathBuf]) -> Result<()> {
        // paths a full rebuild would never list stay out of the index
        let admitted = self
            .finder
            .admitted(paths, &self.settings.exclude_patterns(None))?;

        let mut added = Vec::new();
        for path in &admitted {
            if tokio::fs::metadata(path).await.is_ok_and(|meta| meta.is_file()) {
                added.push(FileRecord::new(&self.root, path.clone()));
            }
        }

        let (mut markdown, mut image, mut other) = (
            self.cache.markdown.clone(),
            self.cache.image.clone(),
            self.cache.other.clone(),
        );
        for record in added {
            match record.category {
                ExtCategory::Markdown => markdown.push(record),
                ExtCategory::Image => image.push(record),
                ExtCategory::Other => other.push(record),
                ExtCategory::Unknown | ExtCategory::None => {}
            }
        }

        let mut next = self.cache.clone();
        next.set_files(markdown, image, other);

        let all = &next.all;
        let still_dangling = next
            .dangling_refs_by_path
            .iter()
            .filter_map(|(path, refs)| {
                let refs = refs
                    .iter()
                    .filter(|target| find_uri_by_ref(all, target).is_none())
                    .cloned()
                    .collect::<Vec<_>>();
                (!refs.is_empty()).then(|| (path.clone(), refs))
            })
            .collect::<BTreeMap<_, _>>();
        next.set_dangling(still_dangling);

        let scanned =
            find_dangling_refs_by_path(&admitted, &next.all, self.content.as_ref()).await?;
        let mut merged = next.dangling_refs_by_path.clone();
        for path in &admitted {
            merged.remove(path);
        }
        merged.extend(scanned);
        next.set_dangling(merged);

        self.cache = next;

        tracing::debug!(
            "Added {} of {} paths, {} files indexed",
            admitted.len(),
            paths.len(),
            self.cache.all.len()
        );

        Ok(())
    }

    /// Forgets every file under any of `paths`, then rescans for refs that no longer resolve.
    pub async fn remove_files(&mut self, paths: &[PathBuf]) -> Result<()> {
        let prefixes = prefixes(paths);
        let keep = |records: &[FileRecord]| {
            records
                .iter()
                .filter(|record| !record.starts_with_any(&prefixes))
                .cloned()
                .collect::<Vec<_>>()
        };

        let (markdown, image, other) = (
            keep(&self.cache.markdown),
            keep(&self.cache.image),
            keep(&self.cache.other),
        );

        let mut next = self.cache.clone();
        next.set_files(markdown, image, other);
        let by_path =
            find_dangling_refs_by_path(&paths_of(&next.markdown), &next.all, self.content.as_ref())
                .await?;
        next.set_dangling(by_path);
        self.cache = next;

        tracing::debug!("Removed {} paths, {} files indexed", paths.len(), self.cache.all.len());

        Ok(())
    }

    /// Resets the cache to empty.
    pub fn clear(&mut self) {
        self.cache = WorkspaceCache::default();
    }

    /// Every workspace file with one of the unknown extensions found among `paths`.
    pub async fn find_all_uris_with_unknown_exts(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let unknown_exts = paths
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .filter(|path| is_unknown_ext(path))
            .map(|path| extract_ext(&path).to_string())
            .unique()
            .collect::<Vec<_>>();

        if unknown_exts.is_empty() {
            return Ok(Vec::new());
        }

        let include = format!("**/*.{{{}}}", unknown_exts.join(","));
        self.finder
            .find_files(&include, &self.settings.exclude_patterns(None))
            .await
    }

    /// Resolves `reference` for a command that opens the target.
    ///
    /// An unresolved ref is a soft failure: it is reported as a warning and
    /// `None` is returned.
    pub fn open_reference(&self, reference: &str) -> Option<&FileRecord> {
        let found = self.cache.resolve(reference);
        if found.is_none() {
            tracing::warn!(
                "Linked file does not exist yet. Try to create a new one by clicking on the link. ({})",
                reference
            );
        }
        found
    }

    async fn find_records(&self, include: &str, exclude: &[String]) -> Result<Vec<FileRecord>> {
        Ok(self
            .finder
            .find_files(include, exclude)
            .await?
            .into_iter()
            .map(|path| FileRecord::new(&self.root, path))
            .collect())
    }
}

fn paths_of(records: &[FileRecord]) -> Vec<PathBuf> {
    records.iter().map(|record| record.path.clone()).collect()
}
