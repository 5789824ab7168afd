use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use itertools::Itertools;

use super::resolver::find_uri_by_ref;
use super::sources::ContentSource;
use super::FileRecord;
use crate::error::Result;
use crate::ext::is_markdown;
use crate::refs::extract_ref_tokens;

/// Targets of the `[[...]]` refs in `content` that resolve to none of `files`.
///
/// First-seen order, without duplicates.
pub fn extract_dangling_refs(content: &str, files: &[FileRecord]) -> Vec<String> {
    extract_ref_tokens(content)
        .into_iter()
        .map(|token| token.reference.target)
        .filter(|target| find_uri_by_ref(files, target).is_none())
        .unique()
        .collect()
}

/// Dangling refs of each markdown file in `paths`.
///
/// Paths that no longer exist, are directories or are not markdown are skipped.
/// Files without dangling refs get no entry. Files are read concurrently.
pub async fn find_dangling_refs_by_path(
    paths: &[PathBuf],
    files: &[FileRecord],
    content: &dyn ContentSource,
) -> Result<BTreeMap<PathBuf, Vec<String>>> {
    let scanned = try_join_all(
        paths
            .iter()
            .map(|path| scan_file(path, files, content)),
    )
    .await?;

    Ok(scanned.into_iter().flatten().collect())
}

async fn scan_file(
    path: &Path,
    files: &[FileRecord],
    content: &dyn ContentSource,
) -> Result<Option<(PathBuf, Vec<String>)>> {
    let scannable = match tokio::fs::metadata(path).await {
        Ok(meta) => !meta.is_dir() && is_markdown(&path.to_string_lossy()),
        Err(_) => false,
    };
    if !scannable {
        return Ok(None);
    }

    let text = content.read(path).await?;
    let refs = extract_dangling_refs(&text, files);

    Ok((!refs.is_empty()).then(|| (path.to_path_buf(), refs)))
}
