use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::RegexBuilder;

use crate::error::Result;
use crate::refs::{parse_ref, FoundReference};
use crate::scanner::{match_all, CodeZones};
use crate::vault::{ContentSource, WorkspaceCache};

/// Every `[[ref]]` or `[[ref|label]]` occurrence of any of `refs` in the indexed
/// markdown files, matched case-insensitively and skipping code zones.
///
/// Files listed in `exclude_paths` and files that no longer exist are skipped.
pub async fn find_references(
    cache: &WorkspaceCache,
    refs: &[&str],
    exclude_paths: &[PathBuf],
    content: &dyn ContentSource,
) -> Result<Vec<FoundReference>> {
    if refs.is_empty() {
        return Ok(Vec::new());
    }

    let alternatives = refs.iter().map(|r| regex::escape(r)).collect::<Vec<_>>().join("|");
    let pattern = format!(r"\[\[(({alternatives})(\|[^\[\]]+?)?)\]\]");
    let ref_re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re,
        Err(err) => {
            tracing::warn!("Can't search for {} refs: {}", refs.len(), err);
            return Ok(Vec::new());
        }
    };

    let mut found = Vec::new();

    for record in cache.markdown() {
        if exclude_paths.contains(&record.path) || !tokio::fs::try_exists(&record.path).await? {
            continue;
        }

        let text = content.read(&record.path).await?;
        let zones = CodeZones::new(&text);

        for (line_num, line_text) in zones.lines().iter().enumerate() {
            for caps in match_all(&ref_re, line_text) {
                let Some(body) = caps.get(1) else { continue };
                let offset = body.start();

                if zones.in_code(line_num, offset) {
                    continue;
                }

                found.push(FoundReference {
                    path: record.path.clone(),
                    line: line_num,
                    range: offset..body.end(),
                    match_text: line_text[offset - 2..].to_string(),
                    reference: parse_ref(body.as_str()),
                });
            }
        }
    }

    Ok(found)
}

/// Groups occurrences by the file they occur in, keyed by its display path.
pub fn group_by_path(found: Vec<FoundReference>) -> BTreeMap<String, Vec<FoundReference>> {
    let mut grouped: BTreeMap<String, Vec<FoundReference>> = BTreeMap::new();
    for reference in found {
        grouped
            .entry(reference.path.to_string_lossy().into_owned())
            .or_default()
            .push(reference);
    }
    grouped
}
