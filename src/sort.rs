//! Ordering of reference search results.
//!
//! Results arrive grouped by file. The strategies here order the file keys,
//! either structurally by path or by freshness, where freshness is the file's
//! own modification time (`last-modified`) or the newest of the locations that
//! reference it (`last-modified-refs`).

use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;
use std::path::Path;

use futures::future::try_join_all;
use itertools::Itertools;
use serde::Deserialize;

use crate::error::Result;
use crate::refs::FoundReference;
use crate::vault::MTimeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortPathsType {
    #[default]
    Path,
    Alphabet,
    LastModified,
    LastModifiedRefs,
}

/// Orders the keys of `references_by_path` by `order`.
///
/// Modification times are fetched concurrently for every key, and the sort
/// happens once all of them are known. Keys with equal times keep no
/// particular order.
pub async fn sort_paths(
    order: SortPathsType,
    references_by_path: &BTreeMap<String, Vec<FoundReference>>,
    mtime: &dyn MTimeSource,
) -> Result<Vec<String>> {
    match order {
        SortPathsType::Path => Ok(sort_paths_shallow_first(references_by_path.keys())),
        SortPathsType::Alphabet => Ok(references_by_path.keys().cloned().collect()),
        SortPathsType::LastModified | SortPathsType::LastModifiedRefs => {
            let with_mtime = try_join_all(references_by_path.iter().map(|(path, refs)| async move {
                let modified = match order {
                    SortPathsType::LastModified => Some(mtime.mtime(Path::new(path)).await?),
                    _ => last_modified_ref(refs, mtime).await?,
                };
                Ok::<_, crate::error::IndexError>((modified, path.clone()))
            }))
            .await?;

            Ok(with_mtime
                .into_iter()
                .sorted_by_key(|(modified, _)| Reverse(*modified))
                .map(|(_, path)| path)
                .collect())
        }
    }
}

/// Newest modification time among the referencing locations, `None` if there are none.
async fn last_modified_ref(refs: &[FoundReference], mtime: &dyn MTimeSource) -> Result<Option<u64>> {
    let times = try_join_all(refs.iter().map(|found| mtime.mtime(&found.path))).await?;
    Ok(times.into_iter().max())
}

/// Sorts paths so that files come before subdirectories at every level, and
/// names at the same level sort lexically.
pub fn sort_paths_shallow_first<'a, I, S>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + 'a + ?Sized,
{
    paths
        .into_iter()
        .map(|path| path.as_ref().to_string())
        .sorted_by(|a, b| compare_shallow_first(a, b))
        .collect()
}

pub fn compare_shallow_first(a: &str, b: &str) -> Ordering {
    let a_segments = a.split(['/', '\\']).collect::<Vec<_>>();
    let b_segments = b.split(['/', '\\']).collect::<Vec<_>>();

    for (idx, (a_seg, b_seg)) in a_segments.iter().zip(b_segments.iter()).enumerate() {
        let a_is_file = idx == a_segments.len() - 1;
        let b_is_file = idx == b_segments.len() - 1;

        match (a_is_file, b_is_file) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => match a_seg.cmp(b_seg) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }

    a_segments.len().cmp(&b_segments.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;

    use crate::refs::Reference;

    struct FixedMTimes(HashMap<PathBuf, u64>);

    impl FixedMTimes {
        fn new(times: &[(&str, u64)]) -> FixedMTimes {
            FixedMTimes(times.iter().map(|(p, t)| (PathBuf::from(p), *t)).collect())
        }
    }

    #[async_trait]
    impl MTimeSource for FixedMTimes {
        async fn mtime(&self, path: &Path) -> Result<u64> {
            Ok(self.0.get(path).copied().unwrap_or(0))
        }
    }

    fn found_at(path: &str) -> FoundReference {
        FoundReference {
            path: PathBuf::from(path),
            line: 0,
            range: 2..6,
            match_text: "[[note]]".into(),
            reference: Reference {
                target: "note".into(),
                label: String::new(),
            },
        }
    }

    fn by_path(entries: Vec<(&str, Vec<FoundReference>)>) -> BTreeMap<String, Vec<FoundReference>> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[tokio::test]
    async fn empty_input_sorts_to_empty() {
        let times = FixedMTimes::new(&[]);

        for order in [
            SortPathsType::Path,
            SortPathsType::Alphabet,
            SortPathsType::LastModified,
            SortPathsType::LastModifiedRefs,
        ] {
            let sorted = sort_paths(order, &BTreeMap::new(), &times).await.unwrap();
            assert!(sorted.is_empty());
        }
    }

    #[tokio::test]
    async fn path_and_alphabet_ignore_mtimes() {
        let times = FixedMTimes::new(&[("/path/to/100", 100), ("/path/to/200", 200)]);
        let references = by_path(vec![
            ("b/path", vec![found_at("/path/to/100")]),
            ("a/path", vec![found_at("/path/to/200")]),
        ]);

        let expected = vec!["a/path".to_string(), "b/path".to_string()];
        assert_eq!(
            sort_paths(SortPathsType::Path, &references, &times).await.unwrap(),
            expected
        );
        assert_eq!(
            sort_paths(SortPathsType::Alphabet, &references, &times).await.unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn last_modified_sorts_newest_file_first() {
        let times = FixedMTimes::new(&[("path1", 100), ("path2", 300)]);
        let references = by_path(vec![("path1", vec![]), ("path2", vec![])]);

        let sorted = sort_paths(SortPathsType::LastModified, &references, &times)
            .await
            .unwrap();

        assert_eq!(sorted, vec!["path2", "path1"]);
    }

    #[tokio::test]
    async fn last_modified_with_equal_times_returns_both() {
        let times = FixedMTimes::new(&[("path1", 0), ("path2", 0)]);
        let references = by_path(vec![("path1", vec![]), ("path2", vec![])]);

        let sorted = sort_paths(SortPathsType::LastModified, &references, &times)
            .await
            .unwrap();

        assert_eq!(sorted.len(), 2);
    }

    #[tokio::test]
    async fn last_modified_refs_uses_newest_reference() {
        let times = FixedMTimes::new(&[
            ("/path/to/150", 150),
            ("/path/to/1000", 1000),
            ("/path/to/2000", 2000),
        ]);
        let references = by_path(vec![
            ("path1", vec![found_at("/path/to/150"), found_at("/path/to/1000")]),
            ("path2", vec![found_at("/path/to/150"), found_at("/path/to/2000")]),
        ]);

        let sorted = sort_paths(SortPathsType::LastModifiedRefs, &references, &times)
            .await
            .unwrap();

        assert_eq!(sorted, vec!["path2", "path1"]);
    }

    #[tokio::test]
    async fn last_modified_refs_puts_paths_without_refs_last() {
        let times = FixedMTimes::new(&[("/path/to/1", 1)]);
        let references = by_path(vec![("empty", vec![]), ("one", vec![found_at("/path/to/1")])]);

        let sorted = sort_paths(SortPathsType::LastModifiedRefs, &references, &times)
            .await
            .unwrap();

        assert_eq!(sorted, vec!["one", "empty"]);
    }

    #[test]
    fn shallow_first_puts_files_before_directories() {
        let sorted = sort_paths_shallow_first(["b/c.md", "z.md", "a/b/c.md", "a/z.md", "a.md"]);

        assert_eq!(sorted, vec!["a.md", "z.md", "a/z.md", "a/b/c.md", "b/c.md"]);
    }

    #[test]
    fn shallow_first_on_absolute_paths() {
        let sorted = sort_paths_shallow_first(["/vault/sub/note.md", "/vault/note.md"]);

        assert_eq!(sorted, vec!["/vault/note.md", "/vault/sub/note.md"]);
    }
}
