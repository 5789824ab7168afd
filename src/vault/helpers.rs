//! Path and ref-string helpers for the vault module.

use std::path::Path;

use once_cell::sync::Lazy;
use pathdiff::diff_paths;
use regex::Regex;

use crate::ext::extract_ext;

static UNC_PATH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\\/]{2,}[^\\/]+[\\/]+[^\\/]+").unwrap());

pub fn trim_leading_slash(value: &str) -> &str {
    value.trim_start_matches(['/', '\\'])
}

pub fn trim_trailing_slash(value: &str) -> &str {
    value.trim_end_matches(['/', '\\'])
}

pub fn trim_slashes(value: &str) -> &str {
    trim_leading_slash(trim_trailing_slash(value))
}

pub fn normalize_slashes(value: &str) -> String {
    value.replace('\\', "/")
}

/// A ref with a `/` in it names a path relative to the root, not a bare file name.
pub fn is_long_ref(value: &str) -> bool {
    value.contains('/')
}

pub fn is_unc_path(value: &str) -> bool {
    UNC_PATH_RE.is_match(value)
}

/// `path` relative to `root`, with `/` separators and no leading slash.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    normalize_slashes(trim_leading_slash(&relative.to_string_lossy()))
}

/// The ref a link to `path` would use.
///
/// With a `base_path` the ref is the path relative to it, otherwise the file
/// name. The extension is dropped unless `keep_ext` is set.
pub fn fs_path_to_ref(path: &Path, keep_ext: bool, base_path: Option<&Path>) -> Option<String> {
    let reference = match base_path {
        Some(base) if path.starts_with(base) => relative_path(base, path),
        _ => path.file_name()?.to_str()?.to_string(),
    };

    if keep_ext {
        return Some(trim_leading_slash(&reference).to_string());
    }

    let ext = extract_ext(&reference);
    let stem = match ext.is_empty() {
        true => reference.as_str(),
        false => &reference[..reference.len() - ext.len() - 1],
    };

    Some(trim_leading_slash(stem).to_string())
}

/// `ref` as a file path: note refs get a `.md` suffix, refs to other files keep theirs.
pub fn get_ref_with_ext(reference: &str) -> String {
    match extract_ext(reference) {
        "" => format!("{reference}.md"),
        _ => reference.to_string(),
    }
}
