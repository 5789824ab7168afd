//! File-extension categories for indexed paths and reference targets.

use std::path::Path;

pub const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "svg", "gif", "webp"];

pub const OTHER_EXTS: &[&str] = &[
    "doc", "docx", "rtf", "txt", "odt", "xls", "xlsx", "ppt", "pptm", "pptx", "pdf", "pages",
    "mp4", "mov", "wmv", "flv", "avi", "mkv", "mp3", "webm", "wav", "m4a", "ogg", "3gp", "flac",
];

// Keep in sync with the lists above
pub const COMMON_EXTS_HINT: &str =
    ".md,.png,.jpg,.jpeg,.svg,.gif,.doc,.docx,.rtf,.txt,.odt,.xls,.xlsx,.ppt,.pptm,.pptx,.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtCategory {
    Markdown,
    Image,
    Other,
    Unknown,
    /// No suffix at all; a ref like this names a note.
    None,
}

impl ExtCategory {
    pub fn of(value: &str) -> ExtCategory {
        if is_markdown(value) {
            ExtCategory::Markdown
        } else if is_image(value) {
            ExtCategory::Image
        } else if is_other_known(value) {
            ExtCategory::Other
        } else if !has_suffix(value) {
            ExtCategory::None
        } else {
            ExtCategory::Unknown
        }
    }
}

/// The suffix of the last path component, without the dot. Empty if there is none.
pub fn extract_ext(value: &str) -> &str {
    Path::new(value)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
}

/// True when the last path component has a dot past its first character,
/// including a trailing one (`note.`).
fn has_suffix(value: &str) -> bool {
    Path::new(value).extension().is_some()
}

fn ext_in(value: &str, exts: &[&str]) -> bool {
    let ext = extract_ext(value);
    exts.iter().any(|known| known.eq_ignore_ascii_case(ext))
}

pub fn is_image(value: &str) -> bool {
    ext_in(value, IMAGE_EXTS)
}

pub fn is_markdown(value: &str) -> bool {
    extract_ext(value).eq_ignore_ascii_case("md")
}

pub fn is_other_known(value: &str) -> bool {
    ext_in(value, OTHER_EXTS)
}

pub fn is_unknown_ext(value: &str) -> bool {
    has_suffix(value) && !is_markdown(value) && !is_image(value) && !is_other_known(value)
}
