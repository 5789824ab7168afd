use super::helpers::is_long_ref;
use super::FileRecord;
use crate::ext::{is_image, is_other_known, is_unknown_ext, ExtCategory};

/// Finds the file `reference` points at. The first match in `files` order wins.
///
/// Refs with an image, other-known or unknown suffix match on the full file
/// name, or on the root-relative path for long refs. The name may also match
/// with a `.md` appended, so a note called `Meeting 1.5.md` resolves from
/// `[[Meeting 1.5]]`.
///
/// All other refs name notes: short refs match a markdown file's stem, long
/// refs match the end of a root-relative path once `.md` is appended.
pub fn find_uri_by_ref<'a>(files: &'a [FileRecord], reference: &str) -> Option<&'a FileRecord> {
    let ref_lower = reference.to_lowercase();
    let ref_lower_md = format!("{ref_lower}.md");
    let is_long = is_long_ref(reference);
    let names_file = is_image(reference) || is_other_known(reference) || is_unknown_ext(reference);

    files.iter().find(|file| {
        let relative = format!("/{}", file.relative.to_lowercase());

        match (names_file, is_long) {
            (true, true) => relative.ends_with(&ref_lower) || relative.ends_with(&ref_lower_md),
            (true, false) => {
                let basename = file.basename.to_lowercase();
                basename == ref_lower || basename == ref_lower_md
            }
            (false, true) => relative.ends_with(&ref_lower_md),
            (false, false) => {
                file.category == ExtCategory::Markdown && file.stem().to_lowercase() == ref_lower
            }
        }
    })
}
