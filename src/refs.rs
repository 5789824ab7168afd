//! Wiki-style reference tokens: `[[target]]`, `[[target|label]]` and `![[target]]`.

use std::ops::Range;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::scanner::{match_all, CodeZones};

pub const REF_PATTERN: &str = r"(\[\[)([^\[\]]+?)(\]\])";

pub static REF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(REF_PATTERN).unwrap());

static EMBED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[\[(([^\[\]]+?)(\|.*)?)\]\]").unwrap());

/// A parsed reference body. `label` is empty when the body has no divider.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reference {
    pub target: String,
    pub label: String,
}

/// A reference occurrence in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundReference {
    pub path: PathBuf,
    pub line: usize,
    /// Byte range of the reference body (between the brackets) in the line
    pub range: Range<usize>,
    /// The line text from the opening brackets to the end of the line
    pub match_text: String,
    pub reference: Reference,
}

/// A reference token on one line, with the byte range of the whole `[[...]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefToken {
    pub line: usize,
    pub range: Range<usize>,
    pub reference: Reference,
}

/// Splits a raw token body into target and label.
///
/// The divider is the first `\|` or `|`, whichever comes first. An escaped
/// divider is skipped as two characters so the backslash ends up in neither part.
pub fn parse_ref(raw: &str) -> Reference {
    let escaped = raw.find("\\|");
    let plain = raw.find('|');

    let divider = match (escaped, plain) {
        (Some(esc), Some(pipe)) if esc < pipe => Some((esc, 2)),
        (Some(esc), None) => Some((esc, 2)),
        (_, Some(pipe)) => Some((pipe, 1)),
        (None, None) => None,
    };

    match divider {
        Some((at, skip)) => Reference {
            target: raw[..at].to_string(),
            label: raw[at + skip..].to_string(),
        },
        None => Reference {
            target: raw.to_string(),
            label: String::new(),
        },
    }
}

/// Raw bodies of every `![[...]]` token in `content`, code zones included.
pub fn extract_embed_refs(content: &str) -> Vec<String> {
    match_all(&EMBED_RE, content)
        .into_iter()
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Every `[[...]]` token outside code zones, in document order.
pub fn extract_ref_tokens(content: &str) -> Vec<RefToken> {
    let zones = CodeZones::new(content);

    zones
        .lines()
        .iter()
        .enumerate()
        .flat_map(|(line_num, line_text)| {
            match_all(&REF_RE, line_text)
                .into_iter()
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    let body = caps.get(2)?;

                    (!zones.in_code(line_num, body.start())).then(|| RefToken {
                        line: line_num,
                        range: whole.range(),
                        reference: parse_ref(body.as_str()),
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// The reference token under `(line, character)`, if any.
///
/// The returned range covers the brackets, and a leading `!` for embeds.
pub fn get_reference_at_position(
    content: &str,
    line: usize,
    character: usize,
) -> Option<(Reference, Range<usize>)> {
    let zones = CodeZones::new(content);
    if zones.in_code(line, character) {
        return None;
    }

    let line_text = zones.lines().get(line)?;

    match_all(&REF_RE, line_text).into_iter().find_map(|caps| {
        let whole = caps.get(0)?;
        let body = caps.get(2)?;
        let start = match line_text[..whole.start()].ends_with('!') {
            true => whole.start() - 1,
            false => whole.start(),
        };

        (start <= character && character <= whole.end())
            .then(|| (parse_ref(body.as_str()), start..whole.end()))
    })
}

/// One ref rename: every `[[old]]` becomes `[[new]]`, keeping any label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefRename {
    pub old: String,
    pub new: String,
}

/// Applies `renames` in order to `content`, leaving code zones untouched.
///
/// Returns `None` when no rename pattern occurs in the content at all.
pub fn replace_refs(content: &str, renames: &[RefRename]) -> Option<String> {
    let mut updated_once = false;
    let mut next_content = content.to_string();

    for rename in renames {
        let pattern = format!(r"\[\[{}(\|.*?)?\]\]", regex::escape(&rename.old));
        let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
            continue;
        };

        if !re.is_match(content) {
            continue;
        }
        updated_once = true;

        let zones = CodeZones::new(&next_content);
        let rewritten = zones
            .lines()
            .iter()
            .enumerate()
            .map(|(line_num, line_text)| {
                let mut out = String::with_capacity(line_text.len());
                let mut last = 0;

                for caps in match_all(&re, line_text) {
                    let Some(whole) = caps.get(0) else { continue };
                    if zones.in_code(line_num, whole.start() + 2) {
                        continue;
                    }

                    out.push_str(&line_text[last..whole.start()]);
                    out.push_str("[[");
                    out.push_str(&rename.new);
                    out.push_str(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
                    out.push_str("]]");
                    last = whole.end();
                }
                out.push_str(&line_text[last..]);

                out
            })
            .collect::<Vec<_>>();

        next_content = join_lines_like(&next_content, rewritten);
    }

    updated_once.then_some(next_content)
}

/// Joins lines with the line ending style and trailing newline of `original`.
fn join_lines_like(original: &str, lines: Vec<String>) -> String {
    let ending = if original.contains("\r\n") { "\r\n" } else { "\n" };
    let mut joined = lines.join(ending);

    if original.ends_with('\n') {
        joined.push_str(ending);
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(target: &str, label: &str) -> Reference {
        Reference {
            target: target.into(),
            label: label.into(),
        }
    }

    #[test]
    fn parse_ref_without_divider() {
        assert_eq!(parse_ref("note"), reference("note", ""));
        assert_eq!(parse_ref(""), reference("", ""));
    }

    #[test]
    fn parse_ref_with_label() {
        assert_eq!(parse_ref("note|Some label"), reference("note", "Some label"));
        assert_eq!(parse_ref("a|b|c"), reference("a", "b|c"));
    }

    #[test]
    fn parse_ref_with_escaped_divider() {
        // table cells escape the divider
        assert_eq!(parse_ref("note\\|label"), reference("note", "label"));
    }

    #[test]
    fn parse_ref_first_divider_wins() {
        assert_eq!(parse_ref("a|b\\|c"), reference("a", "b\\|c"));
        assert_eq!(parse_ref("a\\|b|c"), reference("a", "b|c"));
    }

    #[test]
    fn parse_ref_round_trips_bodies() {
        for body in ["note", "folder/note|Label", "image.png|alt text"] {
            let parsed = parse_ref(body);
            let recomposed = match parsed.label.is_empty() {
                true => parsed.target.clone(),
                false => format!("{}|{}", parsed.target, parsed.label),
            };
            assert_eq!(recomposed, body);
        }
    }

    #[test]
    fn embed_refs_keep_label() {
        let content = "![[image.png]]\ntext ![[doc.pdf|Doc]] and [[note]]";

        assert_eq!(extract_embed_refs(content), vec!["image.png", "doc.pdf|Doc"]);
    }

    #[test]
    fn ref_tokens_skip_code_zones() {
        let content = "[[one]]\n```\n[[not-a-link]]\n```\n`[[span]]` [[two|Two]]";

        let tokens = extract_ref_tokens(content);

        assert_eq!(
            tokens.iter().map(|t| t.reference.clone()).collect::<Vec<_>>(),
            vec![reference("one", ""), reference("two", "Two")]
        );
        assert_eq!(tokens[1].line, 4);
        assert_eq!(tokens[1].range, 11..22);
    }

    #[test]
    fn reference_at_position() {
        let content = "See [[note|Label]] and ![[pic.png]]";

        let (found, range) = get_reference_at_position(content, 0, 8).unwrap();
        assert_eq!(found, reference("note", "Label"));
        assert_eq!(range, 4..18);

        let (found, range) = get_reference_at_position(content, 0, 23).unwrap();
        assert_eq!(found, reference("pic.png", ""));
        assert_eq!(range, 23..35);

        assert!(get_reference_at_position(content, 0, 1).is_none());
        assert!(get_reference_at_position(content, 5, 0).is_none());
    }

    #[test]
    fn no_reference_at_position_inside_code() {
        let content = "`[[note]]`";

        assert!(get_reference_at_position(content, 0, 4).is_none());
    }

    #[test]
    fn replace_refs_keeps_labels_and_code() {
        let content = "[[old]] [[Old|Label]]\n```\n[[old]]\n```\n";
        let renames = [RefRename {
            old: "old".into(),
            new: "folder/new".into(),
        }];

        let replaced = replace_refs(content, &renames).unwrap();

        assert_eq!(
            replaced,
            "[[folder/new]] [[folder/new|Label]]\n```\n[[old]]\n```\n"
        );
    }

    #[test]
    fn replace_refs_without_match_returns_none() {
        let renames = [RefRename {
            old: "missing".into(),
            new: "other".into(),
        }];

        assert_eq!(replace_refs("[[note]]", &renames), None);
    }

    #[test]
    fn replace_refs_escapes_regex_characters() {
        let renames = [RefRename {
            old: "a.b (1)".into(),
            new: "c".into(),
        }];

        assert_eq!(
            replace_refs("[[a.b (1)]] [[aXb (1)]]", &renames),
            Some("[[c]] [[aXb (1)]]".to_string())
        );
    }
}
