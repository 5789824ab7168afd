//! Code-zone detection for markdown text.
//!
//! References inside fenced code blocks or inline code spans are inert. The
//! free functions here answer "is this position inside a code zone" for a
//! single query. [`CodeZones`] computes the fence map once so that scanning
//! many tokens in the same document does not rescan the text for each one.
//!
//! Line numbers are zero-based and follow [`str::lines`]. Character offsets
//! are byte offsets into the line.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})(.*)$").unwrap());

/// Every non-overlapping match of `pattern` in `text`, in order.
///
/// Each call starts from the beginning of `text`.
pub fn match_all<'t>(pattern: &Regex, text: &'t str) -> Vec<Captures<'t>> {
    pattern.captures_iter(text).collect()
}

pub fn is_in_fenced_code_block(content: &str, line: usize) -> bool {
    CodeZones::new(content).in_fenced_block(line)
}

pub fn is_in_code_span(content: &str, line: usize, offset: usize) -> bool {
    CodeZones::new(content).in_code_span(line, offset)
}

#[derive(Debug, Clone)]
pub struct CodeZones<'a> {
    lines: Vec<&'a str>,
    fenced: Vec<bool>,
}

impl<'a> CodeZones<'a> {
    pub fn new(content: &'a str) -> CodeZones<'a> {
        let lines = content.lines().collect::<Vec<_>>();
        let mut fenced = Vec::with_capacity(lines.len());
        // (fence char, fence length) of the currently open block
        let mut open: Option<(char, usize)> = None;

        for line in &lines {
            match (open, FENCE_RE.captures(line)) {
                (None, Some(caps)) => {
                    let marker = &caps[1];
                    let info = &caps[2];
                    let fence_char = marker.chars().next().unwrap_or('`');

                    // backtick fences cannot carry backticks in the info string
                    if fence_char == '`' && info.contains('`') {
                        fenced.push(false);
                        continue;
                    }

                    fenced.push(false);
                    open = Some((fence_char, marker.len()));
                }
                (Some((fence_char, len)), Some(caps))
                    if caps[1].starts_with(fence_char)
                        && caps[1].len() >= len
                        && caps[2].trim().is_empty() =>
                {
                    fenced.push(true);
                    open = None;
                }
                (Some(_), _) => fenced.push(true),
                (None, None) => fenced.push(false),
            }
        }

        CodeZones { lines, fenced }
    }

    /// True for lines after an opening fence, up to and including its closing fence.
    pub fn in_fenced_block(&self, line: usize) -> bool {
        self.fenced.get(line).copied().unwrap_or(false)
    }

    /// True when an odd number of backtick runs precede `offset` on `line`.
    pub fn in_code_span(&self, line: usize, offset: usize) -> bool {
        self.lines.get(line).is_some_and(|text| {
            let before = &text.as_bytes()[..offset.min(text.len())];
            backtick_runs(before) % 2 == 1
        })
    }

    pub fn in_code(&self, line: usize, offset: usize) -> bool {
        self.in_fenced_block(line) || self.in_code_span(line, offset)
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }
}

/// Number of maximal runs of consecutive backticks in `text`.
fn backtick_runs(text: &[u8]) -> usize {
    text.iter()
        .enumerate()
        .filter(|&(idx, &byte)| byte == b'`' && (idx == 0 || text[idx - 1] != b'`'))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_between_fences_are_fenced() {
        let content = "before\n```\n[[not-a-link]]\n```\nafter";

        assert!(!is_in_fenced_code_block(content, 0));
        assert!(!is_in_fenced_code_block(content, 1));
        assert!(is_in_fenced_code_block(content, 2));
        assert!(!is_in_fenced_code_block(content, 4));
    }

    #[test]
    fn unclosed_fence_runs_to_end_of_document() {
        let content = "~~~rust\nlet a = 1;\n\nmore";

        assert!(is_in_fenced_code_block(content, 1));
        assert!(is_in_fenced_code_block(content, 3));
    }

    #[test]
    fn closing_fence_must_match_opening_marker() {
        let content = "````\n```\ninside\n````\nout";
        let zones = CodeZones::new(content);

        assert!(zones.in_fenced_block(2));
        assert!(!zones.in_fenced_block(4));

        let content = "```\n~~~\ninside\n```";
        assert!(is_in_fenced_code_block(content, 2));
    }

    #[test]
    fn indented_code_is_not_a_fence() {
        let content = "    ```\n[[link]]";

        assert!(!is_in_fenced_code_block(content, 1));
    }

    #[test]
    fn code_span_parity() {
        let content = "a `[[x]]` b [[y]]";

        assert!(is_in_code_span(content, 0, 5));
        assert!(!is_in_code_span(content, 0, 14));
    }

    #[test]
    fn backtick_runs_count_once_whatever_their_length() {
        let content = "``code ` [[x]]`` [[y]]";

        assert!(!is_in_code_span(content, 0, 11));
        assert!(is_in_code_span(content, 0, 19));
    }

    #[test]
    fn lone_backtick_opens_a_span_to_end_of_line() {
        let content = "it`s [[note]]";

        assert!(!is_in_code_span(content, 0, 1));
        assert!(is_in_code_span(content, 0, 7));
    }

    #[test]
    fn tab_indented_fence_is_not_a_fence() {
        let content = "\t```\n[[link]]\n```";

        assert!(!is_in_fenced_code_block(content, 1));
    }

    #[test]
    fn out_of_range_positions_are_outside() {
        assert!(!is_in_fenced_code_block("", 3));
        assert!(!is_in_code_span("", 3, 10));
    }

    #[test]
    fn match_all_collects_every_match_with_offsets() {
        let re = Regex::new(r"\[\[([^\[\]]+?)\]\]").unwrap();

        let matches = match_all(&re, "[[a]] and [[b]]");

        assert_eq!(matches.len(), 2);
        assert_eq!(&matches[0][1], "a");
        assert_eq!(matches[1].get(0).unwrap().start(), 10);
        assert_eq!(match_all(&re, "[[a]] and [[b]]").len(), 2);
    }
}
