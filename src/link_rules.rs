//! Where a new note created from a short link should live.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use itertools::Itertools;
use regex::Regex;

use crate::config::{LinkRule, LinksFormat, Settings};
use crate::vault::{get_ref_with_ext, is_long_ref};

/// Folder for the file a short `reference` would create, from the first link
/// rule whose pattern matches the ref with its extension.
///
/// Returns `None` for long refs, when links are written long, or when no rule
/// matches. `current_dir` is the root-relative directory of the file the link
/// was written in. The `folder` template may use `$CURRENT_FILE_DIRECTORY`,
/// the `$CURRENT_*` date and time variables, and `$0`..`$n` for the rule's
/// capture groups.
pub fn resolve_short_ref_folder<Tz: TimeZone>(
    settings: &Settings,
    reference: &str,
    current_dir: Option<&str>,
    now: &DateTime<Tz>,
) -> Option<String> {
    if settings.links_format != LinksFormat::Short || is_long_ref(reference) {
        return None;
    }

    let ref_with_ext = get_ref_with_ext(reference);

    let (rule, captures) = settings.links_rules.iter().find_map(|rule| {
        let re = compile(rule)?;
        let captures = re
            .captures(&ref_with_ext)?
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect_vec();
        Some((rule, captures))
    })?;

    let mut vars = vec![
        ("$CURRENT_FILE_DIRECTORY".to_string(), current_dir.unwrap_or_default().to_string()),
        ("$CURRENT_YEAR".to_string(), now.year().to_string()),
        ("$CURRENT_YEAR_SHORT".to_string(), format!("{:02}", now.year() % 100)),
        ("$CURRENT_MONTH".to_string(), format!("{:02}", now.month())),
        ("$CURRENT_DATE".to_string(), format!("{:02}", now.day())),
        ("$CURRENT_HOUR".to_string(), format!("{:02}", now.hour())),
        ("$CURRENT_MINUTE".to_string(), format!("{:02}", now.minute())),
        ("$CURRENT_SECOND".to_string(), format!("{:02}", now.second())),
        ("$CURRENT_SECONDS_UNIX".to_string(), now.timestamp().to_string()),
    ];
    vars.extend(
        captures
            .into_iter()
            .enumerate()
            .map(|(idx, value)| (format!("${idx}"), value)),
    );

    // longest names first, so $CURRENT_YEAR does not eat $CURRENT_YEAR_SHORT
    let folder = vars
        .into_iter()
        .sorted_by_key(|(name, _)| std::cmp::Reverse(name.len()))
        .fold(rule.folder.clone(), |folder, (name, value)| folder.replace(&name, &value));

    Some(folder)
}

fn compile(rule: &LinkRule) -> Option<Regex> {
    match Regex::new(&rule.rule) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!("Ignoring link rule `{}`: {}", rule.rule, err);
            None
        }
    }
}
