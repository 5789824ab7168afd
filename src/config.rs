use std::path::Path;

use config::{Config, Environment, File};
use regex::Regex;
use serde::Deserialize;

use crate::error::{IndexError, Result};
use crate::sort::SortPathsType;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// Whether new links are written as bare names or root-relative paths
    pub links_format: LinksFormat,
    /// Folder rules for short links, first match wins
    #[serde(default)]
    pub links_rules: Vec<LinkRule>,
    pub search_exclude: Vec<String>,
    pub files_exclude: Vec<String>,
    pub sort_paths: SortPathsType,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinksFormat {
    Short,
    Long,
}

/// Maps refs matching `rule` into a folder built from the `folder` template.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LinkRule {
    pub rule: String,
    pub folder: String,
}

impl Settings {
    pub fn new(root_dir: &Path) -> Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/memolink/settings");
        let root = root_dir
            .to_str()
            .ok_or_else(|| IndexError::RootNotDirectory(root_dir.to_path_buf()))?;

        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(File::with_name(&format!("{root}/.memolink")).required(false))
            .add_source(Environment::with_prefix("MEMOLINK"))
            .set_default("links_format", "short")?
            .set_default("search_exclude", vec!["**/node_modules", "**/.git"])?
            .set_default("files_exclude", vec!["**/.DS_Store"])?
            .set_default("sort_paths", "path")?
            .build()?;

        let settings = settings.try_deserialize::<Settings>()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Rejects link rules whose pattern does not compile.
    pub fn validate(&self) -> Result<()> {
        for rule in &self.links_rules {
            Regex::new(&rule.rule).map_err(|source| IndexError::Regex {
                pattern: rule.rule.clone(),
                source,
            })?;
        }

        Ok(())
    }

    /// Exclude globs from both namespaces, plus the caller's own pattern if any.
    pub fn exclude_patterns(&self, extra: Option<&str>) -> Vec<String> {
        self.search_exclude
            .iter()
            .chain(self.files_exclude.iter())
            .cloned()
            .chain(extra.map(String::from))
            .collect()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            links_format: LinksFormat::Short,
            links_rules: Vec::new(),
            search_exclude: vec!["**/node_modules".to_string(), "**/.git".to_string()],
            files_exclude: vec!["**/.DS_Store".to_string()],
            sort_paths: SortPathsType::Path,
        }
    }
}
