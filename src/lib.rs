//! memolink: a live index of a folder of linked markdown notes
//!
//! This crate keeps track of the notes and attachments under a workspace root
//! and resolves wiki-style references (`[[note]]`, `[[note|label]]`,
//! `![[image.png]]`) between them, including the ones that point nowhere.
//!
//! # Overview
//!
//! - **Scanning**: finds reference tokens while ignoring fenced code blocks and inline code
//! - **Resolution**: maps a short or long ref to the file it names
//! - **Dangling refs**: tracks, per file, the refs that resolve to nothing
//! - **Incremental updates**: keeps the index consistent as files come and go
//! - **Ordering**: sorts reference search results by path or by freshness
//!
//! # Architecture
//!
//! - [`scanner`]: code-zone detection
//! - [`refs`]: reference token parsing and rewriting
//! - [`ext`]: file-extension categories
//! - [`vault`]: the [`vault::FileIndex`] and its [`vault::WorkspaceCache`] snapshot
//! - [`references`]: workspace-wide reference search
//! - [`sort`]: result ordering strategies
//! - [`link_rules`]: target folders for notes created from short links
//! - [`config`]: settings
//!
//! # Usage
//!
//! ```ignore
//! use memolink::config::Settings;
//! use memolink::vault::FileIndex;
//!
//! let settings = Settings::new(&root)?;
//! let mut index = FileIndex::open(&root, settings)?;
//! index.rebuild_all().await?;
//! let target = index.cache().resolve("some note");
//! ```

// Core modules - index and resolution
pub mod vault;

// Text scanning
pub mod ext;
pub mod refs;
pub mod scanner;

// Features built on the index
pub mod link_rules;
pub mod references;
pub mod sort;

// Configuration and errors
pub mod config;
pub mod error;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
