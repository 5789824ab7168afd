//! Shared test utilities for memolink.
//!
//! This module provides common helpers used across multiple test modules.
//! It is only compiled when running tests.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a temporary vault directory for testing.
///
/// Returns a tuple of (TempDir, PathBuf) where:
/// - TempDir: The temp directory handle (must be kept alive for the test duration)
/// - PathBuf: The path to the vault subdirectory
///
/// The directory walk skips hidden entries below the root. Temp directories
/// can live under paths like `/tmp/.tmpXXXXX`, so the vault is a non-hidden
/// `vault` subdirectory to keep fixtures away from that rule.
pub fn create_test_vault_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let vault_dir = temp_dir.path().join("vault");
    fs::create_dir(&vault_dir).expect("Failed to create vault subdirectory");
    (temp_dir, vault_dir)
}

/// Creates a small vault of linked notes and attachments.
///
/// # Vault Structure
///
/// ```text
/// vault/
/// ├── assets/
/// │   ├── diagram.png
/// │   └── paper.pdf
/// ├── notes/
/// │   ├── alpha.md      -> beta, deep/gamma, paper.pdf (all resolve)
/// │   ├── beta.md       -> missing, figure.png (dangling), index
/// │   └── deep/
/// │       └── gamma.md  -> index
/// └── index.md          -> alpha, missing, notes/beta, notes/nowhere
/// ```
pub fn create_linked_vault() -> (TempDir, PathBuf) {
    let (temp_dir, vault_dir) = create_test_vault_dir();

    fs::create_dir_all(vault_dir.join("assets")).expect("Failed to create assets/");
    fs::create_dir_all(vault_dir.join("notes/deep")).expect("Failed to create notes/deep/");

    fs::write(vault_dir.join("assets/diagram.png"), [0u8; 8]).expect("Failed to write diagram.png");
    fs::write(vault_dir.join("assets/paper.pdf"), [0u8; 8]).expect("Failed to write paper.pdf");

    fs::write(
        vault_dir.join("index.md"),
        "# Index\n\n[[alpha]] [[missing]] [[notes/beta]] [[notes/nowhere]]\n\n```\n[[fenced]]\n```\n\n![[diagram.png]]\n",
    )
    .expect("Failed to write index.md");
    fs::write(
        vault_dir.join("notes/alpha.md"),
        "# Alpha\n\n[[beta]] [[deep/gamma]] [[paper.pdf|Paper]] `[[in-span]]`\n",
    )
    .expect("Failed to write alpha.md");
    fs::write(
        vault_dir.join("notes/beta.md"),
        "# Beta\n\n[[missing]] [[figure.png]]\nBack to [[index]].\n",
    )
    .expect("Failed to write beta.md");
    fs::write(
        vault_dir.join("notes/deep/gamma.md"),
        "# Gamma\n\nSee [[index|home]].\n",
    )
    .expect("Failed to write gamma.md");

    (temp_dir, vault_dir)
}
