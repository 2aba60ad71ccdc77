// Change detection against a reference working copy.
//
// Walks the source tree, skipping noise directories, and reports every
// relative path that is new or whose SHA-256 digest differs from the same
// path under the reference tree. The comparison is one-way: files present
// only under the reference tree are never reported, so deletions are not
// detected.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Directory names never worth committing.
const NOISE_DIRS: &[&str] =
    &[".git", "node_modules", "target", "dist", "build", ".next", "__pycache__"];

/// Relative `/`-separated paths under `source_root` that are new or differ
/// from `reference_root`. Any unreadable file or directory is a hard error.
pub fn detect_changed_files(source_root: &Path, reference_root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    walk(source_root, source_root, &mut files)?;

    let mut changed = Vec::new();
    for rel in files {
        let source_path = source_root.join(&rel);
        let reference_path = reference_root.join(&rel);

        if !reference_path.exists() {
            changed.push(rel);
        } else if hash_file(&source_path)? != hash_file(&reference_path)? {
            changed.push(rel);
        }
    }

    Ok(changed)
}

/// Recursively collect relative file paths, directory entries sorted by
/// name so the output order is stable across platforms.
fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to read directory {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to stat {}", entry.path().display()))?;

        if file_type.is_dir() {
            let name = entry.file_name();
            if NOISE_DIRS.iter().any(|skip| name == *skip) {
                continue;
            }
            walk(&entry.path(), root, out)?;
        } else {
            out.push(relative_slash_path(&entry.path(), root)?);
        }
    }

    Ok(())
}

fn relative_slash_path(path: &Path, root: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .with_context(|| format!("path {} escaped the walk root", path.display()))?;
    let parts: Vec<String> =
        rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
    Ok(parts.join("/"))
}

/// SHA-256 of a file's content as a lowercase hex string.
fn hash_file(path: &Path) -> Result<String> {
    let content = fs::read(path)
        .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
    Ok(hex_encode(&Sha256::digest(&content)))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}
