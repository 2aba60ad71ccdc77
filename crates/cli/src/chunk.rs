// Grouping changed files into commit chunks.
//
// Grouping and message synthesis are deliberately separate concerns: the
// grouping strategies only decide which files travel together, while
// `synthesize_message` is a swappable heuristic over the finished group.

use trickle_common::types::{ChunkStrategy, CommitChunk};

/// Bucket label for root-level files under the directory strategy.
const ROOT_BUCKET: &str = "root";
/// Bucket key for extension-less files under the extension strategy.
const MISC_BUCKET: &str = "misc";

/// Root-level file names that signal project configuration.
const PROJECT_METADATA_FILES: &[&str] = &[
    "package.json",
    "cargo.toml",
    "pyproject.toml",
    "tsconfig.json",
    "makefile",
    "dockerfile",
    ".gitignore",
    ".env",
    "readme.md",
];

/// Group a flat list of changed files into ordered commit chunks.
///
/// Group order follows the first occurrence of each key in the input, so
/// identical input always produces identical chunks.
pub fn chunk_files(files: &[String], strategy: ChunkStrategy) -> Vec<CommitChunk> {
    match strategy {
        ChunkStrategy::File => files
            .iter()
            .map(|file| CommitChunk {
                files: vec![file.clone()],
                label: file.clone(),
                message: synthesize_message(std::slice::from_ref(file), None),
            })
            .collect(),

        ChunkStrategy::Extension => group_by(files, extension_key)
            .into_iter()
            .map(|(key, group)| CommitChunk {
                label: format!("*{key} files"),
                message: synthesize_message(&group, None),
                files: group,
            })
            .collect(),

        ChunkStrategy::Directory => group_by(files, directory_key)
            .into_iter()
            .map(|(key, group)| {
                let message = if key == ROOT_BUCKET {
                    synthesize_message(&group, None)
                } else {
                    synthesize_message(&group, Some(&key))
                };
                CommitChunk { label: key, message, files: group }
            })
            .collect(),
    }
}

/// Synthesize a plausible commit message for a group of files.
///
/// Heuristic, not semantic: named groups become `Update <group>`; single
/// files use their base name; root-level mixes check for recognized
/// project-metadata names before falling back to a count.
pub fn synthesize_message(files: &[String], group: Option<&str>) -> String {
    if let Some(group) = group {
        return format!("Update {group}");
    }

    if let [only] = files {
        return format!("Update {}", basename(only));
    }

    let touches_metadata = files
        .iter()
        .any(|file| PROJECT_METADATA_FILES.contains(&basename(file).to_ascii_lowercase().as_str()));
    if touches_metadata {
        "Update project config".to_string()
    } else {
        format!("Update {} files", files.len())
    }
}

/// Stable grouping: one entry per key, keyed groups in first-occurrence
/// order, files in input order within each group.
fn group_by(files: &[String], key_fn: impl Fn(&str) -> String) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();

    for file in files {
        let key = key_fn(file);
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, group)) => group.push(file.clone()),
            None => groups.push((key, vec![file.clone()])),
        }
    }

    groups
}

fn extension_key(file: &str) -> String {
    match std::path::Path::new(file).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!(".{ext}"),
        None => MISC_BUCKET.to_string(),
    }
}

fn directory_key(file: &str) -> String {
    match file.split_once('/') {
        Some((top, _)) => top.to_string(),
        None => ROOT_BUCKET.to_string(),
    }
}

fn basename(file: &str) -> &str {
    file.rsplit('/').next().unwrap_or(file)
}
