use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::record::FileRecord;

pub const SOURCE_EXTENSION: &str = "java";

/// Recursively lists every `.java` file under `base_path`, in a stable order.
///
/// Hidden directories and ignore files are not honored: every directory is
/// descended into.
pub fn scan_java_files(base_path: &Path) -> Vec<PathBuf> {
    if !base_path.is_dir() {
        tracing::error!(
            "Something's wrong, it is not an existing directory: {}",
            base_path.display()
        );
        return Vec::new();
    }

    let walker = WalkBuilder::new(base_path)
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_some_and(|t| t.is_file())
                    && path.extension().is_some_and(|e| e == SOURCE_EXTENSION)
                {
                    tracing::trace!("Found .java file: {}", path.display());
                    files.push(path.to_path_buf());
                }
            }
            Err(e) => tracing::warn!("Skipping unreadable entry: {e}"),
        }
    }
    files
}

pub fn enumerate_records(base_path: &Path) -> Vec<FileRecord> {
    scan_java_files(base_path)
        .into_iter()
        .map(FileRecord::new)
        .collect()
}
