//! Image folder discovery for the folder selection screen

use std::path::Path;
use tracing::debug;

use super::{CatalogError, ExtensionFilter};

/// Folders hidden from the selection screen unless configured otherwise
pub const DEFAULT_EXCLUDED_FOLDERS: &[&str] = &["System Volume Information", "pic"];

/// List the immediate sub-directories of `root` holding at least one
/// matching image, sorted by name.
///
/// Hidden directories and names in `excluded` (case-insensitive) are skipped.
/// Sub-directories that cannot be opened are skipped rather than failing the
/// whole discovery.
pub fn discover_folders(
    root: &Path,
    filter: &ExtensionFilter,
    excluded: &[String],
) -> Result<Vec<String>, CatalogError> {
    let read_dir = std::fs::read_dir(root).map_err(|source| CatalogError::Open {
        path: root.to_path_buf(),
        source,
    })?;

    let mut folders = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| CatalogError::Read {
            path: root.to_path_buf(),
            source,
        })?;

        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if name.starts_with('.') || is_excluded(&name, excluded) {
            continue;
        }

        if contains_match(&entry.path(), filter) {
            folders.push(name);
        } else {
            debug!("Skipping folder without images: {}", name);
        }
    }

    folders.sort();
    Ok(folders)
}

fn is_excluded(name: &str, excluded: &[String]) -> bool {
    excluded
        .iter()
        .any(|candidate| candidate.trim().eq_ignore_ascii_case(name))
}

/// Stops at the first matching regular file
fn contains_match(dir: &Path, filter: &ExtensionFilter) -> bool {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        debug!("Cannot open folder {}", dir.display());
        return false;
    };

    read_dir.filter_map(|e| e.ok()).any(|entry| {
        entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            && entry.file_name().to_str().is_some_and(|n| filter.matches(n))
    })
}
