//! Local artifact enumeration

use std::path::Path;

use walkdir::WalkDir;

/// List every regular file under `root` as a forward-slash relative path
///
/// Symlinks are not followed into directories, but a symlink that resolves
/// to a regular file is listed. A missing or empty root yields an empty
/// list; callers validate the root beforehand. Order is unspecified.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        let file_type = entry.file_type();
        let is_file = file_type.is_file()
            || (file_type.is_symlink()
                && std::fs::metadata(entry.path()).is_ok_and(|m| m.is_file()));
        if !is_file {
            continue;
        }

        match relative_path(root, entry.path()) {
            Some(relative) => paths.push(relative),
            None => {
                tracing::debug!(path = %entry.path().display(), "Skipping path outside root");
            }
        }
    }

    paths
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
