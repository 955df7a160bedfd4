//! Tracked-file enumeration.

use crate::errors::ScanError;
use crate::filter::SourceFilter;
use crate::git;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Lists repo-relative paths to index: the VCS listing when available,
/// else a recursive walk. Both go through the same [`SourceFilter`].
pub fn list_tracked_files(root: &Path, filter: &SourceFilter) -> Result<Vec<String>, ScanError> {
    match git::ls_files(root) {
        Ok(files) => {
            let kept: Vec<String> = files
                .into_iter()
                .filter(|p| filter.should_index(p))
                .collect();
            debug!("list_tracked_files: {} files via git ls-files", kept.len());
            Ok(kept)
        }
        Err(e) => {
            warn!("list_tracked_files: git listing failed ({e}), walking directory");
            walk_files(root, filter)
        }
    }
}

fn walk_files(root: &Path, filter: &SourceFilter) -> Result<Vec<String>, ScanError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        if filter.should_index(&rel) {
            out.push(rel);
        }
    }
    out.sort();
    debug!("walk_files: {} files", out.len());
    Ok(out)
}
