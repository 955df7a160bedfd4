//! Inclusion rules for the indexing pipeline.

use crate::errors::ScanError;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use repo_layout::IndexConfig;
use std::path::Path;
use tracing::debug;

/// Extensions accepted for indexing.
const ALLOWED_EXTENSIONS: &[&str] = &["go", "md"];

/// Language label stored in the `files` table, by extension.
pub fn lang_for_path(rel_path: &str) -> Option<&'static str> {
    let ext = Path::new(rel_path).extension()?.to_str()?;
    match ext {
        "go" => Some("go"),
        "md" => Some("markdown"),
        _ => None,
    }
}

/// Decides whether a repo-relative path is indexed.
///
/// Rule order: gitignore (when honored), exclude globs (full path and
/// basename), excluded directory segments, extension allow-list.
pub struct SourceFilter {
    gitignore: Option<Gitignore>,
    exclude_globs: Vec<glob::Pattern>,
    exclude_dirs: Vec<String>,
}

impl SourceFilter {
    /// Builds the filter for `root` from the index configuration.
    ///
    /// # Errors
    /// Returns [`ScanError::Filter`] on a malformed exclude glob.
    pub fn new(root: &Path, cfg: &IndexConfig) -> Result<Self, ScanError> {
        let gitignore = if cfg.use_gitignore {
            let mut builder = GitignoreBuilder::new(root);
            builder.add(root.join(".gitignore"));
            match builder.build() {
                Ok(gi) => Some(gi),
                Err(e) => {
                    debug!("SourceFilter: unusable gitignore, skipping ({e})");
                    None
                }
            }
        } else {
            None
        };

        let mut exclude_globs = Vec::with_capacity(cfg.exclude.len());
        for pat in &cfg.exclude {
            let p = glob::Pattern::new(pat)
                .map_err(|e| ScanError::Filter(format!("bad exclude glob {pat:?}: {e}")))?;
            exclude_globs.push(p);
        }

        // A trailing slash means "directory segment"; normalize it away.
        let exclude_dirs = cfg
            .exclude_dirs
            .iter()
            .map(|d| d.trim_end_matches('/').to_string())
            .filter(|d| !d.is_empty())
            .collect();

        Ok(Self {
            gitignore,
            exclude_globs,
            exclude_dirs,
        })
    }

    /// True when the repo-relative path passes all inclusion rules.
    pub fn should_index(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.trim_start_matches("./");
        if rel_path.is_empty() {
            return false;
        }

        if let Some(gi) = &self.gitignore {
            if gi
                .matched_path_or_any_parents(rel_path, false)
                .is_ignore()
            {
                return false;
            }
        }

        let basename = Path::new(rel_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(rel_path);
        for pat in &self.exclude_globs {
            if pat.matches(rel_path) || pat.matches(basename) {
                return false;
            }
        }

        for seg in Path::new(rel_path).iter() {
            let Some(seg) = seg.to_str() else { continue };
            if self.exclude_dirs.iter().any(|d| d == seg) {
                return false;
            }
        }

        let Some(ext) = Path::new(rel_path).extension().and_then(|e| e.to_str()) else {
            return false;
        };
        ALLOWED_EXTENSIONS.contains(&ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_layout::IndexConfig;

    fn filter_in(dir: &Path) -> SourceFilter {
        SourceFilter::new(dir, &IndexConfig::default()).unwrap()
    }

    #[test]
    fn extension_allow_list() {
        let tmp = tempfile::TempDir::new().unwrap();
        let f = filter_in(tmp.path());
        assert!(f.should_index("main.go"));
        assert!(f.should_index("docs/readme.md"));
        assert!(!f.should_index("script.py"));
        assert!(!f.should_index("Makefile"));
    }

    #[test]
    fn exclude_globs_match_path_and_basename() {
        let tmp = tempfile::TempDir::new().unwrap();
        let f = filter_in(tmp.path());
        assert!(!f.should_index("gen/api.pb.go"));
        assert!(!f.should_index("internal/model.gen.go"));
        assert!(f.should_index("internal/model.go"));
    }

    #[test]
    fn excluded_dir_segments() {
        let tmp = tempfile::TempDir::new().unwrap();
        let f = filter_in(tmp.path());
        assert!(!f.should_index("vendor/lib/a.go"));
        assert!(!f.should_index("a/node_modules/b/c.md"));
        assert!(f.should_index("vendored/a.go"));
    }

    #[test]
    fn trailing_slash_means_segment() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut cfg = IndexConfig::default();
        cfg.exclude_dirs.push("gen/".to_string());
        let f = SourceFilter::new(tmp.path(), &cfg).unwrap();
        assert!(!f.should_index("pkg/gen/x.go"));
        assert!(f.should_index("pkg/genx/x.go"));
    }

    #[test]
    fn gitignore_is_honored() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".gitignore"), "ignored/\n*.tmp.md\n").unwrap();
        let f = filter_in(tmp.path());
        assert!(!f.should_index("ignored/a.go"));
        assert!(!f.should_index("notes.tmp.md"));
        assert!(f.should_index("kept/a.go"));
    }

    #[test]
    fn gitignore_can_be_disabled() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".gitignore"), "ignored/\n").unwrap();
        let cfg = IndexConfig {
            use_gitignore: false,
            ..IndexConfig::default()
        };
        let f = SourceFilter::new(tmp.path(), &cfg).unwrap();
        assert!(f.should_index("ignored/a.go"));
    }

    #[test]
    fn language_labels() {
        assert_eq!(lang_for_path("a/b.go"), Some("go"));
        assert_eq!(lang_for_path("README.md"), Some("markdown"));
        assert_eq!(lang_for_path("a.txt"), None);
    }
}
