//! Tracked-file discovery and inclusion filtering.
//!
//! Enumeration prefers the VCS listing (`git ls-files`) and falls back to a
//! recursive directory walk. The [`SourceFilter`] applies gitignore rules,
//! exclude globs, excluded directory segments and the extension allow-list.

mod discover;
mod errors;
mod filter;
mod git;

pub use discover::list_tracked_files;
pub use errors::ScanError;
pub use filter::{SourceFilter, lang_for_path};
pub use git::{Change, ChangeStatus, diff_name_status, ls_files, status_porcelain};
