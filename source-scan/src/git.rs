//! Read-only git subprocess helpers.
//!
//! All VCS access is `git -C <root> …`; nothing here mutates the work tree.

use crate::errors::ScanError;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// One entry of a change set fed into the delta pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub status: ChangeStatus,
    /// New path for renames, the only path otherwise.
    pub path: String,
    /// Prior path, set for renames.
    pub old_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeStatus {
    fn from_code(code: &str) -> Option<Self> {
        match code.chars().next()? {
            'A' | '?' => Some(ChangeStatus::Added),
            'M' | 'T' | 'U' => Some(ChangeStatus::Modified),
            'D' => Some(ChangeStatus::Deleted),
            'R' | 'C' => Some(ChangeStatus::Renamed),
            _ => None,
        }
    }
}

fn run_git(root: &Path, args: &[&str]) -> Result<String, ScanError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .output()
        .map_err(|e| ScanError::Git(format!("failed to spawn git: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScanError::Git(format!(
            "git {} exited with {}: {}",
            args.join(" "),
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `git ls-files`: the tracked-file listing.
pub fn ls_files(root: &Path) -> Result<Vec<String>, ScanError> {
    let out = run_git(root, &["ls-files"])?;
    Ok(out
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// `git diff --name-status <rev>`: changes since a revision.
pub fn diff_name_status(root: &Path, rev: &str) -> Result<Vec<Change>, ScanError> {
    let out = run_git(root, &["diff", "--name-status", rev])?;
    let mut changes = Vec::new();
    for line in out.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut cols = line.split('\t');
        let Some(code) = cols.next() else { continue };
        let Some(status) = ChangeStatus::from_code(code) else {
            debug!("diff_name_status: skipping status {code:?}");
            continue;
        };
        match status {
            ChangeStatus::Renamed => {
                // R<score>\told\tnew
                let (Some(old), Some(new)) = (cols.next(), cols.next()) else {
                    continue;
                };
                changes.push(Change {
                    status,
                    path: new.to_string(),
                    old_path: Some(old.to_string()),
                });
            }
            _ => {
                let Some(path) = cols.next() else { continue };
                changes.push(Change {
                    status,
                    path: path.to_string(),
                    old_path: None,
                });
            }
        }
    }
    Ok(changes)
}

/// `git status --porcelain`: the working-tree snapshot used by the watcher.
///
/// Returns the raw text (for fingerprinting) plus the parsed change set.
pub fn status_porcelain(root: &Path) -> Result<(String, Vec<Change>), ScanError> {
    let out = run_git(root, &["status", "--porcelain"])?;
    let changes = parse_porcelain(&out);
    Ok((out, changes))
}

fn parse_porcelain(out: &str) -> Vec<Change> {
    let mut changes = Vec::new();
    for line in out.lines() {
        if line.len() < 4 {
            continue;
        }
        let code = &line[..2];
        let rest = line[3..].trim();
        let status = code
            .chars()
            .find_map(|c| ChangeStatus::from_code(&c.to_string()))
            .unwrap_or(ChangeStatus::Modified);
        if let Some((old, new)) = rest.split_once(" -> ") {
            changes.push(Change {
                status: ChangeStatus::Renamed,
                path: new.trim().to_string(),
                old_path: Some(old.trim().to_string()),
            });
        } else {
            changes.push(Change {
                status,
                path: rest.to_string(),
                old_path: None,
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn porcelain_parses_statuses_and_renames() {
        let raw = " M src/a.go\nA  src/b.go\nD  src/c.md\nR  old.go -> new.go\n?? notes.md\n";
        let changes = parse_porcelain(raw);
        assert_eq!(changes.len(), 5);
        assert_eq!(changes[0].status, ChangeStatus::Modified);
        assert_eq!(changes[1].status, ChangeStatus::Added);
        assert_eq!(changes[2].status, ChangeStatus::Deleted);
        assert_eq!(changes[3].status, ChangeStatus::Renamed);
        assert_eq!(changes[3].old_path.as_deref(), Some("old.go"));
        assert_eq!(changes[3].path, "new.go");
        assert_eq!(changes[4].status, ChangeStatus::Added);
    }

    #[test]
    fn status_codes_map() {
        assert_eq!(ChangeStatus::from_code("A"), Some(ChangeStatus::Added));
        assert_eq!(ChangeStatus::from_code("R100"), Some(ChangeStatus::Renamed));
        assert_eq!(ChangeStatus::from_code("C75"), Some(ChangeStatus::Renamed));
        assert_eq!(ChangeStatus::from_code("??"), Some(ChangeStatus::Added));
        assert_eq!(ChangeStatus::from_code("X"), None);
    }
}
