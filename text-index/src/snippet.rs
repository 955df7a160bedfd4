//! Snippet extraction by file-range read.

use std::path::Path;

/// Max lines shown for a range-based snippet.
const RANGE_SNIPPET_LINES: usize = 12;
/// Window size for the query-scan fallback.
const FALLBACK_WINDOW_LINES: usize = 6;

/// Reads up to [`RANGE_SNIPPET_LINES`] lines of `rel_path` between
/// `line_start` and `line_end` (1-based inclusive). Returns `None` when the
/// file cannot be read or the range is empty.
pub fn read_line_range(root: &Path, rel_path: &str, line_start: u64, line_end: u64) -> Option<String> {
    if line_start == 0 {
        return None;
    }
    let text = std::fs::read_to_string(root.join(rel_path)).ok()?;
    let start = line_start as usize;
    let end = (line_end.max(line_start) as usize).min(start + RANGE_SNIPPET_LINES - 1);

    let lines: Vec<&str> = text
        .lines()
        .skip(start - 1)
        .take(end - start + 1)
        .collect();
    if lines.is_empty() {
        return None;
    }
    Some(lines.join("\n"))
}

/// Fallback when a hit carries no line range: scans for the first line
/// containing `query` (case-insensitive) and returns a window of
/// [`FALLBACK_WINDOW_LINES`] lines around it.
pub fn find_query_window(root: &Path, rel_path: &str, query: &str) -> Option<String> {
    let text = std::fs::read_to_string(root.join(rel_path)).ok()?;
    let needle = query.to_lowercase();
    let lines: Vec<&str> = text.lines().collect();

    let hit = lines
        .iter()
        .position(|l| l.to_lowercase().contains(&needle))?;
    let start = hit.saturating_sub(1);
    let end = (start + FALLBACK_WINDOW_LINES).min(lines.len());
    Some(lines[start..end].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn range_read_caps_at_twelve_lines() {
        let tmp = tempfile::TempDir::new().unwrap();
        let body: Vec<String> = (1..=30).map(|i| format!("line{i}")).collect();
        write(tmp.path(), "f.go", &body.join("\n"));

        let s = read_line_range(tmp.path(), "f.go", 5, 30).unwrap();
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "line5");
        assert_eq!(lines[11], "line16");
    }

    #[test]
    fn range_read_is_inclusive() {
        let tmp = tempfile::TempDir::new().unwrap();
        write(tmp.path(), "f.md", "a\nb\nc\nd\n");
        assert_eq!(read_line_range(tmp.path(), "f.md", 2, 3).unwrap(), "b\nc");
    }

    #[test]
    fn fallback_scans_for_query() {
        let tmp = tempfile::TempDir::new().unwrap();
        write(tmp.path(), "f.md", "one\ntwo\nthe Needle here\nfour\nfive\nsix\nseven\n");
        let s = find_query_window(tmp.path(), "f.md", "needle").unwrap();
        assert!(s.contains("Needle"));
        assert!(s.lines().count() <= 6);
    }

    #[test]
    fn missing_file_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(read_line_range(tmp.path(), "gone.go", 1, 3).is_none());
        assert!(find_query_window(tmp.path(), "gone.go", "x").is_none());
    }
}
