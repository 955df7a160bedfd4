//! Markdown heading chunker.
//!
//! Linear scan: a heading line of level 1-6 closes the previous chunk and
//! starts a new one titled with the slash-joined path of still-active
//! higher-or-equal-level headings plus the new title. Oversized chunks are
//! split afterwards along blank-line segments, then by line count.

use tracing::trace;

/// One heading-delimited section (1-based inclusive line numbers).
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownChunk {
    /// Slash-joined heading path, e.g. `Guide/Install/Linux`.
    pub title: String,
    pub content: String,
    pub line_start: u32,
    pub line_end: u32,
}

/// Chunks a markdown document. `max_chars` bounds the character length of a
/// chunk's content; larger chunks are split (0 disables splitting).
pub fn chunk_markdown(text: &str, max_chars: usize) -> Vec<MarkdownChunk> {
    let lines: Vec<&str> = text.lines().collect();
    let total = lines.len().max(1) as u32;

    if lines.is_empty() {
        return vec![MarkdownChunk {
            title: String::new(),
            content: String::new(),
            line_start: 1,
            line_end: 1,
        }];
    }

    // (level, title) stack of active headings.
    let mut stack: Vec<(u8, String)> = Vec::new();
    let mut chunks: Vec<MarkdownChunk> = Vec::new();

    let mut cur_title = String::new();
    let mut cur_start: u32 = 1;
    let mut cur_lines: Vec<&str> = Vec::new();

    let close = |chunks: &mut Vec<MarkdownChunk>,
                 title: &str,
                 start: u32,
                 end: u32,
                 body: &[&str]| {
        // Skip an empty preamble before the first heading.
        if body.is_empty() || body.iter().all(|l| l.trim().is_empty()) && title.is_empty() {
            return;
        }
        chunks.push(MarkdownChunk {
            title: title.to_string(),
            content: body.join("\n"),
            line_start: start,
            line_end: end,
        });
    };

    for (i, &line) in lines.iter().enumerate() {
        let line_no = i as u32 + 1;
        if let Some((level, title)) = heading_of(line) {
            close(&mut chunks, &cur_title, cur_start, line_no.saturating_sub(1), &cur_lines);

            while stack.last().is_some_and(|(l, _)| *l >= level) {
                stack.pop();
            }
            let mut parts: Vec<&str> = stack.iter().map(|(_, t)| t.as_str()).collect();
            parts.push(&title);
            cur_title = parts.join("/");
            stack.push((level, title.clone()));

            cur_start = line_no;
            cur_lines = vec![line];
        } else {
            cur_lines.push(line);
        }
    }
    close(&mut chunks, &cur_title, cur_start, total, &cur_lines);

    if chunks.is_empty() {
        // Whole file was blank lines; keep one covering chunk.
        chunks.push(MarkdownChunk {
            title: String::new(),
            content: text.trim_end_matches('\n').to_string(),
            line_start: 1,
            line_end: total,
        });
    }

    let chunks = if max_chars > 0 {
        chunks
            .into_iter()
            .flat_map(|c| split_oversized(c, max_chars))
            .collect()
    } else {
        chunks
    };

    trace!("chunk_markdown produced {} chunks", chunks.len());
    chunks
}

/// Parses `#`-style headings of level 1-6 followed by whitespace.
fn heading_of(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim();
    Some((hashes as u8, title.to_string()))
}

/// Splits one chunk along blank-line segments, then by line count.
fn split_oversized(chunk: MarkdownChunk, max_chars: usize) -> Vec<MarkdownChunk> {
    if chunk.content.chars().count() <= max_chars {
        return vec![chunk];
    }

    // Blank-line segments with their absolute line numbers.
    let lines: Vec<&str> = chunk.content.lines().collect();
    let mut segments: Vec<(u32, Vec<&str>)> = Vec::new();
    let mut seg_start: Option<u32> = None;
    let mut seg: Vec<&str> = Vec::new();
    for (i, &line) in lines.iter().enumerate() {
        let abs = chunk.line_start + i as u32;
        if line.trim().is_empty() {
            if let Some(s) = seg_start.take() {
                segments.push((s, std::mem::take(&mut seg)));
            }
        } else {
            seg_start.get_or_insert(abs);
            seg.push(line);
        }
    }
    if let Some(s) = seg_start {
        segments.push((s, seg));
    }

    let mut out = Vec::new();
    let mut part_start: Option<u32> = None;
    let mut part_end: u32 = chunk.line_start;
    let mut part: Vec<&str> = Vec::new();
    let mut part_chars = 0usize;

    let flush = |out: &mut Vec<MarkdownChunk>, start: Option<u32>, end: u32, body: &mut Vec<&str>| {
        if let Some(start) = start {
            if !body.is_empty() {
                out.push(MarkdownChunk {
                    title: chunk.title.clone(),
                    content: body.join("\n"),
                    line_start: start,
                    line_end: end,
                });
                body.clear();
            }
        }
    };

    for (seg_first, seg_lines) in segments {
        let seg_chars: usize = seg_lines.iter().map(|l| l.chars().count() + 1).sum();
        if seg_chars > max_chars {
            // Oversized segment: flush, then cut by line count.
            flush(&mut out, part_start.take(), part_end, &mut part);
            part_chars = 0;
            let mut sub_start = seg_first;
            let mut sub: Vec<&str> = Vec::new();
            let mut sub_chars = 0usize;
            for (j, &line) in seg_lines.iter().enumerate() {
                let len = line.chars().count() + 1;
                if !sub.is_empty() && sub_chars + len > max_chars {
                    out.push(MarkdownChunk {
                        title: chunk.title.clone(),
                        content: sub.join("\n"),
                        line_start: sub_start,
                        line_end: seg_first + j as u32 - 1,
                    });
                    sub = Vec::new();
                    sub_chars = 0;
                    sub_start = seg_first + j as u32;
                }
                sub.push(line);
                sub_chars += len;
            }
            if !sub.is_empty() {
                out.push(MarkdownChunk {
                    title: chunk.title.clone(),
                    content: sub.join("\n"),
                    line_start: sub_start,
                    line_end: seg_first + seg_lines.len() as u32 - 1,
                });
            }
            continue;
        }

        if part_chars + seg_chars > max_chars {
            flush(&mut out, part_start.take(), part_end, &mut part);
            part_chars = 0;
        }
        if part_start.is_none() {
            part_start = Some(seg_first);
            part = Vec::new();
        } else {
            part.push("");
        }
        part.extend(seg_lines.iter().copied());
        part_end = seg_first + seg_lines.len() as u32 - 1;
        part_chars += seg_chars;
    }
    flush(&mut out, part_start, part_end, &mut part);

    if out.is_empty() {
        vec![chunk]
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_one_chunk() {
        let chunks = chunk_markdown("", 1500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].line_start, 1);
        assert_eq!(chunks[0].line_end, 1);
    }

    #[test]
    fn heading_paths_join_active_levels() {
        let md = "# Guide\nintro\n## Install\nsteps\n### Linux\napt\n## Use\nrun\n";
        let chunks = chunk_markdown(md, 1500);
        let titles: Vec<&str> = chunks.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Guide", "Guide/Install", "Guide/Install/Linux", "Guide/Use"]);
    }

    #[test]
    fn line_ranges_are_inclusive_and_in_bounds() {
        let md = "# A\none\ntwo\n# B\nthree\n";
        let total = md.lines().count() as u32;
        let chunks = chunk_markdown(md, 1500);
        assert_eq!(chunks.len(), 2);
        assert_eq!((chunks[0].line_start, chunks[0].line_end), (1, 3));
        assert_eq!((chunks[1].line_start, chunks[1].line_end), (4, 5));
        for c in &chunks {
            assert!(1 <= c.line_start && c.line_start <= c.line_end && c.line_end <= total);
        }
    }

    #[test]
    fn preamble_before_first_heading_is_kept() {
        let md = "lead paragraph\n\n# A\nbody\n";
        let chunks = chunk_markdown(md, 1500);
        assert_eq!(chunks[0].title, "");
        assert_eq!(chunks[0].line_start, 1);
        assert_eq!(chunks[1].title, "A");
    }

    #[test]
    fn oversized_chunks_split_on_blank_lines() {
        let para = "x".repeat(400);
        let md = format!("# Big\n{para}\n\n{para}\n\n{para}\n");
        let chunks = chunk_markdown(&md, 900);
        assert!(chunks.len() >= 2, "got {}", chunks.len());
        for c in &chunks {
            assert!(c.content.chars().count() <= 900);
            assert_eq!(c.title, "Big");
        }
    }

    #[test]
    fn giant_segment_splits_by_line_count() {
        let lines: Vec<String> = (0..40).map(|i| format!("line {i} {}", "y".repeat(80))).collect();
        let md = format!("# Big\n{}\n", lines.join("\n"));
        let chunks = chunk_markdown(&md, 500);
        assert!(chunks.len() > 3);
        for c in &chunks {
            assert!(c.content.chars().count() <= 500);
        }
        // Ranges stay ordered and disjoint.
        for w in chunks.windows(2) {
            assert!(w[0].line_end < w[1].line_start);
        }
    }
}
