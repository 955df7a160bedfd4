//! Chunk construction for embedding.
//!
//! Go: one chunk per function/method, starting at the doc comment when
//! present; oversized chunks are split into overlapping windows. Markdown:
//! one chunk per heading section, truncated (not split) at the budget.
//! All sizes are counted in characters, not bytes.

use code_extract::{GoFunction, MarkdownChunk};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Chunk provenance kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    GoFunc,
    GoMethod,
    MdSection,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::GoFunc => "go_func",
            ChunkKind::GoMethod => "go_method",
            ChunkKind::MdSection => "md_section",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "go_method" => ChunkKind::GoMethod,
            "md_section" => ChunkKind::MdSection,
            _ => ChunkKind::GoFunc,
        }
    }
}

/// One embeddable unit with a content-determined stable id.
#[derive(Debug, Clone)]
pub struct VectorChunk {
    /// `vec:<path>:<sha1(path|name|text)>`; identical bytes reindex to the
    /// same id.
    pub id: String,
    pub file: String,
    pub kind: ChunkKind,
    pub name: String,
    pub title: String,
    pub text: String,
    pub line_start: u32,
    pub line_end: u32,
    /// SHA-1 of `<file>:<name_or_part_id>:<text>`.
    pub hash: String,
}

fn sha1_hex(input: &str) -> String {
    let mut h = Sha1::new();
    h.update(input.as_bytes());
    h.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

fn make_chunk(
    file: &str,
    kind: ChunkKind,
    name: &str,
    part_id: &str,
    title: &str,
    text: String,
    line_start: u32,
    line_end: u32,
) -> VectorChunk {
    let hash = sha1_hex(&format!("{file}:{part_id}:{text}"));
    let id = format!("vec:{file}:{}", sha1_hex(&format!("{file}|{name}|{text}")));
    VectorChunk {
        id,
        file: file.to_string(),
        kind,
        name: name.to_string(),
        title: title.to_string(),
        text,
        line_start,
        line_end,
        hash,
    }
}

/// Chunks Go functions/methods. `max_chars == 0` disables window splitting.
pub fn chunk_go_functions(
    functions: &[GoFunction],
    file: &str,
    max_chars: usize,
    overlap_chars: usize,
) -> Vec<VectorChunk> {
    let mut out = Vec::new();
    for f in functions {
        let text = f.text.trim();
        if text.is_empty() {
            continue;
        }
        let kind = if f.is_method() {
            ChunkKind::GoMethod
        } else {
            ChunkKind::GoFunc
        };

        let runes: Vec<char> = text.chars().collect();
        if max_chars == 0 || runes.len() <= max_chars {
            out.push(make_chunk(
                file,
                kind,
                &f.name,
                &f.name,
                &f.name,
                text.to_string(),
                f.chunk_line,
                f.end_line,
            ));
            continue;
        }

        // Overlapping windows over the rune sequence.
        let step = max_chars.saturating_sub(overlap_chars).max(1);
        let mut start = 0usize;
        let mut part = 0usize;
        while start < runes.len() {
            let end = (start + max_chars).min(runes.len());
            let piece: String = runes[start..end].iter().collect();
            let piece = piece.trim().to_string();
            if !piece.is_empty() {
                let part_id = format!("{}#{part}", f.name);
                out.push(make_chunk(
                    file,
                    kind,
                    &f.name,
                    &part_id,
                    &f.name,
                    piece,
                    f.chunk_line,
                    f.end_line,
                ));
                part += 1;
            }
            if end == runes.len() {
                break;
            }
            start += step;
        }
    }
    out
}

/// Chunks markdown sections, truncating each at `max_chars` characters.
pub fn chunk_markdown_sections(
    sections: &[MarkdownChunk],
    file: &str,
    max_chars: usize,
) -> Vec<VectorChunk> {
    let mut out = Vec::new();
    for s in sections {
        let mut text = s.content.trim().to_string();
        if text.is_empty() {
            continue;
        }
        if max_chars > 0 && text.chars().count() > max_chars {
            text = text.chars().take(max_chars).collect();
        }
        let name = if s.title.is_empty() {
            format!("{file}:{}", s.line_start)
        } else {
            s.title.clone()
        };
        out.push(make_chunk(
            file,
            ChunkKind::MdSection,
            &name,
            &name,
            &s.title,
            text,
            s.line_start,
            s.line_end,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_extract::GoFunction;

    fn func(name: &str, text: &str) -> GoFunction {
        GoFunction {
            name: name.into(),
            recv: String::new(),
            line: 10,
            chunk_line: 8,
            end_line: 20,
            text: text.into(),
        }
    }

    #[test]
    fn ids_are_stable_across_runs() {
        let fs = vec![func("Foo", "func Foo() {}\n")];
        let a = chunk_go_functions(&fs, "a.go", 1500, 80);
        let b = chunk_go_functions(&fs, "a.go", 1500, 80);
        assert_eq!(a[0].id, b[0].id);
        assert_eq!(a[0].hash, b[0].hash);
        assert!(a[0].id.starts_with("vec:a.go:"));
    }

    #[test]
    fn different_text_changes_id() {
        let a = chunk_go_functions(&[func("Foo", "x")], "a.go", 1500, 80);
        let b = chunk_go_functions(&[func("Foo", "y")], "a.go", 1500, 80);
        assert_ne!(a[0].id, b[0].id);
    }

    #[test]
    fn empty_functions_are_dropped() {
        let chunks = chunk_go_functions(&[func("Foo", "  \n ")], "a.go", 1500, 80);
        assert!(chunks.is_empty());
    }

    #[test]
    fn method_kind_and_name() {
        let f = GoFunction {
            name: "Server.Start".into(),
            recv: "*Server".into(),
            line: 3,
            chunk_line: 3,
            end_line: 9,
            text: "func (s *Server) Start() {}".into(),
        };
        let chunks = chunk_go_functions(&[f], "srv.go", 1500, 80);
        assert_eq!(chunks[0].kind, ChunkKind::GoMethod);
        assert_eq!(chunks[0].name, "Server.Start");
    }

    #[test]
    fn oversized_function_splits_with_overlap() {
        let body: String = "abcdefghij".repeat(50); // 500 chars
        let chunks = chunk_go_functions(&[func("Big", &body)], "a.go", 200, 50);
        assert!(chunks.len() > 2);
        for c in &chunks {
            assert!(c.text.chars().count() <= 200);
        }
        // Consecutive windows share the overlap region.
        let first: Vec<char> = chunks[0].text.chars().collect();
        let second: Vec<char> = chunks[1].text.chars().collect();
        let tail: String = first[first.len() - 50..].iter().collect();
        let head: String = second[..50].iter().collect();
        assert_eq!(tail, head);
    }

    #[test]
    fn markdown_truncates_not_splits() {
        let sec = MarkdownChunk {
            title: "Big".into(),
            content: "z".repeat(2000),
            line_start: 1,
            line_end: 40,
        };
        let chunks = chunk_markdown_sections(&[sec], "big.md", 1500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.chars().count(), 1500);
        assert_eq!(chunks[0].kind, ChunkKind::MdSection);
    }
}
