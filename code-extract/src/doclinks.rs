//! Backtick doc-link extraction from markdown prose.
//!
//! Scans line by line, skipping fenced code blocks (``` or ~~~). A backtick
//! token becomes a doc link when it is non-empty, contains no whitespace and
//! is at most 128 characters long.

use crate::types::DocLink;

const MAX_SYMBOL_LEN: usize = 128;

/// Extracts doc links from one markdown file.
pub fn extract_doc_links(text: &str, rel_path: &str) -> Vec<DocLink> {
    let mut out = Vec::new();
    let mut in_fence = false;

    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let line_no = i as u32 + 1;
        for token in backtick_tokens(line) {
            if qualifies(token) {
                out.push(DocLink {
                    symbol: token.to_string(),
                    file: rel_path.to_string(),
                    line: line_no,
                    confidence: DocLink::CONFIDENCE,
                });
            }
        }
    }
    out
}

/// Substrings between backtick pairs on one line.
fn backtick_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split('`')
        .enumerate()
        .filter_map(|(i, part)| if i % 2 == 1 { Some(part) } else { None })
}

fn qualifies(token: &str) -> bool {
    !token.is_empty()
        && !token.chars().any(char::is_whitespace)
        && token.chars().count() <= MAX_SYMBOL_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_tokens() {
        let links = extract_doc_links("Use `ParseConfig` then `Server.Start`.\n", "docs/a.md");
        let syms: Vec<&str> = links.iter().map(|l| l.symbol.as_str()).collect();
        assert_eq!(syms, vec!["ParseConfig", "Server.Start"]);
        assert_eq!(links[0].line, 1);
        assert_eq!(links[0].confidence, 0.6);
        assert_eq!(links[0].file, "docs/a.md");
    }

    #[test]
    fn skips_fenced_blocks() {
        let md = "intro `Keep`\n```go\n`Skip`\n```\noutro `Also`\n~~~\n`No`\n~~~\n";
        let syms: Vec<String> = extract_doc_links(md, "x.md")
            .into_iter()
            .map(|l| l.symbol)
            .collect();
        assert_eq!(syms, vec!["Keep", "Also"]);
    }

    #[test]
    fn rejects_whitespace_empty_and_oversized() {
        let long = "x".repeat(129);
        let md = format!("`` `has space` `{long}` `ok`\n");
        let syms: Vec<String> = extract_doc_links(&md, "x.md")
            .into_iter()
            .map(|l| l.symbol)
            .collect();
        assert_eq!(syms, vec!["ok"]);
    }
}
