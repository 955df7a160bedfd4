//! Score blending for the mixed and context paths.
//!
//! Candidates are `(file, line)` groups over the symbol/text/vector hits.
//! Mixed mode orders by source priority then blended score; context mode
//! adds doc/code boosts, question handling and the prefer-code dampener.

use tracing::trace;

/// Mixed blend weights over (vector, text, symbol-present).
const MIXED_WEIGHTS: (f32, f32, f32) = (0.5, 0.3, 0.2);
/// Context blend weights over (vector, text, symbol).
const CONTEXT_WEIGHTS: (f32, f32, f32) = (0.5, 0.4, 0.1);
const CONTEXT_WEIGHTS_QUESTION: (f32, f32, f32) = (0.55, 0.35, 0.1);
const CONTEXT_WEIGHTS_PREFER_CODE: (f32, f32, f32) = (0.35, 0.35, 0.3);

/// Dampener applied to doc boosts under prefer-code.
const PREFER_CODE_DOC_DAMPEN: f32 = 0.8;

const SECTION_KEYWORDS: &[&str] = &[
    "overview",
    "introduction",
    "getting started",
    "usage",
    "guide",
    "readme",
    "简介",
    "概述",
    "说明",
    "指南",
];

const IMPLEMENTATION_KEYWORDS: &[&str] = &[
    "implement",
    "implementation",
    "logic",
    "how does",
    "source code",
    "实现",
    "原理",
    "内部",
];

/// One `(file, line)` candidate group with per-source scores.
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub kind: String,
    pub name: String,
    pub title: String,
    pub file: String,
    pub line: u32,
    pub line_end: u32,
    pub snippet: String,
    pub doc_id: String,

    pub has_symbol: bool,
    pub has_text: bool,
    pub has_vector: bool,
    pub symbol_score: f32,
    pub text_score: f32,
    pub vector_score: f32,

    /// Filled by blending.
    pub score: f32,
    pub doc_boost: f32,
}

impl Candidate {
    /// 3 when a symbol contributed, 2 for text-only, 1 for vector-only.
    pub fn priority(&self) -> u8 {
        if self.has_symbol {
            3
        } else if self.has_text {
            2
        } else {
            1
        }
    }

    /// `+`-joined contributing sources.
    pub fn source_tag(&self) -> String {
        let mut parts = Vec::new();
        if self.has_symbol {
            parts.push("symbol");
        }
        if self.has_text {
            parts.push("text");
        }
        if self.has_vector {
            parts.push("vector");
        }
        if parts.is_empty() {
            parts.push("text");
        }
        parts.join("+")
    }

    pub fn is_doc(&self) -> bool {
        self.file.ends_with(".md")
    }

    pub fn is_readme(&self) -> bool {
        std::path::Path::new(&self.file)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case("README.md"))
    }
}

/// True when the query looks like it wants the implementation: an
/// identifier-like token (≥ 3 runes, contains a letter) plus an
/// implementation keyword.
pub fn prefer_code(query: &str) -> bool {
    let q = query.to_lowercase();
    let has_identifier = q
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|tok| tok.chars().count() >= 3 && tok.chars().any(|c| c.is_alphabetic()));
    has_identifier && IMPLEMENTATION_KEYWORDS.iter().any(|k| q.contains(k))
}

/// Doc-file boost for context ranking.
fn doc_boost(c: &Candidate, question: bool) -> f32 {
    let base = if c.is_readme() {
        1.5
    } else if c.file.starts_with("docs/")
        || c.file.contains("/docs/")
        || c.file.starts_with("reference/")
        || c.file.contains("/reference/")
    {
        1.0
    } else if c.is_doc() {
        0.8
    } else {
        return 0.0;
    };

    let mut boost = base;
    if question {
        boost += 0.5;
    }
    let title = c.title.to_lowercase();
    if SECTION_KEYWORDS.iter().any(|k| title.contains(k)) {
        boost += 0.9;
    }
    if c.is_readme() && (c.snippet.contains("本项目") || c.snippet.to_lowercase().contains("this project"))
    {
        boost += 0.3;
    }
    boost
}

fn code_boost(c: &Candidate) -> f32 {
    if c.file.ends_with(".go") { 0.3 } else { 0.0 }
}

fn sort_by_file_line(a: &Candidate, b: &Candidate) -> std::cmp::Ordering {
    a.file.cmp(&b.file).then_with(|| a.line.cmp(&b.line))
}

/// Mixed-mode blending: priority tier first, then the weighted score.
pub fn blend_mixed(mut candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
    let (wv, wt, ws) = MIXED_WEIGHTS;
    for c in &mut candidates {
        let symbol_present = if c.has_symbol { 1.0 } else { 0.0 };
        c.score = wv * c.vector_score + wt * c.text_score + ws * symbol_present;
    }
    candidates.sort_by(|a, b| {
        b.priority()
            .cmp(&a.priority())
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| sort_by_file_line(a, b))
    });
    candidates.truncate(top_k);
    candidates
}

/// Context-mode blending with doc/code boosts and per-file caps.
pub fn blend_context(
    mut candidates: Vec<Candidate>,
    question: bool,
    prefer_code: bool,
    top_k: usize,
) -> Vec<Candidate> {
    let (wv, wt, ws) = if prefer_code {
        CONTEXT_WEIGHTS_PREFER_CODE
    } else if question {
        CONTEXT_WEIGHTS_QUESTION
    } else {
        CONTEXT_WEIGHTS
    };

    for c in &mut candidates {
        let symbol_present = if c.has_symbol { 1.0 } else { 0.0 };
        let mut doc = doc_boost(c, question);
        if prefer_code {
            doc = (doc - PREFER_CODE_DOC_DAMPEN).max(0.0);
        }
        c.doc_boost = doc;
        c.score = wv * c.vector_score + wt * c.text_score + ws * symbol_present
            + doc
            + code_boost(c);
    }

    if prefer_code {
        let has_code_hit = candidates.iter().any(|c| !c.is_doc());
        if has_code_hit {
            candidates.retain(|c| !c.is_doc());
        }
    }

    candidates.sort_by(|a, b| {
        b.doc_boost
            .partial_cmp(&a.doc_boost)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.priority().cmp(&a.priority()))
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| sort_by_file_line(a, b))
    });

    let capped = if question {
        cap_question_mode(candidates, top_k)
    } else {
        cap_per_file(candidates, 2, top_k)
    };
    trace!("blend_context: {} hits after caps", capped.len());
    capped
}

/// Non-question cap: at most `per_file` hits for one file.
fn cap_per_file(candidates: Vec<Candidate>, per_file: usize, top_k: usize) -> Vec<Candidate> {
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut out = Vec::new();
    for c in candidates {
        let n = counts.entry(c.file.clone()).or_insert(0);
        if *n >= per_file {
            continue;
        }
        *n += 1;
        out.push(c);
        if out.len() >= top_k {
            break;
        }
    }
    out
}

/// Question cap: docs first (1 per file, 2 for README), then code hits.
fn cap_question_mode(candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
    let (docs, code): (Vec<Candidate>, Vec<Candidate>) =
        candidates.into_iter().partition(|c| c.is_doc());

    let mut out = Vec::new();
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for c in docs {
        let limit = if c.is_readme() { 2 } else { 1 };
        let n = counts.entry(c.file.clone()).or_insert(0);
        if *n >= limit {
            continue;
        }
        *n += 1;
        out.push(c);
    }
    for c in code {
        let n = counts.entry(c.file.clone()).or_insert(0);
        if *n >= 1 {
            continue;
        }
        *n += 1;
        out.push(c);
    }
    out.truncate(top_k);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(file: &str, line: u32) -> Candidate {
        Candidate {
            file: file.into(),
            line,
            line_end: line,
            ..Default::default()
        }
    }

    #[test]
    fn priority_tiers() {
        let mut c = cand("a.go", 1);
        c.has_vector = true;
        assert_eq!(c.priority(), 1);
        c.has_text = true;
        assert_eq!(c.priority(), 2);
        c.has_symbol = true;
        assert_eq!(c.priority(), 3);
        assert_eq!(c.source_tag(), "symbol+text+vector");
    }

    #[test]
    fn mixed_orders_by_priority_before_score() {
        let mut symbol_hit = cand("sym.go", 5);
        symbol_hit.has_symbol = true;
        symbol_hit.symbol_score = 1.0;

        let mut vector_hit = cand("vec.go", 1);
        vector_hit.has_vector = true;
        vector_hit.vector_score = 1.0; // raw score higher than the symbol's

        let out = blend_mixed(vec![vector_hit, symbol_hit], 10);
        assert_eq!(out[0].file, "sym.go");
        assert_eq!(out[1].file, "vec.go");
    }

    #[test]
    fn mixed_score_formula() {
        let mut c = cand("a.go", 1);
        c.has_symbol = true;
        c.has_text = true;
        c.has_vector = true;
        c.vector_score = 0.8;
        c.text_score = 0.5;
        let out = blend_mixed(vec![c], 10);
        assert!((out[0].score - (0.5 * 0.8 + 0.3 * 0.5 + 0.2)).abs() < 1e-6);
    }

    #[test]
    fn context_question_puts_readme_first() {
        let mut readme = cand("README.md", 10);
        readme.has_text = true;
        readme.text_score = 0.4;
        readme.title = "Overview".into();

        let mut code = cand("pkg/a.go", 3);
        code.has_symbol = true;
        code.has_text = true;
        code.text_score = 1.0;

        let out = blend_context(vec![code, readme], true, false, 10);
        assert_eq!(out[0].file, "README.md");
        assert!(out[0].doc_boost >= 1.5 + 0.5 + 0.9);
    }

    #[test]
    fn prefer_code_drops_docs_when_code_exists() {
        let mut doc = cand("docs/config.md", 1);
        doc.has_text = true;
        doc.text_score = 1.0;
        let mut code = cand("pkg/config.go", 10);
        code.has_symbol = true;

        let out = blend_context(vec![doc, code], false, true, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].file, "pkg/config.go");
    }

    #[test]
    fn prefer_code_detection() {
        assert!(prefer_code("How is ParseConfig implemented?"));
        assert!(prefer_code("ParseConfig 的实现"));
        assert!(!prefer_code("what is the indexer?"));
    }

    #[test]
    fn non_question_caps_two_per_file() {
        let mut cands = Vec::new();
        for line in [1u32, 5, 9] {
            let mut c = cand("pkg/a.go", line);
            c.has_text = true;
            c.text_score = 1.0 - line as f32 * 0.01;
            cands.push(c);
        }
        let out = blend_context(cands, false, false, 10);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn question_mode_allows_two_readme_hits() {
        let mut cands = Vec::new();
        for line in [1u32, 20, 40] {
            let mut c = cand("README.md", line);
            c.has_text = true;
            c.text_score = 0.5;
            cands.push(c);
        }
        let out = blend_context(cands, true, false, 10);
        assert_eq!(out.len(), 2);
    }
}
