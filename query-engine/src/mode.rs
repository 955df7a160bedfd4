//! Intent-mode routing.

use serde::{Deserialize, Serialize};

/// Query intent modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Auto,
    Search,
    Context,
    Impact,
    Architecture,
    Quality,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Auto => "auto",
            QueryMode::Search => "search",
            QueryMode::Context => "context",
            QueryMode::Impact => "impact",
            QueryMode::Architecture => "architecture",
            QueryMode::Quality => "quality",
        }
    }
}

const QUALITY_TERMS: &[&str] = &[
    "quality", "coverage", "lint", "质量", "覆盖率", "测试覆盖",
];

const ARCHITECTURE_TERMS: &[&str] = &[
    "architecture",
    "topology",
    "dependency graph",
    "module graph",
    "架构",
    "拓扑",
    "依赖关系",
    "模块结构",
];

const IMPACT_TERMS: &[&str] = &[
    "impact", "affected", "affects", "break", "影响", "波及", "牵连",
];

const LOCATOR_TERMS: &[&str] = &[
    "where", "locate", "find file", "which file", "哪里", "在哪", "哪个文件", "查找", "搜索",
];

const QUESTION_WORDS: &[&str] = &[
    "what", "why", "how", "when", "which", "who", "是什么", "为什么", "如何", "怎么", "什么",
];

/// Question detection: `?`/`？` or a bilingual question keyword.
pub fn is_question(query: &str) -> bool {
    let q = query.to_lowercase();
    if q.contains('?') || q.contains('？') {
        return true;
    }
    QUESTION_WORDS.iter().any(|w| q.contains(w))
}

fn contains_any(q: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| q.contains(t))
}

/// Keyword/signal routing for `auto`.
pub fn detect_mode(query: &str) -> QueryMode {
    let q = query.to_lowercase();
    let question = is_question(&q);

    if contains_any(&q, QUALITY_TERMS) {
        return QueryMode::Quality;
    }
    if contains_any(&q, ARCHITECTURE_TERMS) {
        return QueryMode::Architecture;
    }
    if question && contains_any(&q, IMPACT_TERMS) {
        return QueryMode::Impact;
    }
    if question && contains_any(&q, LOCATOR_TERMS) {
        return QueryMode::Search;
    }
    if question {
        return QueryMode::Context;
    }
    if contains_any(&q, IMPACT_TERMS) {
        return QueryMode::Impact;
    }
    if contains_any(&q, LOCATOR_TERMS) {
        return QueryMode::Search;
    }
    QueryMode::Context
}
