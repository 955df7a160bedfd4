//! Query orchestration: open the per-repo indexes, fan out per-source
//! retrieval over the query variants, blend and enrich.

use crate::blend::{self, Candidate};
use crate::errors::QueryError;
use crate::merge::{RawHit, merge_weighted};
use crate::mode::{QueryMode, detect_mode, is_question};
use crate::tokenize::build_variants;
use crate::types::{
    ArchitectureStats, DocLinkRef, QueryOptions, QueryOutput, QueryType, QualityStats,
    RelationGroup, SearchHit,
};
use code_extract::RelationKind;
use index_pipeline::open_vector_runtime;
use regex::Regex;
use repo_layout::{AppConfig, RepoPaths};
use std::collections::HashMap;
use symbol_store::{StoreError, SymbolStore};
use text_index::{TextIndex, TextIndexError, find_query_window, read_line_range};
use tracing::{debug, info, warn};
use vector_store::{ScoredPoint, VectorRuntime};

/// Per-variant candidate pool fetched from each source.
const SOURCE_FETCH_LIMIT: usize = 50;
/// Relations fetched per file before the per-kind cap.
const RELATION_FETCH_LIMIT: usize = 50;
/// Edges kept per relation kind on a hit.
const RELATION_EDGES_PER_KIND: usize = 5;
/// Doc links fetched per lookup.
const DOC_LINK_LIMIT: usize = 10;
/// Search-fallback snippet budget.
const COMPACT_SNIPPET_CHARS: usize = 200;

/// Hybrid query engine over one repository's indexes.
pub struct QueryEngine {
    paths: RepoPaths,
    cfg: AppConfig,
    store: SymbolStore,
    text: TextIndex,
    runtime: Option<VectorRuntime>,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine").finish_non_exhaustive()
    }
}

impl QueryEngine {
    /// Opens the indexes; a repo that was never indexed gets an actionable
    /// error naming the command to run.
    pub fn open(paths: RepoPaths, cfg: AppConfig) -> Result<Self, QueryError> {
        let missing = || {
            QueryError::IndexMissing(format!(
                "no index found for this repository; run `bcindex index --root {} --full` first",
                paths.root.display()
            ))
        };
        let store = SymbolStore::open_existing(&paths.symbol_db()).map_err(|e| match e {
            StoreError::IndexMissing(_) => missing(),
            other => other.into(),
        })?;
        let text = TextIndex::open(&paths.text_dir).map_err(|e| match e {
            TextIndexError::IndexMissing(_) => missing(),
            other => other.into(),
        })?;
        let runtime = open_vector_runtime(&cfg, &paths);
        Ok(Self {
            paths,
            cfg,
            store,
            text,
            runtime,
        })
    }

    pub fn store(&self) -> &SymbolStore {
        &self.store
    }

    /// Runs one query.
    pub async fn run(&self, query: &str, opts: &QueryOptions) -> Result<QueryOutput, QueryError> {
        let mode = match opts.mode {
            QueryMode::Auto => detect_mode(query),
            explicit => explicit,
        };
        let top_k = self.cfg.effective_top_k(opts.top_k);
        info!("query mode={} type={:?} top_k={}", mode.as_str(), opts.qtype, top_k);

        let mut output = QueryOutput {
            query: query.to_string(),
            mode,
            hits: Vec::new(),
            architecture: None,
            quality: None,
        };

        match mode {
            QueryMode::Architecture => {
                output.architecture = Some(self.architecture_stats(top_k)?);
            }
            QueryMode::Quality => {
                output.quality = Some(self.quality_stats()?);
            }
            QueryMode::Search => {
                output.hits = self.search_mode(query, top_k).await?;
            }
            QueryMode::Context | QueryMode::Impact | QueryMode::Auto => {
                // Explicit --type overrides the mode's blending choice.
                let context_blend = opts.qtype.is_none() && mode == QueryMode::Context;
                output.hits = match opts.qtype {
                    Some(qtype @ (QueryType::Symbol | QueryType::Text | QueryType::Vector)) => {
                        self.single_source(query, top_k, qtype).await?
                    }
                    _ => self.hybrid(query, top_k, context_blend, false).await?,
                };
            }
        }
        Ok(output)
    }

    /* ------------------------- mode pipelines ------------------------- */

    fn architecture_stats(&self, top_k: usize) -> Result<ArchitectureStats, QueryError> {
        let pairs = self
            .store
            .list_top_relation_pairs(RelationKind::DependsOn, top_k)?
            .into_iter()
            .map(|p| (p.from_ref, p.to_ref, p.count))
            .collect();
        Ok(ArchitectureStats {
            imports: self.store.count_relations_by_kind(RelationKind::Imports)?,
            depends_on: self.store.count_relations_by_kind(RelationKind::DependsOn)?,
            top_pairs: pairs,
        })
    }

    fn quality_stats(&self) -> Result<QualityStats, QueryError> {
        Ok(QualityStats {
            symbols: self.store.count_symbols()?,
            relations: self.store.count_relations()?,
            doc_links: self.store.count_doc_links()?,
            text_docs: self.store.count_text_docs()?,
        })
    }

    /// Search mode: file-name short-circuit, else compact mixed.
    async fn search_mode(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, QueryError> {
        if let Some(token) = file_like_token(query) {
            let files = self.store.search_files_by_name(&token, top_k)?;
            if !files.is_empty() {
                debug!("search_mode: {} file-name hits for {token}", files.len());
                return Ok(files
                    .into_iter()
                    .map(|path| self.file_hit(path))
                    .collect());
            }
        }

        // Fall through: mixed with compact snippets and no enrichment.
        self.hybrid(query, top_k, false, true).await
    }

    fn file_hit(&self, path: String) -> SearchHit {
        let name = std::path::Path::new(&path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&path)
            .to_string();
        SearchHit {
            kind: "file".into(),
            source: "file".into(),
            name,
            snippet: self.file_label(&path),
            file: path,
            line: 1,
            line_end: 1,
            score: 1.0,
            relations: Vec::new(),
            doc_links: Vec::new(),
        }
    }

    /// Label for a file hit: the `package X` line for Go, the first heading
    /// for markdown.
    fn file_label(&self, rel: &str) -> String {
        let Ok(text) = std::fs::read_to_string(self.paths.root.join(rel)) else {
            return String::new();
        };
        for line in text.lines() {
            let trimmed = line.trim();
            if rel.ends_with(".go") && trimmed.starts_with("package ") {
                return trimmed.to_string();
            }
            if rel.ends_with(".md") && trimmed.starts_with('#') {
                return trimmed.to_string();
            }
        }
        String::new()
    }

    /// One-source retrieval for an explicit `--type symbol|text|vector`.
    async fn single_source(
        &self,
        query: &str,
        top_k: usize,
        qtype: QueryType,
    ) -> Result<Vec<SearchHit>, QueryError> {
        let variants = build_variants(query);
        let candidates: Vec<Candidate> = match qtype {
            QueryType::Symbol => self
                .fetch_symbols(&variants)?
                .into_iter()
                .map(symbol_candidate)
                .collect(),
            QueryType::Text => self
                .fetch_texts(&variants, true)?
                .into_iter()
                .map(text_candidate)
                .collect(),
            _ => self
                .fetch_vectors(query, &[], top_k)
                .await
                .into_iter()
                .map(vector_candidate)
                .collect(),
        };
        self.finalize(candidates, query, top_k)
    }

    /// The shared symbol+text+vector pipeline behind mixed, context and
    /// impact queries.
    async fn hybrid(
        &self,
        query: &str,
        top_k: usize,
        context_mode: bool,
        compact: bool,
    ) -> Result<Vec<SearchHit>, QueryError> {
        let variants = build_variants(query);
        let symbols = self.fetch_symbols(&variants)?;
        let texts = self.fetch_texts(&variants, !context_mode)?;

        // Candidate set for the vector rerank.
        let mut candidate_lines: Vec<(String, u32)> = symbols
            .iter()
            .chain(texts.iter())
            .map(|h| (h.file.clone(), h.line))
            .collect();
        candidate_lines.sort();
        candidate_lines.dedup();
        candidate_lines.truncate(self.cfg.vector_rerank_candidates.max(1));

        let vectors = self.fetch_vectors(query, &candidate_lines, top_k).await;

        let candidates = group_candidates(symbols, texts, vectors);
        let candidates = self.attach_snippets(candidates, query);

        let blended = if context_mode {
            blend::blend_context(
                candidates,
                is_question(query),
                blend::prefer_code(query),
                top_k,
            )
        } else {
            blend::blend_mixed(candidates, top_k)
        };

        self.hits_from_candidates(blended, compact)
    }

    fn fetch_symbols(&self, variants: &[(String, f32)]) -> Result<Vec<RawHit>, QueryError> {
        let mut lists = Vec::new();
        for (variant, weight) in variants {
            let hits: Vec<RawHit> = self
                .store
                .search_symbols(variant, SOURCE_FETCH_LIMIT)?
                .into_iter()
                .map(|s| RawHit {
                    kind: s.kind.as_str().to_string(),
                    score: if s.name == *variant { 1.0 } else { 0.7 },
                    name: s.name,
                    file: s.file,
                    line: s.line,
                    line_end: s.line,
                    doc_id: String::new(),
                    title: s.doc,
                })
                .collect();
            lists.push((*weight, hits));
        }
        Ok(merge_weighted(&lists))
    }

    fn fetch_texts(
        &self,
        variants: &[(String, f32)],
        include_path: bool,
    ) -> Result<Vec<RawHit>, QueryError> {
        let mut lists = Vec::new();
        for (variant, weight) in variants {
            let hits: Vec<RawHit> = self
                .text
                .search(variant, SOURCE_FETCH_LIMIT, include_path)?
                .into_iter()
                .map(|h| RawHit {
                    kind: h.kind,
                    name: h.title.clone(),
                    file: h.path,
                    line: h.line_start as u32,
                    line_end: h.line_end as u32,
                    score: h.score,
                    doc_id: h.doc_id,
                    title: h.title,
                })
                .collect();
            lists.push((*weight, hits));
        }
        let mut merged = merge_weighted(&lists);

        // Normalize BM25-ish scores into [0, 1] for blending.
        let max = merged.iter().map(|h| h.score).fold(0.0f32, f32::max);
        if max > 0.0 {
            for h in &mut merged {
                h.score /= max;
            }
        }
        Ok(merged)
    }

    /// Vector candidates; every failure degrades to an empty list.
    async fn fetch_vectors(
        &self,
        query: &str,
        candidates: &[(String, u32)],
        top_k: usize,
    ) -> Vec<ScoredPoint> {
        let Some(runtime) = &self.runtime else {
            return Vec::new();
        };
        let query_vec = match runtime.embed_query(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!("vector query degraded: {e}");
                return Vec::new();
            }
        };

        let restricted = if self.cfg.vector_rerank_candidates > 0 && !candidates.is_empty() {
            runtime.search_similar_candidates(&query_vec, candidates, top_k)
        } else {
            None
        };
        let result = match restricted {
            Some(res) => res,
            None => runtime.search_similar(&query_vec, top_k).await,
        };
        match result {
            Ok(points) => points,
            Err(e) => {
                warn!("vector search degraded: {e}");
                Vec::new()
            }
        }
    }

    /* ---------------------- hit materialization ---------------------- */

    /// Snippet + hit construction for a pre-ordered single-source list.
    fn finalize(
        &self,
        candidates: Vec<Candidate>,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, QueryError> {
        let mut candidates = self.attach_snippets(candidates, query);
        candidates.truncate(top_k);
        for c in &mut candidates {
            c.score = if c.has_symbol {
                c.symbol_score
            } else if c.has_text {
                c.text_score
            } else {
                c.vector_score
            };
        }
        self.hits_from_candidates(candidates, false)
    }

    fn attach_snippets(&self, mut candidates: Vec<Candidate>, query: &str) -> Vec<Candidate> {
        for c in &mut candidates {
            let range = read_line_range(
                &self.paths.root,
                &c.file,
                c.line as u64,
                c.line_end.max(c.line) as u64,
            );
            c.snippet = match range {
                Some(s) => s,
                None => find_query_window(&self.paths.root, &c.file, query).unwrap_or_default(),
            };
        }
        candidates
    }

    fn hits_from_candidates(
        &self,
        candidates: Vec<Candidate>,
        compact: bool,
    ) -> Result<Vec<SearchHit>, QueryError> {
        let mut hits = Vec::with_capacity(candidates.len());
        for c in candidates {
            let snippet = if compact {
                compact_snippet(&c.snippet)
            } else {
                c.snippet.clone()
            };
            let mut hit = SearchHit {
                kind: c.kind.clone(),
                source: c.source_tag(),
                name: c.name.clone(),
                file: c.file.clone(),
                line: c.line,
                line_end: c.line_end,
                score: c.score,
                snippet,
                relations: Vec::new(),
                doc_links: Vec::new(),
            };
            if !compact {
                self.enrich(&mut hit)?;
            }
            hits.push(hit);
        }
        Ok(hits)
    }

    /// Attaches grouped relations and doc links to one hit.
    fn enrich(&self, hit: &mut SearchHit) -> Result<(), QueryError> {
        let relations = self
            .store
            .list_relations_by_file(&hit.file, RELATION_FETCH_LIMIT)?;
        let mut groups: Vec<RelationGroup> = Vec::new();
        for r in relations {
            let kind = r.kind.as_str().to_string();
            let edge = format!("{} -> {}", r.from_ref, r.to_ref);
            match groups.iter_mut().find(|g| g.kind == kind) {
                Some(g) => {
                    if g.edges.len() < RELATION_EDGES_PER_KIND && !g.edges.contains(&edge) {
                        g.edges.push(edge);
                    }
                }
                None => groups.push(RelationGroup {
                    kind,
                    edges: vec![edge],
                }),
            }
        }
        hit.relations = groups;

        let mut links = self.store.list_doc_links_by_file_range(
            &hit.file,
            hit.line,
            hit.line_end.max(hit.line),
            DOC_LINK_LIMIT,
        )?;
        if hit.source.contains("symbol") && !hit.name.is_empty() {
            links.extend(
                self.store
                    .list_doc_links_by_symbol(&hit.name, DOC_LINK_LIMIT)?,
            );
        }
        let mut seen = std::collections::HashSet::new();
        hit.doc_links = links
            .into_iter()
            .filter(|l| seen.insert((l.symbol.clone(), l.file.clone(), l.line)))
            .map(|l| DocLinkRef {
                symbol: l.symbol,
                file: l.file,
                line: l.line,
            })
            .collect();
        Ok(())
    }
}

/* ------------------------- candidate assembly ------------------------- */

fn symbol_candidate(h: RawHit) -> Candidate {
    Candidate {
        kind: h.kind,
        name: h.name,
        title: h.title,
        file: h.file,
        line: h.line,
        line_end: h.line_end,
        has_symbol: true,
        symbol_score: h.score,
        ..Default::default()
    }
}

fn text_candidate(h: RawHit) -> Candidate {
    Candidate {
        kind: h.kind,
        name: h.title.clone(),
        title: h.title,
        file: h.file,
        line: h.line,
        line_end: h.line_end,
        doc_id: h.doc_id,
        has_text: true,
        text_score: h.score,
        ..Default::default()
    }
}

fn vector_candidate(p: ScoredPoint) -> Candidate {
    Candidate {
        kind: p.payload.kind,
        name: p.payload.name,
        title: p.payload.title,
        file: p.payload.path,
        line: p.payload.line_start,
        line_end: p.payload.line_end,
        has_vector: true,
        vector_score: p.score.max(0.0),
        ..Default::default()
    }
}

/// Groups per-source hits by `(file, line)`. Symbol identity wins the
/// display fields; text supplies titles and doc ids; vector scores ride
/// along.
fn group_candidates(
    symbols: Vec<RawHit>,
    texts: Vec<RawHit>,
    vectors: Vec<ScoredPoint>,
) -> Vec<Candidate> {
    let mut map: HashMap<(String, u32), Candidate> = HashMap::new();

    for h in symbols {
        let key = (h.file.clone(), h.line);
        let c = map.entry(key).or_insert_with(|| symbol_candidate(h.clone()));
        c.has_symbol = true;
        c.symbol_score = c.symbol_score.max(h.score);
        if c.name.is_empty() {
            c.name = h.name;
            c.kind = h.kind;
        }
    }
    for h in texts {
        let key = (h.file.clone(), h.line);
        match map.get_mut(&key) {
            Some(c) => {
                c.has_text = true;
                c.text_score = c.text_score.max(h.score);
                if c.title.is_empty() {
                    c.title = h.title;
                }
                if c.doc_id.is_empty() {
                    c.doc_id = h.doc_id;
                }
                c.line_end = c.line_end.max(h.line_end);
            }
            None => {
                map.insert(key, text_candidate(h));
            }
        }
    }
    for p in vectors {
        let key = (p.payload.path.clone(), p.payload.line_start);
        match map.get_mut(&key) {
            Some(c) => {
                c.has_vector = true;
                c.vector_score = c.vector_score.max(p.score.max(0.0));
            }
            None => {
                map.insert(key, vector_candidate(p));
            }
        }
    }

    let mut out: Vec<Candidate> = map.into_values().collect();
    // Deterministic base order before blending sorts take over.
    out.sort_by(|a, b| a.file.cmp(&b.file).then_with(|| a.line.cmp(&b.line)));
    out
}

/// First line, capped at 200 characters.
fn compact_snippet(s: &str) -> String {
    let first = s.lines().next().unwrap_or_default();
    first.chars().take(COMPACT_SNIPPET_CHARS).collect()
}

/// File-like token, e.g. `pkg/store/main.go`.
fn file_like_token(query: &str) -> Option<String> {
    let re = Regex::new(r"[A-Za-z0-9_./\-]+\.(?:go|md)").expect("static regex");
    re.find(query).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_pipeline::{Indexer, NoopProgress};
    use repo_layout::{IndexConfig, Tier};

    fn write(root: &std::path::Path, rel: &str, content: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, content).unwrap();
    }

    async fn indexed_engine(tmp: &tempfile::TempDir) -> QueryEngine {
        let root = tmp.path().join("repo");
        std::fs::create_dir_all(&root).unwrap();

        write(&root, "a.go", "package p\nfunc Foo(){}\nfunc FooBar(){}\n");
        write(
            &root,
            "pkg/config.go",
            "package pkg\n\n// ParseConfig loads the YAML config.\nfunc ParseConfig() {\n}\n",
        );
        write(
            &root,
            "docs/config.md",
            "# Config\nHow to configure.\nSee `ParseConfig` for loading.\n",
        );
        write(
            &root,
            "README.md",
            "# bcindex\n\nthis project indexes repositories.\n\n## Overview\nThe indexer builds text, symbol and vector indexes.\n",
        );

        let cfg = repo_layout::AppConfig {
            vector_enabled: false,
            index: IndexConfig {
                tier: Tier::Fast,
                ..Default::default()
            },
            ..Default::default()
        };
        let paths = RepoPaths::resolve(&root, tmp.path().join("base")).unwrap();
        Indexer::new(paths.clone(), cfg.clone())
            .full_index(&NoopProgress)
            .await
            .unwrap();
        QueryEngine::open(paths, cfg).unwrap()
    }

    #[tokio::test]
    async fn symbol_exact_match_comes_first() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = indexed_engine(&tmp).await;

        let opts = QueryOptions {
            qtype: Some(QueryType::Symbol),
            top_k: 5,
            ..Default::default()
        };
        let out = engine.run("Foo", &opts).await.unwrap();
        assert!(out.hits.len() >= 2);
        assert_eq!(out.hits[0].name, "Foo");
        assert_eq!(out.hits[0].file, "a.go");
        assert_eq!(out.hits[0].line, 2);
        assert_eq!(out.hits[1].name, "FooBar");
        assert_eq!(out.hits[1].line, 3);
    }

    #[tokio::test]
    async fn mixed_symbol_hit_carries_doc_link() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = indexed_engine(&tmp).await;

        let opts = QueryOptions {
            qtype: Some(QueryType::Mixed),
            ..Default::default()
        };
        let out = engine.run("ParseConfig", &opts).await.unwrap();
        let top = &out.hits[0];
        assert!(top.source.contains("symbol"), "top source: {}", top.source);
        assert_eq!(top.file, "pkg/config.go");
        assert!(
            top.doc_links.iter().any(|l| l.symbol == "ParseConfig" && l.file == "docs/config.md"),
            "doc link missing: {:?}",
            top.doc_links
        );
    }

    #[tokio::test]
    async fn context_question_ranks_readme_first() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = indexed_engine(&tmp).await;

        let out = engine
            .run("What is the indexer?", &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(out.mode, QueryMode::Context);
        assert!(!out.hits.is_empty());
        assert_eq!(out.hits[0].file, "README.md");
    }

    #[tokio::test]
    async fn prefer_code_suppresses_docs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = indexed_engine(&tmp).await;

        let out = engine
            .run("How is ParseConfig implemented?", &QueryOptions::default())
            .await
            .unwrap();
        assert!(!out.hits.is_empty());
        assert!(
            out.hits[0].file.ends_with(".go"),
            "expected code first, got {}",
            out.hits[0].file
        );
        assert!(out.hits.iter().all(|h| !h.file.ends_with(".md")));
    }

    #[tokio::test]
    async fn search_mode_short_circuits_on_file_names() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = indexed_engine(&tmp).await;

        let opts = QueryOptions {
            mode: QueryMode::Search,
            ..Default::default()
        };
        let out = engine.run("where is config.go", &opts).await.unwrap();
        assert_eq!(out.hits.len(), 1);
        assert_eq!(out.hits[0].source, "file");
        assert_eq!(out.hits[0].file, "pkg/config.go");
        assert_eq!(out.hits[0].snippet, "package pkg");
    }

    #[tokio::test]
    async fn architecture_and_quality_stats() {
        let tmp = tempfile::TempDir::new().unwrap();
        let engine = indexed_engine(&tmp).await;

        let arch = engine
            .run("q", &QueryOptions { mode: QueryMode::Architecture, ..Default::default() })
            .await
            .unwrap();
        assert!(arch.architecture.is_some());

        let quality = engine
            .run("q", &QueryOptions { mode: QueryMode::Quality, ..Default::default() })
            .await
            .unwrap();
        let stats = quality.quality.unwrap();
        assert!(stats.symbols >= 3);
        assert!(stats.doc_links >= 1);
        assert!(stats.text_docs >= 4);
    }

    #[tokio::test]
    async fn missing_index_is_actionable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("repo");
        std::fs::create_dir_all(&root).unwrap();
        let paths = RepoPaths::resolve(&root, tmp.path().join("base")).unwrap();
        let err = QueryEngine::open(paths, repo_layout::AppConfig::default()).unwrap_err();
        match err {
            QueryError::IndexMissing(msg) => assert!(msg.contains("bcindex index")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn file_token_regex() {
        assert_eq!(file_like_token("where is pkg/a.go?"), Some("pkg/a.go".into()));
        assert_eq!(file_like_token("README.md please"), Some("README.md".into()));
        assert_eq!(file_like_token("no file here"), None);
    }
}
