//! Schema, lifecycle and the weighted disjunction query.

use crate::errors::TextIndexError;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument, Term, doc};
use tracing::{debug, info};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Field-specific query boosts.
const BOOST_TITLE: f32 = 2.0;
const BOOST_PATH: f32 = 1.5;
const BOOST_CONTENT: f32 = 1.0;

#[derive(Clone, Copy)]
struct Fields {
    content: Field,
    path: Field,
    title: Field,
    kind: Field,
    doc_id: Field,
    line_start: Field,
    line_end: Field,
}

/// Input document for indexing.
#[derive(Debug, Clone)]
pub struct TextDocInput {
    /// `file:<path>`, `go:<path>:<line>` or `md:<path>:<line>`.
    pub doc_id: String,
    pub path: String,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub line_start: u64,
    pub line_end: u64,
}

/// One search hit with stored fields only (content is never stored).
#[derive(Debug, Clone)]
pub struct TextHit {
    pub doc_id: String,
    pub path: String,
    pub kind: String,
    pub title: String,
    pub line_start: u64,
    pub line_end: u64,
    pub score: f32,
}

/// Facade over one on-disk tantivy index.
pub struct TextIndex {
    index: Index,
    reader: IndexReader,
    writer: Option<IndexWriter>,
    fields: Fields,
}

impl std::fmt::Debug for TextIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextIndex").finish_non_exhaustive()
    }
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();
    let text_indexed = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );

    let content = builder.add_text_field("content", text_indexed.clone());
    let path = builder.add_text_field("path", text_indexed.clone() | STORED);
    let title = builder.add_text_field("title", text_indexed | STORED);
    let kind = builder.add_text_field("kind", STRING | STORED);
    let doc_id = builder.add_text_field("doc_id", STRING | STORED);
    let line_start = builder.add_u64_field("line_start", STORED);
    let line_end = builder.add_u64_field("line_end", STORED);

    let schema = builder.build();
    (
        schema,
        Fields {
            content,
            path,
            title,
            kind,
            doc_id,
            line_start,
            line_end,
        },
    )
}

impl TextIndex {
    /// Creates a fresh index in `dir`, wiping whatever was there.
    pub fn create(dir: &Path) -> Result<Self, TextIndexError> {
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;
        let (schema, fields) = build_schema();
        let index = Index::create_in_dir(dir, schema)?;
        let reader = index.reader()?;
        info!("TextIndex::create dir={:?}", dir);
        Ok(Self {
            index,
            reader,
            writer: None,
            fields,
        })
    }

    /// Opens an existing index; a missing directory means the repo was
    /// never indexed.
    pub fn open(dir: &Path) -> Result<Self, TextIndexError> {
        if !dir.join("meta.json").is_file() {
            return Err(TextIndexError::IndexMissing(dir.display().to_string()));
        }
        let (_, fields) = build_schema();
        let index = Index::open_in_dir(dir)?;
        let reader = index.reader()?;
        Ok(Self {
            index,
            reader,
            writer: None,
            fields,
        })
    }

    fn writer(&mut self) -> Result<&mut IndexWriter, TextIndexError> {
        if self.writer.is_none() {
            self.writer = Some(self.index.writer(WRITER_HEAP_BYTES)?);
        }
        Ok(self.writer.as_mut().expect("writer just created"))
    }

    /// Adds one document. Visible after [`TextIndex::commit`].
    pub fn add_doc(&mut self, input: &TextDocInput) -> Result<(), TextIndexError> {
        let fields = self.fields;
        let writer = self.writer()?;
        writer.add_document(doc!(
            fields.content => input.content.clone(),
            fields.path => input.path.clone(),
            fields.title => input.title.clone(),
            fields.kind => input.kind.clone(),
            fields.doc_id => input.doc_id.clone(),
            fields.line_start => input.line_start,
            fields.line_end => input.line_end,
        ))?;
        Ok(())
    }

    /// Deletes documents by their authoritative ids.
    pub fn delete_docs(&mut self, doc_ids: &[String]) -> Result<(), TextIndexError> {
        let fields = self.fields;
        let writer = self.writer()?;
        for id in doc_ids {
            writer.delete_term(Term::from_field_text(fields.doc_id, id));
        }
        Ok(())
    }

    /// Fallback delete when no id registry exists for `path`: looks up the
    /// stored ids of every document under the path and deletes those.
    pub fn delete_by_path(&mut self, path: &str) -> Result<(), TextIndexError> {
        let ids = self.doc_ids_for_path(path)?;
        debug!("TextIndex::delete_by_path path={} ids={}", path, ids.len());
        self.delete_docs(&ids)
    }

    fn doc_ids_for_path(&self, path: &str) -> Result<Vec<String>, TextIndexError> {
        let searcher = self.reader.searcher();
        let tokens = analyze(path);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let query = token_query(self.fields.path, &tokens);
        let top = searcher.search(&query, &TopDocs::with_limit(10_000))?;
        let mut ids = Vec::new();
        for (_score, addr) in top {
            let stored: TantivyDocument = searcher.doc(addr)?;
            let stored_path = get_str(&stored, self.fields.path);
            if stored_path == path {
                ids.push(get_str(&stored, self.fields.doc_id));
            }
        }
        Ok(ids)
    }

    /// Commits pending writes and refreshes the reader.
    pub fn commit(&mut self) -> Result<(), TextIndexError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.commit()?;
        }
        self.reader.reload()?;
        Ok(())
    }

    /// Weighted disjunction over `title`/`path`/`content` for one query
    /// string (`title` ×2.0, `path` ×1.5, `content` ×1.0). `include_path`
    /// drops the path clause (context mode). Variant weighting happens in
    /// the caller's merge.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        include_path: bool,
    ) -> Result<Vec<TextHit>, TextIndexError> {
        let searcher = self.reader.searcher();
        let tokens = analyze(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![
            (
                Occur::Should,
                boost(token_query(self.fields.title, &tokens), BOOST_TITLE),
            ),
            (
                Occur::Should,
                boost(token_query(self.fields.content, &tokens), BOOST_CONTENT),
            ),
        ];
        if include_path {
            clauses.push((
                Occur::Should,
                boost(token_query(self.fields.path, &tokens), BOOST_PATH),
            ));
        }
        let query = BooleanQuery::new(clauses);

        let mut out = Vec::new();
        let top = searcher.search(&query, &TopDocs::with_limit(limit))?;
        for (score, addr) in top {
            let stored: TantivyDocument = searcher.doc(addr)?;
            out.push(TextHit {
                doc_id: get_str(&stored, self.fields.doc_id),
                path: get_str(&stored, self.fields.path),
                kind: get_str(&stored, self.fields.kind),
                title: get_str(&stored, self.fields.title),
                line_start: get_u64(&stored, self.fields.line_start),
                line_end: get_u64(&stored, self.fields.line_end),
                score,
            });
        }
        Ok(out)
    }

    /// Total number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

fn boost(q: BooleanQuery, factor: f32) -> Box<dyn Query> {
    Box::new(BoostQuery::new(Box::new(q), factor))
}

/// Union of per-token term queries on one field.
fn token_query(field: Field, tokens: &[String]) -> BooleanQuery {
    let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
        .iter()
        .map(|t| {
            let term = Term::from_field_text(field, t);
            let q: Box<dyn Query> =
                Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
            (Occur::Should, q)
        })
        .collect();
    BooleanQuery::new(clauses)
}

/// Mirror of the default tokenizer: lowercase alphanumeric runs.
fn analyze(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut cur = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            cur.extend(ch.to_lowercase());
        } else if !cur.is_empty() {
            tokens.push(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        tokens.push(cur);
    }
    tokens
}

fn get_str(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn get_u64(doc: &TantivyDocument, field: Field) -> u64 {
    doc.get_first(field).and_then(|v| v.as_u64()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_input(doc_id: &str, path: &str, title: &str, content: &str) -> TextDocInput {
        TextDocInput {
            doc_id: doc_id.into(),
            path: path.into(),
            kind: "md_section".into(),
            title: title.into(),
            content: content.into(),
            line_start: 1,
            line_end: 5,
        }
    }

    #[test]
    fn add_commit_search_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut idx = TextIndex::create(tmp.path()).unwrap();
        idx.add_doc(&doc_input("md:a.md:1", "a.md", "Overview", "the indexer builds indexes"))
            .unwrap();
        idx.add_doc(&doc_input("md:b.md:1", "b.md", "Other", "nothing relevant here"))
            .unwrap();
        idx.commit().unwrap();

        let hits = idx.search("indexer", 10, true).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, "md:a.md:1");
        assert_eq!(hits[0].line_start, 1);
    }

    #[test]
    fn title_outranks_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut idx = TextIndex::create(tmp.path()).unwrap();
        idx.add_doc(&doc_input("md:t.md:1", "t.md", "config loading", "unrelated body"))
            .unwrap();
        idx.add_doc(&doc_input("md:c.md:1", "c.md", "other title", "config loading in the body"))
            .unwrap();
        idx.commit().unwrap();

        let hits = idx.search("config", 10, true).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id, "md:t.md:1", "title boost should win");
    }

    #[test]
    fn delete_by_id_removes_doc() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut idx = TextIndex::create(tmp.path()).unwrap();
        idx.add_doc(&doc_input("file:a.go", "a.go", "", "alpha beta")).unwrap();
        idx.commit().unwrap();
        assert_eq!(idx.num_docs(), 1);

        idx.delete_docs(&["file:a.go".to_string()]).unwrap();
        idx.commit().unwrap();
        assert_eq!(idx.num_docs(), 0);
    }

    #[test]
    fn delete_by_path_fallback() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut idx = TextIndex::create(tmp.path()).unwrap();
        idx.add_doc(&doc_input("go:pkg/a.go:3", "pkg/a.go", "Foo", "func body"))
            .unwrap();
        idx.add_doc(&doc_input("file:pkg/a.go", "pkg/a.go", "", "whole file"))
            .unwrap();
        idx.add_doc(&doc_input("file:pkg/b.go", "pkg/b.go", "", "other file"))
            .unwrap();
        idx.commit().unwrap();

        idx.delete_by_path("pkg/a.go").unwrap();
        idx.commit().unwrap();
        assert_eq!(idx.num_docs(), 1);
    }

    #[test]
    fn open_missing_dir_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = TextIndex::open(&tmp.path().join("text")).unwrap_err();
        assert!(matches!(err, TextIndexError::IndexMissing(_)));
    }
}
