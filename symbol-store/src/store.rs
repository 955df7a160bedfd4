//! The store itself: schema, inserts, cascade deletes and queries.

use crate::errors::StoreError;
use code_extract::{DocLink, Relation, RelationKind, RelationSource, Symbol, SymbolKind};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS symbols (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    file TEXT NOT NULL,
    line INTEGER NOT NULL,
    pkg TEXT NOT NULL DEFAULT '',
    recv TEXT NOT NULL DEFAULT '',
    doc TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file);

CREATE TABLE IF NOT EXISTS relations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_ref TEXT NOT NULL,
    to_ref TEXT NOT NULL,
    kind TEXT NOT NULL,
    file TEXT NOT NULL,
    line INTEGER NOT NULL,
    confidence REAL NOT NULL,
    source TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_relations_file ON relations(file);
CREATE INDEX IF NOT EXISTS idx_relations_kind ON relations(kind);

CREATE TABLE IF NOT EXISTS doc_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    file TEXT NOT NULL,
    line INTEGER NOT NULL,
    confidence REAL NOT NULL,
    source TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_doc_links_file ON doc_links(file);

CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    hash TEXT NOT NULL,
    lang TEXT NOT NULL,
    size INTEGER NOT NULL,
    mtime INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS text_docs (
    file TEXT NOT NULL,
    doc_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_text_docs_file ON text_docs(file);

CREATE TABLE IF NOT EXISTS vector_docs (
    file TEXT NOT NULL,
    vector_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vector_docs_file ON vector_docs(file);
"#;

const TABLES: &[&str] = &["symbols", "relations", "doc_links", "files", "text_docs", "vector_docs"];

/// One row of the `files` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub hash: String,
    pub lang: String,
    pub size: i64,
    pub mtime: i64,
}

/// Aggregated relation edge for architecture stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationPair {
    pub from_ref: String,
    pub to_ref: String,
    pub count: i64,
}

/// Single-connection embedded store.
#[derive(Debug)]
pub struct SymbolStore {
    conn: Connection,
}

impl SymbolStore {
    /// Opens (creating if needed) and ensures the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        debug!("SymbolStore::open path={:?}", path);
        Ok(Self { conn })
    }

    /// Opens an existing store; a missing database file is an error the
    /// caller surfaces as "run the full index first".
    pub fn open_existing(path: &Path) -> Result<Self, StoreError> {
        if !path.is_file() {
            return Err(StoreError::IndexMissing(path.display().to_string()));
        }
        Self::open(path)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Drops and recreates every table. Used by the full rebuild.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        info!("SymbolStore::reset");
        for t in TABLES {
            self.conn.execute_batch(&format!("DROP TABLE IF EXISTS {t};"))?;
        }
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /* ---------------------------- inserts ---------------------------- */

    pub fn insert_symbol(&self, s: &Symbol) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO symbols (name, kind, file, line, pkg, recv, doc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![s.name, s.kind.as_str(), s.file, s.line, s.pkg, s.recv, s.doc],
        )?;
        Ok(())
    }

    pub fn insert_relation(&self, r: &Relation) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO relations (from_ref, to_ref, kind, file, line, confidence, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                r.from_ref,
                r.to_ref,
                r.kind.as_str(),
                r.file,
                r.line,
                r.confidence as f64,
                r.source.as_str()
            ],
        )?;
        Ok(())
    }

    pub fn insert_doc_link(&self, d: &DocLink) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO doc_links (symbol, file, line, confidence, source)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![d.symbol, d.file, d.line, d.confidence as f64, DocLink::SOURCE],
        )?;
        Ok(())
    }

    /// Upsert keyed on `path`.
    pub fn upsert_file(&self, f: &FileEntry) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO files (path, hash, lang, size, mtime)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(path) DO UPDATE SET
                 hash = excluded.hash,
                 lang = excluded.lang,
                 size = excluded.size,
                 mtime = excluded.mtime",
            params![f.path, f.hash, f.lang, f.size, f.mtime],
        )?;
        Ok(())
    }

    /// Registers a text-index document id for `file` (the delete key used
    /// on reindex).
    pub fn insert_text_doc(&self, file: &str, doc_id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO text_docs (file, doc_id) VALUES (?1, ?2)",
            params![file, doc_id],
        )?;
        Ok(())
    }

    /// Registers a vector point id for `file`.
    pub fn insert_vector_doc(&self, file: &str, vector_id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO vector_docs (file, vector_id) VALUES (?1, ?2)",
            params![file, vector_id],
        )?;
        Ok(())
    }

    /* ------------------------ per-file deletes ------------------------ */

    /// Removes every row keyed on `path` across all tables.
    pub fn delete_file_rows(&self, path: &str) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM symbols WHERE file = ?1", params![path])?;
        self.conn.execute("DELETE FROM relations WHERE file = ?1", params![path])?;
        self.conn.execute("DELETE FROM doc_links WHERE file = ?1", params![path])?;
        self.conn.execute("DELETE FROM text_docs WHERE file = ?1", params![path])?;
        self.conn.execute("DELETE FROM vector_docs WHERE file = ?1", params![path])?;
        self.conn.execute("DELETE FROM files WHERE path = ?1", params![path])?;
        Ok(())
    }

    /// Authoritative list of text-index document ids for `path`.
    pub fn list_text_doc_ids(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT doc_id FROM text_docs WHERE file = ?1")?;
        let rows = stmt.query_map(params![path], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Vector point ids registered for `path`.
    pub fn list_vector_doc_ids(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT vector_id FROM vector_docs WHERE file = ?1")?;
        let rows = stmt.query_map(params![path], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /* ---------------------------- queries ----------------------------- */

    /// Prefix-preferred symbol lookup: `name LIKE '<q>%'`, exact match
    /// first, then shorter names, then lexical.
    pub fn search_symbols(&self, q: &str, limit: usize) -> Result<Vec<Symbol>, StoreError> {
        let pattern = format!("{}%", escape_like(q));
        let mut stmt = self.conn.prepare(
            "SELECT name, kind, file, line, pkg, recv, doc
             FROM symbols
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY CASE WHEN name = ?2 THEN 0 ELSE 1 END, length(name), name
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![pattern, q, limit as i64], row_to_symbol)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Exact-or-suffix file search: token with a slash matches `%<token>`,
    /// else `%/<token>`; plus the exact path.
    pub fn search_files_by_name(&self, token: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let suffix = if token.contains('/') {
            format!("%{}", escape_like(token))
        } else {
            format!("%/{}", escape_like(token))
        };
        let mut stmt = self.conn.prepare(
            "SELECT path FROM files
             WHERE path = ?1 OR path LIKE ?2 ESCAPE '\\'
             ORDER BY path
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![token, suffix, limit as i64], |row| {
            row.get::<_, String>(0)
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Relations declared in `file`, ordered by `(kind, line)`.
    pub fn list_relations_by_file(&self, file: &str, limit: usize) -> Result<Vec<Relation>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT from_ref, to_ref, kind, file, line, confidence, source
             FROM relations
             WHERE file = ?1
             ORDER BY kind, line
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![file, limit as i64], row_to_relation)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Doc links in `file` with line in `[start, end]` inclusive.
    pub fn list_doc_links_by_file_range(
        &self,
        file: &str,
        start: u32,
        end: u32,
        limit: usize,
    ) -> Result<Vec<DocLink>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, file, line, confidence
             FROM doc_links
             WHERE file = ?1 AND line BETWEEN ?2 AND ?3
             ORDER BY line
             LIMIT ?4",
        )?;
        let rows = stmt.query_map(params![file, start, end, limit as i64], |row| {
            Ok(DocLink {
                symbol: row.get(0)?,
                file: row.get(1)?,
                line: row.get(2)?,
                confidence: row.get::<_, f64>(3)? as f32,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Doc links naming `symbol` anywhere in the corpus.
    pub fn list_doc_links_by_symbol(&self, symbol: &str, limit: usize) -> Result<Vec<DocLink>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, file, line, confidence
             FROM doc_links
             WHERE symbol = ?1
             ORDER BY file, line
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![symbol, limit as i64], |row| {
            Ok(DocLink {
                symbol: row.get(0)?,
                file: row.get(1)?,
                line: row.get(2)?,
                confidence: row.get::<_, f64>(3)? as f32,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The stored entry for `path`, if indexed.
    pub fn get_file(&self, path: &str) -> Result<Option<FileEntry>, StoreError> {
        let entry = self
            .conn
            .query_row(
                "SELECT path, hash, lang, size, mtime FROM files WHERE path = ?1",
                params![path],
                |row| {
                    Ok(FileEntry {
                        path: row.get(0)?,
                        hash: row.get(1)?,
                        lang: row.get(2)?,
                        size: row.get(3)?,
                        mtime: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /* ---------------------------- counters ---------------------------- */

    pub fn count_symbols(&self) -> Result<i64, StoreError> {
        self.count("symbols")
    }

    pub fn count_relations(&self) -> Result<i64, StoreError> {
        self.count("relations")
    }

    pub fn count_relations_by_kind(&self, kind: RelationKind) -> Result<i64, StoreError> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM relations WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn count_doc_links(&self) -> Result<i64, StoreError> {
        self.count("doc_links")
    }

    pub fn count_files(&self) -> Result<i64, StoreError> {
        self.count("files")
    }

    pub fn count_text_docs(&self) -> Result<i64, StoreError> {
        self.count("text_docs")
    }

    fn count(&self, table: &str) -> Result<i64, StoreError> {
        let n = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(n)
    }

    /// Most frequent `(from_ref, to_ref)` pairs of one relation kind.
    pub fn list_top_relation_pairs(
        &self,
        kind: RelationKind,
        limit: usize,
    ) -> Result<Vec<RelationPair>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT from_ref, to_ref, COUNT(*) AS n
             FROM relations
             WHERE kind = ?1
             GROUP BY from_ref, to_ref
             ORDER BY n DESC, from_ref, to_ref
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![kind.as_str(), limit as i64], |row| {
            Ok(RelationPair {
                from_ref: row.get(0)?,
                to_ref: row.get(1)?,
                count: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn row_to_symbol(row: &rusqlite::Row<'_>) -> rusqlite::Result<Symbol> {
    Ok(Symbol {
        name: row.get(0)?,
        kind: SymbolKind::from_str_lossy(&row.get::<_, String>(1)?),
        file: row.get(2)?,
        line: row.get(3)?,
        pkg: row.get(4)?,
        recv: row.get(5)?,
        doc: row.get(6)?,
    })
}

fn row_to_relation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Relation> {
    let kind = match row.get::<_, String>(2)?.as_str() {
        "depends_on" => RelationKind::DependsOn,
        _ => RelationKind::Imports,
    };
    let source = match row.get::<_, String>(6)?.as_str() {
        "pkg_list" => RelationSource::PkgList,
        _ => RelationSource::Ast,
    };
    Ok(Relation {
        from_ref: row.get(0)?,
        to_ref: row.get(1)?,
        kind,
        file: row.get(3)?,
        line: row.get(4)?,
        source,
        confidence: row.get::<_, f64>(5)? as f32,
    })
}

/// Escapes `%`/`_`/`\` for LIKE patterns.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str, file: &str, line: u32) -> Symbol {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Func,
            file: file.into(),
            line,
            pkg: "p".into(),
            recv: String::new(),
            doc: String::new(),
        }
    }

    fn rel(from: &str, to: &str, kind: RelationKind, file: &str, line: u32) -> Relation {
        Relation {
            from_ref: from.into(),
            to_ref: to.into(),
            kind,
            file: file.into(),
            line,
            source: RelationSource::Ast,
            confidence: 1.0,
        }
    }

    #[test]
    fn symbol_search_prefers_exact_then_shorter() {
        let store = SymbolStore::open_in_memory().unwrap();
        store.insert_symbol(&sym("FooBarBaz", "a.go", 4)).unwrap();
        store.insert_symbol(&sym("FooBar", "a.go", 3)).unwrap();
        store.insert_symbol(&sym("Foo", "a.go", 2)).unwrap();
        store.insert_symbol(&sym("Unrelated", "b.go", 1)).unwrap();

        let hits = store.search_symbols("Foo", 5).unwrap();
        let names: Vec<&str> = hits.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Foo", "FooBar", "FooBarBaz"]);
    }

    #[test]
    fn symbol_search_applies_limit() {
        let store = SymbolStore::open_in_memory().unwrap();
        for i in 0..10 {
            store.insert_symbol(&sym(&format!("Name{i}"), "a.go", i + 1)).unwrap();
        }
        assert_eq!(store.search_symbols("Name", 3).unwrap().len(), 3);
    }

    #[test]
    fn file_search_matches_suffix() {
        let store = SymbolStore::open_in_memory().unwrap();
        for p in ["cmd/main.go", "pkg/store/main.go", "pkg/store/other.go"] {
            store
                .upsert_file(&FileEntry {
                    path: p.into(),
                    hash: "h".into(),
                    lang: "go".into(),
                    size: 1,
                    mtime: 0,
                })
                .unwrap();
        }
        let hits = store.search_files_by_name("main.go", 10).unwrap();
        assert_eq!(hits, vec!["cmd/main.go", "pkg/store/main.go"]);

        let hits = store.search_files_by_name("store/main.go", 10).unwrap();
        assert_eq!(hits, vec!["pkg/store/main.go"]);
    }

    #[test]
    fn file_upsert_is_keyed_on_path() {
        let store = SymbolStore::open_in_memory().unwrap();
        let mut entry = FileEntry {
            path: "a.go".into(),
            hash: "h1".into(),
            lang: "go".into(),
            size: 1,
            mtime: 1,
        };
        store.upsert_file(&entry).unwrap();
        entry.hash = "h2".into();
        store.upsert_file(&entry).unwrap();
        assert_eq!(store.count_files().unwrap(), 1);
        assert_eq!(store.get_file("a.go").unwrap().unwrap().hash, "h2");
    }

    #[test]
    fn cascade_delete_clears_every_table() {
        let store = SymbolStore::open_in_memory().unwrap();
        store.insert_symbol(&sym("Foo", "a.go", 2)).unwrap();
        store
            .insert_relation(&rel("p", "fmt", RelationKind::Imports, "a.go", 3))
            .unwrap();
        store
            .insert_doc_link(&DocLink {
                symbol: "Foo".into(),
                file: "a.go".into(),
                line: 1,
                confidence: 0.6,
            })
            .unwrap();
        store.insert_text_doc("a.go", "file:a.go").unwrap();
        store.insert_vector_doc("a.go", "vec:a.go:abc").unwrap();
        store
            .upsert_file(&FileEntry {
                path: "a.go".into(),
                hash: "h".into(),
                lang: "go".into(),
                size: 1,
                mtime: 0,
            })
            .unwrap();

        store.delete_file_rows("a.go").unwrap();
        assert_eq!(store.count_symbols().unwrap(), 0);
        assert_eq!(store.count_relations().unwrap(), 0);
        assert_eq!(store.count_doc_links().unwrap(), 0);
        assert_eq!(store.count_files().unwrap(), 0);
        assert!(store.list_text_doc_ids("a.go").unwrap().is_empty());
        assert!(store.list_vector_doc_ids("a.go").unwrap().is_empty());
    }

    #[test]
    fn relations_group_and_order() {
        let store = SymbolStore::open_in_memory().unwrap();
        store.insert_relation(&rel("a", "b", RelationKind::DependsOn, "x.go", 1)).unwrap();
        store.insert_relation(&rel("a", "b", RelationKind::DependsOn, "y.go", 1)).unwrap();
        store.insert_relation(&rel("a", "c", RelationKind::DependsOn, "x.go", 2)).unwrap();

        let pairs = store.list_top_relation_pairs(RelationKind::DependsOn, 10).unwrap();
        assert_eq!(pairs[0], RelationPair { from_ref: "a".into(), to_ref: "b".into(), count: 2 });
        assert_eq!(pairs[1].to_ref, "c");
    }

    #[test]
    fn doc_links_by_range_are_inclusive() {
        let store = SymbolStore::open_in_memory().unwrap();
        for line in [1u32, 5, 10] {
            store
                .insert_doc_link(&DocLink {
                    symbol: format!("S{line}"),
                    file: "d.md".into(),
                    line,
                    confidence: 0.6,
                })
                .unwrap();
        }
        let links = store.list_doc_links_by_file_range("d.md", 5, 10, 10).unwrap();
        let syms: Vec<&str> = links.iter().map(|l| l.symbol.as_str()).collect();
        assert_eq!(syms, vec!["S5", "S10"]);
    }

    #[test]
    fn open_existing_requires_a_database() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = SymbolStore::open_existing(&tmp.path().join("symbols.db")).unwrap_err();
        assert!(matches!(err, StoreError::IndexMissing(_)));
    }
}
