//! Full rebuild and file-scoped delta indexing.
//!
//! The main loop is sequential over the enumerated files; vector embedding
//! flows through a bounded job channel consumed by a worker pool. All
//! symbol-store writes are serialized through one mutex shared between the
//! main loop and the workers.

use crate::collector::{ErrorCollector, IndexWarning};
use crate::errors::PipelineError;
use crate::pkglist::{self, PackageIndex};
use crate::progress::Progress;
use code_extract::{GoExtractor, chunk_markdown, extract_doc_links};
use repo_layout::{AppConfig, RepoMeta, RepoPaths, Tier};
use sha1::{Digest, Sha1};
use source_scan::{Change, ChangeStatus, SourceFilter, lang_for_path, list_tracked_files};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use symbol_store::{FileEntry, SymbolStore};
use text_index::{TextDocInput, TextIndex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vector_store::{
    EmbedConfig, EmbeddingClient, LocalVectorStore, RemoteVectorDb, VectorBackend, VectorChunk,
    VectorRuntime, chunk_go_functions, chunk_markdown_sections,
};

/// One unit of embedding work: every chunk of one file.
struct VectorJob {
    file: String,
    chunks: Vec<VectorChunk>,
}

/// Builds the embedding runtime for a repository, or `None` when the vector
/// subsystem is disabled or not configured well enough to run. Backend
/// choice: a configured `qdrant_path` selects the embedded Local store
/// (kept under the per-repo directory), otherwise the Remote HTTP database.
pub fn open_vector_runtime(
    cfg: &AppConfig,
    paths: &RepoPaths,
) -> Option<VectorRuntime> {
    if !cfg.vector_ready() {
        debug!("vector runtime disabled (missing config or vector_enabled=false)");
        return None;
    }
    let embedder = match EmbeddingClient::new(EmbedConfig {
        endpoint: cfg.volces_endpoint.clone(),
        api_key: cfg.volces_api_key.clone(),
        model: cfg.volces_model.clone(),
        dimensions: cfg.volces_dimensions,
        encoding: cfg.volces_encoding.clone(),
        timeout: cfg.volces_timeout_duration(),
    }) {
        Ok(c) => c,
        Err(e) => {
            warn!("vector runtime unavailable: {e}");
            return None;
        }
    };

    let backend = if cfg.qdrant_path_expanded().is_some() {
        match LocalVectorStore::open(&paths.vector_db()) {
            Ok(store) => VectorBackend::Local(store),
            Err(e) => {
                warn!("local vector store unavailable: {e}");
                return None;
            }
        }
    } else {
        match RemoteVectorDb::new(cfg.qdrant_url.clone()) {
            Ok(db) => VectorBackend::Remote(db),
            Err(e) => {
                warn!("remote vector db unavailable: {e}");
                return None;
            }
        }
    };

    Some(VectorRuntime::new(
        embedder,
        backend,
        cfg.qdrant_collection.clone(),
        paths.repo_id.clone(),
        cfg.vector_batch_size,
    ))
}

/// Indexing entry point bound to one repository.
pub struct Indexer {
    paths: RepoPaths,
    cfg: AppConfig,
}

impl Indexer {
    pub fn new(paths: RepoPaths, cfg: AppConfig) -> Self {
        Self { paths, cfg }
    }

    pub fn paths(&self) -> &RepoPaths {
        &self.paths
    }

    /// True when both base indexes exist on disk.
    pub fn index_exists(&self) -> bool {
        self.paths.symbol_db().is_file() && self.paths.text_dir.join("meta.json").is_file()
    }

    /// Full rebuild: wipes the text and symbol areas and reindexes every
    /// tracked file. Returns the warning summary when per-file errors
    /// accrued.
    pub async fn full_index(
        &self,
        progress: &dyn Progress,
    ) -> Result<Option<IndexWarning>, PipelineError> {
        info!("full_index repo_id={} root={:?}", self.paths.repo_id, self.paths.root);
        self.paths.ensure_dirs()?;

        for dir in [&self.paths.text_dir, &self.paths.symbol_dir] {
            if dir.exists() {
                std::fs::remove_dir_all(dir)
                    .map_err(|e| PipelineError::Fatal(format!("reset {}: {e}", dir.display())))?;
            }
            std::fs::create_dir_all(dir)
                .map_err(|e| PipelineError::Fatal(format!("create {}: {e}", dir.display())))?;
        }

        let mut text = TextIndex::create(&self.paths.text_dir)?;
        let store = Arc::new(Mutex::new(SymbolStore::open(&self.paths.symbol_db())?));

        let pkg_index = self.package_index();
        {
            let guard = store.lock().expect("store mutex");
            for r in pkg_index.relations() {
                guard.insert_relation(&r)?;
            }
        }

        let filter = SourceFilter::new(&self.paths.root, &self.cfg.index)?;
        let files = list_tracked_files(&self.paths.root, &filter)?;
        progress.set_total(files.len() as u64);

        let collector = Arc::new(ErrorCollector::new());
        let runtime = open_vector_runtime(&self.cfg, &self.paths).map(Arc::new);
        let (tx, handles) = self
            .start_vector_workers(runtime.as_ref(), &store, &collector, true)
            .await;

        let mut extractor =
            GoExtractor::new().map_err(|e| PipelineError::Fatal(e.to_string()))?;

        for rel in &files {
            progress.step(rel);
            if let Err(e) = self
                .index_one_file(rel, &store, &mut text, &mut extractor, &pkg_index, tx.as_ref(), None)
                .await
            {
                collector.record(format!("{rel}: {e}"));
            }
        }

        drop(tx);
        for h in handles {
            let _ = h.await;
        }
        text.commit()?;
        self.save_meta(true)?;
        progress.finish("index complete");
        Ok(collector.snapshot())
    }

    /// File-scoped delta from an explicit change list. Bootstraps a full
    /// rebuild when no base index exists yet.
    pub async fn delta_index(
        &self,
        changes: &[Change],
        progress: &dyn Progress,
    ) -> Result<Option<IndexWarning>, PipelineError> {
        if !self.index_exists() {
            info!("delta_index: no base index, bootstrapping a full rebuild");
            return self.full_index(progress).await;
        }
        if changes.is_empty() {
            debug!("delta_index: empty change set");
            self.save_meta(false)?;
            return Ok(None);
        }
        info!("delta_index: {} changes", changes.len());

        let mut text = TextIndex::open(&self.paths.text_dir)?;
        let store = Arc::new(Mutex::new(SymbolStore::open_existing(&self.paths.symbol_db())?));

        let pkg_index = self.package_index();
        let filter = SourceFilter::new(&self.paths.root, &self.cfg.index)?;
        let collector = Arc::new(ErrorCollector::new());
        let runtime = open_vector_runtime(&self.cfg, &self.paths).map(Arc::new);
        let (tx, handles) = self
            .start_vector_workers(runtime.as_ref(), &store, &collector, false)
            .await;

        let mut extractor =
            GoExtractor::new().map_err(|e| PipelineError::Fatal(e.to_string()))?;

        // Dedup: overlapping watcher snapshots can repeat a path.
        let mut seen = HashSet::new();
        progress.set_total(changes.len() as u64);

        for change in changes {
            progress.step(&change.path);
            if !seen.insert((change.status, change.path.clone())) {
                continue;
            }

            if change.status == ChangeStatus::Renamed {
                if let Some(old) = &change.old_path {
                    if let Err(e) = self
                        .delete_file_entries(old, &store, &mut text, runtime.as_deref())
                        .await
                    {
                        collector.record(format!("{old}: {e}"));
                    }
                }
            }

            if change.status == ChangeStatus::Deleted {
                if let Err(e) = self
                    .delete_file_entries(&change.path, &store, &mut text, runtime.as_deref())
                    .await
                {
                    collector.record(format!("{}: {e}", change.path));
                }
                continue;
            }

            if !filter.should_index(&change.path) {
                continue;
            }
            if let Err(e) = self
                .reindex_one_file(
                    &change.path,
                    &store,
                    &mut text,
                    &mut extractor,
                    &pkg_index,
                    tx.as_ref(),
                    runtime.as_deref(),
                )
                .await
            {
                collector.record(format!("{}: {e}", change.path));
            }
        }

        drop(tx);
        for h in handles {
            let _ = h.await;
        }
        text.commit()?;
        self.save_meta(true)?;
        progress.finish("delta complete");
        Ok(collector.snapshot())
    }

    /// Delta computed from `git diff --name-status <rev>`.
    pub async fn delta_from_revision(
        &self,
        rev: &str,
        progress: &dyn Progress,
    ) -> Result<Option<IndexWarning>, PipelineError> {
        let changes = source_scan::diff_name_status(&self.paths.root, rev)?;
        self.delta_index(&changes, progress).await
    }

    fn package_index(&self) -> PackageIndex {
        match self.cfg.index.tier {
            Tier::Fast => PackageIndex::default(),
            Tier::Balanced | Tier::Full => pkglist::collect_packages(&self.paths.root),
        }
    }

    fn save_meta(&self, index_finished: bool) -> Result<(), PipelineError> {
        let mut meta = RepoMeta::load_or_create(
            &self.paths.meta_file,
            &self.paths.repo_id,
            &self.paths.root.to_string_lossy(),
        )?;
        meta.touch(index_finished);
        meta.save(&self.paths.meta_file)?;
        Ok(())
    }

    /// Spawns the embedding worker pool over a bounded channel of capacity
    /// `2 × workers`. On the full path the repo's points are purged first.
    async fn start_vector_workers(
        &self,
        runtime: Option<&Arc<VectorRuntime>>,
        store: &Arc<Mutex<SymbolStore>>,
        collector: &Arc<ErrorCollector>,
        purge_repo: bool,
    ) -> (Option<mpsc::Sender<VectorJob>>, Vec<tokio::task::JoinHandle<()>>) {
        let Some(runtime) = runtime else {
            return (None, Vec::new());
        };
        if let Err(e) = runtime.prepare().await {
            warn!("vector collection unavailable: {e}");
            collector.record(format!("vector: {e}"));
            return (None, Vec::new());
        }
        if purge_repo {
            if let Err(e) = runtime.purge_repo().await {
                collector.record(format!("vector purge: {e}"));
            }
        }

        let workers = self.cfg.effective_vector_workers();
        let (tx, rx) = mpsc::channel::<VectorJob>(2 * workers);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = Arc::clone(&rx);
            let runtime = Arc::clone(runtime);
            let store = Arc::clone(store);
            let collector = Arc::clone(collector);
            handles.push(tokio::spawn(async move {
                loop {
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else { break };
                    match runtime.embed_and_upsert(&job.chunks).await {
                        Ok(ids) => {
                            let guard = store.lock().expect("store mutex");
                            for id in &ids {
                                if let Err(e) = guard.insert_vector_doc(&job.file, id) {
                                    collector.record(format!("{}: {e}", job.file));
                                    break;
                                }
                            }
                        }
                        Err(e) => collector.record(format!("{}: vector: {e}", job.file)),
                    }
                }
            }));
        }
        debug!("start_vector_workers: {} workers", workers);
        (Some(tx), handles)
    }

    /// Delta path: delete everything under `rel`, then reinsert.
    #[allow(clippy::too_many_arguments)]
    async fn reindex_one_file(
        &self,
        rel: &str,
        store: &Arc<Mutex<SymbolStore>>,
        text: &mut TextIndex,
        extractor: &mut GoExtractor,
        pkg_index: &PackageIndex,
        tx: Option<&mpsc::Sender<VectorJob>>,
        runtime: Option<&VectorRuntime>,
    ) -> Result<(), PipelineError> {
        self.delete_file_entries(rel, store, text, runtime).await?;
        self.index_one_file(rel, store, text, extractor, pkg_index, tx, runtime)
            .await
    }

    /// Inserts everything for one file: symbols → text docs → vector job →
    /// file entry, in that order.
    #[allow(clippy::too_many_arguments)]
    async fn index_one_file(
        &self,
        rel: &str,
        store: &Arc<Mutex<SymbolStore>>,
        text: &mut TextIndex,
        extractor: &mut GoExtractor,
        pkg_index: &PackageIndex,
        tx: Option<&mpsc::Sender<VectorJob>>,
        _runtime: Option<&VectorRuntime>,
    ) -> Result<(), PipelineError> {
        let abs = self.paths.root.join(rel);
        let bytes = std::fs::read(&abs)?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let entry = file_entry(rel, &abs, &bytes)?;

        let Some(lang) = lang_for_path(rel) else {
            return Ok(());
        };

        let vector_chunks = match lang {
            "go" => self.index_go_file(rel, &content, store, text, extractor, pkg_index)?,
            _ => self.index_markdown_file(rel, &content, store, text)?,
        };

        store.lock().expect("store mutex").upsert_file(&entry)?;

        if let (Some(tx), false) = (tx, vector_chunks.is_empty()) {
            let job = VectorJob {
                file: rel.to_string(),
                chunks: vector_chunks,
            };
            if tx.send(job).await.is_err() {
                warn!("vector workers gone, dropping job for {rel}");
            }
        }
        Ok(())
    }

    fn index_go_file(
        &self,
        rel: &str,
        content: &str,
        store: &Arc<Mutex<SymbolStore>>,
        text: &mut TextIndex,
        extractor: &mut GoExtractor,
        pkg_index: &PackageIndex,
    ) -> Result<Vec<VectorChunk>, PipelineError> {
        let dir = parent_dir(rel);
        let pkg_ref = pkg_index.package_ref(&dir);
        let idx = extractor
            .extract(content, rel, &pkg_ref)
            .map_err(|e| PipelineError::Parse(e.to_string()))?;

        let guard = store.lock().expect("store mutex");
        for s in &idx.symbols {
            guard.insert_symbol(s)?;
        }
        for r in &idx.imports {
            guard.insert_relation(r)?;
        }

        let line_count = content.lines().count().max(1) as u64;
        let file_doc = TextDocInput {
            doc_id: format!("file:{rel}"),
            path: rel.to_string(),
            kind: "file".to_string(),
            title: String::new(),
            content: content.to_string(),
            line_start: 1,
            line_end: line_count,
        };
        text.add_doc(&file_doc)?;
        guard.insert_text_doc(rel, &file_doc.doc_id)?;

        for f in &idx.functions {
            let kind = if f.is_method() { "go_method" } else { "go_func" };
            let doc = TextDocInput {
                doc_id: format!("go:{rel}:{}", f.chunk_line),
                path: rel.to_string(),
                kind: kind.to_string(),
                title: f.name.clone(),
                content: f.text.clone(),
                line_start: f.chunk_line as u64,
                line_end: f.end_line as u64,
            };
            text.add_doc(&doc)?;
            guard.insert_text_doc(rel, &doc.doc_id)?;
        }
        drop(guard);

        Ok(chunk_go_functions(
            &idx.functions,
            rel,
            self.cfg.vector_max_chars,
            self.cfg.vector_overlap_chars,
        ))
    }

    fn index_markdown_file(
        &self,
        rel: &str,
        content: &str,
        store: &Arc<Mutex<SymbolStore>>,
        text: &mut TextIndex,
    ) -> Result<Vec<VectorChunk>, PipelineError> {
        let sections = chunk_markdown(content, self.cfg.vector_max_chars);
        let links = extract_doc_links(content, rel);

        let guard = store.lock().expect("store mutex");
        for l in &links {
            guard.insert_doc_link(l)?;
        }
        for s in &sections {
            let doc = TextDocInput {
                doc_id: format!("md:{rel}:{}", s.line_start),
                path: rel.to_string(),
                kind: "md_section".to_string(),
                title: s.title.clone(),
                content: s.content.clone(),
                line_start: s.line_start as u64,
                line_end: s.line_end as u64,
            };
            text.add_doc(&doc)?;
            guard.insert_text_doc(rel, &doc.doc_id)?;
        }
        drop(guard);

        Ok(chunk_markdown_sections(&sections, rel, self.cfg.vector_max_chars))
    }

    /// Removes every trace of `path`: text docs by registered id (falling
    /// back to a path lookup), vector points, then the store rows.
    async fn delete_file_entries(
        &self,
        path: &str,
        store: &Arc<Mutex<SymbolStore>>,
        text: &mut TextIndex,
        runtime: Option<&VectorRuntime>,
    ) -> Result<(), PipelineError> {
        let (text_ids, vector_ids) = {
            let guard = store.lock().expect("store mutex");
            (guard.list_text_doc_ids(path)?, guard.list_vector_doc_ids(path)?)
        };

        if text_ids.is_empty() {
            text.delete_by_path(path)?;
        } else {
            text.delete_docs(&text_ids)?;
        }

        if let Some(rt) = runtime {
            let res = if vector_ids.is_empty() {
                rt.purge_path(path).await
            } else {
                rt.delete_ids(&vector_ids).await
            };
            if let Err(e) = res {
                warn!("vector delete for {path} failed: {e}");
            }
        }

        store.lock().expect("store mutex").delete_file_rows(path)?;
        Ok(())
    }
}

fn parent_dir(rel: &str) -> String {
    match Path::new(rel).parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_string_lossy().replace('\\', "/"),
        _ => ".".to_string(),
    }
}

fn file_entry(rel: &str, abs: &Path, bytes: &[u8]) -> Result<FileEntry, PipelineError> {
    let meta = std::fs::metadata(abs)?;
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let mut h = Sha1::new();
    h.update(bytes);
    let hash: String = h.finalize().iter().map(|b| format!("{b:02x}")).collect();

    Ok(FileEntry {
        path: rel.to_string(),
        hash,
        lang: lang_for_path(rel).unwrap_or("other").to_string(),
        size: bytes.len() as i64,
        mtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopProgress;

    fn write(root: &Path, rel: &str, content: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, content).unwrap();
    }

    fn test_config() -> AppConfig {
        AppConfig {
            vector_enabled: false,
            index: repo_layout::IndexConfig {
                tier: Tier::Fast,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn indexer(tmp: &tempfile::TempDir) -> Indexer {
        let root = tmp.path().join("repo");
        std::fs::create_dir_all(&root).unwrap();
        write(&root, "pkg/a.go", "package pkg\n\nimport \"fmt\"\n\n// Foo greets.\nfunc Foo() {\n\tfmt.Println(\"hi\")\n}\n\nfunc FooBar() {}\n");
        write(&root, "docs/guide.md", "# Guide\nUse `Foo` to greet.\n\n## Detail\nmore\n");
        let base = tmp.path().join("base");
        let paths = RepoPaths::resolve(&root, &base).unwrap();
        Indexer::new(paths, test_config())
    }

    #[tokio::test]
    async fn full_index_populates_all_stores() {
        let tmp = tempfile::TempDir::new().unwrap();
        let idx = indexer(&tmp);

        let warning = idx.full_index(&NoopProgress).await.unwrap();
        assert!(warning.is_none());

        let store = SymbolStore::open_existing(&idx.paths().symbol_db()).unwrap();
        assert_eq!(store.count_files().unwrap(), 2);
        assert!(store.count_symbols().unwrap() >= 2);
        assert_eq!(store.count_doc_links().unwrap(), 1);
        // Whole file + per-function docs for the Go file, two md sections.
        assert!(store.count_text_docs().unwrap() >= 4);

        let text = TextIndex::open(&idx.paths().text_dir).unwrap();
        assert_eq!(text.num_docs(), store.count_text_docs().unwrap() as u64);

        let meta = RepoMeta::load(&idx.paths().meta_file).unwrap();
        assert!(meta.last_index_at.is_some());
    }

    #[tokio::test]
    async fn full_index_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let idx = indexer(&tmp);
        idx.full_index(&NoopProgress).await.unwrap();
        let store = SymbolStore::open_existing(&idx.paths().symbol_db()).unwrap();
        let (symbols, relations, files, docs) = (
            store.count_symbols().unwrap(),
            store.count_relations().unwrap(),
            store.count_files().unwrap(),
            store.count_text_docs().unwrap(),
        );
        drop(store);

        idx.full_index(&NoopProgress).await.unwrap();
        let store = SymbolStore::open_existing(&idx.paths().symbol_db()).unwrap();
        assert_eq!(store.count_symbols().unwrap(), symbols);
        assert_eq!(store.count_relations().unwrap(), relations);
        assert_eq!(store.count_files().unwrap(), files);
        assert_eq!(store.count_text_docs().unwrap(), docs);
    }

    #[tokio::test]
    async fn delta_delete_removes_every_trace() {
        let tmp = tempfile::TempDir::new().unwrap();
        let idx = indexer(&tmp);
        idx.full_index(&NoopProgress).await.unwrap();

        let changes = vec![Change {
            status: ChangeStatus::Deleted,
            path: "pkg/a.go".into(),
            old_path: None,
        }];
        idx.delta_index(&changes, &NoopProgress).await.unwrap();

        let store = SymbolStore::open_existing(&idx.paths().symbol_db()).unwrap();
        assert_eq!(store.count_files().unwrap(), 1);
        assert!(store.search_symbols("Foo", 5).unwrap().is_empty());
        assert!(store.list_text_doc_ids("pkg/a.go").unwrap().is_empty());
        assert!(store.get_file("pkg/a.go").unwrap().is_none());
    }

    #[tokio::test]
    async fn delta_modify_replaces_rows() {
        let tmp = tempfile::TempDir::new().unwrap();
        let idx = indexer(&tmp);
        idx.full_index(&NoopProgress).await.unwrap();

        write(
            &idx.paths().root,
            "pkg/a.go",
            "package pkg\n\nfunc Renamed() {}\n",
        );
        let changes = vec![Change {
            status: ChangeStatus::Modified,
            path: "pkg/a.go".into(),
            old_path: None,
        }];
        idx.delta_index(&changes, &NoopProgress).await.unwrap();

        let store = SymbolStore::open_existing(&idx.paths().symbol_db()).unwrap();
        assert!(store.search_symbols("Foo", 5).unwrap().is_empty());
        assert_eq!(store.search_symbols("Renamed", 5).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delta_rename_moves_rows() {
        let tmp = tempfile::TempDir::new().unwrap();
        let idx = indexer(&tmp);
        idx.full_index(&NoopProgress).await.unwrap();

        write(&idx.paths().root, "pkg/b.go", "package pkg\n\nfunc Foo() {}\n");
        std::fs::remove_file(idx.paths().root.join("pkg/a.go")).unwrap();
        let changes = vec![Change {
            status: ChangeStatus::Renamed,
            path: "pkg/b.go".into(),
            old_path: Some("pkg/a.go".into()),
        }];
        idx.delta_index(&changes, &NoopProgress).await.unwrap();

        let store = SymbolStore::open_existing(&idx.paths().symbol_db()).unwrap();
        assert!(store.get_file("pkg/a.go").unwrap().is_none());
        let hits = store.search_symbols("Foo", 5).unwrap();
        assert!(hits.iter().all(|s| s.file == "pkg/b.go"));
    }

    #[tokio::test]
    async fn empty_delta_keeps_row_counts() {
        let tmp = tempfile::TempDir::new().unwrap();
        let idx = indexer(&tmp);
        idx.full_index(&NoopProgress).await.unwrap();
        let store = SymbolStore::open_existing(&idx.paths().symbol_db()).unwrap();
        let before = store.count_symbols().unwrap();
        drop(store);

        let warning = idx.delta_index(&[], &NoopProgress).await.unwrap();
        assert!(warning.is_none());
        let store = SymbolStore::open_existing(&idx.paths().symbol_db()).unwrap();
        assert_eq!(store.count_symbols().unwrap(), before);
    }

    #[tokio::test]
    async fn delta_without_base_bootstraps_full() {
        let tmp = tempfile::TempDir::new().unwrap();
        let idx = indexer(&tmp);
        assert!(!idx.index_exists());

        idx.delta_index(
            &[Change {
                status: ChangeStatus::Added,
                path: "pkg/a.go".into(),
                old_path: None,
            }],
            &NoopProgress,
        )
        .await
        .unwrap();

        assert!(idx.index_exists());
        let store = SymbolStore::open_existing(&idx.paths().symbol_db()).unwrap();
        assert_eq!(store.count_files().unwrap(), 2);
    }

    #[tokio::test]
    async fn unparsable_file_is_a_warning_not_an_abort() {
        let tmp = tempfile::TempDir::new().unwrap();
        let idx = indexer(&tmp);
        // Binary junk with a .go extension still gets an attempt.
        write(&idx.paths().root, "pkg/broken.go", "\u{0}\u{1}\u{2} not go at all");

        let _warning = idx.full_index(&NoopProgress).await.unwrap();
        // The healthy files must be indexed either way.
        let store = SymbolStore::open_existing(&idx.paths().symbol_db()).unwrap();
        assert!(store.search_symbols("Foo", 5).unwrap().len() >= 1);
    }
}
