//! Command definitions and handlers.

use crate::progress::IndicatifProgress;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use index_pipeline::{Indexer, NoopProgress, Progress, Watcher};
use query_engine::{QueryEngine, QueryMode, QueryOptions, QueryType, render_report};
use repo_layout::{AppConfig, RepoMeta, RepoPaths, parse_duration, resolve_base_dir};
use std::path::{Path, PathBuf};
use std::time::Duration;
use symbol_store::SymbolStore;
use tracing::debug;

#[derive(Parser)]
#[command(name = "bcindex", version, about = "Per-repository code intelligence index")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the per-repo layout and meta record.
    Init {
        #[arg(long)]
        root: PathBuf,
    },
    /// Build or update the indexes.
    Index {
        #[arg(long)]
        root: PathBuf,
        /// Full rebuild.
        #[arg(long, conflicts_with = "diff")]
        full: bool,
        /// Delta from a VCS revision (`git diff --name-status <rev>`).
        #[arg(long)]
        diff: Option<String>,
        #[arg(long)]
        progress: bool,
    },
    /// Poll the work tree and reindex changes after a debounce window.
    Watch {
        #[arg(long)]
        root: PathBuf,
        #[arg(long, default_value = "3s")]
        interval: String,
        #[arg(long, default_value = "2s")]
        debounce: String,
        #[arg(long)]
        progress: bool,
    },
    /// Query the indexes.
    Query {
        /// Repository id or path (alternative to --root).
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        root: Option<PathBuf>,
        /// Query text.
        #[arg(long)]
        q: String,
        /// Retrieval sources: text | symbol | mixed | vector.
        #[arg(long = "type", value_enum)]
        qtype: Option<TypeArg>,
        /// Intent mode override (default: auto detection).
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        #[arg(long, default_value_t = 0)]
        top: i64,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        progress: bool,
    },
    /// Show repository index status.
    Status {
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print the project version from PROJECT_META.md.
    Version {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default YAML config if absent.
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TypeArg {
    Text,
    Symbol,
    Mixed,
    Vector,
}

impl From<TypeArg> for QueryType {
    fn from(t: TypeArg) -> Self {
        match t {
            TypeArg::Text => QueryType::Text,
            TypeArg::Symbol => QueryType::Symbol,
            TypeArg::Mixed => QueryType::Mixed,
            TypeArg::Vector => QueryType::Vector,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Search,
    Context,
    Impact,
    Architecture,
    Quality,
}

impl From<ModeArg> for QueryMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Auto => QueryMode::Auto,
            ModeArg::Search => QueryMode::Search,
            ModeArg::Context => QueryMode::Context,
            ModeArg::Impact => QueryMode::Impact,
            ModeArg::Architecture => QueryMode::Architecture,
            ModeArg::Quality => QueryMode::Quality,
        }
    }
}

/// Parses the command line and runs it. Returns the process exit code:
/// 0 on success (including runs that only produced warnings), 1 otherwise.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let base_dir = match resolve_base_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{} {e}", "error:".red());
            return 1;
        }
    };
    crate::telemetry::init(&base_dir);

    let cfg = match AppConfig::load(&base_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {e}", "error:".red());
            return 1;
        }
    };

    let result = dispatch(cli.command, &base_dir, cfg).await;
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red());
            1
        }
    }
}

async fn dispatch(command: Command, base_dir: &Path, cfg: AppConfig) -> anyhow::Result<()> {
    match command {
        Command::Init { root } => cmd_init(&root, base_dir),
        Command::Index {
            root,
            full,
            diff,
            progress,
        } => cmd_index(&root, base_dir, cfg, full, diff, progress).await,
        Command::Watch {
            root,
            interval,
            debounce,
            progress,
        } => cmd_watch(&root, base_dir, cfg, &interval, &debounce, progress).await,
        Command::Query {
            repo,
            root,
            q,
            qtype,
            mode,
            top,
            json,
            progress,
        } => {
            cmd_query(
                repo.as_deref(),
                root.as_deref(),
                base_dir,
                cfg,
                &q,
                qtype,
                mode,
                top,
                json,
                progress,
            )
            .await
        }
        Command::Status { repo, root } => cmd_status(repo.as_deref(), root.as_deref(), base_dir),
        Command::Version { root } => cmd_version(root.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init { force } => cmd_config_init(base_dir, force),
        },
    }
}

/* ------------------------------ handlers ------------------------------ */

fn cmd_init(root: &Path, base_dir: &Path) -> anyhow::Result<()> {
    let paths = RepoPaths::resolve(root, base_dir)?;
    paths.ensure_dirs()?;
    let meta = RepoMeta::load_or_create(
        &paths.meta_file,
        &paths.repo_id,
        &paths.root.to_string_lossy(),
    )?;
    meta.save(&paths.meta_file)?;

    println!("repo_id: {}", paths.repo_id);
    println!("root: {}", paths.root.display());
    println!("meta: {}", paths.meta_file.display());
    Ok(())
}

async fn cmd_index(
    root: &Path,
    base_dir: &Path,
    cfg: AppConfig,
    full: bool,
    diff: Option<String>,
    progress: bool,
) -> anyhow::Result<()> {
    let paths = RepoPaths::resolve(root, base_dir)?;
    paths.ensure_dirs()?;
    let indexer = Indexer::new(paths, cfg);
    let reporter = make_progress(progress);

    let warning = if full {
        indexer.full_index(reporter.as_ref()).await?
    } else if let Some(rev) = diff {
        indexer.delta_from_revision(&rev, reporter.as_ref()).await?
    } else if !indexer.index_exists() {
        indexer.full_index(reporter.as_ref()).await?
    } else {
        // No flags: delta from the current working-tree status; outside a
        // git checkout there is no status, so rebuild.
        match source_scan::status_porcelain(&indexer.paths().root) {
            Ok((_, changes)) => indexer.delta_index(&changes, reporter.as_ref()).await?,
            Err(_) => indexer.full_index(reporter.as_ref()).await?,
        }
    };

    if let Some(warning) = warning {
        eprintln!("{} {warning}", "warning:".yellow());
    } else {
        println!("{}", "index ok".green());
    }
    Ok(())
}

async fn cmd_watch(
    root: &Path,
    base_dir: &Path,
    cfg: AppConfig,
    interval: &str,
    debounce: &str,
    progress: bool,
) -> anyhow::Result<()> {
    let interval = parse_duration(interval)
        .ok_or_else(|| anyhow::anyhow!("invalid --interval {interval:?}"))?;
    let debounce = parse_duration(debounce)
        .ok_or_else(|| anyhow::anyhow!("invalid --debounce {debounce:?}"))?;

    let paths = RepoPaths::resolve(root, base_dir)?;
    paths.ensure_dirs()?;
    let watcher = Watcher::new(
        Indexer::new(paths, cfg),
        interval.max(Duration::from_millis(200)),
        debounce,
    );
    let reporter = make_progress(progress);
    watcher.run(reporter.as_ref()).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_query(
    repo: Option<&str>,
    root: Option<&Path>,
    base_dir: &Path,
    cfg: AppConfig,
    q: &str,
    qtype: Option<TypeArg>,
    mode: Option<ModeArg>,
    top: i64,
    json: bool,
    progress: bool,
) -> anyhow::Result<()> {
    let paths = resolve_repo(repo, root, base_dir)?;
    let max_context_chars = cfg.effective_max_context_chars();
    let engine = QueryEngine::open(paths, cfg)?;

    let reporter = make_progress(progress);
    reporter.message("querying");

    let opts = QueryOptions {
        mode: mode.map(Into::into).unwrap_or(QueryMode::Auto),
        qtype: qtype.map(Into::into),
        top_k: top,
    };
    let output = engine.run(q, &opts).await?;
    reporter.finish("done");

    if json {
        println!("{}", serde_json::to_string_pretty(&output.hits)?);
    } else {
        print!("{}", render_report(&output, max_context_chars));
    }
    Ok(())
}

fn cmd_status(repo: Option<&str>, root: Option<&Path>, base_dir: &Path) -> anyhow::Result<()> {
    let paths = resolve_repo(repo, root, base_dir)?;
    let meta = RepoMeta::load(&paths.meta_file).map_err(|_| {
        anyhow::anyhow!(
            "no index found for this repository; run `bcindex index --root {} --full` first",
            paths.root.display()
        )
    })?;

    let store = SymbolStore::open_existing(&paths.symbol_db()).map_err(|_| {
        anyhow::anyhow!(
            "no index found for this repository; run `bcindex index --root {} --full` first",
            paths.root.display()
        )
    })?;

    let last_index = meta
        .last_index_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    println!("repo_id: {}", paths.repo_id);
    println!("root: {}", meta.root);
    println!("last_index_at: {last_index}");
    println!("symbols: {}", store.count_symbols()?);
    println!("text_docs: {}", store.count_text_docs()?);
    println!("index_dir: {}", paths.repo_dir.display());
    Ok(())
}

fn cmd_version(root: Option<&Path>) -> anyhow::Result<()> {
    let root = root
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let meta_path = root.join("PROJECT_META.md");
    let text = std::fs::read_to_string(&meta_path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", meta_path.display()))?;

    let re = regex::Regex::new(r"(?:版本号：|version:)\s*([^\s]+)").expect("static regex");
    match re.captures(&text) {
        Some(caps) => {
            println!("{}", &caps[1]);
            Ok(())
        }
        None => anyhow::bail!("no version marker in {}", meta_path.display()),
    }
}

fn cmd_config_init(base_dir: &Path, force: bool) -> anyhow::Result<()> {
    match AppConfig::write_default(base_dir, force)? {
        Some(path) => println!("wrote {}", path.display()),
        None => println!(
            "config exists at {}, use --force to overwrite",
            AppConfig::config_file(base_dir).display()
        ),
    }
    Ok(())
}

/* ------------------------------ helpers ------------------------------- */

fn make_progress(enabled: bool) -> Box<dyn Progress> {
    if enabled {
        Box::new(IndicatifProgress::spinner())
    } else {
        Box::new(NoopProgress)
    }
}

/// Resolves `--repo <id|path>` / `--root <path>` to the repo path set.
fn resolve_repo(
    repo: Option<&str>,
    root: Option<&Path>,
    base_dir: &Path,
) -> anyhow::Result<RepoPaths> {
    if let Some(root) = root {
        return Ok(RepoPaths::resolve(root, base_dir)?);
    }
    let Some(repo) = repo else {
        anyhow::bail!("either --repo or --root is required");
    };

    let looks_like_id =
        repo.len() == 40 && repo.chars().all(|c| c.is_ascii_hexdigit());
    if looks_like_id && base_dir.join("repos").join(repo).is_dir() {
        debug!("resolve_repo: treating {repo} as repo id");
        return Ok(RepoPaths::from_repo_id(repo, base_dir)?);
    }
    Ok(RepoPaths::resolve(Path::new(repo), base_dir)?)
}
