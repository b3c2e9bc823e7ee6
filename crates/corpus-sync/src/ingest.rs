//! Indexing commands: collect files → processor → embedding update.
//!
//! Files for a type come from its `[sources.<type>]` section. Paths are
//! keyed relative to the source root with `/` separators, so `csync
//! delete` takes the same relative paths that `csync index` stored.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

use corpus_sync_core::dates::DateFilter;
use corpus_sync_core::store::Store;
use corpus_sync_core::processor::{
    ChunkLimits, ContentProcessor, MarkdownProcessor, OrgProcessor, PlaintextProcessor,
};
use corpus_sync_core::{EntryIndexer, FileType, IndexStats};

use crate::config::{default_include_globs, Config, SourceConfig};
use crate::db;
use crate::embedding::create_registry;
use crate::sqlite_store::SqliteStore;

/// Wire the SQLite store, configured embedding provider, and date
/// extractor into an indexer.
pub fn build_indexer(config: &Config, pool: SqlitePool) -> Result<Arc<EntryIndexer>> {
    let store = Arc::new(SqliteStore::new(pool));
    let models = Arc::new(create_registry(&config.embedding)?);
    let dates = Arc::new(DateFilter::new()?);
    Ok(Arc::new(EntryIndexer::new(
        store,
        models,
        dates,
        config.index.options(),
    )))
}

/// The processor for `file_type`.
pub fn processor_for(
    file_type: FileType,
    indexer: Arc<EntryIndexer>,
    limits: ChunkLimits,
) -> Result<Box<dyn ContentProcessor>> {
    match file_type {
        FileType::Markdown => Ok(Box::new(MarkdownProcessor::new(indexer, limits))),
        FileType::Org => Ok(Box::new(OrgProcessor::new(indexer, limits))),
        FileType::Plaintext => Ok(Box::new(PlaintextProcessor::new(indexer, limits))),
        other => bail!(
            "No processor for file type '{}'. Supported: markdown, org, plaintext",
            other
        ),
    }
}

/// Read every file under the source root that matches its globs.
///
/// Returns relative path → content, sorted by path. Files that are not
/// valid UTF-8 are skipped with a warning.
pub fn collect_files(source: &SourceConfig, file_type: FileType) -> Result<BTreeMap<String, String>> {
    let root = &source.root;
    if !root.exists() {
        bail!("Source root does not exist: {}", root.display());
    }

    let include_globs = if source.include_globs.is_empty() {
        default_include_globs(file_type)
    } else {
        source.include_globs.clone()
    };
    let include_set = build_globset(&include_globs)?;

    let mut excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    excludes.extend(source.exclude_globs.clone());
    let exclude_set = build_globset(&excludes)?;

    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).follow_links(source.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => {
                files.insert(rel_str, content);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

/// Reject `--owner ""`: it would share a unique key with anonymous rows
/// without ever matching them.
pub fn check_owner(owner: Option<&str>) -> Result<()> {
    if owner.is_some_and(|o| o.trim().is_empty()) {
        bail!("owner must not be empty");
    }
    Ok(())
}

/// Outcome of one source sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Files read from the source root.
    pub scanned: usize,
    /// Indexed files that are no longer on disk.
    pub removed: usize,
    pub stats: IndexStats,
}

/// Scan `source` and sync it into the index through `indexer`.
///
/// Files the index holds for this owner and type that are no longer under
/// the source root are sent as deletions, in both full and partial mode.
#[allow(clippy::too_many_arguments)]
pub async fn sync_source(
    indexer: Arc<EntryIndexer>,
    source: &SourceConfig,
    file_type: FileType,
    limits: ChunkLimits,
    owner: Option<&str>,
    regenerate: bool,
    changed_only: bool,
) -> Result<SyncReport> {
    let mut files = collect_files(source, file_type)?;
    let scanned = files.len();

    let mut removed = 0;
    for path in indexer.store().file_paths_by_type(owner, file_type).await? {
        if !files.contains_key(&path) {
            files.insert(path, String::new());
            removed += 1;
        }
    }
    info!(file_type = %file_type, files = scanned, removed, "collected files");

    let processor = processor_for(file_type, indexer, limits)?;
    let stats = processor
        .process(&files, !changed_only, owner, regenerate)
        .await?;
    Ok(SyncReport {
        scanned,
        removed,
        stats,
    })
}

/// `csync index <type>`: sync the type's source directory into the index.
///
/// With `changed_only`, the collected files are treated as a partial
/// update: blank files delete their entries instead of being parsed.
pub async fn run_index(
    config: &Config,
    file_type: FileType,
    owner: Option<&str>,
    regenerate: bool,
    changed_only: bool,
) -> Result<IndexStats> {
    check_owner(owner)?;
    let source = config.source(file_type).ok_or_else(|| {
        anyhow::anyhow!(
            "No source configured for '{}'. Add a [sources.{}] section.",
            file_type,
            file_type
        )
    })?;

    let pool = db::connect(config).await?;
    let indexer = build_indexer(config, pool.clone())?;
    let report = sync_source(
        indexer,
        source,
        file_type,
        config.chunking.limits(),
        owner,
        regenerate,
        changed_only,
    )
    .await?;

    println!("index {}", file_type);
    println!("  files scanned: {}", report.scanned);
    println!("  files removed: {}", report.removed);
    println!("  entries added: {}", report.stats.added);
    println!("  entries deleted: {}", report.stats.deleted);

    pool.close().await;
    Ok(report.stats)
}

/// `csync delete <type> <paths...>`: remove every entry of the given files.
pub async fn run_delete(
    config: &Config,
    file_type: FileType,
    paths: &[String],
    owner: Option<&str>,
) -> Result<IndexStats> {
    check_owner(owner)?;
    let files: BTreeMap<String, String> = paths
        .iter()
        .map(|p| (p.clone(), String::new()))
        .collect();

    let pool = db::connect(config).await?;
    let indexer = build_indexer(config, pool.clone())?;
    let processor = processor_for(file_type, indexer, config.chunking.limits())?;
    let stats = processor.process(&files, false, owner, false).await?;

    println!("delete {}", file_type);
    println!("  files: {}", files.len());
    println!("  entries deleted: {}", stats.deleted);

    pool.close().await;
    Ok(stats)
}
