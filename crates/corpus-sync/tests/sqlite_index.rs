//! SQLite-backed indexing through the library API.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use corpus_sync::export::export_jsonl;
use corpus_sync::{db, migrate, SqliteStore};
use corpus_sync_core::dates::DateFilter;
use corpus_sync_core::embedding::{EmbeddingProvider, ModelRegistry};
use corpus_sync_core::jsonl::parse_jsonl_entries;
use corpus_sync_core::models::{FileSource, NewEntry};
use corpus_sync_core::processor::{ChunkLimits, ContentProcessor, MarkdownProcessor};
use corpus_sync_core::store::Store;
use corpus_sync_core::{Entry, EntryIndexer, FileType, IndexError, IndexOptions, IndexScope, IndexStats};

struct CountingProvider {
    name: &'static str,
    embedded: AtomicUsize,
}

impl CountingProvider {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            embedded: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    fn model_name(&self) -> &str {
        self.name
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| vec![t.len() as f32, 0.5, -1.0])
            .collect())
    }
}

struct Env {
    _tmp: TempDir,
    store: Arc<SqliteStore>,
    provider: Arc<CountingProvider>,
    indexer: Arc<EntryIndexer>,
}

async fn setup() -> Env {
    setup_with(ModelRegistry::new(Arc::new(CountingProvider::new("base"))), None).await
}

async fn setup_with(mut registry: ModelRegistry, extra: Option<Arc<CountingProvider>>) -> Env {
    let tmp = TempDir::new().unwrap();
    let pool = db::connect_path(&tmp.path().join("data/index.sqlite"))
        .await
        .unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    // Idempotent.
    migrate::apply_schema(&pool).await.unwrap();

    let provider = extra.unwrap_or_else(|| Arc::new(CountingProvider::new("base")));
    registry.register(provider.clone());

    let store = Arc::new(SqliteStore::new(pool));
    let indexer = Arc::new(EntryIndexer::new(
        store.clone(),
        Arc::new(registry),
        Arc::new(DateFilter::new().unwrap()),
        IndexOptions::default(),
    ));
    Env {
        _tmp: tmp,
        store,
        provider,
        indexer,
    }
}

fn scope(owner: Option<&str>) -> IndexScope<'_> {
    IndexScope {
        owner,
        file_type: FileType::Markdown,
        file_source: FileSource::Computer,
    }
}

fn entry(text: &str, file: &str) -> Entry {
    Entry::new(text, format!("raw {}", text), "Heading", file)
}

#[tokio::test]
async fn test_incremental_update_against_sqlite() {
    let env = setup().await;
    let first = vec![
        entry("alpha on 2024-01-15", "a.md"),
        entry("beta", "a.md"),
        entry("gamma", "b.md"),
    ];
    let stats = env
        .indexer
        .update_embeddings(&first, &scope(Some("ann")), None, false)
        .await
        .unwrap();
    assert_eq!(stats, IndexStats { added: 3, deleted: 0 });

    let second = vec![entry("alpha on 2024-01-15", "a.md"), entry("beta v2", "a.md")];
    let stats = env
        .indexer
        .update_embeddings(&second, &scope(Some("ann")), None, false)
        .await
        .unwrap();
    assert_eq!(stats, IndexStats { added: 1, deleted: 1 });
    assert_eq!(env.provider.embedded.load(Ordering::SeqCst), 4);

    let rows = env
        .store
        .entries_by_type(Some("ann"), FileType::Markdown)
        .await
        .unwrap();
    let compiled: Vec<&str> = rows.iter().map(|r| r.compiled.as_str()).collect();
    assert_eq!(compiled, vec!["alpha on 2024-01-15", "gamma", "beta v2"]);
    assert_eq!(rows[0].embedding, vec![19.0, 0.5, -1.0]);
    assert_eq!(rows[0].file_source, FileSource::Computer);
    assert_eq!(
        env.store.dates_for_entry(rows[0].id).await.unwrap(),
        vec!["2024-01-15".to_string()]
    );
}

#[tokio::test]
async fn test_file_deletion_cascades_dates() {
    let env = setup().await;
    env.indexer
        .update_embeddings(
            &[entry("met 2023-05-01", "a.md"), entry("keep", "b.md")],
            &scope(None),
            None,
            false,
        )
        .await
        .unwrap();
    let rows = env.store.entries_by_type(None, FileType::Markdown).await.unwrap();
    let doomed = rows[0].id;

    let deletions: HashSet<String> = ["a.md".to_string()].into();
    let stats = env
        .indexer
        .update_embeddings(&[], &scope(None), Some(&deletions), false)
        .await
        .unwrap();
    assert_eq!(stats.deleted, 1);
    assert!(env.store.dates_for_entry(doomed).await.unwrap().is_empty());

    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entry_dates")
        .fetch_one(env.store.pool())
        .await
        .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn test_same_path_under_two_types_is_kept_apart() {
    let env = setup().await;
    env.indexer
        .update_embeddings(
            &[entry("alpha", "notes"), entry("beta", "notes")],
            &scope(Some("ann")),
            None,
            false,
        )
        .await
        .unwrap();

    let plaintext = IndexScope {
        file_type: FileType::Plaintext,
        ..scope(Some("ann"))
    };
    let stats = env
        .indexer
        .update_embeddings(&[entry("gamma", "notes")], &plaintext, None, false)
        .await
        .unwrap();
    assert_eq!(stats, IndexStats { added: 1, deleted: 0 });

    let deletions: HashSet<String> = ["notes".to_string()].into();
    let stats = env
        .indexer
        .update_embeddings(&[], &plaintext, Some(&deletions), false)
        .await
        .unwrap();
    assert_eq!(stats, IndexStats { added: 0, deleted: 1 });

    assert_eq!(
        env.store
            .entry_hashes_by_file(Some("ann"), "notes", FileType::Markdown)
            .await
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        env.store
            .file_paths_by_type(Some("ann"), FileType::Markdown)
            .await
            .unwrap(),
        vec!["notes".to_string()]
    );
    assert!(env
        .store
        .file_paths_by_type(Some("ann"), FileType::Plaintext)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_null_owner_is_distinct_from_named_owner() {
    let env = setup().await;
    let entries = vec![entry("shared", "a.md")];
    env.indexer
        .update_embeddings(&entries, &scope(None), None, false)
        .await
        .unwrap();
    let stats = env
        .indexer
        .update_embeddings(&entries, &scope(Some("ann")), None, false)
        .await
        .unwrap();
    assert_eq!(stats.added, 1);

    env.indexer
        .update_embeddings(&[], &scope(Some("ann")), None, true)
        .await
        .unwrap();
    assert_eq!(
        env.store
            .entries_by_type(None, FileType::Markdown)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_unique_content_per_owner_and_type() {
    let env = setup().await;
    let new = |file_type| NewEntry {
        owner: Some("ann".to_string()),
        compiled: "x".to_string(),
        raw: "x".to_string(),
        heading: String::new(),
        file_path: "a.md".to_string(),
        file_type,
        file_source: FileSource::Computer,
        hashed_value: "h".to_string(),
        corpus_id: uuid::Uuid::new_v4(),
        embedding: vec![1.0],
    };
    env.store
        .insert_entries(vec![new(FileType::Markdown)])
        .await
        .unwrap();
    env.store.insert_entries(vec![new(FileType::Org)]).await.unwrap();
    assert!(env
        .store
        .insert_entries(vec![new(FileType::Markdown)])
        .await
        .is_err());
}

#[tokio::test]
async fn test_owner_model_selection() {
    let large = Arc::new(CountingProvider::new("large"));
    let env = setup_with(
        ModelRegistry::new(Arc::new(CountingProvider::new("base"))),
        Some(large.clone()),
    )
    .await;
    env.store.set_search_model("ann", "large").await.unwrap();
    env.indexer
        .update_embeddings(&[entry("x", "a.md")], &scope(Some("ann")), None, false)
        .await
        .unwrap();
    assert_eq!(large.embedded.load(Ordering::SeqCst), 1);

    env.store.set_search_model("ann", "missing").await.unwrap();
    let err = env
        .indexer
        .update_embeddings(&[entry("y", "a.md")], &scope(Some("ann")), None, true)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<IndexError>(),
        Some(IndexError::UnknownModel { .. })
    ));
    assert_eq!(
        env.store
            .entries_by_type(Some("ann"), FileType::Markdown)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_markdown_processor_and_export() {
    let env = setup().await;
    let processor = MarkdownProcessor::new(env.indexer.clone(), ChunkLimits::default());

    let mut files = BTreeMap::new();
    files.insert(
        "journal.md".to_string(),
        "# Monday\nWent hiking.\n# Tuesday\nRained all day.".to_string(),
    );
    let stats = processor
        .process(&files, true, Some("ann"), false)
        .await
        .unwrap();
    assert_eq!(stats.added, 2);

    let (jsonl, count) = export_jsonl(env.store.as_ref(), Some("ann"), FileType::Markdown)
        .await
        .unwrap();
    assert_eq!(count, 2);
    let exported = parse_jsonl_entries(&jsonl).unwrap();
    assert_eq!(exported[0].heading, "journal.md / Monday");
    assert_eq!(exported[1].file, "journal.md");

    // Nothing for another owner.
    let (empty, count) = export_jsonl(env.store.as_ref(), Some("bob"), FileType::Markdown)
        .await
        .unwrap();
    assert_eq!((empty.as_str(), count), ("", 0));
}
