//! Content processors: turn a batch of source files into entries and
//! hand them to the [`EntryIndexer`].
//!
//! Each file type has its own [`ContentProcessor`]. They all follow the
//! same convention for partial updates: when `full_corpus` is false, a
//! file with blank content is a request to delete that file's entries.
//! In either mode, a scanned file that yields no entries loses the
//! entries it had.
//!
//! | Processor | File type | Sections |
//! |-----------|-----------|----------|
//! | [`MarkdownProcessor`] | `markdown` | `#` headings |
//! | [`OrgProcessor`] | `org` | `*` headings |
//! | [`PlaintextProcessor`] | `plaintext` | whole file |

pub mod outline;
pub mod plaintext;

pub use outline::{MarkdownProcessor, OrgProcessor};
pub use plaintext::PlaintextProcessor;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::chunk::{split_entries_by_max_tokens, DEFAULT_MAX_TOKENS, DEFAULT_MAX_WORD_LENGTH};
use crate::index::{EntryIndexer, IndexScope};
use crate::models::{Entry, FileSource, FileType, IndexStats};

/// Parses one file type and syncs the result into the index.
#[async_trait]
pub trait ContentProcessor: Send + Sync {
    fn file_type(&self) -> FileType;

    /// Index `files` (path → content) for `owner`.
    ///
    /// With `full_corpus` the batch is the owner's entire corpus for this
    /// type. Otherwise blank files are treated as deletions.
    async fn process(
        &self,
        files: &BTreeMap<String, String>,
        full_corpus: bool,
        owner: Option<&str>,
        regenerate: bool,
    ) -> Result<IndexStats>;
}

/// Chunking limits applied before indexing.
#[derive(Debug, Clone, Copy)]
pub struct ChunkLimits {
    pub max_tokens: usize,
    pub max_word_length: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            max_word_length: DEFAULT_MAX_WORD_LENGTH,
        }
    }
}

/// Split a batch into files to parse and, for partial updates, the set of
/// files whose entries should be deleted.
pub fn partition_deletions(
    files: &BTreeMap<String, String>,
    full_corpus: bool,
) -> (Vec<(&str, &str)>, Option<HashSet<String>>) {
    if full_corpus {
        let to_parse = files
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_str()))
            .collect();
        return (to_parse, None);
    }

    let mut to_parse = Vec::new();
    let mut deletions = HashSet::new();
    for (path, content) in files {
        if content.trim().is_empty() {
            deletions.insert(path.clone());
        } else {
            to_parse.push((path.as_str(), content.as_str()));
        }
    }
    (to_parse, Some(deletions))
}

/// Final path component, or the whole path when it has none.
pub(crate) fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Parse → chunk → index, shared by every processor.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn index_files<F>(
    indexer: &EntryIndexer,
    limits: ChunkLimits,
    file_type: FileType,
    files: &BTreeMap<String, String>,
    full_corpus: bool,
    owner: Option<&str>,
    regenerate: bool,
    parse: F,
) -> Result<IndexStats>
where
    F: Fn(&str, &str) -> Vec<Entry> + Send + Sync,
{
    let (to_parse, mut deletions) = partition_deletions(files, full_corpus);

    let mut entries = Vec::new();
    for (path, content) in &to_parse {
        entries.extend(parse(path, content));
    }
    let parsed = entries.len();
    let entries = split_entries_by_max_tokens(&entries, limits.max_tokens, limits.max_word_length);

    // Scanned files that yield no entries lose their stored ones.
    let produced: HashSet<&str> = entries.iter().map(|e| e.file.as_str()).collect();
    let emptied: Vec<String> = to_parse
        .iter()
        .filter(|(path, _)| !produced.contains(path))
        .map(|(path, _)| path.to_string())
        .collect();
    if !emptied.is_empty() {
        deletions.get_or_insert_with(HashSet::new).extend(emptied);
    }

    debug!(
        file_type = %file_type,
        files = to_parse.len(),
        deletions = deletions.as_ref().map_or(0, HashSet::len),
        parsed,
        chunks = entries.len(),
        "parsed files into entries"
    );

    let scope = IndexScope {
        owner,
        file_type,
        file_source: FileSource::Computer,
    };
    indexer
        .update_embeddings(&entries, &scope, deletions.as_ref(), regenerate)
        .await
}
