//! Plain text files: one entry per file, split by the chunker.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::{file_name, index_files, ChunkLimits, ContentProcessor};
use crate::index::EntryIndexer;
use crate::models::{Entry, FileType, IndexStats};

pub struct PlaintextProcessor {
    indexer: Arc<EntryIndexer>,
    limits: ChunkLimits,
}

impl PlaintextProcessor {
    pub fn new(indexer: Arc<EntryIndexer>, limits: ChunkLimits) -> Self {
        Self { indexer, limits }
    }
}

#[async_trait]
impl ContentProcessor for PlaintextProcessor {
    fn file_type(&self) -> FileType {
        FileType::Plaintext
    }

    async fn process(
        &self,
        files: &BTreeMap<String, String>,
        full_corpus: bool,
        owner: Option<&str>,
        regenerate: bool,
    ) -> Result<IndexStats> {
        index_files(
            &self.indexer,
            self.limits,
            FileType::Plaintext,
            files,
            full_corpus,
            owner,
            regenerate,
            |path, content| parse_plaintext(path, content).into_iter().collect(),
        )
        .await
    }
}

fn parse_plaintext(path: &str, content: &str) -> Option<Entry> {
    let text = content.trim();
    if text.is_empty() {
        return None;
    }
    Some(Entry::new(
        format!("{}\n{}", path, text),
        content,
        file_name(path),
        path,
    ))
}
