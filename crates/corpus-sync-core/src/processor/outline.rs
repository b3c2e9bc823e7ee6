//! Heading-structured formats: Markdown (`#`) and Org (`*`).
//!
//! Every heading starts a section that runs until the next heading of
//! any level. A section's heading path is its ancestors' titles plus its
//! own, so `## Setup` under `# Install` is indexed as `Install / Setup`.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::{file_name, index_files, ChunkLimits, ContentProcessor};
use crate::index::EntryIndexer;
use crate::models::{Entry, FileType, IndexStats};

pub struct MarkdownProcessor {
    indexer: Arc<EntryIndexer>,
    limits: ChunkLimits,
}

impl MarkdownProcessor {
    pub fn new(indexer: Arc<EntryIndexer>, limits: ChunkLimits) -> Self {
        Self { indexer, limits }
    }
}

#[async_trait]
impl ContentProcessor for MarkdownProcessor {
    fn file_type(&self) -> FileType {
        FileType::Markdown
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
            FileType::Markdown,
            files,
            full_corpus,
            owner,
            regenerate,
            |path, content| parse_outline(path, content, '#'),
        )
        .await
    }
}

pub struct OrgProcessor {
    indexer: Arc<EntryIndexer>,
    limits: ChunkLimits,
}

impl OrgProcessor {
    pub fn new(indexer: Arc<EntryIndexer>, limits: ChunkLimits) -> Self {
        Self { indexer, limits }
    }
}

#[async_trait]
impl ContentProcessor for OrgProcessor {
    fn file_type(&self) -> FileType {
        FileType::Org
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
            FileType::Org,
            files,
            full_corpus,
            owner,
            regenerate,
            |path, content| parse_outline(path, content, '*'),
        )
        .await
    }
}

struct Section<'a> {
    /// Heading titles from the outermost ancestor down, empty for the
    /// text before the first heading.
    titles: String,
    raw: Vec<&'a str>,
    body: Vec<&'a str>,
}

impl Section<'_> {
    fn into_entry(self, path: &str, name: &str) -> Option<Entry> {
        let body = self.body.join("\n");
        let body = body.trim();
        if self.titles.is_empty() && body.is_empty() {
            return None;
        }
        let (heading, compiled) = if self.titles.is_empty() {
            (name.to_string(), format!("{}\n{}", path, body))
        } else {
            (
                format!("{} / {}", name, self.titles),
                format!("{}\n{}\n{}", path, self.titles, body),
            )
        };
        let raw = self.raw.join("\n");
        Some(Entry::new(compiled.trim_end(), raw.trim_end(), heading, path))
    }
}

/// Level and title of a heading line, if `line` is one.
fn heading_level(line: &str, marker: char) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == marker).count();
    if level == 0 {
        return None;
    }
    let rest = &line[level * marker.len_utf8()..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    Some((level, rest.trim()))
}

/// Split one file into one entry per heading section.
pub(crate) fn parse_outline(path: &str, content: &str, marker: char) -> Vec<Entry> {
    let name = file_name(path);
    let mut entries = Vec::new();
    let mut ancestors: Vec<(usize, String)> = Vec::new();
    let mut section = Section {
        titles: String::new(),
        raw: Vec::new(),
        body: Vec::new(),
    };
    let mut in_fence = false;

    for line in content.lines() {
        if marker == '#' && line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let heading = if in_fence {
            None
        } else {
            heading_level(line, marker)
        };

        match heading {
            Some((level, title)) => {
                entries.extend(std::mem::replace(
                    &mut section,
                    Section {
                        titles: String::new(),
                        raw: Vec::new(),
                        body: Vec::new(),
                    },
                )
                .into_entry(path, name));

                while ancestors.last().is_some_and(|(l, _)| *l >= level) {
                    ancestors.pop();
                }
                ancestors.push((level, title.to_string()));
                section.titles = ancestors
                    .iter()
                    .map(|(_, t)| t.as_str())
                    .collect::<Vec<_>>()
                    .join(" / ");
                section.raw.push(line);
            }
            None => {
                section.raw.push(line);
                section.body.push(line);
            }
        }
    }
    entries.extend(section.into_entry(path, name));
    entries
}
