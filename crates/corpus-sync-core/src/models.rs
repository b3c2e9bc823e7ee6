//! Core data models used throughout corpus-sync.
//!
//! These types represent the parsed entries, persisted rows, and date
//! index records that flow through the indexing pipeline.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of indexed content before persistence.
///
/// Entries sharing a `corpus_id` were split from the same source unit
/// by the chunker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Text fed to the embedding model.
    pub compiled: String,
    /// Original text as written in the source file.
    pub raw: String,
    /// Section title.
    pub heading: String,
    /// Source file path.
    pub file: String,
    pub corpus_id: Uuid,
}

impl Entry {
    pub fn new(
        compiled: impl Into<String>,
        raw: impl Into<String>,
        heading: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            compiled: compiled.into(),
            raw: raw.into(),
            heading: heading.into(),
            file: file.into(),
            corpus_id: Uuid::new_v4(),
        }
    }
}

/// Content type of a source file. Each type has its own processor and
/// its own partition of the persisted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Org,
    Markdown,
    Plaintext,
    Pdf,
    Image,
    Github,
    Notion,
}

impl FileType {
    pub const ALL: [FileType; 7] = [
        FileType::Org,
        FileType::Markdown,
        FileType::Plaintext,
        FileType::Pdf,
        FileType::Image,
        FileType::Github,
        FileType::Notion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Org => "org",
            FileType::Markdown => "markdown",
            FileType::Plaintext => "plaintext",
            FileType::Pdf => "pdf",
            FileType::Image => "image",
            FileType::Github => "github",
            FileType::Notion => "notion",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match FileType::ALL.iter().find(|t| t.as_str() == s) {
            Some(t) => Ok(*t),
            None => bail!(
                "Unknown file type: '{}'. Must be one of: org, markdown, plaintext, pdf, image, github, notion",
                s
            ),
        }
    }
}

/// Where a file was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSource {
    Computer,
    Github,
    Notion,
}

impl FileSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileSource::Computer => "computer",
            FileSource::Github => "github",
            FileSource::Notion => "notion",
        }
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "computer" => Ok(FileSource::Computer),
            "github" => Ok(FileSource::Github),
            "notion" => Ok(FileSource::Notion),
            other => bail!("Unknown file source: '{}'", other),
        }
    }
}

/// Insert shape for a persisted entry; the store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub owner: Option<String>,
    pub compiled: String,
    pub raw: String,
    pub heading: String,
    pub file_path: String,
    pub file_type: FileType,
    pub file_source: FileSource,
    pub hashed_value: String,
    pub corpus_id: Uuid,
    pub embedding: Vec<f32>,
}

/// An embedded entry stored in the index.
///
/// Uniquely identified by `(owner, hashed_value, file_type)`.
#[derive(Debug, Clone)]
pub struct PersistedEntry {
    pub id: i64,
    pub owner: Option<String>,
    pub compiled: String,
    pub raw: String,
    pub heading: String,
    pub file_path: String,
    pub file_type: FileType,
    pub file_source: FileSource,
    pub hashed_value: String,
    pub corpus_id: Uuid,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl PersistedEntry {
    /// Builds a persisted row from its insert shape.
    pub fn from_new(id: i64, new: NewEntry, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner: new.owner,
            compiled: new.compiled,
            raw: new.raw,
            heading: new.heading,
            file_path: new.file_path,
            file_type: new.file_type,
            file_source: new.file_source,
            hashed_value: new.hashed_value,
            corpus_id: new.corpus_id,
            embedding: new.embedding,
            created_at,
        }
    }

    /// The entry without its storage metadata.
    pub fn to_entry(&self) -> Entry {
        Entry {
            compiled: self.compiled.clone(),
            raw: self.raw.clone(),
            heading: self.heading.clone(),
            file: self.file_path.clone(),
            corpus_id: self.corpus_id,
        }
    }
}

/// A calendar date referenced in an entry's raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateIndexRecord {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub entry_id: i64,
}

/// Counts returned by one indexing invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub added: usize,
    pub deleted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_roundtrip_names() {
        for t in FileType::ALL {
            assert_eq!(t.as_str().parse::<FileType>().unwrap(), t);
        }
        assert!("docx".parse::<FileType>().is_err());
    }

    #[test]
    fn test_file_type_serde_lowercase() {
        let json = serde_json::to_string(&FileType::Markdown).unwrap();
        assert_eq!(json, "\"markdown\"");
    }

    #[test]
    fn test_new_entries_get_distinct_corpus_ids() {
        let a = Entry::new("a", "a", "h", "f.md");
        let b = Entry::new("a", "a", "h", "f.md");
        assert_ne!(a.corpus_id, b.corpus_id);
    }
}
