//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/csync.sqlite"
//!
//! [chunking]
//! max_tokens = 256
//!
//! [embedding]
//! provider = "ollama"
//! model = "nomic-embed-text"
//! dims = 768
//!
//! [sources.markdown]
//! root = "~/notes"
//! include_globs = ["**/*.md"]
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use corpus_sync_core::chunk::{DEFAULT_MAX_TOKENS, DEFAULT_MAX_WORD_LENGTH};
use corpus_sync_core::index::{DEFAULT_BATCH_SIZE, DEFAULT_HEADING_LIMIT};
use corpus_sync_core::processor::ChunkLimits;
use corpus_sync_core::{FileType, IndexOptions};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Keyed by file type name (`markdown`, `org`, `plaintext`).
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
}

impl Config {
    pub fn source(&self, file_type: FileType) -> Option<&SourceConfig> {
        self.sources.get(file_type.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_max_word_length")]
    pub max_word_length: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            max_word_length: DEFAULT_MAX_WORD_LENGTH,
        }
    }
}

impl ChunkingConfig {
    pub fn limits(&self) -> ChunkLimits {
        ChunkLimits {
            max_tokens: self.max_tokens,
            max_word_length: self.max_word_length,
        }
    }
}

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}
fn default_max_word_length() -> usize {
    DEFAULT_MAX_WORD_LENGTH
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_heading_limit")]
    pub heading_limit: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            heading_limit: DEFAULT_HEADING_LIMIT,
        }
    }
}

impl IndexConfig {
    pub fn options(&self) -> IndexOptions {
        IndexOptions {
            batch_size: self.batch_size,
            heading_limit: self.heading_limit,
            ..IndexOptions::default()
        }
    }
}

fn default_index_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_heading_limit() -> usize {
    DEFAULT_HEADING_LIMIT
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Texts per request for the local provider.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for Ollama.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
            url: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Where the files of one type are collected from.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

/// Default include patterns when a source lists none.
pub fn default_include_globs(file_type: FileType) -> Vec<String> {
    let patterns: &[&str] = match file_type {
        FileType::Markdown => &["**/*.md", "**/*.markdown"],
        FileType::Org => &["**/*.org"],
        FileType::Plaintext => &["**/*.txt"],
        _ => &[],
    };
    patterns.iter().map(|p| p.to_string()).collect()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_tokens == 0 {
        bail!("chunking.max_tokens must be > 0");
    }
    if config.chunking.max_word_length == 0 {
        bail!("chunking.max_word_length must be > 0");
    }
    if config.index.batch_size == 0 {
        bail!("index.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    // The local provider can infer dims from its model name.
    if config.embedding.is_enabled() && config.embedding.provider != "local" {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    for name in config.sources.keys() {
        let file_type: FileType = name
            .parse()
            .with_context(|| format!("Invalid [sources.{}] section", name))?;
        if !matches!(
            file_type,
            FileType::Markdown | FileType::Org | FileType::Plaintext
        ) {
            bail!("sources.{}: no processor for this file type", file_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse("[db]\npath = \"/tmp/x.sqlite\"\n").unwrap();
        assert_eq!(config.chunking.max_tokens, 256);
        assert_eq!(config.chunking.max_word_length, 500);
        assert_eq!(config.index.batch_size, 200);
        assert_eq!(config.index.heading_limit, 1000);
        assert!(!config.embedding.is_enabled());
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_sources_keyed_by_file_type() {
        let config = parse(
            r#"
            [db]
            path = "/tmp/x.sqlite"

            [sources.org]
            root = "/notes"
            exclude_globs = ["archive/**"]
            "#,
        )
        .unwrap();
        let org = config.source(FileType::Org).unwrap();
        assert_eq!(org.root, PathBuf::from("/notes"));
        assert!(org.include_globs.is_empty());
        assert_eq!(default_include_globs(FileType::Org), vec!["**/*.org"]);
    }

    #[test]
    fn test_rejects_unprocessable_source_type() {
        let err = parse("[db]\npath = \"x\"\n[sources.pdf]\nroot = \"/docs\"\n").unwrap_err();
        assert!(err.to_string().contains("no processor"));
    }

    #[test]
    fn test_rejects_unknown_source_type() {
        let err = parse("[db]\npath = \"x\"\n[sources.docx]\nroot = \"/docs\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Unknown file type"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse("[db]\npath = \"x\"\n[embedding]\nprovider = \"magic\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_enabled_provider_requires_model_and_dims() {
        let err = parse("[db]\npath = \"x\"\n[embedding]\nprovider = \"openai\"\n").unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));

        let ok = parse(
            "[db]\npath = \"x\"\n[embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\ndims = 768\n",
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_rejects_zero_limits() {
        assert!(parse("[db]\npath = \"x\"\n[chunking]\nmax_tokens = 0\n").is_err());
        assert!(parse("[db]\npath = \"x\"\n[index]\nbatch_size = 0\n").is_err());
    }
}
