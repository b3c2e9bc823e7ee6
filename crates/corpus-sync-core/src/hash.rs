//! Content fingerprints for entry identity.
//!
//! A fingerprint is the lowercase hex SHA-256 digest of one entry field.
//! It depends only on the bytes of that field, so it is stable across
//! runs and processes and doubles as the persisted `hashed_value`.

use sha2::{Digest, Sha256};

use crate::models::Entry;

/// Which entry field a fingerprint is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryField {
    #[default]
    Compiled,
    Raw,
    Heading,
    File,
}

impl EntryField {
    pub fn select<'a>(&self, entry: &'a Entry) -> &'a str {
        match self {
            EntryField::Compiled => &entry.compiled,
            EntryField::Raw => &entry.raw,
            EntryField::Heading => &entry.heading,
            EntryField::File => &entry.file,
        }
    }
}

/// Field selector plus digest function used to fingerprint entries.
#[derive(Debug, Clone, Copy)]
pub struct HashStrategy {
    pub field: EntryField,
    pub digest: fn(&[u8]) -> String,
}

impl HashStrategy {
    pub fn new(field: EntryField) -> Self {
        Self {
            field,
            digest: sha256_hex,
        }
    }

    pub fn fingerprint(&self, entry: &Entry) -> String {
        (self.digest)(self.field.select(entry).as_bytes())
    }

    pub fn fingerprint_all(&self, entries: &[Entry]) -> Vec<String> {
        entries.iter().map(|e| self.fingerprint(e)).collect()
    }
}

impl Default for HashStrategy {
    fn default() -> Self {
        Self::new(EntryField::Compiled)
    }
}

/// Hex-encoded SHA-256 of `bytes` (64 chars).
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Fingerprint `entry` by `field` with the default digest.
pub fn hash_entry(entry: &Entry, field: EntryField) -> String {
    HashStrategy::new(field).fingerprint(entry)
}
