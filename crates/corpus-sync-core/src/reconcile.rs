//! Snapshot reconciliation.
//!
//! Diffs a freshly parsed entry snapshot against the previous one by
//! fingerprint and tags every surviving entry as either new (needs an
//! embedding) or existing (reuse the embedding at its previous index).
//!
//! # Deletion handling
//!
//! | `deletion_filenames` | Preserved fingerprints |
//! |----------------------|------------------------|
//! | `None` | every previous fingerprint |
//! | `Some`, matching no previous entry | previous ∩ current |
//! | `Some`, matching previous entries | previous − deleted |
//!
//! Output is the preserved entries ordered by previous index, then the
//! new entries ordered by first occurrence in the current snapshot.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::debug;

use crate::hash::HashStrategy;
use crate::models::Entry;

/// Whether an entry needs a fresh embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMarker {
    New,
    /// Reuse the embedding stored at this index of the previous snapshot.
    Existing(usize),
}

impl EntryMarker {
    /// Interchange id: `-1` for new entries, otherwise the previous index.
    pub fn id(&self) -> i64 {
        match self {
            EntryMarker::New => -1,
            EntryMarker::Existing(i) => *i as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedEntry {
    pub marker: EntryMarker,
    pub entry: Entry,
}

/// Fingerprint → index of its first occurrence.
fn first_occurrences(hashes: &[String]) -> HashMap<&str, usize> {
    let mut firsts = HashMap::with_capacity(hashes.len());
    for (i, h) in hashes.iter().enumerate() {
        firsts.entry(h.as_str()).or_insert(i);
    }
    firsts
}

/// Classify `current_entries` against `previous_entries`.
///
/// Duplicate fingerprints within a snapshot collapse to their first
/// occurrence.
pub fn mark_entries_for_update(
    current_entries: &[Entry],
    previous_entries: &[Entry],
    strategy: &HashStrategy,
    deletion_filenames: Option<&HashSet<String>>,
) -> Vec<MarkedEntry> {
    let start = Instant::now();
    let current_hashes = strategy.fingerprint_all(current_entries);
    let previous_hashes = strategy.fingerprint_all(previous_entries);
    let deletion_hashes: HashSet<&str> = match deletion_filenames {
        Some(files) => previous_entries
            .iter()
            .zip(&previous_hashes)
            .filter(|(e, _)| files.contains(&e.file))
            .map(|(_, h)| h.as_str())
            .collect(),
        None => HashSet::new(),
    };
    debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "hashed previous and current entries"
    );

    let current_firsts = first_occurrences(&current_hashes);
    let previous_firsts = first_occurrences(&previous_hashes);

    let mut preserved: Vec<usize> = match deletion_filenames {
        None => previous_firsts.values().copied().collect(),
        Some(_) if deletion_hashes.is_empty() => previous_firsts
            .iter()
            .filter(|(h, _)| current_firsts.contains_key(*h))
            .map(|(_, i)| *i)
            .collect(),
        Some(_) => previous_firsts
            .iter()
            .filter(|(h, _)| !deletion_hashes.contains(*h))
            .map(|(_, i)| *i)
            .collect(),
    };
    preserved.sort_unstable();

    let mut new: Vec<usize> = current_firsts
        .iter()
        .filter(|(h, _)| !previous_firsts.contains_key(*h))
        .map(|(_, i)| *i)
        .collect();
    new.sort_unstable();

    let marked: Vec<MarkedEntry> = preserved
        .into_iter()
        .map(|i| MarkedEntry {
            marker: EntryMarker::Existing(i),
            entry: previous_entries[i].clone(),
        })
        .chain(new.into_iter().map(|i| MarkedEntry {
            marker: EntryMarker::New,
            entry: current_entries[i].clone(),
        }))
        .collect();

    debug!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        total = marked.len(),
        "marked entries for update"
    );
    marked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, file: &str) -> Entry {
        Entry::new(text, text, "h", file)
    }

    /// current = {A, B, C}, previous = {B, C, D}.
    fn fixture() -> (Vec<Entry>, Vec<Entry>) {
        let current = vec![entry("A", "a.md"), entry("B", "b.md"), entry("C", "c.md")];
        let previous = vec![entry("B", "b.md"), entry("C", "c.md"), entry("D", "d.md")];
        (current, previous)
    }

    fn summary(marked: &[MarkedEntry]) -> Vec<(i64, String)> {
        marked
            .iter()
            .map(|m| (m.marker.id(), m.entry.compiled.clone()))
            .collect()
    }

    #[test]
    fn test_no_deletion_set_keeps_all_previous() {
        let (current, previous) = fixture();
        let marked = mark_entries_for_update(&current, &previous, &HashStrategy::default(), None);
        assert_eq!(
            summary(&marked),
            vec![
                (0, "B".to_string()),
                (1, "C".to_string()),
                (2, "D".to_string()),
                (-1, "A".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_deletion_set_drops_absent_previous() {
        let (current, previous) = fixture();
        let deletions = HashSet::new();
        let marked = mark_entries_for_update(
            &current,
            &previous,
            &HashStrategy::default(),
            Some(&deletions),
        );
        assert_eq!(
            summary(&marked),
            vec![(0, "B".to_string()), (1, "C".to_string()), (-1, "A".to_string())]
        );
    }

    #[test]
    fn test_deletion_set_not_matching_previous_acts_like_empty() {
        let (current, previous) = fixture();
        let deletions: HashSet<String> = ["unrelated.md".to_string()].into();
        let marked = mark_entries_for_update(
            &current,
            &previous,
            &HashStrategy::default(),
            Some(&deletions),
        );
        assert_eq!(marked.len(), 3);
        assert!(marked.iter().all(|m| m.entry.compiled != "D"));
    }

    #[test]
    fn test_deletion_set_removes_targeted_file() {
        let (current, previous) = fixture();
        let deletions: HashSet<String> = ["d.md".to_string()].into();
        let marked = mark_entries_for_update(
            &current,
            &previous,
            &HashStrategy::default(),
            Some(&deletions),
        );
        assert_eq!(
            summary(&marked),
            vec![(0, "B".to_string()), (1, "C".to_string()), (-1, "A".to_string())]
        );
    }

    #[test]
    fn test_deletion_set_keeps_untargeted_absent_entries() {
        // E was not rescanned, but only b.md was targeted for deletion.
        let current = vec![entry("A", "a.md")];
        let previous = vec![entry("B", "b.md"), entry("E", "e.md")];
        let deletions: HashSet<String> = ["b.md".to_string()].into();
        let marked = mark_entries_for_update(
            &current,
            &previous,
            &HashStrategy::default(),
            Some(&deletions),
        );
        assert_eq!(
            summary(&marked),
            vec![(1, "E".to_string()), (-1, "A".to_string())]
        );
    }

    #[test]
    fn test_new_entries_keep_current_order() {
        let current = vec![entry("Z", "z.md"), entry("Y", "y.md"), entry("X", "x.md")];
        let marked = mark_entries_for_update(&current, &[], &HashStrategy::default(), None);
        let texts: Vec<&str> = marked.iter().map(|m| m.entry.compiled.as_str()).collect();
        assert_eq!(texts, vec!["Z", "Y", "X"]);
        assert!(marked.iter().all(|m| m.marker == EntryMarker::New));
    }

    #[test]
    fn test_duplicates_collapse_to_first_occurrence() {
        let current = vec![entry("A", "one.md"), entry("A", "two.md"), entry("B", "b.md")];
        let marked = mark_entries_for_update(&current, &[], &HashStrategy::default(), None);
        assert_eq!(marked.len(), 2);
        assert_eq!(marked[0].entry.file, "one.md");
    }

    #[test]
    fn test_idempotent() {
        let (current, previous) = fixture();
        let strategy = HashStrategy::default();
        let deletions: HashSet<String> = ["d.md".to_string()].into();
        for set in [None, Some(&deletions)] {
            let first = mark_entries_for_update(&current, &previous, &strategy, set);
            let second = mark_entries_for_update(&current, &previous, &strategy, set);
            assert_eq!(first, second);
        }
    }
}
