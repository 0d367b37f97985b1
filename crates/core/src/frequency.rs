//! Concurrent letter frequency aggregation
//!
//! The key set is fixed (`a`..=`z`), so the map is an array of 26 atomic
//! counters indexed by letter. Writers never take a lock and never insert
//! keys; concurrent increments of the same letter cannot be lost.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

const LETTERS: usize = 26;

/// Shared, lock-free letter counter
#[derive(Debug)]
pub struct LetterFrequencies {
    counts: [AtomicU64; LETTERS],
}

impl LetterFrequencies {
    /// Seed all 26 letters at zero
    pub fn new() -> Self {
        Self {
            counts: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Count the ASCII letters of `text`, case-insensitively
    ///
    /// Digits, punctuation, whitespace and non-ASCII characters are ignored.
    /// Safe to call from many threads on the same instance.
    pub fn update(&self, text: &str) {
        let mut local = [0u64; LETTERS];
        // UTF-8 continuation bytes are never ASCII, so scanning bytes is exact.
        for byte in text.bytes() {
            if byte.is_ascii_alphabetic() {
                local[(byte.to_ascii_lowercase() - b'a') as usize] += 1;
            }
        }

        for (counter, n) in self.counts.iter().zip(local) {
            if n > 0 {
                counter.fetch_add(n, Ordering::Relaxed);
            }
        }
    }

    /// Batch pattern: count a whole collection, parallel across files
    pub fn update_all<S>(&self, texts: &[S])
    where
        S: AsRef<str> + Sync,
    {
        texts.par_iter().for_each(|text| self.update(text.as_ref()));
    }

    /// Count for one letter; `None` for anything outside `a`..=`z` after folding
    pub fn get(&self, letter: char) -> Option<u64> {
        let letter = letter.to_ascii_lowercase();
        letter
            .is_ascii_lowercase()
            .then(|| self.counts[(letter as u8 - b'a') as usize].load(Ordering::Relaxed))
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    /// Zero every counter so the instance can serve another pass
    pub fn reset(&self) {
        for counter in &self.counts {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Snapshot ordered by count descending, ties alphabetical
    pub fn finalize(&self) -> FrequencyReport {
        let mut entries: Vec<LetterCount> = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, c)| LetterCount {
                letter: (b'a' + i as u8) as char,
                count: c.load(Ordering::Relaxed),
            })
            .collect();

        // Stable sort over alphabetical input keeps equal counts alphabetical.
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        FrequencyReport { entries }
    }
}

impl Default for LetterFrequencies {
    fn default() -> Self {
        Self::new()
    }
}

/// One letter and its count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LetterCount {
    pub letter: char,
    pub count: u64,
}

/// Finalized histogram, always 26 entries in report order
///
/// Serializes as a JSON object whose key order is the report order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyReport {
    entries: Vec<LetterCount>,
}

impl FrequencyReport {
    pub fn entries(&self) -> &[LetterCount] {
        &self.entries
    }

    pub fn get(&self, letter: char) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.letter == letter)
            .map(|e| e.count)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }
}

impl Serialize for FrequencyReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.letter, &entry.count)?;
        }
        map.end()
    }
}
