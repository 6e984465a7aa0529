#![forbid(unsafe_code)]

//! Ordered, deduplicated sets of row indices.
//!
//! A [`Selection`] is what every column predicate returns and what
//! `subset` consumes. Indices are stored as packed `u64` words, so
//! insertion is O(1) amortized and boolean composition works a word at a
//! time. Selections are never checked against a column's size; combining
//! selections from unrelated columns is allowed.
//!
//! Storage grows with the largest index, not with the number of indices, so
//! row indices are limited to `0..MAX_ROWS`.

use std::fmt;
use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// Exclusive upper bound on row indices (512 MiB of bitset at the limit).
pub const MAX_ROWS: usize = u32::MAX as usize;

#[derive(Clone, Default)]
pub struct Selection {
    words: Vec<u64>,
    count: usize,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty selection with storage reserved for rows `0..rows`.
    #[must_use]
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            words: Vec::with_capacity(rows.div_ceil(WORD_BITS)),
            count: 0,
        }
    }

    #[must_use]
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        indices.into_iter().collect()
    }

    /// Every row in `start..end`.
    #[must_use]
    pub fn with_range(start: usize, end: usize) -> Self {
        if start >= end {
            return Self::new();
        }
        let mut words = vec![0_u64; end.div_ceil(WORD_BITS)];
        for (idx, word) in words.iter_mut().enumerate() {
            let lo = idx * WORD_BITS;
            let hi = lo + WORD_BITS;
            if hi <= start || lo >= end {
                continue;
            }
            let from = start.saturating_sub(lo);
            let to = (end - lo).min(WORD_BITS);
            *word = range_mask(from, to);
        }
        Self {
            words,
            count: end - start,
        }
    }

    /// Adds `row`; adding an index that is already present is a no-op.
    ///
    /// # Panics
    ///
    /// When `row >= MAX_ROWS`.
    pub fn add(&mut self, row: usize) {
        assert!(row < MAX_ROWS, "row index {row} exceeds the selection limit");
        let (word, bit) = (row / WORD_BITS, row % WORD_BITS);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let mask = 1_u64 << bit;
        if self.words[word] & mask == 0 {
            self.words[word] |= mask;
            self.count += 1;
        }
    }

    #[must_use]
    pub fn contains(&self, row: usize) -> bool {
        self.words
            .get(row / WORD_BITS)
            .is_some_and(|word| (word >> (row % WORD_BITS)) & 1 == 1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Ascending iteration, each index once.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            words: &self.words,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
            remaining: self.count,
        }
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    #[must_use]
    pub fn first(&self) -> Option<usize> {
        self.iter().next()
    }

    #[must_use]
    pub fn last(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, word)| **word != 0)
            .map(|(idx, word)| idx * WORD_BITS + (WORD_BITS - 1 - word.leading_zeros() as usize))
    }

    /// In-place intersection.
    pub fn and(&mut self, other: &Self) -> &mut Self {
        self.words.truncate(other.words.len());
        for (word, rhs) in self.words.iter_mut().zip(&other.words) {
            *word &= rhs;
        }
        self.recount();
        self
    }

    /// In-place union.
    pub fn or(&mut self, other: &Self) -> &mut Self {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (word, rhs) in self.words.iter_mut().zip(&other.words) {
            *word |= rhs;
        }
        self.recount();
        self
    }

    /// In-place difference: removes every index present in `other`.
    pub fn and_not(&mut self, other: &Self) -> &mut Self {
        for (word, rhs) in self.words.iter_mut().zip(&other.words) {
            *word &= !rhs;
        }
        self.recount();
        self
    }

    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.and(other);
        out
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.or(other);
        out
    }

    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.and_not(other);
        out
    }

    /// Every row in `0..rows` that is not selected.
    #[must_use]
    pub fn complement(&self, rows: usize) -> Self {
        let mut all = Self::with_range(0, rows);
        all.and_not(self);
        all
    }

    fn recount(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
        self.count = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }
}

fn range_mask(from: usize, to: usize) -> u64 {
    let upper = if to >= WORD_BITS {
        u64::MAX
    } else {
        (1_u64 << to) - 1
    };
    let lower = (1_u64 << from) - 1;
    upper & !lower
}

impl PartialEq for Selection {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().eq(other.iter())
    }
}

impl Eq for Selection {}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<usize> for Selection {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut selection = Self::new();
        selection.extend(iter);
        selection
    }
}

impl Extend<usize> for Selection {
    fn extend<T: IntoIterator<Item = usize>>(&mut self, iter: T) {
        for row in iter {
            self.add(row);
        }
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a> {
    words: &'a [u64],
    word_idx: usize,
    current: u64,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.word_idx += 1;
            self.current = *self.words.get(self.word_idx)?;
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        self.remaining = self.remaining.saturating_sub(1);
        Some(self.word_idx * WORD_BITS + bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

impl Serialize for Selection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<usize>::deserialize(deserializer)?;
        if let Some(row) = rows.iter().find(|row| **row >= MAX_ROWS) {
            return Err(serde::de::Error::custom(format!(
                "row index {row} exceeds the selection limit of {MAX_ROWS}"
            )));
        }
        Ok(rows.into_iter().collect())
    }
}
