//! An ordered set of small non-negative integer indices
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter::FromIterator;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Range, Sub, SubAssign};

const WORD_BITS: usize = 64;

/// Bit-word backed set of `usize` indices.
///
/// The word vector carries no trailing zero words, so `PartialEq` and the
/// serialized form are canonical. Ordering is lexicographic over the
/// ascending index sequence, not over the raw words.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSet {
    words: Vec<u64>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    pub fn insert(&mut self, index: usize) {
        let word = index / WORD_BITS;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (index % WORD_BITS);
    }

    /// Insert every index in a contiguous range.
    pub fn insert_range(&mut self, range: Range<usize>) {
        for index in range {
            self.insert(index);
        }
    }

    /// Union-insert all members of `other`.
    pub fn insert_set(&mut self, other: &IndexSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (word, &o) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= o;
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        let word = index / WORD_BITS;
        word < self.words.len() && self.words[word] & (1 << (index % WORD_BITS)) != 0
    }

    pub fn card(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn first(&self) -> Option<usize> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<usize> {
        let word = self.words.len().checked_sub(1)?;
        Some(word * WORD_BITS + (WORD_BITS - 1 - self.words[word].leading_zeros() as usize))
    }

    pub fn is_disjoint(&self, other: &IndexSet) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }

    /// |self \ other| without allocating.
    pub fn diff_card(&self, other: &IndexSet) -> usize {
        self.words
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let o = other.words.get(i).copied().unwrap_or(0);
                (w & !o).count_ones() as usize
            })
            .sum()
    }

    pub fn union(&self, other: &IndexSet) -> IndexSet {
        let mut out = self.clone();
        out.insert_set(other);
        out
    }

    pub fn intersection(&self, other: &IndexSet) -> IndexSet {
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| a & b)
            .collect();
        Self::from_words(words)
    }

    pub fn difference(&self, other: &IndexSet) -> IndexSet {
        let words = self
            .words
            .iter()
            .enumerate()
            .map(|(i, &w)| w & !other.words.get(i).copied().unwrap_or(0))
            .collect();
        Self::from_words(words)
    }

    /// Iterate members in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            words: &self.words,
            word_index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    fn from_words(words: Vec<u64>) -> Self {
        let mut set = Self { words };
        set.normalize();
        set
    }

    fn normalize(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

pub struct Iter<'a> {
    words: &'a [u64],
    word_index: usize,
    current: u64,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.word_index += 1;
            if self.word_index >= self.words.len() {
                return None;
            }
            self.current = self.words[self.word_index];
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some(self.word_index * WORD_BITS + bit)
    }
}

impl<'a> IntoIterator for &'a IndexSet {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<usize> for IndexSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

impl Ord for IndexSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl PartialOrd for IndexSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl BitOr for &IndexSet {
    type Output = IndexSet;
    fn bitor(self, rhs: &IndexSet) -> IndexSet {
        self.union(rhs)
    }
}

impl BitOrAssign<&IndexSet> for IndexSet {
    fn bitor_assign(&mut self, rhs: &IndexSet) {
        self.insert_set(rhs);
    }
}

impl BitAnd for &IndexSet {
    type Output = IndexSet;
    fn bitand(self, rhs: &IndexSet) -> IndexSet {
        self.intersection(rhs)
    }
}

impl BitAndAssign<&IndexSet> for IndexSet {
    fn bitand_assign(&mut self, rhs: &IndexSet) {
        *self = self.intersection(rhs);
    }
}

impl Sub for &IndexSet {
    type Output = IndexSet;
    fn sub(self, rhs: &IndexSet) -> IndexSet {
        self.difference(rhs)
    }
}

impl SubAssign<&IndexSet> for IndexSet {
    fn sub_assign(&mut self, rhs: &IndexSet) {
        *self = self.difference(rhs);
    }
}

impl fmt::Display for IndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        for index in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", index)?;
            first = false;
        }
        write!(f, "]")
    }
}

impl Serialize for IndexSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.words.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IndexSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from_words(Vec::<u64>::deserialize(deserializer)?))
    }
}
