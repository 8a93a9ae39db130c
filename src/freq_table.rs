use std::collections::hash_map::{self, HashMap};
use std::collections::BTreeMap;
use std::iter::FromIterator;

/// Token frequency table.
///
/// Partial tables (one per batch) and the global table share this type.
/// Tables are combined by value through [`FreqTable::merge`], which is
/// associative and commutative, so the global table does not depend on the
/// order in which partial tables arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreqTable {
    counts: HashMap<String, u64>,
}

impl FreqTable {
    pub fn new() -> Self {
        FreqTable {
            counts: HashMap::new(),
        }
    }

    pub fn add(&mut self, token: String) {
        self.add_count(token, 1);
    }

    pub fn add_count(&mut self, token: String, count: u64) {
        if count == 0 {
            return;
        }
        *self.counts.entry(token).or_insert(0) += count;
    }

    /// Count of `token`, zero when absent.
    pub fn get(&self, token: &str) -> u64 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, u64> {
        self.counts.iter()
    }

    /// Sum two tables into a new one.
    ///
    /// The smaller table is folded into the larger, which keeps the
    /// rehashing cost proportional to the smaller side.
    pub fn merge(self, other: FreqTable) -> FreqTable {
        let (mut base, sub_table) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        for (token, count) in sub_table.counts {
            base.add_count(token, count);
        }
        base
    }

    /// Entries ordered by token, for stable serialization.
    pub fn to_sorted(&self) -> BTreeMap<String, u64> {
        self.counts
            .iter()
            .map(|(token, count)| (token.clone(), *count))
            .collect()
    }
}

impl FromIterator<(String, u64)> for FreqTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut table = FreqTable::new();
        for (token, count) in iter {
            table.add_count(token, count);
        }
        table
    }
}

impl IntoIterator for FreqTable {
    type Item = (String, u64);
    type IntoIter = hash_map::IntoIter<String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

impl<'a> IntoIterator for &'a FreqTable {
    type Item = (&'a String, &'a u64);
    type IntoIter = hash_map::Iter<'a, String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

/// Fan-in of partial tables into the global table.
pub fn aggregate<I>(partials: I) -> FreqTable
where
    I: IntoIterator<Item = FreqTable>,
{
    partials.into_iter().fold(FreqTable::new(), FreqTable::merge)
}
