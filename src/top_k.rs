use std::cmp::Ordering;

use crate::freq_table::FreqTable;

/// Highest count first, equal counts in ascending token order.
fn rank(a: &(String, u64), b: &(String, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// The `k` most frequent tokens of `table`, ordered by [`rank`].
pub fn top_k(table: &FreqTable, k: usize) -> Vec<(String, u64)> {
    if k == 0 {
        return Vec::new();
    }
    let mut entries: Vec<(String, u64)> = table
        .iter()
        .map(|(token, count)| (token.clone(), *count))
        .collect();
    if k < entries.len() {
        entries.select_nth_unstable_by(k - 1, rank);
        entries.truncate(k);
    }
    entries.sort_unstable_by(rank);
    entries
}
