use crate::freq_table::FreqTable;

const EVENT_PREFIX: &str = "event=";
const EVENT_TOKEN: &str = "event";

/// Split a line into normalized tokens.
///
/// The line is lower-cased and split on whitespace runs. Pieces of the form
/// `event=<seq>` carry a per-line sequence number and collapse to `event`.
pub fn tokenize(line: &str) -> Vec<String> {
    let lower = line.to_lowercase();
    lower
        .split_whitespace()
        .map(|piece| {
            if piece.starts_with(EVENT_PREFIX) {
                EVENT_TOKEN.to_owned()
            } else {
                piece.to_owned()
            }
        })
        .collect()
}

/// Count every token of every line in `lines`.
#[inline(never)]
pub fn count_chunk<S: AsRef<str>>(lines: &[S]) -> FreqTable {
    let mut frequency = FreqTable::new();
    for line in lines {
        for token in tokenize(line.as_ref()) {
            frequency.add(token);
        }
    }
    frequency
}
