use std::num::NonZeroUsize;

/// A bounded run of consecutive input lines, the unit of parallel work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of the batch in input order, starting at 0.
    pub index: usize,
    pub lines: Vec<String>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Number of batches `line_count` lines split into.
pub fn batch_count(line_count: usize, chunk_size: NonZeroUsize) -> usize {
    line_count.div_ceil(chunk_size.get())
}

/// Split `lines` into consecutive batches of `chunk_size` lines.
///
/// Only the last batch may be shorter. No lines are copied; each one moves
/// into exactly one batch.
pub fn partition(lines: Vec<String>, chunk_size: NonZeroUsize) -> Vec<Batch> {
    let mut batches = Vec::with_capacity(batch_count(lines.len(), chunk_size));
    let mut lines = lines.into_iter().peekable();
    while lines.peek().is_some() {
        let chunk: Vec<String> = lines.by_ref().take(chunk_size.get()).collect();
        batches.push(Batch {
            index: batches.len(),
            lines: chunk,
        });
    }
    batches
}
