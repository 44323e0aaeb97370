use std::collections::BTreeSet;

/// Split `items` into consecutive chunks of at most `size`, keeping order.
///
/// The last chunk holds the remainder. An empty input yields a single empty chunk.
pub fn chunk<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    if items.len() <= size {
        return vec![items];
    }

    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut rest = items.into_iter().peekable();
    while rest.peek().is_some() {
        chunks.push(rest.by_ref().take(size).collect());
    }
    chunks
}

/// Remove and return the items at `indices`, highest index first.
///
/// Working from the back keeps the remaining indices valid while removing. Indices past
/// the end are ignored and duplicates count once.
pub fn extract_by_indices<T>(items: &mut Vec<T>, indices: &[usize]) -> Vec<T> {
    let ordered: BTreeSet<usize> = indices.iter().copied().collect();
    let mut extracted = Vec::with_capacity(ordered.len());
    for idx in ordered.into_iter().rev() {
        if idx < items.len() {
            extracted.push(items.remove(idx));
        }
    }
    extracted
}
