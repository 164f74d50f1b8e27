//! Fixed-size, overlapping windows over a token sequence.

/// Split `tokens` into windows of at most `size` tokens, each starting
/// `size - overlap` tokens after the previous one.
///
/// The last window always ends at `tokens.len()`; once it is emitted the
/// split stops, so no trailing window repeats already-covered tokens.
/// A `size` of zero is treated as one and the step is never less than one.
#[must_use]
pub fn split<T>(tokens: &[T], size: usize, overlap: usize) -> Vec<&[T]> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let size = size.max(1);
    if tokens.len() <= size {
        return vec![tokens];
    }

    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::with_capacity(tokens.len().div_ceil(step));
    let mut start = 0;

    loop {
        let end = (start + size).min(tokens.len());
        chunks.push(&tokens[start..end]);
        if end == tokens.len() {
            break;
        }
        start += step;
    }

    chunks
}
