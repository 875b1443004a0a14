//! Overlapping, size-bounded token windows with tail folding.

use std::ops::Range;

use crate::config::ChunkerConfig;
use crate::tokenizer::{Tokenizer, TokenizerError};

/// Plans window ranges over a sequence of `len` tokens.
///
/// Windows start at `0, stride, 2 * stride, ...` while the start is inside the
/// sequence and are clipped to its end. When two or more windows exist and the
/// last one is shorter than `min_tail`, it is folded into its predecessor by
/// extending that window to the end of the sequence. The folded window may
/// exceed `max_tokens` by at most `min_tail - (max_tokens - stride)` tokens.
pub fn plan_windows(
    len: usize,
    max_tokens: usize,
    stride: usize,
    min_tail: usize,
) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    if len <= max_tokens {
        return vec![0..len];
    }

    let stride = stride.max(1);
    let mut windows = Vec::with_capacity(len / stride + 1);
    let mut start = 0usize;
    while start < len {
        windows.push(start..(start + max_tokens).min(len));
        start += stride;
    }

    if windows.len() >= 2 && windows.last().is_some_and(|tail| tail.len() < min_tail) {
        if let Some(tail) = windows.pop() {
            if let Some(previous) = windows.last_mut() {
                previous.end = tail.end;
            }
        }
    }
    windows
}

/// Splits `text` into decoded windows using the configured geometry.
///
/// Empty text yields no windows; text within the window size comes back as a
/// single window.
pub fn split_windows<T>(
    text: &str,
    tokenizer: &T,
    config: &ChunkerConfig,
) -> Result<Vec<String>, TokenizerError>
where
    T: Tokenizer + ?Sized,
{
    let ids = tokenizer.encode(text);
    let ranges = plan_windows(
        ids.len(),
        config.max_chunk_tokens(),
        config.stride(),
        config.min_tail_tokens(),
    );
    if ranges.len() > 1 {
        tracing::trace!(tokens = ids.len(), windows = ranges.len(), "windowed section");
    }
    ranges
        .into_iter()
        .map(|range| tokenizer.decode(&ids[range]))
        .collect()
}
