//! Splitting an index range into fixed-size chunks.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk size must be positive")]
    ZeroChunkSize,
    #[error("empty index range [{start}, {stop})")]
    EmptyRange { start: u64, stop: u64 },
}

/// Half-open index range `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub lo: u64,
    pub hi: u64,
}

impl Chunk {
    pub fn len(&self) -> u64 {
        self.hi - self.lo
    }

    pub fn is_empty(&self) -> bool {
        self.lo == self.hi
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lo, self.hi)
    }
}

/// Cover `[start, stop)` with consecutive chunks of `chunk_size`.
///
/// Only the last chunk may be shorter.
pub fn partition(start: u64, stop: u64, chunk_size: u64) -> Result<Vec<Chunk>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::ZeroChunkSize);
    }
    if start >= stop {
        return Err(ChunkError::EmptyRange { start, stop });
    }

    let mut chunks = Vec::with_capacity((stop - start).div_ceil(chunk_size) as usize);
    let mut lo = start;
    while lo < stop {
        let hi = lo.saturating_add(chunk_size).min(stop);
        chunks.push(Chunk { lo, hi });
        lo = hi;
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(chunks: &[Chunk]) -> Vec<(u64, u64)> {
        chunks.iter().map(|c| (c.lo, c.hi)).collect()
    }

    #[test]
    fn test_partition_with_short_tail() {
        let chunks = partition(0, 10, 3).unwrap();
        assert_eq!(pairs(&chunks), vec![(0, 3), (3, 6), (6, 9), (9, 10)]);
    }

    #[test]
    fn test_partition_exact_division() {
        let chunks = partition(0, 9, 3).unwrap();
        assert_eq!(pairs(&chunks), vec![(0, 3), (3, 6), (6, 9)]);
    }

    #[test]
    fn test_partition_offset_start() {
        let chunks = partition(5, 12, 4).unwrap();
        assert_eq!(pairs(&chunks), vec![(5, 9), (9, 12)]);
        assert_eq!(chunks[1].to_string(), "9-12");
    }

    #[test]
    fn test_partition_rejects_bad_input() {
        assert_eq!(partition(0, 10, 0), Err(ChunkError::ZeroChunkSize));
        assert_eq!(
            partition(4, 4, 2),
            Err(ChunkError::EmptyRange { start: 4, stop: 4 })
        );
        assert!(partition(5, 2, 2).is_err());
    }

    #[test]
    fn test_partition_covers_range() {
        for start in 0..6 {
            for stop in start + 1..20 {
                for size in 1..8 {
                    let chunks = partition(start, stop, size).unwrap();

                    assert_eq!(chunks.first().unwrap().lo, start);
                    assert_eq!(chunks.last().unwrap().hi, stop);
                    for pair in chunks.windows(2) {
                        assert_eq!(pair[0].hi, pair[1].lo);
                    }
                    for chunk in &chunks[..chunks.len() - 1] {
                        assert_eq!(chunk.len(), size);
                    }
                    let last = chunks.last().unwrap();
                    assert!(!last.is_empty() && last.len() <= size);
                }
            }
        }
    }
}
