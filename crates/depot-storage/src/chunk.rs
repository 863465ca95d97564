//! Splitting a contiguous payload into bounded parts.

use bytes::Bytes;

/// Split a payload into consecutive slices of at most `part_size` bytes.
///
/// Slicing `Bytes` is zero-copy; each returned chunk shares the original
/// buffer. An empty payload yields no chunks, which the blob store records
/// as a zero-length head.
pub fn split_into_parts(payload: Bytes, part_size: usize) -> Vec<Bytes> {
    assert!(part_size > 0, "part size must be positive");

    let mut chunks = Vec::with_capacity(payload.len().div_ceil(part_size));
    let mut offset = 0;

    while offset < payload.len() {
        let end = (offset + part_size).min(payload.len());
        chunks.push(payload.slice(offset..end));
        offset = end;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_yields_no_chunks() {
        assert!(split_into_parts(Bytes::new(), 16).is_empty());
    }

    #[test]
    fn test_payload_smaller_than_part_size() {
        let chunks = split_into_parts(Bytes::from_static(b"abc"), 16);
        assert_eq!(chunks, vec![Bytes::from_static(b"abc")]);
    }

    #[test]
    fn test_exact_multiple_of_part_size() {
        let chunks = split_into_parts(Bytes::from_static(b"abcdef"), 3);
        assert_eq!(
            chunks,
            vec![Bytes::from_static(b"abc"), Bytes::from_static(b"def")]
        );
    }

    #[test]
    fn test_trailing_partial_chunk() {
        let chunks = split_into_parts(Bytes::from_static(b"abcdefg"), 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], Bytes::from_static(b"g"));
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, 7);
    }
}
