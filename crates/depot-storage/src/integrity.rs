//! Reassembly integrity checks shared by the store implementations.

use depot_core::result::AppResult;
use depot_core::AppError;

/// Verify that retrieved parts reconstruct the payload the head describes.
///
/// Each entry in `parts` is `(recorded_length, retrieved_length)`. A part
/// whose retrieved payload disagrees with its recorded length, or a sum
/// that disagrees with the head's recorded total, fails the read with
/// `CorruptStorage`; a partial result is never returned to the caller.
pub fn verify_reassembly(code: &str, head_length: u64, parts: &[(u64, u64)]) -> AppResult<()> {
    for (index, (recorded, retrieved)) in parts.iter().enumerate() {
        if recorded != retrieved {
            return Err(AppError::corrupt_storage(format!(
                "blob [{code}] part {index} retrieved {retrieved} bytes but recorded {recorded}"
            )));
        }
    }

    let total: u64 = parts.iter().map(|(recorded, _)| *recorded).sum();

    if total != head_length {
        return Err(AppError::corrupt_storage(format!(
            "blob [{code}] parts sum to {total} bytes but the head records {head_length}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::error::ErrorKind;

    #[test]
    fn test_consistent_parts_pass() {
        assert!(verify_reassembly("x", 9, &[(3, 3), (3, 3), (3, 3)]).is_ok());
        assert!(verify_reassembly("x", 0, &[]).is_ok());
    }

    #[test]
    fn test_part_length_mismatch_is_corrupt() {
        let err = verify_reassembly("x", 6, &[(3, 3), (3, 2)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CorruptStorage);
    }

    #[test]
    fn test_head_total_mismatch_is_corrupt() {
        let err = verify_reassembly("x", 7, &[(3, 3), (3, 3)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CorruptStorage);
    }
}
