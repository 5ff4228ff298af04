//! Constant-time comparison helpers.
//!
//! Digests, tags, and derived keys are compared without early exit so the
//! comparison time does not reveal the position of the first mismatch.

use constant_time_eq::constant_time_eq;

/// Compare two byte slices in constant time.
///
/// Slices of different length compare unequal.
///
/// ```rust
/// use sgw_crypto::utils::constant_time_compare;
///
/// let digest = [7u8; 32];
/// assert!(constant_time_compare(&digest, &[7u8; 32]));
/// assert!(!constant_time_compare(&digest, &[7u8; 31]));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    constant_time_eq(a, b)
}

/// Fixed-size variant of [`constant_time_compare`].
pub fn constant_time_compare_array<const N: usize>(a: &[u8; N], b: &[u8; N]) -> bool {
    constant_time_eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_digests() {
        let a = crate::hash::sha256(b"payload");
        let b = crate::hash::sha256(b"payload");
        assert!(constant_time_compare_array(&a, &b));
    }

    #[test]
    fn test_single_bit_difference() {
        let a = [0u8; 32];
        let mut b = [0u8; 32];
        b[31] = 1;
        assert!(!constant_time_compare_array(&a, &b));
        assert!(!constant_time_compare(&a, &b));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(!constant_time_compare(b"hash", b"hash-longer"));
    }
}
