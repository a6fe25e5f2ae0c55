//! Capacity validation and the overwrite-detection predicate shared by
//! [`crate::Writer`] and [`crate::Reader`].

use crate::frame::MIN_CAPACITY;
use crate::{Error, Result};

/// `capacity >= MIN_CAPACITY` is the only constraint — unlike the teacher's
/// element-indexed ring (`lithos_icc::RingConfig`, power-of-2 only, masked
/// indexing), this is a byte ring with real modulo wraparound, so any
/// capacity above the floor is legal. See `SPEC_FULL.md` §4.3 for why a
/// byte ring can't use a bitmask the way a fixed-slot ring can.
pub fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity < MIN_CAPACITY {
        return Err(Error::InvalidSize {
            requested: capacity,
            min: MIN_CAPACITY,
        });
    }
    Ok(())
}

/// Whether a consumer that has processed through `local_seq` bytes has been
/// lapped by a producer that has published through `published_seq` bytes.
///
/// This is the only overwrite test in the protocol: index-delta tests are
/// ambiguous under wraparound (`write_idx < local_idx` is a normal
/// mid-wrap condition, not evidence of lapping), but the monotonic
/// byte-sequence counter never wraps, so a plain distance check is exact.
#[inline]
pub fn is_lapped(published_seq: u64, local_seq: u64, capacity: u64) -> bool {
    published_seq.saturating_sub(local_seq) > capacity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimum_and_above() {
        assert!(validate_capacity(MIN_CAPACITY).is_ok());
        assert!(validate_capacity(MIN_CAPACITY + 1).is_ok());
    }

    #[test]
    fn rejects_below_minimum() {
        assert!(validate_capacity(MIN_CAPACITY - 1).is_err());
        assert!(validate_capacity(0).is_err());
    }

    #[test]
    fn lap_detection_matches_the_distance_rule() {
        assert!(is_lapped(20, 5, 8)); // behind by 15 > capacity 8: lapped
        assert!(!is_lapped(13, 5, 8)); // exactly at the boundary: not lapped
        assert!(is_lapped(14, 5, 8)); // one byte past the boundary: lapped
        assert!(!is_lapped(5, 5, 8)); // caught up: never lapped
    }
}
