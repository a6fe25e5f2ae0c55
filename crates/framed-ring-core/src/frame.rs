//! Frame layout: a fixed-width little-endian length header followed by the
//! payload bytes it describes.
//!
//! The header width is a build-time constant the original source left
//! ambiguous between `u16`/`u32`/signed variants across revisions. This
//! implementation fixes it at `u32` little-endian — see `SPEC_FULL.md` §4.3
//! for the rationale. Readers reject any header value outside
//! `1..=MAX_MESSAGE_SIZE`.

/// Largest payload a single frame may carry.
pub const MAX_MESSAGE_SIZE: usize = 65_535;

/// Width of the frame length header, in bytes.
pub const HEADER_BYTES: usize = std::mem::size_of::<u32>();

/// Smallest capacity that can hold two maximum-size frames without the
/// header of one tearing across the wrap point in a way the protocol can't
/// route around.
pub const MIN_CAPACITY: usize = 2 * (HEADER_BYTES + MAX_MESSAGE_SIZE);

/// Encodes a payload length as the on-wire frame header.
#[inline]
pub fn encode_header(payload_len: usize) -> [u8; HEADER_BYTES] {
    (payload_len as u32).to_le_bytes()
}

/// Decodes a frame header into a payload length, rejecting anything outside
/// `1..=MAX_MESSAGE_SIZE` as [`None`] (maps to the `Corrupt` read status).
#[inline]
pub fn decode_header(bytes: [u8; HEADER_BYTES]) -> Option<usize> {
    let len = u32::from_le_bytes(bytes) as usize;
    if len == 0 || len > MAX_MESSAGE_SIZE {
        None
    } else {
        Some(len)
    }
}
