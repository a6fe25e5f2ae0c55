//! The single consumer side of the ring.

use std::sync::atomic::Ordering::Acquire;

use crate::attachment::RingAttachment;
use crate::frame::{HEADER_BYTES, decode_header};
use crate::ring::is_lapped;
use crate::{Result, Spec};

/// Outcome of a [`Reader::read`] call that isn't a fresh frame.
///
/// `to_legacy_code` maps these onto the original source's integer return
/// convention (`>0` bytes read, `0` nothing new, `-1` buffer too small,
/// `i32::MIN` overwritten-or-corrupt) for callers porting code that already
/// speaks that protocol; callers writing fresh Rust should match on
/// [`ReadStatus`] directly instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// No frame has been published past the reader's current position.
    Empty,
    /// The next frame is `needed` bytes; the caller's buffer is smaller.
    /// The reader's position has not advanced — call again with a bigger
    /// buffer.
    BufferTooSmall { needed: usize },
    /// The producer wrote past this frame before (or while) it was read.
    Overwritten,
    /// The frame header decoded to a length outside `1..=MAX_MESSAGE_SIZE`.
    Corrupt,
}

impl ReadStatus {
    pub fn to_legacy_code(self) -> i32 {
        match self {
            ReadStatus::Empty => 0,
            ReadStatus::BufferTooSmall { .. } => -1,
            ReadStatus::Overwritten | ReadStatus::Corrupt => i32::MIN,
        }
    }
}

enum Layout {
    /// Case A: header and payload both fit before the tail.
    Contiguous { header_pos: usize },
    /// Case B: header fits, payload wraps at `before_wrap` bytes.
    Split { header_pos: usize, before_wrap: usize },
    /// Case C: header didn't fit before the tail; everything restarted
    /// at offset 0.
    Restarted,
}

/// The single consumer for a ring, independent of any other reader that may
/// also be attached (the spec scopes this crate to exactly one consumer per
/// stream; see `SPEC_FULL.md` §6.1 for the multi-consumer non-goal).
pub struct Reader {
    attachment: RingAttachment,
    local_idx: u64,
    local_seq: u64,
    capacity: u64,
}

impl Reader {
    /// Attaches starting at the beginning of the stream. If the segment
    /// already has history, this reader will read all of it from the start.
    pub fn open(spec: &Spec) -> Result<Self> {
        let attachment = RingAttachment::open(spec)?;
        let capacity = attachment.capacity() as u64;
        Ok(Self {
            attachment,
            local_idx: 0,
            local_seq: 0,
            capacity,
        })
    }

    /// Attaches at the producer's current tail, skipping any history
    /// already published. Useful for a reader that joins a long-lived
    /// stream late and only cares about frames from here on.
    pub fn join(spec: &Spec) -> Result<Self> {
        let attachment = RingAttachment::open(spec)?;
        let capacity = attachment.capacity() as u64;
        let state = attachment.state();
        let local_idx = state.read_idx.load(Acquire);
        let local_seq = state.seq_num.load(Acquire);
        Ok(Self {
            attachment,
            local_idx,
            local_seq,
            capacity,
        })
    }

    /// Reads the next frame into `out`, returning the number of payload
    /// bytes written on success.
    ///
    /// Follows the read protocol from `SPEC_FULL.md` §4.3.2: a pre-check
    /// against the producer's published `seq_num` catches a reader that
    /// has already been lapped before it touches the buffer; a matching
    /// post-check after the copy catches a producer that laps the reader
    /// mid-copy. Either failure reports [`ReadStatus::Overwritten`] and
    /// leaves this reader's position unadvanced — the caller has already
    /// lost data and the next call will keep reporting `Overwritten` until
    /// the caller decides how to resynchronize.
    pub fn read(&mut self, out: &mut [u8]) -> std::result::Result<usize, ReadStatus> {
        let state = self.attachment.state();
        let capacity = self.capacity;

        // Step 1: anything published since our last read?
        let committed = state.read_idx.load(Acquire);
        if self.local_idx == committed {
            return Err(ReadStatus::Empty);
        }

        // Step 2: pre-check, before touching any frame bytes.
        let seq_before = state.seq_num.load(Acquire);
        if is_lapped(seq_before, self.local_seq, capacity) {
            return Err(ReadStatus::Overwritten);
        }

        let space_to_end = capacity - self.local_idx;
        // Case C: even the header doesn't fit before the tail, so the
        // writer restarted the whole frame at offset 0.
        let is_case_c = space_to_end < HEADER_BYTES as u64;
        let header_pos = if is_case_c { 0 } else { self.local_idx as usize };

        let data = self.attachment.data();
        let mut header = [0u8; HEADER_BYTES];
        header.copy_from_slice(&data[header_pos..header_pos + HEADER_BYTES]);

        let payload_len = match decode_header(header) {
            Some(len) => len,
            None => return Err(ReadStatus::Corrupt),
        };

        if out.len() < payload_len {
            return Err(ReadStatus::BufferTooSmall { needed: payload_len });
        }

        let total = (HEADER_BYTES + payload_len) as u64;
        let layout = if is_case_c {
            Layout::Restarted
        } else if total <= space_to_end {
            Layout::Contiguous { header_pos }
        } else {
            Layout::Split {
                header_pos,
                before_wrap: space_to_end as usize - HEADER_BYTES,
            }
        };

        let next_idx = match layout {
            Layout::Restarted => total,
            Layout::Contiguous { .. } => self.local_idx + total,
            Layout::Split { .. } => (self.local_idx + total) % capacity,
        };

        match layout {
            Layout::Restarted => {
                out[..payload_len].copy_from_slice(&data[HEADER_BYTES..HEADER_BYTES + payload_len]);
            }
            Layout::Contiguous { header_pos } => {
                let start = header_pos + HEADER_BYTES;
                out[..payload_len].copy_from_slice(&data[start..start + payload_len]);
            }
            Layout::Split {
                header_pos,
                before_wrap,
            } => {
                let start = header_pos + HEADER_BYTES;
                out[..before_wrap].copy_from_slice(&data[start..start + before_wrap]);
                out[before_wrap..payload_len].copy_from_slice(&data[..payload_len - before_wrap]);
            }
        }

        // Step 6: advance local_seq as if this frame were fully consumed...
        let next_seq = self.local_seq + total;
        // ...then step 7: post-check against that advanced position — this
        // is what makes a producer that laps us mid-copy observable (see
        // `SPEC_FULL.md` §4.3.3).
        let seq_after = state.seq_num.load(Acquire);
        if is_lapped(seq_after, next_seq, capacity) {
            return Err(ReadStatus::Overwritten);
        }

        self.local_idx = next_idx;
        self.local_seq = next_seq;

        Ok(payload_len)
    }

    /// Total bytes this reader has successfully consumed.
    pub fn sequence(&self) -> u64 {
        self.local_seq
    }

    /// Current byte offset into the data segment this reader will read
    /// from next.
    pub fn position(&self) -> u64 {
        self.local_idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_code_mapping() {
        assert_eq!(ReadStatus::Empty.to_legacy_code(), 0);
        assert_eq!(
            ReadStatus::BufferTooSmall { needed: 4 }.to_legacy_code(),
            -1
        );
        assert_eq!(ReadStatus::Overwritten.to_legacy_code(), i32::MIN);
        assert_eq!(ReadStatus::Corrupt.to_legacy_code(), i32::MIN);
    }
}
