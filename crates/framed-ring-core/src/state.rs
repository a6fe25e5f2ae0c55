//! The three atomic counters published between Writer and Reader, laid out
//! so each lives on its own cacheline.

use std::sync::atomic::AtomicU64;

use framed_ring_shm::CACHELINE_BYTES;

/// Shared ring state: the payload of the *index/state* segment.
///
/// Each field is padded out to [`CACHELINE_BYTES`] so the producer's writes
/// to `write_idx`/`seq_num` never false-share a cacheline with the
/// consumer's reads of `read_idx`, or vice versa.
#[repr(C)]
pub struct State {
    /// Byte offset of the next frame a consumer may read.
    pub read_idx: Aligned<AtomicU64>,
    /// Byte offset the producer is about to / has just finished writing at.
    pub write_idx: Aligned<AtomicU64>,
    /// Total bytes ever committed by the producer. Monotonic, never wraps
    /// in any plausible runtime — the basis of overwrite detection.
    pub seq_num: Aligned<AtomicU64>,
}

/// Pads `T` out to one cacheline so consecutive fields never share a line.
#[repr(C, align(64))]
pub struct Aligned<T>(pub T);

impl<T> std::ops::Deref for Aligned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

const _: () = assert!(std::mem::align_of::<Aligned<AtomicU64>>() == CACHELINE_BYTES);
const _: () = assert!(std::mem::size_of::<State>() % CACHELINE_BYTES == 0);

impl State {
    /// Publishes the all-zero initial state. Called once, by the `Writer`
    /// that creates the segment.
    pub fn init(&self) {
        use std::sync::atomic::Ordering::Release;
        self.read_idx.store(0, Release);
        self.write_idx.store(0, Release);
        self.seq_num.store(0, Release);
    }
}
