//! The producer side of the ring: publishes length-prefixed frames and owns
//! the writer-exclusion semaphore.

use std::sync::atomic::Ordering::Release;

use framed_ring_shm::NamedSemaphore;

use crate::attachment::RingAttachment;
use crate::frame::{HEADER_BYTES, MAX_MESSAGE_SIZE, encode_header};
use crate::{Error, Result, Spec};

/// Why a [`Writer::write`] call was rejected. These are not construction
/// errors — the writer stays perfectly usable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    #[error("payload of {size} bytes exceeds MAX_MESSAGE_SIZE ({max})")]
    MessageTooLarge { size: usize, max: usize },
    #[error("payload must be non-empty")]
    EmptyPayload,
}

/// The single producer for a ring. Construction publishes the initial
/// all-zero [`crate::State`] and acquires the named writer-exclusion
/// semaphore non-blocking; a second `Writer` for the same `data_name` fails
/// immediately with [`Error::SingletonViolation`].
pub struct Writer {
    attachment: RingAttachment,
    writer_sem: NamedSemaphore,
    local_idx: u64,
    local_seq: u64,
    capacity: u64,
}

impl Writer {
    pub fn new(spec: &Spec) -> Result<Self> {
        let attachment = RingAttachment::open(spec)?;
        let capacity = attachment.capacity() as u64;

        let writer_sem = NamedSemaphore::open(&spec.writer_semaphore_name())?;
        if !writer_sem.try_acquire() {
            return Err(Error::SingletonViolation {
                data_name: spec.data_name.clone(),
            });
        }

        attachment.state().init();
        tracing::debug!(data_name = %spec.data_name, capacity, "writer bound");

        Ok(Self {
            attachment,
            writer_sem,
            local_idx: 0,
            local_seq: 0,
            capacity,
        })
    }

    /// Appends `payload` as a new frame.
    ///
    /// Follows the three-way case split from `SPEC_FULL.md` §4.3.1:
    /// - **A** — the frame fits before the tail of the ring without
    ///   wrapping (the common path).
    /// - **B** — the frame wraps, but the header still fits at the tail, so
    ///   the header and the first part of the payload land before the
    ///   wrap and the rest lands at `B[0]`.
    /// - **C** — even the header doesn't fit at the tail; the whole frame
    ///   is written starting at `B[0]` and the reader is expected to
    ///   independently notice `space_to_end < HEADER_BYTES` and wrap too.
    ///
    /// `write_idx` is published *before* the copy (the reservation) and
    /// `read_idx` *after* it (the commit); together they form the
    /// release/acquire fence pair that lets a consumer which observes
    /// `read_idx >= p` trust every byte below `p`.
    pub fn write(&mut self, payload: &[u8]) -> std::result::Result<(), WriteError> {
        if payload.is_empty() {
            return Err(WriteError::EmptyPayload);
        }
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(WriteError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        let (state, data) = self.attachment.split_mut();
        let capacity = self.capacity;
        let total = (HEADER_BYTES + payload.len()) as u64;
        let space_to_end = capacity - self.local_idx;

        if total <= space_to_end {
            // Case A: contiguous, no wrap.
            let pos = self.local_idx as usize;
            self.local_idx += total;
            state.write_idx.store(self.local_idx, Release);
            write_contiguous(data, pos, payload);
        } else if space_to_end >= HEADER_BYTES as u64 {
            // Case B: wraps, header fits before the tail.
            let pos = self.local_idx as usize;
            self.local_idx = (self.local_idx + total) % capacity;
            state.write_idx.store(self.local_idx, Release);
            write_split(data, pos, payload, space_to_end as usize);
        } else {
            // Case C: header itself doesn't fit before the tail.
            self.local_idx = total;
            state.write_idx.store(self.local_idx, Release);
            write_contiguous(data, 0, payload);
        }

        self.local_seq += total;
        state.seq_num.store(self.local_seq, Release);
        // Commit: makes the frame visible to readers.
        state.read_idx.store(self.local_idx, Release);

        Ok(())
    }

    /// Total bytes ever committed by this writer.
    pub fn sequence(&self) -> u64 {
        self.local_seq
    }

    /// Current byte offset into the data segment the next frame will start
    /// at (after any wrap already applied).
    pub fn position(&self) -> u64 {
        self.local_idx
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if !self.writer_sem.release() {
            tracing::error!("failed to release writer-exclusion semaphore on drop");
        }
    }
}

fn write_contiguous(data: &mut [u8], pos: usize, payload: &[u8]) {
    let header = encode_header(payload.len());
    data[pos..pos + HEADER_BYTES].copy_from_slice(&header);
    data[pos + HEADER_BYTES..pos + HEADER_BYTES + payload.len()].copy_from_slice(payload);
}

fn write_split(data: &mut [u8], pos: usize, payload: &[u8], space_to_end: usize) {
    let header = encode_header(payload.len());
    data[pos..pos + HEADER_BYTES].copy_from_slice(&header);

    let before_wrap = space_to_end - HEADER_BYTES;
    data[pos + HEADER_BYTES..pos + space_to_end].copy_from_slice(&payload[..before_wrap]);
    data[..payload.len() - before_wrap].copy_from_slice(&payload[before_wrap..]);
}
