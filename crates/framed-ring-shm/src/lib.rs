//! `framed-ring-shm`: POSIX shared-memory and named-semaphore primitives.
//!
//! This crate owns exactly two OS-level concerns, kept deliberately thin so
//! the protocol built on top of them (in `framed-ring-core`) never has to
//! reason about `shm_open`/`sem_open` directly:
//!
//! - [`NamedSemaphore`]: host-wide mutual exclusion by name.
//! - [`SharedSegment`]: a named, fixed-size, reference-counted
//!   memory-mapped region.
//!
//! Neither type retries or blocks beyond a single non-blocking semaphore
//! attempt; both fail fast and leave no partially-constructed state behind.

mod error;
mod segment;
mod semaphore;

pub use error::{Error, Result};
pub use segment::{CACHELINE_BYTES, MAX_SEGMENT_BYTES, NAME_MAX, SharedSegment};
pub use semaphore::{MAX_NAME_LEN as MAX_SEMAPHORE_NAME_LEN, NamedSemaphore};
