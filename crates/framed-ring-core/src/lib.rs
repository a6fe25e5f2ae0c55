//! `framed-ring-core`: a single-producer, single-consumer, lock-free,
//! length-prefixed framed ring buffer over shared memory.
//!
//! This crate provides zero-copy IPC between two unrelated processes on the
//! same host, one writing frames and one reading them, with no locks on the
//! hot path, particularly suited for:
//! - Low-latency, single-stream producer/consumer pipelines
//! - Bridging processes that can't share a `std::sync` primitive directly
//!
//! # Core Components
//!
//! - [`Writer`]: the sole producer for a ring; construction enforces that
//!   at most one `Writer` is live for a given stream at a time
//! - [`Reader`]: the consumer; [`Reader::open`] starts from the beginning
//!   of the stream, [`Reader::join`] starts from the producer's current tail
//! - [`Spec`]: the two segment names and requested capacity that bind a
//!   `Writer`/`Reader` pair to the same stream
//!
//! # Architecture
//!
//! ```text
//! ┌────────┐   index segment (State: read_idx/write_idx/seq_num)   ┌────────┐
//! │ Writer │ ─────────────────────────────────────────────────────│ Reader │
//! │(Proc A)│   data segment (length-prefixed frames, byte ring)    │(Proc B)│
//! └────────┘ ─────────────────────────────────────────────────────└────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use framed_ring_core::{Spec, Writer, Reader};
//!
//! let spec = Spec::new("/demo-index", "/demo-data", 1 << 20);
//! let mut writer = Writer::new(&spec)?;
//! writer.write(b"hello").unwrap();
//!
//! let mut reader = Reader::open(&spec)?;
//! let mut buf = [0u8; 64];
//! let n = reader.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello");
//! ```
//!
//! # Internal Modules
//!
//! - `attachment`: shared segment/state plumbing used by both handles
//! - `frame`: on-wire header encoding and size constants
//! - `ring`: capacity validation and the overwrite-detection predicate
//! - `state`: the cacheline-padded atomic counters published between ends
//! - `spec`: the names and capacity that bind a pair to the same stream
//! - `writer` / `reader`: the producer and consumer handles

mod attachment;
mod error;
mod frame;
mod reader;
mod ring;
mod spec;
mod state;
mod writer;

pub use error::{Error, Result};
pub use frame::{HEADER_BYTES, MAX_MESSAGE_SIZE, MIN_CAPACITY};
pub use reader::{ReadStatus, Reader};
pub use spec::Spec;
pub use state::State;
pub use writer::{WriteError, Writer};
