/// Failure modes surfaced by [`crate::Writer`] and [`crate::Reader`]
/// construction. Per-call outcomes of the hot read/write paths are not
/// errors in the Rust sense — see [`crate::ReadStatus`] and
/// [`crate::WriteError`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Shm(#[from] framed_ring_shm::Error),

    #[error("capacity {requested} is below the minimum of {min} (2 * (HEADER_BYTES + MAX_MESSAGE_SIZE))")]
    InvalidSize { requested: usize, min: usize },

    #[error("another writer already holds the exclusion semaphore for '{data_name}'")]
    SingletonViolation { data_name: String },
}

pub type Result<T> = std::result::Result<T, Error>;
